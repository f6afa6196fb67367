// The render engine that lives inside the cpal callback. Everything
// here must be allocation-light and must never block: commands come in
// over a bounded channel and are drained at the top of each block.

use std::collections::HashMap;

use crate::audio_api::AudioCommand;
use crate::shared::MAX_VOICES;

use super::sample_buffer::{SampleBuffer, SampleId, StereoFrame};
use super::voice::Voice;

pub struct Engine {
    samples: HashMap<SampleId, SampleBuffer>,
    voices: Vec<Voice>,
    triggers: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            samples: HashMap::new(),
            voices: Vec::with_capacity(MAX_VOICES),
            triggers: 0,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.samples.insert(id, buffer);
            }
            AudioCommand::Trigger { id, gain } => self.trigger(id, gain),
        }
    }

    /// Start a voice for `id`. Prefers a free pool slot; when all
    /// voices are busy, the least-recently-started one is cut short.
    fn trigger(&mut self, id: SampleId, gain: f32) {
        if !self.samples.contains_key(&id) {
            return;
        }
        self.triggers += 1;
        let voice = Voice::new(id, gain, self.triggers);
        if let Some(slot) = self.voices.iter_mut().find(|v| !v.active) {
            *slot = voice;
        } else if self.voices.len() < MAX_VOICES {
            self.voices.push(voice);
        } else if let Some(slot) = self.voices.iter_mut().min_by_key(|v| v.started) {
            *slot = voice;
        }
    }

    /// Mix all live voices into `out`. The caller zeroes the block.
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        for voice in self.voices.iter_mut() {
            if !voice.active {
                continue;
            }
            match self.samples.get(&voice.sample) {
                Some(buffer) => voice.render_into(buffer, out),
                None => voice.active = false,
            }
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_sample(id: u64, len: usize) -> Engine {
        let mut engine = Engine::new();
        engine.handle_cmd(AudioCommand::RegisterSample {
            id: SampleId(id),
            buffer: SampleBuffer {
                data: vec![
                    StereoFrame {
                        left: 1.0,
                        right: 1.0,
                    };
                    len
                ],
            },
        });
        engine
    }

    #[test]
    fn trigger_of_unknown_sample_is_ignored() {
        let mut engine = Engine::new();
        engine.handle_cmd(AudioCommand::Trigger {
            id: SampleId(9),
            gain: 1.0,
        });
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn voices_mix_additively() {
        let mut engine = engine_with_sample(0, 16);
        engine.handle_cmd(AudioCommand::Trigger {
            id: SampleId(0),
            gain: 0.5,
        });
        engine.handle_cmd(AudioCommand::Trigger {
            id: SampleId(0),
            gain: 0.5,
        });
        let mut out = [StereoFrame::default(); 4];
        engine.render_block(&mut out);
        assert!((out[0].left - 1.0).abs() < 1e-6);
        assert_eq!(engine.active_voices(), 2);
    }

    #[test]
    fn pool_overflow_steals_the_oldest_voice() {
        let mut engine = engine_with_sample(0, 1024);
        for _ in 0..MAX_VOICES {
            engine.handle_cmd(AudioCommand::Trigger {
                id: SampleId(0),
                gain: 1.0,
            });
        }
        assert_eq!(engine.active_voices(), MAX_VOICES);
        engine.handle_cmd(AudioCommand::Trigger {
            id: SampleId(0),
            gain: 1.0,
        });
        // still at the cap: voice 1 was reclaimed, not queued
        assert_eq!(engine.active_voices(), MAX_VOICES);
        let min_started = engine.voices.iter().map(|v| v.started).min().unwrap();
        assert_eq!(min_started, 2, "oldest trigger should have been evicted");
    }

    #[test]
    fn finished_voices_free_their_slot() {
        let mut engine = engine_with_sample(0, 2);
        engine.handle_cmd(AudioCommand::Trigger {
            id: SampleId(0),
            gain: 1.0,
        });
        let mut out = [StereoFrame::default(); 8];
        engine.render_block(&mut out);
        assert_eq!(engine.active_voices(), 0);
    }
}
