// Audio output: a cpal stream whose callback drains a command channel
// and mixes a fixed voice pool. The sequencer side only ever holds a
// SamplePlayer, which maps notes to preloaded samples and fires
// non-blocking trigger commands at the stream.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

pub mod engine;
pub mod sample_buffer;
pub mod voice;

pub use sample_buffer::{SampleBuffer, SampleId, StereoFrame, next_sample_id};

use crate::audio_api::{AudioCommand, MetroSound, SoundBank};
use crate::loader::SampleLibrary;
use crate::shared::{MIDI_FIRST_NOTE, Note, SAMPLES_PER_SET};
use engine::Engine;

/// Keeps the output stream alive on the main thread; dropping it
/// stops audio. cpal streams are not Send, so this never travels.
pub struct AudioOutput {
    _stream: cpal::Stream,
}

/// The SoundBank the sequencer talks to. Send + Sync: just a channel
/// end, the sample mapping, and the current-set index.
pub struct SamplePlayer {
    tx: Sender<AudioCommand>,
    library: SampleLibrary,
    current_set: AtomicUsize,
}

impl SoundBank for SamplePlayer {
    fn play_note(&self, note: Note, gain: f32) {
        let Some(set) = self.library.sets.get(self.current_set.load(Ordering::Relaxed)) else {
            return;
        };
        // pads on alternate scenes send progressively higher notes,
        // hence the modulus
        let index = (note.0.wrapping_sub(MIDI_FIRST_NOTE) as usize) % SAMPLES_PER_SET;
        match set.samples.get(index) {
            Some(&id) => {
                let _ = self.tx.try_send(AudioCommand::Trigger { id, gain });
            }
            None => log::debug!("sample {index} missing from set {}", set.name),
        }
    }

    fn play_metro(&self, sound: MetroSound, gain: f32) {
        let id = match sound {
            MetroSound::Click => self.library.metro_click,
            MetroSound::Chime => self.library.metro_chime,
        };
        if let Some(id) = id {
            let _ = self.tx.try_send(AudioCommand::Trigger { id, gain });
        }
    }

    fn select_set(&self, index: usize) -> bool {
        if index < self.library.sets.len() {
            self.current_set.store(index, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    fn find_set(&self, name: &str) -> Option<usize> {
        self.library.sets.iter().position(|s| s.name == name)
    }
}

/// Open the default output device, scan and decode the sample
/// library at the device rate, and start the render callback.
pub fn start_audio(samples_dir: &Path) -> anyhow::Result<(AudioOutput, SamplePlayer)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;
    if config.sample_format() != cpal::SampleFormat::F32 {
        anyhow::bail!("unsupported sample format (only f32 supported for now)");
    }
    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    let (library, buffers) = crate::loader::scan(samples_dir, sample_rate);

    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);
    let stream = build_output_stream(&device, &config.into(), rx, channels)?;
    stream.play().context("failed to start output stream")?;

    for (id, buffer) in buffers {
        // blocking send is fine at startup: the stream is live and draining
        let _ = tx.send(AudioCommand::RegisterSample { id, buffer });
    }

    Ok((
        AudioOutput { _stream: stream },
        SamplePlayer {
            tx,
            library,
            current_set: AtomicUsize::new(0),
        },
    ))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new();
    let mut scratch = vec![StereoFrame::default(); 4096];

    let err_fn = |err| log::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels.max(1);
            if scratch.len() < n_frames {
                scratch.resize(n_frames, StereoFrame::default());
            }
            let block = &mut scratch[..n_frames];
            block.fill(StereoFrame::default());
            engine.render_block(block);

            // interleave into whatever channel count the device wants
            for (frame, mixed) in data.chunks_mut(channels.max(1)).zip(block.iter()) {
                frame[0] = mixed.left;
                if frame.len() > 1 {
                    frame[1] = mixed.right;
                }
                for extra in frame.iter_mut().skip(2) {
                    *extra = 0.0;
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
