// The sequencer state machine: clock + current sequence + bank plus
// the playback/recording flags, behind one mutex shared by the
// scheduler thread, the note worker, and control dispatch.

use std::sync::Arc;
use std::time::Duration;

use crate::audio_api::{MetroSound, SoundBank};
use crate::display::StatusDisplay;
use crate::error::SeqError;
use crate::seq::bank::SequenceBank;
use crate::seq::clock::SeqClock;
use crate::seq::sequence::Sequence;
use crate::shared::{MIN_BPM, Note};

/// A scene: a canned sequence file plus the tempo/feel/kit to play it
/// with, switched from the pad controller's scene buttons.
pub struct ScenePreset {
    pub file: &'static str,
    pub bpm: u32,
    pub swing: bool,
    pub sample_set: &'static str,
}

pub const SCENES: [ScenePreset; 3] = [
    ScenePreset {
        file: "rock.json",
        bpm: 180,
        swing: false,
        sample_set: "PearlKit",
    },
    ScenePreset {
        file: "swing.json",
        bpm: 120,
        swing: true,
        sample_set: "PearlKit",
    },
    ScenePreset {
        file: "funk.json",
        bpm: 130,
        swing: false,
        sample_set: "PearlKit",
    },
];

pub fn scene_preset(id: u8) -> Option<&'static ScenePreset> {
    SCENES.get(id as usize)
}

/// Quantization decision for one live input event: the tick it should
/// be recorded at, and whether to echo the sound immediately.
///
/// The echo is suppressed when recording during the half phase: the
/// note lands on the *upcoming* tick, which the scheduler is about to
/// play anyway, and echoing it now would double-trigger the sound.
pub fn quantize_input(clock: &SeqClock, recording: bool) -> (usize, bool) {
    let echo = !(recording && clock.is_half_tick());
    (clock.quantized_tick(), echo)
}

pub struct SeqEngine {
    pub(crate) clock: SeqClock,
    current: Sequence,
    bank: SequenceBank,
    bpm: u32,
    swing: bool,
    metronome_on: bool,
    recording: bool,
    current_slot: usize,
    sample_set: usize,
    // Scheduler handshake: `running` gates the loop, `epoch` makes a
    // superseded scheduler thread exit at its next firing.
    pub(crate) running: bool,
    pub(crate) epoch: u64,
    sound: Arc<dyn SoundBank>,
    display: Box<dyn StatusDisplay>,
}

impl SeqEngine {
    pub fn new(
        sequence: Sequence,
        bpm: u32,
        swing: bool,
        sound: Arc<dyn SoundBank>,
        display: Box<dyn StatusDisplay>,
    ) -> Self {
        let mut engine = Self {
            clock: SeqClock::new(sequence.time_sig()),
            current: sequence,
            bank: SequenceBank::new(),
            bpm: bpm.max(MIN_BPM),
            swing,
            metronome_on: true,
            recording: false,
            current_slot: 0,
            sample_set: 0,
            running: false,
            epoch: 0,
            sound,
            display,
        };
        engine.write_static();
        engine.push_time();
        engine.update_settings();
        engine
    }

    /// One scheduler firing: advance the clock, refresh the position
    /// display, and on the full phase trigger metronome and playback.
    pub(crate) fn fire(&mut self) {
        self.clock.advance();
        self.push_time();
        if self.clock.is_half_tick() {
            // the fine half-interval only exists for quantization
            return;
        }

        if self.clock.sub_beat() == 0 && self.metronome_on {
            let (sound, gain) = if self.clock.beat() == 0 {
                if self.clock.measure() == 0 {
                    (MetroSound::Chime, 1.0)
                } else {
                    (MetroSound::Click, 0.6)
                }
            } else {
                (MetroSound::Click, 0.3)
            };
            self.sound.play_metro(sound, gain);
        }

        let tick = self.clock.tick();
        match self.current.notes_at(tick) {
            Some(notes) => {
                for &note in notes {
                    self.sound.play_note(note, 1.0);
                }
            }
            None => log::warn!("tick {tick} is outside the current note grid"),
        }
    }

    /// A live note from the pad controller. Echoes the sound right
    /// away (unless the quantizer says the scheduler is about to play
    /// it) and, while recording, files it at the quantized tick.
    pub fn handle_note_on(&mut self, note: Note) {
        let (tick, echo) = quantize_input(&self.clock, self.recording);
        if echo {
            self.sound.play_note(note, 1.0);
        }
        if self.recording {
            self.current.add_note(tick, note);
        }
    }

    /// Seconds per scheduler firing at the current tempo and clock
    /// position. Straight time halves each sub-beat evenly; swing
    /// stretches even sub-beats to 2/3 of the beat and squeezes odd
    /// ones to 1/3.
    pub fn interval(&self) -> Duration {
        let sig = self.clock.time_sig();
        let straight = 60.0 / f64::from(self.bpm) / f64::from(sig.sub_beats_per_beat) / 2.0;
        let secs = if !self.swing {
            straight
        } else if self.clock.sub_beat() % 2 == 0 {
            straight * (2.0 / 3.0) / 0.5
        } else {
            straight * (1.0 / 3.0) / 0.5
        };
        Duration::from_secs_f64(secs)
    }

    /// Tempo change: +-5 bpm, doubled by the coarse modifier, divided
    /// by 5 by the fine one; both at once gives +-2.
    pub fn adjust_tempo(&mut self, up: bool, coarse: bool, fine: bool) {
        let mut delta: i64 = 5;
        if coarse {
            delta *= 2;
        }
        if fine {
            delta /= 5;
        }
        if !up {
            delta = -delta;
        }
        self.bpm = (i64::from(self.bpm) + delta).max(i64::from(MIN_BPM)) as u32;
        log::debug!("bpm now {}", self.bpm);
        self.update_settings();
    }

    pub fn set_bpm(&mut self, bpm: u32) {
        self.bpm = bpm.max(MIN_BPM);
        self.update_settings();
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn set_swing(&mut self, swing: bool) {
        self.swing = swing;
    }

    pub fn toggle_metronome(&mut self) -> bool {
        self.metronome_on = !self.metronome_on;
        self.metronome_on
    }

    pub fn toggle_recording(&mut self) -> bool {
        self.recording = !self.recording;
        self.update_settings();
        self.recording
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn delete_last_note(&mut self) {
        self.current.delete_last();
    }

    pub fn clear_current(&mut self) {
        self.current.clear();
    }

    pub fn store(&mut self, slot: usize) -> Result<(), SeqError> {
        log::info!("storing current sequence to bank slot {slot}");
        self.bank.store(slot, &self.current)
    }

    pub fn recall(&mut self, slot: usize) -> Result<(), SeqError> {
        let sequence = self.bank.recall(slot)?;
        log::info!("recalled bank slot {slot}");
        self.set_current(sequence);
        self.current_slot = slot;
        self.update_settings();
        Ok(())
    }

    /// Replace the sequence under edit/playback. The clock is rebuilt
    /// for the new time signature, parked just before tick 0.
    pub fn set_current(&mut self, sequence: Sequence) {
        self.clock = SeqClock::new(sequence.time_sig());
        self.current = sequence;
    }

    /// Store into a bank slot and make it current, as one step; used
    /// for sequences arriving from files at startup.
    pub fn install(&mut self, sequence: Sequence, slot: usize) -> Result<(), SeqError> {
        self.bank.store(slot, &sequence)?;
        self.set_current(sequence);
        self.current_slot = slot;
        self.update_settings();
        Ok(())
    }

    pub fn select_sample_set(&mut self, index: usize) {
        if self.sound.select_set(index) {
            self.sample_set = index;
            self.update_settings();
        } else {
            log::warn!("no sample set {index}");
        }
    }

    pub fn select_sample_set_by_name(&mut self, name: &str) {
        match self.sound.find_set(name) {
            Some(index) => self.select_sample_set(index),
            None => log::warn!("no sample set named {name}"),
        }
    }

    pub fn snapshot_current(&self) -> Sequence {
        self.current.clone()
    }

    pub fn current(&self) -> &Sequence {
        &self.current
    }

    fn write_static(&mut self) {
        self.display.set_field(0, 0, "[ - ] bpm:");
        self.display.set_field(1, 0, "Seq:");
        self.display.set_field(1, 8, "Samp:");
    }

    fn push_time(&mut self) {
        // panel shows 1-indexed positions
        self.display.set_field(0, 1, &(self.clock.measure() + 1).to_string());
        self.display.set_field(0, 3, &(self.clock.beat() + 1).to_string());
    }

    pub(crate) fn update_settings(&mut self) {
        let bpm = format!("{:<3}", self.bpm);
        self.display.set_field(0, 10, &bpm);
        self.display.set_field(0, 14, if self.recording { "-R" } else { "  " });
        self.display.set_field(1, 4, &self.current_slot.to_string());
        let set = format!("{:<2}", self.sample_set);
        self.display.set_field(1, 13, &set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::NullDisplay;
    use crate::seq::clock::TimeSignature;
    use crate::seq::testing::{FakeBank, Played};

    fn engine_with(sig: (u32, u32, u32), bpm: u32, swing: bool) -> (SeqEngine, FakeBank) {
        let bank = FakeBank::new();
        let sequence = Sequence::new(TimeSignature::new(sig.0, sig.1, sig.2).unwrap());
        let engine = SeqEngine::new(
            sequence,
            bpm,
            swing,
            Arc::new(bank.clone()),
            Box::new(NullDisplay),
        );
        (engine, bank)
    }

    fn metro_only(played: Vec<Played>) -> Vec<Played> {
        played
            .into_iter()
            .filter(|p| matches!(p, Played::Metro(..)))
            .collect()
    }

    #[test]
    fn metronome_has_three_tiers() {
        let (mut engine, bank) = engine_with((2, 2, 1), 120, false);
        // 4 ticks, 2 firings each
        for _ in 0..8 {
            engine.fire();
        }
        let metro = metro_only(bank.take());
        assert_eq!(
            metro,
            vec![
                Played::Metro(MetroSound::Chime, 1.0), // measure 0, beat 0
                Played::Metro(MetroSound::Click, 0.3), // measure 0, beat 1
                Played::Metro(MetroSound::Click, 0.6), // measure 1, beat 0
                Played::Metro(MetroSound::Click, 0.3), // measure 1, beat 1
            ]
        );
    }

    #[test]
    fn metronome_toggle_silences_it() {
        let (mut engine, bank) = engine_with((1, 2, 1), 120, false);
        assert!(!engine.toggle_metronome());
        for _ in 0..4 {
            engine.fire();
        }
        assert!(metro_only(bank.take()).is_empty());
    }

    #[test]
    fn playback_triggers_bucket_notes_once() {
        let (mut engine, bank) = engine_with((1, 4, 2), 120, false);
        engine.toggle_metronome(); // keep the trace to just the notes
        {
            let mut seq = engine.snapshot_current();
            seq.add_note(1, Note(40));
            seq.add_note(1, Note(41));
            engine.set_current(seq);
        }
        for _ in 0..4 {
            engine.fire(); // ticks 0 and 1, both phases
        }
        assert_eq!(
            bank.take(),
            vec![Played::Note(40, 1.0), Played::Note(41, 1.0)]
        );
    }

    #[test]
    fn live_note_echoes_when_not_recording() {
        let (mut engine, bank) = engine_with((1, 4, 2), 120, false);
        engine.fire();
        engine.fire(); // half phase
        bank.take();
        engine.handle_note_on(Note(42));
        assert_eq!(bank.take(), vec![Played::Note(42, 1.0)]);
        assert_eq!(engine.current().note_count(), 0);
    }

    #[test]
    fn recording_on_the_half_suppresses_the_echo() {
        let (mut engine, bank) = engine_with((1, 4, 2), 120, false);
        engine.toggle_recording();
        engine.fire(); // tick 0, full
        engine.fire(); // tick 0, half
        bank.take();
        engine.handle_note_on(Note(42));
        // no echo: the scheduler will play tick 1 in a moment
        assert_eq!(bank.take(), vec![]);
        assert_eq!(engine.current().notes_at(1).unwrap(), &[Note(42)]);
    }

    #[test]
    fn recording_on_the_full_phase_echoes_and_records() {
        let (mut engine, bank) = engine_with((1, 4, 2), 120, false);
        engine.toggle_recording();
        engine.fire(); // tick 0, full
        bank.take();
        engine.handle_note_on(Note(43));
        assert_eq!(bank.take(), vec![Played::Note(43, 1.0)]);
        assert_eq!(engine.current().notes_at(0).unwrap(), &[Note(43)]);
    }

    #[test]
    fn tempo_modifiers_compose() {
        let (mut engine, _) = engine_with((1, 4, 2), 120, false);
        engine.adjust_tempo(true, false, false);
        assert_eq!(engine.bpm(), 125);
        engine.adjust_tempo(true, true, false);
        assert_eq!(engine.bpm(), 135);
        engine.adjust_tempo(true, false, true);
        assert_eq!(engine.bpm(), 136);
        engine.adjust_tempo(true, true, true);
        assert_eq!(engine.bpm(), 138);
        engine.adjust_tempo(false, true, false);
        assert_eq!(engine.bpm(), 128);
    }

    #[test]
    fn tempo_never_drops_below_the_floor() {
        let (mut engine, _) = engine_with((1, 4, 2), 12, false);
        engine.adjust_tempo(false, false, false);
        assert_eq!(engine.bpm(), MIN_BPM);
        engine.adjust_tempo(false, true, false);
        assert_eq!(engine.bpm(), MIN_BPM);
    }

    #[test]
    fn straight_interval_matches_the_formula() {
        let (engine, _) = engine_with((1, 4, 2), 120, false);
        // 60 / 120 / 2 / 2
        assert!((engine.interval().as_secs_f64() - 0.125).abs() < 1e-9);
    }

    #[test]
    fn swing_intervals_sum_to_straight_time() {
        let (mut engine, _) = engine_with((1, 4, 2), 120, true);
        let straight = 0.125f64;
        engine.fire(); // sub-beat 0
        let even = engine.interval().as_secs_f64();
        engine.fire();
        engine.fire(); // sub-beat 1
        let odd = engine.interval().as_secs_f64();
        assert!((even - straight * 4.0 / 3.0).abs() < 1e-9);
        assert!((odd - straight * 2.0 / 3.0).abs() < 1e-9);
        assert!((even + odd - straight * 2.0).abs() < 1e-9);
    }

    #[test]
    fn store_and_recall_via_the_engine() {
        let (mut engine, _) = engine_with((1, 4, 2), 120, false);
        {
            let mut seq = engine.snapshot_current();
            seq.add_note(2, Note(36));
            engine.set_current(seq);
        }
        engine.store(4).unwrap();
        engine.clear_current();
        assert_eq!(engine.current().note_count(), 0);
        engine.recall(4).unwrap();
        assert_eq!(engine.current().notes_at(2).unwrap(), &[Note(36)]);
        assert_eq!(engine.recall(9), Err(SeqError::SlotEmpty(9)));
    }

    #[test]
    fn quantizer_policy_table() {
        let mut clock = SeqClock::new(TimeSignature::new(1, 4, 2).unwrap());
        clock.advance(); // tick 0, full phase
        assert_eq!(quantize_input(&clock, false), (0, true));
        assert_eq!(quantize_input(&clock, true), (0, true));
        clock.advance(); // tick 0, half phase
        assert_eq!(quantize_input(&clock, false), (1, true));
        // only recording-on-the-half suppresses the echo
        assert_eq!(quantize_input(&clock, true), (1, false));
    }

    #[test]
    fn unknown_scene_is_none() {
        assert!(scene_preset(0).is_some());
        assert!(scene_preset(7).is_none());
    }
}
