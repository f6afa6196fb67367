// Cross-layer types and tuning constants. Everything that crosses a
// thread boundary (control events, note events) lives here so the
// layers don't have to import each other.

use serde::{Deserialize, Serialize};

// Per-tick polyphony bound. Overflow evicts the oldest note in the
// bucket rather than rejecting input.
pub const MAX_POLYPHONY: usize = 8;

// Concurrent playback voices in the audio engine.
pub const MAX_VOICES: usize = 16;

pub const NUM_BANK_SLOTS: usize = 10;

// The pad controller sends notes starting here; alternate scenes
// continue upward, hence the modulus when mapping to a sample slot.
pub const MIDI_FIRST_NOTE: u8 = 36;
pub const SAMPLES_PER_SET: usize = 16;

pub const DEFAULT_BPM: u32 = 120;
pub const MIN_BPM: u32 = 10;
pub const DEFAULT_MEASURES: u32 = 4;
pub const DEFAULT_BEATS_PER_MEASURE: u32 = 4;
pub const DEFAULT_SUB_BEATS: u32 = 2;

// Raw MIDI note number. Serializes as a bare integer so sequence
// files stay plain nested arrays of pitches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note(pub u8);

// What the note source produces: live pad hits and scene switches,
// delivered from the MIDI callback thread over a bounded channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn(Note),
    SceneChange(u8),
}

// Semantic keypad events. The TUI resolves raw keys plus the held
// modifier state into these; the sequencer never sees key codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    IncreaseTempo,
    DecreaseTempo,
    ToggleMetronome,
    ToggleRecording,
    StartStop,
    DeleteLast,
    ClearSequence,
    Store(u8),
    Recall(u8),
    SelectSample(u8),
    SaveToFile,
    Quit,
}

// coarse = '*' held, fine = '/' held. Only tempo changes scale by
// them; the other kinds already encode the modifier in the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlEvent {
    pub kind: ControlKind,
    pub coarse: bool,
    pub fine: bool,
}
