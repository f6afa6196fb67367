// Command surface between the sequencer flows and the audio
// callback, plus the SoundBank collaborator trait the core consumes.

use crate::audio::{SampleBuffer, SampleId};
use crate::shared::Note;

/// Metronome sounds: a regular click, and the chime played at the top
/// of the sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetroSound {
    Click,
    Chime,
}

// The engine can't load files (it lives inside the audio callback),
// so buffers are decoded up front and registered by id; triggers then
// reference the id.
#[derive(Clone, Debug)]
pub enum AudioCommand {
    RegisterSample { id: SampleId, buffer: SampleBuffer },
    Trigger { id: SampleId, gain: f32 },
}

/// What the sequencer needs from the audio side. Implementations must
/// never block: triggering is fire-and-forget, and a saturated voice
/// pool reclaims the least-recently-started voice instead of waiting.
pub trait SoundBank: Send + Sync {
    fn play_note(&self, note: Note, gain: f32);
    fn play_metro(&self, sound: MetroSound, gain: f32);
    /// Switch the note-to-sample mapping to set `index`. Returns
    /// false when no such set exists.
    fn select_set(&self, index: usize) -> bool;
    fn find_set(&self, name: &str) -> Option<usize>;
}

/// Stand-in for a missing output device: everything degrades to a
/// silent no-op so the sequencer keeps running headless.
pub struct NullSoundBank;

impl SoundBank for NullSoundBank {
    fn play_note(&self, _note: Note, _gain: f32) {}
    fn play_metro(&self, _sound: MetroSound, _gain: f32) {}
    fn select_set(&self, _index: usize) -> bool {
        true
    }
    fn find_set(&self, _name: &str) -> Option<usize> {
        None
    }
}
