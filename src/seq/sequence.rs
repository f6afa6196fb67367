// The per-tick note grid plus the LIFO insertion history that backs
// "delete last note".

use serde::{Deserialize, Serialize};

use crate::error::SeqError;
use crate::seq::clock::TimeSignature;
use crate::shared::{MAX_POLYPHONY, Note};

/// A polyphonic sequence: one bucket of notes per tick, bounded at
/// `MAX_POLYPHONY` voices per bucket.
///
/// The insertion history records the tick of every note still in the
/// grid, in the order they were added. Undo is strictly LIFO: the
/// only supported delete is "pop the most recent insertion".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    time_sig: TimeSignature,
    note_grid: Vec<Vec<Note>>,
    // Runtime-only undo log; sequences loaded from disk start with an
    // empty history.
    #[serde(skip)]
    history: Vec<usize>,
}

impl Sequence {
    pub fn new(time_sig: TimeSignature) -> Self {
        Self {
            time_sig,
            note_grid: vec![Vec::new(); time_sig.total_ticks()],
            history: Vec::new(),
        }
    }

    pub fn time_sig(&self) -> TimeSignature {
        self.time_sig
    }

    pub fn total_ticks(&self) -> usize {
        self.time_sig.total_ticks()
    }

    /// A deserialized sequence must carry a sane time signature and a
    /// grid that agrees with it; loaders reject the file otherwise
    /// instead of handing out a sequence that would index out of
    /// bounds.
    pub fn validate(&self) -> Result<(), SeqError> {
        self.time_sig.validate()?;
        let expected = self.time_sig.total_ticks();
        let found = self.note_grid.len();
        if expected != found {
            return Err(SeqError::GridMismatch { expected, found });
        }
        Ok(())
    }

    /// Record a note at `tick`. Never fails: a full bucket drops its
    /// oldest note to make room, and an out-of-range tick (only
    /// possible with a corrupt grid) is logged and ignored.
    pub fn add_note(&mut self, tick: usize, note: Note) {
        let Some(bucket) = self.note_grid.get_mut(tick) else {
            log::warn!("add_note: tick {tick} outside note grid");
            return;
        };
        if bucket.len() >= MAX_POLYPHONY {
            log::warn!("polyphony overflow at tick {tick}, dropping oldest note");
            bucket.remove(0);
        }
        bucket.push(note);
        self.history.push(tick);
        log::debug!("added note {} at tick {tick}", note.0);
    }

    /// Undo the most recent `add_note`. No-op when nothing has been
    /// recorded since the last clear/load.
    pub fn delete_last(&mut self) {
        let Some(tick) = self.history.pop() else {
            return;
        };
        if let Some(bucket) = self.note_grid.get_mut(tick) {
            bucket.pop();
        }
        log::debug!("deleted last note from tick {tick}");
    }

    /// Empty every bucket and the history; the time signature stays.
    pub fn clear(&mut self) {
        for bucket in &mut self.note_grid {
            bucket.clear();
        }
        self.history.clear();
    }

    /// Bucket lookup for playback. `None` when the tick is outside
    /// the grid, which callers treat as a recoverable condition.
    pub fn notes_at(&self, tick: usize) -> Option<&[Note]> {
        self.note_grid.get(tick).map(Vec::as_slice)
    }

    /// Whether anything has been recorded since creation/clear/load.
    pub fn is_modified(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn note_count(&self) -> usize {
        self.note_grid.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq() -> Sequence {
        Sequence::new(TimeSignature::new(1, 4, 2).unwrap())
    }

    #[test]
    fn add_and_lookup() {
        let mut s = seq();
        s.add_note(3, Note(40));
        s.add_note(3, Note(41));
        assert_eq!(s.notes_at(3).unwrap(), &[Note(40), Note(41)]);
        assert_eq!(s.notes_at(0).unwrap(), &[]);
        assert!(s.notes_at(8).is_none());
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut s = seq();
        for i in 0..MAX_POLYPHONY as u8 {
            s.add_note(0, Note(36 + i));
        }
        s.add_note(0, Note(99));
        let bucket = s.notes_at(0).unwrap();
        assert_eq!(bucket.len(), MAX_POLYPHONY);
        assert_eq!(bucket[0], Note(37));
        assert_eq!(*bucket.last().unwrap(), Note(99));
    }

    #[test]
    fn delete_last_is_lifo() {
        let mut s = seq();
        s.add_note(1, Note(36));
        s.add_note(5, Note(37));
        s.delete_last();
        assert_eq!(s.notes_at(5).unwrap(), &[]);
        assert_eq!(s.notes_at(1).unwrap(), &[Note(36)]);
        s.delete_last();
        assert_eq!(s.notes_at(1).unwrap(), &[]);
        // nothing left to delete; must not panic
        s.delete_last();
        assert!(!s.is_modified());
    }

    #[test]
    fn clear_keeps_the_signature() {
        let mut s = seq();
        s.add_note(2, Note(38));
        s.clear();
        assert_eq!(s.note_count(), 0);
        assert!(!s.is_modified());
        assert_eq!(s.total_ticks(), 8);
    }

    #[test]
    fn json_round_trip_preserves_grid() {
        let mut s = seq();
        for tick in [0usize, 3, 7] {
            s.add_note(tick, Note(36 + tick as u8));
        }
        let json = serde_json::to_string(&s).unwrap();
        let loaded: Sequence = serde_json::from_str(&json).unwrap();
        loaded.validate().unwrap();
        assert_eq!(loaded.time_sig(), s.time_sig());
        for tick in 0..s.total_ticks() {
            assert_eq!(loaded.notes_at(tick), s.notes_at(tick));
        }
        // history is runtime-only, so a loaded sequence has no undo
        assert!(!loaded.is_modified());
    }

    #[test]
    fn zero_signature_fails_validation() {
        // a file like this must never reach the clock
        let json = r#"{
            "time_sig": {"measures": 0, "beats_per_measure": 4, "sub_beats_per_beat": 2},
            "note_grid": []
        }"#;
        let loaded: Sequence = serde_json::from_str(json).unwrap();
        assert!(loaded.validate().is_err());
    }

    #[test]
    fn mismatched_grid_fails_validation() {
        let json = r#"{
            "time_sig": {"measures": 1, "beats_per_measure": 4, "sub_beats_per_beat": 2},
            "note_grid": [[36], [], []]
        }"#;
        let loaded: Sequence = serde_json::from_str(json).unwrap();
        assert_eq!(
            loaded.validate(),
            Err(SeqError::GridMismatch {
                expected: 8,
                found: 3
            })
        );
    }
}
