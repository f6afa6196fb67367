// Fixed-size slot storage for whole sequences.

use crate::error::SeqError;
use crate::seq::sequence::Sequence;
use crate::shared::NUM_BANK_SLOTS;

/// Ten independent slots for storing and recalling sequences.
///
/// The bank always works with copies: storing clones the live
/// sequence in, recalling clones the stored one out. The editor can
/// never alias a slot, so later edits don't corrupt what was saved.
pub struct SequenceBank {
    slots: [Option<Sequence>; NUM_BANK_SLOTS],
}

impl SequenceBank {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    pub fn store(&mut self, slot: usize, sequence: &Sequence) -> Result<(), SeqError> {
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(SeqError::SlotOutOfRange(slot))?;
        *entry = Some(sequence.clone());
        Ok(())
    }

    pub fn recall(&self, slot: usize) -> Result<Sequence, SeqError> {
        self.slots
            .get(slot)
            .ok_or(SeqError::SlotOutOfRange(slot))?
            .clone()
            .ok_or(SeqError::SlotEmpty(slot))
    }

    pub fn is_empty(&self, slot: usize) -> bool {
        !matches!(self.slots.get(slot), Some(Some(_)))
    }
}

impl Default for SequenceBank {
    fn default() -> Self {
        Self::new()
    }
}
