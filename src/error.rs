use thiserror::Error;

/// Recoverable sequencer errors. Anything here is reported to the
/// control layer and leaves the running state untouched; construction
/// errors (bad time signature) are fatal to startup instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeqError {
    #[error("invalid time signature: {0}")]
    InvalidTimeSignature(&'static str),

    #[error("bank slot {0} is empty")]
    SlotEmpty(usize),

    #[error("bank slot {0} is out of range")]
    SlotOutOfRange(usize),

    #[error("note grid has {found} ticks but the time signature needs {expected}")]
    GridMismatch { expected: usize, found: usize },
}
