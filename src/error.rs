//! Crate-wide error type.
//!
//! Every fallible operation in this crate returns `Result<_, Error>`.  Errors
//! are loud by design: dimension mismatches and bad indices fail instead of
//! being silently coerced, so a wiring bug surfaces at the call site rather
//! than as a quietly wrong model.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A context or arm vector had the wrong length for the model.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Selection was asked to choose from an empty arm set.
    #[error("no arms configured")]
    NoArms,

    /// An arm id was not present in the arm set.
    #[error("unknown arm id {0:?}")]
    UnknownArm(String),

    /// A reward referenced a decision index the history has never issued.
    #[error("history index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A snapshot was restored into a model of a different kind.
    #[error("snapshot kind mismatch: expected {expected}, got {actual}")]
    SnapshotKind {
        expected: &'static str,
        actual: &'static str,
    },

    /// A snapshot carried non-finite weights.
    #[error("snapshot contains non-finite values")]
    CorruptSnapshot,

    /// `start` was called on a server that is already running.
    #[error("server already started")]
    AlreadyStarted,

    /// `start` or `stop` was called on a server that has already stopped.
    #[error("server already stopped")]
    AlreadyStopped,

    /// The worker thread panicked; the bandit it owned is gone.
    #[error("worker thread panicked")]
    WorkerPanicked,

    /// Reading or writing a weights file failed.
    #[error("weights io: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding a weights snapshot or arm file failed.
    #[error("weights encoding: {0}")]
    Json(#[from] serde_json::Error),
}
