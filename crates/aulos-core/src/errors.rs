use crate::format::AudioFormat;

/// Errors surfaced synchronously by mutating operations on the engine.
///
/// Recoverable background conditions (underrun, source exhaustion) are
/// reported as player events, never as errors: they occur on the scheduler
/// thread where there is no synchronous caller.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("byte count {bytes} is not aligned to the {frame}-byte frame")]
    Misaligned { bytes: u64, frame: u64 },

    #[error("source is not seekable")]
    NotSeekable,

    #[error("audio format mismatch: expected {expected}, got {actual}")]
    FormatMismatch {
        expected: AudioFormat,
        actual: AudioFormat,
    },

    #[error("operation not allowed while {state}")]
    InvalidState { state: &'static str },
}

pub type SyncResult<T> = Result<T, SyncError>;
