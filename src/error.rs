//! Error types for loudness analysis and normalization

use thiserror::Error;

/// Result type for loudness engine operations
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that can occur while driving the DSP engine
///
/// The engine itself only ever returns [`LoudnessError::InvalidInput`]; the
/// remaining variants exist so that adapters built on top of this crate
/// (container demux, file I/O) can surface their own failures through the
/// same error type.
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// Malformed call shape: zero samples, a sample rate outside
    /// [8000, 384000] Hz, a channel count outside [1, 8], or a buffer
    /// length not divisible by the channel count.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Not enough data for a meaningful measurement. The engine degrades to
    /// a unit-gain result rather than returning this as an `Err`; adapters
    /// may attach it as a warning alongside that result.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Reserved for the enclosing adapter (decoder/encoder/file I/O
    /// failures). The DSP core never produces this variant itself.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// Generic IO error, for adapters that want one conversion path.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
