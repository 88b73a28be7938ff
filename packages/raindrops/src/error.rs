/// Errors returned by the converter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// Zero is divisible by every factor and has no defined sound.
    #[error("input must be a positive integer, got 0")]
    Zero,

    /// The output buffer cannot hold the sound.
    #[error("output buffer too small: need {needed} bytes, have {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },
}
