//! Error types for sigframe operations

use crate::modem::ModulationScheme;
use crate::scheme::{CrcScheme, FecScheme};

/// Errors raised while configuring codecs, generators and synchronizers.
///
/// Channel conditions never produce one of these: a corrupted header or
/// payload is reported through the `valid` flag of the decode result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// A scheme name did not match any registered identifier
    #[error("Unknown scheme name: {0:?}")]
    UnknownSchemeName(String),

    /// The error-detection scheme cannot be used to build a codec
    #[error("Unsupported error-detection scheme: {0}")]
    UnsupportedCrc(CrcScheme),

    /// The FEC scheme is unknown or has no codec implementation
    #[error("Unsupported FEC scheme: {0}")]
    UnsupportedFec(FecScheme),

    /// The modulation scheme is unknown
    #[error("Unsupported modulation scheme: {0}")]
    UnsupportedModulation(ModulationScheme),

    /// A buffer passed to an encode/decode call has the wrong size
    #[error("Length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// The number of bytes the configuration requires.
        expected: usize,
        /// The number of bytes actually supplied.
        actual: usize,
    },

    /// Payload size exceeds what the frame header can declare
    #[error("Payload size {0} exceeds maximum {1}")]
    PayloadTooLarge(usize, usize),

    /// Invalid construction parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl FrameError {
    /// Shorthand for a [`FrameError::LengthMismatch`] check
    pub(crate) fn check_len(expected: usize, actual: usize) -> crate::Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(FrameError::LengthMismatch { expected, actual })
        }
    }
}
