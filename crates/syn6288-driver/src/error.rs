//! Error types for SYN6288 driver operations

use std::path::PathBuf;
use syn6288_chip::{FrameError, TextType};
use thiserror::Error;

/// Result type alias for SYN6288 operations
pub type Result<T> = std::result::Result<T, Syn6288Error>;

/// Errors that can occur while talking to a SYN6288
#[derive(Debug, Error)]
pub enum Syn6288Error {
    /// Serial device node does not exist
    #[error("Serial port not found: {path}")]
    PortNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// I/O error on the serial port
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// A UART primitive (init, deinit, flush, write, read) failed
    #[error("UART {op} failed: {reason}")]
    Uart {
        /// UART operation that failed
        op: &'static str,
        /// Reason for failure
        reason: String,
    },

    /// Operation attempted before `init()` or after `deinit()`
    #[error("Handle is not initialized")]
    NotInitialized,

    /// Text or inline command exceeds the frame payload limit
    #[error("Text is too long: {len} bytes (max {max})")]
    TextTooLong {
        /// Payload length
        len: usize,
        /// Maximum accepted
        max: usize,
    },

    /// Numeric parameter out of range; nothing was sent
    #[error("Invalid {name}: {value} (max {max})")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Rejected value
        value: u8,
        /// Highest accepted value
        max: u8,
    },

    /// Text cannot be represented in the selected encoding
    #[error("Cannot encode text as {text_type}: {reason}")]
    Encoding {
        /// Active text type
        text_type: TextType,
        /// Reason for failure
        reason: String,
    },

    /// Malformed frame
    #[error("Frame error: {0}")]
    Frame(FrameError),

    /// Chip answered with fewer bytes than expected
    #[error("Short read after {command}: expected {expected} bytes, got {got}")]
    ShortRead {
        /// Command being answered
        command: &'static str,
        /// Bytes expected
        expected: usize,
        /// Bytes received
        got: usize,
    },

    /// Chip answered with something other than an acknowledgement
    #[error("Unexpected response to {command}: {got:02X?}")]
    UnexpectedResponse {
        /// Command being answered
        command: &'static str,
        /// Bytes received
        got: Vec<u8>,
    },

    /// Chip is still playing
    #[error("Chip is busy")]
    Busy,

    /// Chip did not become idle in time
    #[error("Chip still busy after {polls} status polls")]
    Timeout {
        /// Number of polls made
        polls: u32,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {reason}")]
    Config {
        /// Reason for failure
        reason: String,
    },

    /// A self-test check did not read back what was written
    #[error("Self test failed: {check}")]
    SelfTestFailed {
        /// Check that failed
        check: String,
    },
}

impl Syn6288Error {
    /// Create a port not found error
    pub fn port_not_found(path: impl Into<PathBuf>) -> Self {
        Self::PortNotFound { path: path.into() }
    }

    /// Create a UART failure error
    pub fn uart(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Uart {
            op,
            reason: reason.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(text_type: TextType, reason: impl Into<String>) -> Self {
        Self::Encoding {
            text_type,
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a self-test failure
    pub fn self_test_failed(check: impl Into<String>) -> Self {
        Self::SelfTestFailed {
            check: check.into(),
        }
    }
}

impl From<FrameError> for Syn6288Error {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::PayloadTooLong { len, max } => Self::TextTooLong { len, max },
            other => Self::Frame(other),
        }
    }
}
