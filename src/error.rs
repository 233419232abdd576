//! Error types for the GivEnergy framer and client
//!
//! Framing failures are kept in their own enum so callers can make
//! per-kind recovery decisions (terminate the session, scan for the next
//! sentinel) without string matching.

use thiserror::Error;

/// Result type for crate-level operations
pub type GivResult<T> = std::result::Result<T, GivEnergyError>;

/// Framing and codec errors
///
/// Every decode failure is terminal for the currently buffered data: the
/// decoder never drops bytes and retries on its own. Recovery is the
/// caller's policy (see [`crate::frame::RecoveryStrategy`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Header sentinels did not match - the stream is desynchronized
    #[error("header sentinel mismatch: h1={h1:#010x} h2={h2:#06x}")]
    BadHeader { h1: u32, h2: u16 },

    /// Declared frame length is implausible (corrupt or malicious length field)
    #[error("declared frame length {declared} outside sane range {min}..={max}")]
    LengthOverflow {
        declared: usize,
        min: usize,
        max: usize,
    },

    /// Function code is not one of the supported codes
    #[error("unknown function code {0:#04x}")]
    UnknownFunction(u8),

    /// Frame checksum did not match the recomputed value
    #[error("checksum mismatch: computed {computed:#06x}, frame carries {received:#06x}")]
    ChecksumMismatch { computed: u16, received: u16 },

    /// Caller-side encode misuse; never touches the wire
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Crate-level errors covering the framer plus the transport/client layers
#[derive(Debug, Error)]
pub enum GivEnergyError {
    /// Framing error
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Connection errors
    #[error("connection error: {0}")]
    Connection(String),

    /// Not connected
    #[error("not connected")]
    NotConnected,

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// Timeout errors
    #[error("timeout: {0}")]
    Timeout(String),

    /// Device returned an exception response
    #[error("device exception for function {function:#04x}")]
    Exception { function: u8 },

    /// Protocol-level errors outside the frame taxonomy
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<std::io::Error> for GivEnergyError {
    fn from(err: std::io::Error) -> Self {
        GivEnergyError::Io(err.to_string())
    }
}
