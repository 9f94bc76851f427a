//! Error vocabulary for the ranging service.
//!
//! The service exposes a deliberately small, closed error vocabulary to
//! clients. Every status or reason code the radio can produce - including
//! vendor-specific and reserved codes - translates into exactly one of these
//! variants (or into success). The raw diagnostic code is preserved in logs
//! by the translator in [`crate::status`], never in this type.

use thiserror::Error;

/// Client-facing errors of the ranging service.
///
/// Variants map one-to-one onto the response status vocabulary of the
/// service boundary. `Unknown` is the fallback bucket: the translator is
/// total, so unrecognized radio codes land here rather than failing.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// Malformed request, or a request that is not legal in the current
    /// session or device state.
    #[error("bad parameters or out-of-state request")]
    BadParameters,

    /// The device-wide cap on concurrently live sessions is reached.
    #[error("maximum session count exceeded")]
    MaxSessionsExceeded,

    /// The ranging-round retry limit was reached.
    #[error("maximum ranging-round retry count reached")]
    MaxRetryReached,

    /// Opaque failure inside the underlying protocol stack.
    #[error("protocol-specific failure")]
    ProtocolSpecific,

    /// The remote peer requested the change.
    #[error("remote device requested the change")]
    RemoteRequest,

    /// No response from the radio within the command window.
    #[error("command timed out")]
    Timeout,

    /// The radio asked for the command to be resubmitted. This layer never
    /// retries automatically; the signal is forwarded to the caller.
    #[error("command retry requested")]
    CommandRetry,

    /// A live session already owns the requested session id.
    #[error("duplicated session id")]
    DuplicateSessionId,

    /// Fallback bucket for anything the translator cannot classify.
    #[error("unknown error")]
    Unknown,
}

impl Error {
    /// Returns true if the caller may reasonably resubmit the same command.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Timeout | Error::CommandRetry)
    }
}

/// Result type for ranging service operations.
pub type Result<T> = std::result::Result<T, Error>;
