//! Status and reason code translation.
//!
//! The radio reports outcomes through an open, vendor-extensible 8-bit code
//! space. This module models that space as tagged variants with explicit
//! catch-alls for the reserved and vendor sub-ranges, so the raw byte is
//! always preserved for diagnostics, and translates it into the closed
//! [`Error`](crate::Error) vocabulary the service exposes.
//!
//! The translation is pure, stateless, and total: `from_raw` is defined for
//! every representable byte, and a reserved or vendor code never translates
//! to success.

use crate::error::{Error, Result};

/// Command and measurement status codes reported by the radio.
///
/// Codes with a defined meaning get a named variant. Everything in the
/// vendor sub-range (`0xE0..=0xFF`) collapses into [`StatusCode::Vendor`],
/// every other unassigned value into [`StatusCode::Reserved`]; both keep the
/// raw byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// Command succeeded.
    Ok,
    /// Command rejected in the current device state.
    Rejected,
    /// Command failed for an unspecified reason.
    Failed,
    /// Command payload was syntactically invalid.
    SyntaxError,
    /// A parameter value was invalid.
    InvalidParam,
    /// A parameter value was out of range.
    InvalidRange,
    /// Command payload size was invalid.
    InvalidMessageSize,
    /// Unknown command group id.
    UnknownGid,
    /// Unknown command operation id.
    UnknownOid,
    /// Attempted write to a read-only parameter.
    ReadOnly,
    /// The radio asks for the command to be resent.
    CommandRetry,
    /// Referenced session id does not exist on the device.
    SessionNotExist,
    /// Session id already exists on the device.
    SessionDuplicate,
    /// Session is active and the command requires it idle.
    SessionActive,
    /// Device-side session capacity exhausted.
    MaxSessionsExceeded,
    /// Session is missing mandatory configuration.
    SessionNotConfigured,
    /// Other sessions are still active.
    ActiveSessionsOngoing,
    /// Multicast controlee list is at device capacity.
    MulticastListFull,
    /// Controlee address not found in the multicast list.
    AddressNotFound,
    /// Controlee address already present in the multicast list.
    AddressAlreadyPresent,
    /// Ranging transmission failed.
    RangingTxFailed,
    /// Ranging reception timed out.
    RangingRxTimeout,
    /// PHY decode failed on reception.
    RangingRxPhyDecFailed,
    /// PHY time-of-arrival detection failed.
    RangingRxPhyToaFailed,
    /// PHY STS mismatch on reception.
    RangingRxPhyStsFailed,
    /// MAC decode failed on reception.
    RangingRxMacDecFailed,
    /// MAC information-element decode failed.
    RangingRxMacIeDecFailed,
    /// Expected MAC information element missing.
    RangingRxMacIeMissing,
    /// Unassigned code; raw value preserved for diagnostics.
    Reserved(u8),
    /// Vendor-specific code (`0xE0..=0xFF`); raw value preserved.
    Vendor(u8),
}

impl StatusCode {
    /// Decode a raw status byte. Total: every byte maps to a variant.
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => Self::Ok,
            0x01 => Self::Rejected,
            0x02 => Self::Failed,
            0x03 => Self::SyntaxError,
            0x04 => Self::InvalidParam,
            0x05 => Self::InvalidRange,
            0x06 => Self::InvalidMessageSize,
            0x07 => Self::UnknownGid,
            0x08 => Self::UnknownOid,
            0x09 => Self::ReadOnly,
            0x0A => Self::CommandRetry,
            0x11 => Self::SessionNotExist,
            0x12 => Self::SessionDuplicate,
            0x13 => Self::SessionActive,
            0x14 => Self::MaxSessionsExceeded,
            0x15 => Self::SessionNotConfigured,
            0x16 => Self::ActiveSessionsOngoing,
            0x17 => Self::MulticastListFull,
            0x18 => Self::AddressNotFound,
            0x19 => Self::AddressAlreadyPresent,
            0x20 => Self::RangingTxFailed,
            0x21 => Self::RangingRxTimeout,
            0x22 => Self::RangingRxPhyDecFailed,
            0x23 => Self::RangingRxPhyToaFailed,
            0x24 => Self::RangingRxPhyStsFailed,
            0x25 => Self::RangingRxMacDecFailed,
            0x26 => Self::RangingRxMacIeDecFailed,
            0x27 => Self::RangingRxMacIeMissing,
            0xE0..=0xFF => Self::Vendor(raw),
            other => Self::Reserved(other),
        }
    }

    /// Encode back to the raw status byte.
    #[must_use]
    pub fn as_raw(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::Rejected => 0x01,
            Self::Failed => 0x02,
            Self::SyntaxError => 0x03,
            Self::InvalidParam => 0x04,
            Self::InvalidRange => 0x05,
            Self::InvalidMessageSize => 0x06,
            Self::UnknownGid => 0x07,
            Self::UnknownOid => 0x08,
            Self::ReadOnly => 0x09,
            Self::CommandRetry => 0x0A,
            Self::SessionNotExist => 0x11,
            Self::SessionDuplicate => 0x12,
            Self::SessionActive => 0x13,
            Self::MaxSessionsExceeded => 0x14,
            Self::SessionNotConfigured => 0x15,
            Self::ActiveSessionsOngoing => 0x16,
            Self::MulticastListFull => 0x17,
            Self::AddressNotFound => 0x18,
            Self::AddressAlreadyPresent => 0x19,
            Self::RangingTxFailed => 0x20,
            Self::RangingRxTimeout => 0x21,
            Self::RangingRxPhyDecFailed => 0x22,
            Self::RangingRxPhyToaFailed => 0x23,
            Self::RangingRxPhyStsFailed => 0x24,
            Self::RangingRxMacDecFailed => 0x25,
            Self::RangingRxMacIeDecFailed => 0x26,
            Self::RangingRxMacIeMissing => 0x27,
            Self::Reserved(raw) | Self::Vendor(raw) => raw,
        }
    }

    /// Returns true if the code reports success.
    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Translate into the closed client-facing vocabulary.
    ///
    /// Defined codes map one-to-one. Vendor codes collapse into
    /// [`Error::ProtocolSpecific`], reserved codes into [`Error::Unknown`];
    /// neither ever maps to success.
    ///
    /// # Errors
    ///
    /// Returns the translated [`Error`] for every non-`Ok` code.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Ok => Ok(()),
            Self::SyntaxError
            | Self::InvalidParam
            | Self::InvalidRange
            | Self::InvalidMessageSize
            | Self::UnknownGid
            | Self::UnknownOid
            | Self::ReadOnly
            | Self::SessionNotExist
            | Self::SessionActive
            | Self::SessionNotConfigured
            | Self::ActiveSessionsOngoing
            | Self::MulticastListFull
            | Self::AddressNotFound
            | Self::AddressAlreadyPresent => Err(Error::BadParameters),
            Self::SessionDuplicate => Err(Error::DuplicateSessionId),
            Self::MaxSessionsExceeded => Err(Error::MaxSessionsExceeded),
            Self::CommandRetry => Err(Error::CommandRetry),
            Self::RangingRxTimeout => Err(Error::Timeout),
            Self::Rejected
            | Self::Failed
            | Self::RangingTxFailed
            | Self::RangingRxPhyDecFailed
            | Self::RangingRxPhyToaFailed
            | Self::RangingRxPhyStsFailed
            | Self::RangingRxMacDecFailed
            | Self::RangingRxMacIeDecFailed
            | Self::RangingRxMacIeMissing
            | Self::Vendor(_) => Err(Error::ProtocolSpecific),
            Self::Reserved(_) => Err(Error::Unknown),
        }
    }
}

/// Reason codes attached to session state change notifications.
///
/// Same open-space treatment as [`StatusCode`]: defined reasons get named
/// variants, the vendor sub-range (`0x80..=0xFF`) and unassigned values keep
/// the raw byte in their catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    /// State changed by an explicit session management command.
    StateChangeWithSessionManagementCommands,
    /// The ranging-round retry limit was reached.
    MaxRangingRoundRetryCountReached,
    /// The configured measurement count was reached.
    MaxNumberOfMeasurementsReached,
    /// Session suspended by an in-band signal from the remote peer.
    SessionSuspendedViaInBandSignal,
    /// Session resumed by an in-band signal from the remote peer.
    SessionResumedViaInBandSignal,
    /// Configured slot length is not supported.
    ErrorSlotLengthNotSupported,
    /// Not enough slots per ranging round.
    ErrorInsufficientSlots,
    /// Configured MAC address mode is not supported.
    ErrorMacAddressModeNotSupported,
    /// Configured ranging interval is invalid.
    ErrorInvalidRangingInterval,
    /// Configured STS mode is invalid.
    ErrorInvalidStsConfig,
    /// Configured RFRAME mode is invalid.
    ErrorInvalidRframeConfig,
    /// Unassigned reason; raw value preserved for diagnostics.
    Reserved(u8),
    /// Vendor-specific reason (`0x80..=0xFF`); raw value preserved.
    Vendor(u8),
}

impl ReasonCode {
    /// Decode a raw reason byte. Total: every byte maps to a variant.
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => Self::StateChangeWithSessionManagementCommands,
            0x01 => Self::MaxRangingRoundRetryCountReached,
            0x02 => Self::MaxNumberOfMeasurementsReached,
            0x03 => Self::SessionSuspendedViaInBandSignal,
            0x04 => Self::SessionResumedViaInBandSignal,
            0x20 => Self::ErrorSlotLengthNotSupported,
            0x21 => Self::ErrorInsufficientSlots,
            0x22 => Self::ErrorMacAddressModeNotSupported,
            0x23 => Self::ErrorInvalidRangingInterval,
            0x24 => Self::ErrorInvalidStsConfig,
            0x25 => Self::ErrorInvalidRframeConfig,
            0x80..=0xFF => Self::Vendor(raw),
            other => Self::Reserved(other),
        }
    }

    /// Encode back to the raw reason byte.
    #[must_use]
    pub fn as_raw(self) -> u8 {
        match self {
            Self::StateChangeWithSessionManagementCommands => 0x00,
            Self::MaxRangingRoundRetryCountReached => 0x01,
            Self::MaxNumberOfMeasurementsReached => 0x02,
            Self::SessionSuspendedViaInBandSignal => 0x03,
            Self::SessionResumedViaInBandSignal => 0x04,
            Self::ErrorSlotLengthNotSupported => 0x20,
            Self::ErrorInsufficientSlots => 0x21,
            Self::ErrorMacAddressModeNotSupported => 0x22,
            Self::ErrorInvalidRangingInterval => 0x23,
            Self::ErrorInvalidStsConfig => 0x24,
            Self::ErrorInvalidRframeConfig => 0x25,
            Self::Reserved(raw) | Self::Vendor(raw) => raw,
        }
    }

    /// Translate into the closed client-facing vocabulary.
    ///
    /// Used when a reason must be surfaced as a command response, e.g. when a
    /// radio-initiated stop races an in-flight command.
    #[must_use]
    pub fn as_error(self) -> Error {
        match self {
            Self::StateChangeWithSessionManagementCommands => Error::BadParameters,
            Self::MaxRangingRoundRetryCountReached => Error::MaxRetryReached,
            Self::MaxNumberOfMeasurementsReached
            | Self::SessionSuspendedViaInBandSignal
            | Self::SessionResumedViaInBandSignal => Error::RemoteRequest,
            Self::ErrorSlotLengthNotSupported
            | Self::ErrorInsufficientSlots
            | Self::ErrorMacAddressModeNotSupported
            | Self::ErrorInvalidRangingInterval
            | Self::ErrorInvalidStsConfig
            | Self::ErrorInvalidRframeConfig => Error::BadParameters,
            Self::Vendor(_) => Error::ProtocolSpecific,
            Self::Reserved(_) => Error::Unknown,
        }
    }
}

/// Coarse operating state of the radio, independent of any session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceState {
    /// Device is initialized and can accept session commands.
    Ready,
    /// At least one session is actively ranging.
    Active,
    /// Device hit an unrecoverable error; session commands are refused
    /// until it reports ready again.
    Error,
}
