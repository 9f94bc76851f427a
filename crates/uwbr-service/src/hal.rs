//! Radio HAL boundary.
//!
//! Everything below this trait is the vendor's problem: binary command
//! framing, firmware quirks, transport plumbing. The service only sees raw
//! status codes (translated by `uwbr-core`), opaque vendor payloads, and the
//! [`RadioEvent`] stream the HAL feeds into the registry's serializer.

use async_trait::async_trait;
use tokio::sync::mpsc;

use uwbr_core::{
    Controlee, DeviceState, Error, MulticastAction, RangingMeasurements, ReasonCode, Result,
    SessionId, SessionParams, SessionState, SessionType, StatusCode,
};

/// Capture mode of the radio's command/response logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerMode {
    /// No capture.
    Disabled,
    /// Capture with key material and payloads redacted.
    Filtered,
    /// Full capture.
    Unfiltered,
}

/// ISO 3166-1 alpha-2 country code for regulatory configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryCode([u8; 2]);

impl CountryCode {
    /// Validate and wrap a 2-letter country code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] unless both bytes are ASCII
    /// uppercase letters.
    pub fn new(code: [u8; 2]) -> Result<Self> {
        if code.iter().all(u8::is_ascii_uppercase) {
            Ok(Self(code))
        } else {
            Err(Error::BadParameters)
        }
    }

    /// Raw code bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Validated ASCII on construction.
        write!(f, "{}{}", self.0[0] as char, self.0[1] as char)
    }
}

/// Radio power statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStats {
    /// Status of the statistics query itself.
    pub status: StatusCode,
    /// Time spent idle, in milliseconds.
    pub idle_time_ms: u32,
    /// Time spent transmitting, in milliseconds.
    pub tx_time_ms: u32,
    /// Time spent receiving, in milliseconds.
    pub rx_time_ms: u32,
    /// Number of wake-ups from deep sleep.
    pub total_wake_count: u32,
}

/// Firmware and stack version identification reported by the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Status of the query itself.
    pub status: StatusCode,
    /// Command-interface version.
    pub uci_version: u16,
    /// MAC layer version.
    pub mac_version: u16,
    /// PHY layer version.
    pub phy_version: u16,
    /// Test-interface version.
    pub uci_test_version: u16,
    /// Opaque vendor-specific identification bytes.
    pub vendor_spec_info: Vec<u8>,
}

/// One capability entry reported by the radio, forwarded untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapTlv {
    /// Capability type.
    pub typ: u8,
    /// Raw capability value.
    pub value: Vec<u8>,
}

/// One device-level configuration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfigTlv {
    /// Configuration parameter id.
    pub cfg_id: u8,
    /// Raw parameter value.
    pub value: Vec<u8>,
}

/// An opaque vendor command or notification.
///
/// Identified by a group/operation id pair; the payload is never interpreted
/// by this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorMessage {
    /// Command group id.
    pub gid: u32,
    /// Operation id within the group.
    pub oid: u32,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

/// Completed-round data as the radio reports it, before sequence stamping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRangeData {
    /// Session the round belongs to.
    pub session_id: SessionId,
    /// Ranging interval in effect for the round, in milliseconds.
    pub ranging_interval_ms: u32,
    /// Type-tagged per-peer measurements.
    pub measurements: RangingMeasurements,
}

/// Asynchronous events emitted by the radio.
///
/// These enter the registry through its event channel - the same serializer
/// that processes commands - never via callback re-entrancy.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    /// Coarse device state changed (also reports reset outcomes).
    DeviceStatus(DeviceState),
    /// A session's state changed on the device.
    SessionStatus {
        /// Affected session.
        session_id: SessionId,
        /// New state.
        state: SessionState,
        /// Diagnostic reason for the change.
        reason: ReasonCode,
    },
    /// A ranging round completed.
    RangeData(RawRangeData),
    /// Vendor-specific notification, passed through opaquely.
    Vendor(VendorMessage),
}

/// The radio HAL contract.
///
/// Methods resolve to raw [`StatusCode`]s; translation into the client
/// vocabulary happens in the registry so that every path through the service
/// shares one translator. Implementations must not block; slow hardware is
/// bounded by the registry's command timeout.
#[async_trait]
pub trait RadioHal: Send + 'static {
    /// Power the radio on. Events flow through `events` until `close`.
    async fn open(&mut self, events: mpsc::UnboundedSender<RadioEvent>) -> StatusCode;

    /// Power the radio off. `force` skips graceful session teardown.
    async fn close(&mut self, force: bool) -> StatusCode;

    /// Hard-reset the radio. Every device-side session is destroyed; the
    /// reset outcome is also reported through a device status event.
    async fn device_reset(&mut self) -> StatusCode;

    /// Configure the radio's command/response capture.
    async fn set_logger_mode(&mut self, mode: LoggerMode) -> StatusCode;

    /// Push the regulatory country code.
    async fn set_country_code(&mut self, code: CountryCode) -> StatusCode;

    /// Query power statistics.
    async fn power_stats(&mut self) -> PowerStats;

    /// Query firmware and stack version identification.
    async fn device_info(&mut self) -> DeviceInfo;

    /// Query device capabilities.
    async fn caps_info(&mut self) -> (StatusCode, Vec<CapTlv>);

    /// Push device-level configuration.
    async fn set_device_config(&mut self, tlvs: Vec<DeviceConfigTlv>) -> StatusCode;

    /// Read device-level configuration by parameter id.
    async fn get_device_config(&mut self, cfg_ids: Vec<u8>) -> (StatusCode, Vec<DeviceConfigTlv>);

    /// Number of ranging rounds attempted by a device-side session.
    async fn ranging_count(&mut self, session_id: SessionId) -> (StatusCode, u32);

    /// Create a device-side session.
    async fn session_init(&mut self, session_id: SessionId, session_type: SessionType)
    -> StatusCode;

    /// Destroy a device-side session.
    async fn session_deinit(&mut self, session_id: SessionId) -> StatusCode;

    /// Push the session configuration.
    async fn set_app_config(&mut self, session_id: SessionId, params: &SessionParams)
    -> StatusCode;

    /// Start ranging rounds.
    async fn session_start(&mut self, session_id: SessionId) -> StatusCode;

    /// Stop ranging rounds.
    async fn session_stop(&mut self, session_id: SessionId) -> StatusCode;

    /// Push a multicast list edit to the device.
    async fn update_multicast_list(
        &mut self,
        session_id: SessionId,
        action: MulticastAction,
        batch: &[Controlee],
    ) -> StatusCode;

    /// Send an opaque vendor command; returns the status and response payload.
    async fn raw_vendor_cmd(
        &mut self,
        gid: u32,
        oid: u32,
        payload: Vec<u8>,
    ) -> (StatusCode, Vec<u8>);
}
