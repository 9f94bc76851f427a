//! Public service facade.
//!
//! [`RangingService::spawn`] wires the registry task and the notification
//! driver together and hands back a cheaply cloneable handle. Every method
//! posts one command to the registry and awaits its response, so callers see
//! the same total order the registry executes.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use uwbr_core::{
    Controlee, DeviceState, Error, MulticastAction, Result, SessionId, SessionParams,
    SessionState, SessionType,
};

use crate::hal::{
    CapTlv, CountryCode, DeviceConfigTlv, DeviceInfo, LoggerMode, PowerStats, RadioHal,
};
use crate::notification::{NotificationDriver, NotificationHandler};
use crate::registry::{Command, Registry, Responder};

/// Service tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Maximum number of concurrently live sessions.
    pub max_sessions: usize,
    /// Maximum multicast controlee list size per session.
    pub max_controlees: usize,
    /// Per-command radio response window.
    pub command_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_sessions: 5,
            max_controlees: 8,
            command_timeout: Duration::from_millis(800),
        }
    }
}

/// Cloneable async handle to the ranging service.
///
/// Dropping every clone shuts the registry task down; in-flight commands
/// still complete.
#[derive(Debug, Clone)]
pub struct RangingService {
    commands: mpsc::UnboundedSender<Command>,
}

impl RangingService {
    /// Spawn the service over `hal`, delivering notifications to `handler`.
    pub fn spawn<H, N>(hal: H, handler: N, config: ServiceConfig) -> Self
    where
        H: RadioHal,
        N: NotificationHandler,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();

        tokio::spawn(NotificationDriver::new(handler, notification_rx).run());
        tokio::spawn(Registry::new(hal, config, command_rx, notification_tx).run());

        Self { commands: command_tx }
    }

    /// Post one command and await the registry's answer.
    async fn request<T>(&self, build: impl FnOnce(Responder<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(build(tx)).map_err(|_| Error::Unknown)?;
        rx.await.map_err(|_| Error::Unknown)?
    }

    /// Power the radio on and start accepting session commands.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] if already enabled, or the translated
    /// radio error if the power-up failed.
    pub async fn enable(&self) -> Result<()> {
        self.request(|resp| Command::Enable { resp }).await
    }

    /// Power the radio off, releasing every live session. `force` skips
    /// graceful teardown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] if not enabled.
    pub async fn disable(&self, force: bool) -> Result<()> {
        self.request(|resp| Command::Disable { force, resp }).await
    }

    /// Hard-reset the radio, destroying every live session. The device comes
    /// back in the ready state.
    pub async fn device_reset(&self) -> Result<()> {
        self.request(|resp| Command::DeviceReset { resp }).await
    }

    /// Configure the radio's command/response capture.
    pub async fn set_logger_mode(&self, mode: LoggerMode) -> Result<()> {
        self.request(|resp| Command::SetLoggerMode { mode, resp }).await
    }

    /// Create a session in `Init` with a validated parameter set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateSessionId`] if the id is live,
    /// [`Error::MaxSessionsExceeded`] at capacity, and
    /// [`Error::BadParameters`] while the device reports an error state.
    pub async fn init_session(
        &self,
        session_id: SessionId,
        session_type: SessionType,
        params: SessionParams,
    ) -> Result<()> {
        self.request(|resp| Command::InitSession { session_id, session_type, params, resp })
            .await
    }

    /// Destroy a session and release its id.
    pub async fn deinit_session(&self, session_id: SessionId) -> Result<()> {
        self.request(|resp| Command::DeinitSession { session_id, resp }).await
    }

    /// Start ranging. Legal from `Init` or `Idle`.
    pub async fn start_ranging(&self, session_id: SessionId) -> Result<()> {
        self.request(|resp| Command::StartRanging { session_id, resp }).await
    }

    /// Stop ranging. Legal from `Active` or `Idle`.
    pub async fn stop_ranging(&self, session_id: SessionId) -> Result<()> {
        self.request(|resp| Command::StopRanging { session_id, resp }).await
    }

    /// Replace a session's configuration.
    ///
    /// While the session is actively ranging, only report-filter changes are
    /// accepted.
    pub async fn reconfigure(&self, session_id: SessionId, params: SessionParams) -> Result<()> {
        self.request(|resp| Command::Reconfigure { session_id, params, resp }).await
    }

    /// Current configuration of a live session.
    pub async fn session_params(&self, session_id: SessionId) -> Result<SessionParams> {
        self.request(|resp| Command::GetParams { session_id, resp }).await
    }

    /// Current lifecycle state of a live session.
    pub async fn session_state(&self, session_id: SessionId) -> Result<SessionState> {
        self.request(|resp| Command::GetState { session_id, resp }).await
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> Result<usize> {
        self.request(|resp| Command::SessionCount { resp }).await
    }

    /// Apply a multicast controlee list edit. The batch is applied atomically:
    /// on any error the list is unchanged.
    pub async fn update_controlees(
        &self,
        session_id: SessionId,
        action: MulticastAction,
        batch: Vec<Controlee>,
    ) -> Result<()> {
        self.request(|resp| Command::UpdateControlees { session_id, action, batch, resp })
            .await
    }

    /// Push the regulatory country code to the radio.
    pub async fn set_country_code(&self, code: CountryCode) -> Result<()> {
        self.request(|resp| Command::SetCountryCode { code, resp }).await
    }

    /// Query the radio's power statistics.
    pub async fn power_stats(&self) -> Result<PowerStats> {
        self.request(|resp| Command::PowerStats { resp }).await
    }

    /// Query firmware and stack version identification.
    pub async fn device_info(&self) -> Result<DeviceInfo> {
        self.request(|resp| Command::DeviceInfo { resp }).await
    }

    /// Query the radio's capability entries.
    pub async fn caps_info(&self) -> Result<Vec<CapTlv>> {
        self.request(|resp| Command::CapsInfo { resp }).await
    }

    /// Push device-level configuration entries to the radio.
    pub async fn set_device_config(&self, tlvs: Vec<DeviceConfigTlv>) -> Result<()> {
        self.request(|resp| Command::SetDeviceConfig { tlvs, resp }).await
    }

    /// Read device-level configuration entries by parameter id.
    pub async fn get_device_config(&self, cfg_ids: Vec<u8>) -> Result<Vec<DeviceConfigTlv>> {
        self.request(|resp| Command::GetDeviceConfig { cfg_ids, resp }).await
    }

    /// Number of ranging rounds attempted by a live session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] if the session id is not live.
    pub async fn ranging_count(&self, session_id: SessionId) -> Result<u32> {
        self.request(|resp| Command::RangingCount { session_id, resp }).await
    }

    /// Send an opaque vendor command; returns the vendor response payload.
    pub async fn raw_vendor_cmd(
        &self,
        gid: u32,
        oid: u32,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>> {
        self.request(|resp| Command::RawVendorCmd { gid, oid, payload, resp }).await
    }

    /// The radio's last reported device state.
    pub async fn device_state(&self) -> Result<DeviceState> {
        self.request(|resp| Command::DeviceState { resp }).await
    }
}
