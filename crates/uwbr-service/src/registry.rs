//! The session registry actor.
//!
//! One task owns the radio handle, the session table, and the device state.
//! Every external command and every radio event funnels through [`Registry::run`],
//! so session mutations never interleave and no locking is needed anywhere in
//! the service.
//!
//! Local state is only mutated after the radio acknowledged the command, so a
//! failed or timed-out command always leaves the registry in its pre-command
//! state.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use uwbr_core::{
    Controlee, DeviceState, Error, MulticastAction, ReasonCode, Result, Session, SessionId,
    SessionParams, SessionState, SessionType, StatusCode, UpdateClass,
};

use crate::hal::{
    CapTlv, CountryCode, DeviceConfigTlv, DeviceInfo, LoggerMode, PowerStats, RadioEvent,
    RadioHal, RawRangeData,
};
use crate::notification::{assemble_report, Notification};
use crate::service::ServiceConfig;

pub(crate) type Responder<T> = oneshot::Sender<Result<T>>;

/// Commands accepted by the registry task.
pub(crate) enum Command {
    Enable {
        resp: Responder<()>,
    },
    Disable {
        force: bool,
        resp: Responder<()>,
    },
    DeviceReset {
        resp: Responder<()>,
    },
    SetLoggerMode {
        mode: LoggerMode,
        resp: Responder<()>,
    },
    InitSession {
        session_id: SessionId,
        session_type: SessionType,
        params: SessionParams,
        resp: Responder<()>,
    },
    DeinitSession {
        session_id: SessionId,
        resp: Responder<()>,
    },
    StartRanging {
        session_id: SessionId,
        resp: Responder<()>,
    },
    StopRanging {
        session_id: SessionId,
        resp: Responder<()>,
    },
    Reconfigure {
        session_id: SessionId,
        params: SessionParams,
        resp: Responder<()>,
    },
    GetParams {
        session_id: SessionId,
        resp: Responder<SessionParams>,
    },
    GetState {
        session_id: SessionId,
        resp: Responder<SessionState>,
    },
    SessionCount {
        resp: Responder<usize>,
    },
    UpdateControlees {
        session_id: SessionId,
        action: MulticastAction,
        batch: Vec<Controlee>,
        resp: Responder<()>,
    },
    SetCountryCode {
        code: CountryCode,
        resp: Responder<()>,
    },
    PowerStats {
        resp: Responder<PowerStats>,
    },
    DeviceInfo {
        resp: Responder<DeviceInfo>,
    },
    CapsInfo {
        resp: Responder<Vec<CapTlv>>,
    },
    SetDeviceConfig {
        tlvs: Vec<DeviceConfigTlv>,
        resp: Responder<()>,
    },
    GetDeviceConfig {
        cfg_ids: Vec<u8>,
        resp: Responder<Vec<DeviceConfigTlv>>,
    },
    RangingCount {
        session_id: SessionId,
        resp: Responder<u32>,
    },
    RawVendorCmd {
        gid: u32,
        oid: u32,
        payload: Vec<u8>,
        resp: Responder<Vec<u8>>,
    },
    DeviceState {
        resp: Responder<DeviceState>,
    },
}

/// Bound a radio call by the configured command window.
async fn with_timeout<T>(
    window: Duration,
    fut: impl std::future::Future<Output = T>,
) -> Result<T> {
    tokio::time::timeout(window, fut)
        .await
        .map_err(|_| Error::Timeout)
}

pub(crate) struct Registry<H: RadioHal> {
    hal: H,
    config: ServiceConfig,
    enabled: bool,
    device_state: DeviceState,
    sessions: HashMap<SessionId, Session>,
    commands: mpsc::UnboundedReceiver<Command>,
    // Held so the event channel never closes while the registry lives.
    event_tx: mpsc::UnboundedSender<RadioEvent>,
    events: mpsc::UnboundedReceiver<RadioEvent>,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl<H: RadioHal> Registry<H> {
    pub(crate) fn new(
        hal: H,
        config: ServiceConfig,
        commands: mpsc::UnboundedReceiver<Command>,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        let (event_tx, events) = mpsc::unbounded_channel();
        Self {
            hal,
            config,
            enabled: false,
            device_state: DeviceState::Ready,
            sessions: HashMap::new(),
            commands,
            event_tx,
            events,
            notifications,
        }
    }

    /// Run until every command sender is dropped.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                // Never yields None: we hold a sender clone.
                Some(event) = self.events.recv() => self.handle_event(event),
            }
        }
        debug!("command channel closed, registry exiting");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Enable { resp } => {
                let _ = resp.send(self.enable().await);
            }
            Command::Disable { force, resp } => {
                let _ = resp.send(self.disable(force).await);
            }
            Command::DeviceReset { resp } => {
                let _ = resp.send(self.device_reset().await);
            }
            Command::SetLoggerMode { mode, resp } => {
                let _ = resp.send(self.set_logger_mode(mode).await);
            }
            Command::InitSession { session_id, session_type, params, resp } => {
                let _ = resp.send(self.init_session(session_id, session_type, params).await);
            }
            Command::DeinitSession { session_id, resp } => {
                let _ = resp.send(self.deinit_session(session_id).await);
            }
            Command::StartRanging { session_id, resp } => {
                let _ = resp.send(self.start_ranging(session_id).await);
            }
            Command::StopRanging { session_id, resp } => {
                let _ = resp.send(self.stop_ranging(session_id).await);
            }
            Command::Reconfigure { session_id, params, resp } => {
                let _ = resp.send(self.reconfigure(session_id, params).await);
            }
            Command::GetParams { session_id, resp } => {
                let _ = resp.send(self.with_session(session_id, |s| s.params().clone()));
            }
            Command::GetState { session_id, resp } => {
                let _ = resp.send(self.with_session(session_id, Session::state));
            }
            Command::SessionCount { resp } => {
                let _ = resp.send(Ok(self.sessions.len()));
            }
            Command::UpdateControlees { session_id, action, batch, resp } => {
                let _ = resp.send(self.update_controlees(session_id, action, batch).await);
            }
            Command::SetCountryCode { code, resp } => {
                let _ = resp.send(self.set_country_code(code).await);
            }
            Command::PowerStats { resp } => {
                let _ = resp.send(self.power_stats().await);
            }
            Command::DeviceInfo { resp } => {
                let _ = resp.send(self.device_info().await);
            }
            Command::CapsInfo { resp } => {
                let _ = resp.send(self.caps_info().await);
            }
            Command::SetDeviceConfig { tlvs, resp } => {
                let _ = resp.send(self.set_device_config(tlvs).await);
            }
            Command::GetDeviceConfig { cfg_ids, resp } => {
                let _ = resp.send(self.get_device_config(cfg_ids).await);
            }
            Command::RangingCount { session_id, resp } => {
                let _ = resp.send(self.ranging_count(session_id).await);
            }
            Command::RawVendorCmd { gid, oid, payload, resp } => {
                let _ = resp.send(self.raw_vendor_cmd(gid, oid, payload).await);
            }
            Command::DeviceState { resp } => {
                let _ = resp.send(Ok(self.device_state));
            }
        }
    }

    fn with_session<T>(
        &self,
        session_id: SessionId,
        f: impl FnOnce(&Session) -> T,
    ) -> Result<T> {
        self.sessions
            .get(&session_id)
            .map(f)
            .ok_or(Error::BadParameters)
    }

    async fn enable(&mut self) -> Result<()> {
        if self.enabled {
            return Err(Error::BadParameters);
        }
        let status =
            with_timeout(self.config.command_timeout, self.hal.open(self.event_tx.clone()))
                .await?;
        status.into_result()?;
        self.enabled = true;
        self.device_state = DeviceState::Ready;
        info!("radio enabled");
        Ok(())
    }

    async fn disable(&mut self, force: bool) -> Result<()> {
        if !self.enabled {
            return Err(Error::BadParameters);
        }
        let status = with_timeout(self.config.command_timeout, self.hal.close(force)).await?;
        status.into_result()?;
        // The radio dropped every session with it; release their ids and tell
        // the client.
        for (session_id, mut session) in self.sessions.drain() {
            let _ = session.deinit();
            let _ = self.notifications.send(Notification::SessionState {
                session_id,
                state: SessionState::Deinit,
                reason: ReasonCode::StateChangeWithSessionManagementCommands,
            });
        }
        self.enabled = false;
        info!(force, "radio disabled");
        Ok(())
    }

    async fn device_reset(&mut self) -> Result<()> {
        self.ensure_enabled()?;
        let status = with_timeout(self.config.command_timeout, self.hal.device_reset()).await?;
        status.into_result()?;
        // A reset destroys every device-side session.
        for (session_id, mut session) in self.sessions.drain() {
            let _ = session.deinit();
            let _ = self.notifications.send(Notification::SessionState {
                session_id,
                state: SessionState::Deinit,
                reason: ReasonCode::StateChangeWithSessionManagementCommands,
            });
        }
        self.device_state = DeviceState::Ready;
        info!("device reset");
        Ok(())
    }

    async fn set_logger_mode(&mut self, mode: LoggerMode) -> Result<()> {
        self.ensure_enabled()?;
        let status =
            with_timeout(self.config.command_timeout, self.hal.set_logger_mode(mode)).await?;
        status.into_result()
    }

    async fn init_session(
        &mut self,
        session_id: SessionId,
        session_type: SessionType,
        params: SessionParams,
    ) -> Result<()> {
        self.ensure_enabled()?;
        // Check order matters for the response the client sees: a duplicate
        // id reports DuplicateSessionId even at capacity or with the device
        // in the error state.
        if self.sessions.contains_key(&session_id) {
            debug!(session_id, "init rejected: id already live");
            return Err(Error::DuplicateSessionId);
        }
        if self.sessions.len() >= self.config.max_sessions {
            debug!(session_id, "init rejected: session capacity reached");
            return Err(Error::MaxSessionsExceeded);
        }
        if self.device_state == DeviceState::Error {
            debug!(session_id, "init rejected: device in error state");
            return Err(Error::BadParameters);
        }

        let status = with_timeout(
            self.config.command_timeout,
            self.hal.session_init(session_id, session_type),
        )
        .await?;
        status.into_result()?;

        let status = with_timeout(
            self.config.command_timeout,
            self.hal.set_app_config(session_id, &params),
        )
        .await;
        if let Err(err) = status.and_then(StatusCode::into_result) {
            // Configuration never landed; tear the half-built session down so
            // the id stays free.
            warn!(session_id, %err, "session configuration failed, rolling back");
            let rollback =
                with_timeout(self.config.command_timeout, self.hal.session_deinit(session_id))
                    .await;
            if let Err(rb) = rollback.and_then(StatusCode::into_result) {
                error!(session_id, %rb, "session rollback failed, device may hold a stale id");
            }
            return Err(err);
        }

        let session = Session::new(session_id, session_type, params);
        self.sessions.insert(session_id, session);
        info!(session_id, ?session_type, "session initialized");
        self.notify_session(session_id, SessionState::Init,
            ReasonCode::StateChangeWithSessionManagementCommands);
        Ok(())
    }

    async fn deinit_session(&mut self, session_id: SessionId) -> Result<()> {
        self.ensure_enabled()?;
        if !self.sessions.contains_key(&session_id) {
            return Err(Error::BadParameters);
        }
        let status =
            with_timeout(self.config.command_timeout, self.hal.session_deinit(session_id))
                .await?;
        status.into_result()?;

        if let Some(mut session) = self.sessions.remove(&session_id) {
            let _ = session.deinit();
        }
        info!(session_id, "session deinitialized");
        self.notify_session(session_id, SessionState::Deinit,
            ReasonCode::StateChangeWithSessionManagementCommands);
        Ok(())
    }

    async fn start_ranging(&mut self, session_id: SessionId) -> Result<()> {
        self.ensure_operational()?;
        let can = self.with_session(session_id, |s| s.can_transition(SessionState::Active))?;
        if !can {
            return Err(Error::BadParameters);
        }
        let status =
            with_timeout(self.config.command_timeout, self.hal.session_start(session_id))
                .await?;
        status.into_result()?;

        let reason = match self.sessions.get_mut(&session_id) {
            Some(session) => {
                session.start()?;
                session.last_reason()
            }
            None => return Err(Error::BadParameters),
        };
        self.notify_session(session_id, SessionState::Active, reason);
        Ok(())
    }

    async fn stop_ranging(&mut self, session_id: SessionId) -> Result<()> {
        self.ensure_enabled()?;
        let can = self.with_session(session_id, |s| s.can_transition(SessionState::Idle))?;
        if !can {
            return Err(Error::BadParameters);
        }
        let status =
            with_timeout(self.config.command_timeout, self.hal.session_stop(session_id))
                .await?;
        status.into_result()?;

        let reason = match self.sessions.get_mut(&session_id) {
            Some(session) => {
                session.stop(ReasonCode::StateChangeWithSessionManagementCommands)?;
                session.last_reason()
            }
            None => return Err(Error::BadParameters),
        };
        self.notify_session(session_id, SessionState::Idle, reason);
        Ok(())
    }

    async fn reconfigure(&mut self, session_id: SessionId, params: SessionParams) -> Result<()> {
        self.ensure_enabled()?;
        // Validate on a scratch copy first so a radio failure cannot leave a
        // half-applied configuration behind.
        let mut scratch = self
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(Error::BadParameters)?;
        let class = scratch.reconfigure(params.clone())?;
        if class == UpdateClass::Unchanged {
            debug!(session_id, "reconfigure is a no-op");
            return Ok(());
        }

        let status = with_timeout(
            self.config.command_timeout,
            self.hal.set_app_config(session_id, &params),
        )
        .await?;
        status.into_result()?;

        self.sessions.insert(session_id, scratch);
        debug!(session_id, ?class, "session reconfigured");
        Ok(())
    }

    async fn update_controlees(
        &mut self,
        session_id: SessionId,
        action: MulticastAction,
        batch: Vec<Controlee>,
    ) -> Result<()> {
        self.ensure_enabled()?;
        // Same scratch-copy discipline as reconfigure: the whole batch must be
        // valid before the radio hears about any of it.
        let mut scratch = self
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(Error::BadParameters)?;
        scratch.apply_multicast(action, batch.clone(), self.config.max_controlees)?;

        let status = with_timeout(
            self.config.command_timeout,
            self.hal.update_multicast_list(session_id, action, &batch),
        )
        .await?;
        status.into_result()?;

        debug!(
            session_id,
            ?action,
            controlees = scratch.controlees().len(),
            "multicast list updated"
        );
        self.sessions.insert(session_id, scratch);
        Ok(())
    }

    async fn set_country_code(&mut self, code: CountryCode) -> Result<()> {
        self.ensure_enabled()?;
        let status =
            with_timeout(self.config.command_timeout, self.hal.set_country_code(code)).await?;
        status.into_result()?;
        info!(%code, "country code set");
        Ok(())
    }

    async fn power_stats(&mut self) -> Result<PowerStats> {
        self.ensure_enabled()?;
        let stats = with_timeout(self.config.command_timeout, self.hal.power_stats()).await?;
        stats.status.into_result()?;
        Ok(stats)
    }

    async fn device_info(&mut self) -> Result<DeviceInfo> {
        self.ensure_enabled()?;
        let info = with_timeout(self.config.command_timeout, self.hal.device_info()).await?;
        info.status.into_result()?;
        Ok(info)
    }

    async fn caps_info(&mut self) -> Result<Vec<CapTlv>> {
        self.ensure_enabled()?;
        let (status, caps) =
            with_timeout(self.config.command_timeout, self.hal.caps_info()).await?;
        status.into_result()?;
        Ok(caps)
    }

    async fn set_device_config(&mut self, tlvs: Vec<DeviceConfigTlv>) -> Result<()> {
        self.ensure_enabled()?;
        let status =
            with_timeout(self.config.command_timeout, self.hal.set_device_config(tlvs)).await?;
        status.into_result()
    }

    async fn get_device_config(&mut self, cfg_ids: Vec<u8>) -> Result<Vec<DeviceConfigTlv>> {
        self.ensure_enabled()?;
        let (status, tlvs) =
            with_timeout(self.config.command_timeout, self.hal.get_device_config(cfg_ids))
                .await?;
        status.into_result()?;
        Ok(tlvs)
    }

    async fn ranging_count(&mut self, session_id: SessionId) -> Result<u32> {
        self.ensure_enabled()?;
        if !self.sessions.contains_key(&session_id) {
            return Err(Error::BadParameters);
        }
        let (status, count) =
            with_timeout(self.config.command_timeout, self.hal.ranging_count(session_id))
                .await?;
        status.into_result()?;
        Ok(count)
    }

    async fn raw_vendor_cmd(
        &mut self,
        gid: u32,
        oid: u32,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>> {
        self.ensure_enabled()?;
        let (status, response) = with_timeout(
            self.config.command_timeout,
            self.hal.raw_vendor_cmd(gid, oid, payload),
        )
        .await?;
        status.into_result()?;
        Ok(response)
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(Error::BadParameters)
        }
    }

    /// Enabled and not in the device error state. Session-creating and
    /// session-starting commands require this; teardown commands only require
    /// the radio to be enabled.
    fn ensure_operational(&self) -> Result<()> {
        self.ensure_enabled()?;
        if self.device_state == DeviceState::Error {
            debug!("command rejected: device in error state");
            return Err(Error::BadParameters);
        }
        Ok(())
    }

    fn handle_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::DeviceStatus(state) => {
                if self.device_state != state {
                    info!(from = ?self.device_state, to = ?state, "device state changed");
                    self.device_state = state;
                }
                self.notify(Notification::DeviceState(state));
            }
            RadioEvent::SessionStatus { session_id, state, reason } => {
                self.handle_session_status(session_id, state, reason);
            }
            RadioEvent::RangeData(raw) => self.handle_range_data(raw),
            RadioEvent::Vendor(message) => self.notify(Notification::Vendor(message)),
        }
    }

    fn handle_session_status(
        &mut self,
        session_id: SessionId,
        state: SessionState,
        reason: ReasonCode,
    ) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            warn!(session_id, ?state, "state change for unknown session, dropping");
            return;
        };
        if session.apply_remote_state(state, reason).is_none() {
            return;
        }
        if state == SessionState::Deinit {
            self.sessions.remove(&session_id);
        }
        self.notify_session(session_id, state, reason);
    }

    fn handle_range_data(&mut self, raw: RawRangeData) {
        let Some(session) = self.sessions.get_mut(&raw.session_id) else {
            warn!(session_id = raw.session_id, "range data for unknown session, dropping");
            return;
        };
        let report = assemble_report(session, raw);
        self.notify(Notification::Ranging(report));
    }

    fn notify_session(&self, session_id: SessionId, state: SessionState, reason: ReasonCode) {
        self.notify(Notification::SessionState { session_id, state, reason });
    }

    /// Fire-and-forget delivery: a gone consumer never stalls the registry.
    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            warn!("notification dropped: consumer is gone");
        }
    }
}
