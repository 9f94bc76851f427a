//! Scriptable mock radio for tests.
//!
//! [`MockRadio`] implements [`RadioHal`] with per-operation scripted status
//! codes (default `Ok`), an optional response delay for exercising the
//! command timeout, and a handle for injecting [`RadioEvent`]s as if the
//! radio produced them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use uwbr_core::{Controlee, MulticastAction, SessionId, SessionParams, SessionType, StatusCode};

use crate::hal::{
    CapTlv, CountryCode, DeviceConfigTlv, DeviceInfo, LoggerMode, PowerStats, RadioEvent,
    RadioHal,
};

/// Operations whose response status can be scripted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum MockOp {
    Open,
    Close,
    DeviceReset,
    SetLoggerMode,
    SetCountryCode,
    CapsInfo,
    SetDeviceConfig,
    GetDeviceConfig,
    RangingCount,
    SessionInit,
    SessionDeinit,
    SetAppConfig,
    SessionStart,
    SessionStop,
    UpdateMulticastList,
    RawVendorCmd,
}

/// A recorded HAL invocation.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum MockCall {
    Open,
    Close { force: bool },
    DeviceReset,
    SetLoggerMode(LoggerMode),
    SetCountryCode(CountryCode),
    PowerStats,
    DeviceInfo,
    CapsInfo,
    SetDeviceConfig { count: usize },
    GetDeviceConfig { cfg_ids: Vec<u8> },
    RangingCount { session_id: SessionId },
    SessionInit { session_id: SessionId, session_type: SessionType },
    SessionDeinit { session_id: SessionId },
    SetAppConfig { session_id: SessionId },
    SessionStart { session_id: SessionId },
    SessionStop { session_id: SessionId },
    UpdateMulticastList { session_id: SessionId, action: MulticastAction, count: usize },
    RawVendorCmd { gid: u32, oid: u32 },
}

#[derive(Debug)]
struct Inner {
    calls: Vec<MockCall>,
    statuses: HashMap<MockOp, StatusCode>,
    response_delay: Option<Duration>,
    events: Option<mpsc::UnboundedSender<RadioEvent>>,
    power_stats: PowerStats,
    device_info: DeviceInfo,
    caps: Vec<CapTlv>,
    device_config: Vec<DeviceConfigTlv>,
    ranging_count: u32,
    vendor_response: Vec<u8>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            statuses: HashMap::new(),
            response_delay: None,
            events: None,
            power_stats: PowerStats {
                status: StatusCode::Ok,
                idle_time_ms: 0,
                tx_time_ms: 0,
                rx_time_ms: 0,
                total_wake_count: 0,
            },
            device_info: DeviceInfo {
                status: StatusCode::Ok,
                uci_version: 0,
                mac_version: 0,
                phy_version: 0,
                uci_test_version: 0,
                vendor_spec_info: Vec::new(),
            },
            caps: Vec::new(),
            device_config: Vec::new(),
            ranging_count: 0,
            vendor_response: Vec::new(),
        }
    }
}

/// Mock [`RadioHal`] implementation.
#[derive(Debug, Default)]
pub struct MockRadio {
    inner: Arc<Mutex<Inner>>,
}

/// Test-side handle to a [`MockRadio`].
#[derive(Debug, Clone)]
pub struct MockRadioHandle {
    inner: Arc<Mutex<Inner>>,
}

impl MockRadio {
    /// Create a mock radio and its scripting handle.
    #[must_use]
    pub fn new() -> (Self, MockRadioHandle) {
        let inner = Arc::new(Mutex::new(Inner::default()));
        (
            Self { inner: Arc::clone(&inner) },
            MockRadioHandle { inner },
        )
    }

    /// Record a call and resolve its scripted status, honoring the delay.
    async fn respond(&self, op: MockOp, call: MockCall) -> StatusCode {
        let (status, delay) = {
            let mut inner = self.inner.lock().expect("mock radio lock poisoned");
            inner.calls.push(call);
            (
                inner.statuses.get(&op).copied().unwrap_or(StatusCode::Ok),
                inner.response_delay,
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        status
    }
}

impl MockRadioHandle {
    /// Script the status returned by an operation (default `Ok`).
    pub fn set_status(&self, op: MockOp, status: StatusCode) {
        self.inner
            .lock()
            .expect("mock radio lock poisoned")
            .statuses
            .insert(op, status);
    }

    /// Delay every response by `delay`, for command-timeout tests.
    pub fn set_response_delay(&self, delay: Duration) {
        self.inner.lock().expect("mock radio lock poisoned").response_delay = Some(delay);
    }

    /// Script the power statistics returned by `power_stats`.
    pub fn set_power_stats(&self, stats: PowerStats) {
        self.inner.lock().expect("mock radio lock poisoned").power_stats = stats;
    }

    /// Script the response returned by `device_info`.
    pub fn set_device_info(&self, info: DeviceInfo) {
        self.inner.lock().expect("mock radio lock poisoned").device_info = info;
    }

    /// Script the capability entries returned by `caps_info`.
    pub fn set_caps(&self, caps: Vec<CapTlv>) {
        self.inner.lock().expect("mock radio lock poisoned").caps = caps;
    }

    /// Script the entries returned by `get_device_config`.
    pub fn set_device_config_response(&self, tlvs: Vec<DeviceConfigTlv>) {
        self.inner.lock().expect("mock radio lock poisoned").device_config = tlvs;
    }

    /// Script the count returned by `ranging_count`.
    pub fn set_ranging_count(&self, count: u32) {
        self.inner.lock().expect("mock radio lock poisoned").ranging_count = count;
    }

    /// Script the payload returned by `raw_vendor_cmd`.
    pub fn set_vendor_response(&self, payload: Vec<u8>) {
        self.inner.lock().expect("mock radio lock poisoned").vendor_response = payload;
    }

    /// All calls recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.inner.lock().expect("mock radio lock poisoned").calls.clone()
    }

    /// Inject a radio event. Returns false if the radio was never opened or
    /// the service side is gone.
    pub fn send_event(&self, event: RadioEvent) -> bool {
        let inner = self.inner.lock().expect("mock radio lock poisoned");
        match &inner.events {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl RadioHal for MockRadio {
    async fn open(&mut self, events: mpsc::UnboundedSender<RadioEvent>) -> StatusCode {
        self.inner.lock().expect("mock radio lock poisoned").events = Some(events);
        self.respond(MockOp::Open, MockCall::Open).await
    }

    async fn close(&mut self, force: bool) -> StatusCode {
        self.respond(MockOp::Close, MockCall::Close { force }).await
    }

    async fn device_reset(&mut self) -> StatusCode {
        self.respond(MockOp::DeviceReset, MockCall::DeviceReset).await
    }

    async fn set_logger_mode(&mut self, mode: LoggerMode) -> StatusCode {
        self.respond(MockOp::SetLoggerMode, MockCall::SetLoggerMode(mode)).await
    }

    async fn set_country_code(&mut self, code: CountryCode) -> StatusCode {
        self.respond(MockOp::SetCountryCode, MockCall::SetCountryCode(code)).await
    }

    async fn power_stats(&mut self) -> PowerStats {
        let (stats, delay) = {
            let mut inner = self.inner.lock().expect("mock radio lock poisoned");
            inner.calls.push(MockCall::PowerStats);
            (inner.power_stats, inner.response_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        stats
    }

    async fn device_info(&mut self) -> DeviceInfo {
        let (info, delay) = {
            let mut inner = self.inner.lock().expect("mock radio lock poisoned");
            inner.calls.push(MockCall::DeviceInfo);
            (inner.device_info.clone(), inner.response_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        info
    }

    async fn caps_info(&mut self) -> (StatusCode, Vec<CapTlv>) {
        let caps = self.inner.lock().expect("mock radio lock poisoned").caps.clone();
        let status = self.respond(MockOp::CapsInfo, MockCall::CapsInfo).await;
        (status, caps)
    }

    async fn set_device_config(&mut self, tlvs: Vec<DeviceConfigTlv>) -> StatusCode {
        self.respond(
            MockOp::SetDeviceConfig,
            MockCall::SetDeviceConfig { count: tlvs.len() },
        )
        .await
    }

    async fn get_device_config(
        &mut self,
        cfg_ids: Vec<u8>,
    ) -> (StatusCode, Vec<DeviceConfigTlv>) {
        let tlvs = self
            .inner
            .lock()
            .expect("mock radio lock poisoned")
            .device_config
            .clone();
        let status = self
            .respond(MockOp::GetDeviceConfig, MockCall::GetDeviceConfig { cfg_ids })
            .await;
        (status, tlvs)
    }

    async fn ranging_count(&mut self, session_id: SessionId) -> (StatusCode, u32) {
        let count = self.inner.lock().expect("mock radio lock poisoned").ranging_count;
        let status = self
            .respond(MockOp::RangingCount, MockCall::RangingCount { session_id })
            .await;
        (status, count)
    }

    async fn session_init(
        &mut self,
        session_id: SessionId,
        session_type: SessionType,
    ) -> StatusCode {
        self.respond(
            MockOp::SessionInit,
            MockCall::SessionInit { session_id, session_type },
        )
        .await
    }

    async fn session_deinit(&mut self, session_id: SessionId) -> StatusCode {
        self.respond(MockOp::SessionDeinit, MockCall::SessionDeinit { session_id }).await
    }

    async fn set_app_config(
        &mut self,
        session_id: SessionId,
        _params: &SessionParams,
    ) -> StatusCode {
        self.respond(MockOp::SetAppConfig, MockCall::SetAppConfig { session_id }).await
    }

    async fn session_start(&mut self, session_id: SessionId) -> StatusCode {
        self.respond(MockOp::SessionStart, MockCall::SessionStart { session_id }).await
    }

    async fn session_stop(&mut self, session_id: SessionId) -> StatusCode {
        self.respond(MockOp::SessionStop, MockCall::SessionStop { session_id }).await
    }

    async fn update_multicast_list(
        &mut self,
        session_id: SessionId,
        action: MulticastAction,
        batch: &[Controlee],
    ) -> StatusCode {
        self.respond(
            MockOp::UpdateMulticastList,
            MockCall::UpdateMulticastList { session_id, action, count: batch.len() },
        )
        .await
    }

    async fn raw_vendor_cmd(
        &mut self,
        gid: u32,
        oid: u32,
        _payload: Vec<u8>,
    ) -> (StatusCode, Vec<u8>) {
        let response = self
            .inner
            .lock()
            .expect("mock radio lock poisoned")
            .vendor_response
            .clone();
        let status = self
            .respond(MockOp::RawVendorCmd, MockCall::RawVendorCmd { gid, oid })
            .await;
        (status, response)
    }
}
