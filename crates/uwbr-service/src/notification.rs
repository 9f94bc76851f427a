//! Notification assembly and delivery.
//!
//! The registry emits [`Notification`]s onto an unbounded channel and never
//! waits for the consumer; a slow or crashed handler cannot stall command
//! processing. The [`NotificationDriver`] drains that channel on its own task
//! and dispatches into the caller's [`NotificationHandler`].

use tokio::sync::mpsc;
use tracing::debug;

use uwbr_core::{DeviceState, RangingReport, ReasonCode, Session, SessionId, SessionState};

use crate::hal::{RawRangeData, VendorMessage};

/// An upward-facing notification, delivered in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The radio's coarse device state changed.
    DeviceState(DeviceState),
    /// A session changed state, locally or remotely.
    SessionState {
        /// Affected session.
        session_id: SessionId,
        /// State after the change.
        state: SessionState,
        /// Diagnostic reason for the change.
        reason: ReasonCode,
    },
    /// A ranging round completed.
    Ranging(RangingReport),
    /// Opaque vendor notification.
    Vendor(VendorMessage),
}

/// Consumer of service notifications.
///
/// Callbacks are synchronous and infallible; they run on the driver task, so
/// long-running work belongs elsewhere. Per-session calls arrive in the order
/// the events occurred.
pub trait NotificationHandler: Send + 'static {
    /// The radio's device state changed.
    fn on_device_state_changed(&mut self, state: DeviceState);

    /// A session changed state.
    fn on_session_state_changed(
        &mut self,
        session_id: SessionId,
        state: SessionState,
        reason: ReasonCode,
    );

    /// A ranging report is ready.
    fn on_ranging_report(&mut self, report: RangingReport);

    /// A vendor notification arrived.
    fn on_vendor_notification(&mut self, message: VendorMessage);
}

/// Drains the notification channel into a [`NotificationHandler`].
pub struct NotificationDriver<N: NotificationHandler> {
    handler: N,
    notifications: mpsc::UnboundedReceiver<Notification>,
}

impl<N: NotificationHandler> NotificationDriver<N> {
    /// Build a driver over `notifications`.
    pub fn new(handler: N, notifications: mpsc::UnboundedReceiver<Notification>) -> Self {
        Self { handler, notifications }
    }

    /// Run until the sending side (the registry) is dropped.
    pub async fn run(mut self) {
        while let Some(notification) = self.notifications.recv().await {
            self.dispatch(notification);
        }
        debug!("notification channel closed, driver exiting");
    }

    fn dispatch(&mut self, notification: Notification) {
        match notification {
            Notification::DeviceState(state) => self.handler.on_device_state_changed(state),
            Notification::SessionState { session_id, state, reason } => {
                self.handler.on_session_state_changed(session_id, state, reason);
            }
            Notification::Ranging(report) => self.handler.on_ranging_report(report),
            Notification::Vendor(message) => self.handler.on_vendor_notification(message),
        }
    }
}

/// Stamp raw round data with the session's next sequence number.
///
/// Sequence numbers are per session and strictly increasing for the life of
/// the session, including across stop/start cycles.
pub(crate) fn assemble_report(session: &mut Session, raw: RawRangeData) -> RangingReport {
    RangingReport {
        sequence_number: session.next_sequence_number(),
        session_id: raw.session_id,
        ranging_interval_ms: raw.ranging_interval_ms,
        measurements: raw.measurements,
    }
}
