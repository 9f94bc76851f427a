//! Session lifecycle state machine.
//!
//! A [`Session`] owns everything one ranging context carries: its lifecycle
//! state, its validated configuration, its multicast controlee list, the
//! reason code of the last transition, and the ranging-report sequence
//! counter.
//!
//! The transition table:
//!
//! ```text
//!            start                 stop
//!   Init ───────────► Active ◄──────────► Idle
//!     │                  │    start        │
//!     │ deinit           │ deinit          │ deinit
//!     └──────────────────┴────────────┬────┘
//!                                     ▼
//!                                  Deinit (terminal)
//! ```
//!
//! Every transition not in the table fails with `BadParameters` and leaves
//! the session untouched. The radio may additionally move a session between
//! `Active` and `Idle` (in-band suspend/resume) or force it to `Deinit`;
//! those arrive through [`Session::apply_remote_state`].

use crate::controlee::{Controlee, ControleeList, MulticastAction};
use crate::error::{Error, Result};
use crate::params::{SessionParams, SessionType, UpdateClass};
use crate::status::ReasonCode;

/// Client-chosen 32-bit session identifier, unique among live sessions.
pub type SessionId = u32;

/// Lifecycle state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Parameters accepted, not yet ranging.
    Init,
    /// Terminal: session destroyed, id released.
    Deinit,
    /// Ranging in progress.
    Active,
    /// Ranging paused.
    Idle,
}

/// One ranging session record.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    session_type: SessionType,
    state: SessionState,
    params: SessionParams,
    controlees: ControleeList,
    last_reason: ReasonCode,
    sequence_number: u64,
}

impl Session {
    /// Create a session in `Init` with a validated parameter set.
    #[must_use]
    pub fn new(id: SessionId, session_type: SessionType, params: SessionParams) -> Self {
        Self {
            id,
            session_type,
            state: SessionState::Init,
            params,
            controlees: ControleeList::new(),
            last_reason: ReasonCode::StateChangeWithSessionManagementCommands,
            sequence_number: 0,
        }
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Session type.
    #[must_use]
    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current configuration.
    #[must_use]
    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Current multicast controlee list.
    #[must_use]
    pub fn controlees(&self) -> &ControleeList {
        &self.controlees
    }

    /// Reason code recorded by the most recent transition.
    #[must_use]
    pub fn last_reason(&self) -> ReasonCode {
        self.last_reason
    }

    /// Check whether a transition is in the table.
    #[must_use]
    pub fn can_transition(&self, to: SessionState) -> bool {
        match (self.state, to) {
            (SessionState::Init | SessionState::Idle, SessionState::Active) => true,
            (SessionState::Active | SessionState::Idle, SessionState::Idle) => true,
            (SessionState::Deinit, _) => false,
            (_, SessionState::Deinit) => true,
            _ => false,
        }
    }

    /// Start ranging. Legal from `Init` or `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] from `Active` or `Deinit`; state is
    /// unchanged on error.
    pub fn start(&mut self) -> Result<()> {
        self.transition(
            SessionState::Active,
            ReasonCode::StateChangeWithSessionManagementCommands,
        )
    }

    /// Stop ranging, recording the triggering reason. Legal from `Active` or
    /// `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] from `Init` or `Deinit`.
    pub fn stop(&mut self, reason: ReasonCode) -> Result<()> {
        self.transition(SessionState::Idle, reason)
    }

    /// Destroy the session. Legal from any non-terminal state; terminal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] if already `Deinit`.
    pub fn deinit(&mut self) -> Result<()> {
        self.transition(
            SessionState::Deinit,
            ReasonCode::StateChangeWithSessionManagementCommands,
        )
    }

    fn transition(&mut self, to: SessionState, reason: ReasonCode) -> Result<()> {
        if !self.can_transition(to) {
            return Err(Error::BadParameters);
        }
        tracing::debug!(
            session_id = self.id,
            from = ?self.state,
            ?to,
            ?reason,
            "session state transition"
        );
        self.state = to;
        self.last_reason = reason;
        Ok(())
    }

    /// Replace the configuration, classifying the diff first.
    ///
    /// While `Active`, only report-filter changes are accepted; anything
    /// touching the air interface is rejected and the configuration is left
    /// unchanged. Returns the classification so the caller knows whether the
    /// radio needs the update pushed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] for air-interface changes while
    /// `Active`, and for any reconfigure on a `Deinit` session.
    pub fn reconfigure(&mut self, params: SessionParams) -> Result<UpdateClass> {
        if self.state == SessionState::Deinit {
            return Err(Error::BadParameters);
        }
        let class = params.update_class(&self.params);
        if self.state == SessionState::Active && class == UpdateClass::AirInterface {
            tracing::debug!(
                session_id = self.id,
                "reconfigure rejected: air-interface change while actively ranging"
            );
            return Err(Error::BadParameters);
        }
        if class != UpdateClass::Unchanged {
            self.params = params;
        }
        Ok(class)
    }

    /// Apply a multicast list edit.
    ///
    /// A non-empty list is only legal when the topology permits multiple
    /// peers, so add actions are refused outright on unicast sessions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] per [`ControleeList::apply`], for add
    /// actions on a unicast session, and on a `Deinit` session.
    pub fn apply_multicast(
        &mut self,
        action: MulticastAction,
        batch: Vec<Controlee>,
        capacity: usize,
    ) -> Result<()> {
        if self.state == SessionState::Deinit {
            return Err(Error::BadParameters);
        }
        if action.is_add() && !self.params.multi_node_mode().is_multicast() {
            tracing::debug!(
                session_id = self.id,
                "multicast edit rejected: unicast session"
            );
            return Err(Error::BadParameters);
        }
        self.controlees.apply(action, batch, capacity)
    }

    /// Apply a radio-initiated state change (in-band suspend/resume, forced
    /// teardown). The radio is authoritative for these, so no table check -
    /// but transitions out of `Deinit` are ignored.
    ///
    /// Returns the previous state when the session actually moved.
    pub fn apply_remote_state(
        &mut self,
        state: SessionState,
        reason: ReasonCode,
    ) -> Option<SessionState> {
        if self.state == SessionState::Deinit {
            tracing::warn!(
                session_id = self.id,
                ?state,
                "ignoring radio state change for deinitialized session"
            );
            return None;
        }
        if self.state == state {
            self.last_reason = reason;
            return None;
        }
        let prev = self.state;
        tracing::debug!(
            session_id = self.id,
            from = ?prev,
            to = ?state,
            ?reason,
            "radio-initiated session state change"
        );
        self.state = state;
        self.last_reason = reason;
        Some(prev)
    }

    /// Stamp and return the next ranging-report sequence number.
    ///
    /// Strictly increasing for the lifetime of the session, including for
    /// reports that are later dropped on delivery.
    #[must_use]
    pub fn next_sequence_number(&mut self) -> u64 {
        let seq = self.sequence_number;
        self.sequence_number += 1;
        seq
    }
}
