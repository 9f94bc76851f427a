//! # UWB Ranging Core
//!
//! Domain layer for the UWB ranging service. This crate is pure and
//! synchronous: it owns the vocabulary the service speaks and the state that
//! one ranging session carries, but performs no I/O and spawns no tasks.
//!
//! This crate provides:
//! - Status and reason code translation (open radio code space to a closed
//!   client-facing vocabulary)
//! - Session configuration parameters with validation
//! - The per-session lifecycle state machine
//! - Multicast controlee list management
//! - Ranging report types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Session                                  │
//! │   (lifecycle state machine + configuration + controlee list)    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                      Status Translator                           │
//! │   (radio status/reason codes -> closed error vocabulary)        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                      Ranging Reports                             │
//! │   (sequence-numbered, type-tagged measurement bundles)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The serialization point that drives these types lives in `uwbr-service`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod controlee;
pub mod error;
pub mod params;
pub mod report;
pub mod session;
pub mod status;

pub use controlee::{Controlee, ControleeList, MulticastAction, ShortAddress, SubSessionKey};
pub use error::{Error, Result};
pub use params::{
    DeviceRole, DeviceType, MacAddress, MacAddressMode, MultiNodeMode, RangeDataNtfConfig,
    SessionParams, SessionParamsBuilder, SessionType, StsConfig, UpdateClass, UwbChannel,
};
pub use report::{
    DlTdoaMeasurement, OwrAoaMeasurement, RangingMeasurementType, RangingMeasurements,
    RangingReport, TwoWayMeasurement,
};
pub use session::{Session, SessionId, SessionState};
pub use status::{DeviceState, ReasonCode, StatusCode};
