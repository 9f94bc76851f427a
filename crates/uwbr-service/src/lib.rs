//! # UWB Ranging Service
//!
//! Serialized service layer over [`uwbr-core`](uwbr_core). One registry task
//! owns the session table and processes every external command and every
//! asynchronous radio event in a single loop, so no two mutations of the
//! same session ever interleave.
//!
//! This crate provides:
//! - The [`RadioHal`] boundary trait and a scriptable [`MockRadio`]
//! - The session registry actor (single serialization point)
//! - The notification assembler and delivery driver
//! - The public async [`RangingService`] facade
//!
//! ## Architecture
//!
//! ```text
//!  RangingService ──commands──► ┌──────────────────┐ ──calls──► RadioHal
//!   (cloneable handle)          │  Registry task   │
//!  RadioHal ────────events────► │ (single loop,    │
//!                               │  owns sessions)  │
//!                               └────────┬─────────┘
//!                                        │ notifications (fire-and-forget)
//!                                        ▼
//!                               NotificationDriver ──► NotificationHandler
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod hal;
pub mod mock;
pub mod notification;
mod registry;
pub mod service;

pub use hal::{
    CapTlv, CountryCode, DeviceConfigTlv, DeviceInfo, LoggerMode, PowerStats, RadioEvent,
    RadioHal, RawRangeData, VendorMessage,
};
pub use mock::{MockCall, MockOp, MockRadio, MockRadioHandle};
pub use notification::{Notification, NotificationHandler};
pub use service::{RangingService, ServiceConfig};
