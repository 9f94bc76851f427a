//! Ranging report types.
//!
//! A completed ranging round produces one [`RangingReport`]: a
//! sequence-numbered bundle of per-peer measurements. The per-peer payload
//! shape differs by measurement type, so the measurement list is a tagged
//! union - a report can never mix two-way, DL-TDoA and one-way-AoA entries.
//!
//! Sequence numbers are strictly increasing within a session. A gap means
//! reports were dropped on the way to the client; gaps are observable but
//! not an error.

use serde::{Deserialize, Serialize};

use crate::params::MacAddress;
use crate::session::SessionId;
use crate::status::StatusCode;

/// Measurement type tag carried by the radio's round notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangingMeasurementType {
    /// Legacy one-way measurement.
    OneWay,
    /// Two-way time-of-flight measurement.
    TwoWay,
    /// Downlink time-difference-of-arrival measurement.
    DlTdoa,
    /// One-way angle-of-arrival measurement.
    OwrAoa,
}

/// One two-way ranging measurement against a single peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoWayMeasurement {
    /// Peer address.
    pub mac_address: MacAddress,
    /// Per-peer measurement status.
    #[serde(with = "status_raw")]
    pub status: StatusCode,
    /// Non-line-of-sight indicator.
    pub nlos: u8,
    /// Distance to the peer in centimeters.
    pub distance_cm: u16,
    /// Angle of arrival, azimuth (Q9.7 degrees).
    pub aoa_azimuth: i16,
    /// Figure of merit for the azimuth estimate.
    pub aoa_azimuth_fom: u8,
    /// Angle of arrival, elevation (Q9.7 degrees).
    pub aoa_elevation: i16,
    /// Figure of merit for the elevation estimate.
    pub aoa_elevation_fom: u8,
    /// Peer-reported azimuth back toward this device.
    pub aoa_destination_azimuth: i16,
    /// Figure of merit for the destination azimuth.
    pub aoa_destination_azimuth_fom: u8,
    /// Peer-reported elevation back toward this device.
    pub aoa_destination_elevation: i16,
    /// Figure of merit for the destination elevation.
    pub aoa_destination_elevation_fom: u8,
    /// Slot index of the measurement within the round.
    pub slot_index: u8,
    /// Received signal strength, negative dBm encoded Q7.1.
    pub rssi: u8,
}

/// One downlink TDoA measurement against a single anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DlTdoaMeasurement {
    /// Anchor address.
    pub mac_address: MacAddress,
    /// Per-anchor measurement status.
    #[serde(with = "status_raw")]
    pub status: StatusCode,
    /// Raw message control field.
    pub message_control: u16,
    /// Ranging block index.
    pub block_index: u16,
    /// Ranging round index within the block.
    pub round_index: u8,
    /// Received signal strength, negative dBm encoded Q7.1.
    pub rssi: u8,
    /// Transmit timestamp in the anchor's clock domain.
    pub tx_timestamp: u64,
    /// Receive timestamp in the local clock domain.
    pub rx_timestamp: u64,
    /// Opaque anchor location blob, forwarded untouched.
    pub anchor_location: Vec<u8>,
    /// Opaque list of active ranging round indexes.
    pub active_ranging_rounds: Vec<u8>,
}

/// One one-way angle-of-arrival measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwrAoaMeasurement {
    /// Advertiser address.
    pub mac_address: MacAddress,
    /// Per-peer measurement status.
    #[serde(with = "status_raw")]
    pub status: StatusCode,
    /// Non-line-of-sight indicator.
    pub nlos: u8,
    /// Ranging block index.
    pub block_index: u16,
    /// Frame sequence number within the block.
    pub frame_sequence_number: u8,
    /// Angle of arrival, azimuth (Q9.7 degrees).
    pub aoa_azimuth: i16,
    /// Figure of merit for the azimuth estimate.
    pub aoa_azimuth_fom: u8,
    /// Angle of arrival, elevation (Q9.7 degrees).
    pub aoa_elevation: i16,
    /// Figure of merit for the elevation estimate.
    pub aoa_elevation_fom: u8,
}

/// The per-type measurement list of one report.
///
/// Tagged union: the variants are mutually exclusive within one report by
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RangingMeasurements {
    /// Two-way time-of-flight measurements.
    TwoWay(Vec<TwoWayMeasurement>),
    /// Downlink TDoA measurements.
    DlTdoa(Vec<DlTdoaMeasurement>),
    /// One-way angle-of-arrival measurements.
    OwrAoa(Vec<OwrAoaMeasurement>),
}

impl RangingMeasurements {
    /// The measurement type tag matching this payload.
    #[must_use]
    pub fn measurement_type(&self) -> RangingMeasurementType {
        match self {
            Self::TwoWay(_) => RangingMeasurementType::TwoWay,
            Self::DlTdoa(_) => RangingMeasurementType::DlTdoa,
            Self::OwrAoa(_) => RangingMeasurementType::OwrAoa,
        }
    }

    /// Number of per-peer measurements in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::TwoWay(v) => v.len(),
            Self::DlTdoa(v) => v.len(),
            Self::OwrAoa(v) => v.len(),
        }
    }

    /// Returns true if the round produced no per-peer measurements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A sequence-numbered bundle of measurements for one session.
///
/// Produced once per completed ranging round and delivered immediately;
/// reports are never retained by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangingReport {
    /// Strictly increasing per-session sequence number.
    pub sequence_number: u64,
    /// The session this round belongs to.
    pub session_id: SessionId,
    /// Ranging interval in effect when the round completed, in milliseconds.
    pub ranging_interval_ms: u32,
    /// Type-tagged per-peer measurement list.
    pub measurements: RangingMeasurements,
}

/// Serialize `StatusCode` as its raw byte so reports stay wire-faithful.
mod status_raw {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::status::StatusCode;

    pub fn serialize<S: Serializer>(code: &StatusCode, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u8(code.as_raw())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<StatusCode, D::Error> {
        Ok(StatusCode::from_raw(u8::deserialize(de)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_way(addr: u16, distance_cm: u16) -> TwoWayMeasurement {
        TwoWayMeasurement {
            mac_address: MacAddress::Short(addr.to_be_bytes()),
            status: StatusCode::Ok,
            nlos: 0,
            distance_cm,
            aoa_azimuth: 0,
            aoa_azimuth_fom: 100,
            aoa_elevation: 0,
            aoa_elevation_fom: 100,
            aoa_destination_azimuth: 0,
            aoa_destination_azimuth_fom: 0,
            aoa_destination_elevation: 0,
            aoa_destination_elevation_fom: 0,
            slot_index: 1,
            rssi: 60,
        }
    }

    #[test]
    fn test_measurement_type_tag() {
        let m = RangingMeasurements::TwoWay(vec![two_way(0x1234, 150)]);
        assert_eq!(m.measurement_type(), RangingMeasurementType::TwoWay);
        assert_eq!(m.len(), 1);

        let m = RangingMeasurements::DlTdoa(vec![]);
        assert_eq!(m.measurement_type(), RangingMeasurementType::DlTdoa);
        assert!(m.is_empty());
    }

    #[test]
    fn test_report_serde_round_trip() {
        let report = RangingReport {
            sequence_number: 42,
            session_id: 5,
            ranging_interval_ms: 200,
            measurements: RangingMeasurements::TwoWay(vec![two_way(0x1234, 150)]),
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: RangingReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn test_vendor_status_survives_serde() {
        let mut m = two_way(0x1234, 0);
        m.status = StatusCode::Vendor(0xE7);
        let json = serde_json::to_string(&m).unwrap();
        let back: TwoWayMeasurement = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, StatusCode::Vendor(0xE7));
    }
}
