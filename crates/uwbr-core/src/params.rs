//! Session configuration parameters.
//!
//! A session must carry a complete, validated parameter set before the state
//! machine accepts a start command. [`SessionParamsBuilder`] enforces that:
//! required fields must be supplied, and cross-field consistency (topology vs
//! destination addresses, STS mode vs multi-node mode, address widths) is
//! checked at `build()`.
//!
//! Reconfiguration while a session is actively ranging is restricted to the
//! report filter; [`SessionParams::update_class`] classifies a parameter diff
//! so the registry can reject air-interface changes on an active session.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Session type selecting the protocol profile of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    /// Standard two-way ranging session.
    Ranging,
    /// In-band data transfer session.
    DataTransfer,
    /// Proprietary (car connectivity) profile.
    Ccc,
    /// Device test mode session.
    Test,
}

/// Whether this device coordinates the session or participates in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    /// Peer device joining a controller's session.
    Controlee,
    /// Coordinating device owning the session and its multicast list.
    Controller,
}

/// Role of this device within a ranging round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceRole {
    /// Responds to ranging initiation frames.
    Responder,
    /// Initiates ranging rounds.
    Initiator,
}

/// Multi-node topology of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiNodeMode {
    /// Exactly one peer.
    Unicast,
    /// One controller ranging with multiple controlees.
    OneToMany,
    /// Mesh of mutually ranging devices.
    ManyToMany,
}

impl MultiNodeMode {
    /// Returns true if the topology permits more than one peer, and thus a
    /// non-empty multicast controlee list.
    #[must_use]
    pub fn is_multicast(self) -> bool {
        !matches!(self, Self::Unicast)
    }
}

/// UWB channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum UwbChannel {
    Channel5,
    Channel6,
    Channel8,
    Channel9,
    Channel10,
    Channel12,
    Channel13,
    Channel14,
}

/// Scrambled timestamp sequence (security) mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StsConfig {
    /// Static STS key shared by all peers.
    Static,
    /// Dynamically derived STS key.
    Dynamic,
    /// Dynamic STS with an individual key per controlee sub-session.
    DynamicForControleeIndividualKey,
}

/// MAC addressing mode of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacAddressMode {
    /// 2-byte short addresses.
    Short,
    /// 8-byte extended addresses.
    Extended,
}

/// A peer MAC address in either addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacAddress {
    /// 2-byte short address.
    Short([u8; 2]),
    /// 8-byte extended address.
    Extended([u8; 8]),
}

impl MacAddress {
    /// Returns true if the address width matches the given addressing mode.
    #[must_use]
    pub fn matches_mode(&self, mode: MacAddressMode) -> bool {
        matches!(
            (self, mode),
            (Self::Short(_), MacAddressMode::Short) | (Self::Extended(_), MacAddressMode::Extended)
        )
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Short(bytes) => write!(f, "{}", hex::encode(bytes)),
            Self::Extended(bytes) => write!(f, "{}", hex::encode(bytes)),
        }
    }
}

/// Report filter: when the radio should emit ranging data notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeDataNtfConfig {
    /// Never notify.
    Disable,
    /// Notify on every completed round.
    Enable,
    /// Notify only within the configured proximity window.
    EnableProximity,
}

/// Classification of a reconfigure diff against the current parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateClass {
    /// Nothing changed.
    Unchanged,
    /// Only report-filter fields changed; legal while actively ranging.
    ReportFilter,
    /// Air-interface-affecting fields changed; session must not be active.
    AirInterface,
}

/// Complete configuration of one ranging session.
///
/// Construct through [`SessionParamsBuilder`]; a value of this type is always
/// internally consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    device_type: DeviceType,
    device_role: DeviceRole,
    multi_node_mode: MultiNodeMode,
    channel: UwbChannel,
    sts_config: StsConfig,
    mac_address_mode: MacAddressMode,
    device_mac_address: MacAddress,
    dst_mac_addresses: Vec<MacAddress>,
    ranging_interval_ms: u32,
    slot_duration_rstu: u16,
    max_rr_retry: u16,
    session_priority: u8,
    range_data_ntf_config: RangeDataNtfConfig,
    range_data_ntf_proximity_near_cm: u16,
    range_data_ntf_proximity_far_cm: u16,
}

impl SessionParams {
    /// Device type (controller/controlee).
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Device role (initiator/responder).
    #[must_use]
    pub fn device_role(&self) -> DeviceRole {
        self.device_role
    }

    /// Multi-node topology.
    #[must_use]
    pub fn multi_node_mode(&self) -> MultiNodeMode {
        self.multi_node_mode
    }

    /// UWB channel.
    #[must_use]
    pub fn channel(&self) -> UwbChannel {
        self.channel
    }

    /// STS security mode.
    #[must_use]
    pub fn sts_config(&self) -> StsConfig {
        self.sts_config
    }

    /// MAC addressing mode.
    #[must_use]
    pub fn mac_address_mode(&self) -> MacAddressMode {
        self.mac_address_mode
    }

    /// This device's MAC address.
    #[must_use]
    pub fn device_mac_address(&self) -> MacAddress {
        self.device_mac_address
    }

    /// Destination peer addresses.
    #[must_use]
    pub fn dst_mac_addresses(&self) -> &[MacAddress] {
        &self.dst_mac_addresses
    }

    /// Interval between ranging rounds, in milliseconds.
    #[must_use]
    pub fn ranging_interval_ms(&self) -> u32 {
        self.ranging_interval_ms
    }

    /// Ranging-round retry limit.
    #[must_use]
    pub fn max_rr_retry(&self) -> u16 {
        self.max_rr_retry
    }

    /// Report filter configuration.
    #[must_use]
    pub fn range_data_ntf_config(&self) -> RangeDataNtfConfig {
        self.range_data_ntf_config
    }

    /// Classify the diff between `self` (the new parameters) and `prev`.
    ///
    /// Report-filter fields (`range_data_ntf_*`) may change while the session
    /// is actively ranging; any other difference touches the air interface.
    #[must_use]
    pub fn update_class(&self, prev: &SessionParams) -> UpdateClass {
        if self == prev {
            return UpdateClass::Unchanged;
        }
        let mut filter_only = prev.clone();
        filter_only.range_data_ntf_config = self.range_data_ntf_config;
        filter_only.range_data_ntf_proximity_near_cm = self.range_data_ntf_proximity_near_cm;
        filter_only.range_data_ntf_proximity_far_cm = self.range_data_ntf_proximity_far_cm;
        if *self == filter_only {
            UpdateClass::ReportFilter
        } else {
            UpdateClass::AirInterface
        }
    }
}

/// Builder for [`SessionParams`].
///
/// Required fields: device type, device role, multi-node mode, channel, STS
/// config, addressing mode, device address, destination addresses. The rest
/// default to conservative values.
#[derive(Debug, Clone, Default)]
pub struct SessionParamsBuilder {
    device_type: Option<DeviceType>,
    device_role: Option<DeviceRole>,
    multi_node_mode: Option<MultiNodeMode>,
    channel: Option<UwbChannel>,
    sts_config: Option<StsConfig>,
    mac_address_mode: Option<MacAddressMode>,
    device_mac_address: Option<MacAddress>,
    dst_mac_addresses: Vec<MacAddress>,
    ranging_interval_ms: u32,
    slot_duration_rstu: u16,
    max_rr_retry: u16,
    session_priority: u8,
    range_data_ntf_config: Option<RangeDataNtfConfig>,
    range_data_ntf_proximity_near_cm: u16,
    range_data_ntf_proximity_far_cm: u16,
}

impl SessionParamsBuilder {
    /// Create a builder with default optional fields.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ranging_interval_ms: 200,
            slot_duration_rstu: 2400,
            max_rr_retry: 0,
            session_priority: 50,
            range_data_ntf_proximity_near_cm: 0,
            range_data_ntf_proximity_far_cm: 20_000,
            ..Self::default()
        }
    }

    /// Set the device type.
    #[must_use]
    pub fn device_type(mut self, value: DeviceType) -> Self {
        self.device_type = Some(value);
        self
    }

    /// Set the device role.
    #[must_use]
    pub fn device_role(mut self, value: DeviceRole) -> Self {
        self.device_role = Some(value);
        self
    }

    /// Set the multi-node topology.
    #[must_use]
    pub fn multi_node_mode(mut self, value: MultiNodeMode) -> Self {
        self.multi_node_mode = Some(value);
        self
    }

    /// Set the UWB channel.
    #[must_use]
    pub fn channel(mut self, value: UwbChannel) -> Self {
        self.channel = Some(value);
        self
    }

    /// Set the STS security mode.
    #[must_use]
    pub fn sts_config(mut self, value: StsConfig) -> Self {
        self.sts_config = Some(value);
        self
    }

    /// Set the MAC addressing mode.
    #[must_use]
    pub fn mac_address_mode(mut self, value: MacAddressMode) -> Self {
        self.mac_address_mode = Some(value);
        self
    }

    /// Set this device's MAC address.
    #[must_use]
    pub fn device_mac_address(mut self, value: MacAddress) -> Self {
        self.device_mac_address = Some(value);
        self
    }

    /// Set the destination peer addresses.
    #[must_use]
    pub fn dst_mac_addresses(mut self, value: Vec<MacAddress>) -> Self {
        self.dst_mac_addresses = value;
        self
    }

    /// Set the ranging interval in milliseconds.
    #[must_use]
    pub fn ranging_interval_ms(mut self, value: u32) -> Self {
        self.ranging_interval_ms = value;
        self
    }

    /// Set the slot duration in RSTU.
    #[must_use]
    pub fn slot_duration_rstu(mut self, value: u16) -> Self {
        self.slot_duration_rstu = value;
        self
    }

    /// Set the ranging-round retry limit.
    #[must_use]
    pub fn max_rr_retry(mut self, value: u16) -> Self {
        self.max_rr_retry = value;
        self
    }

    /// Set the session priority.
    #[must_use]
    pub fn session_priority(mut self, value: u8) -> Self {
        self.session_priority = value;
        self
    }

    /// Set the report filter configuration.
    #[must_use]
    pub fn range_data_ntf_config(mut self, value: RangeDataNtfConfig) -> Self {
        self.range_data_ntf_config = Some(value);
        self
    }

    /// Set the proximity window for the report filter, in centimeters.
    #[must_use]
    pub fn range_data_ntf_proximity_cm(mut self, near: u16, far: u16) -> Self {
        self.range_data_ntf_proximity_near_cm = near;
        self.range_data_ntf_proximity_far_cm = far;
        self
    }

    /// Validate and build the parameter set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameters`] when a required field is missing or
    /// the fields are mutually inconsistent.
    pub fn build(self) -> Result<SessionParams> {
        let device_type = self.device_type.ok_or(Error::BadParameters)?;
        let device_role = self.device_role.ok_or(Error::BadParameters)?;
        let multi_node_mode = self.multi_node_mode.ok_or(Error::BadParameters)?;
        let channel = self.channel.ok_or(Error::BadParameters)?;
        let sts_config = self.sts_config.ok_or(Error::BadParameters)?;
        let mac_address_mode = self.mac_address_mode.ok_or(Error::BadParameters)?;
        let device_mac_address = self.device_mac_address.ok_or(Error::BadParameters)?;
        let range_data_ntf_config = self
            .range_data_ntf_config
            .unwrap_or(RangeDataNtfConfig::Enable);

        let params = SessionParams {
            device_type,
            device_role,
            multi_node_mode,
            channel,
            sts_config,
            mac_address_mode,
            device_mac_address,
            dst_mac_addresses: self.dst_mac_addresses,
            ranging_interval_ms: self.ranging_interval_ms,
            slot_duration_rstu: self.slot_duration_rstu,
            max_rr_retry: self.max_rr_retry,
            session_priority: self.session_priority,
            range_data_ntf_config,
            range_data_ntf_proximity_near_cm: self.range_data_ntf_proximity_near_cm,
            range_data_ntf_proximity_far_cm: self.range_data_ntf_proximity_far_cm,
        };
        params.validate()?;
        Ok(params)
    }
}

impl SessionParams {
    fn validate(&self) -> Result<()> {
        if self.dst_mac_addresses.is_empty() {
            tracing::debug!("session params rejected: no destination addresses");
            return Err(Error::BadParameters);
        }
        if self.multi_node_mode == MultiNodeMode::Unicast && self.dst_mac_addresses.len() > 1 {
            tracing::debug!(
                destinations = self.dst_mac_addresses.len(),
                "session params rejected: unicast topology with multiple destinations"
            );
            return Err(Error::BadParameters);
        }
        if self.sts_config == StsConfig::DynamicForControleeIndividualKey
            && !self.multi_node_mode.is_multicast()
        {
            tracing::debug!(
                "session params rejected: per-controlee STS keys require a multicast topology"
            );
            return Err(Error::BadParameters);
        }
        let all_addresses =
            std::iter::once(&self.device_mac_address).chain(self.dst_mac_addresses.iter());
        for addr in all_addresses {
            if !addr.matches_mode(self.mac_address_mode) {
                tracing::debug!(%addr, "session params rejected: address width mismatch");
                return Err(Error::BadParameters);
            }
        }
        if self.ranging_interval_ms == 0 || self.slot_duration_rstu == 0 {
            return Err(Error::BadParameters);
        }
        if self.range_data_ntf_config == RangeDataNtfConfig::EnableProximity
            && self.range_data_ntf_proximity_near_cm > self.range_data_ntf_proximity_far_cm
        {
            return Err(Error::BadParameters);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_builder() -> SessionParamsBuilder {
        SessionParamsBuilder::new()
            .device_type(DeviceType::Controller)
            .device_role(DeviceRole::Initiator)
            .multi_node_mode(MultiNodeMode::OneToMany)
            .channel(UwbChannel::Channel9)
            .sts_config(StsConfig::Static)
            .mac_address_mode(MacAddressMode::Short)
            .device_mac_address(MacAddress::Short([0x12, 0x34]))
            .dst_mac_addresses(vec![MacAddress::Short([0x56, 0x78])])
    }

    #[test]
    fn test_build_valid_params() {
        let params = valid_builder().build().unwrap();
        assert_eq!(params.device_type(), DeviceType::Controller);
        assert_eq!(params.ranging_interval_ms(), 200);
        assert_eq!(params.range_data_ntf_config(), RangeDataNtfConfig::Enable);
    }

    #[test]
    fn test_missing_required_field() {
        let result = SessionParamsBuilder::new()
            .device_type(DeviceType::Controller)
            .build();
        assert_eq!(result.unwrap_err(), Error::BadParameters);
    }

    #[test]
    fn test_unicast_rejects_multiple_destinations() {
        let result = valid_builder()
            .multi_node_mode(MultiNodeMode::Unicast)
            .dst_mac_addresses(vec![
                MacAddress::Short([0x56, 0x78]),
                MacAddress::Short([0x9A, 0xBC]),
            ])
            .build();
        assert_eq!(result.unwrap_err(), Error::BadParameters);
    }

    #[test]
    fn test_individual_key_sts_requires_multicast() {
        let result = valid_builder()
            .multi_node_mode(MultiNodeMode::Unicast)
            .sts_config(StsConfig::DynamicForControleeIndividualKey)
            .build();
        assert_eq!(result.unwrap_err(), Error::BadParameters);
    }

    #[test]
    fn test_address_width_must_match_mode() {
        let result = valid_builder()
            .device_mac_address(MacAddress::Extended([0; 8]))
            .build();
        assert_eq!(result.unwrap_err(), Error::BadParameters);
    }

    #[test]
    fn test_proximity_window_ordering() {
        let result = valid_builder()
            .range_data_ntf_config(RangeDataNtfConfig::EnableProximity)
            .range_data_ntf_proximity_cm(500, 100)
            .build();
        assert_eq!(result.unwrap_err(), Error::BadParameters);
    }

    #[test]
    fn test_update_class_unchanged() {
        let params = valid_builder().build().unwrap();
        assert_eq!(params.update_class(&params), UpdateClass::Unchanged);
    }

    #[test]
    fn test_update_class_report_filter_only() {
        let prev = valid_builder().build().unwrap();
        let next = valid_builder()
            .range_data_ntf_config(RangeDataNtfConfig::EnableProximity)
            .range_data_ntf_proximity_cm(10, 300)
            .build()
            .unwrap();
        assert_eq!(next.update_class(&prev), UpdateClass::ReportFilter);
    }

    #[test]
    fn test_update_class_air_interface() {
        let prev = valid_builder().build().unwrap();
        let next = valid_builder()
            .channel(UwbChannel::Channel5)
            .build()
            .unwrap();
        assert_eq!(next.update_class(&prev), UpdateClass::AirInterface);

        // Mixed diffs classify as air-interface too.
        let mixed = valid_builder()
            .channel(UwbChannel::Channel5)
            .range_data_ntf_config(RangeDataNtfConfig::Disable)
            .build()
            .unwrap();
        assert_eq!(mixed.update_class(&prev), UpdateClass::AirInterface);
    }

    #[test]
    fn test_params_serde_round_trip() {
        let params = valid_builder().build().unwrap();
        let json = serde_json::to_string(&params).unwrap();
        let back: SessionParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }
}
