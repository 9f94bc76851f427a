//! End-to-end service tests over the scripted mock radio.
//!
//! Every test spawns the real registry and notification driver; only the
//! radio is scripted. Assertions about asynchronous effects always wait for
//! the corresponding notification first, so they never race the registry
//! loop.

use std::time::Duration;

use uwbr_core::{
    Controlee, DeviceState, Error, MulticastAction, RangeDataNtfConfig, RangingMeasurements,
    ReasonCode, SessionState, SessionType, ShortAddress, StatusCode,
};
use uwbr_service::{
    CapTlv, CountryCode, DeviceConfigTlv, DeviceInfo, LoggerMode, MockCall, MockOp, MockRadio,
    MockRadioHandle, Notification, RadioEvent, RangingService, RawRangeData, ServiceConfig,
    VendorMessage,
};

use uwbr_integration_tests::{
    ChannelHandler, init_tracing, multicast_builder, multicast_params, unicast_params, wait_for,
    wait_for_session_state,
};

fn service(
    config: ServiceConfig,
) -> (
    RangingService,
    MockRadioHandle,
    tokio::sync::mpsc::UnboundedReceiver<Notification>,
) {
    init_tracing();
    let (radio, handle) = MockRadio::new();
    let (handler, notifications) = ChannelHandler::new();
    let service = RangingService::spawn(radio, handler, config);
    (service, handle, notifications)
}

fn range_data(session_id: u32) -> RadioEvent {
    RadioEvent::RangeData(RawRangeData {
        session_id,
        ranging_interval_ms: 200,
        measurements: RangingMeasurements::TwoWay(vec![]),
    })
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let (service, handle, mut notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();

    service
        .init_session(5, SessionType::Ranging, multicast_params())
        .await
        .unwrap();
    assert_eq!(service.session_state(5).await.unwrap(), SessionState::Init);
    assert_eq!(service.session_count().await.unwrap(), 1);

    service.start_ranging(5).await.unwrap();
    assert_eq!(service.session_state(5).await.unwrap(), SessionState::Active);

    // Radio stops the session on its own after exhausting retries.
    handle.send_event(RadioEvent::SessionStatus {
        session_id: 5,
        state: SessionState::Idle,
        reason: ReasonCode::MaxRangingRoundRetryCountReached,
    });
    let stopped = wait_for_session_state(&mut notifications, 5, SessionState::Idle).await;
    assert_eq!(
        stopped,
        Notification::SessionState {
            session_id: 5,
            state: SessionState::Idle,
            reason: ReasonCode::MaxRangingRoundRetryCountReached,
        }
    );
    assert_eq!(service.session_state(5).await.unwrap(), SessionState::Idle);

    // Restartable from Idle.
    service.start_ranging(5).await.unwrap();
    service.stop_ranging(5).await.unwrap();

    service.deinit_session(5).await.unwrap();
    assert_eq!(service.session_count().await.unwrap(), 0);
    assert_eq!(
        service.session_state(5).await.unwrap_err(),
        Error::BadParameters
    );

    // The id is free again.
    service
        .init_session(5, SessionType::Ranging, multicast_params())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_duplicate_session_id_rejected() {
    let (service, _handle, _notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();

    service
        .init_session(7, SessionType::Ranging, multicast_params())
        .await
        .unwrap();
    assert_eq!(
        service
            .init_session(7, SessionType::Ranging, multicast_params())
            .await
            .unwrap_err(),
        Error::DuplicateSessionId
    );
    assert_eq!(service.session_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_session_capacity() {
    let config = ServiceConfig { max_sessions: 2, ..ServiceConfig::default() };
    let (service, _handle, _notifications) = service(config);
    service.enable().await.unwrap();

    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();
    service.init_session(2, SessionType::Ranging, multicast_params()).await.unwrap();
    assert_eq!(
        service
            .init_session(3, SessionType::Ranging, multicast_params())
            .await
            .unwrap_err(),
        Error::MaxSessionsExceeded
    );

    // Deinit frees a slot.
    service.deinit_session(1).await.unwrap();
    service.init_session(3, SessionType::Ranging, multicast_params()).await.unwrap();
}

#[tokio::test]
async fn test_commands_require_enable() {
    let (service, _handle, _notifications) = service(ServiceConfig::default());
    assert_eq!(
        service
            .init_session(1, SessionType::Ranging, multicast_params())
            .await
            .unwrap_err(),
        Error::BadParameters
    );
    assert_eq!(service.start_ranging(1).await.unwrap_err(), Error::BadParameters);
    assert_eq!(service.disable(false).await.unwrap_err(), Error::BadParameters);

    service.enable().await.unwrap();
    assert_eq!(service.enable().await.unwrap_err(), Error::BadParameters);
}

#[tokio::test]
async fn test_controlee_batch_is_atomic() {
    let (service, handle, _notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();

    // Duplicate address inside the batch: rejected before the radio is asked.
    let batch = vec![
        Controlee::new(ShortAddress::from(0x0a01), 1),
        Controlee::new(ShortAddress::from(0x0a01), 2),
    ];
    assert_eq!(
        service
            .update_controlees(1, MulticastAction::Add, batch)
            .await
            .unwrap_err(),
        Error::BadParameters
    );
    assert!(
        !handle
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::UpdateMulticastList { .. }))
    );

    // A valid batch lands.
    let batch = vec![
        Controlee::new(ShortAddress::from(0x0a01), 1),
        Controlee::new(ShortAddress::from(0x0a02), 2),
    ];
    service.update_controlees(1, MulticastAction::Add, batch).await.unwrap();

    // Removing an absent address is idempotent.
    service
        .update_controlees(
            1,
            MulticastAction::Remove,
            vec![Controlee::new(ShortAddress::from(0x0aff), 0)],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_controlee_capacity_rejects_whole_batch() {
    let config = ServiceConfig { max_controlees: 2, ..ServiceConfig::default() };
    let (service, handle, _notifications) = service(config);
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();

    service
        .update_controlees(
            1,
            MulticastAction::Add,
            vec![Controlee::new(ShortAddress::from(0x0a01), 1)],
        )
        .await
        .unwrap();

    // Batch of two would exceed capacity; neither entry may land.
    let before = handle.calls().len();
    assert_eq!(
        service
            .update_controlees(
                1,
                MulticastAction::Add,
                vec![
                    Controlee::new(ShortAddress::from(0x0a02), 2),
                    Controlee::new(ShortAddress::from(0x0a03), 3),
                ],
            )
            .await
            .unwrap_err(),
        Error::BadParameters
    );
    assert_eq!(handle.calls().len(), before);

    // One more still fits.
    service
        .update_controlees(
            1,
            MulticastAction::Add,
            vec![Controlee::new(ShortAddress::from(0x0a02), 2)],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_multicast_add_rejected_on_unicast_session() {
    let (service, _handle, _notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, unicast_params()).await.unwrap();

    assert_eq!(
        service
            .update_controlees(
                1,
                MulticastAction::Add,
                vec![Controlee::new(ShortAddress::from(0x0a01), 1)],
            )
            .await
            .unwrap_err(),
        Error::BadParameters
    );
}

#[tokio::test]
async fn test_report_sequence_numbers_per_session() {
    let (service, handle, mut notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();
    service.init_session(2, SessionType::Ranging, multicast_params()).await.unwrap();
    service.start_ranging(1).await.unwrap();
    service.start_ranging(2).await.unwrap();

    // Interleave rounds from both sessions.
    for _ in 0..2 {
        handle.send_event(range_data(1));
        handle.send_event(range_data(2));
    }

    let mut seq_1 = Vec::new();
    let mut seq_2 = Vec::new();
    while seq_1.len() + seq_2.len() < 4 {
        let Notification::Ranging(report) =
            wait_for(&mut notifications, |n| matches!(n, Notification::Ranging(_))).await
        else {
            unreachable!()
        };
        match report.session_id {
            1 => seq_1.push(report.sequence_number),
            2 => seq_2.push(report.sequence_number),
            other => panic!("report for unexpected session {other}"),
        }
    }
    assert_eq!(seq_1, vec![0, 1]);
    assert_eq!(seq_2, vec![0, 1]);
}

#[tokio::test]
async fn test_sequence_numbers_survive_stop_start() {
    let (service, handle, mut notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();
    service.start_ranging(1).await.unwrap();

    handle.send_event(range_data(1));
    let Notification::Ranging(first) =
        wait_for(&mut notifications, |n| matches!(n, Notification::Ranging(_))).await
    else {
        unreachable!()
    };

    service.stop_ranging(1).await.unwrap();
    service.start_ranging(1).await.unwrap();

    handle.send_event(range_data(1));
    let Notification::Ranging(second) =
        wait_for(&mut notifications, |n| matches!(n, Notification::Ranging(_))).await
    else {
        unreachable!()
    };

    assert_eq!(first.sequence_number, 0);
    assert_eq!(second.sequence_number, 1);
}

#[tokio::test]
async fn test_reconfigure_while_active() {
    let (service, _handle, _notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();
    service.start_ranging(1).await.unwrap();

    // Air-interface change while ranging: rejected, config untouched.
    let air = multicast_builder()
        .ranging_interval_ms(400)
        .build()
        .unwrap();
    assert_eq!(
        service.reconfigure(1, air).await.unwrap_err(),
        Error::BadParameters
    );
    assert_eq!(service.session_params(1).await.unwrap(), multicast_params());

    // Report-filter change is fine while ranging.
    let filtered = multicast_builder()
        .range_data_ntf_config(RangeDataNtfConfig::Disable)
        .build()
        .unwrap();
    service.reconfigure(1, filtered.clone()).await.unwrap();
    assert_eq!(service.session_params(1).await.unwrap(), filtered);
}

#[tokio::test(start_paused = true)]
async fn test_command_timeout_leaves_state_unchanged() {
    let (service, handle, _notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();

    handle.set_response_delay(Duration::from_secs(5));
    assert_eq!(service.start_ranging(1).await.unwrap_err(), Error::Timeout);

    // Rollback to the pre-command state.
    handle.set_response_delay(Duration::from_millis(0));
    assert_eq!(service.session_state(1).await.unwrap(), SessionState::Init);
}

#[tokio::test]
async fn test_device_error_blocks_new_work_but_not_teardown() {
    let (service, handle, mut notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();

    handle.send_event(RadioEvent::DeviceStatus(DeviceState::Error));
    wait_for(&mut notifications, |n| {
        matches!(n, Notification::DeviceState(DeviceState::Error))
    })
    .await;
    assert_eq!(service.device_state().await.unwrap(), DeviceState::Error);

    assert_eq!(
        service
            .init_session(2, SessionType::Ranging, multicast_params())
            .await
            .unwrap_err(),
        Error::BadParameters
    );
    assert_eq!(service.start_ranging(1).await.unwrap_err(), Error::BadParameters);

    // A duplicate id is reported as such even while the device is in the
    // error state; the id check comes first.
    assert_eq!(
        service
            .init_session(1, SessionType::Ranging, multicast_params())
            .await
            .unwrap_err(),
        Error::DuplicateSessionId
    );

    // Teardown still goes through.
    service.deinit_session(1).await.unwrap();
}

#[tokio::test]
async fn test_radio_failure_surfaces_translated_error() {
    let (service, handle, _notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();

    handle.set_status(MockOp::SessionStart, StatusCode::Rejected);
    assert_eq!(
        service.start_ranging(1).await.unwrap_err(),
        Error::ProtocolSpecific
    );
    assert_eq!(service.session_state(1).await.unwrap(), SessionState::Init);
}

#[tokio::test]
async fn test_failed_configuration_rolls_back_device_session() {
    let (service, handle, _notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();

    handle.set_status(MockOp::SetAppConfig, StatusCode::InvalidParam);
    assert_eq!(
        service
            .init_session(9, SessionType::Ranging, multicast_params())
            .await
            .unwrap_err(),
        Error::BadParameters
    );
    assert_eq!(service.session_count().await.unwrap(), 0);
    assert!(
        handle
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::SessionDeinit { session_id: 9 }))
    );

    // The id stays free.
    handle.set_status(MockOp::SetAppConfig, StatusCode::Ok);
    service.init_session(9, SessionType::Ranging, multicast_params()).await.unwrap();
}

#[tokio::test]
async fn test_disable_releases_every_session() {
    let (service, _handle, mut notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();
    service.init_session(2, SessionType::Ranging, multicast_params()).await.unwrap();
    service.start_ranging(1).await.unwrap();

    service.disable(false).await.unwrap();
    assert_eq!(service.session_count().await.unwrap(), 0);

    // Both sessions report Deinit; the table drains in no particular order.
    let mut released = Vec::new();
    while released.len() < 2 {
        let Notification::SessionState { session_id, .. } = wait_for(&mut notifications, |n| {
            matches!(n, Notification::SessionState { state: SessionState::Deinit, .. })
        })
        .await
        else {
            unreachable!()
        };
        released.push(session_id);
    }
    released.sort_unstable();
    assert_eq!(released, vec![1, 2]);

    // A fresh enable starts from a clean table.
    service.enable().await.unwrap();
    assert_eq!(service.session_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_device_reset_clears_sessions_and_error_state() {
    let (service, handle, mut notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();

    handle.send_event(RadioEvent::DeviceStatus(DeviceState::Error));
    wait_for(&mut notifications, |n| {
        matches!(n, Notification::DeviceState(DeviceState::Error))
    })
    .await;

    service.device_reset().await.unwrap();
    assert!(handle.calls().contains(&MockCall::DeviceReset));
    assert_eq!(service.session_count().await.unwrap(), 0);
    assert_eq!(service.device_state().await.unwrap(), DeviceState::Ready);
    wait_for_session_state(&mut notifications, 1, SessionState::Deinit).await;

    // Back in business without a fresh enable.
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();
}

#[tokio::test]
async fn test_vendor_command_and_notification_passthrough() {
    let (service, handle, mut notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();

    handle.set_vendor_response(vec![0xde, 0xad]);
    let response = service.raw_vendor_cmd(0x0c, 0x01, vec![0x01, 0x02]).await.unwrap();
    assert_eq!(response, vec![0xde, 0xad]);

    let message = VendorMessage { gid: 0x0c, oid: 0x02, payload: vec![0xaa, 0xbb] };
    handle.send_event(RadioEvent::Vendor(message.clone()));
    let forwarded =
        wait_for(&mut notifications, |n| matches!(n, Notification::Vendor(_))).await;
    assert_eq!(forwarded, Notification::Vendor(message));
}

#[tokio::test]
async fn test_country_code_logger_mode_and_power_stats() {
    let (service, handle, _notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();

    let code = CountryCode::new(*b"NO").unwrap();
    service.set_country_code(code).await.unwrap();
    service.set_logger_mode(LoggerMode::Filtered).await.unwrap();

    let stats = service.power_stats().await.unwrap();
    assert_eq!(stats.status, StatusCode::Ok);

    let calls = handle.calls();
    assert!(calls.contains(&MockCall::SetCountryCode(code)));
    assert!(calls.contains(&MockCall::SetLoggerMode(LoggerMode::Filtered)));
    assert!(calls.contains(&MockCall::PowerStats));
}

#[tokio::test]
async fn test_device_queries_pass_through() {
    let (service, handle, _notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();

    handle.set_device_info(DeviceInfo {
        status: StatusCode::Ok,
        uci_version: 0x0200,
        mac_version: 0x0100,
        phy_version: 0x0100,
        uci_test_version: 0,
        vendor_spec_info: vec![0x01],
    });
    let info = service.device_info().await.unwrap();
    assert_eq!(info.uci_version, 0x0200);
    assert_eq!(info.vendor_spec_info, vec![0x01]);

    handle.set_caps(vec![CapTlv { typ: 0x05, value: vec![0x03] }]);
    let caps = service.caps_info().await.unwrap();
    assert_eq!(caps, vec![CapTlv { typ: 0x05, value: vec![0x03] }]);

    service
        .set_device_config(vec![DeviceConfigTlv { cfg_id: 0x01, value: vec![0x00] }])
        .await
        .unwrap();
    handle.set_device_config_response(vec![DeviceConfigTlv { cfg_id: 0x01, value: vec![0x00] }]);
    let tlvs = service.get_device_config(vec![0x01]).await.unwrap();
    assert_eq!(tlvs.len(), 1);
    assert_eq!(tlvs[0].cfg_id, 0x01);

    service.init_session(3, SessionType::Ranging, multicast_params()).await.unwrap();
    handle.set_ranging_count(42);
    assert_eq!(service.ranging_count(3).await.unwrap(), 42);
    // Unknown ids are rejected locally, before the radio is asked.
    assert_eq!(service.ranging_count(99).await.unwrap_err(), Error::BadParameters);

    let calls = handle.calls();
    assert!(calls.contains(&MockCall::DeviceInfo));
    assert!(calls.contains(&MockCall::CapsInfo));
    assert!(calls.contains(&MockCall::SetDeviceConfig { count: 1 }));
    assert!(calls.contains(&MockCall::GetDeviceConfig { cfg_ids: vec![0x01] }));
    assert!(calls.contains(&MockCall::RangingCount { session_id: 3 }));
    assert!(!calls.contains(&MockCall::RangingCount { session_id: 99 }));
}

#[tokio::test]
async fn test_remote_deinit_releases_id() {
    let (service, handle, mut notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(4, SessionType::Ranging, multicast_params()).await.unwrap();

    handle.send_event(RadioEvent::SessionStatus {
        session_id: 4,
        state: SessionState::Deinit,
        reason: ReasonCode::ErrorInvalidRangingInterval,
    });
    wait_for_session_state(&mut notifications, 4, SessionState::Deinit).await;

    assert_eq!(service.session_count().await.unwrap(), 0);
    service.init_session(4, SessionType::Ranging, multicast_params()).await.unwrap();
}

#[tokio::test]
async fn test_events_for_unknown_sessions_are_dropped() {
    let (service, handle, mut notifications) = service(ServiceConfig::default());
    service.enable().await.unwrap();
    service.init_session(1, SessionType::Ranging, multicast_params()).await.unwrap();
    wait_for_session_state(&mut notifications, 1, SessionState::Init).await;

    handle.send_event(range_data(99));
    handle.send_event(RadioEvent::SessionStatus {
        session_id: 99,
        state: SessionState::Idle,
        reason: ReasonCode::MaxRangingRoundRetryCountReached,
    });
    // A marker event behind the strays: everything queued before it must have
    // been swallowed without a notification.
    handle.send_event(range_data(1));

    let next = wait_for(&mut notifications, |n| {
        matches!(n, Notification::Ranging(_) | Notification::SessionState { .. })
    })
    .await;
    let Notification::Ranging(report) = next else {
        panic!("stray event leaked a notification: {next:?}");
    };
    assert_eq!(report.session_id, 1);
}
