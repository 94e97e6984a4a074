//! WakeCycle integration tests: full cycles against mock ports.
//!
//! Covers the fixed step order, what reaches the uplink, and how the daily
//! slot counter moves across cycles and failures.

use ionstation::app::events::AppEvent;
use ionstation::app::service::UplinkOutcome;
use ionstation::calibration::Analyte;
use ionstation::config::WakeSpec;
use ionstation::datetime::DateTime;
use ionstation::error::{EncodeError, Error, UplinkError};
use ionstation::telemetry::PAYLOAD_CAPACITY;

use crate::mock_hw::{Call, MAY_1, count, first, last, rig, test_config};

// ── Happy path ────────────────────────────────────────────────

#[test]
fn first_cycle_of_the_day_posts_one_record_on_slot_zero() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());

    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    assert_eq!(report.slot, 0);
    assert!(report.state_persisted);
    assert_eq!(report.uplink, UplinkOutcome::Delivered(201));

    assert_eq!(rig.net.posts.len(), 1);
    let post = &rig.net.posts[0];
    assert_eq!(post.host, "clustervalley.agricos.mx");
    assert_eq!(post.port, 80);
    assert_eq!(post.path, "/api/Measure");
    assert_eq!(post.body.len(), report.payload_len);
}

#[test]
fn steps_run_in_fixed_order() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    let j = &rig.journal;
    let gate = last(j, Call::CheckConnectivity).unwrap();
    let sync = first(j, Call::SyncTime).unwrap();
    let load = first(j, Call::StoreRead).unwrap();
    let persist = first(j, Call::StoreWrite).unwrap();
    let first_sample = first(j, Call::SensorRead(Analyte::Calcium)).unwrap();
    let last_sample = last(j, Call::SensorRead(Analyte::Potassium)).unwrap();
    let post = first(j, Call::Post).unwrap();

    assert!(gate < sync);
    assert!(sync < load);
    assert!(load < persist);
    assert!(persist < first_sample, "daily record must be saved before sampling");
    assert!(last_sample < post);
    assert_eq!(post, j.borrow().len() - 1, "post is the last port call");
}

#[test]
fn events_follow_the_cycle() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    let events = &rig.sink.events;
    assert!(matches!(events[0], AppEvent::CycleStarted { slots: 4, .. }));
    assert!(matches!(events[1], AppEvent::Connected { .. }));
    assert!(matches!(events[2], AppEvent::TimeSynced { .. }));
    assert!(matches!(
        events[3],
        AppEvent::SlotSelected {
            index: 0,
            slots: 4,
            previous: None
        }
    ));
    assert_eq!(rig.sink.captures() as u32, report.ticks);
    assert_eq!(report.unsampled, 0);
    assert!(!rig.sink.any(|e| matches!(e, AppEvent::ChannelUnsampled(_))));
    let tail = &events[events.len() - 2..];
    assert!(matches!(tail[0], AppEvent::TelemetryBuilt { bytes } if bytes == report.payload_len));
    assert_eq!(tail[1], AppEvent::UplinkSent { status: 201 });
}

// ── Sampling ──────────────────────────────────────────────────

#[test]
fn only_the_last_tick_is_transmitted() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    assert!(report.ticks > 1);
    assert_eq!(count(&rig.journal, Call::SensorRead(Analyte::Calcium)), report.ticks as usize);

    let calcium = report.measurements.ion(Analyte::Calcium);
    assert_eq!(calcium.raw, rig.probes.last(Analyte::Calcium));

    let first_capture = rig
        .sink
        .events
        .iter()
        .find_map(|e| match e {
            AppEvent::Captured { measurements, .. } => Some(*measurements),
            _ => None,
        })
        .unwrap();
    assert!(first_capture.ion(Analyte::Calcium).raw < calcium.raw);

    let body: serde_json::Value = serde_json::from_slice(&rig.net.posts[0].body).unwrap();
    let sent = body["d"][0]["m"][0]["v"].as_f64().unwrap();
    assert!((sent - f64::from(calcium.value)).abs() < 1e-3);
}

#[test]
fn capture_ticks_count_down_the_sampling_window() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    let remaining: Vec<i64> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Captured { remaining_ms, .. } => Some(*remaining_ms),
            _ => None,
        })
        .collect();
    assert!(remaining.windows(2).all(|w| w[0] > w[1]));
    assert!(remaining[0] <= 1_000);
}

#[test]
fn record_carries_station_code_timestamp_and_every_channel() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    let body: serde_json::Value = serde_json::from_slice(&rig.net.posts[0].body).unwrap();
    assert_eq!(body["s"], "2024-05-01T10:00:00Z");
    assert_eq!(body["d"].as_array().unwrap().len(), 1);
    assert_eq!(body["d"][0]["k"], "ION001");

    let readings = body["d"][0]["m"].as_array().unwrap();
    let codes: Vec<&str> = readings.iter().map(|r| r["m"].as_str().unwrap()).collect();
    assert_eq!(codes, ["cCa", "cNo3", "cK", "ion_temp", "ion_bl"]);
    assert_eq!(readings[3]["v"].as_f64(), Some(21.5));
    assert_eq!(readings[4]["v"].as_u64(), Some(87));
}

// ── Connectivity gate ─────────────────────────────────────────

#[test]
fn no_network_stops_before_anything_else() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    rig.net.ready_after = None;

    let err = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap_err();

    assert_eq!(err, Error::ConnectivityTimeout);
    assert!(rig.net.checks > 1);
    for call in [
        Call::SyncTime,
        Call::StoreRead,
        Call::StoreWrite,
        Call::SensorRead(Analyte::Calcium),
        Call::Post,
    ] {
        assert_eq!(count(&rig.journal, call), 0, "{call:?} after timeout");
    }
    assert!(rig.sink.any(|e| matches!(e, AppEvent::ConnectivityTimeout { waited_ms } if *waited_ms >= 1_000)));
}

#[test]
fn slow_link_is_waited_for() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    rig.net.ready_after = Some(3);

    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    assert_eq!(count(&rig.journal, Call::CheckConnectivity), 4);
    assert_eq!(report.uplink, UplinkOutcome::Delivered(201));
}

// ── Time sync ─────────────────────────────────────────────────

#[test]
fn failed_time_sync_keeps_going_on_rtc_time() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    rig.net.sync = Err(UplinkError::TimeSyncFailed);

    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    assert_eq!(report.uplink, UplinkOutcome::Delivered(201));
    assert!(rig.sink.any(|e| *e == AppEvent::TimeSyncFailed(UplinkError::TimeSyncFailed)));
    assert_eq!(rig.net.last_body().map(|b| b.contains("2024-05-01T10:00:00Z")), Some(true));
}

#[test]
fn synced_date_drives_selection_and_timestamp() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    // RTC lost power overnight; network time says it is still May 1st.
    rig.clock.set_now(DateTime::new(2000, 1, 1, 0, 0, 5));
    rig.net.sync_to = Some((rig.clock.wall.clone(), DateTime::new(2024, 5, 1, 16, 0, 0)));

    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    assert_eq!(report.slot, 1);
    assert!(rig.net.last_body().unwrap().contains("\"s\":\"2024-05-01T16:00:00Z\""));
}

// ── Slot counter ──────────────────────────────────────────────

#[test]
fn same_day_cycles_walk_every_slot_and_wrap() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());

    let slots: Vec<usize> = (0..5)
        .map(|_| {
            cycle
                .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
                .unwrap()
                .slot
        })
        .collect();

    assert_eq!(slots, [0, 1, 2, 3, 0]);
    assert_eq!(rig.net.posts.len(), 5);
}

#[test]
fn new_day_restarts_at_slot_zero() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    for _ in 0..2 {
        cycle
            .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
            .unwrap();
    }

    rig.clock.set_now(DateTime::new(2024, 5, 2, 0, 5, 0));
    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();
    assert_eq!(report.slot, 0);
}

#[test]
fn clock_rollback_restarts_at_slot_zero() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    rig.clock.set_now(DateTime::new(2024, 5, 3, 9, 0, 0));
    for _ in 0..2 {
        cycle
            .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
            .unwrap();
    }

    rig.clock.set_now(MAY_1);
    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();
    assert_eq!(report.slot, 0);
}

#[test]
fn corrupt_record_degrades_to_slot_zero_and_recovers() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    rig.store.corrupt();

    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();
    assert_eq!(report.slot, 0);
    assert!(report.state_persisted);
    assert!(rig.sink.any(|e| matches!(e, AppEvent::SlotSelected { previous: None, .. })));

    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();
    assert_eq!(report.slot, 1);
}

#[test]
fn unreadable_store_degrades_to_slot_zero() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    rig.store.fail_reads = true;
    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();
    assert_eq!(report.slot, 0);
}

#[test]
fn failed_persist_still_samples_and_posts() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    rig.store.fail_writes = true;

    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    assert!(!report.state_persisted);
    assert!(report.ticks > 0);
    assert_eq!(rig.net.posts.len(), 1);
    assert!(rig.sink.any(|e| matches!(e, AppEvent::StatePersistFailed(_))));

    // Nothing was stored, so the next cycle cannot advance.
    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();
    assert_eq!(report.slot, 0);
}

// ── Encoding and uplink ───────────────────────────────────────

#[test]
fn oversized_record_is_not_posted() {
    let (mut cycle, mut rig) = rig::<64>(test_config());

    let err = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap_err();

    assert!(matches!(err, Error::Encode(EncodeError::Overflow { capacity: 64, .. })));
    assert!(rig.net.posts.is_empty());
    assert!(cycle.context().builder.payload().is_empty());
    assert_eq!(rig.store.writes, 1, "selection still happened");
    assert!(rig.sink.any(|e| matches!(e, AppEvent::EncodeFailed(_))));
    assert!(!rig.sink.any(|e| matches!(e, AppEvent::TelemetryBuilt { .. })));
}

#[test]
fn rejected_post_is_reported_not_retried() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    rig.net.response = Ok(500);

    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    assert_eq!(report.uplink, UplinkOutcome::Failed(UplinkError::Status(500)));
    assert_eq!(count(&rig.journal, Call::Post), 1);
    assert!(rig.sink.any(|e| *e == AppEvent::UplinkFailed(UplinkError::Status(500))));
}

#[test]
fn dropped_connection_is_reported() {
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(test_config());
    rig.net.response = Err(UplinkError::Disconnected);

    let report = cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    assert_eq!(report.uplink, UplinkOutcome::Failed(UplinkError::Disconnected));
    assert!(report.state_persisted);
}

// ── Sleep ─────────────────────────────────────────────────────

#[test]
fn sleep_requests_the_configured_wake() {
    let mut config = test_config();
    config.wake = WakeSpec::new(0, 8, 0, 0);
    let (mut cycle, mut rig) = rig::<PAYLOAD_CAPACITY>(config);
    cycle
        .run(&rig.clock, &mut rig.store, &mut rig.net, &mut rig.sink)
        .unwrap();

    cycle.sleep(&mut rig.power, &mut rig.sink);

    assert_eq!(rig.power.sleeps, [WakeSpec::new(0, 8, 0, 0)]);
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::Sleeping {
            wake: WakeSpec::new(0, 8, 0, 0)
        })
    );
}
