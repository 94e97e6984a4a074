//! Daily record and stored config sharing the host NVS image across
//! simulated reboots.

use ionstation::adapters::nvs::NvsAdapter;
use ionstation::app::ports::{ConfigPort, PersistentStore};
use ionstation::calibration::selector::{CalibrationSelector, DailyMeasurementState, STATE_ADDRESS, STATE_RECORD_LEN};
use ionstation::config::StationConfig;
use ionstation::datetime::CalendarDate;

const MAY_1: CalendarDate = CalendarDate::new(2024, 5, 1);

/// One boot's worth of selection: a fresh selector over the surviving store.
fn boot(nvs: &mut NvsAdapter, slots: usize, today: CalendarDate) -> usize {
    CalibrationSelector::new(slots).select(nvs, today).index
}

#[test]
fn slots_advance_across_reboots() {
    let mut nvs = NvsAdapter::default();
    let slots: Vec<usize> = (0..6).map(|_| boot(&mut nvs, 4, MAY_1)).collect();
    assert_eq!(slots, [0, 1, 2, 3, 0, 1]);
}

#[test]
fn stored_record_matches_last_selection() {
    let mut nvs = NvsAdapter::default();
    boot(&mut nvs, 4, MAY_1);
    boot(&mut nvs, 4, MAY_1);

    let mut buf = [0u8; STATE_RECORD_LEN];
    nvs.read(STATE_ADDRESS, &mut buf).unwrap();
    assert_eq!(
        DailyMeasurementState::decode(&buf),
        Ok(DailyMeasurementState { date: MAY_1, count: 1 })
    );
}

#[test]
fn saving_config_keeps_the_daily_record() {
    let mut nvs = NvsAdapter::default();
    boot(&mut nvs, 4, MAY_1);

    let config = StationConfig {
        slots_per_day: 4,
        ..StationConfig::default()
    };
    nvs.save(&config).unwrap();

    assert_eq!(nvs.load(), Ok(config));
    assert_eq!(boot(&mut nvs, 4, MAY_1), 1);
}

#[test]
fn fewer_slots_after_reconfiguration_stay_in_range() {
    let mut nvs = NvsAdapter::default();
    for _ in 0..3 {
        boot(&mut nvs, 4, MAY_1);
    }
    // Stored count is 2; with two slots the next index wraps to 1.
    assert_eq!(boot(&mut nvs, 2, MAY_1), 1);
    assert_eq!(boot(&mut nvs, 2, MAY_1), 0);
}

#[test]
fn erased_store_starts_over() {
    let mut nvs = NvsAdapter::default();
    boot(&mut nvs, 4, MAY_1);
    boot(&mut nvs, 4, MAY_1);

    nvs.erase().unwrap();
    assert_eq!(boot(&mut nvs, 4, MAY_1), 0);
}
