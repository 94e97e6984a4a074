//! IonStation firmware: main entry point.
//!
//! One wake cycle per boot.  The chip comes out of deep sleep, runs the
//! cycle, and goes back to sleep until the next calibration slot.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  hardware (ADC)   LogEventSink   NvsAdapter      SystemClock   │
//! │  (SensorDriver)   (EventSink)    (Store+Config)  (ClockPort)   │
//! │  StationNetwork   DeepSleep                                    │
//! │  (NetworkPort)    (PowerPort)                                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              WakeCycle (pure logic)                    │    │
//! │  │  selector · scheduler · sensors · telemetry            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use ionstation::adapters::hardware;
use ionstation::adapters::log_sink::LogEventSink;
use ionstation::adapters::network::StationNetwork;
use ionstation::adapters::nvs::NvsAdapter;
use ionstation::adapters::power::DeepSleep;
use ionstation::adapters::time::SystemClock;
use ionstation::app::events::AppEvent;
use ionstation::app::ports::{ConfigPort, EventSink};
use ionstation::app::service::{UplinkOutcome, WakeCycle};
use ionstation::calibration::CalibrationTable;
use ionstation::config::StationConfig;
use ionstation::error::Error;
use ionstation::scheduler::MonotonicClock;

/// Interval between stall diagnostics.
const STALL_REPORT_MS: u32 = 10_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  IonStation v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Persistent store + config ──────────────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            // Selection falls back to slot 0 when the store is unreadable.
            warn!("NVS init failed ({}), running without persistence", e);
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Stored config unusable ({}), using defaults", e);
            StationConfig::default()
        }
    };
    info!(
        "Station {} | {} slots/day | sampling {} s | wake {}",
        config.station_code,
        config.slots_per_day,
        config.sampling_interval_ms / 1000,
        config.wake
    );

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take().ok();

    hardware::init_adc()?;
    let bank = hardware::build_sensor_bank()?;
    let table = CalibrationTable::factory_default(config.slots()).map_err(Error::from)?;

    let mut net = StationNetwork::start(
        peripherals.modem,
        sysloop,
        nvs_partition,
        &config.wifi_ssid,
        &config.wifi_password,
    )?;
    let clock = SystemClock::new();
    let mut power = DeepSleep::new();
    let mut sink = LogEventSink::new(config.output_format);

    // ── 4. Wake cycle ─────────────────────────────────────────
    let mut cycle: WakeCycle = WakeCycle::new(config, table, bank)?;
    match cycle.run(&clock, &mut nvs, &mut net, &mut sink) {
        Ok(report) => match report.uplink {
            UplinkOutcome::Delivered(status) => {
                info!("Cycle complete: slot {}, HTTP {}", report.slot, status);
            }
            UplinkOutcome::Failed(e) => warn!("Cycle complete, record lost: {}", e),
        },
        Err(Error::ConnectivityTimeout) => stall(&clock, &mut sink),
        Err(e) => error!("Cycle aborted: {}", e),
    }

    // ── 5. Sleep until the next slot ──────────────────────────
    cycle.sleep(&mut power, &mut sink);
    Ok(())
}

/// No network: stay awake and keep telling the operator until reset.
fn stall(clock: &SystemClock, sink: &mut impl EventSink) -> ! {
    let since = clock.elapsed_ms();
    loop {
        sink.emit(&AppEvent::Stalled {
            since_ms: clock.elapsed_ms().saturating_sub(since),
        });
        FreeRtos::delay_ms(STALL_REPORT_MS);
    }
}
