//! Wake cycle: the application core.
//!
//! [`WakeCycle`] owns the configuration, calibration table, sensor bank and
//! the per-wake [`CycleContext`].  All I/O flows through port traits passed
//! into [`WakeCycle::run`], so the whole cycle runs against mock adapters
//! in tests.
//!
//! ```text
//!  NetworkPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │           WakeCycle          │
//!  ClockPort ────▶ │ gate · sync · select · poll  │ ──▶ NetworkPort (POST)
//!  PersistentStore │ build                        │
//!                  └──────────────────────────────┘
//! ```
//!
//! Order within one cycle is fixed: connectivity gate, time sync, slot
//! selection (persisted), sampling, telemetry build, uplink.  Deep sleep is
//! requested separately through [`WakeCycle::sleep`].

use log::{error, info, warn};

use crate::calibration::CalibrationTable;
use crate::calibration::selector::CalibrationSelector;
use crate::config::StationConfig;
use crate::error::{Error, Result, UplinkError};
use crate::scheduler::{TimeBasis, poll_until_deadline, poll_until_success};
use crate::sensors::{MeasurementSet, SensorBank};
use crate::telemetry::{PAYLOAD_CAPACITY, TelemetryBuilder, format_timestamp, readings_from};

use super::events::AppEvent;
use super::ports::{ClockPort, EventSink, NetworkPort, PersistentStore, PowerPort};

// ───────────────────────────────────────────────────────────────
// Per-wake state
// ───────────────────────────────────────────────────────────────

/// Mutable state of one wake cycle.
pub struct CycleContext<const N: usize = PAYLOAD_CAPACITY> {
    pub slot: usize,
    pub measurements: MeasurementSet,
    pub builder: TelemetryBuilder<N>,
}

impl<const N: usize> CycleContext<N> {
    fn new() -> Self {
        Self {
            slot: 0,
            measurements: MeasurementSet::default(),
            builder: TelemetryBuilder::new(),
        }
    }

    fn reset(&mut self, slot: usize) {
        self.slot = slot;
        self.measurements = MeasurementSet::default();
    }
}

/// What happened to the record after it was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkOutcome {
    Delivered(u16),
    Failed(UplinkError),
}

/// Summary of a completed cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub slot: usize,
    /// Values that went into the record (the last sampling tick).
    pub measurements: MeasurementSet,
    pub ticks: u32,
    /// Channels without a single good read, left out of the record.
    pub unsampled: usize,
    pub payload_len: usize,
    pub state_persisted: bool,
    pub uplink: UplinkOutcome,
}

// ───────────────────────────────────────────────────────────────
// WakeCycle
// ───────────────────────────────────────────────────────────────

pub struct WakeCycle<const N: usize = PAYLOAD_CAPACITY> {
    config: StationConfig,
    table: CalibrationTable,
    bank: SensorBank,
    selector: CalibrationSelector,
    ctx: CycleContext<N>,
}

impl<const N: usize> WakeCycle<N> {
    /// Wire the cycle together.  The table must have exactly as many slots
    /// as the configuration asks for.
    pub fn new(config: StationConfig, table: CalibrationTable, bank: SensorBank) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        if table.slots() != config.slots() {
            return Err(Error::Init("calibration table slot count differs from config"));
        }
        let selector = CalibrationSelector::new(config.slots());

        Ok(Self {
            config,
            table,
            bank,
            selector,
            ctx: CycleContext::new(),
        })
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn context(&self) -> &CycleContext<N> {
        &self.ctx
    }

    /// Run one cycle up to and including the uplink.
    ///
    /// Returns [`Error::ConnectivityTimeout`] without touching the clock
    /// sync, the daily record or the sensors when the network never comes
    /// up.  An encoding failure returns [`Error::Encode`] and nothing is
    /// posted.  Uplink failures are reported in the [`CycleReport`].
    pub fn run<C, S, T, E>(&mut self, clock: &C, store: &mut S, net: &mut T, sink: &mut E) -> Result<CycleReport>
    where
        C: ClockPort,
        S: PersistentStore,
        T: NetworkPort,
        E: EventSink,
    {
        sink.emit(&AppEvent::CycleStarted {
            at: clock.now(),
            slots: self.selector.slots(),
        });

        // ── 1. Connectivity gate ─────────────────────────────────
        let gate_start = clock.elapsed_ms();
        let connected = poll_until_success(
            clock,
            u64::from(self.config.connect_timeout_ms),
            TimeBasis::Remaining,
            &mut |remaining: i64| net.check_connectivity(remaining),
        );
        let waited_ms = clock.elapsed_ms().saturating_sub(gate_start);
        if !connected {
            error!("Network not ready after {} ms", waited_ms);
            sink.emit(&AppEvent::ConnectivityTimeout { waited_ms });
            return Err(Error::ConnectivityTimeout);
        }
        info!("Network ready after {} ms", waited_ms);
        sink.emit(&AppEvent::Connected { waited_ms });

        // ── 2. Time sync ─────────────────────────────────────────
        match net.sync_time() {
            Ok(()) => sink.emit(&AppEvent::TimeSynced { at: clock.now() }),
            Err(e) => {
                warn!("Time sync failed ({}), keeping RTC time", e);
                sink.emit(&AppEvent::TimeSyncFailed(e));
            }
        }

        // ── 3. Slot selection, persisted before sampling ─────────
        let selection = self.selector.select(store, clock.now().date());
        self.ctx.reset(selection.index);
        sink.emit(&AppEvent::SlotSelected {
            index: selection.index,
            slots: self.selector.slots(),
            previous: selection.previous,
        });
        if let Err(e) = selection.persisted {
            sink.emit(&AppEvent::StatePersistFailed(e));
        }

        // ── 4. Sampling ──────────────────────────────────────────
        let ticks = {
            let table = &self.table;
            let bank = &mut self.bank;
            let ctx = &mut self.ctx;
            poll_until_deadline(
                clock,
                u64::from(self.config.sampling_interval_ms),
                TimeBasis::Remaining,
                &mut |remaining: i64| {
                    bank.capture(table, ctx.slot, &mut ctx.measurements);
                    sink.emit(&AppEvent::Captured {
                        slot: ctx.slot,
                        measurements: ctx.measurements,
                        remaining_ms: remaining,
                    });
                    true
                },
            )
        };
        info!("Sampling done: {} ticks on slot {}", ticks, self.ctx.slot);
        let mut unsampled = 0;
        for kind in self.ctx.measurements.unsampled() {
            warn!("{} never read this cycle; left out of the record", kind);
            sink.emit(&AppEvent::ChannelUnsampled(kind));
            unsampled += 1;
        }

        // ── 5. Build ─────────────────────────────────────────────
        let timestamp = format_timestamp(&clock.now());
        let readings = readings_from(&self.ctx.measurements);
        let payload_len = match self
            .ctx
            .builder
            .build(&self.config.station_code, &timestamp, &readings)
        {
            Ok(payload) => payload.len(),
            Err(e) => {
                error!("Telemetry encoding failed: {}", e);
                sink.emit(&AppEvent::EncodeFailed(e));
                return Err(e.into());
            }
        };
        sink.emit(&AppEvent::TelemetryBuilt { bytes: payload_len });

        // ── 6. Uplink, no retry ──────────────────────────────────
        let uplink = match net.post_json(
            &self.config.server_host,
            self.config.server_port,
            &self.config.server_path,
            self.ctx.builder.payload(),
        ) {
            Ok(status) if (200..300).contains(&status) => {
                info!("Uplink accepted: HTTP {}", status);
                sink.emit(&AppEvent::UplinkSent { status });
                UplinkOutcome::Delivered(status)
            }
            Ok(status) => Self::uplink_failed(UplinkError::Status(status), sink),
            Err(e) => Self::uplink_failed(e, sink),
        };

        Ok(CycleReport {
            slot: self.ctx.slot,
            measurements: self.ctx.measurements,
            ticks,
            unsampled,
            payload_len,
            state_persisted: selection.persisted.is_ok(),
            uplink,
        })
    }

    /// Hand control to the power collaborator until the next wake.
    pub fn sleep(&self, power: &mut impl PowerPort, sink: &mut impl EventSink) {
        info!("Sleeping for {}", self.config.wake);
        sink.emit(&AppEvent::Sleeping { wake: self.config.wake });
        power.deep_sleep_until(&self.config.wake);
    }

    fn uplink_failed(e: UplinkError, sink: &mut impl EventSink) -> UplinkOutcome {
        warn!("Uplink failed: {}; record dropped until next wake", e);
        sink.emit(&AppEvent::UplinkFailed(e));
        UplinkOutcome::Failed(e)
    }
}
