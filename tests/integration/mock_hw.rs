//! Mock adapters for integration tests.
//!
//! Every port call that matters for ordering is appended to a shared
//! [`Journal`], so tests can assert on the full call history of a wake
//! cycle without touching the ADC, NVS or the radio.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ionstation::app::events::AppEvent;
use ionstation::app::ports::{ClockPort, EventSink, NetworkPort, PersistentStore, PowerPort, SensorDriver};
use ionstation::app::service::WakeCycle;
use ionstation::calibration::{Analyte, CalibrationTable};
use ionstation::config::{StationConfig, WakeSpec};
use ionstation::datetime::DateTime;
use ionstation::error::{SensorError, StorageError, UplinkError};
use ionstation::scheduler::MonotonicClock;
use ionstation::sensors::SensorBank;
use ionstation::sensors::battery::BatterySensor;
use ionstation::sensors::ion::IonSensor;
use ionstation::sensors::temperature::TemperatureSensor;

pub const MAY_1: DateTime = DateTime::new(2024, 5, 1, 10, 0, 0);

// ── Call journal ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    CheckConnectivity,
    SyncTime,
    StoreRead,
    StoreWrite,
    SensorRead(Analyte),
    Post,
}

pub type Journal = Rc<RefCell<Vec<Call>>>;

#[allow(dead_code)]
pub fn first(journal: &Journal, call: Call) -> Option<usize> {
    journal.borrow().iter().position(|c| *c == call)
}

#[allow(dead_code)]
pub fn last(journal: &Journal, call: Call) -> Option<usize> {
    journal.borrow().iter().rposition(|c| *c == call)
}

#[allow(dead_code)]
pub fn count(journal: &Journal, call: Call) -> usize {
    journal.borrow().iter().filter(|c| **c == call).count()
}

// ── MockClock ─────────────────────────────────────────────────

/// Advances by `step_ms` on every monotonic read.  The wall clock is a
/// shared cell so a mock network can "sync" it.
pub struct MockClock {
    now_ms: Cell<u64>,
    step_ms: u64,
    pub wall: Rc<Cell<DateTime>>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new(step_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(0),
            step_ms,
            wall: Rc::new(Cell::new(MAY_1)),
        }
    }

    pub fn set_now(&self, at: DateTime) {
        self.wall.set(at);
    }
}

impl MonotonicClock for MockClock {
    fn elapsed_ms(&self) -> u64 {
        let t = self.now_ms.get() + self.step_ms;
        self.now_ms.set(t);
        t
    }
}

impl ClockPort for MockClock {
    fn now(&self) -> DateTime {
        self.wall.get()
    }
}

// ── MockStore ─────────────────────────────────────────────────

/// 64-byte EEPROM image, erased to 0xFF.
pub struct MockStore {
    pub bytes: [u8; 64],
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes: u32,
    journal: Journal,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            bytes: [0xFF; 64],
            fail_reads: false,
            fail_writes: false,
            writes: 0,
            journal,
        }
    }

    /// Overwrite the daily record with bytes that fail its integrity check.
    pub fn corrupt(&mut self) {
        self.bytes[..8].copy_from_slice(&[0xA5, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }
}

impl PersistentStore for MockStore {
    fn read(&self, address: u16, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.journal.borrow_mut().push(Call::StoreRead);
        if self.fail_reads {
            return Err(StorageError::IoError);
        }
        let start = usize::from(address);
        let end = start + buf.len();
        let src = self.bytes.get(start..end).ok_or(StorageError::OutOfRange)?;
        if src.iter().all(|b| *b == 0xFF) {
            return Err(StorageError::NotFound);
        }
        buf.copy_from_slice(src);
        Ok(buf.len())
    }

    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError> {
        self.journal.borrow_mut().push(Call::StoreWrite);
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        let start = usize::from(address);
        let dst = self
            .bytes
            .get_mut(start..start + data.len())
            .ok_or(StorageError::OutOfRange)?;
        dst.copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}

// ── MockNetwork ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub body: Vec<u8>,
}

pub struct MockNetwork {
    /// Failed checks before the link reports ready; `None` never does.
    pub ready_after: Option<u32>,
    pub checks: u32,
    pub sync: Result<(), UplinkError>,
    /// Wall clock moved to this reading on a successful sync.
    pub sync_to: Option<(Rc<Cell<DateTime>>, DateTime)>,
    pub response: Result<u16, UplinkError>,
    pub posts: Vec<Post>,
    journal: Journal,
}

#[allow(dead_code)]
impl MockNetwork {
    pub fn new(journal: Journal) -> Self {
        Self {
            ready_after: Some(0),
            checks: 0,
            sync: Ok(()),
            sync_to: None,
            response: Ok(201),
            posts: Vec::new(),
            journal,
        }
    }

    pub fn last_body(&self) -> Option<&str> {
        self.posts
            .last()
            .and_then(|p| core::str::from_utf8(&p.body).ok())
    }
}

impl NetworkPort for MockNetwork {
    fn check_connectivity(&mut self, _time_hint_ms: i64) -> bool {
        self.journal.borrow_mut().push(Call::CheckConnectivity);
        let n = self.checks;
        self.checks += 1;
        self.ready_after.is_some_and(|after| n >= after)
    }

    fn sync_time(&mut self) -> Result<(), UplinkError> {
        self.journal.borrow_mut().push(Call::SyncTime);
        if self.sync.is_ok() {
            if let Some((wall, at)) = &self.sync_to {
                wall.set(*at);
            }
        }
        self.sync
    }

    fn post_json(&mut self, host: &str, port: u16, path: &str, body: &[u8]) -> Result<u16, UplinkError> {
        self.journal.borrow_mut().push(Call::Post);
        self.posts.push(Post {
            host: host.to_owned(),
            port,
            path: path.to_owned(),
            body: body.to_vec(),
        });
        self.response
    }
}

// ── Sensor drivers ────────────────────────────────────────────

/// Returns `start`, `start + step`, ... and remembers the last value read.
pub struct RampDriver {
    analyte: Analyte,
    next: f32,
    step: f32,
    last: Rc<Cell<f32>>,
    journal: Journal,
}

impl SensorDriver for RampDriver {
    fn raw_read(&mut self) -> Result<f32, SensorError> {
        self.journal.borrow_mut().push(Call::SensorRead(self.analyte));
        let v = self.next;
        self.next += self.step;
        self.last.set(v);
        Ok(v)
    }
}

/// Constant reading for the non-electrode channels.
pub struct Steady(pub f32);

impl SensorDriver for Steady {
    fn raw_read(&mut self) -> Result<f32, SensorError> {
        Ok(self.0)
    }
}

/// Last raw value each electrode driver returned.
pub struct Probes {
    pub last: [Rc<Cell<f32>>; Analyte::COUNT],
}

#[allow(dead_code)]
impl Probes {
    pub fn last(&self, analyte: Analyte) -> f32 {
        self.last[analyte.index()].get()
    }
}

/// Calcium ramps by 10 mV per tick; the other channels hold still.
pub fn sensor_bank(journal: &Journal) -> (SensorBank, Probes) {
    let start = [(3.00, 0.01), (3.65, 0.0), (3.40, 0.0)];
    let last: [Rc<Cell<f32>>; Analyte::COUNT] = Default::default();

    let ions = Analyte::ALL.map(|a| {
        let (next, step) = start[a.index()];
        IonSensor::new(
            a,
            Box::new(RampDriver {
                analyte: a,
                next,
                step,
                last: Rc::clone(&last[a.index()]),
                journal: Rc::clone(journal),
            }),
        )
    });
    let bank = SensorBank::new(
        ions,
        TemperatureSensor::new(Box::new(Steady(21.5))),
        BatterySensor::new(Box::new(Steady(4.083))),
    )
    .unwrap();
    (bank, Probes { last })
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn captures(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Captured { .. }))
            .count()
    }

    pub fn any(&self, pred: impl Fn(&AppEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── MockPower ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPower {
    pub sleeps: Vec<WakeSpec>,
}

impl PowerPort for MockPower {
    fn deep_sleep_until(&mut self, wake: &WakeSpec) {
        self.sleeps.push(*wake);
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Shortest windows validation allows, so a cycle finishes in a few
/// dozen mock ticks.
pub fn test_config() -> StationConfig {
    StationConfig {
        sampling_interval_ms: 1_000,
        connect_timeout_ms: 1_000,
        ..StationConfig::default()
    }
}

/// All collaborators of one station, sharing one journal.
pub struct Rig {
    pub journal: Journal,
    pub clock: MockClock,
    pub store: MockStore,
    pub net: MockNetwork,
    pub sink: RecordingSink,
    pub power: MockPower,
    pub probes: Probes,
}

/// Build a wake cycle with `N` bytes of payload buffer and its mocks.
pub fn rig<const N: usize>(config: StationConfig) -> (WakeCycle<N>, Rig) {
    let journal: Journal = Rc::default();
    let (bank, probes) = sensor_bank(&journal);
    let table = CalibrationTable::factory_default(config.slots()).unwrap();
    let cycle = WakeCycle::<N>::new(config, table, bank).unwrap();

    let rig = Rig {
        clock: MockClock::new(100),
        store: MockStore::new(Rc::clone(&journal)),
        net: MockNetwork::new(Rc::clone(&journal)),
        sink: RecordingSink::default(),
        power: MockPower::default(),
        probes,
        journal,
    };
    (cycle, rig)
}
