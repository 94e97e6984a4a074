//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ WakeCycle (domain)
//! ```
//!
//! Driven adapters (clock, persistent store, sensor drivers, network, power,
//! console) implement these traits.  The [`WakeCycle`](super::service::WakeCycle)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use crate::config::{StationConfig, WakeSpec};
use crate::datetime::DateTime;
use crate::error::{SensorError, StorageError, UplinkError};
use crate::scheduler::MonotonicClock;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: RTC + uptime counter → domain)
// ───────────────────────────────────────────────────────────────

/// Wall clock plus the monotonic counter used by the scheduler.
pub trait ClockPort: MonotonicClock {
    /// Current UTC calendar reading.
    fn now(&self) -> DateTime;
}

// ───────────────────────────────────────────────────────────────
// Persistent store port (driven adapter: domain ↔ EEPROM / NVS)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed non-volatile storage.
///
/// Implementations must make each `write` atomic with respect to power
/// loss at record granularity; the daily-state record is 8 bytes.
pub trait PersistentStore {
    /// Read up to `buf.len()` bytes starting at `address`.  Returns the
    /// number of bytes copied.  Never-written ranges report
    /// [`StorageError::NotFound`].
    fn read(&self, address: u16, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write `data` starting at `address`.
    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor driver port (driven adapter: ADC / gauge → domain)
// ───────────────────────────────────────────────────────────────

/// One physical input channel.
///
/// Ion electrodes report volts, the temperature probe °C, the battery gauge
/// cell voltage.  Calibration is applied by the domain, not the driver.
pub trait SensorDriver {
    fn raw_read(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: domain ↔ modem / WiFi + HTTP)
// ───────────────────────────────────────────────────────────────

/// Uplink transport session.
pub trait NetworkPort {
    /// Cheap readiness check, called in a busy loop.  `time_hint_ms` is the
    /// time remaining in the readiness wait.
    fn check_connectivity(&mut self, time_hint_ms: i64) -> bool;

    /// Set the station clock from network time.
    fn sync_time(&mut self) -> Result<(), UplinkError>;

    /// POST `body` as `application/json`.  Returns the HTTP status code.
    fn post_json(&mut self, host: &str, port: u16, path: &str, body: &[u8]) -> Result<u16, UplinkError>;
}

// ───────────────────────────────────────────────────────────────
// Power port (driven adapter: domain → PMU / deep sleep)
// ───────────────────────────────────────────────────────────────

pub trait PowerPort {
    /// Enter deep sleep until `wake`.  On hardware this does not return;
    /// simulations record the request and return.
    fn deep_sleep_until(&mut self, wake: &WakeSpec);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → console)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Best-effort: a sink must never fail the cycle.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists station configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`StationConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<StationConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &StationConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Encoded config does not fit the reserved region.
    TooLarge,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::TooLarge => write!(f, "config too large for its region"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::Corrupted => Self::Config("stored config corrupted"),
            ConfigError::TooLarge => Self::Config("config too large"),
            ConfigError::IoError => Self::Storage(StorageError::IoError),
        }
    }
}
