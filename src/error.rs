//! Unified error types for the IonStation firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! wake-cycle error handling uniform.  All variants are `Copy` so they can
//! be carried inside [`AppEvent`](crate::app::events::AppEvent)s without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned implausible data.
    Sensor(SensorError),
    /// The persistent store could not be read or written.
    Storage(StorageError),
    /// The telemetry payload could not be encoded into its buffer.
    Encode(EncodeError),
    /// The uplink transport failed.
    Uplink(UplinkError),
    /// The network never became ready within the configured bound.
    ConnectivityTimeout,
    /// Startup wiring is incomplete or inconsistent.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Encode(e) => write!(f, "encode: {e}"),
            Self::Uplink(e) => write!(f, "uplink: {e}"),
            Self::ConnectivityTimeout => write!(f, "network not ready before timeout"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// Reading is outside the physically plausible range.
    OutOfRange,
    /// Driver returned NaN or infinity.
    NotFinite,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::NotFinite => write!(f, "reading not finite"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Nothing has been written at the requested address yet.
    NotFound,
    /// Address range falls outside the store.
    OutOfRange,
    /// Record failed its magic/version/checksum check.
    Corrupted,
    /// Generic I/O error from the backend.
    IoError,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::OutOfRange => write!(f, "address out of range"),
            Self::Corrupted => write!(f, "record corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Encode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The encoded payload needs `needed` bytes but the buffer holds `capacity`.
    Overflow { needed: usize, capacity: usize },
    /// The serializer rejected the record.
    Serialize,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow { needed, capacity } => {
                write!(f, "payload needs {needed} bytes, buffer holds {capacity}")
            }
            Self::Serialize => write!(f, "serializer error"),
        }
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

// ---------------------------------------------------------------------------
// Uplink errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkError {
    /// Server answered with a non-2xx status.
    Status(u16),
    /// Connection dropped before the response arrived.
    Disconnected,
    /// Network time could not be obtained.
    TimeSyncFailed,
    /// Request could not be assembled or sent.
    RequestFailed,
}

impl fmt::Display for UplinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "server returned HTTP {code}"),
            Self::Disconnected => write!(f, "disconnected mid-request"),
            Self::TimeSyncFailed => write!(f, "network time sync failed"),
            Self::RequestFailed => write!(f, "request failed"),
        }
    }
}

impl From<UplinkError> for Error {
    fn from(e: UplinkError) -> Self {
        Self::Uplink(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
