//! Outbound application events.
//!
//! The [`WakeCycle`](super::service::WakeCycle) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  The console adapter on the
//! other side decides how to render them.

use crate::calibration::selector::DailyMeasurementState;
use crate::config::WakeSpec;
use crate::datetime::DateTime;
use crate::error::{EncodeError, StorageError, UplinkError};
use crate::sensors::{MeasurementKind, MeasurementSet};

/// Structured events emitted by the wake cycle, in emission order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// A wake cycle began (RTC time before any network sync).
    CycleStarted { at: DateTime, slots: usize },

    /// The network became ready.
    Connected { waited_ms: u64 },

    /// The network never became ready.  The cycle stops here.
    ConnectivityTimeout { waited_ms: u64 },

    TimeSynced { at: DateTime },

    /// Network time unavailable; the RTC reading is used as-is.
    TimeSyncFailed(UplinkError),

    /// Calibration slot chosen for this cycle.
    SlotSelected {
        index: usize,
        slots: usize,
        previous: Option<DailyMeasurementState>,
    },

    /// The advanced daily record could not be written back.
    StatePersistFailed(StorageError),

    /// One sampling tick finished.
    Captured {
        slot: usize,
        measurements: MeasurementSet,
        remaining_ms: i64,
    },

    /// A channel produced no good read during sampling.
    ChannelUnsampled(MeasurementKind),

    TelemetryBuilt { bytes: usize },

    EncodeFailed(EncodeError),

    /// The server accepted the record.
    UplinkSent { status: u16 },

    UplinkFailed(UplinkError),

    /// Entering deep sleep.
    Sleeping { wake: WakeSpec },

    /// Operator-visible stall after a connectivity timeout.  Repeats until
    /// the station is reset.
    Stalled { since_ms: u64 },
}
