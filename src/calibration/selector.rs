//! Measurement-of-the-day selection.
//!
//! The station wakes K times per day and each wake uses a different
//! calibration slot.  A small persisted record remembers which day the last
//! measurement was taken on and how many had been taken that day:
//!
//! ```text
//!   persisted {date, count} ─┐
//!                            ├─▶ same day?  (count + 1) mod K : 0 ─▶ persist ─▶ slot
//!   clock date ──────────────┘
//! ```
//!
//! The new record is written back before the slot is handed to the
//! sampler, so a crash mid-cycle never reuses the same slot twice in a day.

use log::{info, warn};

use crate::app::ports::PersistentStore;
use crate::datetime::CalendarDate;
use crate::error::StorageError;

/// Store address of the daily record.
pub const STATE_ADDRESS: u16 = 0x0000;

/// Encoded size of [`DailyMeasurementState`].
pub const STATE_RECORD_LEN: usize = 8;

const STATE_MAGIC: u8 = 0xCA;
const STATE_VERSION: u8 = 1;

/// How many measurements have already been taken on `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyMeasurementState {
    pub date: CalendarDate,
    pub count: u8,
}

impl DailyMeasurementState {
    /// Fixed 8-byte layout: magic, version, year (LE), month, day, count, checksum.
    pub fn encode(&self) -> [u8; STATE_RECORD_LEN] {
        let [y0, y1] = self.date.year.to_le_bytes();
        let mut rec = [
            STATE_MAGIC,
            STATE_VERSION,
            y0,
            y1,
            self.date.month,
            self.date.day,
            self.count,
            0,
        ];
        rec[STATE_RECORD_LEN - 1] = checksum(&rec[..STATE_RECORD_LEN - 1]);
        rec
    }

    pub fn decode(rec: &[u8]) -> Result<Self, StorageError> {
        if rec.len() < STATE_RECORD_LEN {
            return Err(StorageError::Corrupted);
        }
        let rec = &rec[..STATE_RECORD_LEN];
        if rec[0] != STATE_MAGIC || rec[1] != STATE_VERSION {
            return Err(StorageError::Corrupted);
        }
        if checksum(&rec[..STATE_RECORD_LEN - 1]) != rec[STATE_RECORD_LEN - 1] {
            return Err(StorageError::Corrupted);
        }
        let date = CalendarDate::new(u16::from_le_bytes([rec[2], rec[3]]), rec[4], rec[5]);
        if !(1..=12).contains(&date.month) || !(1..=31).contains(&date.day) {
            return Err(StorageError::Corrupted);
        }
        Ok(Self {
            date,
            count: rec[6],
        })
    }
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0x5A, |acc, b| acc ^ b)
}

/// Pick the calibration slot for this wake.
///
/// Exact date equality advances the counter (wrapping at `slots`); any
/// other date, including one earlier than the stored date, restarts at 0.
/// The returned state always carries `current` and `count == index`.
pub fn select_measurement_index(
    current: CalendarDate,
    persisted: &DailyMeasurementState,
    slots: usize,
) -> (usize, DailyMeasurementState) {
    let slots = slots.max(1);
    let index = if persisted.date == current {
        (usize::from(persisted.count) + 1) % slots
    } else {
        0
    };
    (
        index,
        DailyMeasurementState {
            date: current,
            count: index as u8,
        },
    )
}

/// Outcome of one selection, for the caller's diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub state: DailyMeasurementState,
    /// Previous record, or `None` if it was missing or unreadable.
    pub previous: Option<DailyMeasurementState>,
    /// Result of writing `state` back to the store.
    pub persisted: Result<(), StorageError>,
}

/// Owns the daily record for the duration of one wake cycle.
pub struct CalibrationSelector {
    slots: usize,
}

impl CalibrationSelector {
    pub fn new(slots: usize) -> Self {
        Self {
            slots: slots.max(1),
        }
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Load the stored record.  Missing or corrupt data reads as absent.
    pub fn load(&self, store: &impl PersistentStore) -> Option<DailyMeasurementState> {
        let mut buf = [0u8; STATE_RECORD_LEN];
        let read = store
            .read(STATE_ADDRESS, &mut buf)
            .and_then(|n| DailyMeasurementState::decode(&buf[..n]));
        match read {
            Ok(state) => Some(state),
            Err(StorageError::NotFound) => {
                info!("Selector: no daily record stored, starting fresh");
                None
            }
            Err(e) => {
                warn!("Selector: daily record unreadable ({}), treating as absent", e);
                None
            }
        }
    }

    /// Select the slot for `today` and persist the advanced record.
    ///
    /// A failed write is reported in [`Selection::persisted`] but does not
    /// stop the cycle.
    pub fn select(&self, store: &mut impl PersistentStore, today: CalendarDate) -> Selection {
        let previous = self.load(store);
        let (index, state) = match &previous {
            Some(stored) => select_measurement_index(today, stored, self.slots),
            None => (0, DailyMeasurementState { date: today, count: 0 }),
        };

        let persisted = store.write(STATE_ADDRESS, &state.encode());
        match persisted {
            Ok(()) => info!("Selector: {} measurement slot {}/{}", today, index, self.slots),
            Err(e) => warn!("Selector: failed to persist daily record ({}); using slot {}", e, index),
        }

        Selection {
            index,
            state,
            previous,
            persisted,
        }
    }
}
