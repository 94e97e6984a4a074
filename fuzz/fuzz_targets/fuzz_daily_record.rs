//! Fuzz target: daily measurement record + slot selection
//!
//! Treats the input as the raw store contents at the record address and
//! runs one selection over it.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - The selected index is always `< slots`
//! - The record written back always decodes to the selection
//!
//! cargo fuzz run fuzz_daily_record

#![no_main]

use ionstation::app::ports::PersistentStore;
use ionstation::calibration::MAX_SLOTS;
use ionstation::calibration::selector::{CalibrationSelector, DailyMeasurementState, STATE_RECORD_LEN};
use ionstation::datetime::CalendarDate;
use ionstation::error::StorageError;
use libfuzzer_sys::fuzz_target;

// ── In-memory PersistentStore for fuzz testing ────────────────

struct MemStore {
    bytes: Vec<u8>,
}

impl PersistentStore for MemStore {
    fn read(&self, address: u16, buf: &mut [u8]) -> Result<usize, StorageError> {
        let start = usize::from(address);
        let src = self.bytes.get(start..).ok_or(StorageError::OutOfRange)?;
        let n = src.len().min(buf.len());
        if n == 0 {
            return Err(StorageError::NotFound);
        }
        buf[..n].copy_from_slice(&src[..n]);
        Ok(n)
    }

    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError> {
        let start = usize::from(address);
        if self.bytes.len() < start + data.len() {
            self.bytes.resize(start + data.len(), 0xFF);
        }
        self.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&knobs, rest)) = data.split_first() else {
        return;
    };
    let slots = usize::from(knobs) % MAX_SLOTS + 1;
    let today = CalendarDate::new(2024, 5, 1 + (knobs >> 4) % 2);

    let _ = DailyMeasurementState::decode(rest);

    let mut store = MemStore { bytes: rest.to_vec() };
    let selection = CalibrationSelector::new(slots).select(&mut store, today);
    assert!(selection.index < slots);
    assert!(selection.persisted.is_ok());

    let stored = DailyMeasurementState::decode(&store.bytes[..STATE_RECORD_LEN]).unwrap();
    assert_eq!(stored, selection.state);
    assert_eq!(usize::from(stored.count), selection.index);
});
