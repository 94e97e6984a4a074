//! Ion-selective electrode channel.
//!
//! Wraps one electrode driver and turns its raw voltage into a
//! concentration using the calibration slot selected for this wake.

use crate::app::ports::SensorDriver;
use crate::calibration::{Analyte, CalibrationTable};
use crate::error::SensorError;

use super::{Measurement, MeasurementKind};

/// Electrode output outside this window means a disconnected or shorted probe.
const VOLTAGE_RANGE: core::ops::RangeInclusive<f32> = -0.5..=5.5;

pub struct IonSensor {
    analyte: Analyte,
    driver: Box<dyn SensorDriver>,
}

impl IonSensor {
    pub fn new(analyte: Analyte, driver: Box<dyn SensorDriver>) -> Self {
        Self { analyte, driver }
    }

    pub fn analyte(&self) -> Analyte {
        self.analyte
    }

    /// Read the electrode and convert with slot `slot` of `table`.
    pub fn read(&mut self, table: &CalibrationTable, slot: usize) -> Result<Measurement, SensorError> {
        let raw = self.driver.raw_read()?;
        if !raw.is_finite() {
            return Err(SensorError::NotFinite);
        }
        if !VOLTAGE_RANGE.contains(&raw) {
            return Err(SensorError::OutOfRange);
        }
        Ok(Measurement::new(
            MeasurementKind::Ion(self.analyte),
            raw,
            table.concentration(self.analyte, slot, raw),
        ))
    }
}
