//! Battery gauge.
//!
//! The driver reports cell voltage.  State of charge is linear between the
//! empty and full cell voltages, clamped to 0..=100 and rounded because
//! telemetry carries it as an integer.  A charging cell sits above the
//! full voltage and reads as 100 %.

use crate::app::ports::SensorDriver;
use crate::error::SensorError;
use crate::pins::{BATTERY_EMPTY_V, BATTERY_FULL_V};

use super::{Measurement, MeasurementKind};

/// Cell voltages outside this window mean the gauge is not connected.
const PLAUSIBLE_CELL_V: core::ops::RangeInclusive<f32> = 2.5..=4.5;

/// State of charge for a cell voltage, unclamped.
pub fn charge_percent(cell_v: f32) -> f32 {
    (cell_v - BATTERY_EMPTY_V) / (BATTERY_FULL_V - BATTERY_EMPTY_V) * 100.0
}

pub struct BatterySensor {
    driver: Box<dyn SensorDriver>,
}

impl BatterySensor {
    pub fn new(driver: Box<dyn SensorDriver>) -> Self {
        Self { driver }
    }

    pub fn read(&mut self) -> Result<Measurement, SensorError> {
        let volts = self.driver.raw_read()?;
        if !volts.is_finite() {
            return Err(SensorError::NotFinite);
        }
        if !PLAUSIBLE_CELL_V.contains(&volts) {
            return Err(SensorError::OutOfRange);
        }
        Ok(Measurement::new(
            MeasurementKind::Battery,
            volts,
            charge_percent(volts).round().clamp(0.0, 100.0),
        ))
    }
}
