//! Water temperature probe (PT1000 front-end).
//!
//! The driver already reports degrees Celsius; this wrapper only rejects
//! readings a submerged probe cannot produce.

use crate::app::ports::SensorDriver;
use crate::error::SensorError;

use super::{Measurement, MeasurementKind};

const MIN_C: f32 = -20.0;
const MAX_C: f32 = 80.0;

pub struct TemperatureSensor {
    driver: Box<dyn SensorDriver>,
}

impl TemperatureSensor {
    pub fn new(driver: Box<dyn SensorDriver>) -> Self {
        Self { driver }
    }

    pub fn read(&mut self) -> Result<Measurement, SensorError> {
        let celsius = self.driver.raw_read()?;
        if !celsius.is_finite() {
            return Err(SensorError::NotFinite);
        }
        if !(MIN_C..=MAX_C).contains(&celsius) {
            return Err(SensorError::OutOfRange);
        }
        Ok(Measurement::new(MeasurementKind::Temperature, celsius, celsius))
    }
}
