//! Sensor subsystem: per-channel wrappers and the aggregating [`SensorBank`].
//!
//! The bank owns every sensor and produces a [`MeasurementSet`] on each
//! capture tick.  It is built once at startup from an explicit analyte →
//! sensor mapping that must cover every [`Analyte`] exactly once.

pub mod battery;
pub mod ion;
pub mod temperature;

use core::fmt;

use log::warn;

use crate::calibration::{Analyte, CalibrationTable};
use crate::error::Error;
use battery::BatterySensor;
use ion::IonSensor;
use temperature::TemperatureSensor;

/// What a measurement describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementKind {
    Ion(Analyte),
    Temperature,
    Battery,
}

impl MeasurementKind {
    pub const ALL: [Self; 5] = [
        Self::Ion(Analyte::Calcium),
        Self::Ion(Analyte::Nitrate),
        Self::Ion(Analyte::Potassium),
        Self::Temperature,
        Self::Battery,
    ];
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ion(a) => write!(f, "{}", a),
            Self::Temperature => f.write_str("Temperature"),
            Self::Battery => f.write_str("Battery"),
        }
    }
}

/// One converted reading.  Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub kind: MeasurementKind,
    /// Driver output (V for electrodes, °C, cell V for the battery).
    pub raw: f32,
    /// Converted value (ppm for electrodes, °C, % for the battery).
    pub value: f32,
    sampled: bool,
}

impl Measurement {
    pub const fn new(kind: MeasurementKind, raw: f32, value: f32) -> Self {
        Self {
            kind,
            raw,
            value,
            sampled: true,
        }
    }

    /// Placeholder for a channel that has not been read yet.
    pub const fn empty(kind: MeasurementKind) -> Self {
        Self {
            kind,
            raw: 0.0,
            value: 0.0,
            sampled: false,
        }
    }

    /// False for the placeholder of a channel that was never read.
    pub const fn is_sampled(&self) -> bool {
        self.sampled
    }
}

/// Latest value of every channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementSet {
    ions: [Measurement; Analyte::COUNT],
    pub temperature: Measurement,
    pub battery: Measurement,
}

impl Default for MeasurementSet {
    fn default() -> Self {
        Self {
            ions: Analyte::ALL.map(|a| Measurement::empty(MeasurementKind::Ion(a))),
            temperature: Measurement::empty(MeasurementKind::Temperature),
            battery: Measurement::empty(MeasurementKind::Battery),
        }
    }
}

impl MeasurementSet {
    pub fn ion(&self, analyte: Analyte) -> &Measurement {
        &self.ions[analyte.index()]
    }

    pub fn set_ion(&mut self, m: Measurement) {
        if let MeasurementKind::Ion(analyte) = m.kind {
            self.ions[analyte.index()] = m;
        }
    }

    pub fn get(&self, kind: MeasurementKind) -> &Measurement {
        match kind {
            MeasurementKind::Ion(a) => self.ion(a),
            MeasurementKind::Temperature => &self.temperature,
            MeasurementKind::Battery => &self.battery,
        }
    }

    /// Channels that have not produced a single good read.
    pub fn unsampled(&self) -> impl Iterator<Item = MeasurementKind> + '_ {
        MeasurementKind::ALL.into_iter().filter(|k| !self.get(*k).is_sampled())
    }

    /// Battery state of charge as telemetry reports it.
    pub fn battery_percent(&self) -> u8 {
        self.battery.value.clamp(0.0, 100.0) as u8
    }
}

/// Owns every sensor channel of the station.
pub struct SensorBank {
    ions: [IonSensor; Analyte::COUNT],
    temperature: TemperatureSensor,
    battery: BatterySensor,
}

impl SensorBank {
    /// Build the bank from an analyte-keyed list of electrode channels.
    ///
    /// Fails unless every analyte appears exactly once.
    pub fn new(
        ions: impl IntoIterator<Item = IonSensor>,
        temperature: TemperatureSensor,
        battery: BatterySensor,
    ) -> Result<Self, Error> {
        let mut slots: [Option<IonSensor>; Analyte::COUNT] = [None, None, None];
        for sensor in ions {
            let slot = &mut slots[sensor.analyte().index()];
            if slot.is_some() {
                return Err(Error::Init("duplicate electrode for analyte"));
            }
            *slot = Some(sensor);
        }
        let [Some(calcium), Some(nitrate), Some(potassium)] = slots else {
            return Err(Error::Init("electrode missing for analyte"));
        };

        Ok(Self {
            ions: [calcium, nitrate, potassium],
            temperature,
            battery,
        })
    }

    /// Read every channel into `set`.
    ///
    /// A failed read is logged and the channel keeps its previous value;
    /// one flaky probe must not stall the capture loop.
    pub fn capture(&mut self, table: &CalibrationTable, slot: usize, set: &mut MeasurementSet) {
        for sensor in &mut self.ions {
            match sensor.read(table, slot) {
                Ok(m) => set.set_ion(m),
                Err(e) => warn!("{} electrode read failed: {}", sensor.analyte(), e),
            }
        }
        match self.temperature.read() {
            Ok(m) => set.temperature = m,
            Err(e) => warn!("Temperature read failed: {}", e),
        }
        match self.battery.read() {
            Ok(m) => set.battery = m,
            Err(e) => warn!("Battery read failed: {}", e),
        }
    }
}
