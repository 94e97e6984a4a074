//! Telemetry record assembly and JSON encoding.
//!
//! Wire format agreed with the receiving service:
//!
//! ```text
//! {"s":"2024-05-01T10:00:00Z",
//!  "d":[{"k":"ION001",
//!        "m":[{"m":"cCa","v":1.23},{"m":"cNo3","v":4.56},{"m":"cK","v":7.89},
//!             {"m":"ion_temp","v":22.1},{"m":"ion_bl","v":87}]}]}
//! ```
//!
//! Encoding goes into one fixed-capacity buffer owned by the
//! [`TelemetryBuilder`] and reused across builds.  A payload that does not
//! fit is an error; the buffer is never left holding a truncated record.

use core::fmt::Write as _;

use log::debug;
use serde::Serialize;

use crate::calibration::Analyte;
use crate::datetime::DateTime;
use crate::error::EncodeError;
use crate::sensors::{MeasurementKind, MeasurementSet};

/// Uplink buffer size.
pub const PAYLOAD_CAPACITY: usize = 512;

/// Readings per record: three analytes, temperature, battery.
pub const READINGS_PER_RECORD: usize = 5;

/// Short identifiers agreed with the receiving service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeasureCode {
    #[serde(rename = "cCa")]
    Calcium,
    #[serde(rename = "cNo3")]
    Nitrate,
    #[serde(rename = "cK")]
    Potassium,
    #[serde(rename = "ion_temp")]
    Temperature,
    #[serde(rename = "ion_bl")]
    Battery,
}

impl MeasureCode {
    pub const fn for_analyte(analyte: Analyte) -> Self {
        match analyte {
            Analyte::Calcium => Self::Calcium,
            Analyte::Nitrate => Self::Nitrate,
            Analyte::Potassium => Self::Potassium,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calcium => "cCa",
            Self::Nitrate => "cNo3",
            Self::Potassium => "cK",
            Self::Temperature => "ion_temp",
            Self::Battery => "ion_bl",
        }
    }
}

/// Numeric payload of one reading.  Battery level travels as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MeasureValue {
    Real(f32),
    Level(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    #[serde(rename = "m")]
    pub code: MeasureCode,
    #[serde(rename = "v")]
    pub value: MeasureValue,
}

impl Reading {
    pub const fn real(code: MeasureCode, value: f32) -> Self {
        Self {
            code,
            value: MeasureValue::Real(value),
        }
    }

    pub const fn level(code: MeasureCode, value: u8) -> Self {
        Self {
            code,
            value: MeasureValue::Level(value),
        }
    }
}

/// Flatten a measurement set in the fixed record order:
/// calcium, nitrate, potassium, temperature, battery.
///
/// Channels that never produced a good read are left out rather than sent
/// as zero.
pub fn readings_from(set: &MeasurementSet) -> heapless::Vec<Reading, READINGS_PER_RECORD> {
    let mut out = heapless::Vec::new();
    for kind in MeasurementKind::ALL {
        let m = set.get(kind);
        if !m.is_sampled() {
            continue;
        }
        let reading = match kind {
            MeasurementKind::Ion(a) => Reading::real(MeasureCode::for_analyte(a), m.value),
            MeasurementKind::Temperature => Reading::real(MeasureCode::Temperature, m.value),
            MeasurementKind::Battery => Reading::level(MeasureCode::Battery, set.battery_percent()),
        };
        // One reading per kind, so capacity is never exceeded.
        let _ = out.push(reading);
    }
    out
}

/// `20YY-MM-DDTHH:MM:SSZ`, UTC, no offset.
pub fn format_timestamp(at: &DateTime) -> heapless::String<24> {
    let mut s = heapless::String::new();
    // 20 characters always fit in 24.
    let _ = write!(
        s,
        "20{:02}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        at.year % 100,
        at.month,
        at.day,
        at.hour,
        at.minute,
        at.second
    );
    s
}

#[derive(Serialize)]
struct Envelope<'a> {
    s: &'a str,
    d: [Device<'a>; 1],
}

#[derive(Serialize)]
struct Device<'a> {
    k: &'a str,
    m: &'a [Reading],
}

/// Encodes telemetry records into a reusable fixed-capacity buffer.
pub struct TelemetryBuilder<const N: usize = PAYLOAD_CAPACITY> {
    buf: heapless::Vec<u8, N>,
}

impl<const N: usize> Default for TelemetryBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TelemetryBuilder<N> {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
        }
    }

    /// Encode one record and return the payload bytes.
    ///
    /// The buffer is cleared first.  The record is serialized to a heap
    /// scratch vector and the size limit is checked after encoding, so an
    /// oversized record costs one transient allocation of its full size.
    /// On overflow the buffer stays empty and [`EncodeError::Overflow`]
    /// reports the exact encoded length.
    pub fn build(&mut self, station_code: &str, timestamp: &str, readings: &[Reading]) -> Result<&[u8], EncodeError> {
        self.buf.clear();

        let envelope = Envelope {
            s: timestamp,
            d: [Device {
                k: station_code,
                m: readings,
            }],
        };
        let encoded = serde_json::to_vec(&envelope).map_err(|_| EncodeError::Serialize)?;
        if encoded.len() > N {
            return Err(EncodeError::Overflow {
                needed: encoded.len(),
                capacity: N,
            });
        }
        self.buf
            .extend_from_slice(&encoded)
            .map_err(|()| EncodeError::Overflow {
                needed: encoded.len(),
                capacity: N,
            })?;

        debug!("Telemetry: encoded {} of {} bytes", self.buf.len(), N);
        Ok(self.buf.as_slice())
    }

    /// Payload of the last successful build (empty after a failure).
    pub fn payload(&self) -> &[u8] {
        self.buf.as_slice()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}
