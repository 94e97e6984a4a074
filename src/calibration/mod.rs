//! Calibration tables for the ion-selective electrodes.
//!
//! Each analyte carries one [`CalibrationCurve`] per measurement slot of the
//! day.  The slot is chosen by [`selector`]; this module only stores curves,
//! picks the right one, and evaluates it.
//!
//! ```text
//!   slot ──┐
//!          ▼
//!   CalibrationTable[analyte][slot mod K] ──▶ CalibrationCurve::evaluate(v) ──▶ ppm
//! ```

pub mod selector;

use core::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound on measurement slots per day (stack-allocated table).
pub const MAX_SLOTS: usize = 8;

/// Reference points per curve.
pub const CURVE_POINTS: usize = 3;

// ---------------------------------------------------------------------------
// Analytes
// ---------------------------------------------------------------------------

/// Chemical species measured by the ion-selective electrodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Analyte {
    Calcium,
    Nitrate,
    Potassium,
}

impl Analyte {
    /// Every analyte, in telemetry order.
    pub const ALL: [Self; 3] = [Self::Calcium, Self::Nitrate, Self::Potassium];

    pub const COUNT: usize = Self::ALL.len();

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Calcium => "Calcium",
            Self::Nitrate => "Nitrate",
            Self::Potassium => "Potassium",
        }
    }
}

impl fmt::Display for Analyte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Curves
// ---------------------------------------------------------------------------

/// One voltage/concentration reference pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Electrode output (V).
    pub voltage: f32,
    /// Reference solution concentration (ppm).
    pub concentration: f32,
}

impl CalibrationPoint {
    pub const fn new(voltage: f32, concentration: f32) -> Self {
        Self {
            voltage,
            concentration,
        }
    }
}

/// Three reference points for one analyte in one measurement slot.
///
/// Points are kept in the order the caller supplied them; [`evaluate`]
/// orders them by concentration itself.
///
/// [`evaluate`]: CalibrationCurve::evaluate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    points: [CalibrationPoint; CURVE_POINTS],
}

impl CalibrationCurve {
    pub const fn new(points: [CalibrationPoint; CURVE_POINTS]) -> Self {
        Self { points }
    }

    /// Build a curve from parallel voltage and concentration arrays.
    pub const fn from_arrays(
        voltages: [f32; CURVE_POINTS],
        concentrations: [f32; CURVE_POINTS],
    ) -> Self {
        Self {
            points: [
                CalibrationPoint::new(voltages[0], concentrations[0]),
                CalibrationPoint::new(voltages[1], concentrations[1]),
                CalibrationPoint::new(voltages[2], concentrations[2]),
            ],
        }
    }

    pub fn points(&self) -> &[CalibrationPoint; CURVE_POINTS] {
        &self.points
    }

    /// Concentrations in supplied order.
    pub fn concentrations(&self) -> [f32; CURVE_POINTS] {
        self.points.map(|p| p.concentration)
    }

    /// Map a raw electrode voltage to a concentration (ppm).
    ///
    /// The points are taken as (low, mid, high) by reference concentration.
    /// Inside a segment whose voltages bracket the reading the result is
    /// linearly interpolated (low–mid is tried first).  Outside both
    /// segments the result is extrapolated along the segment whose outer
    /// point is nearest in voltage.  The output is never clamped: it may be
    /// negative or exceed the top reference.
    pub fn evaluate(&self, raw_voltage: f32) -> f32 {
        let [low, mid, high] = self.ordered();

        if brackets(low, mid, raw_voltage) {
            return along(low, mid, raw_voltage);
        }
        if brackets(mid, high, raw_voltage) {
            return along(mid, high, raw_voltage);
        }

        if (raw_voltage - low.voltage).abs() <= (raw_voltage - high.voltage).abs() {
            along(low, mid, raw_voltage)
        } else {
            along(mid, high, raw_voltage)
        }
    }

    fn ordered(&self) -> [CalibrationPoint; CURVE_POINTS] {
        let mut pts = self.points;
        // Three elements; a total order on concentration is enough.
        pts.sort_by(|a, b| a.concentration.total_cmp(&b.concentration));
        pts
    }
}

fn brackets(a: CalibrationPoint, b: CalibrationPoint, v: f32) -> bool {
    let (lo, hi) = if a.voltage <= b.voltage {
        (a.voltage, b.voltage)
    } else {
        (b.voltage, a.voltage)
    };
    v >= lo && v <= hi
}

/// Straight line through `a` and `b`, evaluated at `v`.
fn along(a: CalibrationPoint, b: CalibrationPoint, v: f32) -> f32 {
    let dv = b.voltage - a.voltage;
    if dv == 0.0 {
        return a.concentration;
    }
    let slope = (b.concentration - a.concentration) / dv;
    a.concentration + slope * (v - a.voltage)
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// Slot count is zero or above [`MAX_SLOTS`].
    InvalidSlotCount,
    /// Slot index passed to the builder is outside `0..K`.
    SlotOutOfRange,
    /// A `(analyte, slot)` cell was never populated.
    MissingCurve { analyte: Analyte, slot: usize },
    /// Slots of one analyte disagree on the reference concentrations.
    InconsistentConcentrations { analyte: Analyte, slot: usize },
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSlotCount => write!(f, "slot count must be 1..={MAX_SLOTS}"),
            Self::SlotOutOfRange => write!(f, "slot index out of range"),
            Self::MissingCurve { analyte, slot } => {
                write!(f, "no curve for {analyte} slot {slot}")
            }
            Self::InconsistentConcentrations { analyte, slot } => {
                write!(f, "{analyte} slot {slot} uses different reference concentrations")
            }
        }
    }
}

impl From<CalibrationError> for crate::error::Error {
    fn from(_: CalibrationError) -> Self {
        Self::Init("calibration table incomplete")
    }
}

/// Collects curves cell by cell, then checks completeness in [`build`].
///
/// [`build`]: CalibrationTableBuilder::build
#[derive(Debug, Clone)]
pub struct CalibrationTableBuilder {
    slots: usize,
    cells: [[Option<CalibrationCurve>; MAX_SLOTS]; Analyte::COUNT],
}

impl CalibrationTableBuilder {
    pub fn new(slots: usize) -> Result<Self, CalibrationError> {
        if slots == 0 || slots > MAX_SLOTS {
            return Err(CalibrationError::InvalidSlotCount);
        }
        Ok(Self {
            slots,
            cells: [[None; MAX_SLOTS]; Analyte::COUNT],
        })
    }

    /// Set the curve for one `(analyte, slot)` cell, replacing any previous one.
    pub fn set_curve(
        &mut self,
        analyte: Analyte,
        slot: usize,
        curve: CalibrationCurve,
    ) -> Result<&mut Self, CalibrationError> {
        if slot >= self.slots {
            return Err(CalibrationError::SlotOutOfRange);
        }
        self.cells[analyte.index()][slot] = Some(curve);
        Ok(self)
    }

    /// Use the same curve for every slot of `analyte`.
    pub fn fill(&mut self, analyte: Analyte, curve: CalibrationCurve) -> &mut Self {
        for cell in &mut self.cells[analyte.index()][..self.slots] {
            *cell = Some(curve);
        }
        self
    }

    pub fn build(&self) -> Result<CalibrationTable, CalibrationError> {
        let placeholder = CalibrationCurve::from_arrays([0.0; CURVE_POINTS], [0.0; CURVE_POINTS]);
        let mut curves = [[placeholder; MAX_SLOTS]; Analyte::COUNT];

        for analyte in Analyte::ALL {
            let row = &self.cells[analyte.index()];
            let mut reference: Option<[f32; CURVE_POINTS]> = None;
            for (slot, cell) in row[..self.slots].iter().enumerate() {
                let curve = cell.ok_or(CalibrationError::MissingCurve { analyte, slot })?;
                let conc = curve.concentrations();
                match reference {
                    None => reference = Some(conc),
                    Some(r) if r != conc => {
                        return Err(CalibrationError::InconsistentConcentrations { analyte, slot });
                    }
                    Some(_) => {}
                }
                curves[analyte.index()][slot] = curve;
            }
        }

        Ok(CalibrationTable {
            slots: self.slots,
            curves,
        })
    }
}

/// Complete analyte × slot table.  Every cell is populated by construction.
#[derive(Debug, Clone)]
pub struct CalibrationTable {
    slots: usize,
    curves: [[CalibrationCurve; MAX_SLOTS]; Analyte::COUNT],
}

// Factory reference solutions (ppm) and the electrode voltages recorded in them.
const REFERENCE_PPM: [f32; CURVE_POINTS] = [0.5, 150.0, 2000.0];
const CALCIUM_VOLTS: [f32; CURVE_POINTS] = [2.780_903_1, 3.505_596_2, 3.7];
const NITRATE_VOLTS: [f32; CURVE_POINTS] = [3.690_221_5, 3.618_125, 3.7];
const POTASSIUM_VOLTS: [f32; CURVE_POINTS] = [3.192_681_8, 3.515_125, 3.7];

impl CalibrationTable {
    /// Factory calibration replicated into each of `slots` slots.
    pub fn factory_default(slots: usize) -> Result<Self, CalibrationError> {
        CalibrationTableBuilder::new(slots)?
            .fill(
                Analyte::Calcium,
                CalibrationCurve::from_arrays(CALCIUM_VOLTS, REFERENCE_PPM),
            )
            .fill(
                Analyte::Nitrate,
                CalibrationCurve::from_arrays(NITRATE_VOLTS, REFERENCE_PPM),
            )
            .fill(
                Analyte::Potassium,
                CalibrationCurve::from_arrays(POTASSIUM_VOLTS, REFERENCE_PPM),
            )
            .build()
    }

    /// Number of measurement slots per day (K).
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Curve for `analyte` in slot `slot mod K`.
    pub fn curve(&self, analyte: Analyte, slot: usize) -> &CalibrationCurve {
        &self.curves[analyte.index()][slot % self.slots]
    }

    /// Convert a raw electrode voltage with the curve selected by `slot`.
    pub fn concentration(&self, analyte: Analyte, slot: usize, raw_voltage: f32) -> f32 {
        self.curve(analyte, slot).evaluate(raw_voltage)
    }
}
