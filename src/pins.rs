//! ADC channel assignments and analog front-end constants for the station
//! board.
//!
//! Single source of truth: the hardware adapter references this module
//! rather than hard-coding channel numbers.

// ---------------------------------------------------------------------------
// Ion-selective electrodes (ADC1, behind 2:1 buffered dividers)
// ---------------------------------------------------------------------------

/// Calcium electrode, ADC1 channel 3 (GPIO 4 on ESP32-S3).
pub const ADC1_CH_CALCIUM: u32 = 3;
/// Nitrate electrode, ADC1 channel 4 (GPIO 5).
pub const ADC1_CH_NITRATE: u32 = 4;
/// Potassium electrode, ADC1 channel 5 (GPIO 6).
pub const ADC1_CH_POTASSIUM: u32 = 5;

/// Electrode output reaches ~3.8 V; the divider halves it for the ADC.
pub const ELECTRODE_DIVIDER: f32 = 2.0;

// ---------------------------------------------------------------------------
// Water temperature (PT1000 + transmitter, 10 mV/°C, 500 mV at 0 °C)
// ---------------------------------------------------------------------------

pub const ADC1_CH_TEMPERATURE: u32 = 6;
pub const TEMP_OFFSET_V: f32 = 0.5;
pub const TEMP_V_PER_C: f32 = 0.01;

// ---------------------------------------------------------------------------
// Battery (single Li-ion cell, 2:1 divider)
// ---------------------------------------------------------------------------

pub const ADC1_CH_BATTERY: u32 = 7;
pub const BATTERY_DIVIDER: f32 = 2.0;
pub const BATTERY_EMPTY_V: f32 = 3.3;
pub const BATTERY_FULL_V: f32 = 4.2;

// ---------------------------------------------------------------------------
// ADC
// ---------------------------------------------------------------------------

/// Full-scale input at 12 dB attenuation.
pub const ADC_FULL_SCALE_V: f32 = 3.1;
/// 12-bit conversions.
pub const ADC_MAX_RAW: u16 = 4095;
