//! Hardware adapter: bridges the analog front-end to the [`SensorDriver`]
//! port and assembles the station's [`SensorBank`].
//!
//! This is the only module that touches the ADC.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: ADC1 oneshot reads, converted to volts or °C through the
//! front-end constants in [`crate::pins`].
//! On host/test: each channel reads a static `AtomicU32` holding the
//! physical value as `f32` bits, set with [`sim_set`].  A NaN value
//! simulates a failed conversion.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU32, Ordering};

use log::info;

use crate::app::ports::SensorDriver;
use crate::calibration::Analyte;
use crate::error::{Error, SensorError};
use crate::pins;
use crate::sensors::SensorBank;
use crate::sensors::battery::BatterySensor;
use crate::sensors::ion::IonSensor;
use crate::sensors::temperature::TemperatureSensor;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Analog inputs of the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Electrode(Analyte),
    Temperature,
    Battery,
}

impl Channel {
    pub const ALL: [Self; 5] = [
        Self::Electrode(Analyte::Calcium),
        Self::Electrode(Analyte::Nitrate),
        Self::Electrode(Analyte::Potassium),
        Self::Temperature,
        Self::Battery,
    ];

    pub const fn adc_channel(self) -> u32 {
        match self {
            Self::Electrode(Analyte::Calcium) => pins::ADC1_CH_CALCIUM,
            Self::Electrode(Analyte::Nitrate) => pins::ADC1_CH_NITRATE,
            Self::Electrode(Analyte::Potassium) => pins::ADC1_CH_POTASSIUM,
            Self::Temperature => pins::ADC1_CH_TEMPERATURE,
            Self::Battery => pins::ADC1_CH_BATTERY,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    const fn sim_index(self) -> usize {
        match self {
            Self::Electrode(a) => a.index(),
            Self::Temperature => 3,
            Self::Battery => 4,
        }
    }

    /// Physical value for a voltage measured at the ADC pin.
    pub fn from_pin_volts(self, v: f32) -> f32 {
        match self {
            Self::Electrode(_) => v * pins::ELECTRODE_DIVIDER,
            Self::Temperature => (v - pins::TEMP_OFFSET_V) / pins::TEMP_V_PER_C,
            Self::Battery => v * pins::BATTERY_DIVIDER,
        }
    }
}

/// ADC counts to volts at the pin.
pub fn raw_to_pin_volts(raw: u16) -> f32 {
    f32::from(raw.min(pins::ADC_MAX_RAW)) / f32::from(pins::ADC_MAX_RAW) * pins::ADC_FULL_SCALE_V
}

// ── Simulation backing store ──────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_CHANNELS: [AtomicU32; 5] = [
    AtomicU32::new(3.3_f32.to_bits()),
    AtomicU32::new(3.65_f32.to_bits()),
    AtomicU32::new(3.4_f32.to_bits()),
    AtomicU32::new(21.0_f32.to_bits()),
    AtomicU32::new(4.11_f32.to_bits()),
];

/// Set the physical value a simulated channel reports.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set(channel: Channel, value: f32) {
    SIM_CHANNELS[channel.sim_index()].store(value.to_bits(), Ordering::Relaxed);
}

// ── ADC bring-up ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// Configure ADC1 and every station channel.  Call once at boot.
#[cfg(target_os = "espidf")]
pub fn init_adc() -> Result<(), Error> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot, before any read.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(Error::Init("ADC1 unit"));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    for channel in Channel::ALL {
        let ret = unsafe { adc_oneshot_config_channel(ADC1_HANDLE, channel.adc_channel(), &chan_cfg) };
        if ret != ESP_OK as i32 {
            return Err(Error::Init("ADC1 channel"));
        }
    }
    info!("hardware: ADC1 configured ({} channels)", Channel::ALL.len());
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc() -> Result<(), Error> {
    info!("hardware: simulated ADC");
    Ok(())
}

// ── Driver ────────────────────────────────────────────────────

/// One analog input exposed through the [`SensorDriver`] port.
pub struct AdcChannelDriver {
    channel: Channel,
}

impl AdcChannelDriver {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

impl SensorDriver for AdcChannelDriver {
    #[cfg(target_os = "espidf")]
    fn raw_read(&mut self) -> Result<f32, SensorError> {
        let mut raw: i32 = 0;
        // SAFETY: ADC1_HANDLE is set by init_adc() before the bank is built;
        // the wake cycle is single-threaded.
        let ret = unsafe { adc_oneshot_read(ADC1_HANDLE, self.channel.adc_channel(), &mut raw) };
        if ret != ESP_OK as i32 {
            return Err(SensorError::AdcReadFailed);
        }
        let volts = raw_to_pin_volts(raw.max(0) as u16);
        Ok(self.channel.from_pin_volts(volts))
    }

    #[cfg(not(target_os = "espidf"))]
    fn raw_read(&mut self) -> Result<f32, SensorError> {
        let v = f32::from_bits(SIM_CHANNELS[self.channel.sim_index()].load(Ordering::Relaxed));
        if v.is_nan() {
            return Err(SensorError::AdcReadFailed);
        }
        Ok(v)
    }
}

/// Every analyte wired to its own electrode input, plus temperature and
/// battery.
pub fn build_sensor_bank() -> Result<SensorBank, Error> {
    SensorBank::new(
        Analyte::ALL.map(|a| IonSensor::new(a, Box::new(AdcChannelDriver::new(Channel::Electrode(a))))),
        TemperatureSensor::new(Box::new(AdcChannelDriver::new(Channel::Temperature))),
        BatterySensor::new(Box::new(AdcChannelDriver::new(Channel::Battery))),
    )
}
