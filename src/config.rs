//! Station configuration parameters
//!
//! All tunable parameters for the IonStation.  Values can be overridden by
//! a config blob in the persistent store (see
//! [`NvsAdapter`](crate::adapters::nvs::NvsAdapter)).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calibration::MAX_SLOTS;

/// Console rendering of domain events, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable multi-line report per capture.
    #[default]
    Verbose,
    /// One numeric line per capture, for serial plotting.
    Compact,
}

/// Deep-sleep duration in RTC offset form (`DD:HH:MM:SS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeSpec {
    pub days: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl WakeSpec {
    pub const fn new(days: u8, hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            days,
            hours,
            minutes,
            seconds,
        }
    }

    pub const fn as_secs(&self) -> u64 {
        self.days as u64 * 86_400
            + self.hours as u64 * 3_600
            + self.minutes as u64 * 60
            + self.seconds as u64
    }

    /// Every field within its RTC offset range: days ≤ 31, hours ≤ 23,
    /// minutes and seconds ≤ 59.
    pub const fn in_range(&self) -> bool {
        self.days <= 31 && self.hours <= 23 && self.minutes <= 59 && self.seconds <= 59
    }
}

impl Default for WakeSpec {
    fn default() -> Self {
        // Four wakes per day.
        Self::new(0, 6, 0, 0)
    }
}

impl fmt::Display for WakeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

impl FromStr for WakeSpec {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const MSG: &str = "wake spec must be DD:HH:MM:SS";
        let mut fields = [0u8; 4];
        let mut parts = s.split(':');
        for field in &mut fields {
            let part = parts.next().ok_or(MSG)?;
            if part.len() != 2 {
                return Err(MSG);
            }
            *field = part.parse().map_err(|_| MSG)?;
        }
        if parts.next().is_some() {
            return Err(MSG);
        }
        let [days, hours, minutes, seconds] = fields;
        let wake = Self::new(days, hours, minutes, seconds);
        if !wake.in_range() {
            return Err("wake spec field out of range");
        }
        Ok(wake)
    }
}

/// Core station configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    // --- Identity ---
    /// Station code reported in every telemetry record (`k` field).
    pub station_code: heapless::String<16>,

    // --- Calibration ---
    /// Measurements expected per day (K); one calibration slot each.
    pub slots_per_day: u8,

    // --- Timing ---
    /// Fixed sampling window; the last capture in it is transmitted (ms).
    pub sampling_interval_ms: u32,
    /// Upper bound on waiting for network readiness (ms).
    pub connect_timeout_ms: u32,
    /// Deep-sleep duration between wake cycles.
    pub wake: WakeSpec,

    // --- Network ---
    /// Access point joined for the uplink.  Empty means not provisioned.
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,

    // --- Uplink ---
    pub server_host: heapless::String<64>,
    pub server_port: u16,
    pub server_path: heapless::String<32>,

    // --- Console ---
    pub output_format: OutputFormat,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            station_code: heapless::String::try_from("ION001").unwrap_or_default(),

            slots_per_day: 4,

            sampling_interval_ms: 8 * 60 * 1000, // 8 min electrode settling
            connect_timeout_ms: 60_000,
            wake: WakeSpec::default(),

            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),

            server_host: heapless::String::try_from("clustervalley.agricos.mx").unwrap_or_default(),
            server_port: 80,
            server_path: heapless::String::try_from("/api/Measure").unwrap_or_default(),

            output_format: OutputFormat::Verbose,
        }
    }
}

impl StationConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.station_code.is_empty()
            || !self
                .station_code
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err("station_code must be 1-16 ASCII alphanumeric characters");
        }
        if !(1..=MAX_SLOTS).contains(&usize::from(self.slots_per_day)) {
            return Err("slots_per_day must be 1-8");
        }
        if !(1_000..=3_600_000).contains(&self.sampling_interval_ms) {
            return Err("sampling_interval_ms must be 1000-3600000");
        }
        if !(1_000..=600_000).contains(&self.connect_timeout_ms) {
            return Err("connect_timeout_ms must be 1000-600000");
        }
        if !self.wake.in_range() {
            return Err("wake spec field out of range");
        }
        if self.wake.as_secs() == 0 {
            return Err("wake interval must be non-zero");
        }
        if !self.wifi_ssid.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
            return Err("wifi_ssid must be printable ASCII");
        }
        if !self.wifi_password.is_empty() && self.wifi_password.len() < 8 {
            return Err("wifi_password must be empty (open) or 8-64 bytes");
        }
        if self.server_host.is_empty() {
            return Err("server_host must not be empty");
        }
        if self.server_port == 0 {
            return Err("server_port must be non-zero");
        }
        if !self.server_path.starts_with('/') {
            return Err("server_path must start with '/'");
        }
        Ok(())
    }

    pub fn slots(&self) -> usize {
        usize::from(self.slots_per_day)
    }
}
