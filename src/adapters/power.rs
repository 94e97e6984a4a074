//! Deep-sleep adapter.
//!
//! On ESP-IDF the RTC timer is armed with the wake interval and
//! `esp_deep_sleep_start()` is called; the chip resets on wake, so
//! [`PowerPort::deep_sleep_until`] never returns.  On the host the request
//! is recorded and control returns to the caller.

use log::info;

use crate::app::ports::PowerPort;
use crate::config::WakeSpec;

#[derive(Default)]
pub struct DeepSleep {
    #[cfg(not(target_os = "espidf"))]
    requests: Vec<WakeSpec>,
}

impl DeepSleep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep requests made so far (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn requests(&self) -> &[WakeSpec] {
        &self.requests
    }
}

impl PowerPort for DeepSleep {
    #[cfg(target_os = "espidf")]
    fn deep_sleep_until(&mut self, wake: &WakeSpec) {
        use esp_idf_svc::sys::{esp_deep_sleep_start, esp_sleep_enable_timer_wakeup};

        info!("Power: deep sleep for {} ({} s)", wake, wake.as_secs());
        // SAFETY: single-threaded; nothing runs after this point.
        unsafe {
            esp_sleep_enable_timer_wakeup(wake.as_secs().saturating_mul(1_000_000));
            esp_deep_sleep_start();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn deep_sleep_until(&mut self, wake: &WakeSpec) {
        info!("Power(sim): deep sleep for {}", wake);
        self.requests.push(*wake);
    }
}
