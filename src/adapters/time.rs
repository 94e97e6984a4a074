//! Station clock adapter.
//!
//! Implements [`ClockPort`] and [`MonotonicClock`].
//!
//! - **`target_os = "espidf"`**: uptime from `esp_timer_get_time()`
//!   (microsecond precision, monotonic); calendar time from
//!   `gettimeofday()`, which SNTP keeps in sync.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` for uptime and
//!   `SystemTime` for the calendar.  [`SystemClock::sim_set_unix_secs`]
//!   pins the calendar for simulation.

use crate::app::ports::ClockPort;
use crate::datetime::DateTime;
use crate::scheduler::MonotonicClock;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicI64, Ordering};

/// Pinned wall-clock seconds for simulation; `i64::MIN` means "use the host clock".
#[cfg(not(target_os = "espidf"))]
static SIM_UNIX_SECS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Uptime and calendar clock of the station.
pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since the Unix epoch, or 0 if the clock cannot be read.
    #[cfg(target_os = "espidf")]
    pub fn unix_secs(&self) -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        tv.tv_sec as i64
    }

    /// Seconds since the Unix epoch.
    #[cfg(not(target_os = "espidf"))]
    pub fn unix_secs(&self) -> i64 {
        let pinned = SIM_UNIX_SECS.load(Ordering::Relaxed);
        if pinned != i64::MIN {
            return pinned;
        }
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    /// Pin the simulated calendar.  `None` returns to the host clock.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_unix_secs(secs: Option<i64>) {
        SIM_UNIX_SECS.store(secs.unwrap_or(i64::MIN), Ordering::Relaxed);
    }
}

impl MonotonicClock for SystemClock {
    #[cfg(target_os = "espidf")]
    fn elapsed_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime {
        DateTime::from_unix_secs(self.unix_secs())
    }
}
