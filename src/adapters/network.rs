//! Uplink network adapter.
//!
//! Implements [`NetworkPort`]: link readiness, network time and the JSON
//! POST of the telemetry record.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: WiFi station via `esp_idf_svc::wifi`,
//!   SNTP via `esp_idf_svc::sntp`, HTTP via `esp_idf_svc::http::client`.
//! - **all other targets**: a scripted [`SimLink`] for host-side runs.

use core::fmt::Write as _;

use log::{info, warn};

use crate::app::ports::NetworkPort;
use crate::error::UplinkError;

#[cfg(target_os = "espidf")]
use crate::adapters::time::SystemClock;
#[cfg(target_os = "espidf")]
use crate::scheduler::{TimeBasis, poll_until_success};

/// Longest URL the adapter will build.
pub const MAX_URL_LEN: usize = 128;

/// Upper bound on waiting for the first SNTP sync (ms).
pub const TIME_SYNC_TIMEOUT_MS: u64 = 15_000;

/// `http://host:port/path`
pub fn request_url(host: &str, port: u16, path: &str) -> Result<heapless::String<MAX_URL_LEN>, UplinkError> {
    let mut url = heapless::String::new();
    write!(url, "http://{}:{}{}", host, port, path).map_err(|_| UplinkError::RequestFailed)?;
    Ok(url)
}

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

/// Scripted link behaviour for host runs.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimLink {
    /// Connectivity checks that fail before the link reports ready;
    /// `None` never becomes ready.
    pub ready_after_checks: Option<u32>,
    pub sync_ok: bool,
    /// HTTP status returned by the simulated server.
    pub status: u16,
    pub checks: u32,
    /// URL and body of the most recent POST.
    pub last_post: Option<(String, Vec<u8>)>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimLink {
    fn default() -> Self {
        Self {
            ready_after_checks: Some(0),
            sync_ok: true,
            status: 200,
            checks: 0,
            last_post: None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct StationNetwork {
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::EspWifi<'static>,
    #[cfg(target_os = "espidf")]
    sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
    #[cfg(target_os = "espidf")]
    clock: SystemClock,

    #[cfg(not(target_os = "espidf"))]
    sim: SimLink,
}

#[cfg(not(target_os = "espidf"))]
impl StationNetwork {
    pub fn simulated(sim: SimLink) -> Self {
        info!("Network(sim): scripted link {:?}", sim.ready_after_checks);
        Self { sim }
    }

    pub fn sim(&self) -> &SimLink {
        &self.sim
    }
}

#[cfg(target_os = "espidf")]
impl StationNetwork {
    /// Configure the WiFi station and start joining the access point.
    ///
    /// Returns immediately; readiness is observed through
    /// [`NetworkPort::check_connectivity`].
    pub fn start(
        modem: esp_idf_svc::hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
        ssid: &str,
        password: &str,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

        let mut wifi = EspWifi::new(modem, sysloop, nvs)?;
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().unwrap_or_default(),
            password: password.try_into().unwrap_or_default(),
            auth_method,
            ..Default::default()
        }))?;
        wifi.start()?;
        if ssid.is_empty() {
            warn!("Network: no WiFi credentials provisioned");
        } else {
            info!("Network: joining '{}'", ssid);
            wifi.connect()?;
        }

        Ok(Self {
            wifi,
            sntp: None,
            clock: SystemClock::new(),
        })
    }
}

impl NetworkPort for StationNetwork {
    #[cfg(not(target_os = "espidf"))]
    fn check_connectivity(&mut self, _time_hint_ms: i64) -> bool {
        let checks = self.sim.checks;
        self.sim.checks = checks.saturating_add(1);
        self.sim.ready_after_checks.is_some_and(|n| checks >= n)
    }

    #[cfg(target_os = "espidf")]
    fn check_connectivity(&mut self, _time_hint_ms: i64) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn sync_time(&mut self) -> Result<(), UplinkError> {
        if self.sim.sync_ok {
            Ok(())
        } else {
            warn!("Network(sim): scripted SNTP failure");
            Err(UplinkError::TimeSyncFailed)
        }
    }

    #[cfg(target_os = "espidf")]
    fn sync_time(&mut self) -> Result<(), UplinkError> {
        use esp_idf_svc::sntp::{EspSntp, SyncStatus};

        if self.sntp.is_none() {
            self.sntp = Some(EspSntp::new_default().map_err(|_| UplinkError::TimeSyncFailed)?);
        }
        let Some(sntp) = self.sntp.as_ref() else {
            return Err(UplinkError::TimeSyncFailed);
        };
        let synced = poll_until_success(&self.clock, TIME_SYNC_TIMEOUT_MS, TimeBasis::Elapsed, &mut |_elapsed: i64| {
            sntp.get_sync_status() == SyncStatus::Completed
        });
        if synced {
            info!("Network: SNTP time acquired");
            Ok(())
        } else {
            Err(UplinkError::TimeSyncFailed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn post_json(&mut self, host: &str, port: u16, path: &str, body: &[u8]) -> Result<u16, UplinkError> {
        let url = request_url(host, port, path)?;
        info!("Network(sim): POST {} ({} bytes)", url, body.len());
        self.sim.last_post = Some((url.as_str().to_owned(), body.to_vec()));
        Ok(self.sim.status)
    }

    #[cfg(target_os = "espidf")]
    fn post_json(&mut self, host: &str, port: u16, path: &str, body: &[u8]) -> Result<u16, UplinkError> {
        use esp_idf_svc::http::Method;
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
        use esp_idf_svc::io::Write;

        let url = request_url(host, port, path)?;
        let mut len = heapless::String::<8>::new();
        write!(len, "{}", body.len()).map_err(|_| UplinkError::RequestFailed)?;
        let headers = [("Content-Type", "application/json"), ("Content-Length", len.as_str())];

        let mut conn = EspHttpConnection::new(&Configuration {
            timeout: Some(core::time::Duration::from_secs(20)),
            ..Default::default()
        })
        .map_err(|_| UplinkError::RequestFailed)?;
        conn.initiate_request(Method::Post, &url, &headers)
            .map_err(|_| UplinkError::Disconnected)?;
        conn.write_all(body).map_err(|_| UplinkError::Disconnected)?;
        conn.initiate_response().map_err(|e| {
            warn!("Network: no response ({})", e);
            UplinkError::Disconnected
        })?;
        let status = conn.status();
        info!("Network: POST {} -> {}", url, status);
        Ok(status)
    }
}
