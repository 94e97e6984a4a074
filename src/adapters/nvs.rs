//! Non-volatile storage adapter.
//!
//! Implements [`PersistentStore`] and [`ConfigPort`] over one EEPROM-style
//! byte image of [`EEPROM_SIZE`] bytes:
//!
//! ```text
//!   0x0000 ┌──────────────────────┐
//!          │ daily record (8 B)   │  calibration::selector
//!   0x0040 ├──────────────────────┤
//!          │ len u16 LE │ config  │  postcard-encoded StationConfig
//!   0x0140 ├──────────────────────┤
//!          │ (free)               │
//!   0x0200 └──────────────────────┘
//! ```
//!
//! - **`target_os = "espidf"`**: the image lives in a single NVS blob.
//!   Each write is a read-modify-write of the blob followed by
//!   `nvs_commit()`, which is atomic.
//! - **`not(target_os = "espidf")`**: an in-memory image, erased to
//!   `0xFF` like fresh flash.
//!
//! A range that still reads as all `0xFF` was never written and reports
//! [`StorageError::NotFound`].

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, PersistentStore};
use crate::config::StationConfig;
use crate::error::StorageError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Size of the byte image.
pub const EEPROM_SIZE: usize = 512;

/// Start of the configuration region.
pub const CONFIG_ADDRESS: u16 = 0x0040;

/// Configuration region size, including the 2-byte length prefix.
pub const CONFIG_REGION_LEN: usize = 256;

const ERASED: u8 = 0xFF;

#[cfg(target_os = "espidf")]
const NAMESPACE: &core::ffi::CStr = c"ionstation";
#[cfg(target_os = "espidf")]
const IMAGE_KEY: &core::ffi::CStr = c"eeprom";

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    image: [u8; EEPROM_SIZE],
}

impl NvsAdapter {
    /// Create the adapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK as i32 {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK as i32 {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK as i32 {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            image: [ERASED; EEPROM_SIZE],
        })
    }

    /// Reset the whole image to the erased state.
    pub fn erase(&mut self) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.image = [ERASED; EEPROM_SIZE];
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            Self::with_nvs_handle(true, |handle| {
                let ret = unsafe { nvs_erase_key(handle, IMAGE_KEY.as_ptr()) };
                if ret != ESP_OK as i32 && ret != ESP_ERR_NVS_NOT_FOUND as i32 {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(())
            })
            .map_err(|_| StorageError::IoError)
        }
    }

    fn range(address: u16, len: usize) -> Result<core::ops::Range<usize>, StorageError> {
        let start = usize::from(address);
        let end = start.checked_add(len).ok_or(StorageError::OutOfRange)?;
        if end > EEPROM_SIZE {
            return Err(StorageError::OutOfRange);
        }
        Ok(start..end)
    }

    /// Open the station namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(NAMESPACE.as_ptr(), mode, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Current image; a missing blob reads as fully erased.
    #[cfg(target_os = "espidf")]
    fn load_image(&self) -> Result<[u8; EEPROM_SIZE], StorageError> {
        let result = Self::with_nvs_handle(false, |handle| {
            let mut image = [ERASED; EEPROM_SIZE];
            let mut size = EEPROM_SIZE;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    IMAGE_KEY.as_ptr(),
                    image.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            Ok(image)
        });
        match result {
            Ok(image) => Ok(image),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND as i32 => Ok([ERASED; EEPROM_SIZE]),
            Err(e) => {
                warn!("NvsAdapter: NVS read error {}", e);
                Err(StorageError::IoError)
            }
        }
    }
}

/// Adapter without flash initialisation.  On ESP-IDF every access fails
/// until NVS is brought up, which callers treat as missing data.
impl Default for NvsAdapter {
    fn default() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            image: [ERASED; EEPROM_SIZE],
        }
    }
}

impl PersistentStore for NvsAdapter {
    fn read(&self, address: u16, buf: &mut [u8]) -> Result<usize, StorageError> {
        let range = Self::range(address, buf.len())?;

        #[cfg(not(target_os = "espidf"))]
        let image = &self.image;
        #[cfg(target_os = "espidf")]
        let image = &self.load_image()?;

        let bytes = &image[range];
        if bytes.iter().all(|&b| b == ERASED) {
            return Err(StorageError::NotFound);
        }
        buf.copy_from_slice(bytes);
        Ok(buf.len())
    }

    fn write(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError> {
        let range = Self::range(address, data.len())?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.image[range].copy_from_slice(data);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let mut image = self.load_image()?;
            image[range].copy_from_slice(data);
            Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        IMAGE_KEY.as_ptr(),
                        image.as_ptr() as *const _,
                        image.len(),
                    )
                };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(())
            })
            .map_err(|e| {
                warn!("NvsAdapter: NVS write error {}", e);
                StorageError::IoError
            })
        }
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<StationConfig, ConfigError> {
        let mut len_bytes = [0u8; 2];
        match self.read(CONFIG_ADDRESS, &mut len_bytes) {
            Ok(_) => {}
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                return Ok(StationConfig::default());
            }
            Err(_) => return Err(ConfigError::IoError),
        }

        let len = usize::from(u16::from_le_bytes(len_bytes));
        if len == 0 || len > CONFIG_REGION_LEN - 2 {
            return Err(ConfigError::Corrupted);
        }
        let mut bytes = [0u8; CONFIG_REGION_LEN - 2];
        self.read(CONFIG_ADDRESS + 2, &mut bytes[..len])
            .map_err(|_| ConfigError::Corrupted)?;

        let config: StationConfig = postcard::from_bytes(&bytes[..len]).map_err(|_| {
            warn!("NvsAdapter: stored config does not decode");
            ConfigError::Corrupted
        })?;
        config.validate().map_err(ConfigError::ValidationFailed)?;
        info!("NvsAdapter: loaded config ({} bytes)", len);
        Ok(config)
    }

    fn save(&mut self, config: &StationConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;

        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::Corrupted)?;
        if bytes.len() > CONFIG_REGION_LEN - 2 {
            return Err(ConfigError::TooLarge);
        }
        let mut region = [0u8; CONFIG_REGION_LEN];
        region[..2].copy_from_slice(&(bytes.len() as u16).to_le_bytes());
        region[2..2 + bytes.len()].copy_from_slice(&bytes);

        self.write(CONFIG_ADDRESS, &region[..2 + bytes.len()])
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
