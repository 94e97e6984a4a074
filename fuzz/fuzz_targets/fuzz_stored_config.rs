//! Fuzz target: stored configuration decoding
//!
//! Writes arbitrary bytes into the config region of the host NVS image and
//! loads it back.
//!
//! Invariants checked:
//! - No panics under arbitrary byte inputs
//! - Any config `load` accepts also passes `validate`
//!
//! cargo fuzz run fuzz_stored_config

#![no_main]

use ionstation::adapters::nvs::{CONFIG_ADDRESS, CONFIG_REGION_LEN, NvsAdapter};
use ionstation::app::ports::{ConfigPort, PersistentStore};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(CONFIG_REGION_LEN)];
    let mut nvs = NvsAdapter::default();
    if nvs.write(CONFIG_ADDRESS, data).is_err() {
        return;
    }
    if let Ok(config) = nvs.load() {
        assert!(config.validate().is_ok());
    }
});
