//! Fuzz target: `WakeSpec` parsing
//!
//! Invariants checked:
//! - No panics on arbitrary UTF-8
//! - Every accepted spec passes the same range check `validate` applies
//! - Every accepted spec prints back in `DD:HH:MM:SS` form and reparses
//!   to the same value
//!
//! cargo fuzz run fuzz_wake_spec

#![no_main]

use ionstation::config::WakeSpec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(spec) = text.parse::<WakeSpec>() {
        assert!(spec.in_range());
        let printed = spec.to_string();
        assert_eq!(printed.len(), 11);
        assert_eq!(printed.parse::<WakeSpec>(), Ok(spec));
    }
});
