//! Application core: domain logic with no direct I/O.
//!
//! The wake cycle sequences the calibration selector, the sampling loop and
//! the telemetry builder.  All interaction with hardware happens through
//! **port traits** defined in [`ports`], so this layer is fully testable
//! without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
