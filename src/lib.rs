//! IonStation firmware library.
//!
//! Exposes the pure-logic modules for integration testing and the adapters
//! the firmware binary wires together. All ESP-IDF-specific code is guarded
//! by `#[cfg(target_os = "espidf")]` within each module; on the host the
//! adapters run against simulation backends.

#![deny(unused_must_use)]

pub mod app;
pub mod calibration;
pub mod config;
pub mod datetime;
pub mod error;
pub mod scheduler;
pub mod sensors;
pub mod telemetry;

pub mod adapters;
pub mod pins;
