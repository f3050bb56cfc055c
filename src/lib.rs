//! # Sensor Bridge Library
//!
//! Decode telemetry sentences from environmental sensors (sonic anemometer,
//! pressure/temperature/humidity probe) on a flight-control serial link.
//!
//! This library provides the sentence decoding engine: frame acquisition and
//! resynchronization, NMEA-0183-style delimiter and XOR checksum validation,
//! header-driven measurement extraction, and disconnect detection. Decoded
//! measurements go to a pluggable measurement sink.

pub mod config;
pub mod error;
pub mod engine;
pub mod nmea;
pub mod serial;
pub mod telemetry;
