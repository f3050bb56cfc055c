//! # NMEA Sentence Module
//!
//! Implementation of the NMEA-0183-style sentences sent by the
//! environmental sensors.
//!
//! This module handles:
//! - Frame acquisition and resynchronization
//! - Start/end delimiter validation
//! - XOR checksum calculation and verification
//! - Header dispatch and measurement extraction
//! - Sentence encoding for simulation and tests

pub mod protocol;
pub mod frame;
pub mod checksum;
pub mod decoder;
pub mod encoder;
