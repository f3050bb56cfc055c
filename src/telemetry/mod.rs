//! # Telemetry Module
//!
//! Measurement log and operator notification channels.
//!
//! This module handles:
//! - The [`MeasurementSink`] and [`OperatorChannel`] seams the decoder writes to
//! - Sentinel error records for failed ticks
//! - Writing measurements to rotating JSONL files ([`logger::JsonlSink`])
//! - Forwarding operator messages to `tracing` ([`operator::TracingOperator`])

pub mod logger;
pub mod operator;

use tracing::debug;

use crate::error::DecodeError;
use crate::nmea::protocol::{MessageSchema, SENTINEL_VALUE};

/// Destination for decoded measurements and error records
///
/// Fire and forget: implementations swallow their own failures.
pub trait MeasurementSink {
    /// Write one record
    ///
    /// # Arguments
    ///
    /// * `section` - Log section name (at most 4 characters)
    /// * `labels` - Comma-separated column names (at most 64 characters)
    /// * `type_codes` - One type code per column
    /// * `values` - Column values, in label order
    fn write(&mut self, section: &str, labels: &str, type_codes: &str, values: &[&str]);
}

/// Sink used when telemetry logging is disabled; records only reach the
/// debug log
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl MeasurementSink for DiscardSink {
    fn write(&mut self, section: &str, labels: &str, _type_codes: &str, values: &[&str]) {
        debug!("{} [{}] = {:?}", section, labels, values);
    }
}

/// Severity of an operator message, 0 (most severe) to 7
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(u8);

impl Priority {
    /// Error-level message
    pub const ERROR: Priority = Priority(0);
    pub const WARNING: Priority = Priority(4);
    pub const INFO: Priority = Priority(6);

    /// Returns `None` outside 0..=7
    pub fn new(level: u8) -> Option<Self> {
        (level <= 7).then_some(Priority(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

/// Human-readable diagnostics for the operator
#[cfg_attr(test, mockall::automock)]
pub trait OperatorChannel {
    /// Send one message; fire and forget
    fn notify(&mut self, priority: Priority, text: &str);
}

/// Write a sentinel record for a failed tick
///
/// Every measurement column gets `"0"` and the status column gets the
/// error's fixed label.
pub fn write_error_record<K: MeasurementSink + ?Sized>(sink: &mut K, schema: &MessageSchema, error: &DecodeError) {
    let mut values = vec![SENTINEL_VALUE; schema.measurements];
    values.push(error.label());
    sink.write(schema.section, schema.labels, schema.type_codes, &values);
}
