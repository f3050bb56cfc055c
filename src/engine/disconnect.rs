//! # Disconnect Monitor
//!
//! Counts consecutive ticks without a single byte from the sensor and
//! declares the link disconnected once the count reaches a threshold derived
//! from the sensor's message interval.
//!
//! ```text
//!            byte                     no byte, n < threshold
//!   ┌────────────────────┐          ┌───────┐
//!   ▼                    │          ▼       │
//! Idle ──no byte──▶ Waiting ──n >= threshold──▶ Disconnected
//!   ▲                                              │
//!   └──────────────────── byte ────────────────────┘
//! ```

use serde::Deserialize;

use crate::error::DecodeError;

/// Link state derived from the no-data counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Data seen this tick
    Idle,

    /// Some empty ticks, still under the threshold
    Waiting,

    /// Threshold reached; the sensor is considered silent
    Disconnected,
}

/// When a `NoData` error is raised while disconnected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataPolicy {
    /// Only on the tick the threshold is crossed
    #[default]
    Once,

    /// On every empty tick at or past the threshold
    EveryTick,
}

/// Number of empty ticks after which the link is declared disconnected
///
/// `ceil(message_interval / tick_interval) + 1`: one full message interval
/// of silence plus one tick of slack.
pub fn ticks_to_fail(tick_interval_ms: u64, message_interval_ms: u64) -> u32 {
    let tick = tick_interval_ms.max(1);
    let ticks = message_interval_ms.div_ceil(tick) + 1;
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

/// Tracks `loops_since_data` for one serial link
#[derive(Debug, Clone)]
pub struct DisconnectMonitor {
    loops_since_data: u32,
    ticks_to_fail: u32,
    policy: NoDataPolicy,
}

impl DisconnectMonitor {
    pub fn new(ticks_to_fail: u32, policy: NoDataPolicy) -> Self {
        Self {
            loops_since_data: 0,
            ticks_to_fail: ticks_to_fail.max(1),
            policy,
        }
    }

    /// Build a monitor from the scheduler tick and sensor message intervals
    pub fn from_intervals(tick_interval_ms: u64, message_interval_ms: u64, policy: NoDataPolicy) -> Self {
        Self::new(ticks_to_fail(tick_interval_ms, message_interval_ms), policy)
    }

    /// At least one byte was seen this tick
    pub fn record_data(&mut self) {
        self.loops_since_data = 0;
    }

    /// No byte was seen this tick
    ///
    /// Returns the `NoData` error when the policy says this tick should
    /// report it.
    pub fn record_empty(&mut self) -> Option<DecodeError> {
        self.loops_since_data = self.loops_since_data.saturating_add(1);

        let report = match self.policy {
            NoDataPolicy::Once => self.loops_since_data == self.ticks_to_fail,
            NoDataPolicy::EveryTick => self.loops_since_data >= self.ticks_to_fail,
        };

        report.then_some(DecodeError::NoData {
            ticks: self.loops_since_data,
        })
    }

    pub fn state(&self) -> LinkState {
        match self.loops_since_data {
            0 => LinkState::Idle,
            n if n < self.ticks_to_fail => LinkState::Waiting,
            _ => LinkState::Disconnected,
        }
    }

    pub fn loops_since_data(&self) -> u32 {
        self.loops_since_data
    }

    pub fn ticks_to_fail(&self) -> u32 {
        self.ticks_to_fail
    }
}
