//! Operator channel backed by `tracing`

use tracing::{debug, error, info, warn, Level};

use super::{OperatorChannel, Priority};

/// Sends operator messages to the tracing subscriber
///
/// | Priority | Level   |
/// |----------|---------|
/// | 0-3      | `error` |
/// | 4        | `warn`  |
/// | 5-6      | `info`  |
/// | 7        | `debug` |
#[derive(Debug, Clone, Default)]
pub struct TracingOperator {
    /// Prefix identifying the link, e.g. the device path
    source: String,
}

impl TracingOperator {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }
}

/// Tracing level an operator message is emitted at
pub fn level_for(priority: Priority) -> Level {
    match priority.level() {
        0..=3 => Level::ERROR,
        4 => Level::WARN,
        5 | 6 => Level::INFO,
        _ => Level::DEBUG,
    }
}

impl OperatorChannel for TracingOperator {
    fn notify(&mut self, priority: Priority, text: &str) {
        let source = self.source.as_str();
        let level = level_for(priority);
        if level == Level::ERROR {
            error!(source, priority = priority.level(), "{}", text);
        } else if level == Level::WARN {
            warn!(source, "{}", text);
        } else if level == Level::INFO {
            info!(source, "{}", text);
        } else {
            debug!(source, "{}", text);
        }
    }
}
