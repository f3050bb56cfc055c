//! # Sensor Bridge
//!
//! Decode environmental sensor telemetry from a serial link and log the
//! measurements.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use sensor_bridge::config::Config;
use sensor_bridge::engine::{scheduler, DecodeEngine};
use sensor_bridge::serial::SensorSerial;
use sensor_bridge::telemetry::logger::JsonlSink;
use sensor_bridge::telemetry::operator::TracingOperator;
use sensor_bridge::telemetry::{DiscardSink, MeasurementSink};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Diagnostic log file name prefix inside the telemetry log directory
const DIAGNOSTIC_LOG_PREFIX: &str = "sensor-bridge.log";

/// Main entry point for Sensor Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, `config/default.toml`, or defaults)
///    - Set up logging to stderr and, with telemetry enabled, a daily diagnostic file
///    - Open the sensor serial port
///
/// 2. **Main Loop**
///    - Run one decode tick every `tick_interval_ms`
///    - Write measurements and error records to the telemetry log
///
/// 3. **Graceful Shutdown**
///    - Stop on Ctrl+C and log the final counters
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;

    // Keep the guard alive so buffered diagnostic lines are flushed on exit
    let file_layer = if config.telemetry.enabled {
        let appender = tracing_appender::rolling::daily(&config.telemetry.log_dir, DIAGNOSTIC_LOG_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        Some((tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer), guard))
    } else {
        None
    };
    let (file_layer, _guard) = file_layer.unzip();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    info!("Sensor Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut serial = SensorSerial::open_configured(&config.serial.port, config.serial.baud_rate)
        .context("Failed to open sensor serial port")?;

    let mut sink: Box<dyn MeasurementSink> = if config.telemetry.enabled {
        Box::new(JsonlSink::new(&config.telemetry).context("Failed to set up telemetry log")?)
    } else {
        info!("Telemetry logging disabled");
        Box::new(DiscardSink)
    };

    let mut operator = TracingOperator::new(serial.device_path());
    let mut engine = DecodeEngine::new(&config.decoder);

    info!("Press Ctrl+C to exit");

    let stats = scheduler::run(
        &mut engine,
        &mut serial,
        sink.as_mut(),
        &mut operator,
        Duration::from_millis(config.decoder.tick_interval_ms),
        async {
            // If the signal handler cannot be installed, run until killed
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        },
    )
    .await;

    info!("Received Ctrl+C, shutting down...");
    info!("Final counters: {:?}", stats);

    Ok(())
}

/// Load the configuration named on the command line, the default file, or
/// built-in defaults
fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("Failed to load {}", path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Config::load(DEFAULT_CONFIG_PATH).with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_PATH))
        }
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
