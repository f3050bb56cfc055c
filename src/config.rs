//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::engine::disconnect::{ticks_to_fail, NoDataPolicy};
use crate::error::{Result, SensorBridgeError};
use crate::nmea::frame::FrameStrategy;
use crate::nmea::protocol::{SentenceKind, NMEA_MAX_SENTENCE_LENGTH, NMEA_MIN_FRAME_LENGTH};

/// Longest sentence the reader may be configured to accept
const MAX_MESSAGE_LENGTH_LIMIT: usize = 512;

/// Supported sensor baud rates
const VALID_BAUD_RATES: &[u32] = &[4800, 9600, 19200, 38400, 57600, 115200];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path, or `"auto"` to probe the usual sensor ports
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Decode engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DecoderConfig {
    /// Sensor attached to this link
    #[serde(default = "default_sensor")]
    pub sensor: SentenceKind,

    /// Scheduler period
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Expected time between two sentences from the sensor
    #[serde(default = "default_message_interval_ms")]
    pub message_interval_ms: u64,

    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    #[serde(default = "default_max_bytes_per_tick")]
    pub max_bytes_per_tick: usize,

    #[serde(default)]
    pub strategy: FrameStrategy,

    #[serde(default)]
    pub no_data_policy: NoDataPolicy,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 9600 }

fn default_sensor() -> SentenceKind { SentenceKind::WindSpeed }
fn default_tick_interval_ms() -> u64 { 100 }
fn default_message_interval_ms() -> u64 { 1000 }
fn default_max_message_length() -> usize { NMEA_MAX_SENTENCE_LENGTH }
fn default_max_bytes_per_tick() -> usize { 512 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_format() -> String { "jsonl".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            sensor: default_sensor(),
            tick_interval_ms: default_tick_interval_ms(),
            message_interval_ms: default_message_interval_ms(),
            max_message_length: default_max_message_length(),
            max_bytes_per_tick: default_max_bytes_per_tick(),
            strategy: FrameStrategy::default(),
            no_data_policy: NoDataPolicy::default(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            format: default_log_format(),
        }
    }
}

impl DecoderConfig {
    /// Empty ticks before the link is declared disconnected
    pub fn ticks_to_fail(&self) -> u32 {
        ticks_to_fail(self.tick_interval_ms, self.message_interval_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sensor_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 4800, 9600, 19200, 38400, 57600, 115200"));
        }

        // Validate timing fields
        if self.decoder.tick_interval_ms == 0 || self.decoder.tick_interval_ms > 10000 {
            return Err(invalid("tick_interval_ms must be between 1 and 10000"));
        }

        if self.decoder.message_interval_ms == 0 || self.decoder.message_interval_ms > 60000 {
            return Err(invalid("message_interval_ms must be between 1 and 60000"));
        }

        // A tick longer than the message interval lets sentences interleave in one read
        if self.decoder.tick_interval_ms >= self.decoder.message_interval_ms {
            return Err(invalid("tick_interval_ms must be shorter than message_interval_ms"));
        }

        if self.decoder.max_message_length < NMEA_MIN_FRAME_LENGTH
            || self.decoder.max_message_length > MAX_MESSAGE_LENGTH_LIMIT {
            return Err(invalid(format!(
                "max_message_length must be between {} and {}",
                NMEA_MIN_FRAME_LENGTH, MAX_MESSAGE_LENGTH_LIMIT
            )));
        }

        if self.decoder.max_bytes_per_tick == 0 || self.decoder.max_bytes_per_tick > 4096 {
            return Err(invalid("max_bytes_per_tick must be between 1 and 4096"));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> SensorBridgeError {
    SensorBridgeError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.decoder.ticks_to_fail(), 11);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyAMA0"
baud_rate = 19200

[decoder]
sensor = "pressure_temp_humidity"
tick_interval_ms = 200
message_interval_ms = 2000
strategy = "fixed"
no_data_policy = "every_tick"

[telemetry]
enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyAMA0");
        assert_eq!(config.serial.baud_rate, 19200);
        assert_eq!(config.decoder.sensor, SentenceKind::PressureTempHumidity);
        assert_eq!(config.decoder.strategy, FrameStrategy::Fixed);
        assert_eq!(config.decoder.no_data_policy, NoDataPolicy::EveryTick);
        assert_eq!(config.decoder.max_message_length, 82);
        assert!(!config.telemetry.enabled);
        assert_eq!(config.telemetry.log_dir, "./logs");
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.decoder.strategy, FrameStrategy::Terminator);
        assert_eq!(config.decoder.no_data_policy, NoDataPolicy::Once);
    }

    #[test]
    fn test_load_rejects_unknown_strategy() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[decoder]\nstrategy = \"guess\"\n").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(SensorBridgeError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/sensor-bridge.toml");
        assert!(matches!(result, Err(SensorBridgeError::Io(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in VALID_BAUD_RATES {
            let mut config = Config::default();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_tick_interval_zero() {
        let mut config = Config::default();
        config.decoder.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_message_interval_too_high() {
        let mut config = Config::default();
        config.decoder.message_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_not_shorter_than_message_interval() {
        let mut config = Config::default();
        config.decoder.tick_interval_ms = 1000;
        config.decoder.message_interval_ms = 1000;
        assert!(config.validate().is_err());

        config.decoder.tick_interval_ms = 999;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_message_length_bounds() {
        let mut config = Config::default();
        config.decoder.max_message_length = 2;
        assert!(config.validate().is_err());

        config.decoder.max_message_length = 513;
        assert!(config.validate().is_err());

        config.decoder.max_message_length = 512;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_bytes_per_tick_zero() {
        let mut config = Config::default();
        config.decoder.max_bytes_per_tick = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = Config::default();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = Config::default();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.telemetry.format = "csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyUSB0");
        assert_eq!(default_baud_rate(), 9600);
        assert_eq!(default_sensor(), SentenceKind::WindSpeed);
        assert_eq!(default_tick_interval_ms(), 100);
        assert_eq!(default_message_interval_ms(), 1000);
        assert_eq!(default_max_message_length(), 82);
        assert_eq!(default_max_bytes_per_tick(), 512);
        assert_eq!(default_telemetry_enabled(), true);
        assert_eq!(default_log_dir(), "./logs");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
        assert_eq!(default_log_format(), "jsonl");
    }
}
