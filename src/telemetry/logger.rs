//! # JSONL Measurement Logger
//!
//! Writes every measurement and error record as one JSON object per line,
//! rotating files after a fixed number of records and keeping only the most
//! recent files.
//!
//! ```text
//! {"timestamp":"2026-10-18T12:00:00.123Z","section":"WIND","types":"NNN","fields":{"Angle":"179.0","Error":"Normal","Speed":"000.3"}}
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::MeasurementSink;
use crate::config::TelemetryConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

/// One line of the measurement log
#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    timestamp: String,
    section: &'a str,
    types: &'a str,
    fields: serde_json::Map<String, serde_json::Value>,
}

/// Measurement sink writing rotating JSONL files
#[derive(Debug)]
pub struct JsonlSink {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    files_opened: u64,
}

impl JsonlSink {
    /// Create a sink from the telemetry configuration
    ///
    /// # Errors
    ///
    /// Returns error if the log directory cannot be created
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        Self::with_limits(&config.log_dir, config.max_records_per_file, config.max_files_to_keep)
    }

    /// Create a sink with explicit rotation limits
    ///
    /// No file is created until the first record is written.
    pub fn with_limits<P: AsRef<Path>>(log_dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&log_dir)?;
        info!("Telemetry log directory: {}", log_dir.display());

        Ok(Self {
            log_dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            files_opened: 0,
        })
    }

    /// Log files currently on disk, oldest first
    pub fn log_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_log_file(path))
            .collect();

        // Names embed a fixed-width timestamp and sequence number
        files.sort();
        Ok(files)
    }

    fn try_write(&mut self, section: &str, labels: &str, type_codes: &str, values: &[&str]) -> Result<()> {
        let fields = labels
            .split(',')
            .zip(values)
            .map(|(label, value)| (label.to_string(), serde_json::Value::from(*value)))
            .collect();

        let record = LogRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            section,
            types: type_codes,
            fields,
        };

        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, &record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            self.records_in_file += 1;
        }

        Ok(())
    }

    /// Start a new file and delete the oldest ones beyond the limit
    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let name = format!(
            "{}{}_{:06}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%dT%H%M%S%.3f"),
            self.files_opened,
            FILE_EXTENSION
        );
        let path = self.log_dir.join(name);
        debug!("Opening telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(File::create(&path)?));
        self.records_in_file = 0;
        self.files_opened += 1;

        self.prune()
    }

    fn prune(&self) -> Result<()> {
        let files = self.log_files()?;
        let excess = files.len().saturating_sub(self.max_files_to_keep);

        for path in &files[..excess] {
            debug!("Removing old telemetry file {}", path.display());
            fs::remove_file(path)?;
        }

        Ok(())
    }
}

impl MeasurementSink for JsonlSink {
    fn write(&mut self, section: &str, labels: &str, type_codes: &str, values: &[&str]) {
        if let Err(e) = self.try_write(section, labels, type_codes, values) {
            warn!("Failed to write telemetry record: {}", e);
        }
    }
}

fn is_log_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(FILE_PREFIX));
    let extension_matches = path.extension().is_some_and(|e| e == FILE_EXTENSION);

    name_matches && extension_matches
}
