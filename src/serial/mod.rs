//! # Serial Communication Module
//!
//! Handles the serial link to the environmental sensors.
//!
//! This module handles:
//! - Opening the sensor port (8N1, configured baud rate)
//! - Non-blocking reads guarded by the driver's queued byte count
//! - Treating read timeouts as "no data" rather than failures

pub mod port_trait;

use std::io::{self, Read};
use std::time::Duration;

use crate::error::{Result, SensorBridgeError};
use port_trait::ByteSource;
use tracing::{debug, info, warn};

/// Default sensor baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout; reads are only issued for bytes already queued, so this
/// only bounds a misbehaving driver
const READ_TIMEOUT_MS: u64 = 1;

/// `serial.port` value that probes [`DEFAULT_DEVICE_PATHS`] instead of a
/// single device
pub const AUTO_DETECT_PORT: &str = "auto";

/// Default sensor device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyAMA0", // On-board UART
    "/dev/ttyS0",
];

/// Sensor Serial Port Handler
///
/// Byte source backed by a real serial port.
pub struct SensorSerial {
    /// Serial port handle
    port: Box<dyn tokio_serial::SerialPort>,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for SensorSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SensorSerial {
    /// Open the first sensor port that responds from the default list
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    pub fn open(baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate)
    }

    /// Open the port named in the configuration
    ///
    /// [`AUTO_DETECT_PORT`] probes the default device list; anything else is
    /// opened as a device path.
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    pub fn open_configured(port: &str, baud_rate: u32) -> Result<Self> {
        if port == AUTO_DETECT_PORT {
            Self::open(baud_rate)
        } else {
            Self::open_with_paths(&[port], baud_rate)
        }
    }

    /// Open the first port that succeeds from `paths`
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed of the sensor
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sensor_bridge::serial::SensorSerial;
    ///
    /// let serial = SensorSerial::open_with_paths(&["/dev/ttyUSB1"], 9600)?;
    /// println!("Connected to: {}", serial.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened sensor port {} at {} baud", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(SensorBridgeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<Box<dyn tokio_serial::SerialPort>> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()
            .map_err(|e| SensorBridgeError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Read into `buf`, mapping a driver timeout to zero bytes
    fn read_queued(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl ByteSource for SensorSerial {
    fn available(&self) -> io::Result<usize> {
        let queued = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(queued as usize)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.available()? == 0 {
            return Ok(None);
        }

        let mut byte = [0u8; 1];
        let n = self.read_queued(&mut byte)?;
        Ok((n == 1).then_some(byte[0]))
    }

    fn read_bytes(&mut self, max_len: usize) -> io::Result<Vec<u8>> {
        let len = self.available()?.min(max_len);
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; len];
        let n = self.read_queued(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}
