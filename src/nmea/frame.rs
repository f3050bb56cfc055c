//! # NMEA Frame Reader
//!
//! Assembles candidate sentences from a non-blocking byte source and checks
//! their delimiters.
//!
//! Two read strategies are supported:
//!
//! - [`FrameStrategy::Terminator`]: byte-by-byte scan for `\n`, keeping a
//!   partial sentence across ticks
//! - [`FrameStrategy::Fixed`]: one bounded read of up to the maximum message
//!   length as soon as anything is available
//!
//! Both strategies read a bounded number of bytes per call so a tick never
//! stalls on a chatty sensor.

use std::fmt;
use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;
use tracing::debug;

use super::protocol::{NMEA_LINE_FEED, NMEA_MIN_FRAME_LENGTH, NMEA_START, NMEA_TERMINATOR};
use crate::serial::port_trait::ByteSource;

/// How the reader cuts the byte stream into sentences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStrategy {
    /// Scan for the line feed terminator one byte at a time
    #[default]
    Terminator,

    /// Read up to the maximum message length in a single call
    Fixed,
}

/// A candidate sentence handed from the reader to the validator
///
/// Never longer than the reader's maximum message length.
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateFrame(Bytes);

impl CandidateFrame {
    /// Raw sentence bytes, delimiters included
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for CandidateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CandidateFrame({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for CandidateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Trim the terminator so log lines stay on one line
        let text = String::from_utf8_lossy(&self.0);
        f.write_str(text.trim_end_matches(['\r', '\n']))
    }
}

/// Outcome of one read attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRead {
    /// A candidate sentence is ready for validation
    Frame(CandidateFrame),

    /// Not enough bytes yet; any partial sentence is kept for the next tick
    Pending,

    /// Maximum message length reached without a terminator
    Overflow,
}

/// Pulls bytes from a [`ByteSource`] and assembles candidate frames
#[derive(Debug)]
pub struct FrameReader {
    strategy: FrameStrategy,
    max_message_length: usize,
    max_bytes_per_tick: usize,
    /// Partial sentence carried between ticks (terminator strategy only)
    window: BytesMut,
}

impl FrameReader {
    /// Create a reader
    ///
    /// # Arguments
    ///
    /// * `strategy` - How to cut the stream into sentences
    /// * `max_message_length` - Longest sentence accepted, terminator included
    /// * `max_bytes_per_tick` - Read budget per call for the terminator scan
    pub fn new(strategy: FrameStrategy, max_message_length: usize, max_bytes_per_tick: usize) -> Self {
        Self {
            strategy,
            max_message_length,
            max_bytes_per_tick,
            window: BytesMut::with_capacity(max_message_length),
        }
    }

    pub fn strategy(&self) -> FrameStrategy {
        self.strategy
    }

    /// Bytes of a partial sentence currently held
    pub fn buffered(&self) -> usize {
        self.window.len()
    }

    /// Try to produce a candidate frame from the bytes available now
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the byte source.
    pub fn poll<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> io::Result<FrameRead> {
        match self.strategy {
            FrameStrategy::Terminator => self.scan_for_terminator(source),
            FrameStrategy::Fixed => self.read_fixed(source),
        }
    }

    /// Drop the partial sentence and every byte currently queued at the source
    ///
    /// Used after a malformed frame so the next read starts at a fresh `$`.
    /// Returns the number of bytes discarded from the source.
    pub fn resync<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> io::Result<usize> {
        self.window.clear();

        let pending = source.available()?;
        if pending == 0 {
            return Ok(0);
        }

        let drained = source.read_bytes(pending)?.len();
        debug!("Resync drained {} bytes", drained);
        Ok(drained)
    }

    /// Drop any partial sentence without touching the source
    ///
    /// Returns the number of buffered bytes discarded.
    pub fn reset(&mut self) -> usize {
        let dropped = self.window.len();
        self.window.clear();
        dropped
    }

    fn scan_for_terminator<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> io::Result<FrameRead> {
        let budget = source.available()?.min(self.max_bytes_per_tick);

        for _ in 0..budget {
            let Some(byte) = source.read_byte()? else {
                break;
            };
            self.window.put_u8(byte);

            if byte == NMEA_LINE_FEED {
                let frame = self.window.split().freeze();
                return Ok(FrameRead::Frame(CandidateFrame(frame)));
            }

            if self.window.len() >= self.max_message_length {
                return Ok(FrameRead::Overflow);
            }
        }

        Ok(FrameRead::Pending)
    }

    fn read_fixed<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> io::Result<FrameRead> {
        let data = source.read_bytes(self.max_message_length)?;
        if data.is_empty() {
            return Ok(FrameRead::Pending);
        }

        Ok(FrameRead::Frame(CandidateFrame(Bytes::from(data))))
    }
}

/// Check the start and end delimiters of a candidate frame
///
/// Valid iff the frame is at least 3 bytes, starts with `$` and ends with
/// `\r\n`. Never panics.
pub fn verify_frame(frame: &[u8]) -> bool {
    frame.len() >= NMEA_MIN_FRAME_LENGTH
        && frame[0] == NMEA_START
        && frame.ends_with(NMEA_TERMINATOR)
}
