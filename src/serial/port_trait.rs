//! Trait abstraction for non-blocking byte sources to enable testing

use std::io;

/// Non-blocking producer of serial bytes
///
/// None of these calls may wait for data: an empty result is a normal,
/// expected answer.
pub trait ByteSource {
    /// Number of bytes that can be read right now without blocking
    fn available(&self) -> io::Result<usize>;

    /// Read a single byte, or `None` if nothing is queued
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Read up to `max_len` queued bytes; may return fewer, or none
    fn read_bytes(&mut self, max_len: usize) -> io::Result<Vec<u8>>;
}
