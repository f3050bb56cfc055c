//! # NMEA Checksum
//!
//! XOR checksum over the bytes strictly between `$` and `*`.
//!
//! **Initial Value**: 0x00
//! **Encoding**: two uppercase hex digits after `*`

use super::protocol::{NMEA_CHECKSUM_DELIMITER, NMEA_CHECKSUM_DIGITS, NMEA_START};

/// Calculate the NMEA checksum of a payload
///
/// Left fold of XOR over the payload bytes, starting from zero.
///
/// # Arguments
///
/// * `payload` - Sentence body without the `$` and `*` delimiters
///
/// # Examples
///
/// ```
/// use sensor_bridge::nmea::checksum::xor_checksum;
///
/// assert_eq!(xor_checksum(b"IIMWV,179.0,R,000.3,M,A"), 0x32);
/// ```
pub fn xor_checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, &byte| acc ^ byte)
}

/// Extract the payload between the first `$` and the following `*`
///
/// Returns `None` when there is no `$` or no `*` after it.
pub fn extract_payload(sentence: &[u8]) -> Option<&[u8]> {
    let (start, star) = locate_payload(sentence)?;
    Some(&sentence[start..star])
}

/// Parse the two hex digits immediately after the first `*` that follows `$`
///
/// Only `0-9` and `A-F` are accepted.
pub fn extract_checksum(sentence: &[u8]) -> Option<u8> {
    let (_, star) = locate_payload(sentence)?;
    let trailer = sentence.get(star + 1..star + 1 + NMEA_CHECKSUM_DIGITS)?;

    let high = upper_hex_digit(trailer[0])?;
    let low = upper_hex_digit(trailer[1])?;
    Some((high << 4) | low)
}

/// Verify the checksum trailer of a sentence
///
/// Returns `false` (never panics) if the payload cannot be located, the
/// trailer is missing or not uppercase hex, or the values differ.
pub fn verify_checksum(sentence: &[u8]) -> bool {
    match (extract_payload(sentence), extract_checksum(sentence)) {
        (Some(payload), Some(expected)) => xor_checksum(payload) == expected,
        _ => false,
    }
}

/// Index of the first payload byte and of the closing `*`
fn locate_payload(sentence: &[u8]) -> Option<(usize, usize)> {
    let start = sentence.iter().position(|&b| b == NMEA_START)? + 1;
    let len = sentence[start..]
        .iter()
        .position(|&b| b == NMEA_CHECKSUM_DELIMITER)?;

    Some((start, start + len))
}

fn upper_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
