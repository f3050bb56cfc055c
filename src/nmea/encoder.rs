//! # NMEA Sentence Encoder
//!
//! Builds complete sentences with a correct checksum trailer. Used to
//! simulate sensors on a bench link and to produce test fixtures.

use super::checksum::xor_checksum;
use super::protocol::*;

/// Encode a header and its fields into a complete sentence
///
/// # Arguments
///
/// * `header` - Sentence header (e.g. `IIMWV`)
/// * `fields` - Field values following the header, in order
///
/// # Returns
///
/// * `Vec<u8>` - `$<header>,<fields>*<checksum>\r\n`
///
/// # Examples
///
/// ```
/// use sensor_bridge::nmea::encoder::encode_sentence;
///
/// let sentence = encode_sentence("IIMWV", &["179.0", "R", "000.3", "M", "A"]);
/// assert_eq!(sentence, b"$IIMWV,179.0,R,000.3,M,A*32\r\n");
/// ```
pub fn encode_sentence(header: &str, fields: &[&str]) -> Vec<u8> {
    let payload = encode_payload(header, fields);
    let checksum = xor_checksum(&payload);

    // $ + payload + * + 2 hex digits + \r\n
    let mut sentence = Vec::with_capacity(payload.len() + 6);
    sentence.push(NMEA_START);
    sentence.extend_from_slice(&payload);
    sentence.push(NMEA_CHECKSUM_DELIMITER);
    sentence.extend_from_slice(format!("{:02X}", checksum).as_bytes());
    sentence.extend_from_slice(NMEA_TERMINATOR);

    sentence
}

/// Encode a sensor reading the way the sensor itself would send it
///
/// Wind sentences carry the relative reference, speed unit and valid flag;
/// PTH sentences are bare values.
pub fn encode_reading(reading: &super::decoder::SensorReading) -> Vec<u8> {
    use super::decoder::SensorReading;

    match reading {
        SensorReading::Wind(w) => encode_sentence(
            SentenceKind::WindSpeed.schema().header,
            &[w.angle.as_str(), "R", w.speed.as_str(), "M", "A"],
        ),
        SensorReading::Pth(p) => encode_sentence(
            SentenceKind::PressureTempHumidity.schema().header,
            &[
                p.pressure.as_str(),
                p.temp1.as_str(),
                p.temp2.as_str(),
                p.humidity.as_str(),
                p.temp3.as_str(),
            ],
        ),
    }
}

/// Header and fields joined by commas, without delimiters
fn encode_payload(header: &str, fields: &[&str]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(NMEA_MAX_SENTENCE_LENGTH);
    payload.extend_from_slice(header.as_bytes());

    for field in fields {
        payload.push(NMEA_FIELD_SEPARATOR);
        payload.extend_from_slice(field.as_bytes());
    }

    payload
}
