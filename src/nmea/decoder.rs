//! # NMEA Sentence Decoder
//!
//! Dispatches validated sentences on their header and extracts the
//! measurements of the sentences we log (wind speed, pressure/temperature/
//! humidity).

use tracing::debug;

use super::checksum::{extract_payload, verify_checksum};
use super::protocol::*;
use crate::error::DecodeError;
use crate::telemetry::MeasurementSink;

/// Wind sentence measurements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindReading {
    /// Wind angle in degrees, as sent
    pub angle: String,

    /// Wind speed, as sent
    pub speed: String,
}

/// Pressure / temperature / humidity probe measurements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PthReading {
    pub pressure: String,
    pub temp1: String,
    pub temp2: String,
    pub humidity: String,
    pub temp3: String,
}

/// Measurements of one decoded sentence, mapped onto named fields
///
/// Values stay in their wire text form; the measurement log stores them as
/// strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorReading {
    Wind(WindReading),
    Pth(PthReading),
}

impl SensorReading {
    /// Map an ordered measurement set onto the named fields of `kind`
    ///
    /// Returns `None` if the count does not match the schema.
    pub fn from_measurements(kind: SentenceKind, measurements: &[&str]) -> Option<Self> {
        if measurements.len() != kind.schema().measurements {
            return None;
        }

        let reading = match (kind, measurements) {
            (SentenceKind::WindSpeed, [angle, speed]) => SensorReading::Wind(WindReading {
                angle: angle.to_string(),
                speed: speed.to_string(),
            }),
            (SentenceKind::PressureTempHumidity, [pressure, temp1, temp2, humidity, temp3]) => {
                SensorReading::Pth(PthReading {
                    pressure: pressure.to_string(),
                    temp1: temp1.to_string(),
                    temp2: temp2.to_string(),
                    humidity: humidity.to_string(),
                    temp3: temp3.to_string(),
                })
            }
            _ => return None,
        };

        Some(reading)
    }

    pub fn kind(&self) -> SentenceKind {
        match self {
            SensorReading::Wind(_) => SentenceKind::WindSpeed,
            SensorReading::Pth(_) => SentenceKind::PressureTempHumidity,
        }
    }

    /// Values of the log record in label order, status column included
    pub fn log_values(&self) -> Vec<&str> {
        match self {
            SensorReading::Wind(w) => vec![w.angle.as_str(), w.speed.as_str(), STATUS_NORMAL],
            SensorReading::Pth(p) => vec![
                p.pressure.as_str(),
                p.temp1.as_str(),
                p.temp2.as_str(),
                p.humidity.as_str(),
                p.temp3.as_str(),
                STATUS_NORMAL,
            ],
        }
    }
}

/// Outcome of decoding a frame that passed delimiter validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Measurements were written to the sink
    Logged(SensorReading),

    /// Sentence type we do not log; nothing was written
    NotUseful,
}

/// Extract the header between `$` and the first `,`
pub fn extract_header(sentence: &[u8]) -> Option<&[u8]> {
    let start = sentence.iter().position(|&b| b == NMEA_START)? + 1;
    let len = sentence[start..]
        .iter()
        .position(|&b| b == NMEA_FIELD_SEPARATOR)?;

    Some(&sentence[start..start + len])
}

/// Map a sentence onto its schema by header
///
/// Sentences without a header field are unrecognized.
pub fn dispatch(sentence: &[u8]) -> Dispatch {
    extract_header(sentence).map_or(Dispatch::Unrecognized, lookup_schema)
}

/// Split a payload into fields and check the count against the schema
///
/// # Errors
///
/// `ParsingFail` if the payload is not text or the count differs.
pub fn parse_fields<'a>(payload: &'a [u8], schema: &MessageSchema) -> Result<Vec<&'a str>, DecodeError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| DecodeError::ParsingFail("payload is not valid text".to_string()))?;

    let fields: Vec<&str> = text.split(NMEA_FIELD_SEPARATOR as char).collect();
    if fields.len() != schema.fields {
        return Err(DecodeError::ParsingFail(format!(
            "{}: expected {} fields, got {}",
            schema.header,
            schema.fields,
            fields.len()
        )));
    }

    Ok(fields)
}

/// Leading numeric part of a field
///
/// Matches digits, an optional `.` and more digits at the start of the
/// token. Returns `None` unless the match holds at least one digit, so unit
/// letters, status flags and the header are skipped.
///
/// This widens the plain digits-and-point pattern with an optional leading
/// `-`. Without it, PTHS sentences carrying sub-zero temperatures would lose
/// a measurement and fail with `ParsingFail`.
pub fn extract_numeric(token: &str) -> Option<&str> {
    let bytes = token.as_bytes();
    let sign = usize::from(bytes.first() == Some(&b'-'));

    let int_digits = count_digits(&bytes[sign..]);
    let mut end = sign + int_digits;
    let mut frac_digits = 0;

    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        end += 1 + frac_digits;
    }

    (int_digits + frac_digits > 0).then(|| &token[..end])
}

/// Pull the measurement subset out of the parsed fields
///
/// # Errors
///
/// `ParsingFail` if the number of numeric fields differs from the schema.
pub fn extract_measurements<'a>(fields: &[&'a str], schema: &MessageSchema) -> Result<Vec<&'a str>, DecodeError> {
    let measurements: Vec<&str> = fields.iter().copied().filter_map(extract_numeric).collect();

    if measurements.len() != schema.measurements {
        return Err(DecodeError::ParsingFail(format!(
            "{}: expected {} measurements, got {}",
            schema.header,
            schema.measurements,
            measurements.len()
        )));
    }

    Ok(measurements)
}

/// Write a measurement set to the sink under its schema's section
///
/// Re-checks the count before mapping. Returns `None` when the schema
/// handler rejects the set, in which case nothing is written.
pub fn handle_measurements<K: MeasurementSink + ?Sized>(
    schema: &MessageSchema,
    measurements: &[&str],
    sink: &mut K,
) -> Option<SensorReading> {
    let reading = SensorReading::from_measurements(schema.kind, measurements)?;
    sink.write(schema.section, schema.labels, schema.type_codes, &reading.log_values());
    Some(reading)
}

/// Decode a frame that already passed [`verify_frame`](super::frame::verify_frame)
///
/// Unknown headers are not useful and are dropped before the checksum is
/// looked at. Known headers must pass the checksum and the field and
/// measurement counts of their schema.
///
/// # Errors
///
/// `ChecksumFail` or `ParsingFail`. The caller owns error reporting.
pub fn decode_sentence<K: MeasurementSink + ?Sized>(sentence: &[u8], sink: &mut K) -> Result<Decoded, DecodeError> {
    let schema = match dispatch(sentence) {
        Dispatch::Known(schema) => schema,
        Dispatch::Unrecognized => return Ok(Decoded::NotUseful),
    };

    if !verify_checksum(sentence) {
        return Err(DecodeError::ChecksumFail(schema.header.to_string()));
    }

    // verify_checksum already located the payload
    let payload = extract_payload(sentence)
        .ok_or_else(|| DecodeError::ChecksumFail(schema.header.to_string()))?;

    let fields = parse_fields(payload, schema)?;
    let measurements = extract_measurements(&fields, schema)?;

    let reading = handle_measurements(schema, &measurements, sink).ok_or_else(|| {
        DecodeError::ParsingFail(format!("{}: handler rejected measurements", schema.header))
    })?;

    debug!("Decoded {} sentence: {:?}", schema.header, measurements);
    Ok(Decoded::Logged(reading))
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
