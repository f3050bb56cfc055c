//! # NMEA Sentence Constants and Schemas
//!
//! Core wire definitions and the static table of sentences the bridge
//! knows how to log.
//!
//! Sentence layout:
//!
//! ```text
//! $<header>,<field>,<field>,...*<2 hex digits>\r\n
//! ```

use serde::Deserialize;

/// Sentence start delimiter
pub const NMEA_START: u8 = b'$';

/// Checksum delimiter
pub const NMEA_CHECKSUM_DELIMITER: u8 = b'*';

/// Field separator
pub const NMEA_FIELD_SEPARATOR: u8 = b',';

/// Sentence terminator (carriage return + line feed)
pub const NMEA_TERMINATOR: &[u8] = b"\r\n";

/// Line feed, the byte the terminator scan stops on
pub const NMEA_LINE_FEED: u8 = b'\n';

/// Number of hex digits in the checksum trailer
pub const NMEA_CHECKSUM_DIGITS: usize = 2;

/// Shortest byte string the frame validator will look at (`$` + `\r\n`)
pub const NMEA_MIN_FRAME_LENGTH: usize = 3;

/// Standard NMEA-0183 maximum sentence length
pub const NMEA_MAX_SENTENCE_LENGTH: usize = 82;

/// Status written alongside every successfully decoded measurement set
pub const STATUS_NORMAL: &str = "Normal";

/// Sentinel written in place of each measurement on an error record
pub const SENTINEL_VALUE: &str = "0";

/// Maximum length of a log section name
pub const SECTION_MAX_LEN: usize = 4;

/// Maximum total length of a log label list
pub const LABELS_MAX_LEN: usize = 64;

/// Sentence types the bridge decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceKind {
    /// Sonic anemometer wind speed and angle (`IIMWV`)
    WindSpeed,

    /// Pressure / temperature / humidity probe (`PTHS`)
    PressureTempHumidity,
}

/// Static schema of a known sentence
///
/// `fields` counts every comma-separated token of the payload, header
/// included. `labels` and `type_codes` describe the log record and always
/// end with the status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSchema {
    pub kind: SentenceKind,
    pub header: &'static str,
    pub fields: usize,
    pub measurements: usize,
    pub section: &'static str,
    pub labels: &'static str,
    pub type_codes: &'static str,
}

/// Every sentence the bridge logs. Anything else on the bus is ignored.
pub const SCHEMAS: &[MessageSchema] = &[
    MessageSchema {
        kind: SentenceKind::WindSpeed,
        header: "IIMWV",
        fields: 6,
        measurements: 2,
        section: "WIND",
        labels: "Angle,Speed,Error",
        type_codes: "NNN",
    },
    MessageSchema {
        kind: SentenceKind::PressureTempHumidity,
        header: "PTHS",
        fields: 6,
        measurements: 5,
        section: "PTHS",
        labels: "Press,Temp1,Temp2,Humid,Temp3,Error",
        type_codes: "NNNNNN",
    },
];

/// Result of looking a header up in [`SCHEMAS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Header names a sentence we log
    Known(&'static MessageSchema),

    /// Header is valid NMEA but not one of ours
    Unrecognized,
}

impl SentenceKind {
    /// Schema entry for this sentence kind
    pub fn schema(self) -> &'static MessageSchema {
        match self {
            SentenceKind::WindSpeed => &SCHEMAS[0],
            SentenceKind::PressureTempHumidity => &SCHEMAS[1],
        }
    }
}

/// Look up a header in the static schema table
pub fn lookup_schema(header: &[u8]) -> Dispatch {
    SCHEMAS
        .iter()
        .find(|schema| schema.header.as_bytes() == header)
        .map_or(Dispatch::Unrecognized, Dispatch::Known)
}
