//! NMEA 0183 sentences carried inside an ensemble.
//!
//! Sentences arrive as a byte stream that may split anywhere. An
//! [`NmeaRecord`] buffers the residue between deliveries, extracts every
//! complete `$...*CC` sentence, verifies its checksum, and keeps the latest
//! sentence of each talker type.
//!
//! ```text
//! $GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n
//! ^start                                                          ^delimiter + 2 hex digits
//! ```

use std::collections::HashMap;
use std::fmt;

const START: u8 = b'$';
const DELIM: u8 = b'*';

/// Delimiter plus two checksum digits.
const DELIM_WINDOW: usize = 3;

/// Longest sentence NMEA 0183 allows, `$` through CR LF.
const MAX_SENTENCE_LEN: usize = 82;

/// Bytes kept while a started sentence waits for its delimiter.
const MAX_RESIDUE: usize = 2 * MAX_SENTENCE_LEN;

/// Line terminator written after every sentence on encode.
pub const TERMINATOR: &str = "\r\n";

// ---------------------------------------------------------------------------
// Talker types and parsed sentences
// ---------------------------------------------------------------------------

/// Sentence category, taken from the last three characters of the command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TalkerType {
    /// Fix data
    Gga,
    /// Course and speed over ground
    Vtg,
    /// True heading
    Hdt,
    /// Time and date
    Zda,
}

impl TalkerType {
    /// Classify a command word such as `"GPGGA"` or `"gngga"`.
    pub fn from_command(command: &str) -> Option<Self> {
        let suffix = command.get(command.len().checked_sub(3)?..)?;
        match suffix.to_ascii_uppercase().as_str() {
            "GGA" => Some(Self::Gga),
            "VTG" => Some(Self::Vtg),
            "HDT" => Some(Self::Hdt),
            "ZDA" => Some(Self::Zda),
            _ => None,
        }
    }
}

impl fmt::Display for TalkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gga => write!(f, "GGA"),
            Self::Vtg => write!(f, "VTG"),
            Self::Hdt => write!(f, "HDT"),
            Self::Zda => write!(f, "ZDA"),
        }
    }
}

/// GGA fix data.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Gga {
    /// UTC time as sent (`hhmmss.ss`)
    pub utc: String,
    /// Latitude (deg, south negative)
    pub latitude: Option<f64>,
    /// Longitude (deg, west negative)
    pub longitude: Option<f64>,
    /// 0 = invalid, 1 = GPS, 2 = DGPS, ...
    pub fix_quality: Option<u8>,
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
    /// Antenna altitude above mean sea level (m)
    pub altitude: Option<f64>,
}

/// VTG course and speed over ground.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vtg {
    /// True track (deg)
    pub true_track: Option<f64>,
    /// Magnetic track (deg)
    pub magnetic_track: Option<f64>,
    pub speed_knots: Option<f64>,
    pub speed_kph: Option<f64>,
}

/// HDT true heading.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Hdt {
    /// Heading (deg)
    pub heading: Option<f64>,
}

/// ZDA time and date.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Zda {
    pub utc: String,
    pub day: Option<u8>,
    pub month: Option<u8>,
    pub year: Option<u16>,
}

/// A checksum-verified sentence decoded by talker type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ParsedSentence {
    Gga(Gga),
    Vtg(Vtg),
    Hdt(Hdt),
    Zda(Zda),
}

impl ParsedSentence {
    /// Decode the comma-separated fields after the command word.
    ///
    /// Empty or malformed fields become `None`; the sentence itself is kept.
    fn parse(talker: TalkerType, fields: &[&str]) -> Self {
        let field = |i: usize| fields.get(i).copied().unwrap_or("");
        let num = |i: usize| field(i).parse::<f64>().ok();
        match talker {
            TalkerType::Gga => ParsedSentence::Gga(Gga {
                utc: field(0).to_string(),
                latitude: parse_coordinate(field(1), field(2), 2),
                longitude: parse_coordinate(field(3), field(4), 3),
                fix_quality: field(5).parse().ok(),
                satellites: field(6).parse().ok(),
                hdop: num(7),
                altitude: num(8),
            }),
            TalkerType::Vtg => ParsedSentence::Vtg(Vtg {
                true_track: num(0),
                magnetic_track: num(2),
                speed_knots: num(4),
                speed_kph: num(6),
            }),
            TalkerType::Hdt => ParsedSentence::Hdt(Hdt { heading: num(0) }),
            TalkerType::Zda => ParsedSentence::Zda(Zda {
                utc: field(0).to_string(),
                day: field(1).parse().ok(),
                month: field(2).parse().ok(),
                year: field(3).parse().ok(),
            }),
        }
    }
}

/// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere letter to signed degrees.
fn parse_coordinate(value: &str, hemisphere: &str, degree_digits: usize) -> Option<f64> {
    let degrees: f64 = value.get(..degree_digits)?.parse().ok()?;
    let minutes: f64 = value.get(degree_digits..)?.parse().ok()?;
    let magnitude = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Some(magnitude),
        "S" | "W" => Some(-magnitude),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Checksum and validation
// ---------------------------------------------------------------------------

/// XOR of every byte between `$` and `*`.
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, &b| acc ^ b)
}

/// Check a `$BODY*CC` candidate. Returns the body on success.
fn validate(candidate: &[u8]) -> Option<&str> {
    if candidate.len() < 1 + DELIM_WINDOW || candidate[0] != START {
        return None;
    }
    let delim = candidate.len() - DELIM_WINDOW;
    if candidate[delim] != DELIM {
        return None;
    }
    let body = &candidate[1..delim];
    let digits = &candidate[delim + 1..];
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let expected = u8::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()?;
    if checksum(body) != expected {
        log::debug!(
            "dropping NMEA sentence with bad checksum (expected {expected:02X}, computed {:02X})",
            checksum(body)
        );
        return None;
    }
    let body = std::str::from_utf8(body).ok()?;
    body.is_ascii().then_some(body)
}

// ---------------------------------------------------------------------------
// Record and extractor
// ---------------------------------------------------------------------------

/// Accumulated NMEA state of one ensemble.
///
/// `raw_sentences` keeps every accepted sentence in arrival order; the typed
/// map holds only the most recent sentence of each talker type.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NmeaRecord {
    raw_sentences: Vec<String>,
    latest_by_talker: HashMap<TalkerType, ParsedSentence>,
    #[cfg_attr(feature = "serde", serde(skip))]
    buffer: Vec<u8>,
}

impl NmeaRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a section payload.
    pub fn decode(payload: &[u8]) -> Self {
        let mut record = Self::new();
        record.merge_incoming(payload);
        record
    }

    /// Append `data` to the residual buffer and extract every complete sentence.
    ///
    /// Returns the number of sentences accepted by this call. An incomplete
    /// trailing sentence stays buffered for the next call.
    pub fn merge_incoming(&mut self, data: &[u8]) -> usize {
        self.buffer.extend_from_slice(data);
        let mut accepted = 0;

        loop {
            // Find start marker
            let start = match self.buffer.iter().position(|&b| b == START) {
                Some(pos) => pos,
                None => {
                    self.buffer.clear();
                    break;
                }
            };

            // Discard any bytes before the start marker
            if start > 0 {
                self.buffer.drain(..start);
            }

            // Find the delimiter and wait for both checksum digits
            let delim = match self.buffer.iter().position(|&b| b == DELIM) {
                Some(pos) => pos,
                None => {
                    if self.buffer.len() > MAX_RESIDUE {
                        let excess = self.buffer.len() - MAX_RESIDUE;
                        log::debug!("no NMEA delimiter within {MAX_RESIDUE} bytes, dropping {excess}");
                        self.buffer.drain(..excess);
                    }
                    break;
                }
            };
            let end = delim + DELIM_WINDOW;
            if self.buffer.len() < end {
                break;
            }

            // A second start marker before the checksum ends means the first
            // sentence was cut short; resume at the new start.
            if let Some(stray) = self.buffer[1..end].iter().position(|&b| b == START) {
                log::debug!(
                    "dropping malformed NMEA span {:?}",
                    String::from_utf8_lossy(&self.buffer[..=stray])
                );
                self.buffer.drain(..=stray);
                continue;
            }

            let candidate: Vec<u8> = self.buffer.drain(..end).collect();
            if self.accept(trim_terminators(&candidate)) {
                accepted += 1;
            }
        }

        accepted
    }

    fn accept(&mut self, candidate: &[u8]) -> bool {
        let Some(body) = validate(candidate) else {
            return false;
        };

        self.raw_sentences.push(String::from_utf8_lossy(candidate).into_owned());

        let mut fields = body.split(',');
        let command = fields.next().unwrap_or("");
        match TalkerType::from_command(command) {
            Some(talker) => {
                let fields: Vec<&str> = fields.collect();
                log::trace!("NMEA {talker} accepted");
                self.latest_by_talker
                    .insert(talker, ParsedSentence::parse(talker, &fields));
            }
            None => log::trace!("NMEA {command:?} kept raw"),
        }
        true
    }

    /// Every accepted sentence, oldest first, without line terminators.
    pub fn raw_sentences(&self) -> &[String] {
        &self.raw_sentences
    }

    /// Most recent sentence of `talker`.
    pub fn latest(&self, talker: TalkerType) -> Option<&ParsedSentence> {
        self.latest_by_talker.get(&talker)
    }

    pub fn gga(&self) -> Option<&Gga> {
        match self.latest(TalkerType::Gga)? {
            ParsedSentence::Gga(s) => Some(s),
            _ => None,
        }
    }

    pub fn vtg(&self) -> Option<&Vtg> {
        match self.latest(TalkerType::Vtg)? {
            ParsedSentence::Vtg(s) => Some(s),
            _ => None,
        }
    }

    pub fn hdt(&self) -> Option<&Hdt> {
        match self.latest(TalkerType::Hdt)? {
            ParsedSentence::Hdt(s) => Some(s),
            _ => None,
        }
    }

    pub fn zda(&self) -> Option<&Zda> {
        match self.latest(TalkerType::Zda)? {
            ParsedSentence::Zda(s) => Some(s),
            _ => None,
        }
    }

    /// Bytes waiting for the rest of a sentence.
    pub fn residual(&self) -> &[u8] {
        &self.buffer
    }

    /// Section payload: every sentence followed by CR LF.
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for s in &self.raw_sentences {
            buf.extend_from_slice(s.as_bytes());
            buf.extend_from_slice(TERMINATOR.as_bytes());
        }
        buf
    }
}

fn trim_terminators(mut s: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = s {
        s = rest;
    }
    s
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
