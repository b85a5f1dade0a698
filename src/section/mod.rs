//! Section types and decode/encode dispatch.
//!
//! A [`Section`] is a header plus a [`SectionBody`], the tagged variant for
//! the kind of data it carries. Velocity, amplitude, correlation and
//! good-ping sections all share [`Matrix`]; ancillary, ensemble and
//! bottom-track sections are flat scalar arrays (see [`scalar`]).
//!
//! Dispatch is on the section name. Unrecognized names decode as
//! [`SectionBody::Unknown`] with the raw payload preserved.

pub mod scalar;

use std::fmt;

use crate::error::{DecodeError, Result};
use crate::header::{SectionHeader, ValueType};
use crate::matrix::{self, Matrix};
use crate::motion::VelocityVector;
use crate::nmea::NmeaRecord;

pub use scalar::{Ancillary, BeamArray, BottomTrack, EnsembleData};

// ---------------------------------------------------------------------------
// Section id constants
// ---------------------------------------------------------------------------

pub const ID_BEAM_VELOCITY: &str = "E000001";
pub const ID_INSTRUMENT_VELOCITY: &str = "E000002";
pub const ID_EARTH_VELOCITY: &str = "E000003";
pub const ID_AMPLITUDE: &str = "E000004";
pub const ID_CORRELATION: &str = "E000005";
pub const ID_GOOD_BEAM: &str = "E000006";
pub const ID_GOOD_EARTH: &str = "E000007";
pub const ID_ENSEMBLE_DATA: &str = "E000008";
pub const ID_ANCILLARY: &str = "E000009";
pub const ID_BOTTOM_TRACK: &str = "E000010";
pub const ID_NMEA: &str = "E000011";
pub const ID_SHIP_VELOCITY: &str = "E000018";

// ---------------------------------------------------------------------------
// Coordinate frames
// ---------------------------------------------------------------------------

/// Reference frame of a velocity matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CoordinateFrame {
    /// Along each acoustic beam
    Beam,
    /// Instrument X/Y/Z/Error
    Instrument,
    /// Ship forward/starboard/up/error
    Ship,
    /// East/North/Vertical/Error
    Earth,
}

impl CoordinateFrame {
    /// Section id of this frame's velocity matrix.
    pub fn velocity_id(self) -> &'static str {
        match self {
            Self::Beam => ID_BEAM_VELOCITY,
            Self::Instrument => ID_INSTRUMENT_VELOCITY,
            Self::Ship => ID_SHIP_VELOCITY,
            Self::Earth => ID_EARTH_VELOCITY,
        }
    }
}

impl fmt::Display for CoordinateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beam => write!(f, "beam"),
            Self::Instrument => write!(f, "instrument"),
            Self::Ship => write!(f, "ship"),
            Self::Earth => write!(f, "earth"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// A velocity matrix (m/s) and, for earth frame, its derived vectors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Velocity {
    pub matrix: Matrix<f32>,
    /// Filled by [`crate::Ensemble::compute_velocity_vectors`]; never encoded.
    pub vectors: Option<Vec<VelocityVector>>,
}

impl Velocity {
    pub fn new(matrix: Matrix<f32>) -> Self {
        Self {
            matrix,
            vectors: None,
        }
    }
}

/// The data carried by one section.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SectionBody {
    // -- Velocity (m/s) --
    BeamVelocity(Velocity),
    InstrumentVelocity(Velocity),
    EarthVelocity(Velocity),
    ShipVelocity(Velocity),

    // -- Signal quality --
    /// Amplitude (dB)
    Amplitude(Matrix<f32>),
    /// Correlation (0.0-1.0)
    Correlation(Matrix<f32>),
    /// Good pings per beam
    GoodBeam(Matrix<i32>),
    /// Good pings per earth channel
    GoodEarth(Matrix<i32>),

    // -- Scalars --
    EnsembleData(EnsembleData),
    Ancillary(Ancillary),
    BottomTrack(BottomTrack),

    // -- Text --
    Nmea(NmeaRecord),

    // -- Forward compat --
    Unknown(Vec<u8>),
}

impl SectionBody {
    /// Wrap a velocity matrix in the variant for `frame`.
    pub fn velocity(frame: CoordinateFrame, matrix: Matrix<f32>) -> Self {
        let v = Velocity::new(matrix);
        match frame {
            CoordinateFrame::Beam => Self::BeamVelocity(v),
            CoordinateFrame::Instrument => Self::InstrumentVelocity(v),
            CoordinateFrame::Ship => Self::ShipVelocity(v),
            CoordinateFrame::Earth => Self::EarthVelocity(v),
        }
    }

    /// Frame and velocity of a velocity body.
    pub fn as_velocity(&self) -> Option<(CoordinateFrame, &Velocity)> {
        match self {
            Self::BeamVelocity(v) => Some((CoordinateFrame::Beam, v)),
            Self::InstrumentVelocity(v) => Some((CoordinateFrame::Instrument, v)),
            Self::ShipVelocity(v) => Some((CoordinateFrame::Ship, v)),
            Self::EarthVelocity(v) => Some((CoordinateFrame::Earth, v)),
            _ => None,
        }
    }

    pub fn as_velocity_mut(&mut self) -> Option<(CoordinateFrame, &mut Velocity)> {
        match self {
            Self::BeamVelocity(v) => Some((CoordinateFrame::Beam, v)),
            Self::InstrumentVelocity(v) => Some((CoordinateFrame::Instrument, v)),
            Self::ShipVelocity(v) => Some((CoordinateFrame::Ship, v)),
            Self::EarthVelocity(v) => Some((CoordinateFrame::Earth, v)),
            _ => None,
        }
    }

    /// Standard section id, or `None` for unknown bodies.
    pub fn id(&self) -> Option<&'static str> {
        Some(match self {
            Self::BeamVelocity(_) => ID_BEAM_VELOCITY,
            Self::InstrumentVelocity(_) => ID_INSTRUMENT_VELOCITY,
            Self::EarthVelocity(_) => ID_EARTH_VELOCITY,
            Self::ShipVelocity(_) => ID_SHIP_VELOCITY,
            Self::Amplitude(_) => ID_AMPLITUDE,
            Self::Correlation(_) => ID_CORRELATION,
            Self::GoodBeam(_) => ID_GOOD_BEAM,
            Self::GoodEarth(_) => ID_GOOD_EARTH,
            Self::EnsembleData(_) => ID_ENSEMBLE_DATA,
            Self::Ancillary(_) => ID_ANCILLARY,
            Self::BottomTrack(_) => ID_BOTTOM_TRACK,
            Self::Nmea(_) => ID_NMEA,
            Self::Unknown(_) => return None,
        })
    }

    fn value_type(&self) -> ValueType {
        match self {
            Self::GoodBeam(_) | Self::GoodEarth(_) | Self::EnsembleData(_) => ValueType::Int,
            Self::Nmea(_) | Self::Unknown(_) => ValueType::Byte,
            _ => ValueType::Float,
        }
    }

    /// Element count and multiplier this body encodes with.
    fn dimensions(&self) -> (u32, u32) {
        let grid = |bins: usize, beams: usize| (bins as u32, beams as u32);
        match self {
            Self::BeamVelocity(v)
            | Self::InstrumentVelocity(v)
            | Self::EarthVelocity(v)
            | Self::ShipVelocity(v) => grid(v.matrix.num_bins(), v.matrix.num_beams()),
            Self::Amplitude(m) | Self::Correlation(m) => grid(m.num_bins(), m.num_beams()),
            Self::GoodBeam(m) | Self::GoodEarth(m) => grid(m.num_bins(), m.num_beams()),
            Self::EnsembleData(s) => (s.values.len() as u32, 1),
            Self::Ancillary(s) => (s.values.len() as u32, 1),
            Self::BottomTrack(s) => (s.values.len() as u32, 1),
            Self::Nmea(r) => (r.encode_payload().len() as u32, 1),
            Self::Unknown(p) => (p.len() as u32, 1),
        }
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// One typed sub-record of an ensemble.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Section {
    pub header: SectionHeader,
    pub body: SectionBody,
}

impl Section {
    /// Section with a fresh header under the body's standard id.
    ///
    /// Unknown bodies get an empty name; use [`Section::decode`] to keep one.
    pub fn new(body: SectionBody) -> Self {
        let (count, mult) = body.dimensions();
        let header = SectionHeader::new(body.value_type(), count, mult, body.id().unwrap_or(""));
        Self { header, body }
    }

    /// Decode one section starting at `data[0]`.
    ///
    /// `data` may extend past the section; only `header.section_len()` bytes
    /// are consumed.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let header = SectionHeader::decode(data)?;
        let len = header.section_len();
        if data.len() < len {
            return Err(DecodeError::payload_too_short("Section", len, data.len())
                .with_raw(&data[..header.size()]));
        }
        let data = &data[..len];
        let payload = &data[header.size()..];
        let words = header.element_count as usize * header.element_multiplier as usize;

        let velocity = |data: &[u8]| -> Result<Velocity> {
            Ok(Velocity::new(Matrix::decode_section(data, &header)?))
        };

        let body = match header.name.as_str() {
            ID_BEAM_VELOCITY => SectionBody::BeamVelocity(velocity(data)?),
            ID_INSTRUMENT_VELOCITY => SectionBody::InstrumentVelocity(velocity(data)?),
            ID_EARTH_VELOCITY => SectionBody::EarthVelocity(velocity(data)?),
            ID_SHIP_VELOCITY => SectionBody::ShipVelocity(velocity(data)?),
            ID_AMPLITUDE => SectionBody::Amplitude(Matrix::decode_section(data, &header)?),
            ID_CORRELATION => SectionBody::Correlation(Matrix::decode_section(data, &header)?),
            ID_GOOD_BEAM => SectionBody::GoodBeam(Matrix::decode_section(data, &header)?),
            ID_GOOD_EARTH => SectionBody::GoodEarth(Matrix::decode_section(data, &header)?),
            ID_ENSEMBLE_DATA => {
                matrix::check_value_type::<i32>(&header, "EnsembleData")?;
                SectionBody::EnsembleData(EnsembleData::new(matrix::decode_scalars(
                    data,
                    header.name_len,
                    words,
                )?))
            }
            ID_ANCILLARY => {
                matrix::check_value_type::<f32>(&header, "Ancillary")?;
                SectionBody::Ancillary(Ancillary::new(matrix::decode_scalars(
                    data,
                    header.name_len,
                    words,
                )?))
            }
            ID_BOTTOM_TRACK => {
                matrix::check_value_type::<f32>(&header, "BottomTrack")?;
                SectionBody::BottomTrack(BottomTrack::new(matrix::decode_scalars(
                    data,
                    header.name_len,
                    words,
                )?))
            }
            ID_NMEA => SectionBody::Nmea(NmeaRecord::decode(payload)),
            other => {
                log::trace!("unknown section {other:?}, keeping {} raw bytes", payload.len());
                SectionBody::Unknown(payload.to_vec())
            }
        };

        Ok(Self { header, body })
    }

    /// Encode header and payload. Dimensions come from the body; name and
    /// image tag come from the header.
    pub fn encode(&self) -> Vec<u8> {
        let h = &self.header;
        match &self.body {
            SectionBody::BeamVelocity(v)
            | SectionBody::InstrumentVelocity(v)
            | SectionBody::EarthVelocity(v)
            | SectionBody::ShipVelocity(v) => v.matrix.encode_with(h),
            SectionBody::Amplitude(m) | SectionBody::Correlation(m) => m.encode_with(h),
            SectionBody::GoodBeam(m) | SectionBody::GoodEarth(m) => m.encode_with(h),
            SectionBody::EnsembleData(s) => matrix::encode_scalars(&s.values, h),
            SectionBody::Ancillary(s) => matrix::encode_scalars(&s.values, h),
            SectionBody::BottomTrack(s) => matrix::encode_scalars(&s.values, h),
            SectionBody::Nmea(r) => encode_bytes(h, &r.encode_payload()),
            SectionBody::Unknown(p) => {
                let mut buf = h.encode();
                buf.extend_from_slice(p);
                buf
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }
}

/// Byte sections are `len` x 1.
fn encode_bytes(header: &SectionHeader, payload: &[u8]) -> Vec<u8> {
    let header = header.with_dimensions(payload.len() as u32, 1);
    let mut buf = Vec::with_capacity(header.size() + payload.len());
    header.encode_into(&mut buf);
    buf.extend_from_slice(payload);
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    fn earth() -> Matrix<f32> {
        Matrix::from_rows(&[vec![0.1, 0.2, 0.3, 0.0], vec![88.888, 0.5, 0.6, 88.888]])
    }

    #[test]
    fn velocity_round_trip() {
        let s = Section::new(SectionBody::velocity(CoordinateFrame::Earth, earth()));
        assert_eq!(s.name(), ID_EARTH_VELOCITY);
        let wire = s.encode();
        assert_eq!(wire.len(), 28 + 2 * 4 * 4);
        let back = Section::decode(&wire).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn dispatch_by_name() {
        let cases = [
            (CoordinateFrame::Beam, ID_BEAM_VELOCITY),
            (CoordinateFrame::Instrument, ID_INSTRUMENT_VELOCITY),
            (CoordinateFrame::Ship, ID_SHIP_VELOCITY),
            (CoordinateFrame::Earth, ID_EARTH_VELOCITY),
        ];
        for (frame, id) in cases {
            assert_eq!(frame.velocity_id(), id);
            let wire = earth().encode(id);
            let s = Section::decode(&wire).unwrap();
            let (got, v) = s.body.as_velocity().unwrap();
            assert_eq!(got, frame);
            assert_eq!(v.matrix, earth());
        }
    }

    #[test]
    fn good_beam_is_int() {
        let m = Matrix::from_rows(&[vec![4, 4, 3, 0]]);
        let s = Section::new(SectionBody::GoodBeam(m.clone()));
        assert_eq!(s.header.value_type, ValueType::Int);
        let back = Section::decode(&s.encode()).unwrap();
        assert_eq!(back.body, SectionBody::GoodBeam(m));
    }

    #[test]
    fn scalar_sections_round_trip() {
        let bodies = [
            SectionBody::EnsembleData(EnsembleData::new(vec![1, 30, 4, 1, 1, 0, 2024, 1, 2, 3, 4, 5, 6])),
            SectionBody::Ancillary(Ancillary::new(vec![1.2, 0.5, 0.0, 1.0, 12.5])),
            SectionBody::BottomTrack(BottomTrack::with_beams(4)),
        ];
        for body in bodies {
            let s = Section::new(body);
            let wire = s.encode();
            assert_eq!(Section::decode(&wire).unwrap(), s);
        }
    }

    #[test]
    fn unknown_section_preserved() {
        let mut wire = Vec::new();
        for w in [10u32, 2, 1, 7, 8] {
            codec::write_uint32(&mut wire, w);
        }
        wire.extend_from_slice(b"E000099\0");
        wire.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let s = Section::decode(&wire).unwrap();
        assert_eq!(s.body, SectionBody::Unknown(vec![1, 2, 3, 4, 5, 6, 7, 8]));
        assert_eq!(s.header.image, 7);
        assert_eq!(s.encode(), wire);
    }

    #[test]
    fn image_tag_survives_re_encode() {
        let mut s = Section::new(SectionBody::Amplitude(Matrix::new(2, 4, 40.0)));
        s.header.image = 3;
        let back = Section::decode(&s.encode()).unwrap();
        assert_eq!(back.header.image, 3);
    }

    #[test]
    fn nmea_section() {
        let text = b"$GPHDT,45.0,T*04\r\n";
        let s = Section::new(SectionBody::Nmea(NmeaRecord::decode(text)));
        assert_eq!(s.header.value_type, ValueType::Byte);
        let wire = s.encode();
        assert_eq!(&wire[28..], text);
        let back = Section::decode(&wire).unwrap();
        let SectionBody::Nmea(rec) = back.body else {
            panic!("expected NMEA body");
        };
        assert_eq!(rec.hdt().unwrap().heading, Some(45.0));
    }

    #[test]
    fn truncated_section() {
        let wire = earth().encode(ID_EARTH_VELOCITY);
        assert!(matches!(
            Section::decode(&wire[..wire.len() - 4]),
            Err(DecodeError::PayloadTooShort { .. })
        ));
    }

    #[test]
    fn velocity_with_int_type_rejected() {
        let wire = Matrix::from_rows(&[vec![1i32, 2]]).encode(ID_EARTH_VELOCITY);
        assert!(matches!(
            Section::decode(&wire),
            Err(DecodeError::ValueTypeMismatch { .. })
        ));
    }
}
