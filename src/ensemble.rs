//! Ensemble container: the ordered sections of one measurement frame.

use crate::config::ScreenConfig;
use crate::error::{DecodeError, Result};
use crate::frame::RawEnsemble;
use crate::legacy::LegacyFrame;
use crate::motion::{self, VelocityVector};
use crate::nmea::NmeaRecord;
use crate::section::{
    Ancillary, BottomTrack, CoordinateFrame, EnsembleData, Section, SectionBody, Velocity,
};
use crate::validity;

/// One decoded ensemble. Sections keep their wire order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Ensemble {
    pub sections: Vec<Section>,
}

impl Ensemble {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the concatenated sections of an ensemble payload.
    ///
    /// A section that runs past the end of the payload ends decoding; the
    /// sections before it are kept. Any other section error is returned.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut sections = Vec::new();
        let mut pos = 0;

        while pos < payload.len() {
            match Section::decode(&payload[pos..]) {
                Ok(section) => {
                    pos += section.header.section_len();
                    sections.push(section);
                }
                Err(e @ DecodeError::PayloadTooShort { .. }) => {
                    log::warn!(
                        "ensemble truncated at byte {pos} of {}, keeping {} sections: {e}",
                        payload.len(),
                        sections.len()
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self { sections })
    }

    /// Concatenate every section's encoding.
    pub fn encode(&self) -> Vec<u8> {
        self.sections.iter().flat_map(Section::encode).collect()
    }

    /// Decode a checksum-verified ensemble.
    pub fn from_raw(raw: &RawEnsemble) -> Result<Self> {
        let ensemble = Self::decode(&raw.payload)?;
        if let Some(n) = ensemble.number() {
            if n as u32 != raw.number {
                log::debug!("frame number {} differs from ensemble data number {n}", raw.number);
            }
        }
        Ok(ensemble)
    }

    /// Parse a complete wire ensemble (sync bytes through checksum).
    pub fn parse(wire: &[u8]) -> Result<Self> {
        Self::from_raw(&RawEnsemble::parse(wire)?)
    }

    /// Frame this ensemble for the wire, numbered from its ensemble data
    /// section (0 without one).
    pub fn to_raw(&self) -> RawEnsemble {
        RawEnsemble {
            number: self.number().unwrap_or(0) as u32,
            payload: self.encode(),
        }
    }

    /// Normalized sections of a PD0 ensemble.
    pub fn from_legacy(frame: &LegacyFrame, config: &ScreenConfig) -> Self {
        Self {
            sections: frame.translate(config),
        }
    }

    // -----------------------------------------------------------------------
    // Section access
    // -----------------------------------------------------------------------

    /// First section named `name`.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name() == name)
    }

    /// Replace the section with the same name, or append.
    pub fn insert(&mut self, section: Section) {
        match self.sections.iter_mut().find(|s| s.name() == section.name()) {
            Some(slot) => *slot = section,
            None => self.sections.push(section),
        }
    }

    pub fn velocity(&self, frame: CoordinateFrame) -> Option<&Velocity> {
        self.sections
            .iter()
            .filter_map(|s| s.body.as_velocity())
            .find(|(f, _)| *f == frame)
            .map(|(_, v)| v)
    }

    pub fn velocity_mut(&mut self, frame: CoordinateFrame) -> Option<&mut Velocity> {
        self.sections
            .iter_mut()
            .filter_map(|s| s.body.as_velocity_mut())
            .find(|(f, _)| *f == frame)
            .map(|(_, v)| v)
    }

    pub fn earth_velocity(&self) -> Option<&Velocity> {
        self.velocity(CoordinateFrame::Earth)
    }

    pub fn ensemble_data(&self) -> Option<&EnsembleData> {
        self.sections.iter().find_map(|s| match &s.body {
            SectionBody::EnsembleData(d) => Some(d),
            _ => None,
        })
    }

    pub fn ancillary(&self) -> Option<&Ancillary> {
        self.sections.iter().find_map(|s| match &s.body {
            SectionBody::Ancillary(a) => Some(a),
            _ => None,
        })
    }

    pub fn bottom_track(&self) -> Option<&BottomTrack> {
        self.sections.iter().find_map(|s| match &s.body {
            SectionBody::BottomTrack(b) => Some(b),
            _ => None,
        })
    }

    pub fn nmea(&self) -> Option<&NmeaRecord> {
        self.sections.iter().find_map(|s| match &s.body {
            SectionBody::Nmea(r) => Some(r),
            _ => None,
        })
    }

    /// Ensemble number from the ensemble data section.
    pub fn number(&self) -> Option<i32> {
        self.ensemble_data()?.ensemble_number()
    }

    // -----------------------------------------------------------------------
    // Derived data
    // -----------------------------------------------------------------------

    /// Usability of `bin` in the velocity section of `frame`, or `None`
    /// when the ensemble has no such section.
    ///
    /// # Panics
    /// If `bin` is outside the velocity matrix.
    pub fn is_bin_usable(&self, frame: CoordinateFrame, bin: usize, config: &ScreenConfig) -> Option<bool> {
        let v = self.velocity(frame)?;
        Some(validity::is_bin_usable(&v.matrix, bin, config))
    }

    /// Derive velocity vectors from earth velocity and bottom-track platform
    /// velocity, storing them on the earth velocity section.
    ///
    /// Returns `None` without an earth velocity section of at least three
    /// channels.
    pub fn compute_velocity_vectors(&mut self, config: &ScreenConfig) -> Option<&[VelocityVector]> {
        let platform = self.bottom_track().and_then(BottomTrack::platform_velocity);
        let earth = self.velocity_mut(CoordinateFrame::Earth)?;
        earth.vectors = motion::derive_vectors(&earth.matrix, platform, config);
        earth.vectors.as_deref()
    }

    /// Feed NMEA bytes into this ensemble's NMEA section, creating it if
    /// needed. Returns the number of sentences accepted.
    pub fn merge_nmea(&mut self, data: &[u8]) -> usize {
        let idx = match self
            .sections
            .iter()
            .position(|s| matches!(s.body, SectionBody::Nmea(_)))
        {
            Some(idx) => idx,
            None => {
                self.sections
                    .push(Section::new(SectionBody::Nmea(NmeaRecord::new())));
                self.sections.len() - 1
            }
        };
        match &mut self.sections[idx].body {
            SectionBody::Nmea(record) => record.merge_incoming(data),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BAD_VELOCITY;
    use crate::matrix::Matrix;
    use crate::section::{BeamArray, ID_ANCILLARY, ID_EARTH_VELOCITY};

    const BAD: f32 = BAD_VELOCITY;

    fn sample() -> Ensemble {
        let mut e = Ensemble::new();
        e.insert(Section::new(SectionBody::EnsembleData(EnsembleData::new(vec![
            42, 2, 4, 10, 10, 0, 2024, 5, 1, 12, 0, 0, 0,
        ]))));
        e.insert(Section::new(SectionBody::velocity(
            CoordinateFrame::Earth,
            Matrix::from_rows(&[vec![1.0, 0.0, 0.0, 0.0], vec![BAD, 0.5, 0.0, 0.0]]),
        )));
        e.insert(Section::new(SectionBody::Ancillary(Ancillary::new(vec![
            1.0, 0.5, 0.0, 1.0, 90.0,
        ]))));
        e
    }

    fn with_platform(e: &mut Ensemble, platform: [f32; 4]) {
        let mut bt = BottomTrack::with_beams(4);
        bt.beam_array_mut(BeamArray::EarthVelocity)
            .unwrap()
            .copy_from_slice(&platform);
        e.insert(Section::new(SectionBody::BottomTrack(bt)));
    }

    #[test]
    fn payload_round_trip() {
        let e = sample();
        let payload = e.encode();
        let back = Ensemble::decode(&payload).unwrap();
        assert_eq!(back, e);
        assert_eq!(back.encode(), payload);
    }

    #[test]
    fn wire_round_trip() {
        let e = sample();
        let raw = e.to_raw();
        assert_eq!(raw.number, 42);
        let back = Ensemble::parse(&raw.encode()).unwrap();
        assert_eq!(back.number(), Some(42));
        assert_eq!(back.ancillary().unwrap().heading(), Some(90.0));
    }

    #[test]
    fn truncated_payload_keeps_decoded_sections() {
        let payload = sample().encode();
        let back = Ensemble::decode(&payload[..payload.len() - 4]).unwrap();
        assert_eq!(back.sections.len(), 2);
        assert!(back.earth_velocity().is_some());
        assert!(back.section(ID_ANCILLARY).is_none());
    }

    #[test]
    fn unknown_value_type_is_an_error() {
        let mut payload = sample().encode();
        payload[0] = 99;
        assert!(matches!(
            Ensemble::decode(&payload),
            Err(DecodeError::UnknownValueType { code: 99, .. })
        ));
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut e = sample();
        e.insert(Section::new(SectionBody::velocity(
            CoordinateFrame::Earth,
            Matrix::new(1, 4, 0.0),
        )));
        assert_eq!(e.sections.len(), 3);
        assert_eq!(e.sections[1].name(), ID_EARTH_VELOCITY);
        assert_eq!(e.earth_velocity().unwrap().matrix.num_bins(), 1);
    }

    #[test]
    fn bin_usability_by_frame() {
        let e = sample();
        let config = ScreenConfig::new();
        assert_eq!(e.is_bin_usable(CoordinateFrame::Earth, 0, &config), Some(true));
        assert_eq!(e.is_bin_usable(CoordinateFrame::Earth, 1, &config), Some(false));
        assert_eq!(e.is_bin_usable(CoordinateFrame::Beam, 0, &config), None);
    }

    #[test]
    fn vectors_remove_platform_motion() {
        let mut e = sample();
        with_platform(&mut e, [-1.0, 1.0, 0.0, 0.0]);

        let vectors = e.compute_velocity_vectors(&ScreenConfig::new()).unwrap();
        assert_eq!(vectors.len(), 2);
        assert!((vectors[0].magnitude - 1.0).abs() < 1e-9);
        assert!(vectors[0].direction_x_north.abs() < 1e-9);
        assert!((vectors[0].direction_y_north - 90.0).abs() < 1e-9);
        assert!(vectors[1].is_bad(BAD));

        // Stored on the earth velocity section
        let stored = e.earth_velocity().unwrap().vectors.as_ref().unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn vectors_without_motion_removal() {
        let mut e = sample();
        with_platform(&mut e, [-1.0, 1.0, 0.0, 0.0]);

        let config = ScreenConfig::new().with_platform_motion_removal(false);
        let vectors = e.compute_velocity_vectors(&config).unwrap();
        // Raw water velocity: due east
        assert!((vectors[0].magnitude - 1.0).abs() < 1e-9);
        assert!((vectors[0].direction_x_north - 90.0).abs() < 1e-9);
    }

    #[test]
    fn corrupt_bottom_track_beam_count_uses_raw_water() {
        let mut bt = BottomTrack::with_beams(4);
        bt.values[BottomTrack::NUM_BEAMS] = 1.0e30;
        let mut e = sample();
        e.insert(Section::new(SectionBody::BottomTrack(bt)));

        let mut back = Ensemble::decode(&e.encode()).unwrap();
        let vectors = back.compute_velocity_vectors(&ScreenConfig::new()).unwrap();
        assert!((vectors[0].magnitude - 1.0).abs() < 1e-9);
        assert!((vectors[0].direction_x_north - 90.0).abs() < 1e-9);
    }

    #[test]
    fn vectors_need_earth_velocity() {
        let mut e = Ensemble::new();
        assert!(e.compute_velocity_vectors(&ScreenConfig::new()).is_none());
    }

    #[test]
    fn vectors_not_encoded() {
        let mut e = sample();
        let before = e.encode();
        e.compute_velocity_vectors(&ScreenConfig::new());
        assert_eq!(e.encode(), before);
    }

    #[test]
    fn nmea_merged_across_reads() {
        let mut e = sample();
        assert_eq!(e.merge_nmea(b"$GPHDT,45."), 0);
        assert_eq!(e.merge_nmea(b"0,T*04\r\n"), 1);
        assert_eq!(e.sections.len(), 4);
        assert_eq!(e.nmea().unwrap().hdt().unwrap().heading, Some(45.0));

        let back = Ensemble::decode(&e.encode()).unwrap();
        assert_eq!(back.nmea().unwrap().raw_sentences(), ["$GPHDT,45.0,T*04"]);
    }

    #[test]
    fn legacy_frame_lands_in_its_coordinate_section() {
        let frame = LegacyFrame {
            velocities: Some(Matrix::from_rows(&[vec![1000.0, -32768.0, 0.0, 0.0]])),
            correlation: None,
            num_code_repeats: 1.0,
            coordinate: CoordinateFrame::Earth,
        };
        let e = Ensemble::from_legacy(&frame, &ScreenConfig::new());
        let v = e.earth_velocity().unwrap();
        assert_eq!(v.matrix.bin(0), vec![1.0, BAD, 0.0, 0.0]);
        assert_eq!(
            e.is_bin_usable(CoordinateFrame::Earth, 0, &ScreenConfig::new()),
            Some(false)
        );
    }
}
