//! Non-binned sections: flat scalar arrays with named positions.
//!
//! Values are kept exactly as decoded, including trailing elements newer
//! firmware appends, so an unmodified section re-encodes byte for byte.
//! Accessors return `None` for positions a short section doesn't carry.

use std::ops::Range;

/// Generate `Option` accessors for fixed positions in `self.values`.
macro_rules! accessors {
    ($t:ty; $($(#[$doc:meta])* $name:ident = $idx:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&self) -> Option<$t> {
                self.values.get($idx).copied()
            }
        )*
    };
}

// ---------------------------------------------------------------------------
// E000008: ENSEMBLE_DATA (Int32)
// ---------------------------------------------------------------------------

/// Ensemble bookkeeping: number, dimensions, ping counts, timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EnsembleData {
    pub values: Vec<i32>,
}

impl EnsembleData {
    pub const ENSEMBLE_NUMBER: usize = 0;
    pub const NUM_BINS: usize = 1;
    pub const NUM_BEAMS: usize = 2;
    pub const DESIRED_PINGS: usize = 3;
    pub const ACTUAL_PINGS: usize = 4;
    pub const STATUS: usize = 5;
    pub const YEAR: usize = 6;
    pub const MONTH: usize = 7;
    pub const DAY: usize = 8;
    pub const HOUR: usize = 9;
    pub const MINUTE: usize = 10;
    pub const SECOND: usize = 11;
    pub const HUNDREDTHS: usize = 12;

    pub fn new(values: Vec<i32>) -> Self {
        Self { values }
    }

    accessors! { i32;
        ensemble_number = Self::ENSEMBLE_NUMBER;
        num_bins = Self::NUM_BINS;
        num_beams = Self::NUM_BEAMS;
        desired_pings = Self::DESIRED_PINGS;
        actual_pings = Self::ACTUAL_PINGS;
        /// Instrument status bits
        status = Self::STATUS;
        year = Self::YEAR;
        month = Self::MONTH;
        day = Self::DAY;
        hour = Self::HOUR;
        minute = Self::MINUTE;
        second = Self::SECOND;
        hundredths = Self::HUNDREDTHS;
    }
}

// ---------------------------------------------------------------------------
// E000009: ANCILLARY (Float32)
// ---------------------------------------------------------------------------

/// Profile geometry and platform sensors.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Ancillary {
    pub values: Vec<f32>,
}

impl Ancillary {
    pub const FIRST_BIN_RANGE: usize = 0;
    pub const BIN_SIZE: usize = 1;
    pub const FIRST_PING_TIME: usize = 2;
    pub const LAST_PING_TIME: usize = 3;
    pub const HEADING: usize = 4;
    pub const PITCH: usize = 5;
    pub const ROLL: usize = 6;
    pub const WATER_TEMP: usize = 7;
    pub const SYSTEM_TEMP: usize = 8;
    pub const SALINITY: usize = 9;
    pub const PRESSURE: usize = 10;
    pub const TRANSDUCER_DEPTH: usize = 11;
    pub const SPEED_OF_SOUND: usize = 12;

    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    accessors! { f32;
        /// Range to the center of the first bin (m)
        first_bin_range = Self::FIRST_BIN_RANGE;
        /// Bin size (m)
        bin_size = Self::BIN_SIZE;
        /// First ping time (s)
        first_ping_time = Self::FIRST_PING_TIME;
        /// Last ping time (s)
        last_ping_time = Self::LAST_PING_TIME;
        /// Heading (deg)
        heading = Self::HEADING;
        /// Pitch (deg)
        pitch = Self::PITCH;
        /// Roll (deg)
        roll = Self::ROLL;
        /// Water temperature (deg C)
        water_temp = Self::WATER_TEMP;
        /// System temperature (deg C)
        system_temp = Self::SYSTEM_TEMP;
        /// Salinity (ppt)
        salinity = Self::SALINITY;
        /// Pressure (Pa)
        pressure = Self::PRESSURE;
        /// Transducer depth (m)
        transducer_depth = Self::TRANSDUCER_DEPTH;
        /// Speed of sound (m/s)
        speed_of_sound = Self::SPEED_OF_SOUND;
    }
}

// ---------------------------------------------------------------------------
// E000010: BOTTOM_TRACK (Float32)
// ---------------------------------------------------------------------------

/// Per-beam arrays of a bottom-track section, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamArray {
    Range = 0,
    Snr,
    Amplitude,
    Correlation,
    BeamVelocity,
    BeamGood,
    InstrumentVelocity,
    InstrumentGood,
    EarthVelocity,
    EarthGood,
}

/// Bottom-track ping: platform sensors followed by per-beam arrays whose
/// length is the section's own beam-count field.
///
/// Earth velocity here is the negative of platform motion.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BottomTrack {
    pub values: Vec<f32>,
}

impl BottomTrack {
    pub const FIRST_PING_TIME: usize = 0;
    pub const LAST_PING_TIME: usize = 1;
    pub const HEADING: usize = 2;
    pub const PITCH: usize = 3;
    pub const ROLL: usize = 4;
    pub const WATER_TEMP: usize = 5;
    pub const SYSTEM_TEMP: usize = 6;
    pub const SALINITY: usize = 7;
    pub const PRESSURE: usize = 8;
    pub const TRANSDUCER_DEPTH: usize = 9;
    pub const SPEED_OF_SOUND: usize = 10;
    pub const STATUS: usize = 11;
    pub const NUM_BEAMS: usize = 12;
    pub const ACTUAL_PING_COUNT: usize = 13;
    /// First element of the per-beam arrays.
    pub const ARRAYS: usize = 14;

    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    accessors! { f32;
        first_ping_time = Self::FIRST_PING_TIME;
        last_ping_time = Self::LAST_PING_TIME;
        heading = Self::HEADING;
        pitch = Self::PITCH;
        roll = Self::ROLL;
        water_temp = Self::WATER_TEMP;
        system_temp = Self::SYSTEM_TEMP;
        salinity = Self::SALINITY;
        pressure = Self::PRESSURE;
        transducer_depth = Self::TRANSDUCER_DEPTH;
        speed_of_sound = Self::SPEED_OF_SOUND;
        status = Self::STATUS;
        actual_ping_count = Self::ACTUAL_PING_COUNT;
    }

    /// Beam count declared inside the section (0 if absent or nonsensical).
    pub fn num_beams(&self) -> usize {
        match self.values.get(Self::NUM_BEAMS) {
            Some(&n) if n.is_finite() && n >= 0.0 => n as usize,
            _ => 0,
        }
    }

    /// One per-beam array, or `None` if the section is too short to hold it.
    pub fn beam_array(&self, array: BeamArray) -> Option<&[f32]> {
        self.values.get(self.array_range(array)?)
    }

    /// Earth velocity per channel (m/s).
    pub fn earth_velocity(&self) -> Option<&[f32]> {
        self.beam_array(BeamArray::EarthVelocity)
    }

    /// East/North/Vertical platform velocity for motion removal.
    pub fn platform_velocity(&self) -> Option<[f32; 3]> {
        match self.earth_velocity()? {
            [e, n, v, ..] => Some([*e, *n, *v]),
            _ => None,
        }
    }

    /// Build a section for `num_beams` beams with every array zeroed.
    pub fn with_beams(num_beams: usize) -> Self {
        let mut values = vec![0.0; Self::ARRAYS + 10 * num_beams];
        values[Self::NUM_BEAMS] = num_beams as f32;
        Self { values }
    }

    /// Mutable view of one per-beam array.
    pub fn beam_array_mut(&mut self, array: BeamArray) -> Option<&mut [f32]> {
        let range = self.array_range(array)?;
        self.values.get_mut(range)
    }

    /// Element range of one per-beam array. `None` when a corrupt beam
    /// count puts it beyond any addressable position.
    fn array_range(&self, array: BeamArray) -> Option<Range<usize>> {
        let beams = self.num_beams();
        let start = (array as usize)
            .checked_mul(beams)?
            .checked_add(Self::ARRAYS)?;
        Some(start..start.checked_add(beams)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensemble_data_accessors() {
        let e = EnsembleData::new(vec![7, 30, 4, 10, 9, 0, 2024, 3, 14, 15, 9, 26, 53]);
        assert_eq!(e.ensemble_number(), Some(7));
        assert_eq!(e.num_bins(), Some(30));
        assert_eq!(e.num_beams(), Some(4));
        assert_eq!(e.actual_pings(), Some(9));
        assert_eq!(e.year(), Some(2024));
        assert_eq!(e.hundredths(), Some(53));
    }

    #[test]
    fn short_section_accessors_are_none() {
        let a = Ancillary::new(vec![1.5, 0.5, 0.0, 1.0, 270.0]);
        assert_eq!(a.heading(), Some(270.0));
        assert_eq!(a.pitch(), None);
        assert_eq!(a.speed_of_sound(), None);
    }

    #[test]
    fn bottom_track_arrays_follow_beam_count() {
        let mut bt = BottomTrack::with_beams(4);
        bt.beam_array_mut(BeamArray::EarthVelocity)
            .unwrap()
            .copy_from_slice(&[-0.5, 0.25, 0.0, 0.01]);
        assert_eq!(bt.values.len(), 14 + 40);
        assert_eq!(bt.values[14 + 8 * 4], -0.5);
        assert_eq!(bt.platform_velocity(), Some([-0.5, 0.25, 0.0]));

        // A 3-beam section moves every array
        let bt3 = BottomTrack::with_beams(3);
        assert_eq!(bt3.values.len(), 14 + 30);
        assert_eq!(bt3.earth_velocity().unwrap().len(), 3);
    }

    #[test]
    fn bottom_track_truncated() {
        let mut bt = BottomTrack::with_beams(4);
        bt.values.truncate(14 + 8 * 4 + 2);
        assert!(bt.earth_velocity().is_none());
        assert!(bt.platform_velocity().is_none());
        assert!(bt.beam_array(BeamArray::Range).is_some());
    }

    #[test]
    fn bottom_track_single_beam_has_no_platform_velocity() {
        let bt = BottomTrack::with_beams(1);
        assert_eq!(bt.earth_velocity().unwrap().len(), 1);
        assert!(bt.platform_velocity().is_none());
    }

    #[test]
    fn huge_beam_count_is_absent_not_a_panic() {
        let mut bt = BottomTrack::with_beams(4);
        bt.values[BottomTrack::NUM_BEAMS] = 1.0e30;
        assert_eq!(bt.num_beams(), usize::MAX);
        assert!(bt.beam_array(BeamArray::Range).is_none());
        assert!(bt.earth_velocity().is_none());
        assert!(bt.platform_velocity().is_none());
        assert!(bt.beam_array_mut(BeamArray::EarthGood).is_none());
    }

    #[test]
    fn nonsense_beam_count() {
        let mut bt = BottomTrack::with_beams(4);
        bt.values[BottomTrack::NUM_BEAMS] = f32::NAN;
        assert_eq!(bt.num_beams(), 0);
    }
}
