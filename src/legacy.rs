//! Translation of PD0 velocity and correlation into normalized matrices.
//!
//! PD0 numbers its beams differently, reports velocity in mm/s with its own
//! bad-value marker, and reports correlation as 8-bit counts. The beam maps
//! below are protocol constants:
//!
//! | target | beam frame | instrument frame | earth / ship |
//! |--------|------------|------------------|--------------|
//! | 0      | slot 3     | slot 1           | slot 0       |
//! | 1      | slot 2     | slot 0           | slot 1       |
//! | 2      | slot 0     | -slot 2          | slot 2       |
//! | 3      | slot 1     | slot 3           | slot 3       |
//!
//! Correlation always uses the beam-frame map, without sign.

use crate::config::ScreenConfig;
use crate::matrix::Matrix;
use crate::section::{CoordinateFrame, Section, SectionBody};

/// PD0 marker for "no valid velocity" (mm/s).
pub const PD0_BAD_VELOCITY: f32 = -32768.0;

/// PD0 velocity units per normalized unit (mm/s per m/s).
const MM_PER_M: f32 = 1000.0;

/// Full-scale PD0 correlation count.
const CORRELATION_SCALE: f32 = 128.0;

/// `(legacy slot, sign)` for each normalized channel.
pub type BeamMap = [(usize, f32); 4];

pub const BEAM_MAP: BeamMap = [(3, 1.0), (2, 1.0), (0, 1.0), (1, 1.0)];
pub const INSTRUMENT_MAP: BeamMap = [(1, 1.0), (0, 1.0), (2, -1.0), (3, 1.0)];
pub const DIRECT_MAP: BeamMap = [(0, 1.0), (1, 1.0), (2, 1.0), (3, 1.0)];

/// Beam map for velocity in `frame`.
pub fn velocity_map(frame: CoordinateFrame) -> &'static BeamMap {
    match frame {
        CoordinateFrame::Beam => &BEAM_MAP,
        CoordinateFrame::Instrument => &INSTRUMENT_MAP,
        CoordinateFrame::Earth | CoordinateFrame::Ship => &DIRECT_MAP,
    }
}

/// Velocity and correlation of one PD0 ensemble, in PD0 order and units.
///
/// Blocks missing from the source ensemble are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyFrame {
    /// `[bin][slot]` velocity (mm/s), [`PD0_BAD_VELOCITY`] when bad
    pub velocities: Option<Matrix<f32>>,
    /// `[bin][slot]` correlation counts (0-255)
    pub correlation: Option<Matrix<u8>>,
    /// Coherent code repetitions from the fixed leader
    pub num_code_repeats: f32,
    /// Coordinate system the velocities were transformed into
    pub coordinate: CoordinateFrame,
}

impl LegacyFrame {
    /// Translate into normalized sections: the velocity section of this
    /// frame's coordinate system, then correlation.
    pub fn translate(&self, config: &ScreenConfig) -> Vec<Section> {
        let mut sections = Vec::new();
        if let Some(v) = &self.velocities {
            let m = translate_velocity(v, self.coordinate, config);
            sections.push(Section::new(SectionBody::velocity(self.coordinate, m)));
        }
        if let Some(c) = &self.correlation {
            let m = translate_correlation(c, self.num_code_repeats);
            sections.push(Section::new(SectionBody::Correlation(m)));
        }
        sections
    }
}

/// Reorder channels through `map`. Frames without exactly four slots keep
/// PD0 order.
fn remap<T: Copy, U: Copy + Default>(
    legacy: &Matrix<T>,
    map: &BeamMap,
    f: impl Fn(T, f32) -> U,
) -> Matrix<U> {
    let beams = legacy.num_beams();
    if beams != map.len() {
        log::debug!("PD0 frame has {beams} beams, keeping PD0 order");
        return legacy.map(|v| f(v, 1.0));
    }

    let mut out = Matrix::new(legacy.num_bins(), beams, U::default());
    for bin in 0..legacy.num_bins() {
        for (ch, &(slot, sign)) in map.iter().enumerate() {
            out.set(bin, ch, f(legacy.get(bin, slot), sign));
        }
    }
    out
}

/// PD0 velocity (mm/s) to normalized velocity (m/s) in `frame`.
pub fn translate_velocity(
    legacy: &Matrix<f32>,
    frame: CoordinateFrame,
    config: &ScreenConfig,
) -> Matrix<f32> {
    remap(legacy, velocity_map(frame), |v, sign| {
        if v == PD0_BAD_VELOCITY {
            config.bad_velocity
        } else {
            sign * v / MM_PER_M
        }
    })
}

/// PD0 correlation counts to normalized correlation (0.0-1.0).
///
/// `value = count / 128 * (repeats - 1) / repeats`, with zero repeats
/// treated as one and a zero factor treated as one.
pub fn translate_correlation(legacy: &Matrix<u8>, num_code_repeats: f32) -> Matrix<f32> {
    let factor = correlation_factor(num_code_repeats);
    remap(legacy, &BEAM_MAP, |count, _| {
        f32::from(count) / CORRELATION_SCALE * factor
    })
}

fn correlation_factor(num_code_repeats: f32) -> f32 {
    let repeats = if num_code_repeats == 0.0 {
        1.0
    } else {
        num_code_repeats
    };
    let n = (repeats - 1.0) / repeats;
    if n == 0.0 { 1.0 } else { n }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
