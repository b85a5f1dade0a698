//! Per-bin usability of velocity matrices.
//!
//! One rule covers beam, instrument, earth and ship frames: channels 0-2
//! are the primary channels (beams 0-2, X/Y/Z, East/North/Vertical) and
//! channel 3 is the error/vertical channel that decides 3-beam solutions.
//! A channel beyond the matrix's declared beam count never disqualifies.

use crate::config::ScreenConfig;
use crate::matrix::Matrix;

/// Primary channels whose bad values always make a bin unusable.
pub const PRIMARY_CHANNELS: [usize; 3] = [0, 1, 2];

/// Error/vertical channel; bad here means a 3-beam solution.
pub const ERROR_CHANNEL: usize = 3;

/// Whether `bin` of `velocity` holds a usable solution.
///
/// # Panics
/// If `bin` is outside the matrix.
pub fn is_bin_usable(velocity: &Matrix<f32>, bin: usize, config: &ScreenConfig) -> bool {
    let beams = velocity.num_beams();

    if !config.allow_3_beam_solution
        && beams > ERROR_CHANNEL
        && config.is_bad(velocity.get(bin, ERROR_CHANNEL))
    {
        return false;
    }

    PRIMARY_CHANNELS
        .iter()
        .all(|&ch| beams <= ch || !config.is_bad(velocity.get(bin, ch)))
}

/// Whether `bin` is a 3-beam solution: primaries good, error channel bad.
pub fn is_3_beam_solution(velocity: &Matrix<f32>, bin: usize, config: &ScreenConfig) -> bool {
    velocity.num_beams() > ERROR_CHANNEL
        && config.is_bad(velocity.get(bin, ERROR_CHANNEL))
        && is_bin_usable(velocity, bin, &config.with_3_beam_solution(true))
}

/// Number of usable bins.
pub fn usable_bins(velocity: &Matrix<f32>, config: &ScreenConfig) -> usize {
    (0..velocity.num_bins())
        .filter(|&bin| is_bin_usable(velocity, bin, config))
        .count()
}
