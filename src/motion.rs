//! Water velocity magnitude and direction relative to the earth.
//!
//! Bottom-track earth velocity is the negative of platform motion, so adding
//! it to earth-frame water velocity removes the platform's own movement.

use crate::config::ScreenConfig;
use crate::matrix::Matrix;

/// Magnitude and direction of one bin's water velocity.
///
/// All three fields are the bad-value sentinel when any water channel was bad.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VelocityVector {
    /// Speed (m/s)
    pub magnitude: f64,
    /// Direction with north as the reference axis, `atan2(east, north)` (deg)
    pub direction_x_north: f64,
    /// Direction with east as the reference axis, `atan2(north, east)` (deg)
    pub direction_y_north: f64,
}

impl VelocityVector {
    /// A fully bad vector.
    pub fn bad(bad_velocity: f32) -> Self {
        let bad = f64::from(bad_velocity);
        Self {
            magnitude: bad,
            direction_x_north: bad,
            direction_y_north: bad,
        }
    }

    pub fn is_bad(&self, bad_velocity: f32) -> bool {
        self.magnitude == f64::from(bad_velocity)
    }
}

/// Derive one bin's vector from water velocity `[east, north, vertical]`.
///
/// `platform` is the bottom-track earth velocity. It is added only when all
/// three of its channels are good; otherwise the raw water velocity is used.
pub fn derive_vector(water: [f32; 3], platform: Option<[f32; 3]>, config: &ScreenConfig) -> VelocityVector {
    if water.iter().any(|&v| config.is_bad(v)) {
        return VelocityVector::bad(config.bad_velocity);
    }

    let correction = platform.filter(|p| p.iter().all(|&v| !config.is_bad(v)));
    let [east, north, vertical] = match correction {
        Some(p) => [
            f64::from(water[0]) + f64::from(p[0]),
            f64::from(water[1]) + f64::from(p[1]),
            f64::from(water[2]) + f64::from(p[2]),
        ],
        None => water.map(f64::from),
    };

    VelocityVector {
        magnitude: (east * east + north * north + vertical * vertical).sqrt(),
        direction_x_north: east.atan2(north).to_degrees(),
        direction_y_north: north.atan2(east).to_degrees(),
    }
}

/// Derive a vector for every bin of an earth-frame velocity matrix.
///
/// Returns `None` when the matrix has fewer than three channels.
pub fn derive_vectors(
    earth: &Matrix<f32>,
    platform: Option<[f32; 3]>,
    config: &ScreenConfig,
) -> Option<Vec<VelocityVector>> {
    if earth.num_beams() < 3 {
        log::debug!(
            "earth velocity has {} channels, need 3 for velocity vectors",
            earth.num_beams()
        );
        return None;
    }
    let platform = platform.filter(|_| config.remove_platform_motion);

    Some(
        (0..earth.num_bins())
            .map(|bin| {
                let water = [earth.get(bin, 0), earth.get(bin, 1), earth.get(bin, 2)];
                derive_vector(water, platform, config)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BAD_VELOCITY;

    const BAD: f32 = BAD_VELOCITY;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn platform_motion_cancels() {
        let v = derive_vector([1.0, 1.0, 1.0], Some([-1.0, -1.0, -1.0]), &ScreenConfig::new());
        assert_eq!(v.magnitude, 0.0);
        assert_eq!(v.direction_x_north, 0.0);
        assert_eq!(v.direction_y_north, 0.0);
    }

    #[test]
    fn bad_water_channel_is_fully_bad() {
        for ch in 0..3 {
            let mut water = [0.5, 0.5, 0.5];
            water[ch] = BAD;
            for platform in [None, Some([0.1, 0.1, 0.1]), Some([BAD, 0.0, 0.0])] {
                let v = derive_vector(water, platform, &ScreenConfig::new());
                assert_eq!(v, VelocityVector::bad(BAD));
                assert!(v.is_bad(BAD));
            }
        }
    }

    #[test]
    fn bad_platform_uses_raw_water() {
        let v = derive_vector([3.0, 4.0, 0.0], Some([BAD, -1.0, -1.0]), &ScreenConfig::new());
        assert!(close(v.magnitude, 5.0));
    }

    #[test]
    fn directions() {
        let c = ScreenConfig::new();

        // Due north
        let v = derive_vector([0.0, 1.0, 0.0], None, &c);
        assert!(close(v.direction_x_north, 0.0));
        assert!(close(v.direction_y_north, 90.0));

        // Due east
        let v = derive_vector([1.0, 0.0, 0.0], None, &c);
        assert!(close(v.direction_x_north, 90.0));
        assert!(close(v.direction_y_north, 0.0));

        // South-west
        let v = derive_vector([-1.0, -1.0, 0.0], None, &c);
        assert!(close(v.direction_x_north, -135.0));
        assert!(close(v.direction_y_north, -135.0));
        assert!(close(v.magnitude, 2f64.sqrt()));
    }

    #[test]
    fn per_bin_vectors() {
        let earth = Matrix::from_rows(&[
            vec![1.5, 0.0, 0.0, 0.0],
            vec![BAD, 0.0, 0.0, 0.0],
            vec![0.5, 1.0, 0.0, BAD],
        ]);
        let v = derive_vectors(&earth, Some([-0.5, 0.0, 0.0]), &ScreenConfig::new()).unwrap();
        assert_eq!(v.len(), 3);
        assert!(close(v[0].magnitude, 1.0));
        assert!(v[1].is_bad(BAD));
        // Error channel does not feed the vector
        assert!(close(v[2].magnitude, 1.0));
        assert!(close(v[2].direction_x_north, 0.0));
    }

    #[test]
    fn platform_removal_disabled() {
        let earth = Matrix::from_rows(&[vec![1.0, 0.0, 0.0, 0.0]]);
        let c = ScreenConfig::new().with_platform_motion_removal(false);
        let v = derive_vectors(&earth, Some([-1.0, 0.0, 0.0]), &c).unwrap();
        assert!(close(v[0].magnitude, 1.0));
    }

    #[test]
    fn needs_three_channels() {
        let earth = Matrix::from_rows(&[vec![1.0, 0.0]]);
        assert!(derive_vectors(&earth, None, &ScreenConfig::new()).is_none());
    }
}
