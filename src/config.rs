//! Screening configuration.
//!
//! Carries the bad-value sentinel and the 3-beam-solution policy into the
//! validity rules, the legacy translator and the relative-motion deriver.

/// Marker for "no valid measurement" in ensemble velocity cells.
pub const BAD_VELOCITY: f32 = 88.888;

/// Options for validity screening and derived quantities.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScreenConfig {
    /// Bad-value sentinel for velocity cells.
    pub bad_velocity: f32,
    /// Accept bins whose error channel is bad but whose primary channels are good.
    pub allow_3_beam_solution: bool,
    /// Remove platform (bottom-track) velocity before deriving vectors.
    pub remove_platform_motion: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            bad_velocity: BAD_VELOCITY,
            allow_3_beam_solution: true,
            remove_platform_motion: true,
        }
    }
}

impl ScreenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: override the bad-value sentinel
    pub fn with_bad_velocity(mut self, bad_velocity: f32) -> Self {
        self.bad_velocity = bad_velocity;
        self
    }

    /// Builder method: allow or reject 3-beam solutions
    pub fn with_3_beam_solution(mut self, allow: bool) -> Self {
        self.allow_3_beam_solution = allow;
        self
    }

    /// Builder method: enable or disable platform motion removal
    pub fn with_platform_motion_removal(mut self, enabled: bool) -> Self {
        self.remove_platform_motion = enabled;
        self
    }

    /// True if `value` is the configured sentinel.
    pub fn is_bad(&self, value: f32) -> bool {
        value == self.bad_velocity
    }
}
