use std::fmt;

use serde::Deserialize;

/// Which end of the luminance range the wipe reveals first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    DarkToBright,
    BrightToDark,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Self::DarkToBright => Self::BrightToDark,
            Self::BrightToDark => Self::DarkToBright,
        }
    }

    /// Sign applied to the automatic threshold sweep.
    pub fn sweep_sign(self) -> f32 {
        match self {
            Self::DarkToBright => 1.0,
            Self::BrightToDark => -1.0,
        }
    }

    pub fn inverts_luma(self) -> bool {
        matches!(self, Self::BrightToDark)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DarkToBright => "dark-to-bright",
            Self::BrightToDark => "bright-to-dark",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive bounds for a scalar wipe parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

pub const THRESHOLD_BOUNDS: Bounds = Bounds::new(0.0, 1.0);
pub const FEATHER_BOUNDS: Bounds = Bounds::new(0.0, 0.2);
pub const SPEED_BOUNDS: Bounds = Bounds::new(0.0, 1.5);
pub const NOISE_STRENGTH_BOUNDS: Bounds = Bounds::new(0.0, 0.35);
pub const NOISE_SCALE_BOUNDS: Bounds = Bounds::new(0.5, 8.0);

/// The single mutable record shared by the panel, the frame scheduler and the
/// compositor. Collaborators borrow it; nothing keeps a copy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WipeParams {
    /// Luminance cutoff around which the wipe occurs.
    pub threshold: f32,
    /// Half-width of the smooth band around `threshold`.
    pub feather: f32,
    /// Units per second the threshold advances while running.
    pub speed: f32,
    pub direction: Direction,
    /// Amplitude of the noise added to the mask signal.
    pub noise_strength: f32,
    /// Spatial frequency of the noise field.
    pub noise_scale: f32,
    /// Seconds of unpaused animation; drives the noise phase.
    #[serde(skip)]
    pub time: f32,
    pub paused: bool,
}

impl WipeParams {
    const fn default_threshold() -> f32 {
        0.0
    }

    const fn default_feather() -> f32 {
        0.06
    }

    const fn default_speed() -> f32 {
        0.18
    }

    const fn default_noise_strength() -> f32 {
        0.0
    }

    const fn default_noise_scale() -> f32 {
        2.5
    }

    /// Advance the sweep by `dt` seconds.
    ///
    /// Paused parameters are left untouched. The threshold wraps around the
    /// unit interval instead of stopping at either end so the wipe repeats.
    pub fn advance(&mut self, dt: f32) {
        if self.paused {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.time += dt;
        self.threshold = wrap_unit(self.threshold + dt * self.speed * self.direction.sweep_sign());
    }

    /// Restart the wipe from the beginning; every other setting is kept.
    pub fn reset(&mut self) {
        self.threshold = 0.0;
        self.time = 0.0;
    }

    /// Copy with every scalar pulled back inside its panel bounds.
    pub fn clamped(&self) -> Self {
        Self {
            threshold: THRESHOLD_BOUNDS.clamp(self.threshold),
            feather: FEATHER_BOUNDS.clamp(self.feather),
            speed: SPEED_BOUNDS.clamp(self.speed),
            direction: self.direction,
            noise_strength: NOISE_STRENGTH_BOUNDS.clamp(self.noise_strength),
            noise_scale: NOISE_SCALE_BOUNDS.clamp(self.noise_scale),
            time: if self.time.is_finite() {
                self.time.max(0.0)
            } else {
                0.0
            },
            paused: self.paused,
        }
    }
}

impl Default for WipeParams {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
            feather: Self::default_feather(),
            speed: Self::default_speed(),
            direction: Direction::default(),
            noise_strength: Self::default_noise_strength(),
            noise_scale: Self::default_noise_scale(),
            time: 0.0,
            paused: false,
        }
    }
}

/// Fold `value` back into [0, 1]. Values already inside, including both
/// endpoints, are returned as-is.
pub fn wrap_unit(value: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    if (0.0..=1.0).contains(&value) {
        return value;
    }
    value.rem_euclid(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn threshold_wraps_past_one() {
        let mut params = WipeParams {
            threshold: 0.95,
            speed: 1.0,
            ..WipeParams::default()
        };
        params.advance(0.1);
        assert!(approx(params.threshold, 0.05), "got {}", params.threshold);
        assert!(approx(params.time, 0.1));
    }

    #[test]
    fn threshold_wraps_below_zero_when_sweeping_down() {
        let mut params = WipeParams {
            threshold: 0.02,
            speed: 0.5,
            direction: Direction::BrightToDark,
            ..WipeParams::default()
        };
        params.advance(0.1);
        assert!(approx(params.threshold, 0.97), "got {}", params.threshold);
    }

    #[test]
    fn paused_ticks_change_nothing() {
        let mut params = WipeParams {
            threshold: 0.4,
            time: 3.0,
            paused: true,
            ..WipeParams::default()
        };
        for dt in [0.016, 1.0, 250.0] {
            params.advance(dt);
        }
        assert_eq!(params.threshold, 0.4);
        assert_eq!(params.time, 3.0);
    }

    #[test]
    fn negative_or_nan_dt_is_ignored() {
        let mut params = WipeParams {
            threshold: 0.3,
            speed: 1.0,
            time: 2.0,
            ..WipeParams::default()
        };
        params.advance(-1.0);
        params.advance(f32::NAN);
        assert_eq!(params.time, 2.0);
        assert_eq!(params.threshold, 0.3);
    }

    #[test]
    fn reset_only_touches_threshold_and_time() {
        let mut params = WipeParams {
            threshold: 0.7,
            feather: 0.12,
            speed: 0.9,
            direction: Direction::BrightToDark,
            noise_strength: 0.2,
            noise_scale: 4.0,
            time: 12.5,
            paused: true,
        };
        params.reset();
        assert_eq!(params.threshold, 0.0);
        assert_eq!(params.time, 0.0);
        assert_eq!(params.feather, 0.12);
        assert_eq!(params.speed, 0.9);
        assert_eq!(params.direction, Direction::BrightToDark);
        assert_eq!(params.noise_strength, 0.2);
        assert_eq!(params.noise_scale, 4.0);
        assert!(params.paused);
    }

    #[test]
    fn wrap_keeps_endpoints() {
        assert_eq!(wrap_unit(1.0), 1.0);
        assert_eq!(wrap_unit(0.0), 0.0);
        assert!(approx(wrap_unit(2.25), 0.25));
    }

    #[test]
    fn clamped_pulls_values_into_bounds() {
        let params = WipeParams {
            threshold: 1.7,
            feather: -0.1,
            speed: 9.0,
            noise_strength: 1.0,
            noise_scale: 0.0,
            ..WipeParams::default()
        }
        .clamped();
        assert_eq!(params.threshold, 1.0);
        assert_eq!(params.feather, 0.0);
        assert_eq!(params.speed, 1.5);
        assert_eq!(params.noise_strength, 0.35);
        assert_eq!(params.noise_scale, 0.5);
    }
}
