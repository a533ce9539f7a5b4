//! Live-tweak controls over [`WipeParams`].
//!
//! Every edit goes through [`Panel::apply`], which keeps values on the
//! control's step grid and inside its bounds.

use std::fmt;

use crate::params::{
    Bounds, FEATHER_BOUNDS, NOISE_SCALE_BOUNDS, NOISE_STRENGTH_BOUNDS, SPEED_BOUNDS,
    THRESHOLD_BOUNDS, WipeParams,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Threshold,
    Feather,
    Speed,
    NoiseStrength,
    NoiseScale,
}

impl Control {
    pub const ALL: &'static [Self] = &[
        Self::Threshold,
        Self::Feather,
        Self::Speed,
        Self::NoiseStrength,
        Self::NoiseScale,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Feather => "feather",
            Self::Speed => "speed",
            Self::NoiseStrength => "noise-strength",
            Self::NoiseScale => "noise-scale",
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Self::Threshold => THRESHOLD_BOUNDS,
            Self::Feather => FEATHER_BOUNDS,
            Self::Speed => SPEED_BOUNDS,
            Self::NoiseStrength => NOISE_STRENGTH_BOUNDS,
            Self::NoiseScale => NOISE_SCALE_BOUNDS,
        }
    }

    pub fn step(&self) -> f32 {
        match self {
            Self::Threshold | Self::Feather | Self::NoiseStrength => 0.001,
            Self::Speed | Self::NoiseScale => 0.01,
        }
    }

    pub fn get(&self, params: &WipeParams) -> f32 {
        match self {
            Self::Threshold => params.threshold,
            Self::Feather => params.feather,
            Self::Speed => params.speed,
            Self::NoiseStrength => params.noise_strength,
            Self::NoiseScale => params.noise_scale,
        }
    }

    fn slot<'a>(&self, params: &'a mut WipeParams) -> &'a mut f32 {
        match self {
            Self::Threshold => &mut params.threshold,
            Self::Feather => &mut params.feather,
            Self::Speed => &mut params.speed,
            Self::NoiseStrength => &mut params.noise_strength,
            Self::NoiseScale => &mut params.noise_scale,
        }
    }

    /// Snap `value` to the step grid anchored at the lower bound, then clamp.
    pub fn quantize(&self, value: f32) -> f32 {
        let bounds = self.bounds();
        let step = self.step();
        let value = bounds.clamp(value);
        let steps = ((value - bounds.min) / step).round();
        bounds.clamp(bounds.min + steps * step)
    }

    fn position(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).unwrap_or(0)
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelAction {
    NextControl,
    PreviousControl,
    /// Move the selected control by this many steps.
    Nudge(i32),
    Set(Control, f32),
    ToggleDirection,
    TogglePaused,
    /// Restart the wipe: threshold and time go back to zero.
    Reset,
}

#[derive(Debug, Clone)]
pub struct Panel {
    selected: Control,
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            selected: Control::Threshold,
        }
    }
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Control {
        self.selected
    }

    pub fn apply(&mut self, action: PanelAction, params: &mut WipeParams) {
        match action {
            PanelAction::NextControl => {
                let next = (self.selected.position() + 1) % Control::ALL.len();
                self.selected = Control::ALL[next];
            }
            PanelAction::PreviousControl => {
                let len = Control::ALL.len();
                let prev = (self.selected.position() + len - 1) % len;
                self.selected = Control::ALL[prev];
            }
            PanelAction::Nudge(steps) => {
                let control = self.selected;
                let current = control.get(params);
                let target = current + steps as f32 * control.step();
                *control.slot(params) = control.quantize(target);
            }
            PanelAction::Set(control, value) => {
                *control.slot(params) = control.quantize(value);
            }
            PanelAction::ToggleDirection => {
                params.direction = params.direction.toggled();
            }
            PanelAction::TogglePaused => {
                params.paused = !params.paused;
            }
            PanelAction::Reset => params.reset(),
        }
    }

    /// One-line summary for the window title.
    pub fn status(&self, params: &WipeParams) -> String {
        let mut line = format!(
            "[{} {:.3}] t={:.3} feather={:.3} speed={:.2} noise={:.3}x{:.2} {}",
            self.selected,
            self.selected.get(params),
            params.threshold,
            params.feather,
            params.speed,
            params.noise_strength,
            params.noise_scale,
            params.direction,
        );
        if params.paused {
            line.push_str(" (paused)");
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Direction;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn nudges_selected_control_by_step() {
        let mut panel = Panel::new();
        let mut params = WipeParams::default();
        panel.apply(PanelAction::NextControl, &mut params);
        assert_eq!(panel.selected(), Control::Feather);
        panel.apply(PanelAction::Nudge(10), &mut params);
        assert!(close(params.feather, 0.07), "{}", params.feather);
        assert!(close(params.threshold, 0.0));
    }

    #[test]
    fn clamps_to_bounds() {
        let mut panel = Panel::new();
        let mut params = WipeParams::default();
        panel.apply(PanelAction::Set(Control::Feather, 0.9), &mut params);
        assert!(close(params.feather, 0.2));
        panel.apply(PanelAction::Set(Control::NoiseScale, 0.0), &mut params);
        assert_eq!(params.noise_scale, 0.5);
        panel.apply(PanelAction::Nudge(-5000), &mut params);
        assert_eq!(params.threshold, 0.0);
    }

    #[test]
    fn snaps_to_step_grid() {
        assert!(close(Control::Speed.quantize(0.1234), 0.12));
        assert!(close(Control::NoiseScale.quantize(2.507), 2.51));
        assert!(close(Control::Threshold.quantize(0.00049), 0.0));
    }

    #[test]
    fn selection_cycles_both_ways() {
        let mut panel = Panel::new();
        let mut params = WipeParams::default();
        panel.apply(PanelAction::PreviousControl, &mut params);
        assert_eq!(panel.selected(), Control::NoiseScale);
        for _ in 0..Control::ALL.len() {
            panel.apply(PanelAction::NextControl, &mut params);
        }
        assert_eq!(panel.selected(), Control::NoiseScale);
    }

    #[test]
    fn toggles_and_reset() {
        let mut panel = Panel::new();
        let mut params = WipeParams {
            threshold: 0.6,
            time: 8.0,
            speed: 0.5,
            ..WipeParams::default()
        };
        panel.apply(PanelAction::ToggleDirection, &mut params);
        panel.apply(PanelAction::TogglePaused, &mut params);
        assert_eq!(params.direction, Direction::BrightToDark);
        assert!(params.paused);

        panel.apply(PanelAction::Reset, &mut params);
        assert_eq!(params.threshold, 0.0);
        assert_eq!(params.time, 0.0);
        assert_eq!(params.speed, 0.5);
        assert!(params.paused);
        assert!(panel.status(&params).ends_with("(paused)"));
    }
}
