/// Viewer settings assembled from the command line
use std::time::Duration;

use meshview_core::{DisplayMode, Palette};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 3.0;
pub const SCALE_STEP: f32 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub mode: DisplayMode,
    /// Uniform scale applied to the whole scene, kept within [`MIN_SCALE`, `MAX_SCALE`]
    pub scale: f32,
    pub palette: Palette,
    /// Render vertex colors instead of the grey luminosity ramp
    pub color: bool,
    pub fps: u32,
}

impl ViewerConfig {
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = clamp_scale(scale);
        self
    }

    /// Nudge the scale by `steps` increments of [`SCALE_STEP`]
    pub fn adjust_scale(&mut self, steps: i32) {
        // Result stays a multiple of SCALE_STEP
        let snapped = ((self.scale + steps as f32 * SCALE_STEP) / SCALE_STEP).round() * SCALE_STEP;
        self.scale = clamp_scale(snapped);
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::All,
            scale: 1.0,
            palette: Palette::neon(),
            color: true,
            fps: 30,
        }
    }
}

fn clamp_scale(scale: f32) -> f32 {
    if scale.is_finite() {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        1.0
    }
}
