//! Vertical finger position to a continuous control value.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderSettings {
    pub min_value: f32,
    pub max_value: f32,
    pub initial_value: f32,
}

impl Default for SliderSettings {
    fn default() -> Self {
        Self {
            min_value: 0.3,
            max_value: 1.0,
            initial_value: 0.65,
        }
    }
}

/// Maps a y coordinate inside the frame onto `[min_value, max_value]`,
/// inverted so the top of the frame is the maximum.
#[derive(Debug, Clone)]
pub struct SliderController {
    min_value: f32,
    max_value: f32,
    value: f32,
}

impl Default for SliderController {
    fn default() -> Self {
        Self::new(SliderSettings::default())
    }
}

impl SliderController {
    pub fn new(settings: SliderSettings) -> Self {
        Self {
            min_value: settings.min_value,
            max_value: settings.max_value,
            value: settings
                .initial_value
                .clamp(settings.min_value, settings.max_value),
        }
    }

    /// Absent readings and degenerate frame heights keep the last value.
    pub fn update(&mut self, y: Option<f64>, frame_height: f64) -> f32 {
        if let Some(y) = y {
            if frame_height > 0.0 && y.is_finite() {
                let normalized = (1.0 - y / frame_height) as f32;
                let mapped = self.min_value + normalized * (self.max_value - self.min_value);
                self.value = mapped.clamp(self.min_value, self.max_value);
            }
        }
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}
