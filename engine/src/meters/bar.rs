//! Bar meter
//!
//! Fills a rectangle in proportion to the bound measure's relative value.
//! With smoothing enabled the fill animates toward the target over several
//! frames, reporting an active transition while it moves.

use lamina_core::ConfigSource;
use tiny_skia::Color;

use crate::canvas::{Canvas, RectF};
use crate::measure::MeasureValues;
use crate::meter::{Meter, MeterBase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Horizontal,
    Vertical,
}

pub struct BarMeter {
    base: MeterBase,
    measure_name: String,
    bar_color: [u8; 4],
    background_color: [u8; 4],
    orientation: Orientation,
    flip: bool,
    smooth: bool,
    target: f64,
    shown: f64,
}

pub fn create(name: &str) -> Box<dyn Meter> {
    let mut base = MeterBase::new(name);
    base.w = 100;
    base.h = 20;
    Box::new(BarMeter {
        base,
        measure_name: String::new(),
        bar_color: [0, 255, 0, 255],
        background_color: [0, 0, 0, 0],
        orientation: Orientation::Vertical,
        flip: false,
        smooth: false,
        target: 0.0,
        shown: 0.0,
    })
}

impl Meter for BarMeter {
    fn base(&self) -> &MeterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MeterBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "Bar"
    }

    fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.base.read_common_options(config, section);
        self.measure_name = config.read_string(section, "MeasureName", "");
        self.bar_color = config.read_color(section, "BarColor", [0, 255, 0, 255]);
        self.background_color = config.read_color(section, "SolidColor", [0, 0, 0, 0]);
        self.orientation = match config
            .read_string(section, "BarOrientation", "Vertical")
            .to_ascii_lowercase()
            .as_str()
        {
            "horizontal" => Orientation::Horizontal,
            _ => Orientation::Vertical,
        };
        self.flip = config.read_bool(section, "Flip", false);
        self.smooth = config.read_bool(section, "Smooth", false);
    }

    fn update(&mut self, values: &MeasureValues, _canvas: &mut Canvas) -> bool {
        let value = values
            .get(&self.measure_name)
            .map(|v| v.relative())
            .unwrap_or(0.0);
        let changed = value != self.target;
        self.target = value;
        if !self.smooth {
            self.shown = value;
        }
        changed
    }

    fn draw(&mut self, canvas: &mut Canvas) {
        if self.base.hidden {
            return;
        }

        if self.smooth {
            // Step a fifth of the remaining gap per frame, snapping the tail.
            let gap = self.target - self.shown;
            if gap.abs() < 0.005 {
                self.shown = self.target;
            } else {
                self.shown += gap * 0.2;
            }
        }

        let x = self.base.abs_x as f32;
        let y = self.base.abs_y as f32;
        let w = self.base.w as f32;
        let h = self.base.h as f32;

        let bg = self.background_color;
        if bg[3] != 0 {
            canvas.fill_rectangle(
                RectF::new(x, y, w, h),
                Color::from_rgba8(bg[0], bg[1], bg[2], bg[3]),
            );
        }

        let fraction = self.shown.clamp(0.0, 1.0) as f32;
        let bar = match (self.orientation, self.flip) {
            (Orientation::Horizontal, false) => RectF::new(x, y, w * fraction, h),
            (Orientation::Horizontal, true) => {
                RectF::new(x + w * (1.0 - fraction), y, w * fraction, h)
            }
            (Orientation::Vertical, false) => {
                RectF::new(x, y + h * (1.0 - fraction), w, h * fraction)
            }
            (Orientation::Vertical, true) => RectF::new(x, y, w, h * fraction),
        };
        let c = self.bar_color;
        canvas.fill_rectangle(bar, Color::from_rgba8(c[0], c[1], c[2], c[3]));
    }

    fn has_active_transition(&self) -> bool {
        self.smooth && self.shown != self.target
    }
}
