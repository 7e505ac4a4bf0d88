//! Panel meter
//!
//! A rounded-rectangle surface that can contain other meters. When meters
//! declare `Container=<panel>`, the skin renders them into an offscreen
//! content bitmap and composites it through this panel's opacity, so the
//! panel's rounded corners clip whatever is nested inside.

use lamina_core::ConfigSource;
use tiny_skia::{Color, PathBuilder};

use crate::canvas::Canvas;
use crate::measure::MeasureValues;
use crate::meter::{Meter, MeterBase};

pub struct PanelMeter {
    base: MeterBase,
    color: [u8; 4],
    border_color: [u8; 4],
    border_width: f32,
    radius: f32,
}

pub fn create(name: &str) -> Box<dyn Meter> {
    let mut base = MeterBase::new(name);
    base.w = 100;
    base.h = 100;
    Box::new(PanelMeter {
        base,
        color: [30, 30, 30, 255],
        border_color: [0, 0, 0, 0],
        border_width: 1.0,
        radius: 0.0,
    })
}

fn rounded_rect_path(x: f32, y: f32, w: f32, h: f32, r: f32) -> Option<tiny_skia::Path> {
    let r = r.min(w / 2.0).min(h / 2.0).max(0.0);
    let mut pb = PathBuilder::new();
    if r <= 0.0 {
        pb.push_rect(tiny_skia::Rect::from_xywh(x, y, w, h)?);
        return pb.finish();
    }
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}

impl Meter for PanelMeter {
    fn base(&self) -> &MeterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MeterBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "Panel"
    }

    fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.base.read_common_options(config, section);
        self.color = config.read_color(section, "SolidColor", [30, 30, 30, 255]);
        self.border_color = config.read_color(section, "BorderColor", [0, 0, 0, 0]);
        self.border_width = config.read_float(section, "BorderWidth", 1.0) as f32;
        self.radius = config.read_float(section, "Round", 0.0) as f32;
    }

    fn update(&mut self, _values: &MeasureValues, _canvas: &mut Canvas) -> bool {
        false
    }

    fn draw(&mut self, canvas: &mut Canvas) {
        if self.base.hidden {
            return;
        }
        let Some(path) = rounded_rect_path(
            self.base.abs_x as f32,
            self.base.abs_y as f32,
            self.base.w as f32,
            self.base.h as f32,
            self.radius,
        ) else {
            return;
        };

        let fill = Color::from_rgba8(self.color[0], self.color[1], self.color[2], self.color[3]);
        let stroke = (self.border_color[3] != 0).then(|| {
            (
                Color::from_rgba8(
                    self.border_color[0],
                    self.border_color[1],
                    self.border_color[2],
                    self.border_color[3],
                ),
                self.border_width,
            )
        });
        canvas.draw_path(&path, Some(fill), stroke, 0.0, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_rect_radius_clamped() {
        // Radius larger than half the size must still produce a closed path.
        assert!(rounded_rect_path(0.0, 0.0, 10.0, 10.0, 50.0).is_some());
        assert!(rounded_rect_path(0.0, 0.0, 10.0, 10.0, 0.0).is_some());
    }
}
