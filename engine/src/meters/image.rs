//! Image meter
//!
//! Draws a PNG file, optionally tiled. The bitmap is decoded once and
//! re-decoded only when the path changes; sources beyond the device texture
//! limit are segmented by the canvas bitmap layer.

use std::path::PathBuf;

use lamina_core::ConfigSource;

use crate::canvas::bitmap::SegmentedBitmap;
use crate::canvas::{Canvas, RectF};
use crate::measure::MeasureValues;
use crate::meter::{Meter, MeterBase};

pub struct ImageMeter {
    base: MeterBase,
    path: PathBuf,
    tile: bool,
    preserve_aspect: bool,
    bitmap: Option<SegmentedBitmap>,
    loaded_path: Option<PathBuf>,
    auto_w: bool,
    auto_h: bool,
}

pub fn create(name: &str) -> Box<dyn Meter> {
    Box::new(ImageMeter {
        base: MeterBase::new(name),
        path: PathBuf::new(),
        tile: false,
        preserve_aspect: false,
        bitmap: None,
        loaded_path: None,
        auto_w: true,
        auto_h: true,
    })
}

impl Meter for ImageMeter {
    fn base(&self) -> &MeterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MeterBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "Image"
    }

    fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.base.read_common_options(config, section);
        self.auto_w = config.read_raw(section, "W").is_none();
        self.auto_h = config.read_raw(section, "H").is_none();
        self.path = PathBuf::from(config.read_string(section, "ImageName", ""));
        self.tile = config.read_bool(section, "Tile", false);
        self.preserve_aspect = config.read_bool(section, "PreserveAspectRatio", false);
    }

    fn update(&mut self, _values: &MeasureValues, canvas: &mut Canvas) -> bool {
        if self.loaded_path.as_ref() == Some(&self.path) {
            return false;
        }

        self.bitmap = if self.path.as_os_str().is_empty() {
            None
        } else {
            match SegmentedBitmap::load_png(&self.path, canvas.max_bitmap_size()) {
                Ok(bitmap) => Some(bitmap),
                Err(err) => {
                    tracing::warn!(meter = %self.base.name, error = %err, "failed to load image");
                    None
                }
            }
        };
        self.loaded_path = Some(self.path.clone());

        if let Some(bitmap) = &self.bitmap {
            if self.auto_w {
                self.base.w = bitmap.width() as i32;
            }
            if self.auto_h {
                self.base.h = bitmap.height() as i32;
            }
        }
        true
    }

    fn draw(&mut self, canvas: &mut Canvas) {
        if self.base.hidden {
            return;
        }
        let Some(bitmap) = &self.bitmap else { return };

        let mut dst = RectF::new(
            self.base.abs_x as f32,
            self.base.abs_y as f32,
            self.base.w as f32,
            self.base.h as f32,
        );
        let src = RectF::new(0.0, 0.0, bitmap.width() as f32, bitmap.height() as f32);

        if self.tile {
            canvas.draw_tiled_bitmap(bitmap, dst, src);
            return;
        }

        if self.preserve_aspect && bitmap.width() > 0 && bitmap.height() > 0 {
            let scale = (dst.width() / src.width()).min(dst.height() / src.height());
            let w = src.width() * scale;
            let h = src.height() * scale;
            dst = RectF::new(
                dst.left + (dst.width() - w) / 2.0,
                dst.top + (dst.height() - h) / 2.0,
                w,
                h,
            );
        }
        canvas.draw_bitmap(bitmap, dst, src);
    }
}
