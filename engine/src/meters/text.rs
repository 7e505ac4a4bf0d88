//! Text meter
//!
//! Renders a template string, substituting the bound measure's display value
//! for `%1`. Width and height auto-size to the laid-out text unless set
//! explicitly.

use lamina_core::ConfigSource;

use crate::canvas::text::{HorizontalAlignment, TextFormat, VerticalAlignment};
use crate::canvas::{Canvas, RectF};
use crate::measure::MeasureValues;
use crate::meter::{Meter, MeterBase};

pub struct TextMeter {
    base: MeterBase,
    measure_name: String,
    template: String,
    prefix: String,
    postfix: String,
    format: TextFormat,
    color: [u8; 4],
    auto_w: bool,
    auto_h: bool,
    display: String,
}

pub fn create(name: &str) -> Box<dyn Meter> {
    Box::new(TextMeter {
        base: MeterBase::new(name),
        measure_name: String::new(),
        template: "%1".to_owned(),
        prefix: String::new(),
        postfix: String::new(),
        format: TextFormat::default(),
        color: [255, 255, 255, 255],
        auto_w: true,
        auto_h: true,
        display: String::new(),
    })
}

impl Meter for TextMeter {
    fn base(&self) -> &MeterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MeterBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "Text"
    }

    fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.base.read_common_options(config, section);
        self.auto_w = config.read_raw(section, "W").is_none();
        self.auto_h = config.read_raw(section, "H").is_none();

        self.measure_name = config.read_string(section, "MeasureName", "");
        self.template = config.read_string(section, "Text", "%1");
        self.prefix = config.read_string(section, "Prefix", "");
        self.postfix = config.read_string(section, "Postfix", "");
        self.color = config.read_color(section, "FontColor", [255, 255, 255, 255]);

        self.format.family = config.read_string(section, "FontFace", "Noto Sans");
        self.format.size = config.read_float(section, "FontSize", 14.0) as f32;
        self.format.bold = config
            .read_string(section, "StringStyle", "")
            .eq_ignore_ascii_case("bold");
        self.format.italic = config
            .read_string(section, "StringStyle", "")
            .eq_ignore_ascii_case("italic");
        self.format.trimming = config.read_bool(section, "ClipString", false);
        self.format.word_wrap = config.read_bool(section, "WordWrap", false);
        self.format.h_align = match config
            .read_string(section, "StringAlign", "Left")
            .to_ascii_lowercase()
            .as_str()
        {
            "center" | "centercenter" => HorizontalAlignment::Center,
            "right" => HorizontalAlignment::Right,
            _ => HorizontalAlignment::Left,
        };
        self.format.v_align = VerticalAlignment::Top;
    }

    fn update(&mut self, values: &MeasureValues, canvas: &mut Canvas) -> bool {
        let substituted = if self.measure_name.is_empty() {
            self.template.clone()
        } else {
            let value = values
                .get(&self.measure_name)
                .map(|v| v.display())
                .unwrap_or_default();
            self.template.replace("%1", &value)
        };
        let display = format!("{}{}{}", self.prefix, substituted, self.postfix);

        let changed = display != self.display;
        self.display = display;

        if self.auto_w || self.auto_h {
            let metrics = canvas.measure_text(&self.display, &self.format);
            if self.auto_w {
                self.base.w = metrics.width.ceil() as i32;
            }
            if self.auto_h {
                self.base.h = metrics.height.ceil() as i32;
            }
        }

        changed
    }

    fn draw(&mut self, canvas: &mut Canvas) {
        if self.base.hidden {
            return;
        }
        let rect = RectF::new(
            self.base.abs_x as f32,
            self.base.abs_y as f32,
            self.base.w as f32,
            self.base.h as f32,
        );
        canvas.draw_text(&self.display, &self.format, rect, self.color);
    }
}
