//! Time-of-day measure

use chrono::Local;
use lamina_core::ConfigSource;

use crate::measure::{Measure, MeasureBase};

/// Reports seconds since local midnight; the string value formats the
/// current local time.
pub struct ClockMeasure {
    base: MeasureBase,
    format: String,
    formatted: String,
}

pub fn create(name: &str) -> Box<dyn Measure> {
    Box::new(ClockMeasure {
        base: MeasureBase::new(name),
        format: "%H:%M:%S".to_owned(),
        formatted: String::new(),
    })
}

impl Measure for ClockMeasure {
    fn base(&self) -> &MeasureBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MeasureBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "Clock"
    }

    fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.base.read_common_options(config, section);
        self.format = config.read_string(section, "Format", "%H:%M:%S");
        self.base.max_value = 24.0 * 60.0 * 60.0;
    }

    fn update_value(&mut self) -> f64 {
        let now = Local::now();
        self.formatted = now.format(&self.format).to_string();
        let time = now.time();
        chrono::Timelike::num_seconds_from_midnight(&time) as f64
    }

    fn string_value(&self) -> Option<String> {
        Some(self.formatted.clone())
    }
}
