//! Counting measure
//!
//! Advances by a fixed step on every update. Handy for driving animations
//! and for exercising divider behavior.

use lamina_core::ConfigSource;

use crate::measure::{Measure, MeasureBase};

pub struct CounterMeasure {
    base: MeasureBase,
    start: f64,
    step: f64,
    current: Option<f64>,
}

pub fn create(name: &str) -> Box<dyn Measure> {
    Box::new(CounterMeasure {
        base: MeasureBase::new(name),
        start: 0.0,
        step: 1.0,
        current: None,
    })
}

impl Measure for CounterMeasure {
    fn base(&self) -> &MeasureBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MeasureBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "Counter"
    }

    fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.base.read_common_options(config, section);
        self.start = config.read_float(section, "Start", 0.0);
        self.step = config.read_float(section, "Step", 1.0);
    }

    fn update_value(&mut self) -> f64 {
        let next = match self.current {
            Some(value) => value + self.step,
            None => self.start,
        };
        self.current = Some(next);
        next
    }

    fn command(&mut self, command: &str) {
        match command.trim().to_ascii_lowercase().as_str() {
            "reset" => self.current = None,
            other => tracing::warn!(
                measure = %self.base.name,
                command = other,
                "unknown counter command"
            ),
        }
    }
}
