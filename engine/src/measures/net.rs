//! Network throughput measure
//!
//! Reads the shared interface tables; the skin refreshes those once per tick
//! for all network measures together.

use lamina_core::{ConfigSource, netstats};

use crate::measure::{Measure, MeasureBase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
    Total,
}

pub struct NetMeasure {
    base: MeasureBase,
    interface: String,
    direction: Direction,
}

pub fn create(name: &str) -> Box<dyn Measure> {
    Box::new(NetMeasure {
        base: MeasureBase::new(name),
        interface: String::new(),
        direction: Direction::In,
    })
}

impl Measure for NetMeasure {
    fn base(&self) -> &MeasureBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MeasureBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "Net"
    }

    fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.base.read_common_options(config, section);
        self.interface = config.read_string(section, "Interface", "");
        self.direction = match config
            .read_string(section, "Direction", "In")
            .to_ascii_lowercase()
            .as_str()
        {
            "out" => Direction::Out,
            "total" => Direction::Total,
            _ => Direction::In,
        };
    }

    fn uses_network(&self) -> bool {
        true
    }

    fn update_value(&mut self) -> f64 {
        let Some(rates) = netstats::rates(&self.interface) else {
            return 0.0;
        };
        match self.direction {
            Direction::In => rates.in_per_sec,
            Direction::Out => rates.out_per_sec,
            Direction::Total => rates.in_per_sec + rates.out_per_sec,
        }
    }
}
