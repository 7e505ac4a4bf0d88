//! Measure contract and registry
//!
//! A measure is a polymorphic data source producing a numeric and optional
//! string value. Measures are owned by their skin, updated in registration
//! order before any meter, and gated by an update divider counting elapsed
//! ticks.

use hashbrown::HashMap;
use lamina_core::ConfigSource;

/// State common to every measure type.
#[derive(Debug, Clone)]
pub struct MeasureBase {
    pub name: String,
    pub group: Vec<String>,
    pub update_divider: i32,
    update_counter: i32,
    pub disabled: bool,
    pub paused: bool,
    pub dynamic_variables: bool,
    pub min_value: f64,
    pub max_value: f64,
    pub value: f64,
    pub on_update_action: String,
    pub on_change_action: String,
    /// Set once the first update has assigned a value; change detection only
    /// fires on later updates.
    value_assigned: bool,
    last_value: f64,
    last_string: Option<String>,
}

impl MeasureBase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            group: Vec::new(),
            update_divider: 1,
            update_counter: 0,
            disabled: false,
            paused: false,
            dynamic_variables: false,
            min_value: 0.0,
            max_value: 1.0,
            value: 0.0,
            on_update_action: String::new(),
            on_change_action: String::new(),
            value_assigned: false,
            last_value: 0.0,
            last_string: None,
        }
    }

    pub fn read_common_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.update_divider = config.read_int(section, "UpdateDivider", 1);
        self.dynamic_variables = config.read_bool(section, "DynamicVariables", false);
        self.disabled = config.read_bool(section, "Disabled", false);
        self.paused = config.read_bool(section, "Paused", false);
        self.min_value = config.read_float(section, "MinValue", 0.0);
        self.max_value = config.read_float(section, "MaxValue", 1.0);
        self.on_update_action = config.read_string(section, "OnUpdateAction", "");
        self.on_change_action = config.read_string(section, "OnChangeAction", "");
        self.group = config
            .read_string(section, "Group", "")
            .split('|')
            .filter(|g| !g.is_empty())
            .map(|g| g.trim().to_ascii_lowercase())
            .collect();
    }

    pub fn in_group(&self, group: &str) -> bool {
        let group = group.to_ascii_lowercase();
        self.group.iter().any(|g| *g == group)
    }

    pub fn reset_update_counter(&mut self) {
        self.update_counter = 0;
    }

    /// Whether the next tick's divider gate will fire. Used to re-read
    /// options ahead of an update when dynamic variables are in play.
    pub fn will_update(&self) -> bool {
        self.update_divider >= 0 && self.update_counter == 0
    }

    /// Divider gate: fires on the first tick after a reset, then every
    /// `update_divider` ticks. A negative divider never fires (the measure
    /// only updates when forced).
    fn divider_fires(&mut self, force: bool) -> bool {
        if force {
            self.update_counter = 0;
        }
        if self.update_divider < 0 && !force {
            return false;
        }
        let fires = self.update_counter == 0;
        self.update_counter = (self.update_counter + 1) % self.update_divider.max(1);
        fires
    }
}

/// Capability interface of a measure type.
pub trait Measure {
    fn base(&self) -> &MeasureBase;
    fn base_mut(&mut self) -> &mut MeasureBase;
    fn type_name(&self) -> &'static str;

    fn read_options(&mut self, config: &dyn ConfigSource, section: &str);

    /// Produce the next numeric value. Called only when enabled, unpaused and
    /// the divider fires.
    fn update_value(&mut self) -> f64;

    fn string_value(&self) -> Option<String> {
        None
    }

    /// Plugin-specific command surface (`!CommandMeasure`).
    fn command(&mut self, command: &str) {
        tracing::warn!(
            measure = %self.base().name,
            command,
            "measure does not accept commands"
        );
    }

    /// Whether this measure reads the shared network tables; the skin
    /// refreshes them once per tick when any measure does.
    fn uses_network(&self) -> bool {
        false
    }

    /// Poll background completion. Returns a finish command to execute on
    /// the UI thread when a detached worker has delivered a result.
    fn poll_background(&mut self) -> Option<String> {
        None
    }
}

/// Outcome of one measure tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeasureTick {
    /// The measure ran its update this tick.
    pub updated: bool,
    /// The produced value or string differs from the previous one.
    pub changed: bool,
}

/// Drive one measure through a tick: divider gating, enable/pause state,
/// value bookkeeping and change detection.
pub fn update_measure(measure: &mut dyn Measure, force: bool) -> MeasureTick {
    if !measure.base_mut().divider_fires(force) {
        return MeasureTick::default();
    }
    if measure.base().disabled || measure.base().paused {
        return MeasureTick::default();
    }

    let value = measure.update_value();
    let string = measure.string_value();

    let base = measure.base_mut();
    base.value = value;
    if value > base.max_value {
        base.max_value = value;
    }
    if value < base.min_value {
        base.min_value = value;
    }

    let changed = base.value_assigned && (value != base.last_value || string != base.last_string);
    base.value_assigned = true;
    base.last_value = value;
    base.last_string = string;

    MeasureTick {
        updated: true,
        changed,
    }
}

/// Snapshot of every measure's value, taken after the measure pass so meters
/// never observe a value from an earlier tick.
#[derive(Debug, Default, Clone)]
pub struct MeasureValues {
    values: HashMap<String, MeasureValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureValue {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub string: Option<String>,
}

impl MeasureValue {
    /// Value normalized into [0, 1] over the measure's range.
    pub fn relative(&self) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.value - self.min) / span).clamp(0.0, 1.0)
    }

    /// Display string: the explicit string value when present, the number
    /// otherwise.
    pub fn display(&self) -> String {
        match &self.string {
            Some(s) => s.clone(),
            None => format_value(self.value),
        }
    }
}

fn format_value(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

impl MeasureValues {
    pub fn snapshot(measures: &[Box<dyn Measure>]) -> Self {
        let mut values = HashMap::new();
        for measure in measures {
            let base = measure.base();
            values.insert(
                base.name.to_ascii_lowercase(),
                MeasureValue {
                    value: base.value,
                    min: base.min_value,
                    max: base.max_value,
                    string: measure.string_value(),
                },
            );
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&MeasureValue> {
        self.values.get(&name.to_ascii_lowercase())
    }
}

/// Factory for one measure type.
pub type MeasureFactory = fn(name: &str) -> Box<dyn Measure>;

/// Registry mapping type tags to measure factories.
pub struct MeasureRegistry {
    factories: HashMap<String, MeasureFactory>,
}

impl MeasureRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in measure types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("Clock", crate::measures::clock::create);
        registry.register("Counter", crate::measures::counter::create);
        registry.register("Net", crate::measures::net::create);
        registry.register("Probe", crate::measures::probe::create);
        registry
    }

    pub fn register(&mut self, type_name: &str, factory: MeasureFactory) {
        self.factories
            .insert(type_name.to_ascii_lowercase(), factory);
    }

    /// Create a measure of `type_name`, or `None` for unknown types (the
    /// section is skipped with a warning, not fatal to the skin).
    pub fn create(&self, type_name: &str, name: &str) -> Option<Box<dyn Measure>> {
        self.factories
            .get(&type_name.to_ascii_lowercase())
            .map(|factory| factory(name))
    }
}

impl Default for MeasureRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestMeasure {
        base: MeasureBase,
        next: f64,
    }

    impl Measure for TestMeasure {
        fn base(&self) -> &MeasureBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut MeasureBase {
            &mut self.base
        }
        fn type_name(&self) -> &'static str {
            "Test"
        }
        fn read_options(&mut self, _config: &dyn ConfigSource, _section: &str) {}
        fn update_value(&mut self) -> f64 {
            self.next
        }
    }

    fn test_measure(divider: i32) -> TestMeasure {
        let mut base = MeasureBase::new("m");
        base.update_divider = divider;
        TestMeasure { base, next: 0.0 }
    }

    #[test]
    fn test_divider_two_fires_ticks_one_and_three() {
        let mut m = test_measure(2);
        let fired: Vec<bool> = (0..3)
            .map(|_| update_measure(&mut m, false).updated)
            .collect();
        assert_eq!(fired, vec![true, false, true]);
    }

    #[test]
    fn test_negative_divider_only_forced() {
        let mut m = test_measure(-1);
        assert!(!update_measure(&mut m, false).updated);
        assert!(update_measure(&mut m, true).updated);
        assert!(!update_measure(&mut m, false).updated);
    }

    #[test]
    fn test_change_detection_skips_first_assignment() {
        let mut m = test_measure(1);
        m.next = 5.0;
        let first = update_measure(&mut m, false);
        assert!(first.updated && !first.changed);

        let second = update_measure(&mut m, false);
        assert!(second.updated && !second.changed);

        m.next = 6.0;
        let third = update_measure(&mut m, false);
        assert!(third.changed);
    }

    #[test]
    fn test_disabled_measure_does_not_update() {
        let mut m = test_measure(1);
        m.base.disabled = true;
        assert!(!update_measure(&mut m, false).updated);
    }

    #[test]
    fn test_observed_range_extends_max() {
        let mut m = test_measure(1);
        m.next = 5.0;
        update_measure(&mut m, false);
        assert_eq!(m.base.max_value, 5.0);
    }

    #[test]
    fn test_relative_value() {
        let v = MeasureValue {
            value: 5.0,
            min: 0.0,
            max: 10.0,
            string: None,
        };
        assert_eq!(v.relative(), 0.5);
        assert_eq!(v.display(), "5");
    }
}
