//! Meter contract and registry
//!
//! A meter is a visual element with a draw/hit-test capability set, its own
//! update divider, a mouse action table, an optional relative-positioning
//! back-reference to another meter, and optional container membership. Back
//! references are indices into the skin's meter list, re-derived on every
//! refresh; meters never own each other.

use hashbrown::HashMap;
use lamina_core::{ConfigSource, RectI};
use tiny_skia::Transform;

use crate::canvas::{Canvas, RenderTexture};
use crate::measure::MeasureValues;
use crate::mouse::MouseOptions;

/// How a meter coordinate relates to its relative meter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelativeMode {
    /// Plain screen-space coordinate.
    #[default]
    Absolute,
    /// Offset from the relative meter's top-left (`10r`).
    TopLeft,
    /// Offset from the relative meter's bottom-right (`10R`).
    BottomRight,
}

/// One parsed meter coordinate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeterCoord {
    pub value: i32,
    pub mode: RelativeMode,
}

impl MeterCoord {
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        let mode = if trimmed.ends_with('r') {
            RelativeMode::TopLeft
        } else if trimmed.ends_with('R') {
            RelativeMode::BottomRight
        } else {
            RelativeMode::Absolute
        };
        let digits = match mode {
            RelativeMode::Absolute => trimmed,
            _ => &trimmed[..trimmed.len() - 1],
        };
        Self {
            value: lamina_core::config::parse_int(digits).unwrap_or(0),
            mode,
        }
    }
}

/// State common to every meter type.
#[derive(Debug)]
pub struct MeterBase {
    pub name: String,
    pub group: Vec<String>,
    pub x: MeterCoord,
    pub y: MeterCoord,
    pub w: i32,
    pub h: i32,
    /// Resolved screen-space position within the skin window, computed by the
    /// relative-positioning pass.
    pub abs_x: i32,
    pub abs_y: i32,
    pub hidden: bool,
    pub update_divider: i32,
    update_counter: i32,
    pub dynamic_variables: bool,
    pub on_update_action: String,
    pub mouse: MouseOptions,
    /// Edge-triggered hover state, maintained by the skin's mouse dispatch.
    pub mouse_over: bool,
    pub transform: Transform,
    /// Index of the meter this one positions relative to. Assigned by the
    /// skin, never configured directly.
    pub relative_index: Option<usize>,
    /// Name of the container meter this one renders into, as configured.
    pub container_name: Option<String>,
    /// Index of the container meter, resolved on refresh.
    pub container_index: Option<usize>,
    /// Indices of the meters rendered into this one, resolved on refresh.
    pub container_items: Vec<usize>,
    /// Offscreen textures for container compositing, sized on demand.
    pub content_texture: Option<RenderTexture>,
    pub chrome_texture: Option<RenderTexture>,
}

impl MeterBase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            group: Vec::new(),
            x: MeterCoord::default(),
            y: MeterCoord::default(),
            w: 0,
            h: 0,
            abs_x: 0,
            abs_y: 0,
            hidden: false,
            update_divider: 1,
            update_counter: 0,
            dynamic_variables: false,
            on_update_action: String::new(),
            mouse: MouseOptions::default(),
            mouse_over: false,
            transform: Transform::identity(),
            relative_index: None,
            container_name: None,
            container_index: None,
            container_items: Vec::new(),
            content_texture: None,
            chrome_texture: None,
        }
    }

    pub fn read_common_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.x = MeterCoord::parse(&config.read_string(section, "X", "0"));
        self.y = MeterCoord::parse(&config.read_string(section, "Y", "0"));
        self.w = config.read_int(section, "W", self.w);
        self.h = config.read_int(section, "H", self.h);
        self.hidden = config.read_bool(section, "Hidden", false);
        self.update_divider = config.read_int(section, "UpdateDivider", 1);
        self.dynamic_variables = config.read_bool(section, "DynamicVariables", false);
        self.on_update_action = config.read_string(section, "OnUpdateAction", "");
        self.mouse.read_options(config, section);
        self.group = config
            .read_string(section, "Group", "")
            .split('|')
            .filter(|g| !g.is_empty())
            .map(|g| g.trim().to_ascii_lowercase())
            .collect();

        if let Some(matrix) = parse_transform(&config.read_string(section, "TransformationMatrix", ""))
        {
            self.transform = matrix;
        }
    }

    /// The container option is read in its own pass, before relative meters
    /// are wired, because container membership changes the wiring.
    pub fn read_container_option(&mut self, config: &dyn ConfigSource, section: &str) {
        let name = config.read_string(section, "Container", "");
        self.container_name = (!name.is_empty()).then_some(name);
        self.container_index = None;
        self.container_items.clear();
    }

    pub fn in_group(&self, group: &str) -> bool {
        let group = group.to_ascii_lowercase();
        self.group.iter().any(|g| *g == group)
    }

    pub fn is_contained(&self) -> bool {
        self.container_index.is_some()
    }

    pub fn is_container(&self) -> bool {
        !self.container_items.is_empty()
    }

    pub fn rect(&self) -> RectI {
        RectI::from_xywh(self.abs_x, self.abs_y, self.w, self.h)
    }

    pub fn reset_update_counter(&mut self) {
        self.update_counter = 0;
    }

    pub fn will_update(&self) -> bool {
        self.update_divider >= 0 && self.update_counter == 0
    }

    /// Same divider gate as measures: fires on the first tick after a reset,
    /// then every `update_divider` ticks.
    pub fn divider_fires(&mut self, force: bool) -> bool {
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

/// `TransformationMatrix=m11;m12;m21;m22;dx;dy`
fn parse_transform(s: &str) -> Option<Transform> {
    if s.is_empty() {
        return None;
    }
    let parts: Vec<f32> = s.split(';').filter_map(|p| p.trim().parse().ok()).collect();
    if parts.len() != 6 {
        tracing::warn!(option = s, "TransformationMatrix needs 6 values");
        return None;
    }
    // Row-vector convention: m11 m12 / m21 m22 map onto sx ky / kx sy.
    Some(Transform::from_row(
        parts[0], parts[1], parts[2], parts[3], parts[4], parts[5],
    ))
}

/// Capability interface of a meter type.
pub trait Meter {
    fn base(&self) -> &MeterBase;
    fn base_mut(&mut self) -> &mut MeterBase;
    fn type_name(&self) -> &'static str;

    fn read_options(&mut self, config: &dyn ConfigSource, section: &str);

    /// Recompute the meter's drawable state from the measure snapshot.
    /// The canvas is available for text measurement and bitmap loading.
    /// Returns whether anything visible changed.
    fn update(&mut self, values: &MeasureValues, canvas: &mut Canvas) -> bool;

    fn draw(&mut self, canvas: &mut Canvas);

    /// Hit test in skin-window coordinates. Hidden meters never hit.
    fn hit_test(&self, x: i32, y: i32) -> bool {
        !self.base().hidden && self.base().rect().contains(x, y)
    }

    /// Whether a multi-frame visual animation is in progress; drives the
    /// dedicated transition timer.
    fn has_active_transition(&self) -> bool {
        false
    }
}

/// Factory for one meter type.
pub type MeterFactory = fn(name: &str) -> Box<dyn Meter>;

/// Registry mapping type tags to meter factories.
pub struct MeterRegistry {
    factories: HashMap<String, MeterFactory>,
}

impl MeterRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in meter types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("Text", crate::meters::text::create);
        registry.register("Bar", crate::meters::bar::create);
        registry.register("Image", crate::meters::image::create);
        registry.register("Panel", crate::meters::panel::create);
        registry
    }

    pub fn register(&mut self, type_name: &str, factory: MeterFactory) {
        self.factories
            .insert(type_name.to_ascii_lowercase(), factory);
    }

    pub fn create(&self, type_name: &str, name: &str) -> Option<Box<dyn Meter>> {
        self.factories
            .get(&type_name.to_ascii_lowercase())
            .map(|factory| factory(name))
    }
}

impl Default for MeterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_coord_parse() {
        let c = MeterCoord::parse("10");
        assert_eq!((c.value, c.mode), (10, RelativeMode::Absolute));

        let c = MeterCoord::parse("5r");
        assert_eq!((c.value, c.mode), (5, RelativeMode::TopLeft));

        let c = MeterCoord::parse("0R");
        assert_eq!((c.value, c.mode), (0, RelativeMode::BottomRight));

        let c = MeterCoord::parse("-12");
        assert_eq!((c.value, c.mode), (-12, RelativeMode::Absolute));
    }

    #[test]
    fn test_parse_transform() {
        let t = parse_transform("0;1;-1;0;10;20").unwrap();
        assert_eq!(t.sx, 0.0);
        assert_eq!(t.ky, 1.0);
        assert_eq!(t.kx, -1.0);
        assert_eq!(t.tx, 10.0);

        assert!(parse_transform("1;2;3").is_none());
        assert!(parse_transform("").is_none());
    }

    #[test]
    fn test_divider_gate_matches_measures() {
        let mut base = MeterBase::new("m");
        base.update_divider = 3;
        let fired: Vec<bool> = (0..6).map(|_| base.divider_fires(false)).collect();
        assert_eq!(fired, vec![true, false, false, true, false, false]);
    }
}
