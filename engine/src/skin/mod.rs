//! Per-skin rendering and update runtime
//!
//! One [`Skin`] per active skin file. It owns the window backend, the canvas,
//! the ordered meter and measure collections, the placement solver state and
//! every purpose-keyed timer, and it drives the update → redraw cycle and the
//! bang dispatch that mutates any of the above.
//!
//! All state lives on the UI thread; the host's message loop feeds events in
//! through [`Skin::handle_event`] and polls [`Skin::pump`] for due timers.

pub mod bang;

use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lamina_core::settings::{HideMode, ZPosition};
use lamina_core::{
    CommandExecutor, ConfigSource, RectI, SettingFlags, SettingsStore, SkinSettings, netstats,
};
use thiserror::Error;
use tiny_skia::Color;

use crate::canvas::bitmap::SegmentedBitmap;
use crate::canvas::{Canvas, CanvasError, GraphicsHandle, RectF, RenderTexture};
use crate::clock::Clock;
use crate::measure::{Measure, MeasureRegistry, MeasureValues, update_measure};
use crate::meter::{Meter, MeterRegistry, RelativeMode};
use crate::monitor::MonitorLayout;
use crate::mouse::{MouseActionKind, MouseOptions};
use crate::position::{self, WindowPlacement};
use crate::timer::{
    INTERVAL_FADE, INTERVAL_MOUSE, INTERVAL_TRANSITION, INTERVAL_UPDATE, TimerKind, Timers,
};
use crate::window::WindowBackend;

pub use bang::Bang;

/// Highest configuration schema version this engine understands.
pub const SCHEMA_VERSION: u32 = 1;

/// Extra delay after the fade-out before a deactivated skin self-finishes.
const DEACTIVATE_GRACE_MS: u64 = 50;

/// The section carrying skin-wide options.
const SKIN_SECTION: &str = "Skin";

#[derive(Debug, Error)]
pub enum SkinError {
    #[error("skin '{0}' defines no meters")]
    NoMeters(String),

    #[error("skin '{0}' requires schema version {1} (supported: {SCHEMA_VERSION})")]
    UnsupportedSchema(String, u32),

    #[error("failed to create render target for skin '{0}'")]
    RenderTarget(String, #[source] CanvasError),
}

/// Lifecycle states. `Closing` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkinState {
    Initializing,
    Refreshing,
    Running,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResizeMode {
    None,
    Check,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackgroundMode {
    Image,
    Copy,
    Solid,
    ScaledImage,
    TiledImage,
}

impl BackgroundMode {
    fn from_int(v: i32) -> Self {
        match v {
            1 => Self::Copy,
            2 => Self::Solid,
            3 => Self::ScaledImage,
            4 => Self::TiledImage,
            _ => Self::Image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BevelType {
    None,
    Up,
    Down,
}

/// Keyboard modifier state delivered with pointer events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.shift || self.alt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Down,
    Up,
    DoubleClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Events the host's message loop feeds into the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkinEvent {
    Timer(TimerKind),
    MouseMove {
        x: i32,
        y: i32,
        modifiers: Modifiers,
    },
    MouseLeave,
    MouseButton {
        button: MouseButton,
        event: ButtonEvent,
        x: i32,
        y: i32,
        modifiers: Modifiers,
    },
    MouseScroll {
        direction: ScrollDirection,
        x: i32,
        y: i32,
        modifiers: Modifiers,
    },
    /// Window gained or lost focus.
    Focus(bool),
    /// The window was moved (by the OS or an interactive drag).
    Moved { x: i32, y: i32 },
    /// Monitor arrangement changed.
    DisplayChange,
    /// System resumed from sleep.
    Wake,
}

/// Everything a skin consumes from its host.
pub struct SkinServices {
    pub config: Box<dyn ConfigSource>,
    pub settings: Box<dyn SettingsStore>,
    pub executor: Arc<dyn CommandExecutor>,
    pub backend: Box<dyn WindowBackend>,
    pub graphics: GraphicsHandle,
    pub clock: Rc<dyn Clock>,
    pub meter_registry: MeterRegistry,
    pub measure_registry: MeasureRegistry,
}

/// One live skin instance.
pub struct Skin {
    folder_path: String,
    file_name: String,
    state: SkinState,

    config: Box<dyn ConfigSource>,
    settings_store: Box<dyn SettingsStore>,
    executor: Arc<dyn CommandExecutor>,
    backend: Box<dyn WindowBackend>,
    clock: Rc<dyn Clock>,
    meter_registry: MeterRegistry,
    measure_registry: MeasureRegistry,

    canvas: Canvas,
    placement: WindowPlacement,
    meters: Vec<Box<dyn Meter>>,
    measures: Vec<Box<dyn Measure>>,
    timers: Timers,

    /// Persisted per-skin settings, written back field-by-field.
    settings: SkinSettings,

    // Options from the skin file.
    update_interval: i32,
    transition_interval: u32,
    background_mode: BackgroundMode,
    background_margins: RectI,
    background_name: String,
    background: Option<SegmentedBitmap>,
    solid_color: [u8; 4],
    solid_color2: [u8; 4],
    solid_angle: f32,
    bevel: BevelType,
    bevel_color: [u8; 4],
    bevel_color2: [u8; 4],
    selected_color: [u8; 4],
    dynamic_window_size: bool,
    skin_w: i32,
    skin_h: i32,
    mouse: MouseOptions,
    on_refresh_action: String,
    on_update_action: String,
    on_close_action: String,
    on_focus_action: String,
    on_unfocus_action: String,
    on_wake_action: String,

    // Runtime state.
    update_counter: u64,
    has_net_measures: bool,
    active_transition: bool,
    resize_mode: ResizeMode,
    resize_count: u64,
    transparency: u8,
    hidden: bool,
    selected: bool,
    dragging: bool,
    mouse_over: bool,
    redraw_allowed: bool,
    first_run: bool,
    closed: bool,

    // Fade.
    active_fade: bool,
    fade_start_time: Option<Instant>,
    fade_start_value: u8,
    fade_end_value: u8,
    new_fade_duration: Option<u32>,

    // Blur.
    blur_enabled: bool,
    blur_region: Vec<RectI>,

    // Ad-hoc delayed commands, keyed by timer token.
    delayed_commands: hashbrown::HashMap<u32, String>,
    next_delayed_id: u32,
}

impl Skin {
    /// Create the runtime for one skin file. Fails only when the render
    /// target cannot be created (the caller deactivates the skin and shows a
    /// message rather than crashing).
    pub fn new(folder_path: &str, file_name: &str, services: SkinServices) -> Result<Self, SkinError> {
        let SkinServices {
            config,
            settings,
            executor,
            backend,
            graphics,
            clock,
            meter_registry,
            measure_registry,
        } = services;

        let mut canvas = Canvas::new(graphics);
        canvas
            .init_render_target()
            .map_err(|err| SkinError::RenderTarget(folder_path.to_owned(), err))?;

        let persisted = settings.load(folder_path);

        Ok(Self {
            folder_path: folder_path.to_owned(),
            file_name: file_name.to_owned(),
            state: SkinState::Initializing,
            config,
            settings_store: settings,
            executor,
            backend,
            clock,
            meter_registry,
            measure_registry,
            canvas,
            placement: WindowPlacement::default(),
            meters: Vec::new(),
            measures: Vec::new(),
            timers: Timers::new(),
            settings: persisted,
            update_interval: INTERVAL_UPDATE as i32,
            transition_interval: INTERVAL_TRANSITION,
            background_mode: BackgroundMode::Image,
            background_margins: RectI::default(),
            background_name: String::new(),
            background: None,
            solid_color: [128, 128, 128, 255],
            solid_color2: [128, 128, 128, 255],
            solid_angle: 0.0,
            bevel: BevelType::None,
            bevel_color: [255, 255, 255, 255],
            bevel_color2: [0, 0, 0, 255],
            selected_color: [255, 0, 0, 90],
            dynamic_window_size: false,
            skin_w: 0,
            skin_h: 0,
            mouse: MouseOptions::default(),
            on_refresh_action: String::new(),
            on_update_action: String::new(),
            on_close_action: String::new(),
            on_focus_action: String::new(),
            on_unfocus_action: String::new(),
            on_wake_action: String::new(),
            update_counter: 0,
            has_net_measures: false,
            active_transition: false,
            resize_mode: ResizeMode::None,
            resize_count: 0,
            transparency: 255,
            hidden: false,
            selected: false,
            dragging: false,
            mouse_over: false,
            redraw_allowed: true,
            first_run: true,
            closed: false,
            active_fade: false,
            fade_start_time: None,
            fade_start_value: 0,
            fade_end_value: 0,
            new_fade_duration: None,
            blur_enabled: false,
            blur_region: Vec::new(),
            delayed_commands: hashbrown::HashMap::new(),
            next_delayed_id: 0,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn folder_path(&self) -> &str {
        &self.folder_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn state(&self) -> SkinState {
        self.state
    }

    /// A deactivated skin is finished once its fade completed and the
    /// deactivation delay fired; the host drops it then.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn window_rect(&self) -> RectI {
        RectI::from_xywh(
            self.placement.screen_x,
            self.placement.screen_y,
            self.placement.window_w,
            self.placement.window_h,
        )
    }

    pub fn transparency(&self) -> u8 {
        self.transparency
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        if self.selected != selected {
            self.selected = selected;
            self.redraw();
        }
    }

    /// Host policy gate for redraws (e.g. suppressed in remote sessions).
    pub fn set_redraw_allowed(&mut self, allowed: bool) {
        self.redraw_allowed = allowed;
    }

    pub fn settings(&self) -> &SkinSettings {
        &self.settings
    }

    pub fn placement(&self) -> &WindowPlacement {
        &self.placement
    }

    /// Resize passes performed so far (diagnostics).
    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }

    /// Current numeric value of the named measure.
    pub fn measure_value(&self, name: &str) -> Option<f64> {
        self.measures
            .iter()
            .find(|m| m.base().name.eq_ignore_ascii_case(name))
            .map(|m| m.base().value)
    }

    /// Whether the timer for `kind` is currently armed.
    pub fn timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    fn monitors(&self) -> MonitorLayout {
        self.backend.monitors()
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn execute(&self, command: &str) {
        if !command.is_empty() {
            self.executor.execute(command, &self.folder_path);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Activate the skin: first full refresh.
    pub fn activate(&mut self) -> Result<(), SkinError> {
        self.refresh(true, false)
    }

    /// Rebuild the skin from its configuration.
    pub fn refresh(&mut self, init: bool, all: bool) -> Result<(), SkinError> {
        if self.state == SkinState::Closing {
            return Ok(());
        }
        self.state = SkinState::Refreshing;
        tracing::info!(skin = %self.folder_path, "refreshing skin");

        self.resize_mode = ResizeMode::Reset;

        if !init {
            self.dispose(true);
        }

        let old_z = self.settings.z_position;

        if let Err(err) = self.read_skin() {
            tracing::error!(skin = %self.folder_path, error = %err, "failed to read skin");
            self.deactivate();
            return Err(err);
        }

        self.hidden = self.settings.start_hidden;
        self.transparency = self.settings.alpha;

        self.update(true);

        if self.blur_enabled {
            self.show_blur();
        } else {
            self.hide_blur();
        }

        if self.settings.keep_on_screen {
            let layout = self.monitors();
            position::map_coords_to_screen(
                &mut self.placement.screen_x,
                &mut self.placement.screen_y,
                self.placement.window_w,
                self.placement.window_h,
                &layout,
            );
        }

        self.backend
            .set_position(self.placement.screen_x, self.placement.screen_y);
        self.backend.set_size(
            self.placement.window_w.max(0) as u32,
            self.placement.window_h.max(0) as u32,
        );
        self.backend.set_click_through(self.settings.click_through);

        let layout = self.monitors();
        self.placement.screen_to_window(&layout);

        // Apply z-order: always on first init, otherwise only when the
        // policy changed (or a full-group refresh asks for it).
        if init || all || old_z != self.settings.z_position {
            self.backend.set_z_position(self.settings.z_position);
        }

        let now = self.now();
        if self.update_interval >= 0 {
            self.timers.set(
                TimerKind::Update,
                Duration::from_millis(self.update_interval.max(1) as u64),
                now,
            );
        }
        self.timers.set(
            TimerKind::MousePoll,
            Duration::from_millis(INTERVAL_MOUSE as u64),
            now,
        );

        if !self.hidden {
            self.backend.set_visible(true);
        }

        self.state = SkinState::Running;

        let action = self.on_refresh_action.clone();
        self.execute(&action);
        Ok(())
    }

    /// Begin asynchronous teardown: fade out, then self-finish once the
    /// deactivation delay fires with no fade active.
    pub fn deactivate(&mut self) {
        if self.state == SkinState::Closing {
            return;
        }
        tracing::info!(skin = %self.folder_path, "deactivating skin");
        self.state = SkinState::Closing;

        self.apply_pending_fade_duration();

        let action = self.on_close_action.clone();
        self.execute(&action);

        self.hide_fade();
        let now = self.now();
        self.timers.set_one_shot(
            TimerKind::Deactivate,
            Duration::from_millis(self.settings.fade_duration as u64 + DEACTIVATE_GRACE_MS),
            now,
        );
    }

    /// Tear down meters, measures and timers. With `refresh` the window and
    /// canvas survive for the rebuild.
    fn dispose(&mut self, refresh: bool) {
        self.timers.kill(TimerKind::Update);
        self.timers.kill(TimerKind::MousePoll);
        self.timers.kill(TimerKind::Fade);
        self.timers.kill(TimerKind::Transition);

        self.fade_start_time = None;
        self.active_fade = false;
        self.active_transition = false;
        self.mouse_over = false;

        self.meters.clear();
        self.measures.clear();
        self.background = None;
        self.background_name.clear();
        self.has_net_measures = false;
        self.delayed_commands.clear();

        if !refresh {
            self.backend.set_visible(false);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    fn read_skin(&mut self) -> Result<(), SkinError> {
        let key = format!("{}\\{}", self.folder_path, self.file_name);

        let schema = self.config.read_uint(SKIN_SECTION, "SchemaVersion", 0);
        if schema > SCHEMA_VERSION {
            return Err(SkinError::UnsupportedSchema(key, schema));
        }

        if self.first_run {
            // Defaults from the skin file seed the persisted record once.
            self.read_default_settings();
            self.first_run = false;
        }

        self.canvas
            .set_accurate_text(self.config.read_bool(SKIN_SECTION, "AccurateText", false));
        self.canvas.resize(1, 1);

        self.skin_w = self.config.read_int(SKIN_SECTION, "SkinWidth", 0);
        self.skin_h = self.config.read_int(SKIN_SECTION, "SkinHeight", 0);

        self.background_margins =
            self.config.read_rect(SKIN_SECTION, "BackgroundMargins", RectI::default());
        self.background_mode =
            BackgroundMode::from_int(self.config.read_int(SKIN_SECTION, "BackgroundMode", 0));
        self.bevel = match self.config.read_int(SKIN_SECTION, "BevelType", 0) {
            1 => BevelType::Up,
            2 => BevelType::Down,
            _ => BevelType::None,
        };
        self.bevel_color = self.config.read_color(SKIN_SECTION, "BevelColor", [255, 255, 255, 255]);
        self.bevel_color2 = self.config.read_color(SKIN_SECTION, "BevelColor2", [0, 0, 0, 255]);
        self.solid_color = self.config.read_color(SKIN_SECTION, "SolidColor", [128, 128, 128, 255]);
        self.solid_color2 = self.config.read_color(SKIN_SECTION, "SolidColor2", self.solid_color);
        self.solid_angle = self.config.read_float(SKIN_SECTION, "GradientAngle", 0.0) as f32;
        self.dynamic_window_size = self.config.read_bool(SKIN_SECTION, "DynamicWindowSize", false);
        self.selected_color = self.config.read_color(SKIN_SECTION, "SelectedColor", [255, 0, 0, 90]);

        if matches!(
            self.background_mode,
            BackgroundMode::Image | BackgroundMode::ScaledImage | BackgroundMode::TiledImage
        ) {
            self.background_name = self.config.read_string(SKIN_SECTION, "Background", "");
            if self.background_name.is_empty() {
                self.background_mode = BackgroundMode::Copy;
            }
        }

        self.mouse.read_options(&*self.config, SKIN_SECTION);

        self.on_refresh_action = self.config.read_string(SKIN_SECTION, "OnRefreshAction", "");
        self.on_close_action = self.config.read_string(SKIN_SECTION, "OnCloseAction", "");
        self.on_focus_action = self.config.read_string(SKIN_SECTION, "OnFocusAction", "");
        self.on_unfocus_action = self.config.read_string(SKIN_SECTION, "OnUnfocusAction", "");
        self.on_update_action = self.config.read_string(SKIN_SECTION, "OnUpdateAction", "");
        self.on_wake_action = self.config.read_string(SKIN_SECTION, "OnWakeAction", "");

        self.update_interval =
            self.config.read_int(SKIN_SECTION, "Update", INTERVAL_UPDATE as i32);
        self.transition_interval =
            self.config.read_uint(SKIN_SECTION, "TransitionUpdate", INTERVAL_TRANSITION);

        self.blur_enabled = self.config.read_bool(SKIN_SECTION, "Blur", false);
        self.blur_region.clear();

        // Window placement comes from the persisted settings.
        self.placement.window_x = self.settings.window_x.clone();
        self.placement.window_y = self.settings.window_y.clone();
        self.placement.anchor_x = self.settings.anchor_x.clone();
        self.placement.anchor_y = self.settings.anchor_y.clone();
        self.placement.auto_select_screen = self.settings.auto_select_screen;

        // Build measures and meters in section order; a section whose type is
        // unknown contributes nothing instead of aborting the skin.
        for section in self.config.sections() {
            if section.eq_ignore_ascii_case(SKIN_SECTION) {
                continue;
            }

            let measure_type = self.config.read_string(&section, "Measure", "");
            if !measure_type.is_empty() {
                match self.measure_registry.create(&measure_type, &section) {
                    Some(measure) => self.measures.push(measure),
                    None => tracing::warn!(
                        skin = %self.folder_path,
                        section = %section,
                        kind = %measure_type,
                        "unknown measure type"
                    ),
                }
                continue;
            }

            let meter_type = self.config.read_string(&section, "Meter", "");
            if !meter_type.is_empty() {
                match self.meter_registry.create(&meter_type, &section) {
                    Some(meter) => self.meters.push(meter),
                    None => tracing::warn!(
                        skin = %self.folder_path,
                        section = %section,
                        kind = %meter_type,
                        "unknown meter type"
                    ),
                }
            }
        }

        if self.meters.is_empty() {
            return Err(SkinError::NoMeters(key));
        }

        // Container wiring first: membership changes the relative chain.
        for meter in &mut self.meters {
            let section = meter.base().name.clone();
            meter.base_mut().read_container_option(&*self.config, &section);
        }
        self.resolve_containers();
        self.update_relative_meters();

        // Measure options before meter options, so meters read substituted
        // values; then meters, then a forced first update pass.
        for measure in &mut self.measures {
            let section = measure.base().name.clone();
            measure.read_options(&*self.config, &section);
        }
        self.has_net_measures = self.measures.iter().any(|m| m.uses_network());
        if self.has_net_measures {
            netstats::refresh();
        }

        for i in 0..self.meters.len() {
            let section = self.meters[i].base().name.clone();
            self.meters[i].read_options(&*self.config, &section);
        }

        let values = MeasureValues::snapshot(&self.measures);
        for i in 0..self.meters.len() {
            self.meters[i].base_mut().reset_update_counter();
            self.meters[i].base_mut().divider_fires(true);
            self.meters[i].update(&values, &mut self.canvas);
        }
        self.resolve_meter_positions();
        self.resize_window(true);

        Ok(())
    }

    /// Seed the persisted record from `Default*` options in the skin file.
    fn read_default_settings(&mut self) {
        let config = &*self.config;
        let d = &mut self.settings;
        d.window_x = config.read_string(SKIN_SECTION, "DefaultWindowX", &d.window_x);
        d.window_y = config.read_string(SKIN_SECTION, "DefaultWindowY", &d.window_y);
        d.anchor_x = config.read_string(SKIN_SECTION, "DefaultAnchorX", &d.anchor_x);
        d.anchor_y = config.read_string(SKIN_SECTION, "DefaultAnchorY", &d.anchor_y);
        d.alpha = config
            .read_int(SKIN_SECTION, "DefaultAlphaValue", d.alpha as i32)
            .clamp(0, 255) as u8;
        d.fade_duration = config.read_uint(SKIN_SECTION, "DefaultFadeDuration", d.fade_duration);
        d.z_position = ZPosition::from_int(config.read_int(
            SKIN_SECTION,
            "DefaultAlwaysOnTop",
            0,
        ));
        d.hide_mode = HideMode::from_int(config.read_int(SKIN_SECTION, "DefaultHideOnMouseOver", 0));
        d.click_through = config.read_bool(SKIN_SECTION, "DefaultClickThrough", d.click_through);
        d.draggable = config.read_bool(SKIN_SECTION, "DefaultDraggable", d.draggable);
        d.snap_edges = config.read_bool(SKIN_SECTION, "DefaultSnapEdges", d.snap_edges);
        d.keep_on_screen = config.read_bool(SKIN_SECTION, "DefaultKeepOnScreen", d.keep_on_screen);
        d.auto_select_screen =
            config.read_bool(SKIN_SECTION, "DefaultAutoSelectScreen", d.auto_select_screen);
        d.start_hidden = config.read_bool(SKIN_SECTION, "DefaultStartHidden", d.start_hidden);
    }

    /// Persist the settings fields selected by `mask`.
    fn write_options(&mut self, mask: SettingFlags) {
        if mask.contains(SettingFlags::POSITION) && !self.settings.save_position {
            // Position saving can be turned off independently.
            if mask == SettingFlags::POSITION {
                return;
            }
        }
        self.settings_store
            .save(&self.folder_path, &self.settings, mask);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Meter wiring
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve `Container=` names to indices and build item lists. A
    /// container reference to an unknown or self meter is dropped with a
    /// warning.
    fn resolve_containers(&mut self) {
        let names: Vec<String> = self.meters.iter().map(|m| m.base().name.clone()).collect();
        for i in 0..self.meters.len() {
            let Some(target) = self.meters[i].base().container_name.clone() else {
                continue;
            };
            let index = names.iter().position(|n| n.eq_ignore_ascii_case(&target));
            match index {
                Some(j) if j != i => {
                    self.meters[i].base_mut().container_index = Some(j);
                    self.meters[j].base_mut().container_items.push(i);
                }
                _ => {
                    tracing::warn!(
                        skin = %self.folder_path,
                        meter = %names[i],
                        container = %target,
                        "container meter not found"
                    );
                    self.meters[i].base_mut().container_index = None;
                }
            }
        }
    }

    /// Assign each meter's relative-positioning back-reference: contained
    /// meters chain within their container, top-level meters chain across
    /// the previous top-level meter.
    fn update_relative_meters(&mut self) {
        let mut last_in_container: hashbrown::HashMap<usize, usize> = hashbrown::HashMap::new();
        let mut previous: Option<usize> = None;

        for i in 0..self.meters.len() {
            if let Some(container) = self.meters[i].base().container_index {
                let rel = last_in_container.get(&container).copied().unwrap_or(container);
                self.meters[i].base_mut().relative_index = Some(rel);
                last_in_container.insert(container, i);
                continue;
            }
            self.meters[i].base_mut().relative_index = previous;
            previous = Some(i);
        }
    }

    /// Resolve relative coordinates into absolute window-space positions, in
    /// registration order so a chain resolves in one pass.
    fn resolve_meter_positions(&mut self) {
        for i in 0..self.meters.len() {
            let (x_spec, y_spec, rel) = {
                let base = self.meters[i].base();
                (base.x, base.y, base.relative_index)
            };
            let rel_rect = rel.and_then(|r| (r < i).then(|| self.meters[r].base().rect()));

            let abs_x = match (x_spec.mode, rel_rect) {
                (RelativeMode::Absolute, _) | (_, None) => x_spec.value,
                (RelativeMode::TopLeft, Some(r)) => r.left + x_spec.value,
                (RelativeMode::BottomRight, Some(r)) => r.right + x_spec.value,
            };
            let abs_y = match (y_spec.mode, rel_rect) {
                (RelativeMode::Absolute, _) | (_, None) => y_spec.value,
                (RelativeMode::TopLeft, Some(r)) => r.top + y_spec.value,
                (RelativeMode::BottomRight, Some(r)) => r.bottom + y_spec.value,
            };

            let base = self.meters[i].base_mut();
            base.abs_x = abs_x;
            base.abs_y = abs_y;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Update cycle
    // ─────────────────────────────────────────────────────────────────────────

    /// One update tick: measures first (registration order), then meters,
    /// then a redraw when anything visible changed.
    pub fn update(&mut self, refresh: bool) {
        self.update_counter += 1;

        let mut pending_commands: Vec<String> = Vec::new();

        if !self.measures.is_empty() {
            // Shared pre-pass: sample the network tables once per tick.
            if self.has_net_measures {
                netstats::refresh();
            }

            for measure in &mut self.measures {
                if let Some(finish) = measure.poll_background() {
                    pending_commands.push(finish);
                }
                if measure.base().dynamic_variables && measure.base().will_update() {
                    let section = measure.base().name.clone();
                    measure.read_options(&*self.config, &section);
                }
                let tick = update_measure(measure.as_mut(), refresh);
                if tick.updated {
                    let base = measure.base();
                    if !base.on_update_action.is_empty() {
                        pending_commands.push(base.on_update_action.clone());
                    }
                    if tick.changed && !base.on_change_action.is_empty() {
                        pending_commands.push(base.on_change_action.clone());
                    }
                }
            }
        }

        // Meters only ever see the post-update snapshot: no stale reads
        // within a tick, and no value from a later measure's previous tick.
        let values = MeasureValues::snapshot(&self.measures);

        let mut any_transition = false;
        let mut any_update = false;
        for meter in &mut self.meters {
            if meter.base().dynamic_variables && meter.base().will_update() {
                let section = meter.base().name.clone();
                meter.read_options(&*self.config, &section);
            }
            if meter.base_mut().divider_fires(refresh) && meter.update(&values, &mut self.canvas) {
                any_update = true;
                let action = meter.base().on_update_action.clone();
                if !action.is_empty() {
                    pending_commands.push(action);
                }
            }
            if !any_transition && meter.has_active_transition() {
                any_transition = true;
            }
        }

        self.resolve_meter_positions();

        if any_update || self.resize_mode != ResizeMode::None || refresh {
            if self.dynamic_window_size {
                self.set_resize_mode(ResizeMode::Check);
            }
            if self.redraw_allowed {
                self.redraw();
            }
        }

        self.post_update(any_transition);

        if !self.on_update_action.is_empty() {
            pending_commands.push(self.on_update_action.clone());
        }
        for command in pending_commands {
            self.execute(&command);
        }
    }

    /// Start or stop the transition timer so animation cadence stays
    /// decoupled from the update cadence.
    fn post_update(&mut self, any_transition: bool) {
        if any_transition && !self.active_transition {
            let now = self.now();
            self.timers.set(
                TimerKind::Transition,
                Duration::from_millis(self.transition_interval.max(1) as u64),
                now,
            );
            self.active_transition = true;
        } else if self.active_transition && !any_transition {
            self.timers.kill(TimerKind::Transition);
            self.active_transition = false;
        }
    }

    fn set_resize_mode(&mut self, mode: ResizeMode) {
        // Never downgrade a pending full reset to a check.
        if mode == ResizeMode::None
            || self.resize_mode == ResizeMode::None
            || (self.resize_mode == ResizeMode::Check && mode == ResizeMode::Reset)
        {
            self.resize_mode = mode;
        }
    }

    /// Recompute the window size from the meters' extents (plus background
    /// margins). Returns whether the size changed.
    fn resize_window(&mut self, reset: bool) -> bool {
        let mut w = self.background_margins.left;
        let mut h = self.background_margins.top;
        for meter in &self.meters {
            let base = meter.base();
            if base.is_contained() || base.hidden {
                continue;
            }
            w = w.max(base.abs_x + base.w);
            h = h.max(base.abs_y + base.h);
        }
        w += self.background_margins.right;
        h += self.background_margins.bottom;

        if self.skin_w > 0 {
            w = self.skin_w;
        }
        if self.skin_h > 0 {
            h = self.skin_h;
        }

        if !reset && w == self.placement.window_w && h == self.placement.window_h {
            return false;
        }

        self.resize_count += 1;
        self.placement.window_w = w;
        self.placement.window_h = h;

        let layout = self.monitors();
        self.placement.window_to_screen(&layout);
        self.backend.set_size(w.max(0) as u32, h.max(0) as u32);
        self.backend
            .set_position(self.placement.screen_x, self.placement.screen_y);
        true
    }

    /// Paint the frame: background, meters in order (containers composited
    /// offscreen), selection overlay; then blit to the layered window.
    pub fn redraw(&mut self) {
        if self.resize_mode != ResizeMode::None {
            let reset = self.resize_mode == ResizeMode::Reset;
            self.resize_window(reset);
            self.resize_mode = ResizeMode::None;
        }

        let w = self.placement.window_w;
        let h = self.placement.window_h;
        // A zero dimension still needs a valid surface.
        let cx = if w == 0 { 1 } else { w.max(1) as u32 };
        let cy = if h == 0 { 1 } else { h.max(1) as u32 };
        if cx != self.canvas.width() || cy != self.canvas.height() {
            self.canvas.resize(cx, cy);
        }

        if !self.canvas.begin_draw() {
            return;
        }

        self.canvas.clear(Color::TRANSPARENT);

        if w != 0 && h != 0 {
            self.draw_background(w as f32, h as f32);

            for i in 0..self.meters.len() {
                if self.handle_container(i) {
                    continue;
                }
                let transform = self.meters[i].base().transform;
                if transform.is_identity() {
                    self.meters[i].draw(&mut self.canvas);
                } else {
                    self.canvas.set_transform(transform);
                    self.meters[i].draw(&mut self.canvas);
                    self.canvas.reset_transform();
                }
            }

            if self.selected {
                let c = self.selected_color;
                self.canvas.fill_rectangle(
                    RectF::new(0.0, 0.0, w as f32, h as f32),
                    Color::from_rgba8(c[0], c[1], c[2], c[3]),
                );
            }
        }

        self.present();
        self.canvas.end_draw();
    }

    fn draw_background(&mut self, w: f32, h: f32) {
        match self.background_mode {
            BackgroundMode::Image | BackgroundMode::ScaledImage | BackgroundMode::TiledImage => {
                self.ensure_background_loaded();
                let Some(background) = self.background.take() else {
                    return;
                };
                let dst = RectF::new(0.0, 0.0, w, h);
                let bw = background.width() as f32;
                let bh = background.height() as f32;
                let src = RectF::new(0.0, 0.0, bw, bh);
                match self.background_mode {
                    BackgroundMode::Image => self.canvas.draw_bitmap(&background, dst, src),
                    BackgroundMode::TiledImage => {
                        self.canvas.draw_tiled_bitmap(&background, dst, src);
                    }
                    _ => self.draw_scaled_background(&background, w, h),
                }
                self.background = Some(background);
            }
            BackgroundMode::Solid => {
                let rect = RectF::new(0.0, 0.0, w, h);
                let c1 = self.solid_color;
                let c2 = self.solid_color2;
                if c1[3] != 0 || c2[3] != 0 {
                    if c1 == c2 {
                        self.canvas
                            .clear(Color::from_rgba8(c1[0], c1[1], c1[2], c1[3]));
                    } else {
                        self.canvas.fill_gradient_rectangle(
                            rect,
                            Color::from_rgba8(c1[0], c1[1], c1[2], c1[3]),
                            Color::from_rgba8(c2[0], c2[1], c2[2], c2[3]),
                            self.solid_angle,
                        );
                    }
                }
                if self.bevel != BevelType::None {
                    let (mut light, mut dark) = (self.bevel_color, self.bevel_color2);
                    if self.bevel == BevelType::Down {
                        std::mem::swap(&mut light, &mut dark);
                    }
                    self.draw_bevel(rect, light, dark);
                }
            }
            BackgroundMode::Copy => {}
        }
    }

    /// Two-pixel bevel: light on the top/left edges, dark on the
    /// bottom/right.
    fn draw_bevel(&mut self, rect: RectF, light: [u8; 4], dark: [u8; 4]) {
        let light = Color::from_rgba8(light[0], light[1], light[2], light[3]);
        let dark = Color::from_rgba8(dark[0], dark[1], dark[2], dark[3]);
        let (l, t, r, b) = (rect.left, rect.top, rect.right - 1.0, rect.bottom - 1.0);
        self.canvas.draw_line(light, l, t, r, t, 1.0);
        self.canvas.draw_line(light, l, t, l, b, 1.0);
        self.canvas.draw_line(dark, l, b, r, b, 1.0);
        self.canvas.draw_line(dark, r, t, r, b, 1.0);
    }

    /// 9-slice scaled background: corners at natural size, edges stretched
    /// along one axis, center stretched along both.
    fn draw_scaled_background(&mut self, background: &SegmentedBitmap, w: f32, h: f32) {
        let m = self.background_margins;
        let (ml, mt, mr, mb) = (
            m.left as f32,
            m.top as f32,
            m.right as f32,
            m.bottom as f32,
        );
        let bw = background.width() as f32;
        let bh = background.height() as f32;

        let mut piece = |dst: RectF, src: RectF| {
            if dst.width() > 0.0 && dst.height() > 0.0 {
                self.canvas.draw_bitmap(background, dst, src);
            }
        };

        if mt > 0.0 {
            if ml > 0.0 {
                piece(
                    RectF::from_ltrb(0.0, 0.0, ml, mt),
                    RectF::from_ltrb(0.0, 0.0, ml, mt),
                );
            }
            piece(
                RectF::from_ltrb(ml, 0.0, w - mr, mt),
                RectF::from_ltrb(ml, 0.0, bw - mr, mt),
            );
            if mr > 0.0 {
                piece(
                    RectF::from_ltrb(w - mr, 0.0, w, mt),
                    RectF::from_ltrb(bw - mr, 0.0, bw, mt),
                );
            }
        }

        if ml > 0.0 {
            piece(
                RectF::from_ltrb(0.0, mt, ml, h - mb),
                RectF::from_ltrb(0.0, mt, ml, bh - mb),
            );
        }
        piece(
            RectF::from_ltrb(ml, mt, w - mr, h - mb),
            RectF::from_ltrb(ml, mt, bw - mr, bh - mb),
        );
        if mr > 0.0 {
            piece(
                RectF::from_ltrb(w - mr, mt, w, h - mb),
                RectF::from_ltrb(bw - mr, mt, bw, bh - mb),
            );
        }

        if mb > 0.0 {
            if ml > 0.0 {
                piece(
                    RectF::from_ltrb(0.0, h - mb, ml, h),
                    RectF::from_ltrb(0.0, bh - mb, ml, bh),
                );
            }
            piece(
                RectF::from_ltrb(ml, h - mb, w - mr, h),
                RectF::from_ltrb(ml, bh - mb, bw - mr, bh),
            );
            if mr > 0.0 {
                piece(
                    RectF::from_ltrb(w - mr, h - mb, w, h),
                    RectF::from_ltrb(bw - mr, bh - mb, bw, bh),
                );
            }
        }
    }

    fn ensure_background_loaded(&mut self) {
        if self.background.is_some() || self.background_name.is_empty() {
            return;
        }
        let path = std::path::Path::new(&self.folder_path).join(&self.background_name);
        match SegmentedBitmap::load_png(&path, self.canvas.max_bitmap_size()) {
            Ok(bitmap) => self.background = Some(bitmap),
            Err(err) => {
                tracing::warn!(skin = %self.folder_path, error = %err, "failed to load background");
                self.background_name.clear();
                self.background_mode = BackgroundMode::Copy;
            }
        }
    }

    /// Composite a container meter: children into a content texture, the
    /// container's own chrome into a second texture, then the content masked
    /// by the chrome's opacity at the container's rectangle.
    ///
    /// Returns `true` when the meter at `index` was fully handled here (it is
    /// contained in another meter, or it is a degenerate container).
    fn handle_container(&mut self, index: usize) -> bool {
        if self.meters[index].base().is_contained() {
            return true;
        }
        let items = self.meters[index].base().container_items.clone();
        if items.is_empty() {
            return false;
        }

        let rect = self.meters[index].base().rect();
        if rect.width() <= 0 || rect.height() <= 0 {
            return true;
        }
        let (w, h) = (rect.width() as u32, rect.height() as u32);

        let take_texture = |slot: &mut Option<RenderTexture>| match slot.take() {
            Some(t) if t.width() == w && t.height() == h => Some(t),
            _ => RenderTexture::new(w, h),
        };

        // Content: children translated so the container origin is (0, 0).
        let Some(content) = take_texture(&mut self.meters[index].base_mut().content_texture)
        else {
            return true;
        };
        let offset =
            tiny_skia::Transform::from_translate(-(rect.left as f32), -(rect.top as f32));

        self.canvas.set_target(content);
        self.canvas.clear(Color::TRANSPARENT);
        for &item in &items {
            let transform = self.meters[item].base().transform.post_concat(offset);
            self.canvas.set_transform(transform);
            self.meters[item].draw(&mut self.canvas);
            self.canvas.reset_transform();
        }
        let content = self.canvas.reset_target();

        // Chrome: the container's own visuals, same translation.
        let Some(chrome) = take_texture(&mut self.meters[index].base_mut().chrome_texture) else {
            return true;
        };
        self.canvas.set_target(chrome);
        self.canvas.clear(Color::TRANSPARENT);
        let transform = self.meters[index].base().transform.post_concat(offset);
        self.canvas.set_transform(transform);
        self.meters[index].draw(&mut self.canvas);
        self.canvas.reset_transform();
        let chrome = self.canvas.reset_target();

        let (Some(content), Some(chrome)) = (content, chrome) else {
            return true;
        };

        let content_bitmap = content.to_bitmap();
        let chrome_bitmap = chrome.to_bitmap();
        let destination = RectF::from_ltrb(
            rect.left as f32,
            rect.top as f32,
            rect.right as f32,
            rect.bottom as f32,
        );
        let src = RectF::new(
            0.0,
            0.0,
            chrome_bitmap.width() as f32,
            chrome_bitmap.height() as f32,
        );
        let src2 = RectF::new(
            0.0,
            0.0,
            content_bitmap.width() as f32,
            content_bitmap.height() as f32,
        );
        self.canvas
            .draw_masked_bitmap(&content_bitmap, &chrome_bitmap, destination, src, src2);

        let base = self.meters[index].base_mut();
        base.content_texture = Some(content);
        base.chrome_texture = Some(chrome);
        true
    }

    /// Blit the canvas to the layered window at the current transparency.
    fn present(&mut self) {
        let Skin {
            canvas, backend, transparency, ..
        } = self;
        canvas.with_raw_pixels(|pixels, w, h| {
            backend.present(pixels, w, h, *transparency);
        });
    }

    fn update_transparency(&mut self, alpha: u8) {
        self.transparency = alpha;
        self.backend.set_alpha(alpha);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fade
    // ─────────────────────────────────────────────────────────────────────────

    fn apply_pending_fade_duration(&mut self) {
        if let Some(duration) = self.new_fade_duration.take() {
            self.settings.fade_duration = duration;
            self.write_options(SettingFlags::FADE_DURATION);
        }
    }

    /// Fade the window alpha from `from` to `to` over the configured
    /// duration. Duration zero applies `to` synchronously with no timer.
    pub fn fade_window(&mut self, from: u8, to: u8) {
        self.apply_pending_fade_duration();

        if self.settings.fade_duration == 0 {
            if to == 0 {
                self.backend.set_visible(false);
            } else {
                self.update_transparency(to);
                if from == 0 && !self.hidden {
                    self.backend.set_visible(true);
                }
            }
            return;
        }

        self.fade_start_value = from;
        self.fade_end_value = to;
        self.fade_start_time = None;
        self.update_transparency(from);
        if from == 0 && !self.hidden {
            self.backend.set_visible(true);
        }
        self.active_fade = true;
        let now = self.now();
        self.timers.set(
            TimerKind::Fade,
            Duration::from_millis(INTERVAL_FADE as u64),
            now,
        );
    }

    fn on_fade_timer(&mut self) {
        // Fade steps may still be queued after the fade completed; ignore
        // them.
        if !self.active_fade {
            return;
        }

        let now = self.now();
        let start = *self.fade_start_time.get_or_insert(now);
        let elapsed = now.duration_since(start).as_millis() as u64;

        if elapsed > self.settings.fade_duration as u64 {
            self.active_fade = false;
            self.timers.kill(TimerKind::Fade);
            self.fade_start_time = None;
            if self.fade_end_value == 0 {
                self.backend.set_visible(false);
            } else {
                self.update_transparency(self.fade_end_value);
            }
        } else {
            let progress = elapsed as f64 / self.settings.fade_duration as f64;
            let value = self.fade_start_value as f64
                + progress * (self.fade_end_value as f64 - self.fade_start_value as f64);
            self.update_transparency(value.clamp(0.0, 255.0) as u8);
        }
    }

    pub fn hide_fade(&mut self) {
        self.hidden = true;
        if self.backend.is_visible() {
            self.fade_window(self.settings.alpha, 0);
        }
    }

    pub fn show_fade(&mut self) {
        self.hidden = false;
        self.fade_window(0, self.normal_alpha());
        if self.settings.z_position == ZPosition::OnTopMost {
            self.backend.set_z_position(ZPosition::OnTopMost);
        }
    }

    /// Target alpha outside hover interaction: opaque for the fade-out hover
    /// mode, the configured alpha otherwise.
    fn normal_alpha(&self) -> u8 {
        if self.settings.hide_mode == HideMode::FadeOut {
            255
        } else {
            self.settings.alpha
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blur
    // ─────────────────────────────────────────────────────────────────────────

    pub fn show_blur(&mut self) {
        self.blur_enabled = true;
        if self.blur_region.is_empty() {
            self.backend.set_blur_region(Some(&[]));
        } else {
            self.backend.set_blur_region(Some(&self.blur_region));
        }
    }

    pub fn hide_blur(&mut self) {
        self.blur_enabled = false;
        self.backend.set_blur_region(None);
    }

    pub fn is_blur(&self) -> bool {
        self.blur_enabled
    }

    /// Add or remove a `left,top,right,bottom` rectangle from the blur
    /// region.
    fn resize_blur(&mut self, arg: &str, add: bool) {
        let parts: Vec<i32> = arg
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .collect();
        if parts.len() != 4 {
            tracing::warn!(skin = %self.folder_path, arg, "malformed blur region");
            return;
        }
        let rect = RectI::new(parts[0], parts[1], parts[2], parts[3]);
        if add {
            self.blur_region.push(rect);
        } else {
            self.blur_region.retain(|r| r != &rect);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Fire all due timers. Returns the next pending deadline for the host's
    /// wait.
    pub fn pump(&mut self) -> Option<Instant> {
        let now = self.now();
        for kind in self.timers.due(now) {
            self.handle_event(SkinEvent::Timer(kind));
        }
        self.timers.next_deadline()
    }

    /// Single entry point for window events.
    pub fn handle_event(&mut self, event: SkinEvent) {
        match event {
            SkinEvent::Timer(kind) => self.on_timer(kind),
            SkinEvent::MouseMove { x, y, modifiers } => self.on_mouse_move(x, y, modifiers),
            SkinEvent::MouseLeave => self.on_mouse_leave(),
            SkinEvent::MouseButton {
                button,
                event,
                x,
                y,
                modifiers,
            } => self.on_mouse_button(button, event, x, y, modifiers),
            SkinEvent::MouseScroll {
                direction,
                x,
                y,
                modifiers,
            } => self.on_mouse_scroll(direction, x, y, modifiers),
            SkinEvent::Focus(gained) => {
                let action = if gained {
                    self.on_focus_action.clone()
                } else {
                    self.on_unfocus_action.clone()
                };
                if !gained {
                    // Deactivation sweeps hover state so re-entry re-fires.
                    self.on_mouse_leave();
                }
                self.execute(&action);
            }
            SkinEvent::Moved { x, y } => self.on_moved(x, y),
            SkinEvent::DisplayChange => {
                let layout = self.monitors();
                self.placement.window_to_screen(&layout);
                self.backend
                    .set_position(self.placement.screen_x, self.placement.screen_y);
            }
            SkinEvent::Wake => {
                let action = self.on_wake_action.clone();
                self.execute(&action);
            }
        }
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Update => self.update(false),
            TimerKind::MousePoll => self.on_mouse_poll(),
            TimerKind::Transition => {
                let still_active = self.meters.iter().any(|m| m.has_active_transition());
                if still_active {
                    self.redraw();
                } else {
                    self.timers.kill(TimerKind::Transition);
                    self.active_transition = false;
                }
            }
            TimerKind::Fade => self.on_fade_timer(),
            TimerKind::Deactivate => {
                // Never race a half-finished fade; the one-shot timer has
                // already disarmed itself, so re-arm a short retry instead.
                if self.fade_start_time.is_none() {
                    self.closed = true;
                } else {
                    let now = self.now();
                    self.timers.set_one_shot(
                        TimerKind::Deactivate,
                        Duration::from_millis(DEACTIVATE_GRACE_MS),
                        now,
                    );
                }
            }
            TimerKind::Delayed(id) => {
                self.timers.kill(TimerKind::Delayed(id));
                if let Some(command) = self.delayed_commands.remove(&id) {
                    self.execute(&command);
                }
            }
        }
    }

    /// Run `command` after `delay` milliseconds.
    pub fn do_delayed_command(&mut self, command: &str, delay: u32) {
        let id = self.next_delayed_id;
        self.next_delayed_id = self.next_delayed_id.wrapping_add(1);
        self.delayed_commands.insert(id, command.to_owned());
        let now = self.now();
        self.timers
            .set_one_shot(TimerKind::Delayed(id), Duration::from_millis(delay as u64), now);
    }

    /// Periodic hover maintenance: re-assert topmost, apply the hover hide
    /// mode, and run leave actions once the pointer is gone.
    fn on_mouse_poll(&mut self) {
        if self.dragging {
            return;
        }

        if self.settings.z_position == ZPosition::OnTopMost {
            self.backend.set_z_position(ZPosition::OnTopMost);
        }

        let inside = self
            .backend
            .cursor_position()
            .map(|(cx, cy)| {
                let local_x = cx - self.placement.screen_x;
                let local_y = cy - self.placement.screen_y;
                self.hit_test(local_x, local_y)
            })
            .unwrap_or(false);

        if self.mouse_over && !inside {
            self.on_mouse_leave();
        }

        match self.settings.hide_mode {
            HideMode::None => {
                if !self.hidden && (self.transparency == 0 || !self.backend.is_visible()) {
                    self.backend.set_visible(true);
                    self.fade_window(0, self.settings.alpha);
                }
            }
            HideMode::Hide => {
                if !self.hidden && !inside && !self.backend.is_visible() {
                    self.backend.set_visible(true);
                    self.fade_window(0, self.settings.alpha);
                }
                if inside && self.backend.is_visible() {
                    self.backend.set_visible(false);
                }
            }
            HideMode::FadeIn => {
                if inside {
                    if self.transparency == self.settings.alpha && self.settings.alpha != 255 {
                        self.fade_window(self.settings.alpha, 255);
                    }
                } else if self.transparency == 255 && self.settings.alpha != 255 {
                    self.fade_window(255, self.settings.alpha);
                }
            }
            HideMode::FadeOut => {
                if inside {
                    if self.transparency == 255 && self.settings.alpha != 255 {
                        self.fade_window(255, self.settings.alpha);
                    }
                } else if self.transparency == self.settings.alpha && self.settings.alpha != 255 {
                    self.fade_window(self.settings.alpha, 255);
                }
            }
        }
    }

    /// Whether the point (window-local) lands on visible skin content.
    pub fn hit_test(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.canvas.width() as i32 || y >= self.canvas.height() as i32 {
            return false;
        }
        !self.canvas.is_transparent_pixel(x, y)
    }

    fn on_mouse_move(&mut self, x: i32, y: i32, modifiers: Modifiers) {
        // Click-through suppresses processing unless a modifier re-arms it.
        if self.settings.click_through && !modifiers.any() {
            return;
        }

        let mut commands: Vec<String> = Vec::new();

        if !self.mouse_over {
            self.mouse_over = true;
            if let Some(action) = self.mouse.action(MouseActionKind::Over) {
                commands.push(action.to_owned());
            }
        }

        for meter in self.meters.iter_mut().rev() {
            let hit = meter.hit_test(x, y);
            let base = meter.base_mut();
            if hit && !base.mouse_over {
                if base.mouse.has_action(MouseActionKind::Over)
                    || base.mouse.has_action(MouseActionKind::Leave)
                {
                    base.mouse_over = true;
                    if let Some(action) = base.mouse.action(MouseActionKind::Over) {
                        commands.push(action.to_owned());
                    }
                }
            } else if !hit && base.mouse_over {
                base.mouse_over = false;
                if let Some(action) = base.mouse.action(MouseActionKind::Leave) {
                    commands.push(action.to_owned());
                }
            }
        }

        for command in commands {
            self.execute(&command);
        }
    }

    /// Leave-all sweep. Runs each hovered meter's leave action and the
    /// skin's own, and clears the hover flags so the next entry re-fires.
    fn on_mouse_leave(&mut self) {
        let mut commands: Vec<String> = Vec::new();

        for meter in self.meters.iter_mut().rev() {
            let base = meter.base_mut();
            if base.mouse_over {
                base.mouse_over = false;
                if let Some(action) = base.mouse.action(MouseActionKind::Leave) {
                    commands.push(action.to_owned());
                }
            }
        }

        if self.mouse_over {
            self.mouse_over = false;
            if let Some(action) = self.mouse.action(MouseActionKind::Leave) {
                commands.push(action.to_owned());
            }
        }

        for command in commands {
            self.execute(&command);
        }
    }

    fn on_mouse_button(
        &mut self,
        button: MouseButton,
        event: ButtonEvent,
        x: i32,
        y: i32,
        modifiers: Modifiers,
    ) {
        if self.settings.click_through && !modifiers.any() {
            return;
        }
        let kind = match (button, event) {
            (MouseButton::Left, ButtonEvent::Down) => MouseActionKind::LeftDown,
            (MouseButton::Left, ButtonEvent::Up) => MouseActionKind::LeftUp,
            (MouseButton::Left, ButtonEvent::DoubleClick) => MouseActionKind::LeftDoubleClick,
            (MouseButton::Right, ButtonEvent::Down) => MouseActionKind::RightDown,
            (MouseButton::Right, ButtonEvent::Up) => MouseActionKind::RightUp,
            (MouseButton::Right, ButtonEvent::DoubleClick) => MouseActionKind::RightDoubleClick,
            (MouseButton::Middle, ButtonEvent::Down) => MouseActionKind::MiddleDown,
            (MouseButton::Middle, ButtonEvent::Up) => MouseActionKind::MiddleUp,
            (MouseButton::Middle, ButtonEvent::DoubleClick) => MouseActionKind::MiddleDoubleClick,
            (MouseButton::X1, ButtonEvent::Down) => MouseActionKind::X1Down,
            (MouseButton::X1, ButtonEvent::Up) => MouseActionKind::X1Up,
            (MouseButton::X1, ButtonEvent::DoubleClick) => MouseActionKind::X1DoubleClick,
            (MouseButton::X2, ButtonEvent::Down) => MouseActionKind::X2Down,
            (MouseButton::X2, ButtonEvent::Up) => MouseActionKind::X2Up,
            (MouseButton::X2, ButtonEvent::DoubleClick) => MouseActionKind::X2DoubleClick,
        };
        self.do_action(x, y, kind);
    }

    fn on_mouse_scroll(
        &mut self,
        direction: ScrollDirection,
        x: i32,
        y: i32,
        modifiers: Modifiers,
    ) {
        if self.settings.click_through && !modifiers.any() {
            return;
        }
        let kind = match direction {
            ScrollDirection::Up => MouseActionKind::ScrollUp,
            ScrollDirection::Down => MouseActionKind::ScrollDown,
            ScrollDirection::Left => MouseActionKind::ScrollLeft,
            ScrollDirection::Right => MouseActionKind::ScrollRight,
        };
        self.do_action(x, y, kind);
    }

    /// Resolve and run the action for a pointer event: meters topmost-first
    /// (the frontmost hit meter claims it), then the skin's own table.
    /// Returns whether an action ran.
    pub fn do_action(&mut self, x: i32, y: i32, kind: MouseActionKind) -> bool {
        let mut command: Option<String> = None;

        for meter in self.meters.iter().rev() {
            if meter.base().hidden {
                continue;
            }
            if meter.base().mouse.has_action(kind) && meter.hit_test(x, y) {
                command = meter.base().mouse.action(kind).map(str::to_owned);
                break;
            }
        }

        if command.is_none() && self.mouse.has_action(kind) && self.hit_test(x, y) {
            command = self.mouse.action(kind).map(str::to_owned);
        }

        match command {
            Some(command) => {
                self.execute(&command);
                true
            }
            None => false,
        }
    }

    fn on_moved(&mut self, x: i32, y: i32) {
        self.placement.screen_x = x;
        self.placement.screen_y = y;
        let layout = self.monitors();
        if self.placement.screen_to_window(&layout) {
            tracing::debug!(skin = %self.folder_path, "monitor assignment changed");
        }
        if !self.dragging {
            self.save_position_if_appropriate();
        }
    }

    /// Adjust a prospective move position: snapping (unless Ctrl/Shift is
    /// held) against `neighbors` and the chosen monitor's work area, then
    /// keep-on-screen clamping.
    pub fn on_window_pos_changing(
        &mut self,
        x: &mut i32,
        y: &mut i32,
        neighbors: &[RectI],
        modifiers: Modifiers,
    ) {
        let layout = self.monitors();
        let (w, h) = (self.placement.window_w, self.placement.window_h);

        if self.settings.snap_edges && !(modifiers.ctrl || modifiers.shift) {
            for neighbor in neighbors {
                position::snap_to_window(x, y, w, h, neighbor);
            }
            position::snap_to_work_area(x, y, w, h, &layout);
        }

        if self.settings.keep_on_screen {
            position::map_coords_to_screen(x, y, w, h, &layout);
        }
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        let was = self.dragging;
        self.dragging = dragging;
        if was && !dragging {
            self.save_position_if_appropriate();
        }
    }

    fn save_position_if_appropriate(&mut self) {
        if self.settings.save_position {
            self.settings.window_x = self.placement.window_x.clone();
            self.settings.window_y = self.placement.window_y.clone();
            self.write_options(SettingFlags::POSITION);
        }
    }

    /// Move the window to an absolute position.
    pub fn move_window(&mut self, x: i32, y: i32) {
        self.backend.set_position(x, y);
        self.on_moved(x, y);
    }
}
