//! Shared harness for engine integration tests: in-memory services plus a
//! headless window that tests can keep inspecting after the skin takes
//! ownership.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use lamina_core::settings::{MemorySettingsStore, SettingsStore, SkinSettings};
use lamina_core::{MemoryConfig, RecordingExecutor, RectI, SettingFlags};
use lamina_engine::clock::ManualClock;
use lamina_engine::monitor::{MonitorInfo, MonitorLayout};
use lamina_engine::skin::{Skin, SkinServices};
use lamina_engine::window::{HeadlessWindow, WindowBackend};
use lamina_engine::{GraphicsHandle, MeasureRegistry, MeterRegistry};

pub const SKIN_FOLDER: &str = "TestSkins\\Widget";
pub const SKIN_FILE: &str = "Widget.ini";

/// Settings store that stays inspectable after the skin takes it.
#[derive(Clone, Default)]
pub struct SharedStore(pub Rc<RefCell<MemorySettingsStore>>);

impl SettingsStore for SharedStore {
    fn load(&self, skin_key: &str) -> SkinSettings {
        self.0.borrow().load(skin_key)
    }

    fn save(&mut self, skin_key: &str, settings: &SkinSettings, mask: SettingFlags) {
        self.0.borrow_mut().save(skin_key, settings, mask);
    }
}

/// Window backend that stays inspectable after the skin takes it.
#[derive(Clone)]
pub struct SharedWindow(pub Rc<RefCell<HeadlessWindow>>);

impl SharedWindow {
    pub fn new(layout: MonitorLayout) -> Self {
        Self(Rc::new(RefCell::new(HeadlessWindow::new(layout))))
    }
}

impl WindowBackend for SharedWindow {
    fn set_position(&mut self, x: i32, y: i32) {
        self.0.borrow_mut().set_position(x, y);
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.0.borrow_mut().set_size(width, height);
    }

    fn set_visible(&mut self, visible: bool) {
        self.0.borrow_mut().set_visible(visible);
    }

    fn is_visible(&self) -> bool {
        self.0.borrow().is_visible()
    }

    fn present(&mut self, pixels: &[u8], width: u32, height: u32, alpha: u8) {
        self.0.borrow_mut().present(pixels, width, height, alpha);
    }

    fn set_alpha(&mut self, alpha: u8) {
        self.0.borrow_mut().set_alpha(alpha);
    }

    fn set_z_position(&mut self, z: lamina_core::settings::ZPosition) {
        self.0.borrow_mut().set_z_position(z);
    }

    fn set_click_through(&mut self, enabled: bool) {
        self.0.borrow_mut().set_click_through(enabled);
    }

    fn set_blur_region(&mut self, region: Option<&[RectI]>) {
        self.0.borrow_mut().set_blur_region(region);
    }

    fn monitors(&self) -> MonitorLayout {
        self.0.borrow().monitors()
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        self.0.borrow().cursor_position()
    }
}

pub struct Harness {
    pub skin: Skin,
    pub window: Rc<RefCell<HeadlessWindow>>,
    pub store: Rc<RefCell<MemorySettingsStore>>,
    pub executor: Arc<RecordingExecutor>,
    pub clock: Rc<ManualClock>,
}

pub fn dual_layout() -> MonitorLayout {
    MonitorLayout::new(
        vec![
            MonitorInfo::new("Left", RectI::from_xywh(0, 0, 1920, 1080))
                .with_work_area(RectI::from_xywh(0, 0, 1920, 1040)),
            MonitorInfo::new("Right", RectI::from_xywh(1920, 0, 1280, 1024)),
        ],
        1,
    )
}

/// Build a skin over in-memory services. The skin is not yet activated.
pub fn build_skin(config: MemoryConfig, settings: SkinSettings) -> Harness {
    build_skin_with(config, settings, MonitorLayout::single(), |_, _| {})
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a skin, customizing the monitor layout and registries.
pub fn build_skin_with(
    config: MemoryConfig,
    settings: SkinSettings,
    layout: MonitorLayout,
    register: impl FnOnce(&mut MeterRegistry, &mut MeasureRegistry),
) -> Harness {
    init_tracing();
    let store = SharedStore(Rc::new(RefCell::new(
        MemorySettingsStore::new().with_record(SKIN_FOLDER, settings),
    )));
    let store_handle = Rc::clone(&store.0);

    let window = SharedWindow::new(layout);
    let window_handle = Rc::clone(&window.0);

    let executor = Arc::new(RecordingExecutor::new());
    let clock = Rc::new(ManualClock::new());

    let mut meter_registry = MeterRegistry::with_builtins();
    let mut measure_registry = MeasureRegistry::with_builtins();
    register(&mut meter_registry, &mut measure_registry);

    let services = SkinServices {
        config: Box::new(config),
        settings: Box::new(store),
        executor: executor.clone(),
        backend: Box::new(window),
        graphics: GraphicsHandle::acquire(false).expect("software rasterizer always available"),
        clock: clock.clone(),
        meter_registry,
        measure_registry,
    };

    let skin = Skin::new(SKIN_FOLDER, SKIN_FILE, services).expect("render target");
    Harness {
        skin,
        window: window_handle,
        store: store_handle,
        executor,
        clock,
    }
}

/// A minimal valid configuration: one fixed-size bar meter.
pub fn minimal_config() -> MemoryConfig {
    let mut config = MemoryConfig::new();
    config.set("MeterA", "Meter", "Bar");
    config.set("MeterA", "W", "200");
    config.set("MeterA", "H", "100");
    config
}
