//! Window-backend abstraction
//!
//! The engine drives one OS window per skin through this trait; concrete
//! backends (layered Win32 windows, Wayland layer-shell surfaces, ...) live
//! in the hosting application. [`HeadlessWindow`] is the reference backend
//! used for embedding without a display and for tests.

use lamina_core::RectI;
use lamina_core::settings::ZPosition;

use crate::monitor::MonitorLayout;

/// One skin's window.
pub trait WindowBackend {
    fn set_position(&mut self, x: i32, y: i32);
    fn set_size(&mut self, width: u32, height: u32);

    /// Show or hide without affecting the stored alpha.
    fn set_visible(&mut self, visible: bool);
    fn is_visible(&self) -> bool;

    /// Push the rendered RGBA canvas contents to the screen as a translucent
    /// layered window at the given whole-window alpha.
    fn present(&mut self, pixels: &[u8], width: u32, height: u32, alpha: u8);

    /// Re-apply the window alpha using the previously presented contents.
    fn set_alpha(&mut self, alpha: u8);

    fn set_z_position(&mut self, z: ZPosition);
    fn set_click_through(&mut self, enabled: bool);

    /// Compositor blur behind the window, restricted to `region` when given.
    fn set_blur_region(&mut self, region: Option<&[RectI]>);

    fn monitors(&self) -> MonitorLayout;

    /// Current global cursor position, when the backend can query it.
    fn cursor_position(&self) -> Option<(i32, i32)> {
        None
    }
}

/// Display-less backend: stores everything it is told, renders nowhere.
pub struct HeadlessWindow {
    layout: MonitorLayout,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
    pub alpha: u8,
    pub z_position: ZPosition,
    pub click_through: bool,
    pub blur_region: Option<Vec<RectI>>,
    pub present_count: u64,
    /// Last presented frame, kept for pixel inspection.
    pub last_frame: Option<Vec<u8>>,
    /// Simulated global cursor position for hover tests.
    pub cursor: Option<(i32, i32)>,
}

impl HeadlessWindow {
    pub fn new(layout: MonitorLayout) -> Self {
        Self {
            layout,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            visible: false,
            alpha: 255,
            z_position: ZPosition::Normal,
            click_through: false,
            blur_region: None,
            present_count: 0,
            last_frame: None,
            cursor: None,
        }
    }
}

impl Default for HeadlessWindow {
    fn default() -> Self {
        Self::new(MonitorLayout::single())
    }
}

impl WindowBackend for HeadlessWindow {
    fn set_position(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn present(&mut self, pixels: &[u8], width: u32, height: u32, alpha: u8) {
        self.width = width;
        self.height = height;
        self.alpha = alpha;
        self.present_count += 1;
        self.last_frame = Some(pixels.to_vec());
    }

    fn set_alpha(&mut self, alpha: u8) {
        self.alpha = alpha;
    }

    fn set_z_position(&mut self, z: ZPosition) {
        self.z_position = z;
    }

    fn set_click_through(&mut self, enabled: bool) {
        self.click_through = enabled;
    }

    fn set_blur_region(&mut self, region: Option<&[RectI]>) {
        self.blur_region = region.map(|r| r.to_vec());
    }

    fn monitors(&self) -> MonitorLayout {
        self.layout.clone()
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        self.cursor
    }
}
