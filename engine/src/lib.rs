//! Lamina Engine
//!
//! Per-skin rendering and update runtime for desktop skins.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     skin/                           │
//! │     Skin runtime: update → redraw cycle, bangs,     │
//! │        fade, timers, container compositing          │
//! ├──────────────────────────┬──────────────────────────┤
//! │        meters/           │        measures/         │
//! │  Text, Bar, Image, Panel │ Clock, Counter, Net,     │
//! │                          │ Probe                    │
//! ├──────────────────────────┴──────────────────────────┤
//! │              meter / measure / mouse                │
//! │        (capability contracts + registries)          │
//! ├─────────────────────────────────────────────────────┤
//! │                    canvas/                          │
//! │      tiny-skia + cosmic-text drawing surface,       │
//! │        segmented bitmaps, shared device stack       │
//! ├─────────────────────────────────────────────────────┤
//! │          position / monitor / window / timer        │
//! │   (geometry solver, multi-monitor model, backend)   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The hosting application supplies the pieces behind the `lamina-core`
//! contracts (configuration parser, settings store, command interpreter) and
//! a concrete [`window::WindowBackend`], then drives each [`skin::Skin`]
//! from its message loop.

pub mod canvas;
pub mod clock;
pub mod measure;
pub mod measures;
pub mod meter;
pub mod meters;
pub mod monitor;
pub mod mouse;
pub mod position;
pub mod skin;
pub mod timer;
pub mod window;

pub use canvas::{Canvas, CanvasError, GraphicsHandle, RectF};
pub use measure::{Measure, MeasureRegistry};
pub use meter::{Meter, MeterRegistry};
pub use monitor::{MonitorInfo, MonitorLayout};
pub use position::{SNAP_DISTANCE, WindowPlacement};
pub use skin::{Bang, Skin, SkinError, SkinEvent, SkinServices, SkinState};
pub use timer::TimerKind;
pub use window::{HeadlessWindow, WindowBackend};
