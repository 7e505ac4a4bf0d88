//! Drawing surface and shared graphics stack
//!
//! One [`Canvas`] per skin wraps the window-sized target bitmap and the
//! drawing-session state; the rasterizer stack (device, font system, glyph
//! cache) is shared process-wide through [`GraphicsHandle`] and torn down
//! when the last handle drops.

pub mod bitmap;
pub mod text;

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::{Rc, Weak};

use thiserror::Error;
use tiny_skia::{
    Color, FilterQuality, GradientStop, LinearGradient, Mask, MaskType, Paint, Path as SkiaPath,
    Pixmap, PixmapPaint, SpreadMode, Transform,
};

use crate::canvas::bitmap::{SegmentedBitmap, mask_segment_skipped, rect_sub_region, tile_draws};
use crate::canvas::text::{GlyphClip, TextFormat, TextMetrics};

/// Maximum texture dimension of the software rasterizer. Larger bitmaps are
/// split into segments of this stride.
pub const SOFTWARE_MAX_BITMAP_SIZE: u32 = 8192;

/// Float rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RectF {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl RectF {
    /// Build from position and size.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + w,
            bottom: y + h,
        }
    }

    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    fn to_skia(self) -> Option<tiny_skia::Rect> {
        tiny_skia::Rect::from_ltrb(self.left, self.top, self.right, self.bottom)
    }
}

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("no rendering device available on this host")]
    DeviceUnavailable,

    #[error("failed to create {width}x{height} render target")]
    TargetCreation { width: u32, height: u32 },

    #[error("no render target; call init_render_target first")]
    NoTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceKind {
    /// GPU-backed device. Not available in this build; hosting applications
    /// with a hardware rasterizer slot it in here.
    Hardware,
    /// tiny-skia CPU rasterizer.
    Software,
}

struct Device {
    kind: DeviceKind,
    max_bitmap_size: u32,
    lost: Cell<bool>,
}

impl Device {
    fn create(prefer_hardware: bool) -> Result<Device, CanvasError> {
        if prefer_hardware {
            match Self::probe_hardware() {
                Ok(device) => return Ok(device),
                Err(err) => {
                    tracing::debug!(error = %err, "hardware device unavailable, using software rasterizer");
                }
            }
        }
        Ok(Device {
            kind: DeviceKind::Software,
            max_bitmap_size: SOFTWARE_MAX_BITMAP_SIZE,
            lost: Cell::new(false),
        })
    }

    fn probe_hardware() -> Result<Device, CanvasError> {
        // No GPU stack is linked into this build.
        Err(CanvasError::DeviceUnavailable)
    }
}

struct SharedGraphics {
    device: Device,
    font_system: cosmic_text::FontSystem,
    swash_cache: cosmic_text::SwashCache,
}

thread_local! {
    static SHARED: RefCell<Weak<RefCell<SharedGraphics>>> = RefCell::new(Weak::new());
}

/// Handle to the shared graphics stack. The stack is created by the first
/// [`GraphicsHandle::acquire`] and torn down when the last handle drops.
#[derive(Clone)]
pub struct GraphicsHandle {
    inner: Rc<RefCell<SharedGraphics>>,
}

impl GraphicsHandle {
    /// Acquire the shared stack, initializing it on first use. With
    /// `prefer_hardware` the hardware device is probed first; the software
    /// rasterizer is the fallback. Fails only when no device at all can be
    /// created.
    pub fn acquire(prefer_hardware: bool) -> Result<Self, CanvasError> {
        SHARED.with(|slot| {
            if let Some(existing) = slot.borrow().upgrade() {
                return Ok(Self { inner: existing });
            }
            let device = Device::create(prefer_hardware)?;
            let hardware = device.kind == DeviceKind::Hardware;
            tracing::debug!(
                hardware,
                max_bitmap_size = device.max_bitmap_size,
                "initialized graphics stack"
            );
            let shared = Rc::new(RefCell::new(SharedGraphics {
                device,
                font_system: cosmic_text::FontSystem::new(),
                swash_cache: cosmic_text::SwashCache::new(),
            }));
            *slot.borrow_mut() = Rc::downgrade(&shared);
            Ok(Self { inner: shared })
        })
    }

    /// Number of live handles sharing the stack.
    pub fn instance_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    pub fn max_bitmap_size(&self) -> u32 {
        self.inner.borrow().device.max_bitmap_size
    }

    /// Register a skin-local font file with the shared font database.
    pub fn load_font_file(&self, path: &Path) -> std::io::Result<()> {
        self.inner
            .borrow_mut()
            .font_system
            .db_mut()
            .load_font_file(path)
    }

    /// Installed font family names, for diagnostics and option validation.
    pub fn font_families(&self) -> Vec<String> {
        let shared = self.inner.borrow();
        let db: &fontdb::Database = shared.font_system.db();
        let mut families: Vec<String> = db
            .faces()
            .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
            .collect();
        families.sort();
        families.dedup();
        families
    }

    pub(crate) fn mark_device_lost(&self) {
        self.inner.borrow().device.lost.set(true);
    }

    fn take_device_lost(&self) -> bool {
        self.inner.borrow().device.lost.replace(false)
    }
}

/// Offscreen render texture used for container compositing.
#[derive(Debug)]
pub struct RenderTexture {
    pixmap: Pixmap,
}

impl RenderTexture {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Pixmap::new(width.max(1), height.max(1)).map(|pixmap| Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Single-segment bitmap view of this texture, for masked composition.
    pub fn to_bitmap(&self) -> SegmentedBitmap {
        SegmentedBitmap::from_rgba(
            self.pixmap.data(),
            self.pixmap.width(),
            self.pixmap.height(),
            SOFTWARE_MAX_BITMAP_SIZE,
        )
        .expect("texture dimensions are always valid")
    }
}

/// One skin's drawing surface.
pub struct Canvas {
    graphics: GraphicsHandle,
    target: Option<Pixmap>,
    offscreen: Option<RenderTexture>,
    width: u32,
    height: u32,
    transform: Transform,
    can_use_axis_align_clip: bool,
    anti_alias: bool,
    accurate_text: bool,
    is_drawing: bool,
    resume_after_raw: bool,
}

impl Canvas {
    pub fn new(graphics: GraphicsHandle) -> Self {
        Self {
            graphics,
            target: None,
            offscreen: None,
            width: 0,
            height: 0,
            transform: Transform::identity(),
            can_use_axis_align_clip: true,
            anti_alias: true,
            accurate_text: false,
            is_drawing: false,
            resume_after_raw: false,
        }
    }

    /// Create the initial 1x1 target bitmap for the window surface.
    pub fn init_render_target(&mut self) -> Result<(), CanvasError> {
        self.width = 1;
        self.height = 1;
        self.target = Some(Pixmap::new(1, 1).ok_or(CanvasError::TargetCreation {
            width: 1,
            height: 1,
        })?);
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn max_bitmap_size(&self) -> u32 {
        self.graphics.max_bitmap_size()
    }

    /// Rebuild the target at the new size. A zero dimension degrades to 1
    /// rather than producing an invalid surface; oversized requests are
    /// truncated to the device limit.
    pub fn resize(&mut self, w: u32, h: u32) {
        let max = self.graphics.max_bitmap_size();
        let w = w.min(max);
        let h = h.min(max);
        self.width = w;
        self.height = h;
        self.target = Pixmap::new(w.max(1), h.max(1));
    }

    /// Open a drawing session, recreating the target if it was dropped after
    /// a device loss. Returns whether drawing can proceed.
    pub fn begin_draw(&mut self) -> bool {
        if self.target.is_none() {
            let (w, h) = (self.width.max(1), self.height.max(1));
            self.target = Pixmap::new(w, h);
            if self.target.is_none() {
                self.is_drawing = false;
                return false;
            }
        }
        self.is_drawing = true;
        true
    }

    /// Close the drawing session. A fatal device status drops the target so
    /// the next `begin_draw` recreates it.
    pub fn end_draw(&mut self) {
        if self.graphics.take_device_lost() {
            self.target = None;
        }
        self.is_drawing = false;
    }

    pub fn is_drawing(&self) -> bool {
        self.is_drawing
    }

    /// Raw access to the target pixels. Mutually exclusive with an open
    /// drawing session: an active session is ended first and resumed when the
    /// closure returns.
    pub fn with_raw_pixels<R>(&mut self, f: impl FnOnce(&mut [u8], u32, u32) -> R) -> Option<R> {
        if self.is_drawing {
            self.resume_after_raw = true;
            self.end_draw();
        }
        let result = match self.target.as_mut() {
            Some(target) => {
                let (w, h) = (target.width(), target.height());
                Some(f(target.data_mut(), w, h))
            }
            None => None,
        };
        if self.resume_after_raw {
            self.resume_after_raw = false;
            self.begin_draw();
        }
        result
    }

    /// Whether the pixel at (x, y) is fully transparent. Out-of-bounds
    /// coordinates report opaque.
    pub fn is_transparent_pixel(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        let Some(target) = self.target.as_ref() else {
            return false;
        };
        let idx = ((y as u32 * target.width() + x as u32) * 4 + 3) as usize;
        target.data().get(idx).copied() == Some(0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transform and state
    // ─────────────────────────────────────────────────────────────────────────

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Set the current transform, caching whether it is one of the four
    /// axis-aligned rotations (the trimmed-text clip fast path).
    pub fn set_transform(&mut self, t: Transform) {
        self.transform = t;
        self.can_use_axis_align_clip = (t.sx == 1.0 && t.ky == 0.0 && t.kx == 0.0 && t.sy == 1.0)
            || (t.sx == 0.0 && t.ky == 1.0 && t.kx == -1.0 && t.sy == 0.0)
            || (t.sx == -1.0 && t.ky == 0.0 && t.kx == 0.0 && t.sy == -1.0)
            || (t.sx == 0.0 && t.ky == -1.0 && t.kx == 1.0 && t.sy == 0.0);
    }

    pub fn reset_transform(&mut self) {
        self.set_transform(Transform::identity());
    }

    pub fn set_anti_aliasing(&mut self, enable: bool) {
        self.anti_alias = enable;
    }

    pub fn set_accurate_text(&mut self, enable: bool) {
        self.accurate_text = enable;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Offscreen targets (container compositing)
    // ─────────────────────────────────────────────────────────────────────────

    /// Redirect drawing into `texture` until `reset_target`.
    pub fn set_target(&mut self, texture: RenderTexture) {
        self.offscreen = Some(texture);
    }

    /// Restore drawing to the window target, returning the redirected
    /// texture.
    pub fn reset_target(&mut self) -> Option<RenderTexture> {
        self.offscreen.take()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Primitives
    // ─────────────────────────────────────────────────────────────────────────

    pub fn clear(&mut self, color: Color) {
        let Some(pixmap) = active_pixmap(&mut self.offscreen, &mut self.target) else {
            return;
        };
        pixmap.fill(color);
    }

    pub fn fill_rectangle(&mut self, rect: RectF, color: Color) {
        let transform = self.transform;
        let anti_alias = self.anti_alias;
        let Some(pixmap) = active_pixmap(&mut self.offscreen, &mut self.target) else {
            return;
        };
        let Some(r) = rect.to_skia() else { return };
        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = anti_alias;
        pixmap.fill_rect(r, &paint, transform, None);
    }

    /// Gradient rectangle. The start point projects `angle + 180°` onto the
    /// rectangle edge and the end point projects `angle`, so the first color
    /// stop sits opposite the angle direction (legacy rasterizer behavior).
    pub fn fill_gradient_rectangle(&mut self, rect: RectF, color1: Color, color2: Color, angle: f32) {
        let transform = self.transform;
        let anti_alias = self.anti_alias;
        let Some(pixmap) = active_pixmap(&mut self.offscreen, &mut self.target) else {
            return;
        };
        let Some(r) = rect.to_skia() else { return };
        let start = find_edge_point(angle + 180.0, rect);
        let end = find_edge_point(angle, rect);
        let stops = vec![
            GradientStop::new(0.0, color1),
            GradientStop::new(1.0, color2),
        ];
        // Degenerate gradients (zero-area rect) fail to build; skip the draw.
        let Some(shader) = LinearGradient::new(start, end, stops, SpreadMode::Pad, Transform::identity())
        else {
            return;
        };
        let mut paint = Paint::default();
        paint.shader = shader;
        paint.anti_alias = anti_alias;
        pixmap.fill_rect(r, &paint, transform, None);
    }

    pub fn draw_line(&mut self, color: Color, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        let transform = self.transform;
        let anti_alias = self.anti_alias;
        let Some(pixmap) = active_pixmap(&mut self.offscreen, &mut self.target) else {
            return;
        };
        let mut pb = tiny_skia::PathBuilder::new();
        pb.move_to(x1, y1);
        pb.line_to(x2, y2);
        let Some(path) = pb.finish() else { return };
        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = anti_alias;
        let stroke = tiny_skia::Stroke {
            width,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, transform, None);
    }

    /// Fill and/or stroke a path translated to (x, y), composed with the
    /// current transform.
    pub fn draw_path(
        &mut self,
        path: &SkiaPath,
        fill: Option<Color>,
        stroke: Option<(Color, f32)>,
        x: f32,
        y: f32,
    ) {
        let transform = Transform::from_translate(x, y).post_concat(self.transform);
        let anti_alias = self.anti_alias;
        let Some(pixmap) = active_pixmap(&mut self.offscreen, &mut self.target) else {
            return;
        };
        if let Some(color) = fill {
            let mut paint = Paint::default();
            paint.set_color(color);
            paint.anti_alias = anti_alias;
            pixmap.fill_path(path, &paint, tiny_skia::FillRule::Winding, transform, None);
        }
        if let Some((color, width)) = stroke {
            let mut paint = Paint::default();
            paint.set_color(color);
            paint.anti_alias = anti_alias;
            let s = tiny_skia::Stroke {
                width,
                ..Default::default()
            };
            pixmap.stroke_path(path, &paint, &s, transform, None);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bitmaps
    // ─────────────────────────────────────────────────────────────────────────

    /// Draw `src` of the bitmap into `dst`, one draw call per overlapped
    /// segment.
    pub fn draw_bitmap(&mut self, bmp: &SegmentedBitmap, dst: RectF, src: RectF) {
        let transform = self.transform;
        let draws = bmp.draws(dst, src);
        let Some(pixmap) = active_pixmap(&mut self.offscreen, &mut self.target) else {
            return;
        };
        for d in draws {
            let seg = &bmp.segments()[d.segment];
            fill_with_bitmap(pixmap, seg.pixmap(), d.dst, d.src, transform);
        }
    }

    /// Tile the bitmap across `dst`, clipping the final row and column.
    pub fn draw_tiled_bitmap(&mut self, bmp: &SegmentedBitmap, dst: RectF, _src: RectF) {
        for (tile_dst, tile_src) in tile_draws(bmp.width() as f32, bmp.height() as f32, dst) {
            self.draw_bitmap(bmp, tile_dst, tile_src);
        }
    }

    /// Compose `bmp` through the opacity of `mask` into `dst`. Reproduces the
    /// legacy sub-region arithmetic and segment skip test.
    pub fn draw_masked_bitmap(
        &mut self,
        bmp: &SegmentedBitmap,
        mask: &SegmentedBitmap,
        dst: RectF,
        src: RectF,
        src2: RectF,
    ) {
        let transform = self.transform;
        let width = bmp.width() as f32;
        let height = bmp.height() as f32;
        let s2_width = src2.right - src2.left;
        let s2_height = src2.bottom - src2.top;
        if s2_width <= 0.0 || s2_height <= 0.0 {
            return;
        }

        let (canvas_w, canvas_h) = {
            let Some(pixmap) = active_pixmap(&mut self.offscreen, &mut self.target) else {
                return;
            };
            (pixmap.width(), pixmap.height())
        };

        for bseg in bmp.segments() {
            let seg_rect = RectF::new(bseg.x as f32, bseg.y as f32, bseg.w as f32, bseg.h as f32);
            let r_dst = rect_sub_region(seg_rect, width, height, dst);
            let r_src = rect_sub_region(seg_rect, width, height, src);

            // Brush: the bitmap translated and scaled to the destination.
            let brush_transform = Transform::from_translate(-src2.left, -src2.top)
                .post_concat(Transform::from_scale(
                    (r_dst.right - r_dst.left) / s2_width,
                    (r_dst.bottom - r_dst.top) / s2_height,
                ))
                .post_concat(Transform::from_translate(r_dst.left, r_dst.top));

            for mseg in mask.segments() {
                let mseg_rect =
                    RectF::new(mseg.x as f32, mseg.y as f32, mseg.w as f32, mseg.h as f32);
                let rm_dst = rect_sub_region(mseg_rect, width, height, dst);
                if mask_segment_skipped(rm_dst, r_dst) {
                    continue;
                }

                // Build a canvas-sized coverage mask from the mask segment
                // scaled into the destination rectangle.
                let Some(mut coverage) = Pixmap::new(canvas_w, canvas_h) else {
                    continue;
                };
                fill_with_bitmap(&mut coverage, mseg.pixmap(), r_dst, r_src, transform);
                let alpha_mask = Mask::from_pixmap(coverage.as_ref(), MaskType::Alpha);

                let Some(pixmap) = active_pixmap(&mut self.offscreen, &mut self.target) else {
                    return;
                };
                let Some(r) = r_dst.to_skia() else { continue };
                let mut paint = Paint::default();
                paint.shader = tiny_skia::Pattern::new(
                    bseg.pixmap().as_ref(),
                    SpreadMode::Pad,
                    FilterQuality::Bicubic,
                    1.0,
                    brush_transform,
                );
                // The opacity-mask fill is aliased, matching the original.
                paint.anti_alias = false;
                pixmap.fill_rect(r, &paint, transform, Some(&alpha_mask));
            }
        }
    }

    /// Copy a render texture 1:1 at (x, y) with normal alpha blending.
    pub fn draw_texture(&mut self, texture: &RenderTexture, x: i32, y: i32) {
        let Some(pixmap) = active_pixmap(&mut self.offscreen, &mut self.target) else {
            return;
        };
        pixmap.draw_pixmap(
            x,
            y,
            texture.pixmap().as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Text
    // ─────────────────────────────────────────────────────────────────────────

    /// Lay out and draw `text` into `rect` with the base `color` and the
    /// format's inline overrides. Trimmed text clips to the rectangle: an
    /// axis-aligned clip when the transform is a pure 0/90/180/270 rotation,
    /// a coverage mask otherwise.
    pub fn draw_text(&mut self, text: &str, format: &TextFormat, rect: RectF, color: [u8; 4]) {
        let transform = self.transform;
        let accurate = self.accurate_text;
        let axis_aligned = self.can_use_axis_align_clip;

        // Glyph blits are axis-aligned; the transform moves the layout
        // rectangle (exact for the four cached rotations).
        let drawn_rect = transform_rect(rect, transform);

        let (target_w, target_h) = match (&self.offscreen, &self.target) {
            (Some(texture), _) => (texture.width(), texture.height()),
            (None, Some(pixmap)) => (pixmap.width(), pixmap.height()),
            (None, None) => return,
        };

        let clip_mask;
        let clip = if !format.trimming {
            GlyphClip::None
        } else if axis_aligned {
            GlyphClip::Rect {
                left: drawn_rect.left.floor() as i32,
                top: drawn_rect.top.floor() as i32,
                right: drawn_rect.right.ceil() as i32,
                bottom: drawn_rect.bottom.ceil() as i32,
            }
        } else {
            let Some(built) = build_clip_mask(target_w, target_h, rect, transform) else {
                return;
            };
            // One coverage byte per pixel for the glyph blitter.
            clip_mask = Mask::from_pixmap(built.as_ref(), MaskType::Alpha);
            GlyphClip::Mask(clip_mask.data())
        };

        let mut shared = self.graphics.inner.borrow_mut();
        let SharedGraphics {
            font_system,
            swash_cache,
            ..
        } = &mut *shared;
        let Some(pixmap) = active_pixmap(&mut self.offscreen, &mut self.target) else {
            return;
        };
        text::draw(
            font_system,
            swash_cache,
            pixmap,
            text,
            format,
            drawn_rect,
            color,
            accurate,
            &clip,
        );
    }

    /// Layout extents without drawing.
    pub fn measure_text(&mut self, text: &str, format: &TextFormat) -> TextMetrics {
        let mut shared = self.graphics.inner.borrow_mut();
        text::measure(&mut shared.font_system, text, format)
    }

    /// Layout extents with word wrapping, reporting the line count.
    pub fn measure_text_lines(
        &mut self,
        text: &str,
        format: &TextFormat,
        wrap_width: f32,
    ) -> TextMetrics {
        let mut shared = self.graphics.inner.borrow_mut();
        text::measure_lines(&mut shared.font_system, text, format, wrap_width)
    }
}

/// The pixmap draws currently land on: the redirected offscreen texture when
/// one is set, the window target otherwise.
fn active_pixmap<'a>(
    offscreen: &'a mut Option<RenderTexture>,
    target: &'a mut Option<Pixmap>,
) -> Option<&'a mut Pixmap> {
    match offscreen {
        Some(texture) => Some(&mut texture.pixmap),
        None => target.as_mut(),
    }
}

/// Fill `dst` with `src_pixmap`'s `src` region, scaled proportionally.
fn fill_with_bitmap(
    target: &mut Pixmap,
    src_pixmap: &Pixmap,
    dst: RectF,
    src: RectF,
    canvas_transform: Transform,
) {
    let src_w = src.right - src.left;
    let src_h = src.bottom - src.top;
    if src_w <= 0.0 || src_h <= 0.0 {
        return;
    }
    let Some(r) = dst.to_skia() else { return };
    let pattern_transform = Transform::from_translate(-src.left, -src.top)
        .post_concat(Transform::from_scale(
            (dst.right - dst.left) / src_w,
            (dst.bottom - dst.top) / src_h,
        ))
        .post_concat(Transform::from_translate(dst.left, dst.top));
    let mut paint = Paint::default();
    paint.shader = tiny_skia::Pattern::new(
        src_pixmap.as_ref(),
        SpreadMode::Pad,
        FilterQuality::Bicubic,
        1.0,
        pattern_transform,
    );
    paint.anti_alias = false;
    target.fill_rect(r, &paint, canvas_transform, None);
}

/// Project `angle` (degrees, 0 = left-to-right) from the rectangle center
/// onto its edge.
fn find_edge_point(angle: f32, rect: RectF) -> tiny_skia::Point {
    let cx = (rect.left + rect.right) / 2.0;
    let cy = (rect.top + rect.bottom) / 2.0;
    let half_w = (rect.right - rect.left) / 2.0;
    let half_h = (rect.bottom - rect.top) / 2.0;

    let rad = angle.to_radians();
    let (dx, dy) = (rad.cos(), rad.sin());

    // Distance along the direction to the first edge crossing.
    let tx = if dx.abs() > f32::EPSILON {
        half_w / dx.abs()
    } else {
        f32::INFINITY
    };
    let ty = if dy.abs() > f32::EPSILON {
        half_h / dy.abs()
    } else {
        f32::INFINITY
    };
    let t = tx.min(ty);
    if !t.is_finite() {
        return tiny_skia::Point::from_xy(cx, cy);
    }
    tiny_skia::Point::from_xy(cx + dx * t, cy + dy * t)
}

/// Map an axis-aligned rectangle through a transform, returning the bounding
/// rectangle of the transformed corners.
fn transform_rect(rect: RectF, t: Transform) -> RectF {
    if t.is_identity() {
        return rect;
    }
    let corners = [
        map_point(t, rect.left, rect.top),
        map_point(t, rect.right, rect.top),
        map_point(t, rect.left, rect.bottom),
        map_point(t, rect.right, rect.bottom),
    ];
    let mut out = RectF::from_ltrb(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
    for (x, y) in corners {
        out.left = out.left.min(x);
        out.top = out.top.min(y);
        out.right = out.right.max(x);
        out.bottom = out.bottom.max(y);
    }
    out
}

fn map_point(t: Transform, x: f32, y: f32) -> (f32, f32) {
    (
        t.sx * x + t.kx * y + t.tx,
        t.ky * x + t.sy * y + t.ty,
    )
}

/// Rasterize the transformed rectangle into a canvas-sized coverage pixmap
/// for the general text-clip path.
fn build_clip_mask(
    canvas_w: u32,
    canvas_h: u32,
    rect: RectF,
    transform: Transform,
) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(canvas_w.max(1), canvas_h.max(1))?;
    let r = rect.to_skia()?;
    let mut paint = Paint::default();
    paint.set_color(Color::WHITE);
    paint.anti_alias = false;
    pixmap.fill_rect(r, &paint, transform, None);
    Some(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_shares_one_stack() {
        let a = GraphicsHandle::acquire(true).unwrap();
        let b = GraphicsHandle::acquire(false).unwrap();
        assert!(a.instance_count() >= 2);
        assert_eq!(a.max_bitmap_size(), b.max_bitmap_size());
    }

    #[test]
    fn test_resize_zero_degenerates() {
        let graphics = GraphicsHandle::acquire(false).unwrap();
        let mut canvas = Canvas::new(graphics);
        canvas.init_render_target().unwrap();
        canvas.resize(0, 64);
        assert!(canvas.begin_draw());
        canvas.clear(Color::TRANSPARENT);
        canvas.end_draw();
        assert_eq!(canvas.width(), 0);
        // The backing surface exists at the degenerate 1x1 fallback.
        assert!(canvas.with_raw_pixels(|_, w, h| (w, h)) == Some((1, 64)));
    }

    #[test]
    fn test_device_loss_drops_and_recreates_target() {
        let graphics = GraphicsHandle::acquire(false).unwrap();
        let mut canvas = Canvas::new(graphics.clone());
        canvas.init_render_target().unwrap();
        canvas.resize(8, 8);

        assert!(canvas.begin_draw());
        graphics.mark_device_lost();
        canvas.end_draw();

        // Target was dropped; the next session recreates it.
        assert!(canvas.with_raw_pixels(|_, _, _| ()).is_none());
        assert!(canvas.begin_draw());
        canvas.fill_rectangle(
            RectF::new(0.0, 0.0, 8.0, 8.0),
            Color::from_rgba8(255, 0, 0, 255),
        );
        canvas.end_draw();
        assert!(!canvas.is_transparent_pixel(4, 4));
    }

    #[test]
    fn test_raw_pixels_suspends_session() {
        let graphics = GraphicsHandle::acquire(false).unwrap();
        let mut canvas = Canvas::new(graphics);
        canvas.init_render_target().unwrap();
        canvas.resize(4, 4);
        canvas.begin_draw();
        canvas.with_raw_pixels(|data, w, h| {
            assert_eq!((w, h), (4, 4));
            data[3] = 255;
        });
        // Session resumed.
        assert!(canvas.is_drawing());
        canvas.end_draw();
        assert!(!canvas.is_transparent_pixel(0, 0));
        assert!(canvas.is_transparent_pixel(1, 1));
    }

    #[test]
    fn test_axis_aligned_transform_detection() {
        let graphics = GraphicsHandle::acquire(false).unwrap();
        let mut canvas = Canvas::new(graphics);

        canvas.set_transform(Transform::identity());
        assert!(canvas.can_use_axis_align_clip);

        // 90-degree rotation.
        canvas.set_transform(Transform::from_row(0.0, 1.0, -1.0, 0.0, 0.0, 0.0));
        assert!(canvas.can_use_axis_align_clip);

        // Arbitrary rotation.
        canvas.set_transform(Transform::from_rotate(30.0));
        assert!(!canvas.can_use_axis_align_clip);

        canvas.reset_transform();
        assert!(canvas.can_use_axis_align_clip);
    }

    #[test]
    fn test_find_edge_point_cardinals() {
        let rect = RectF::new(0.0, 0.0, 100.0, 50.0);
        let right = find_edge_point(0.0, rect);
        assert!((right.x - 100.0).abs() < 0.001);
        assert!((right.y - 25.0).abs() < 0.001);

        let left = find_edge_point(180.0, rect);
        assert!(left.x.abs() < 0.001);

        let down = find_edge_point(90.0, rect);
        assert!((down.y - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_draw_bitmap_scales_into_dst() {
        let graphics = GraphicsHandle::acquire(false).unwrap();
        let mut canvas = Canvas::new(graphics);
        canvas.init_render_target().unwrap();
        canvas.resize(16, 16);

        // 2x2 opaque red bitmap drawn over the full canvas.
        let rgba = [255u8, 0, 0, 255].repeat(4);
        let bmp = SegmentedBitmap::from_rgba(&rgba, 2, 2, 8192).unwrap();
        canvas.begin_draw();
        canvas.clear(Color::TRANSPARENT);
        canvas.draw_bitmap(
            &bmp,
            RectF::new(0.0, 0.0, 16.0, 16.0),
            RectF::new(0.0, 0.0, 2.0, 2.0),
        );
        canvas.end_draw();
        assert!(!canvas.is_transparent_pixel(8, 8));
        assert!(!canvas.is_transparent_pixel(15, 15));
    }
}
