//! Text layout and drawing
//!
//! Shaping and glyph rasterization go through the shared
//! `cosmic_text::FontSystem`/`SwashCache` owned by the graphics context.
//! Alignment carries the small legacy-compatible offsets; trimmed text is
//! clipped by the canvas (axis-aligned fast path or mask layer).

use std::ops::Range;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache, Weight, Wrap};
use tiny_skia::{Color, Pixmap};

use crate::canvas::RectF;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

/// Run-level override applied on top of the base text color.
#[derive(Debug, Clone)]
pub enum InlineFormat {
    /// Recolor a byte range of the text.
    Color { range: Range<usize>, color: [u8; 4] },
    /// Horizontal two-stop gradient across a byte range.
    Gradient {
        range: Range<usize>,
        from: [u8; 4],
        to: [u8; 4],
    },
    /// Drop shadow behind a byte range.
    Shadow {
        range: Range<usize>,
        offset: (f32, f32),
        color: [u8; 4],
    },
}

/// Text appearance and layout options for one string draw.
#[derive(Debug, Clone)]
pub struct TextFormat {
    pub family: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub h_align: HorizontalAlignment,
    pub v_align: VerticalAlignment,
    /// Clip the laid-out text to the target rectangle.
    pub trimming: bool,
    pub word_wrap: bool,
    pub inline: Vec<InlineFormat>,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            family: "Noto Sans".to_owned(),
            size: 14.0,
            bold: false,
            italic: false,
            h_align: HorizontalAlignment::Left,
            v_align: VerticalAlignment::Top,
            trimming: false,
            word_wrap: false,
            inline: Vec::new(),
        }
    }
}

impl TextFormat {
    fn attrs(&self) -> Attrs<'_> {
        let mut attrs = Attrs::new().family(Family::Name(&self.family));
        if self.bold {
            attrs = attrs.weight(Weight::BOLD);
        }
        if self.italic {
            attrs = attrs.style(cosmic_text::Style::Italic);
        }
        attrs
    }
}

/// Measured layout extents.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextMetrics {
    pub width: f32,
    pub height: f32,
    pub lines: u32,
}

fn shape(
    font_system: &mut FontSystem,
    text: &str,
    format: &TextFormat,
    max_width: Option<f32>,
) -> Buffer {
    let metrics = Metrics::new(format.size, format.size * 1.2);
    let mut buffer = Buffer::new(font_system, metrics);
    buffer.set_wrap(
        font_system,
        if format.word_wrap { Wrap::Word } else { Wrap::None },
    );
    buffer.set_size(font_system, max_width, None);
    buffer.set_text(font_system, text, &format.attrs(), Shaping::Advanced, None);
    buffer.shape_until_scroll(font_system, false);
    buffer
}

/// Layout extents without drawing.
pub fn measure(font_system: &mut FontSystem, text: &str, format: &TextFormat) -> TextMetrics {
    metrics_of(&shape(font_system, text, format, None))
}

/// Layout extents with word wrapping at `wrap_width`.
///
/// Multi-line text keeps the legacy one-pixel bottom fudge; a zero-height
/// layout reports zero lines.
pub fn measure_lines(
    font_system: &mut FontSystem,
    text: &str,
    format: &TextFormat,
    wrap_width: f32,
) -> TextMetrics {
    let mut wrapped = format.clone();
    wrapped.word_wrap = true;
    let mut m = metrics_of(&shape(font_system, text, &wrapped, Some(wrap_width)));
    if m.height > 0.0 {
        m.height += 1.0;
    } else {
        m.lines = 0;
    }
    m
}

fn metrics_of(buffer: &Buffer) -> TextMetrics {
    let mut width = 0.0f32;
    let mut height = 0.0f32;
    let mut lines = 0u32;
    for run in buffer.layout_runs() {
        width = width.max(run.line_w);
        height += run.line_height;
        lines += 1;
    }
    TextMetrics {
        width,
        height,
        lines,
    }
}

/// Pixel clip applied while blitting glyphs.
pub enum GlyphClip<'a> {
    None,
    /// Axis-aligned rectangle in target coordinates.
    Rect { left: i32, top: i32, right: i32, bottom: i32 },
    /// Arbitrary coverage mask, one byte per target pixel.
    Mask(&'a [u8]),
}

impl GlyphClip<'_> {
    fn coverage(&self, x: i32, y: i32, width: i32) -> u32 {
        match self {
            GlyphClip::None => 255,
            GlyphClip::Rect {
                left,
                top,
                right,
                bottom,
            } => {
                if x >= *left && x < *right && y >= *top && y < *bottom {
                    255
                } else {
                    0
                }
            }
            GlyphClip::Mask(data) => {
                let idx = (y * width + x) as usize;
                data.get(idx).copied().unwrap_or(0) as u32
            }
        }
    }
}

/// Draw `text` into `rect` on `target`.
///
/// Unless `accurate` layout is requested, the draw origin keeps the legacy
/// left/right nudge of one sixth of the font size; vertical alignment
/// positions the whole laid-out block. Inline formats recolor, gradient, or
/// shadow byte ranges of the text.
#[allow(clippy::too_many_arguments)]
pub fn draw(
    font_system: &mut FontSystem,
    swash_cache: &mut SwashCache,
    target: &mut Pixmap,
    text: &str,
    format: &TextFormat,
    rect: RectF,
    color: [u8; 4],
    accurate: bool,
    clip: &GlyphClip<'_>,
) {
    let rect_w = rect.right - rect.left;
    let rect_h = rect.bottom - rect.top;
    if rect_w <= 0.0 || rect_h <= 0.0 {
        return;
    }

    let buffer = shape(
        font_system,
        text,
        format,
        format.word_wrap.then_some(rect_w),
    );
    let extents = metrics_of(&buffer);

    let x_offset = if accurate { 0.0 } else { format.size / 6.0 };
    let origin_x = match format.h_align {
        HorizontalAlignment::Left => rect.left + x_offset,
        HorizontalAlignment::Center => rect.left,
        HorizontalAlignment::Right => rect.left - x_offset,
    };
    let origin_y = match format.v_align {
        VerticalAlignment::Top => rect.top,
        VerticalAlignment::Center => rect.top + (rect_h - extents.height) / 2.0,
        VerticalAlignment::Bottom => rect.top + rect_h - extents.height,
    };

    // Byte offset of each laid-out line within the whole text, for mapping
    // inline format ranges onto per-line glyph indices.
    let line_starts = line_start_offsets(text);

    // Shadow passes first so every shadow sits under every glyph.
    for fmt in &format.inline {
        if let InlineFormat::Shadow {
            range,
            offset,
            color: shadow_color,
        } = fmt
        {
            draw_glyph_pass(
                font_system,
                swash_cache,
                target,
                &buffer,
                &line_starts,
                origin_x + offset.0,
                origin_y + offset.1,
                rect_w,
                format,
                |glyph_start| range.contains(&glyph_start).then_some(*shadow_color),
                *shadow_color,
                clip,
                Some(range.clone()),
            );
        }
    }

    let gradient_span = rect_w.max(1.0);
    draw_glyph_pass(
        font_system,
        swash_cache,
        target,
        &buffer,
        &line_starts,
        origin_x,
        origin_y,
        rect_w,
        format,
        |glyph_start| inline_color(&format.inline, glyph_start, gradient_span),
        color,
        clip,
        None,
    );
}

fn inline_color(inline: &[InlineFormat], glyph_start: usize, _span: f32) -> Option<[u8; 4]> {
    // Later formats win, matching the order options are declared in.
    let mut result = None;
    for fmt in inline {
        match fmt {
            InlineFormat::Color { range, color } if range.contains(&glyph_start) => {
                result = Some(*color);
            }
            InlineFormat::Gradient { range, from, to } if range.contains(&glyph_start) => {
                let t = (glyph_start - range.start) as f32 / range.len().max(1) as f32;
                let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t) as u8;
                result = Some([
                    lerp(from[0], to[0]),
                    lerp(from[1], to[1]),
                    lerp(from[2], to[2]),
                    lerp(from[3], to[3]),
                ]);
            }
            _ => {}
        }
    }
    result
}

fn line_start_offsets(text: &str) -> Vec<usize> {
    let mut starts = vec![0usize];
    for (i, c) in text.char_indices() {
        if c == '\n' {
            starts.push(i + 1);
        }
    }
    starts
}

#[allow(clippy::too_many_arguments)]
fn draw_glyph_pass(
    font_system: &mut FontSystem,
    swash_cache: &mut SwashCache,
    target: &mut Pixmap,
    buffer: &Buffer,
    line_starts: &[usize],
    origin_x: f32,
    origin_y: f32,
    rect_w: f32,
    format: &TextFormat,
    color_for: impl Fn(usize) -> Option<[u8; 4]>,
    base_color: [u8; 4],
    clip: &GlyphClip<'_>,
    only_range: Option<Range<usize>>,
) {
    let target_w = target.width() as i32;
    let target_h = target.height() as i32;

    // Collect per-glyph draw info first; the swash cache needs exclusive
    // access to the font system during rasterization.
    struct GlyphDraw {
        physical: cosmic_text::PhysicalGlyph,
        color: [u8; 4],
    }
    let mut pending = Vec::new();

    for run in buffer.layout_runs() {
        let line_start = line_starts.get(run.line_i).copied().unwrap_or(0);
        let line_offset = match format.h_align {
            HorizontalAlignment::Left => 0.0,
            HorizontalAlignment::Center => (rect_w - run.line_w) / 2.0,
            HorizontalAlignment::Right => rect_w - run.line_w,
        };
        for glyph in run.glyphs.iter() {
            let text_start = line_start + glyph.start;
            if let Some(range) = &only_range {
                if !range.contains(&text_start) {
                    continue;
                }
            }
            let color = color_for(text_start).unwrap_or(base_color);
            pending.push(GlyphDraw {
                physical: glyph.physical((origin_x + line_offset, origin_y + run.line_y), 1.0),
                color,
            });
        }
    }

    for gd in pending {
        let Some(image) = swash_cache.get_image(font_system, gd.physical.cache_key) else {
            continue;
        };
        let glyph_x = gd.physical.x + image.placement.left;
        let glyph_y = gd.physical.y - image.placement.top;

        blit_glyph(
            target.data_mut(),
            target_w,
            target_h,
            &image.data,
            image.placement.width,
            image.placement.height,
            glyph_x,
            glyph_y,
            gd.color,
            clip,
        );
    }
}

/// Alpha-blend a coverage-mask glyph onto the RGBA buffer.
#[allow(clippy::too_many_arguments)]
fn blit_glyph(
    data: &mut [u8],
    target_w: i32,
    target_h: i32,
    glyph_data: &[u8],
    glyph_w: u32,
    glyph_h: u32,
    dest_x: i32,
    dest_y: i32,
    color: [u8; 4],
    clip: &GlyphClip<'_>,
) {
    for gy in 0..glyph_h as i32 {
        let py = dest_y + gy;
        if py < 0 || py >= target_h {
            continue;
        }
        for gx in 0..glyph_w as i32 {
            let px = dest_x + gx;
            if px < 0 || px >= target_w {
                continue;
            }

            let glyph_idx = (gy as u32 * glyph_w + gx as u32) as usize;
            let Some(&alpha) = glyph_data.get(glyph_idx) else {
                continue;
            };
            if alpha == 0 {
                continue;
            }
            let coverage = clip.coverage(px, py, target_w);
            if coverage == 0 {
                continue;
            }

            let pixel_idx = ((py as u32 * target_w as u32 + px as u32) * 4) as usize;
            if pixel_idx + 3 >= data.len() {
                continue;
            }

            let src_a = alpha as u32 * color[3] as u32 / 255 * coverage / 255;
            let inv_a = 255 - src_a;
            data[pixel_idx] =
                ((color[0] as u32 * src_a + data[pixel_idx] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 1] =
                ((color[1] as u32 * src_a + data[pixel_idx + 1] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 2] =
                ((color[2] as u32 * src_a + data[pixel_idx + 2] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 3] = (src_a + (data[pixel_idx + 3] as u32 * inv_a) / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fonts() -> FontSystem {
        FontSystem::new()
    }

    #[test]
    fn test_measure_empty_is_zero_lines() {
        let mut fs = fonts();
        let m = measure_lines(&mut fs, "", &TextFormat::default(), 100.0);
        assert_eq!(m.lines, 0);
        assert_eq!(m.height, 0.0);
    }

    #[test]
    fn test_measure_lines_adds_fudge() {
        let mut fs = fonts();
        let format = TextFormat::default();
        let plain = measure(&mut fs, "hello", &format);
        let wrapped = measure_lines(&mut fs, "hello", &format, 1000.0);
        if plain.height > 0.0 {
            assert_eq!(wrapped.height, plain.height + 1.0);
            assert!(wrapped.lines >= 1);
        }
    }

    #[test]
    fn test_line_start_offsets() {
        assert_eq!(line_start_offsets("ab\ncd\n\ne"), vec![0, 3, 6, 7]);
    }

    #[test]
    fn test_inline_color_later_format_wins() {
        let inline = vec![
            InlineFormat::Color {
                range: 0..10,
                color: [255, 0, 0, 255],
            },
            InlineFormat::Color {
                range: 5..10,
                color: [0, 255, 0, 255],
            },
        ];
        assert_eq!(inline_color(&inline, 2, 100.0), Some([255, 0, 0, 255]));
        assert_eq!(inline_color(&inline, 7, 100.0), Some([0, 255, 0, 255]));
        assert_eq!(inline_color(&inline, 20, 100.0), None);
    }

    #[test]
    fn test_glyph_clip_rect() {
        let clip = GlyphClip::Rect {
            left: 0,
            top: 0,
            right: 10,
            bottom: 10,
        };
        assert_eq!(clip.coverage(5, 5, 100), 255);
        assert_eq!(clip.coverage(10, 5, 100), 0);
    }
}
