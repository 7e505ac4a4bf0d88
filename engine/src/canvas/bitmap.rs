//! Segmented bitmaps
//!
//! Source images larger than the device's maximum texture dimension are split
//! into a grid of segments, each with its own texture. Segment rectangles
//! partition the logical bitmap with no gaps; the draw math clips the
//! requested source rectangle against each segment and normalizes the
//! coordinates into segment-local space.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tiny_skia::Pixmap;

use crate::canvas::RectF;

#[derive(Debug, Error)]
pub enum BitmapError {
    #[error("failed to open bitmap {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode bitmap {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: png::DecodingError,
    },

    #[error("unsupported color type {color_type:?} in {path}")]
    UnsupportedColorType {
        path: PathBuf,
        color_type: png::ColorType,
    },

    #[error("bitmap dimensions {width}x{height} are invalid")]
    BadDimensions { width: u32, height: u32 },
}

/// One texture-sized piece of a logical bitmap.
///
/// The rectangle is stored as (x, y, w, h): position of the segment within
/// the logical bitmap plus the segment's own dimensions.
pub struct Segment {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pixmap: Pixmap,
}

impl Segment {
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

/// A decoded RGBA bitmap, segmented to the device texture limit.
pub struct SegmentedBitmap {
    width: u32,
    height: u32,
    segment_size: u32,
    segments: Vec<Segment>,
}

impl SegmentedBitmap {
    /// Split straight-alpha RGBA pixels into segments of at most
    /// `segment_size` per side.
    pub fn from_rgba(
        rgba: &[u8],
        width: u32,
        height: u32,
        segment_size: u32,
    ) -> Result<Self, BitmapError> {
        if width == 0 || height == 0 || rgba.len() != (width * height * 4) as usize {
            return Err(BitmapError::BadDimensions { width, height });
        }
        let segment_size = segment_size.max(1);

        let mut segments = Vec::new();
        let mut y = 0;
        while y < height {
            let h = segment_size.min(height - y);
            let mut x = 0;
            while x < width {
                let w = segment_size.min(width - x);
                let mut pixmap = Pixmap::new(w, h)
                    .ok_or(BitmapError::BadDimensions { width: w, height: h })?;
                let data = pixmap.data_mut();
                for row in 0..h {
                    let src_start = (((y + row) * width + x) * 4) as usize;
                    let dst_start = (row * w * 4) as usize;
                    let len = (w * 4) as usize;
                    data[dst_start..dst_start + len]
                        .copy_from_slice(&rgba[src_start..src_start + len]);
                }
                segments.push(Segment { x, y, w, h, pixmap });
                x += segment_size;
            }
            y += segment_size;
        }

        Ok(Self {
            width,
            height,
            segment_size,
            segments,
        })
    }

    /// Decode a PNG file into a segmented bitmap.
    pub fn load_png(path: &Path, segment_size: u32) -> Result<Self, BitmapError> {
        let file = File::open(path).map_err(|source| BitmapError::Open {
            path: path.to_owned(),
            source,
        })?;
        let decoder = png::Decoder::new(BufReader::new(file));
        let mut reader = decoder.read_info().map_err(|source| BitmapError::Decode {
            path: path.to_owned(),
            source,
        })?;
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|source| BitmapError::Decode {
                path: path.to_owned(),
                source,
            })?;
        buf.truncate(info.buffer_size());

        let rgba = match info.color_type {
            png::ColorType::Rgba => buf,
            png::ColorType::Rgb => {
                let mut out = Vec::with_capacity(buf.len() / 3 * 4);
                for px in buf.chunks_exact(3) {
                    out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
                out
            }
            png::ColorType::Grayscale => {
                let mut out = Vec::with_capacity(buf.len() * 4);
                for &v in &buf {
                    out.extend_from_slice(&[v, v, v, 255]);
                }
                out
            }
            color_type => {
                return Err(BitmapError::UnsupportedColorType {
                    path: path.to_owned(),
                    color_type,
                });
            }
        };

        Self::from_rgba(&rgba, info.width, info.height, segment_size)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn segment_size(&self) -> u32 {
        self.segment_size
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn segment_rects(&self) -> Vec<RectF> {
        self.segments
            .iter()
            .map(|s| RectF::new(s.x as f32, s.y as f32, s.w as f32, s.h as f32))
            .collect()
    }

    /// Per-segment draw calls covering `src` mapped into `dst`.
    pub fn draws(&self, dst: RectF, src: RectF) -> Vec<SegmentDraw> {
        segment_draws(&self.segment_rects(), self.segment_size as f32, dst, src)
    }
}

/// One segment's contribution to a bitmap draw.
///
/// `src` is in segment-local coordinates; `dst` is in target coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentDraw {
    pub segment: usize,
    pub src: RectF,
    pub dst: RectF,
}

/// Compute per-segment draw calls for a bitmap draw.
///
/// `segment_rects` carry (x, y, w, h) in their left/top/right/bottom fields;
/// `max_size` is the segmenting stride. The requested `src` rectangle is
/// clipped against each segment, mapped proportionally into `dst`, then the
/// source coordinates are normalized into segment-local space by repeatedly
/// subtracting the stride. Zero-area intersections produce no draw.
pub fn segment_draws(
    segment_rects: &[RectF],
    max_size: f32,
    dst: RectF,
    src: RectF,
) -> Vec<SegmentDraw> {
    let mut out = Vec::new();

    for (i, seg) in segment_rects.iter().enumerate() {
        // seg.left/top = segment position, seg.right/bottom = segment size.
        let (sx, sy, sw, sh) = (seg.left, seg.top, seg.right, seg.bottom);

        let mut rsrc = if sw > 0.0 && sh > 0.0 {
            RectF {
                left: sx.max(src.left),
                top: sy.max(src.top),
                right: (sw + sx).min(src.right),
                bottom: (sh + sy).min(src.bottom),
            }
        } else {
            RectF::default()
        };
        if rsrc.left >= rsrc.right || rsrc.top >= rsrc.bottom {
            continue;
        }

        let rdst = RectF {
            left: (rsrc.left - src.left) / (src.right - src.left) * (dst.right - dst.left)
                + dst.left,
            top: (rsrc.top - src.top) / (src.bottom - src.top) * (dst.bottom - dst.top) + dst.top,
            right: (rsrc.right - src.left) / (src.right - src.left) * (dst.right - dst.left)
                + dst.left,
            bottom: (rsrc.bottom - src.top) / (src.bottom - src.top) * (dst.bottom - dst.top)
                + dst.top,
        };

        while rsrc.top >= max_size {
            rsrc.bottom -= max_size;
            rsrc.top -= max_size;
        }
        while rsrc.left >= max_size {
            rsrc.right -= max_size;
            rsrc.left -= max_size;
        }

        out.push(SegmentDraw {
            segment: i,
            src: rsrc,
            dst: rdst,
        });
    }

    out
}

/// Tile positions for a tiled bitmap draw: (dst, src) pairs in the caller's
/// coordinate space, clipping the final row and column.
pub fn tile_draws(bitmap_w: f32, bitmap_h: f32, dst: RectF) -> Vec<(RectF, RectF)> {
    let mut out = Vec::new();
    if bitmap_w <= 0.0 || bitmap_h <= 0.0 {
        return out;
    }

    let mut x = dst.left;
    let mut y = dst.top;
    while y < dst.bottom {
        let w = (dst.right - x).min(bitmap_w);
        let h = (dst.bottom - y).min(bitmap_h);
        out.push((
            RectF {
                left: x,
                top: y,
                right: x + w,
                bottom: y + h,
            },
            RectF {
                left: 0.0,
                top: 0.0,
                right: w,
                bottom: h,
            },
        ));
        x += bitmap_w;
        if x >= dst.right && y < dst.bottom {
            x = dst.left;
            y += bitmap_h;
        }
    }
    out
}

/// Sub-region mapping used by the masked draw: scales a segment rectangle
/// (x, y, w, h) through a target rectangle. Carries the legacy arithmetic,
/// which only degenerates to a plain rectangle for single-segment bitmaps.
pub(crate) fn rect_sub_region(r1: RectF, width: f32, height: f32, r2: RectF) -> RectF {
    RectF {
        left: r1.left / width * r2.right + r2.left,
        top: r1.top / height * r2.bottom + r2.top,
        right: (r1.right - r1.left) / width * r2.right,
        bottom: (r1.bottom - r1.top) / height * r2.bottom,
    }
}

/// Legacy skip test for mask segments. Compares the mask destination against
/// itself plus an offset, so it can only ever skip when the computed mask
/// height is negative; changing it would change which segments composite.
pub(crate) fn mask_segment_skipped(rm_dst: RectF, r_dst: RectF) -> bool {
    rm_dst.left < (r_dst.left + r_dst.right)
        && (rm_dst.right + rm_dst.left) > r_dst.left
        && rm_dst.top > (rm_dst.top + rm_dst.bottom)
        && (rm_dst.top + rm_dst.bottom) < rm_dst.top
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(total_w: f32, total_h: f32, stride: f32) -> Vec<RectF> {
        let mut rects = Vec::new();
        let mut y = 0.0;
        while y < total_h {
            let h = stride.min(total_h - y);
            let mut x = 0.0;
            while x < total_w {
                let w = stride.min(total_w - x);
                rects.push(RectF::new(x, y, w, h));
                x += stride;
            }
            y += stride;
        }
        rects
    }

    /// Union of the draws' global source rects must cover `src` exactly:
    /// no overlap, no gap.
    fn assert_partition(draws: &[SegmentDraw], src: RectF) {
        let mut area = 0.0f32;
        for d in draws {
            let w = d.src.right - d.src.left;
            let h = d.src.bottom - d.src.top;
            assert!(w > 0.0 && h > 0.0);
            area += w * h;

            for other in draws {
                if std::ptr::eq(d, other) {
                    continue;
                }
                // Segment rects partition the bitmap, so two draws overlap
                // only if they share a segment.
                if d.segment == other.segment {
                    let no_overlap = d.src.right <= other.src.left
                        || other.src.right <= d.src.left
                        || d.src.bottom <= other.src.top
                        || other.src.bottom <= d.src.top;
                    assert!(no_overlap, "overlapping draws within one segment");
                }
            }
        }
        let expected = (src.right - src.left) * (src.bottom - src.top);
        assert!(
            (area - expected).abs() < 0.01,
            "covered area {area} != requested {expected}"
        );
    }

    #[test]
    fn test_single_segment_draw() {
        let rects = grid(100.0, 100.0, 128.0);
        let src = RectF::new(0.0, 0.0, 100.0, 100.0);
        let dst = RectF::new(10.0, 10.0, 50.0, 50.0);
        let draws = segment_draws(&rects, 128.0, dst, src);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].dst, dst);
        assert_partition(&draws, src);
    }

    #[test]
    fn test_two_by_two_segments_partition() {
        let rects = grid(256.0, 256.0, 128.0);
        assert_eq!(rects.len(), 4);
        let src = RectF::new(0.0, 0.0, 256.0, 256.0);
        let dst = RectF::new(0.0, 0.0, 64.0, 64.0);
        let draws = segment_draws(&rects, 128.0, dst, src);
        assert_eq!(draws.len(), 4);
        assert_partition(&draws, src);

        // Every normalized source coordinate is within the stride.
        for d in &draws {
            assert!(d.src.left < 128.0 && d.src.top < 128.0);
            assert!(d.src.left >= 0.0 && d.src.top >= 0.0);
        }
    }

    #[test]
    fn test_four_x_segments_partial_source() {
        let rects = grid(512.0, 128.0, 128.0);
        assert_eq!(rects.len(), 4);
        // Source spans the middle two segments plus fringes of the outer two.
        let src = RectF::new(100.0, 10.0, 400.0, 100.0);
        let dst = RectF::new(0.0, 0.0, 300.0, 90.0);
        let draws = segment_draws(&rects, 128.0, dst, src);
        assert_eq!(draws.len(), 4);
        assert_partition(&draws, src);

        // Destination rects tile the destination without gaps on x.
        let mut xs: Vec<f32> = draws.iter().map(|d| d.dst.left).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs[0], 0.0);
    }

    #[test]
    fn test_zero_area_intersection_skipped() {
        let rects = grid(256.0, 128.0, 128.0);
        // Source entirely inside the first segment.
        let src = RectF::new(0.0, 0.0, 100.0, 100.0);
        let dst = RectF::new(0.0, 0.0, 100.0, 100.0);
        let draws = segment_draws(&rects, 128.0, dst, src);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].segment, 0);
    }

    #[test]
    fn test_tile_draws_clip_last_row_and_column() {
        let tiles = tile_draws(40.0, 40.0, RectF::new(0.0, 0.0, 100.0, 50.0));
        // 3 columns x 2 rows.
        assert_eq!(tiles.len(), 6);
        let (last_dst, last_src) = tiles[tiles.len() - 1];
        assert_eq!(last_dst.right, 100.0);
        assert_eq!(last_dst.bottom, 50.0);
        assert_eq!(last_src.right, 20.0);
        assert_eq!(last_src.bottom, 10.0);
    }

    #[test]
    fn test_mask_skip_requires_negative_height() {
        let normal = RectF::new(0.0, 0.0, 50.0, 50.0);
        assert!(!mask_segment_skipped(normal, normal));

        // The legacy condition only fires when the mask height is negative.
        let degenerate = RectF {
            left: 10.0,
            top: 10.0,
            right: 50.0,
            bottom: -5.0,
        };
        assert!(mask_segment_skipped(
            degenerate,
            RectF::new(0.0, 0.0, 100.0, 100.0)
        ));
    }

    #[test]
    fn test_from_rgba_segment_grid() {
        let w = 10u32;
        let h = 6u32;
        let rgba = vec![128u8; (w * h * 4) as usize];
        let bmp = SegmentedBitmap::from_rgba(&rgba, w, h, 4).unwrap();
        assert_eq!(bmp.segments().len(), 6); // 3 cols x 2 rows
        let total: u32 = bmp.segments().iter().map(|s| s.w * s.h).sum();
        assert_eq!(total, w * h);
    }
}
