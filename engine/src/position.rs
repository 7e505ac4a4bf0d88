//! Window-geometry solver
//!
//! Bidirectional mapping between the symbolic coordinate grammar and absolute
//! multi-monitor screen coordinates.
//!
//! Per axis the grammar is `<number>[%][R|B][@<monitor>]`: `%` resolves
//! against the selected span, `R`/`B` measure from the far edge, `@0` pins to
//! the virtual screen and `@1..` to an individual monitor. The anchor pair
//! uses the same grammar resolved against the skin's own size. Modifiers that
//! appear before an unresolved `#variable#` marker are ignored.

use lamina_core::RectI;

use crate::monitor::MonitorLayout;

/// Snap threshold in pixels for edge and window snapping.
pub const SNAP_DISTANCE: i32 = 10;

/// Parsed modifiers of one symbolic coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ParsedCoord {
    number: f32,
    percentage: bool,
    from_edge: bool,
    screen: Option<i64>,
}

fn parse_coord(s: &str, edge_flag: char, allow_negative: bool) -> ParsedCoord {
    let digits: &[char] = if allow_negative {
        &['-', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.']
    } else {
        &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.']
    };
    let prefix_end = s
        .char_indices()
        .find(|(_, c)| !digits.contains(c))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let number = s[..prefix_end].parse::<f32>().unwrap_or(0.0);

    // A modifier only counts when it appears after the last unresolved
    // variable marker.
    let hash = s.rfind('#');
    let after_hash = |idx: Option<usize>| match (idx, hash) {
        (Some(i), Some(h)) => (h < i).then_some(i),
        (Some(i), None) => Some(i),
        _ => None,
    };

    let percentage = after_hash(s.rfind('%')).is_some();
    let from_edge = after_hash(s.rfind(edge_flag)).is_some();

    let screen = after_hash(s.rfind('@')).and_then(|at| {
        let rest = &s[at + 1..];
        let end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let digits = &rest[..end];
        (!digits.is_empty()).then(|| digits.parse::<i64>().ok())?
    });

    ParsedCoord {
        number,
        percentage,
        from_edge,
        screen,
    }
}

/// The symbolic and absolute forms of one skin window's placement.
///
/// Whichever form was last written is authoritative until the other is
/// recomputed by [`window_to_screen`](Self::window_to_screen) or
/// [`screen_to_window`](Self::screen_to_window).
#[derive(Debug, Clone)]
pub struct WindowPlacement {
    pub window_x: String,
    pub window_y: String,
    pub anchor_x: String,
    pub anchor_y: String,

    pub screen_x: i32,
    pub screen_y: i32,
    pub window_w: i32,
    pub window_h: i32,

    anchor_screen_x: i32,
    anchor_screen_y: i32,
    x_screen: usize,
    y_screen: usize,
    x_screen_defined: bool,
    y_screen_defined: bool,
    x_from_right: bool,
    y_from_bottom: bool,
    x_percentage: bool,
    y_percentage: bool,

    pub auto_select_screen: bool,
}

impl Default for WindowPlacement {
    fn default() -> Self {
        Self {
            window_x: "0".to_owned(),
            window_y: "0".to_owned(),
            anchor_x: "0".to_owned(),
            anchor_y: "0".to_owned(),
            screen_x: 0,
            screen_y: 0,
            window_w: 0,
            window_h: 0,
            anchor_screen_x: 0,
            anchor_screen_y: 0,
            x_screen: 1,
            y_screen: 1,
            x_screen_defined: false,
            y_screen_defined: false,
            x_from_right: false,
            y_from_bottom: false,
            x_percentage: false,
            y_percentage: false,
            auto_select_screen: false,
        }
    }
}

impl WindowPlacement {
    /// Placement with the given symbolic coordinates and window size.
    pub fn with_position(x: &str, y: &str, w: i32, h: i32) -> Self {
        Self {
            window_x: x.to_owned(),
            window_y: y.to_owned(),
            window_w: w,
            window_h: h,
            ..Self::default()
        }
    }

    /// Resolve the symbolic position to absolute screen coordinates.
    pub fn window_to_screen(&mut self, layout: &MonitorLayout) {
        // Reset position flags; default both axes to the primary screen.
        self.x_screen = layout.primary_index();
        self.y_screen = layout.primary_index();
        self.x_screen_defined = false;
        self.y_screen_defined = false;

        // Anchor, resolved against the window's own size.
        let ax = parse_coord(&self.anchor_x, 'R', false);
        let mut pixel = if ax.percentage {
            (self.window_w as f32 * ax.number / 100.0) as i32
        } else {
            ax.number as i32
        };
        if ax.from_edge {
            pixel = self.window_w - pixel;
        }
        self.anchor_screen_x = pixel;

        let ay = parse_coord(&self.anchor_y, 'B', false);
        let mut pixel = if ay.percentage {
            (self.window_h as f32 * ay.number / 100.0) as i32
        } else {
            ay.number as i32
        };
        if ay.from_edge {
            pixel = self.window_h - pixel;
        }
        self.anchor_screen_y = pixel;

        // X, part 1: flags and screen selection. The final coordinate is
        // computed after Y so a monitor defined only on Y carries over.
        let px = parse_coord(&self.window_x, 'R', true);
        self.x_percentage = px.percentage;
        self.x_from_right = px.from_edge;
        if let Some(screen) = px.screen {
            if screen >= 0 && layout.index_valid(screen as usize) {
                self.x_screen = screen as usize;
                self.x_screen_defined = true;
                // X and Y default to the same screen unless Y overrides.
                self.y_screen = self.x_screen;
                self.y_screen_defined = true;
            }
        }

        // Y: flags, screen selection, resolution.
        let py = parse_coord(&self.window_y, 'B', true);
        self.y_percentage = py.percentage;
        self.y_from_bottom = py.from_edge;
        if let Some(screen) = py.screen {
            if screen >= 0 && layout.index_valid(screen as usize) {
                self.y_screen = screen as usize;
                self.y_screen_defined = true;
                if !self.x_screen_defined {
                    self.x_screen = self.y_screen;
                    self.x_screen_defined = true;
                }
            }
        }

        let span = layout.span(self.y_screen);
        let (screen_y, screen_h) = (span.top, span.height());
        let mut pixel = if self.y_percentage {
            (screen_h as f32 * py.number / 100.0) as i32
        } else {
            py.number as i32
        };
        pixel = if self.y_from_bottom {
            screen_y + (screen_h - pixel)
        } else {
            screen_y + pixel
        };
        self.screen_y = pixel - self.anchor_screen_y;

        // X, part 2.
        let span = layout.span(self.x_screen);
        let (screen_x, screen_w) = (span.left, span.width());
        let mut pixel = if self.x_percentage {
            (screen_w as f32 * px.number / 100.0) as i32
        } else {
            px.number as i32
        };
        pixel = if self.x_from_right {
            screen_x + (screen_w - pixel)
        } else {
            screen_x + pixel
        };
        self.screen_x = pixel - self.anchor_screen_x;
    }

    /// Recompute the symbolic position from the absolute coordinates,
    /// keeping the modifier set of the previous symbolic form.
    ///
    /// With auto-select enabled the monitor assignment is re-derived from
    /// the window rectangle's best overlap first; returns `true` when that
    /// changed the assignment (monitor-scoped variables must be reset).
    pub fn screen_to_window(&mut self, layout: &MonitorLayout) -> bool {
        let mut monitor_changed = false;

        if self.auto_select_screen {
            let rect = RectI::from_xywh(
                self.screen_x,
                self.screen_y,
                self.window_w.max(0),
                self.window_h.max(0),
            );
            let index = layout.nearest_to(&rect);
            monitor_changed = !self.x_screen_defined
                || !self.y_screen_defined
                || self.x_screen != index
                || self.y_screen != index;
            self.x_screen = index;
            self.y_screen = index;
            self.x_screen_defined = true;
            self.y_screen_defined = true;
        }

        let span = layout.span(self.x_screen);
        let (screen_x, screen_w) = (span.left, span.width());
        let pixel = if self.x_from_right {
            (screen_x + screen_w) - self.screen_x - self.anchor_screen_x
        } else {
            self.screen_x - screen_x + self.anchor_screen_x
        };
        let mut formatted = if self.x_percentage {
            format!("{:.5}%", 100.0 * pixel as f32 / screen_w as f32)
        } else {
            pixel.to_string()
        };
        if self.x_from_right {
            formatted.push('R');
        }
        if self.x_screen_defined {
            formatted.push_str(&format!("@{}", self.x_screen));
        }
        self.window_x = formatted;

        let span = layout.span(self.y_screen);
        let (screen_y, screen_h) = (span.top, span.height());
        let pixel = if self.y_from_bottom {
            (screen_y + screen_h) - self.screen_y - self.anchor_screen_y
        } else {
            self.screen_y - screen_y + self.anchor_screen_y
        };
        let mut formatted = if self.y_percentage {
            format!("{:.5}%", 100.0 * pixel as f32 / screen_h as f32)
        } else {
            pixel.to_string()
        };
        if self.y_from_bottom {
            formatted.push('B');
        }
        if self.y_screen_defined {
            formatted.push_str(&format!("@{}", self.y_screen));
        }
        self.window_y = formatted;

        monitor_changed
    }
}

/// Clamp a window rectangle into whichever monitor contains its center or a
/// corner, testing the center first. When no monitor contains any test
/// point, clamp into the primary monitor's work area.
pub fn map_coords_to_screen(x: &mut i32, y: &mut i32, w: i32, h: i32, layout: &MonitorLayout) {
    let points = [
        (*x + w / 2, *y + h / 2),
        (*x, *y),
        (*x + w, *y + h),
        (*x, *y + h),
        (*x + w, *y),
    ];

    for (px, py) in points {
        for monitor in layout.monitors() {
            if !monitor.active {
                continue;
            }
            let r = monitor.screen;
            if r.contains(px, py) {
                *x = (*x).min(r.right - w).max(r.left);
                *y = (*y).min(r.bottom - h).max(r.top);
                return;
            }
        }
    }

    let r = layout.primary().work;
    *x = (*x).min(r.right - w).max(r.left);
    *y = (*y).min(r.bottom - h).max(r.top);
}

fn within_snap(value: i32, target: i32) -> bool {
    value < SNAP_DISTANCE + target && value > target - SNAP_DISTANCE
}

/// Snap the dragged rectangle's edges flush to another window's edges when
/// the perpendicular spans overlap.
pub fn snap_to_window(x: &mut i32, y: &mut i32, w: i32, h: i32, other: &RectI) {
    let (ox, oy, ow, oh) = (other.left, other.top, other.width(), other.height());

    if *y < oy + oh && *y + h > oy {
        if within_snap(*x, ox) {
            *x = ox;
        }
        if within_snap(*x, ox + ow) {
            *x = ox + ow;
        }
        if within_snap(*x + w, ox) {
            *x = ox - w;
        }
        if within_snap(*x + w, ox + ow) {
            *x = ox + ow - w;
        }
    }

    if *x < ox + ow && *x + w > ox {
        if within_snap(*y, oy) {
            *y = oy;
        }
        if within_snap(*y, oy + oh) {
            *y = oy + oh;
        }
        if within_snap(*y + h, oy) {
            *y = oy - h;
        }
        if within_snap(*y + h, oy + oh) {
            *y = oy + oh - h;
        }
    }
}

/// Snap to the work-area edges of the monitor with the largest geometric
/// intersection with the window's prospective rectangle.
pub fn snap_to_work_area(x: &mut i32, y: &mut i32, w: i32, h: i32, layout: &MonitorLayout) {
    let window = RectI::from_xywh(*x, *y, w.max(1), h.max(1));

    let mut work_area = None;
    let mut max_size = 0i64;
    for monitor in layout.monitors() {
        if !monitor.active {
            continue;
        }
        let size = monitor.screen.intersection_area(&window);
        if size > max_size {
            max_size = size;
            work_area = Some(monitor.work);
        }
    }
    let Some(work) = work_area else { return };

    let far_x = work.right - w;
    let far_y = work.bottom - h;
    if within_snap(*x, work.left) {
        *x = work.left;
    }
    if within_snap(*y, work.top) {
        *y = work.top;
    }
    if within_snap(*x, far_x) {
        *x = far_x;
    }
    if within_snap(*y, far_y) {
        *y = far_y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MonitorInfo;

    fn layout_1080p() -> MonitorLayout {
        MonitorLayout::single()
    }

    #[test]
    fn test_parse_coord_modifiers() {
        let p = parse_coord("50%R@2", 'R', true);
        assert_eq!(p.number, 50.0);
        assert!(p.percentage);
        assert!(p.from_edge);
        assert_eq!(p.screen, Some(2));

        let p = parse_coord("-120", 'R', true);
        assert_eq!(p.number, -120.0);
        assert!(!p.percentage);
        assert!(p.screen.is_none());
    }

    #[test]
    fn test_parse_coord_ignores_modifiers_before_variable_marker() {
        // An unresolved "#WORKAREAX@2#" marker must not count as modifiers.
        let p = parse_coord("10#WORKAREAX@2#", 'R', true);
        assert_eq!(p.number, 10.0);
        assert!(p.screen.is_none());

        let p = parse_coord("10#VAR#%", 'R', true);
        assert!(p.percentage);
    }

    #[test]
    fn test_anchor_center_resolution() {
        let mut p = WindowPlacement {
            window_x: "50%".to_owned(),
            window_y: "10".to_owned(),
            anchor_x: "50%".to_owned(),
            window_w: 200,
            window_h: 100,
            ..Default::default()
        };
        p.window_to_screen(&layout_1080p());
        assert_eq!(p.screen_x, 960 - 100);
        assert_eq!(p.screen_y, 10);
    }

    #[test]
    fn test_from_right_and_bottom() {
        let mut p = WindowPlacement {
            window_x: "10R".to_owned(),
            window_y: "10B".to_owned(),
            window_w: 50,
            window_h: 50,
            ..Default::default()
        };
        p.window_to_screen(&layout_1080p());
        assert_eq!(p.screen_x, 1920 - 10);
        assert_eq!(p.screen_y, 1080 - 10);
    }

    #[test]
    fn test_invalid_monitor_index_keeps_primary() {
        let mut p = WindowPlacement {
            window_x: "100@7".to_owned(),
            window_y: "0".to_owned(),
            ..Default::default()
        };
        p.window_to_screen(&layout_1080p());
        assert_eq!(p.screen_x, 100);
        assert!(!p.x_screen_defined);
    }

    #[test]
    fn test_monitor_defined_on_y_carries_to_x() {
        let layout = MonitorLayout::new(
            vec![
                MonitorInfo::new("Left", RectI::from_xywh(0, 0, 1920, 1080)),
                MonitorInfo::new("Right", RectI::from_xywh(1920, 0, 1280, 1024)),
            ],
            1,
        );
        let mut p = WindowPlacement {
            window_x: "50".to_owned(),
            window_y: "500@2".to_owned(),
            ..Default::default()
        };
        p.window_to_screen(&layout);
        assert_eq!(p.screen_y, 500);
        // X inherits monitor 2's origin.
        assert_eq!(p.screen_x, 1920 + 50);
    }

    #[test]
    fn test_snap_to_window_flush_and_threshold() {
        let other = RectI::from_xywh(100, 100, 50, 50);

        // Within the threshold, spans overlapping vertically.
        let (mut x, mut y) = (156, 110);
        snap_to_window(&mut x, &mut y, 40, 40, &other);
        assert_eq!(x, 150);

        // Beyond the threshold: no snap.
        let (mut x, mut y) = (161, 110);
        snap_to_window(&mut x, &mut y, 40, 40, &other);
        assert_eq!(x, 161);

        // Spans not overlapping: no snap even within threshold.
        let (mut x, mut y) = (156, 300);
        snap_to_window(&mut x, &mut y, 40, 40, &other);
        assert_eq!(x, 156);
    }
}
