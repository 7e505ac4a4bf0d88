//! Multi-monitor model
//!
//! Monitors are indexed the way the position grammar addresses them: `@0` is
//! the virtual screen (the union of every active monitor), `@1..` are the
//! individual monitors in enumeration order.

use lamina_core::RectI;

/// One connected monitor.
#[derive(Debug, Clone)]
pub struct MonitorInfo {
    /// Human-readable name/description.
    pub name: String,
    /// Full monitor bounds in virtual screen space.
    pub screen: RectI,
    /// Bounds minus taskbars/docks.
    pub work: RectI,
    /// Inactive monitors stay in the list to keep indices stable but are
    /// skipped by resolution and clamping.
    pub active: bool,
}

impl MonitorInfo {
    pub fn new(name: &str, screen: RectI) -> Self {
        Self {
            name: name.to_owned(),
            work: screen,
            screen,
            active: true,
        }
    }

    pub fn with_work_area(mut self, work: RectI) -> Self {
        self.work = work;
        self
    }
}

/// The monitor arrangement a skin resolves its position against.
#[derive(Debug, Clone)]
pub struct MonitorLayout {
    monitors: Vec<MonitorInfo>,
    /// 1-based index of the primary monitor.
    primary: usize,
}

impl MonitorLayout {
    pub fn new(monitors: Vec<MonitorInfo>, primary: usize) -> Self {
        debug_assert!(primary >= 1 && primary <= monitors.len());
        Self { monitors, primary }
    }

    /// A single 1920x1080 primary monitor with a 40px taskbar.
    pub fn single() -> Self {
        let screen = RectI::from_xywh(0, 0, 1920, 1080);
        let work = RectI::from_xywh(0, 0, 1920, 1040);
        Self::new(vec![MonitorInfo::new("Primary", screen).with_work_area(work)], 1)
    }

    pub fn monitors(&self) -> &[MonitorInfo] {
        &self.monitors
    }

    pub fn count(&self) -> usize {
        self.monitors.len()
    }

    /// 1-based index of the primary monitor.
    pub fn primary_index(&self) -> usize {
        self.primary
    }

    pub fn primary(&self) -> &MonitorInfo {
        &self.monitors[self.primary - 1]
    }

    /// Monitor by 1-based index, if present and active.
    pub fn get(&self, index: usize) -> Option<&MonitorInfo> {
        self.monitors
            .get(index.checked_sub(1)?)
            .filter(|m| m.active)
    }

    /// Bounding box of all active monitors (the `@0` span).
    pub fn virtual_screen(&self) -> RectI {
        let mut iter = self.monitors.iter().filter(|m| m.active);
        let Some(first) = iter.next() else {
            return RectI::default();
        };
        iter.fold(first.screen, |acc, m| acc.union(&m.screen))
    }

    /// The span a coordinate with screen index `index` resolves against:
    /// the virtual screen for 0, the monitor bounds otherwise.
    pub fn span(&self, index: usize) -> RectI {
        if index == 0 {
            self.virtual_screen()
        } else {
            self.monitors[index - 1].screen
        }
    }

    /// Whether `@index` is addressable: 0, or an active monitor.
    pub fn index_valid(&self, index: usize) -> bool {
        index == 0 || self.get(index).is_some()
    }

    /// 1-based index of the active monitor with the largest intersection
    /// with `rect`, or the primary when nothing overlaps.
    pub fn nearest_to(&self, rect: &RectI) -> usize {
        let mut best = self.primary;
        let mut best_area = 0i64;
        for (i, m) in self.monitors.iter().enumerate() {
            if !m.active {
                continue;
            }
            let area = m.screen.intersection_area(rect);
            if area > best_area {
                best_area = area;
                best = i + 1;
            }
        }
        best
    }
}

impl Default for MonitorLayout {
    fn default() -> Self {
        Self::single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual() -> MonitorLayout {
        MonitorLayout::new(
            vec![
                MonitorInfo::new("Left", RectI::from_xywh(0, 0, 1920, 1080)),
                MonitorInfo::new("Right", RectI::from_xywh(1920, 0, 1280, 1024)),
            ],
            1,
        )
    }

    #[test]
    fn test_virtual_screen_union() {
        let layout = dual();
        assert_eq!(layout.virtual_screen(), RectI::new(0, 0, 3200, 1080));
        assert_eq!(layout.span(0), RectI::new(0, 0, 3200, 1080));
        assert_eq!(layout.span(2), RectI::from_xywh(1920, 0, 1280, 1024));
    }

    #[test]
    fn test_nearest_by_overlap() {
        let layout = dual();
        let mostly_right = RectI::from_xywh(1900, 100, 200, 100);
        assert_eq!(layout.nearest_to(&mostly_right), 2);
        let nowhere = RectI::from_xywh(-5000, -5000, 10, 10);
        assert_eq!(layout.nearest_to(&nowhere), 1);
    }

    #[test]
    fn test_inactive_monitor_not_addressable() {
        let mut layout = dual();
        layout.monitors[1].active = false;
        assert!(layout.index_valid(0));
        assert!(layout.index_valid(1));
        assert!(!layout.index_valid(2));
        assert!(!layout.index_valid(3));
    }
}
