//! Small geometry types shared between the contracts and the engine

use serde::{Deserialize, Serialize};

/// Integer rectangle in screen or canvas coordinates (left/top inclusive,
/// right/bottom exclusive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectI {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl RectI {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Intersection with `other`, or `None` when the rectangles are disjoint.
    pub fn intersect(&self, other: &RectI) -> Option<RectI> {
        let r = RectI::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!r.is_empty()).then_some(r)
    }

    /// Area of the intersection with `other` (zero when disjoint).
    pub fn intersection_area(&self, other: &RectI) -> i64 {
        self.intersect(other)
            .map(|r| r.width() as i64 * r.height() as i64)
            .unwrap_or(0)
    }

    pub fn union(&self, other: &RectI) -> RectI {
        RectI::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect() {
        let a = RectI::from_xywh(0, 0, 100, 100);
        let b = RectI::from_xywh(50, 50, 100, 100);
        assert_eq!(a.intersect(&b), Some(RectI::new(50, 50, 100, 100)));
        assert_eq!(a.intersection_area(&b), 2500);

        let c = RectI::from_xywh(200, 200, 10, 10);
        assert_eq!(a.intersect(&c), None);
        assert_eq!(a.intersection_area(&c), 0);
    }

    #[test]
    fn test_contains_excludes_far_edge() {
        let r = RectI::from_xywh(10, 10, 5, 5);
        assert!(r.contains(10, 10));
        assert!(r.contains(14, 14));
        assert!(!r.contains(15, 10));
    }
}
