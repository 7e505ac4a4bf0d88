//! Window-geometry solver properties: symbolic round-trips across modifier
//! combinations and monitor counts, clamping, and snapping.

mod common;

use lamina_core::RectI;
use lamina_engine::monitor::{MonitorInfo, MonitorLayout};
use lamina_engine::position::{
    SNAP_DISTANCE, WindowPlacement, map_coords_to_screen, snap_to_window,
};

fn layout_with_monitors(count: usize) -> MonitorLayout {
    let sizes = [(1920, 1080), (1280, 1024), (2560, 1440), (1024, 768)];
    let mut monitors = Vec::new();
    let mut x = 0;
    for (w, h) in sizes.iter().take(count) {
        monitors.push(MonitorInfo::new(
            &format!("M{}", monitors.len() + 1),
            RectI::from_xywh(x, 0, *w, *h),
        ));
        x += w;
    }
    MonitorLayout::new(monitors, 1)
}

#[test]
fn round_trip_preserves_position_for_all_modifier_combinations() {
    for monitor_count in 1..=4usize {
        let layout = layout_with_monitors(monitor_count);

        for percentage in [false, true] {
            for from_edge in [false, true] {
                for screen in 0..=monitor_count {
                    for defined in [false, true] {
                        if !defined && screen != 0 {
                            continue;
                        }

                        let base = if percentage { "25%" } else { "120" };
                        let suffix_x = if from_edge { "R" } else { "" };
                        let suffix_y = if from_edge { "B" } else { "" };
                        let at = if defined {
                            format!("@{screen}")
                        } else {
                            String::new()
                        };

                        let mut placement = WindowPlacement::with_position(
                            &format!("{base}{suffix_x}{at}"),
                            &format!("{base}{suffix_y}{at}"),
                            200,
                            150,
                        );

                        placement.window_to_screen(&layout);
                        let (x1, y1) = (placement.screen_x, placement.screen_y);

                        placement.screen_to_window(&layout);
                        placement.window_to_screen(&layout);
                        let (x2, y2) = (placement.screen_x, placement.screen_y);

                        // Percentage formatting rounds to 5 decimals; allow
                        // a pixel of slack there, exactness otherwise.
                        let tolerance = if percentage { 1 } else { 0 };
                        assert!(
                            (x1 - x2).abs() <= tolerance && (y1 - y2).abs() <= tolerance,
                            "round trip moved the window: ({x1},{y1}) -> ({x2},{y2}) \
                             for x='{}' y='{}' on {monitor_count} monitor(s)",
                            placement.window_x,
                            placement.window_y,
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn round_trip_keeps_modifier_set() {
    let layout = layout_with_monitors(2);
    let mut placement = WindowPlacement::with_position("30%R@2", "40B@2", 100, 100);
    placement.window_to_screen(&layout);
    placement.screen_to_window(&layout);

    assert!(placement.window_x.contains('%'));
    assert!(placement.window_x.ends_with("@2"));
    assert!(placement.window_x.contains('R'));
    assert!(placement.window_y.contains('B'));
    assert!(placement.window_y.ends_with("@2"));
}

#[test]
fn anchored_percentage_resolves_to_centered_position() {
    // WindowX=50%, WindowY=10, AnchorX=50% on a 1920x1080 primary monitor
    // puts the window at X = 960 - width/2, Y = 10.
    let layout = MonitorLayout::single();
    let mut placement = WindowPlacement::with_position("50%", "10", 300, 200);
    placement.anchor_x = "50%".to_owned();
    placement.window_to_screen(&layout);
    assert_eq!(placement.screen_x, 960 - 150);
    assert_eq!(placement.screen_y, 10);
}

#[test]
fn window_outside_all_monitors_clamps_to_primary_work_area() {
    let layout = common::dual_layout();
    let (mut x, mut y) = (9000, 9000);
    map_coords_to_screen(&mut x, &mut y, 100, 100, &layout);

    let work = layout.primary().work;
    assert!(x >= work.left && x + 100 <= work.right);
    assert!(y >= work.top && y + 100 <= work.bottom);
    assert_eq!((x, y), (work.right - 100, work.bottom - 100));
}

#[test]
fn window_partially_visible_clamps_into_containing_monitor() {
    let layout = common::dual_layout();
    // Center lands on monitor 2; the rectangle is pulled fully inside it.
    let (mut x, mut y) = (3150, 1000);
    map_coords_to_screen(&mut x, &mut y, 200, 100, &layout);
    let screen = layout.monitors()[1].screen;
    assert!(x >= screen.left && x + 200 <= screen.right);
    assert!(y >= screen.top && y + 100 <= screen.bottom);
}

#[test]
fn snapping_is_flush_within_distance_only() {
    let neighbor = RectI::from_xywh(500, 500, 120, 80);

    // One pixel inside the threshold, vertical spans overlapping.
    let (mut x, mut y) = (620 + SNAP_DISTANCE - 1, 520);
    snap_to_window(&mut x, &mut y, 100, 50, &neighbor);
    assert_eq!(x, 620, "left edge should snap flush to the neighbor's right");

    // Exactly at the threshold: no snap.
    let (mut x, mut y) = (620 + SNAP_DISTANCE, 520);
    snap_to_window(&mut x, &mut y, 100, 50, &neighbor);
    assert_eq!(x, 620 + SNAP_DISTANCE);

    // Right edge of the dragged window to the neighbor's left edge.
    let (mut x, mut y) = (500 - 100 + 3, 520);
    snap_to_window(&mut x, &mut y, 100, 50, &neighbor);
    assert_eq!(x, 400);

    // Perpendicular spans not overlapping: no snap at all.
    let (mut x, mut y) = (623, 700);
    snap_to_window(&mut x, &mut y, 100, 50, &neighbor);
    assert_eq!(x, 623);
}
