//! Skin runtime behavior: the update → redraw cycle, bang dispatch, fades,
//! mouse dispatch, and lifecycle.

mod common;

use std::cell::RefCell;
use std::time::Duration;

use common::{SKIN_FOLDER, build_skin, build_skin_with, minimal_config};
use lamina_core::settings::SkinSettings;
use lamina_core::{ConfigSource, MemoryConfig, SettingFlags, SettingsStore};
use lamina_engine::canvas::Canvas;
use lamina_engine::measure::{Measure, MeasureBase, MeasureValues};
use lamina_engine::meter::{Meter, MeterBase};
use lamina_engine::monitor::MonitorLayout;
use lamina_engine::skin::{Bang, ButtonEvent, Modifiers, MouseButton, SkinEvent, SkinState};
use lamina_engine::timer::TimerKind;

// ─────────────────────────────────────────────────────────────────────────────
// Activation and geometry
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn activation_resolves_symbolic_position_and_meter_extents() {
    let mut settings = SkinSettings::default();
    settings.window_x = "50%".to_owned();
    settings.window_y = "10".to_owned();
    settings.anchor_x = "50%".to_owned();

    let mut h = build_skin(minimal_config(), settings);
    h.skin.activate().unwrap();

    let rect = h.skin.window_rect();
    assert_eq!(rect.width(), 200);
    assert_eq!(rect.height(), 100);
    assert_eq!(rect.left, 960 - 100);
    assert_eq!(rect.top, 10);

    // The first frame was presented to the layered window.
    assert!(h.window.borrow().present_count >= 1);
    assert_eq!(h.window.borrow().width, 200);
}

#[test]
fn skin_without_meters_fails_activation_and_deactivates() {
    let mut config = MemoryConfig::new();
    config.set("OnlyMeasure", "Measure", "Counter");

    let mut h = build_skin(config, SkinSettings::default());
    assert!(h.skin.activate().is_err());
    assert_eq!(h.skin.state(), SkinState::Closing);
}

#[test]
fn unsupported_schema_version_is_fatal_to_skin() {
    let mut config = minimal_config();
    config.set("Skin", "SchemaVersion", "99");

    let mut h = build_skin(config, SkinSettings::default());
    assert!(h.skin.activate().is_err());
}

#[test]
fn unknown_meter_type_is_skipped_not_fatal() {
    let mut config = minimal_config();
    config.set("Bogus", "Meter", "NoSuchType");

    let mut h = build_skin(config, SkinSettings::default());
    h.skin.activate().unwrap();
    assert_eq!(h.skin.state(), SkinState::Running);
}

// ─────────────────────────────────────────────────────────────────────────────
// Update ordering
// ─────────────────────────────────────────────────────────────────────────────

thread_local! {
    static UPDATE_LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

struct LogMeasure {
    base: MeasureBase,
}

fn log_measure(name: &str) -> Box<dyn Measure> {
    Box::new(LogMeasure {
        base: MeasureBase::new(name),
    })
}

impl Measure for LogMeasure {
    fn base(&self) -> &MeasureBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut MeasureBase {
        &mut self.base
    }
    fn type_name(&self) -> &'static str {
        "LogMeasure"
    }
    fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.base.read_common_options(config, section);
    }
    fn update_value(&mut self) -> f64 {
        UPDATE_LOG.with(|log| log.borrow_mut().push(format!("measure:{}", self.base.name)));
        1.0
    }
}

struct LogMeter {
    base: MeterBase,
}

fn log_meter(name: &str) -> Box<dyn Meter> {
    let mut base = MeterBase::new(name);
    base.w = 10;
    base.h = 10;
    Box::new(LogMeter { base })
}

impl Meter for LogMeter {
    fn base(&self) -> &MeterBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut MeterBase {
        &mut self.base
    }
    fn type_name(&self) -> &'static str {
        "LogMeter"
    }
    fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.base.read_common_options(config, section);
    }
    fn update(&mut self, _values: &MeasureValues, _canvas: &mut Canvas) -> bool {
        UPDATE_LOG.with(|log| log.borrow_mut().push(format!("meter:{}", self.base.name)));
        false
    }
    fn draw(&mut self, _canvas: &mut Canvas) {}
}

#[test]
fn measures_update_strictly_before_meters_within_a_tick() {
    let mut config = MemoryConfig::new();
    config.set("MeasureOne", "Measure", "LogMeasure");
    config.set("MeasureTwo", "Measure", "LogMeasure");
    config.set("MeterOne", "Meter", "LogMeter");
    config.set("MeterTwo", "Meter", "LogMeter");

    let mut h = build_skin_with(
        config,
        SkinSettings::default(),
        MonitorLayout::single(),
        |meters, measures| {
            measures.register("LogMeasure", log_measure);
            meters.register("LogMeter", log_meter);
        },
    );
    h.skin.activate().unwrap();

    UPDATE_LOG.with(|log| log.borrow_mut().clear());
    h.skin.update(false);

    let log = UPDATE_LOG.with(|log| log.borrow().clone());
    let first_meter = log.iter().position(|e| e.starts_with("meter:")).unwrap();
    let last_measure = log.iter().rposition(|e| e.starts_with("measure:")).unwrap();
    assert!(
        last_measure < first_meter,
        "a measure updated after a meter: {log:?}"
    );
    // Registration order within each kind.
    assert_eq!(log[0], "measure:MeasureOne");
    assert_eq!(log[1], "measure:MeasureTwo");
    assert_eq!(log[first_meter], "meter:MeterOne");
}

// ─────────────────────────────────────────────────────────────────────────────
// Update dividers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn measure_divider_counts_elapsed_ticks_after_forced_refresh() {
    let mut config = minimal_config();
    config.set("MeasureCount", "Measure", "Counter");
    config.set("MeasureCount", "UpdateDivider", "2");
    config.set("MeasureCount", "Group", "Foo");

    let mut h = build_skin(config, SkinSettings::default());
    h.skin.activate().unwrap();
    // The forced refresh update ran the measure once.
    assert_eq!(h.skin.measure_value("MeasureCount"), Some(0.0));

    h.skin.update(false); // divider holds
    assert_eq!(h.skin.measure_value("MeasureCount"), Some(0.0));
    h.skin.update(false); // second elapsed tick fires
    assert_eq!(h.skin.measure_value("MeasureCount"), Some(1.0));
    h.skin.update(false); // holds again
    assert_eq!(h.skin.measure_value("MeasureCount"), Some(1.0));
}

// ─────────────────────────────────────────────────────────────────────────────
// Bangs
// ─────────────────────────────────────────────────────────────────────────────

fn three_meter_group_config() -> MemoryConfig {
    let mut config = MemoryConfig::new();
    for name in ["Foo1", "Foo2", "Foo3"] {
        config.set(name, "Meter", "Bar");
        config.set(name, "W", "100");
        config.set(name, "H", "200");
        config.set(name, "Group", "Foo");
    }
    config.set("Other", "Meter", "Bar");
    config.set("Other", "W", "50");
    config.set("Other", "H", "30");
    config
}

#[test]
fn hide_meter_group_hides_all_and_schedules_one_resize() {
    let mut h = build_skin(three_meter_group_config(), SkinSettings::default());
    h.skin.activate().unwrap();
    assert_eq!(h.skin.window_rect().height(), 200);

    let baseline = h.skin.resize_count();
    h.skin.do_bang(Bang::HideMeterGroup, &["Foo"]);
    // The recheck is batched: nothing resized yet.
    assert_eq!(h.skin.resize_count(), baseline);

    h.skin.update(false);
    assert_eq!(
        h.skin.resize_count(),
        baseline + 1,
        "three hidden meters must cost exactly one resize"
    );
    // Only the ungrouped meter still contributes to the extents.
    assert_eq!(h.skin.window_rect().width(), 50);
    assert_eq!(h.skin.window_rect().height(), 30);
}

#[test]
fn toggle_meter_bang_round_trips_window_size() {
    let mut h = build_skin(three_meter_group_config(), SkinSettings::default());
    h.skin.activate().unwrap();

    h.skin.do_bang(Bang::HideMeterGroup, &["Foo"]);
    h.skin.update(false);
    assert_eq!(h.skin.window_rect().height(), 30);

    h.skin.do_bang(Bang::ToggleMeterGroup, &["Foo"]);
    h.skin.update(false);
    assert_eq!(h.skin.window_rect().height(), 200);
}

#[test]
fn set_option_bang_reconfigures_meter_and_resizes() {
    let mut h = build_skin(minimal_config(), SkinSettings::default());
    h.skin.activate().unwrap();
    assert_eq!(h.skin.window_rect().width(), 200);

    h.skin.do_bang(Bang::SetOption, &["MeterA", "W", "300"]);
    h.skin.update(false);
    assert_eq!(h.skin.window_rect().width(), 300);
}

#[test]
fn disable_measure_bang_freezes_value() {
    let mut config = minimal_config();
    config.set("MeasureCount", "Measure", "Counter");

    let mut h = build_skin(config, SkinSettings::default());
    h.skin.activate().unwrap();
    h.skin.update(false);
    let before = h.skin.measure_value("MeasureCount").unwrap();

    h.skin.do_bang(Bang::DisableMeasure, &["MeasureCount"]);
    h.skin.update(false);
    h.skin.update(false);
    assert_eq!(h.skin.measure_value("MeasureCount"), Some(before));

    h.skin.do_bang(Bang::EnableMeasure, &["MeasureCount"]);
    h.skin.update(false);
    assert!(h.skin.measure_value("MeasureCount").unwrap() > before);
}

#[test]
fn bang_on_missing_meter_changes_nothing() {
    let mut h = build_skin(minimal_config(), SkinSettings::default());
    h.skin.activate().unwrap();
    let rect = h.skin.window_rect();

    h.skin.do_bang(Bang::HideMeter, &["NoSuchMeter"]);
    h.skin.update(false);
    assert_eq!(h.skin.window_rect(), rect);
    assert_eq!(h.skin.state(), SkinState::Running);
}

#[test]
fn transparency_and_persistence_bangs_write_masked_settings() {
    let mut h = build_skin(minimal_config(), SkinSettings::default());
    h.skin.activate().unwrap();
    let baseline = h.store.borrow().saves().len();

    h.skin.do_bang(Bang::ClickThrough, &["1"]);
    assert!(h.window.borrow().click_through);

    h.skin.do_bang(Bang::SnapEdges, &["-1"]);

    let saves = h.store.borrow().saves()[baseline..].to_vec();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[0].1, SettingFlags::CLICK_THROUGH);
    assert_eq!(saves[1].1, SettingFlags::SNAP_EDGES);

    let stored = h.store.borrow().load(SKIN_FOLDER);
    assert!(stored.click_through);
    // Snap edges defaulted to on; the toggle turned it off.
    assert!(!stored.snap_edges);
    assert_eq!(stored.alpha, 255);
}

// ─────────────────────────────────────────────────────────────────────────────
// Fade
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn fade_is_monotonic_and_reaches_target_after_duration() {
    let mut settings = SkinSettings::default();
    settings.fade_duration = 100;

    let mut h = build_skin(minimal_config(), settings);
    h.skin.activate().unwrap();

    h.skin.fade_window(0, 255);
    assert!(h.skin.timer_armed(TimerKind::Fade));

    let mut last = h.skin.transparency();
    for _ in 0..15 {
        h.clock.advance_millis(10);
        h.skin.handle_event(SkinEvent::Timer(TimerKind::Fade));
        let value = h.skin.transparency();
        assert!(value >= last, "fade went backwards: {last} -> {value}");
        last = value;
    }

    assert_eq!(h.skin.transparency(), 255);
    assert!(!h.skin.timer_armed(TimerKind::Fade));
    assert_eq!(h.window.borrow().alpha, 255);
}

#[test]
fn zero_duration_fade_applies_synchronously_without_timer() {
    let mut settings = SkinSettings::default();
    settings.fade_duration = 0;

    let mut h = build_skin(minimal_config(), settings);
    h.skin.activate().unwrap();

    h.skin.fade_window(77, 77);
    assert_eq!(h.skin.transparency(), 77);
    assert!(!h.skin.timer_armed(TimerKind::Fade));

    // Fading to zero hides the window outright.
    h.skin.fade_window(77, 0);
    assert!(!h.window.borrow().visible);
    assert!(!h.skin.timer_armed(TimerKind::Fade));
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn deactivation_fades_out_then_finishes_after_the_delay() {
    let mut settings = SkinSettings::default();
    settings.fade_duration = 50;

    let mut config = minimal_config();
    config.set("Skin", "OnCloseAction", "CloseRan");

    let mut h = build_skin(config, settings);
    h.skin.activate().unwrap();
    assert!(h.window.borrow().visible);

    h.skin.deactivate();
    assert_eq!(h.skin.state(), SkinState::Closing);
    assert!(!h.skin.is_closed());

    for _ in 0..30 {
        h.clock.advance_millis(10);
        h.skin.pump();
        if h.skin.is_closed() {
            break;
        }
    }

    assert!(h.skin.is_closed(), "skin never finished closing");
    assert!(!h.window.borrow().visible);
    assert!(
        h.executor
            .commands()
            .iter()
            .any(|(cmd, _)| cmd == "CloseRan")
    );
}

#[test]
fn deactivation_is_terminal_and_ignores_refresh() {
    let mut h = build_skin(minimal_config(), SkinSettings::default());
    h.skin.activate().unwrap();
    h.skin.deactivate();
    h.skin.refresh(false, false).unwrap();
    assert_eq!(h.skin.state(), SkinState::Closing);
}

// ─────────────────────────────────────────────────────────────────────────────
// Transitions
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn active_transition_arms_dedicated_timer_until_settled() {
    let mut config = MemoryConfig::new();
    config.set("MeasureCount", "Measure", "Counter");
    config.set("MeterBar", "Meter", "Bar");
    config.set("MeterBar", "MeasureName", "MeasureCount");
    config.set("MeterBar", "Smooth", "1");
    config.set("MeterBar", "W", "100");
    config.set("MeterBar", "H", "20");

    let mut h = build_skin(config, SkinSettings::default());
    h.skin.activate().unwrap();

    // Counter growth moves the bar target; smoothing reports a transition.
    h.skin.update(false);
    h.skin.update(false);
    assert!(h.skin.timer_armed(TimerKind::Transition));

    // Transition ticks redraw (advancing the animation) until it settles.
    for _ in 0..60 {
        h.skin.handle_event(SkinEvent::Timer(TimerKind::Transition));
        if !h.skin.timer_armed(TimerKind::Transition) {
            break;
        }
    }
    assert!(!h.skin.timer_armed(TimerKind::Transition));
}

// ─────────────────────────────────────────────────────────────────────────────
// Mouse dispatch
// ─────────────────────────────────────────────────────────────────────────────

fn mouse_config() -> MemoryConfig {
    let mut config = MemoryConfig::new();
    config.set("Skin", "BackgroundMode", "2");
    config.set("Skin", "SolidColor", "30,30,30,255");
    config.set("Skin", "LeftMouseUpAction", "SkinClicked");
    config.set("Skin", "MouseOverAction", "SkinOver");
    config.set("Skin", "MouseLeaveAction", "SkinLeave");

    config.set("Under", "Meter", "Bar");
    config.set("Under", "W", "100");
    config.set("Under", "H", "50");
    config.set("Under", "LeftMouseUpAction", "UnderClicked");

    // Registered later, so it paints (and hit-tests) on top.
    config.set("Top", "Meter", "Bar");
    config.set("Top", "X", "20");
    config.set("Top", "Y", "20");
    config.set("Top", "W", "40");
    config.set("Top", "H", "40");
    config.set("Top", "LeftMouseUpAction", "TopClicked");
    config.set("Top", "MouseOverAction", "TopOver");
    config.set("Top", "MouseLeaveAction", "TopLeave");
    config
}

fn left_up(x: i32, y: i32) -> SkinEvent {
    SkinEvent::MouseButton {
        button: MouseButton::Left,
        event: ButtonEvent::Up,
        x,
        y,
        modifiers: Modifiers::default(),
    }
}

#[test]
fn frontmost_meter_claims_the_click() {
    let mut h = build_skin(mouse_config(), SkinSettings::default());
    h.skin.activate().unwrap();
    h.executor.clear();

    // Inside both meters: the later-registered (topmost) one wins.
    h.skin.handle_event(left_up(30, 30));
    // Under the overlap area only the lower meter matches.
    h.skin.handle_event(left_up(5, 5));
    // Outside every meter but on opaque background: the skin action runs.
    h.skin.handle_event(left_up(80, 55));

    let commands: Vec<String> = h.executor.commands().into_iter().map(|(c, _)| c).collect();
    assert_eq!(commands, vec!["TopClicked", "UnderClicked", "SkinClicked"]);
}

#[test]
fn hover_actions_are_edge_triggered_and_rearmed_by_leave_sweep() {
    let mut h = build_skin(mouse_config(), SkinSettings::default());
    h.skin.activate().unwrap();
    h.executor.clear();

    let inside = SkinEvent::MouseMove {
        x: 30,
        y: 30,
        modifiers: Modifiers::default(),
    };

    h.skin.handle_event(inside);
    h.skin.handle_event(inside);
    h.skin.handle_event(inside);

    let over_count = |cmds: &[(String, String)], name: &str| {
        cmds.iter().filter(|(c, _)| c == name).count()
    };
    let commands = h.executor.commands();
    assert_eq!(over_count(&commands, "SkinOver"), 1);
    assert_eq!(over_count(&commands, "TopOver"), 1);

    // Forced leave-all sweep re-arms both skin and meter hover.
    h.skin.handle_event(SkinEvent::MouseLeave);
    h.skin.handle_event(inside);

    let commands = h.executor.commands();
    assert_eq!(over_count(&commands, "SkinLeave"), 1);
    assert_eq!(over_count(&commands, "TopLeave"), 1);
    assert_eq!(over_count(&commands, "SkinOver"), 2);
    assert_eq!(over_count(&commands, "TopOver"), 2);
}

#[test]
fn click_through_suppresses_mouse_unless_modifier_held() {
    let mut settings = SkinSettings::default();
    settings.click_through = true;

    let mut h = build_skin(mouse_config(), settings);
    h.skin.activate().unwrap();
    h.executor.clear();

    h.skin.handle_event(left_up(30, 30));
    assert!(h.executor.commands().is_empty());

    h.skin.handle_event(SkinEvent::MouseButton {
        button: MouseButton::Left,
        event: ButtonEvent::Up,
        x: 30,
        y: 30,
        modifiers: Modifiers {
            ctrl: true,
            ..Default::default()
        },
    });
    let commands = h.executor.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].0, "TopClicked");
}

// ─────────────────────────────────────────────────────────────────────────────
// Window moves
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn snapping_during_move_respects_modifier_escape() {
    let mut h = build_skin(minimal_config(), SkinSettings::default());
    h.skin.activate().unwrap();

    let neighbor = lamina_core::RectI::from_xywh(500, 0, 100, 300);

    let (mut x, mut y) = (605, 50);
    h.skin
        .on_window_pos_changing(&mut x, &mut y, &[neighbor], Modifiers::default());
    assert_eq!(x, 600, "should snap flush to the neighbor edge");

    let (mut x, mut y) = (605, 50);
    h.skin.on_window_pos_changing(
        &mut x,
        &mut y,
        &[neighbor],
        Modifiers {
            ctrl: true,
            ..Default::default()
        },
    );
    assert_eq!(x, 605, "Ctrl disables snapping");
}

#[test]
fn moving_the_window_updates_symbolic_position_and_persists() {
    let mut h = build_skin(minimal_config(), SkinSettings::default());
    h.skin.activate().unwrap();

    h.skin.move_window(320, 240);
    assert_eq!(h.skin.window_rect().left, 320);
    assert_eq!(h.skin.placement().window_x, "320");

    let stored = h.store.borrow().load(SKIN_FOLDER);
    assert_eq!(stored.window_x, "320");
    assert_eq!(stored.window_y, "240");
}

// ─────────────────────────────────────────────────────────────────────────────
// Background probe measure
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn probe_measure_delivers_result_and_finish_action_on_ui_ticks() {
    let mut config = minimal_config();
    config.set("MeasurePing", "Measure", "Probe");
    // A connection to the local discard port fails immediately, which lands
    // the timeout sentinel in the slot.
    config.set("MeasurePing", "Address", "127.0.0.1:1");
    config.set("MeasurePing", "Timeout", "200");
    config.set("MeasurePing", "TimeoutValue", "42");
    config.set("MeasurePing", "UpdateRate", "1");
    config.set("MeasurePing", "FinishAction", "ProbeDone");

    let mut h = build_skin(config, SkinSettings::default());
    h.skin.activate().unwrap();

    let mut delivered = false;
    for _ in 0..100 {
        std::thread::sleep(Duration::from_millis(20));
        h.skin.update(false);
        if h.executor.commands().iter().any(|(c, _)| c == "ProbeDone") {
            delivered = true;
            break;
        }
    }
    assert!(delivered, "probe result never reached the UI thread");
    assert!(h.skin.measure_value("MeasurePing").is_some());
}
