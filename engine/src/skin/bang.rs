//! Bang dispatch
//!
//! The closed set of named commands that mutate a running skin: meter and
//! measure visibility/state, mouse action tables, window geometry and
//! z-order, blur, variables and options. Geometry-affecting bangs schedule a
//! window-size recheck instead of resizing immediately, so several bangs in
//! one tick cost a single resize.

use lamina_core::SettingFlags;
use lamina_core::settings::ZPosition;

use crate::measure::update_measure;
use crate::skin::{ResizeMode, SKIN_SECTION, Skin, SkinState};
use crate::timer::TimerKind;

/// The bang vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bang {
    Refresh,
    Redraw,
    Update,
    ShowBlur,
    HideBlur,
    ToggleBlur,
    AddBlur,
    RemoveBlur,
    ShowMeter,
    HideMeter,
    ToggleMeter,
    UpdateMeter,
    ShowMeterGroup,
    HideMeterGroup,
    ToggleMeterGroup,
    UpdateMeterGroup,
    EnableMouseAction,
    DisableMouseAction,
    ClearMouseAction,
    ToggleMouseAction,
    EnableMouseActionGroup,
    DisableMouseActionGroup,
    ClearMouseActionGroup,
    ToggleMouseActionGroup,
    EnableMeasure,
    DisableMeasure,
    ToggleMeasure,
    PauseMeasure,
    UnpauseMeasure,
    TogglePauseMeasure,
    UpdateMeasure,
    EnableMeasureGroup,
    DisableMeasureGroup,
    ToggleMeasureGroup,
    PauseMeasureGroup,
    UnpauseMeasureGroup,
    TogglePauseMeasureGroup,
    UpdateMeasureGroup,
    CommandMeasure,
    PluginBang,
    Show,
    Hide,
    Toggle,
    ShowFade,
    HideFade,
    ToggleFade,
    FadeDuration,
    Move,
    SetWindowPosition,
    SetAnchor,
    ZPos,
    ClickThrough,
    Draggable,
    SnapEdges,
    KeepOnScreen,
    AutoSelectScreen,
    SetTransparency,
    MoveMeter,
    SetVariable,
    SetOption,
    SetOptionGroup,
    Delay,
}

static BANGS: phf::Map<&'static str, Bang> = phf::phf_map! {
    "refresh" => Bang::Refresh,
    "redraw" => Bang::Redraw,
    "update" => Bang::Update,
    "showblur" => Bang::ShowBlur,
    "hideblur" => Bang::HideBlur,
    "toggleblur" => Bang::ToggleBlur,
    "addblur" => Bang::AddBlur,
    "removeblur" => Bang::RemoveBlur,
    "showmeter" => Bang::ShowMeter,
    "hidemeter" => Bang::HideMeter,
    "togglemeter" => Bang::ToggleMeter,
    "updatemeter" => Bang::UpdateMeter,
    "showmetergroup" => Bang::ShowMeterGroup,
    "hidemetergroup" => Bang::HideMeterGroup,
    "togglemetergroup" => Bang::ToggleMeterGroup,
    "updatemetergroup" => Bang::UpdateMeterGroup,
    "enablemouseaction" => Bang::EnableMouseAction,
    "disablemouseaction" => Bang::DisableMouseAction,
    "clearmouseaction" => Bang::ClearMouseAction,
    "togglemouseaction" => Bang::ToggleMouseAction,
    "enablemouseactiongroup" => Bang::EnableMouseActionGroup,
    "disablemouseactiongroup" => Bang::DisableMouseActionGroup,
    "clearmouseactiongroup" => Bang::ClearMouseActionGroup,
    "togglemouseactiongroup" => Bang::ToggleMouseActionGroup,
    "enablemeasure" => Bang::EnableMeasure,
    "disablemeasure" => Bang::DisableMeasure,
    "togglemeasure" => Bang::ToggleMeasure,
    "pausemeasure" => Bang::PauseMeasure,
    "unpausemeasure" => Bang::UnpauseMeasure,
    "togglepausemeasure" => Bang::TogglePauseMeasure,
    "updatemeasure" => Bang::UpdateMeasure,
    "enablemeasuregroup" => Bang::EnableMeasureGroup,
    "disablemeasuregroup" => Bang::DisableMeasureGroup,
    "togglemeasuregroup" => Bang::ToggleMeasureGroup,
    "pausemeasuregroup" => Bang::PauseMeasureGroup,
    "unpausemeasuregroup" => Bang::UnpauseMeasureGroup,
    "togglepausemeasuregroup" => Bang::TogglePauseMeasureGroup,
    "updatemeasuregroup" => Bang::UpdateMeasureGroup,
    "commandmeasure" => Bang::CommandMeasure,
    "pluginbang" => Bang::PluginBang,
    "show" => Bang::Show,
    "hide" => Bang::Hide,
    "toggle" => Bang::Toggle,
    "showfade" => Bang::ShowFade,
    "hidefade" => Bang::HideFade,
    "togglefade" => Bang::ToggleFade,
    "fadeduration" => Bang::FadeDuration,
    "move" => Bang::Move,
    "setwindowposition" => Bang::SetWindowPosition,
    "setanchor" => Bang::SetAnchor,
    "zpos" => Bang::ZPos,
    "clickthrough" => Bang::ClickThrough,
    "draggable" => Bang::Draggable,
    "snapedges" => Bang::SnapEdges,
    "keeponscreen" => Bang::KeepOnScreen,
    "autoselectscreen" => Bang::AutoSelectScreen,
    "settransparency" => Bang::SetTransparency,
    "movemeter" => Bang::MoveMeter,
    "setvariable" => Bang::SetVariable,
    "setoption" => Bang::SetOption,
    "setoptiongroup" => Bang::SetOptionGroup,
    "delay" => Bang::Delay,
};

impl Bang {
    /// Look up a bang by name; a leading `!` and case are ignored.
    pub fn from_name(name: &str) -> Option<Bang> {
        let name = name.trim().trim_start_matches('!').to_ascii_lowercase();
        BANGS.get(name.as_str()).copied()
    }
}

fn arg<'a>(args: &'a [&str], index: usize) -> &'a str {
    args.get(index).copied().unwrap_or("")
}

impl Skin {
    /// Execute a named bang against this skin.
    pub fn do_bang(&mut self, bang: Bang, args: &[&str]) {
        match bang {
            Bang::Refresh => {
                let _ = self.refresh(false, false);
            }

            Bang::Redraw => self.redraw(),

            Bang::Update => {
                // Restart the period so manual updates don't double-tick.
                self.timers.kill(TimerKind::Update);
                self.update(false);
                if self.update_interval >= 0 {
                    let now = self.now();
                    self.timers.set(
                        TimerKind::Update,
                        std::time::Duration::from_millis(self.update_interval.max(1) as u64),
                        now,
                    );
                }
            }

            Bang::ShowBlur => self.show_blur(),
            Bang::HideBlur => self.hide_blur(),
            Bang::ToggleBlur => {
                if self.is_blur() {
                    self.hide_blur();
                } else {
                    self.show_blur();
                }
            }
            Bang::AddBlur => {
                self.resize_blur(arg(args, 0), true);
                if self.is_blur() {
                    self.show_blur();
                }
            }
            Bang::RemoveBlur => {
                self.resize_blur(arg(args, 0), false);
                if self.is_blur() {
                    self.show_blur();
                }
            }

            Bang::ShowMeter => self.show_meter(arg(args, 0), false),
            Bang::HideMeter => self.hide_meter(arg(args, 0), false),
            Bang::ToggleMeter => self.toggle_meter(arg(args, 0), false),
            Bang::UpdateMeter => self.update_meter_bang(arg(args, 0), false),
            Bang::ShowMeterGroup => self.show_meter(arg(args, 0), true),
            Bang::HideMeterGroup => self.hide_meter(arg(args, 0), true),
            Bang::ToggleMeterGroup => self.toggle_meter(arg(args, 0), true),
            Bang::UpdateMeterGroup => self.update_meter_bang(arg(args, 0), true),

            Bang::EnableMouseAction => {
                self.mouse_action_op(arg(args, 0), arg(args, 1), false, MouseActionOp::Enable);
            }
            Bang::DisableMouseAction => {
                self.mouse_action_op(arg(args, 0), arg(args, 1), false, MouseActionOp::Disable);
            }
            Bang::ClearMouseAction => {
                self.mouse_action_op(arg(args, 0), arg(args, 1), false, MouseActionOp::Clear);
            }
            Bang::ToggleMouseAction => {
                self.mouse_action_op(arg(args, 0), arg(args, 1), false, MouseActionOp::Toggle);
            }
            // The group variants take the group list first, then the options.
            Bang::EnableMouseActionGroup => {
                self.mouse_action_op(arg(args, 1), arg(args, 0), true, MouseActionOp::Enable);
            }
            Bang::DisableMouseActionGroup => {
                self.mouse_action_op(arg(args, 1), arg(args, 0), true, MouseActionOp::Disable);
            }
            Bang::ClearMouseActionGroup => {
                self.mouse_action_op(arg(args, 1), arg(args, 0), true, MouseActionOp::Clear);
            }
            Bang::ToggleMouseActionGroup => {
                self.mouse_action_op(arg(args, 1), arg(args, 0), true, MouseActionOp::Toggle);
            }

            Bang::EnableMeasure => self.measure_state_op(arg(args, 0), false, MeasureOp::Enable),
            Bang::DisableMeasure => self.measure_state_op(arg(args, 0), false, MeasureOp::Disable),
            Bang::ToggleMeasure => self.measure_state_op(arg(args, 0), false, MeasureOp::Toggle),
            Bang::PauseMeasure => self.measure_state_op(arg(args, 0), false, MeasureOp::Pause),
            Bang::UnpauseMeasure => self.measure_state_op(arg(args, 0), false, MeasureOp::Unpause),
            Bang::TogglePauseMeasure => {
                self.measure_state_op(arg(args, 0), false, MeasureOp::TogglePause);
            }
            Bang::UpdateMeasure => self.update_measure_bang(arg(args, 0), false),
            Bang::EnableMeasureGroup => self.measure_state_op(arg(args, 0), true, MeasureOp::Enable),
            Bang::DisableMeasureGroup => {
                self.measure_state_op(arg(args, 0), true, MeasureOp::Disable);
            }
            Bang::ToggleMeasureGroup => self.measure_state_op(arg(args, 0), true, MeasureOp::Toggle),
            Bang::PauseMeasureGroup => self.measure_state_op(arg(args, 0), true, MeasureOp::Pause),
            Bang::UnpauseMeasureGroup => {
                self.measure_state_op(arg(args, 0), true, MeasureOp::Unpause);
            }
            Bang::TogglePauseMeasureGroup => {
                self.measure_state_op(arg(args, 0), true, MeasureOp::TogglePause);
            }
            Bang::UpdateMeasureGroup => self.update_measure_bang(arg(args, 0), true),

            Bang::CommandMeasure => self.command_measure(arg(args, 0), arg(args, 1)),
            Bang::PluginBang => self.plugin_bang(arg(args, 0)),

            Bang::Show => {
                self.hidden = false;
                self.backend.set_visible(true);
                self.update_transparency(self.normal_alpha());
            }
            Bang::Hide => {
                self.hidden = true;
                self.backend.set_visible(false);
            }
            Bang::Toggle => {
                let next = if self.hidden { Bang::Show } else { Bang::Hide };
                self.do_bang(next, args);
            }
            Bang::ShowFade => self.show_fade(),
            Bang::HideFade => self.hide_fade(),
            Bang::ToggleFade => {
                let next = if self.hidden {
                    Bang::ShowFade
                } else {
                    Bang::HideFade
                };
                self.do_bang(next, args);
            }
            Bang::FadeDuration => {
                let duration = self.parse_int_arg(arg(args, 0), 0).max(0) as u32;
                self.new_fade_duration = Some(duration);
            }

            Bang::Move => {
                let x = self.parse_int_arg(arg(args, 0), 0);
                let y = self.parse_int_arg(arg(args, 1), 0);
                self.move_window(x, y);
            }
            Bang::SetWindowPosition => {
                self.placement.window_x = arg(args, 0).to_owned();
                self.placement.window_y = arg(args, 1).to_owned();
                if args.len() == 4 {
                    self.placement.anchor_x = arg(args, 2).to_owned();
                    self.placement.anchor_y = arg(args, 3).to_owned();
                    self.settings.anchor_x = self.placement.anchor_x.clone();
                    self.settings.anchor_y = self.placement.anchor_y.clone();
                    self.write_options(SettingFlags::ANCHOR);
                }
                let layout = self.monitors();
                self.placement.window_to_screen(&layout);
                let (x, y) = (self.placement.screen_x, self.placement.screen_y);
                self.move_window(x, y);
            }
            Bang::SetAnchor => {
                self.placement.anchor_x = arg(args, 0).to_owned();
                self.placement.anchor_y = arg(args, 1).to_owned();
                self.settings.anchor_x = self.placement.anchor_x.clone();
                self.settings.anchor_y = self.placement.anchor_y.clone();
                self.write_options(SettingFlags::ANCHOR);
                let layout = self.monitors();
                self.placement.window_to_screen(&layout);
                let (x, y) = (self.placement.screen_x, self.placement.screen_y);
                self.move_window(x, y);
            }

            Bang::ZPos => {
                let z = ZPosition::from_int(self.parse_int_arg(arg(args, 0), 0));
                self.settings.z_position = z;
                self.backend.set_z_position(z);
                self.write_options(SettingFlags::ALWAYS_ON_TOP);
            }
            Bang::ClickThrough => {
                let value = self.toggle_arg(arg(args, 0), self.settings.click_through);
                self.settings.click_through = value;
                self.backend.set_click_through(value);
                self.write_options(SettingFlags::CLICK_THROUGH);
            }
            Bang::Draggable => {
                let value = self.toggle_arg(arg(args, 0), self.settings.draggable);
                self.settings.draggable = value;
                self.write_options(SettingFlags::DRAGGABLE);
            }
            Bang::SnapEdges => {
                let value = self.toggle_arg(arg(args, 0), self.settings.snap_edges);
                self.settings.snap_edges = value;
                self.write_options(SettingFlags::SNAP_EDGES);
            }
            Bang::KeepOnScreen => {
                let value = self.toggle_arg(arg(args, 0), self.settings.keep_on_screen);
                self.settings.keep_on_screen = value;
                self.write_options(SettingFlags::KEEP_ON_SCREEN);
                if value {
                    let layout = self.monitors();
                    crate::position::map_coords_to_screen(
                        &mut self.placement.screen_x,
                        &mut self.placement.screen_y,
                        self.placement.window_w,
                        self.placement.window_h,
                        &layout,
                    );
                    let (x, y) = (self.placement.screen_x, self.placement.screen_y);
                    self.move_window(x, y);
                }
            }
            Bang::AutoSelectScreen => {
                let value = self.toggle_arg(arg(args, 0), self.settings.auto_select_screen);
                self.settings.auto_select_screen = value;
                self.placement.auto_select_screen = value;
                self.write_options(SettingFlags::AUTO_SELECT_SCREEN);
                let layout = self.monitors();
                self.placement.screen_to_window(&layout);
            }
            Bang::SetTransparency => {
                let alpha = self.parse_int_arg(arg(args, 0), 255).clamp(0, 255) as u8;
                self.settings.alpha = alpha;
                self.update_transparency(alpha);
            }

            Bang::MoveMeter => {
                let x = self.parse_int_arg(arg(args, 0), 0);
                let y = self.parse_int_arg(arg(args, 1), 0);
                self.move_meter(arg(args, 2), x, y);
            }

            Bang::SetVariable => self.set_variable(arg(args, 0), arg(args, 1)),
            Bang::SetOption => self.set_option(arg(args, 0), arg(args, 1), arg(args, 2), false),
            Bang::SetOptionGroup => {
                self.set_option(arg(args, 0), arg(args, 1), arg(args, 2), true);
            }

            Bang::Delay => {
                let delay = self.parse_int_arg(arg(args, 1), 0).max(0) as u32;
                self.do_delayed_command(arg(args, 0), delay);
            }
        }
    }

    fn parse_int_arg(&self, value: &str, default: i32) -> i32 {
        self.config
            .parse_formula(value)
            .map(|v| v as i32)
            .unwrap_or(default)
    }

    /// `-1` toggles the current value, anything else sets it.
    fn toggle_arg(&self, value: &str, current: bool) -> bool {
        match self.parse_int_arg(value, 0) {
            -1 => !current,
            v => v != 0,
        }
    }

    fn matches(name: &str, target: &str, group: bool, in_group: bool) -> bool {
        if group {
            in_group
        } else {
            name.eq_ignore_ascii_case(target)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Meter bangs
    // ─────────────────────────────────────────────────────────────────────────

    fn show_meter(&mut self, name: &str, group: bool) {
        self.set_meter_hidden(name, group, SetHidden::Show, "!ShowMeter");
    }

    fn hide_meter(&mut self, name: &str, group: bool) {
        self.set_meter_hidden(name, group, SetHidden::Hide, "!HideMeter");
    }

    fn toggle_meter(&mut self, name: &str, group: bool) {
        self.set_meter_hidden(name, group, SetHidden::Toggle, "!ToggleMeter");
    }

    fn set_meter_hidden(&mut self, name: &str, group: bool, op: SetHidden, bang_name: &str) {
        let mut found = false;
        for meter in &mut self.meters {
            let base = meter.base_mut();
            if Self::matches(&base.name, name, group, base.in_group(name)) {
                base.hidden = match op {
                    SetHidden::Show => false,
                    SetHidden::Hide => true,
                    SetHidden::Toggle => !base.hidden,
                };
                found = true;
                if !group {
                    break;
                }
            }
        }
        if found {
            // One recheck per bang, even when a group hid many meters.
            self.set_resize_mode(ResizeMode::Check);
        } else if !group {
            tracing::error!(skin = %self.folder_path, meter = name, bang = bang_name, "meter not found");
        }
    }

    fn move_meter(&mut self, name: &str, x: i32, y: i32) {
        let mut found = false;
        for meter in &mut self.meters {
            let base = meter.base_mut();
            if base.name.eq_ignore_ascii_case(name) {
                base.x = crate::meter::MeterCoord {
                    value: x,
                    mode: crate::meter::RelativeMode::Absolute,
                };
                base.y = crate::meter::MeterCoord {
                    value: y,
                    mode: crate::meter::RelativeMode::Absolute,
                };
                found = true;
                break;
            }
        }
        if found {
            self.set_resize_mode(ResizeMode::Check);
        } else {
            tracing::error!(skin = %self.folder_path, meter = name, "!MoveMeter: not found");
        }
    }

    /// Force-update matching meters. `*` updates every meter.
    fn update_meter_bang(&mut self, name: &str, group: bool) {
        let all = !group && name == "*";
        let group = group || all;

        let values = crate::measure::MeasureValues::snapshot(&self.measures);
        let mut any_transition = false;
        let mut found = false;
        let mut pending = Vec::new();

        for meter in &mut self.meters {
            let in_group = meter.base().in_group(name);
            let meter_name = meter.base().name.clone();
            if all || Self::matches(&meter_name, name, group, in_group) {
                found = true;
                meter.base_mut().reset_update_counter();
                meter.base_mut().divider_fires(true);
                if meter.update(&values, &mut self.canvas) {
                    let action = meter.base().on_update_action.clone();
                    if !action.is_empty() {
                        pending.push(action);
                    }
                }
                if !group {
                    if meter.has_active_transition() {
                        any_transition = true;
                    }
                    break;
                }
            }
            if !any_transition && meter.has_active_transition() {
                any_transition = true;
            }
        }

        if found {
            self.set_resize_mode(ResizeMode::Check);
        }

        self.resolve_meter_positions();
        self.post_update(any_transition);

        for command in pending {
            self.execute(&command);
        }

        if !group && !found {
            tracing::error!(skin = %self.folder_path, meter = name, "!UpdateMeter: not found");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Measure bangs
    // ─────────────────────────────────────────────────────────────────────────

    fn measure_state_op(&mut self, name: &str, group: bool, op: MeasureOp) {
        let mut found = false;
        for measure in &mut self.measures {
            let base = measure.base_mut();
            if Self::matches(&base.name, name, group, base.in_group(name)) {
                found = true;
                match op {
                    MeasureOp::Enable => base.disabled = false,
                    MeasureOp::Disable => base.disabled = true,
                    MeasureOp::Toggle => base.disabled = !base.disabled,
                    MeasureOp::Pause => base.paused = true,
                    MeasureOp::Unpause => base.paused = false,
                    MeasureOp::TogglePause => base.paused = !base.paused,
                }
                if !group {
                    return;
                }
            }
        }
        if !group && !found {
            tracing::error!(
                skin = %self.folder_path,
                measure = name,
                op = ?op,
                "measure bang target not found"
            );
        }
    }

    fn update_measure_bang(&mut self, name: &str, group: bool) {
        let mut found = false;
        let mut pending = Vec::new();
        for measure in &mut self.measures {
            let in_group = measure.base().in_group(name);
            let measure_name = measure.base().name.clone();
            if Self::matches(&measure_name, name, group, in_group) {
                found = true;
                let tick = update_measure(measure.as_mut(), true);
                if tick.updated {
                    let base = measure.base();
                    if !base.on_update_action.is_empty() {
                        pending.push(base.on_update_action.clone());
                    }
                    if tick.changed && !base.on_change_action.is_empty() {
                        pending.push(base.on_change_action.clone());
                    }
                }
                if !group {
                    break;
                }
            }
        }
        for command in pending {
            self.execute(&command);
        }
        if !group && !found {
            tracing::error!(
                skin = %self.folder_path,
                measure = name,
                "!UpdateMeasure: not found"
            );
        }
    }

    fn command_measure(&mut self, name: &str, command: &str) {
        for measure in &mut self.measures {
            if measure.base().name.eq_ignore_ascii_case(name) {
                measure.command(command);
                return;
            }
        }
        tracing::warn!(
            skin = %self.folder_path,
            measure = name,
            "!CommandMeasure: not found"
        );
    }

    /// `!PluginBang "Measure command words"`: first word names the measure,
    /// the rest is its command.
    fn plugin_bang(&mut self, raw: &str) {
        let arg: String = raw.chars().filter(|c| *c != '"').collect();
        let (measure, command) = match arg.split_once(' ') {
            Some((m, rest)) => (m.to_owned(), rest.to_owned()),
            None => (arg, String::new()),
        };
        if measure.is_empty() {
            tracing::error!(skin = %self.folder_path, "!PluginBang: invalid parameters");
            return;
        }
        self.command_measure(&measure, &command);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mouse action bangs
    // ─────────────────────────────────────────────────────────────────────────

    fn mouse_action_op(&mut self, name: &str, options: &str, group: bool, op: MouseActionOp) {
        // The skin section name addresses the skin-level table.
        if !group && name.eq_ignore_ascii_case(SKIN_SECTION) {
            op.apply(&mut self.mouse, options);
            return;
        }

        let mut found = false;
        for meter in &mut self.meters {
            let base = meter.base_mut();
            if Self::matches(&base.name, name, group, base.in_group(name)) {
                op.apply(&mut base.mouse, options);
                found = true;
                if !group {
                    return;
                }
            }
        }
        if !group && !found {
            tracing::error!(
                skin = %self.folder_path,
                meter = name,
                "mouse action bang target not found"
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Variables and options
    // ─────────────────────────────────────────────────────────────────────────

    fn set_variable(&mut self, variable: &str, value: &str) {
        if !self.config.write_raw("Variables", variable, value) {
            tracing::warn!(
                skin = %self.folder_path,
                variable,
                "configuration source does not accept variable writes"
            );
        }
    }

    /// Write `section.option = value` and re-read the affected entity so the
    /// change is visible without waiting for dynamic variables.
    fn set_option(&mut self, section: &str, option: &str, value: &str, group: bool) {
        if self.state == SkinState::Closing {
            return;
        }

        let mut touched_meter = false;
        for i in 0..self.meters.len() {
            let matches = {
                let base = self.meters[i].base();
                Self::matches(&base.name, section, group, base.in_group(section))
            };
            if matches {
                let name = self.meters[i].base().name.clone();
                self.config.write_raw(&name, option, value);
                self.meters[i].read_options(&*self.config, &name);
                touched_meter = true;
                if !group {
                    break;
                }
            }
        }
        if touched_meter {
            self.set_resize_mode(ResizeMode::Check);
            if !group {
                return;
            }
        }

        for i in 0..self.measures.len() {
            let matches = {
                let base = self.measures[i].base();
                Self::matches(&base.name, section, group, base.in_group(section))
            };
            if matches {
                let name = self.measures[i].base().name.clone();
                self.config.write_raw(&name, option, value);
                self.measures[i].read_options(&*self.config, &name);
                if !group {
                    return;
                }
            }
        }

        if !group && !touched_meter {
            // A plain section write (e.g. the skin section or variables).
            if !self.config.write_raw(section, option, value) {
                tracing::warn!(
                    skin = %self.folder_path,
                    section,
                    option,
                    "configuration source does not accept option writes"
                );
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetHidden {
    Show,
    Hide,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeasureOp {
    Enable,
    Disable,
    Toggle,
    Pause,
    Unpause,
    TogglePause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MouseActionOp {
    Enable,
    Disable,
    Clear,
    Toggle,
}

impl MouseActionOp {
    fn apply(self, mouse: &mut crate::mouse::MouseOptions, options: &str) {
        match self {
            MouseActionOp::Enable => mouse.enable(options),
            MouseActionOp::Disable => mouse.disable(options),
            MouseActionOp::Clear => mouse.clear(options),
            MouseActionOp::Toggle => mouse.toggle(options),
        }
    }
}
