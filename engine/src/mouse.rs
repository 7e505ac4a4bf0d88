//! Mouse action tables
//!
//! Every meter and the skin itself carry a table of command strings keyed by
//! pointer action. Hit testing resolves which table handles an event; the
//! commands are executed by the external command interpreter.

use hashbrown::{HashMap, HashSet};
use lamina_core::ConfigSource;

/// Pointer actions a command can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseActionKind {
    LeftDown,
    LeftUp,
    LeftDoubleClick,
    RightDown,
    RightUp,
    RightDoubleClick,
    MiddleDown,
    MiddleUp,
    MiddleDoubleClick,
    X1Down,
    X1Up,
    X1DoubleClick,
    X2Down,
    X2Up,
    X2DoubleClick,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    Over,
    Leave,
}

/// Option name for each action, in the skin configuration schema.
const ACTION_OPTIONS: &[(MouseActionKind, &str)] = &[
    (MouseActionKind::LeftDown, "LeftMouseDownAction"),
    (MouseActionKind::LeftUp, "LeftMouseUpAction"),
    (MouseActionKind::LeftDoubleClick, "LeftMouseDoubleClickAction"),
    (MouseActionKind::RightDown, "RightMouseDownAction"),
    (MouseActionKind::RightUp, "RightMouseUpAction"),
    (MouseActionKind::RightDoubleClick, "RightMouseDoubleClickAction"),
    (MouseActionKind::MiddleDown, "MiddleMouseDownAction"),
    (MouseActionKind::MiddleUp, "MiddleMouseUpAction"),
    (
        MouseActionKind::MiddleDoubleClick,
        "MiddleMouseDoubleClickAction",
    ),
    (MouseActionKind::X1Down, "X1MouseDownAction"),
    (MouseActionKind::X1Up, "X1MouseUpAction"),
    (MouseActionKind::X1DoubleClick, "X1MouseDoubleClickAction"),
    (MouseActionKind::X2Down, "X2MouseDownAction"),
    (MouseActionKind::X2Up, "X2MouseUpAction"),
    (MouseActionKind::X2DoubleClick, "X2MouseDoubleClickAction"),
    (MouseActionKind::ScrollUp, "MouseScrollUpAction"),
    (MouseActionKind::ScrollDown, "MouseScrollDownAction"),
    (MouseActionKind::ScrollLeft, "MouseScrollLeftAction"),
    (MouseActionKind::ScrollRight, "MouseScrollRightAction"),
    (MouseActionKind::Over, "MouseOverAction"),
    (MouseActionKind::Leave, "MouseLeaveAction"),
];

fn kind_from_option(name: &str) -> Option<MouseActionKind> {
    ACTION_OPTIONS
        .iter()
        .find(|(_, option)| option.eq_ignore_ascii_case(name))
        .map(|(kind, _)| *kind)
}

/// One action table.
#[derive(Debug, Default, Clone)]
pub struct MouseOptions {
    actions: HashMap<MouseActionKind, String>,
    disabled: HashSet<MouseActionKind>,
}

impl MouseOptions {
    pub fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.actions.clear();
        for (kind, option) in ACTION_OPTIONS {
            let value = config.read_string(section, option, "");
            if !value.is_empty() {
                self.actions.insert(*kind, value);
            }
        }
    }

    /// The command for `kind`, unless that action is disabled.
    pub fn action(&self, kind: MouseActionKind) -> Option<&str> {
        if self.disabled.contains(&kind) {
            return None;
        }
        self.actions.get(&kind).map(String::as_str)
    }

    pub fn has_action(&self, kind: MouseActionKind) -> bool {
        self.action(kind).is_some()
    }

    /// Whether any action is bound (disabled or not).
    pub fn has_any_action(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn set_action(&mut self, kind: MouseActionKind, command: &str) {
        if command.is_empty() {
            self.actions.remove(&kind);
        } else {
            self.actions.insert(kind, command.to_owned());
        }
    }

    /// Apply `op` to each action named in `options`, a `|`-separated list of
    /// option names; `*` selects every action.
    fn for_each_named(&mut self, options: &str, op: impl Fn(&mut Self, MouseActionKind)) {
        if options.trim() == "*" {
            for (kind, _) in ACTION_OPTIONS {
                op(self, *kind);
            }
            return;
        }
        for name in options.split('|') {
            let name = name.trim();
            match kind_from_option(name) {
                Some(kind) => op(self, kind),
                None if !name.is_empty() => {
                    tracing::warn!(option = name, "unknown mouse action option");
                }
                None => {}
            }
        }
    }

    pub fn disable(&mut self, options: &str) {
        self.for_each_named(options, |m, kind| {
            m.disabled.insert(kind);
        });
    }

    pub fn enable(&mut self, options: &str) {
        self.for_each_named(options, |m, kind| {
            m.disabled.remove(&kind);
        });
    }

    pub fn toggle(&mut self, options: &str) {
        self.for_each_named(options, |m, kind| {
            if !m.disabled.remove(&kind) {
                m.disabled.insert(kind);
            }
        });
    }

    pub fn clear(&mut self, options: &str) {
        self.for_each_named(options, |m, kind| {
            m.actions.remove(&kind);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::MemoryConfig;

    #[test]
    fn test_read_and_lookup() {
        let mut cfg = MemoryConfig::new();
        cfg.set("MeterA", "LeftMouseUpAction", "!Toggle");
        let mut mouse = MouseOptions::default();
        mouse.read_options(&cfg, "MeterA");
        assert_eq!(mouse.action(MouseActionKind::LeftUp), Some("!Toggle"));
        assert!(!mouse.has_action(MouseActionKind::RightUp));
    }

    #[test]
    fn test_disable_enable_toggle() {
        let mut mouse = MouseOptions::default();
        mouse.set_action(MouseActionKind::LeftUp, "cmd");

        mouse.disable("LeftMouseUpAction");
        assert!(!mouse.has_action(MouseActionKind::LeftUp));
        assert!(mouse.has_any_action());

        mouse.enable("*");
        assert!(mouse.has_action(MouseActionKind::LeftUp));

        mouse.toggle("LeftMouseUpAction|MouseOverAction");
        assert!(!mouse.has_action(MouseActionKind::LeftUp));
    }
}
