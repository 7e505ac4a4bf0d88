//! Purpose-keyed timers
//!
//! All periodic work is driven by timers keyed by purpose; canceling a
//! purpose cancels exactly that work. The host's message loop polls
//! [`Timers::due`] and feeds the fired kinds back into the skin's event
//! handler; each firing is a complete, non-blocking unit of work.

use std::time::{Duration, Instant};

/// Timer purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// The periodic measure/meter update tick.
    Update,
    /// Hover polling (show/hide on mouse over, topmost reassertion).
    MousePoll,
    /// Fade animation step.
    Fade,
    /// Meter transition animation step.
    Transition,
    /// Delayed self-destruction after deactivation.
    Deactivate,
    /// Ad-hoc delayed command, keyed by token.
    Delayed(u32),
}

/// Default update interval in milliseconds.
pub const INTERVAL_UPDATE: u32 = 1000;
/// Hover poll interval in milliseconds.
pub const INTERVAL_MOUSE: u32 = 500;
/// Fade step interval in milliseconds.
pub const INTERVAL_FADE: u32 = 10;
/// Transition step interval in milliseconds.
pub const INTERVAL_TRANSITION: u32 = 100;

#[derive(Debug)]
struct Entry {
    kind: TimerKind,
    interval: Duration,
    next: Instant,
    one_shot: bool,
}

/// The set of armed timers for one skin.
#[derive(Debug, Default)]
pub struct Timers {
    entries: Vec<Entry>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer for `kind`.
    pub fn set(&mut self, kind: TimerKind, interval: Duration, now: Instant) {
        self.arm(kind, interval, now, false);
    }

    /// Arm a timer that fires once and disarms itself.
    pub fn set_one_shot(&mut self, kind: TimerKind, delay: Duration, now: Instant) {
        self.arm(kind, delay, now, true);
    }

    fn arm(&mut self, kind: TimerKind, interval: Duration, now: Instant, one_shot: bool) {
        self.kill(kind);
        self.entries.push(Entry {
            kind,
            interval,
            next: now + interval,
            one_shot,
        });
    }

    pub fn kill(&mut self, kind: TimerKind) {
        self.entries.retain(|e| e.kind != kind);
    }

    pub fn kill_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    /// Earliest pending deadline, for the host's wait timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.next).min()
    }

    /// Timers due at `now`, in arming order. Periodic timers re-arm from
    /// their previous deadline; a firing that is already multiple intervals
    /// late fires once (queued-up steps are not replayed).
    pub fn due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut fired = Vec::new();
        let mut remove = Vec::new();
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if entry.next > now {
                continue;
            }
            fired.push(entry.kind);
            if entry.one_shot {
                remove.push(i);
            } else {
                entry.next += entry.interval;
                if entry.next <= now {
                    entry.next = now + entry.interval;
                }
            }
        }
        for i in remove.into_iter().rev() {
            self.entries.remove(i);
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periodic_fires_and_rearms() {
        let start = Instant::now();
        let mut timers = Timers::new();
        timers.set(TimerKind::Update, Duration::from_millis(100), start);

        assert!(timers.due(start + Duration::from_millis(50)).is_empty());
        assert_eq!(
            timers.due(start + Duration::from_millis(100)),
            vec![TimerKind::Update]
        );
        // Re-armed for the next period.
        assert!(timers.is_armed(TimerKind::Update));
        assert_eq!(
            timers.due(start + Duration::from_millis(200)),
            vec![TimerKind::Update]
        );
    }

    #[test]
    fn test_one_shot_disarms() {
        let start = Instant::now();
        let mut timers = Timers::new();
        timers.set_one_shot(TimerKind::Deactivate, Duration::from_millis(10), start);
        assert_eq!(
            timers.due(start + Duration::from_millis(10)),
            vec![TimerKind::Deactivate]
        );
        assert!(!timers.is_armed(TimerKind::Deactivate));
    }

    #[test]
    fn test_late_firing_is_not_replayed() {
        let start = Instant::now();
        let mut timers = Timers::new();
        timers.set(TimerKind::Fade, Duration::from_millis(10), start);
        // 10 intervals late: one firing, re-armed in the future.
        let late = start + Duration::from_millis(100);
        assert_eq!(timers.due(late), vec![TimerKind::Fade]);
        assert!(timers.next_deadline().unwrap() > late);
    }

    #[test]
    fn test_kill_specific_purpose() {
        let start = Instant::now();
        let mut timers = Timers::new();
        timers.set(TimerKind::Update, Duration::from_millis(10), start);
        timers.set(TimerKind::MousePoll, Duration::from_millis(10), start);
        timers.kill(TimerKind::Update);
        assert_eq!(
            timers.due(start + Duration::from_millis(10)),
            vec![TimerKind::MousePoll]
        );
    }
}
