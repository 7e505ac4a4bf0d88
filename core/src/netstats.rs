//! Process-wide network interface counters
//!
//! Many skins carry several network measures; sampling the kernel counters
//! once per update tick and letting every measure read the shared snapshot
//! avoids redundant syscalls. The skin runtime calls [`refresh`] at most once
//! per tick, and only when at least one of its measures declares the
//! dependency.

use std::sync::Mutex;
use std::time::Instant;

use hashbrown::HashMap;

/// Cumulative byte counters for one interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceCounters {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Per-second rates derived from the last two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InterfaceRates {
    pub in_per_sec: f64,
    pub out_per_sec: f64,
}

#[derive(Default)]
struct Tables {
    counters: HashMap<String, InterfaceCounters>,
    rates: HashMap<String, InterfaceRates>,
    sampled_at: Option<Instant>,
}

static TABLES: Mutex<Option<Tables>> = Mutex::new(None);

/// Re-sample the interface tables and recompute rates.
pub fn refresh() {
    refresh_with(read_system_counters());
}

/// Rates for `interface`, or the sum over all interfaces when `interface`
/// is empty. `None` until two samples exist.
pub fn rates(interface: &str) -> Option<InterfaceRates> {
    let guard = TABLES.lock().unwrap();
    let tables = guard.as_ref()?;
    tables.sampled_at?;

    if interface.is_empty() {
        let mut total = InterfaceRates::default();
        for r in tables.rates.values() {
            total.in_per_sec += r.in_per_sec;
            total.out_per_sec += r.out_per_sec;
        }
        Some(total)
    } else {
        tables.rates.get(interface).copied()
    }
}

fn refresh_with(sample: HashMap<String, InterfaceCounters>) {
    let mut guard = TABLES.lock().unwrap();
    let tables = guard.get_or_insert_with(Tables::default);
    let now = Instant::now();

    if let Some(prev_time) = tables.sampled_at {
        let elapsed = now.duration_since(prev_time).as_secs_f64();
        if elapsed > 0.0 {
            let mut rates = HashMap::new();
            for (name, current) in &sample {
                let prev = tables.counters.get(name).copied().unwrap_or_default();
                // Counters reset on interface restart; treat a backwards jump
                // as zero traffic for this sample.
                let d_in = current.bytes_in.saturating_sub(prev.bytes_in);
                let d_out = current.bytes_out.saturating_sub(prev.bytes_out);
                rates.insert(
                    name.clone(),
                    InterfaceRates {
                        in_per_sec: d_in as f64 / elapsed,
                        out_per_sec: d_out as f64 / elapsed,
                    },
                );
            }
            tables.rates = rates;
        }
    }

    tables.counters = sample;
    tables.sampled_at = Some(now);
}

#[cfg(target_os = "linux")]
fn read_system_counters() -> HashMap<String, InterfaceCounters> {
    let mut out = HashMap::new();
    let Ok(content) = std::fs::read_to_string("/proc/net/dev") else {
        return out;
    };
    for line in content.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() < 9 {
            continue;
        }
        let bytes_in = fields[0].parse().unwrap_or(0);
        let bytes_out = fields[8].parse().unwrap_or(0);
        out.insert(
            name.trim().to_owned(),
            InterfaceCounters {
                bytes_in,
                bytes_out,
            },
        );
    }
    out
}

#[cfg(not(target_os = "linux"))]
fn read_system_counters() -> HashMap<String, InterfaceCounters> {
    HashMap::new()
}
