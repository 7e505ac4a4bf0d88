//! Host-reachability probe measure
//!
//! Connects to `Address` on a detached worker thread and reports the
//! round-trip time in milliseconds; an unreachable host reports the timeout
//! sentinel. The worker only ever writes into the shared slot; the UI thread
//! picks the result up on its next update tick and runs the finish action.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use lamina_core::ConfigSource;
use lamina_core::worker::WorkerSlot;

use crate::measure::{Measure, MeasureBase};

/// Probes started every this many updates by default.
const DEFAULT_UPDATE_RATE: i32 = 32;
const DEFAULT_TIMEOUT_MS: u32 = 30000;

pub struct ProbeMeasure {
    base: MeasureBase,
    address: String,
    timeout: Duration,
    timeout_value: f64,
    update_rate: i32,
    update_counter: i32,
    finish_action: String,
    slot: WorkerSlot<f64>,
    current: f64,
}

pub fn create(name: &str) -> Box<dyn Measure> {
    Box::new(ProbeMeasure {
        base: MeasureBase::new(name),
        address: String::new(),
        timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS as u64),
        timeout_value: DEFAULT_TIMEOUT_MS as f64,
        update_rate: DEFAULT_UPDATE_RATE,
        update_counter: 0,
        finish_action: String::new(),
        slot: WorkerSlot::new(),
        current: 0.0,
    })
}

fn probe(address: String, timeout: Duration, timeout_value: f64) -> f64 {
    let Ok(mut addrs) = address.to_socket_addrs() else {
        return timeout_value;
    };
    let Some(addr) = addrs.next() else {
        return timeout_value;
    };
    let start = Instant::now();
    match TcpStream::connect_timeout(&addr, timeout) {
        Ok(_) => start.elapsed().as_secs_f64() * 1000.0,
        Err(_) => timeout_value,
    }
}

impl Measure for ProbeMeasure {
    fn base(&self) -> &MeasureBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MeasureBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        "Probe"
    }

    fn read_options(&mut self, config: &dyn ConfigSource, section: &str) {
        self.base.read_common_options(config, section);
        self.address = config.read_string(section, "Address", "");
        let timeout_ms = config.read_uint(section, "Timeout", DEFAULT_TIMEOUT_MS);
        self.timeout = Duration::from_millis(timeout_ms as u64);
        self.timeout_value = config.read_float(section, "TimeoutValue", timeout_ms as f64);
        self.update_rate = config
            .read_int(section, "UpdateRate", DEFAULT_UPDATE_RATE)
            .max(1);
        self.finish_action = config.read_string(section, "FinishAction", "");
        self.base.max_value = self.timeout_value;
    }

    fn update_value(&mut self) -> f64 {
        if !self.address.is_empty() && self.update_counter == 0 && !self.slot.is_running() {
            let address = self.address.clone();
            let timeout = self.timeout;
            let timeout_value = self.timeout_value;
            let action = (!self.finish_action.is_empty()).then(|| self.finish_action.clone());
            self.slot
                .spawn(action, move || probe(address, timeout, timeout_value));
        }
        self.update_counter = (self.update_counter + 1) % self.update_rate;
        self.current
    }

    fn command(&mut self, command: &str) {
        // An explicit probe request resets the rate counter so the next
        // update starts a worker immediately.
        if command.trim().eq_ignore_ascii_case("probe") {
            self.update_counter = 0;
        }
    }

    fn poll_background(&mut self) -> Option<String> {
        let (value, action) = self.slot.take()?;
        self.current = value;
        self.base.value = value;
        action
    }
}

impl Drop for ProbeMeasure {
    fn drop(&mut self) {
        self.slot.detach();
    }
}
