// Tests for network throughput over a scripted interface list and clock

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use systatus::core::system_monitor::{
    Clock, InterfaceCounters, NetworkRates, NetworkSampler, NetworkSource, Sampler,
};
use systatus::{MonitorError, Result};

#[derive(Clone)]
struct StepClock {
    now: Arc<Mutex<Instant>>,
}

impl StepClock {
    fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    fn step(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for StepClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Interface list the test rewrites between polls; `None` fails the read
#[derive(Clone, Default)]
struct Interfaces(Arc<Mutex<Option<Vec<InterfaceCounters>>>>);

impl Interfaces {
    fn set(&self, list: Vec<InterfaceCounters>) {
        *self.0.lock() = Some(list);
    }

    fn fail(&self) {
        *self.0.lock() = None;
    }
}

impl NetworkSource for Interfaces {
    fn interfaces(&mut self) -> Result<Vec<InterfaceCounters>> {
        self.0
            .lock()
            .clone()
            .ok_or_else(|| MonitorError::read_failed("adapter query failed"))
    }
}

fn ethernet(rx: u64, tx: u64) -> InterfaceCounters {
    InterfaceCounters {
        name: "eth0".to_string(),
        is_up: true,
        is_loopback: false,
        bytes_received: rx,
        bytes_sent: tx,
    }
}

fn wifi(rx: u64, tx: u64) -> InterfaceCounters {
    InterfaceCounters {
        name: "wlan0".to_string(),
        ..ethernet(rx, tx)
    }
}

#[test]
fn test_steady_one_second_polls() {
    let interfaces = Interfaces::default();
    interfaces.set(vec![ethernet(0, 0), wifi(0, 0)]);
    let clock = StepClock::new();
    let sampler =
        NetworkSampler::with_source(Ok(Box::new(interfaces.clone())), Arc::new(clock.clone()));

    for second in 1..=3u64 {
        interfaces.set(vec![
            ethernet(second * 1_000, second * 100),
            wifi(second * 24, second * 12),
        ]);
        clock.step(Duration::from_secs(1));
        assert_eq!(sampler.sample(), NetworkRates::new(1_024, 112));
    }
}

#[test]
fn test_disappearing_interface_clamps_to_zero_then_recovers() {
    let interfaces = Interfaces::default();
    interfaces.set(vec![ethernet(10_000, 10_000), wifi(50_000, 50_000)]);
    let clock = StepClock::new();
    let sampler =
        NetworkSampler::with_source(Ok(Box::new(interfaces.clone())), Arc::new(clock.clone()));

    // wlan0 unplugged: totals drop below the baseline
    interfaces.set(vec![ethernet(11_000, 10_500)]);
    clock.step(Duration::from_secs(1));
    assert_eq!(sampler.sample(), NetworkRates::ZERO);

    // The lower totals became the new baseline
    interfaces.set(vec![ethernet(13_000, 11_500)]);
    clock.step(Duration::from_secs(1));
    assert_eq!(sampler.sample(), NetworkRates::new(2_000, 1_000));
}

#[test]
fn test_back_to_back_polls_keep_baseline() {
    let interfaces = Interfaces::default();
    interfaces.set(vec![ethernet(0, 0)]);
    let clock = StepClock::new();
    let sampler =
        NetworkSampler::with_source(Ok(Box::new(interfaces.clone())), Arc::new(clock.clone()));

    interfaces.set(vec![ethernet(500, 500)]);
    assert_eq!(sampler.sample(), NetworkRates::ZERO);

    interfaces.set(vec![ethernet(1_000, 2_000)]);
    clock.step(Duration::from_millis(500));
    assert_eq!(sampler.sample(), NetworkRates::new(2_000, 4_000));
}

#[test]
fn test_failed_reads_do_not_disturb_baseline() {
    let interfaces = Interfaces::default();
    interfaces.set(vec![ethernet(0, 0)]);
    let clock = StepClock::new();
    let sampler =
        NetworkSampler::with_source(Ok(Box::new(interfaces.clone())), Arc::new(clock.clone()));
    let before = sampler.baseline();

    interfaces.fail();
    clock.step(Duration::from_secs(1));
    assert_eq!(sampler.sample(), NetworkRates::ZERO);
    assert_eq!(sampler.baseline(), before);

    interfaces.set(vec![ethernet(4_000, 2_000)]);
    clock.step(Duration::from_secs(1));
    assert_eq!(sampler.sample(), NetworkRates::new(2_000, 1_000));
}

#[test]
fn test_baseline_established_late_when_first_read_fails() {
    let interfaces = Interfaces::default();
    interfaces.fail();
    let clock = StepClock::new();
    let sampler =
        NetworkSampler::with_source(Ok(Box::new(interfaces.clone())), Arc::new(clock.clone()));
    assert!(sampler.baseline().is_none());

    interfaces.set(vec![ethernet(1_000, 1_000)]);
    clock.step(Duration::from_secs(1));
    assert_eq!(sampler.sample(), NetworkRates::ZERO);
    assert!(sampler.baseline().is_some());

    interfaces.set(vec![ethernet(3_000, 1_500)]);
    clock.step(Duration::from_secs(1));
    assert_eq!(sampler.sample(), NetworkRates::new(2_000, 500));
}
