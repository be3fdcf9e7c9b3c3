// Tests for GPU engine aggregation through the public sampler API

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use systatus::core::system_monitor::{EngineCounter, GpuEngineSource, GpuSampler, Sampler};
use systatus::{MonitorError, Result};

type Script = Arc<Mutex<VecDeque<Result<f32>>>>;

/// Engine source whose counters replay scripted readings, then report gone
#[derive(Default)]
struct FakeEngines {
    instances: Vec<String>,
    scripts: HashMap<String, Script>,
}

impl FakeEngines {
    fn with(mut self, instance: &str, readings: Vec<Result<f32>>) -> Self {
        self.instances.push(instance.to_string());
        self.scripts
            .insert(instance.to_string(), Arc::new(Mutex::new(readings.into())));
        self
    }
}

struct FakeCounter(Script);

impl EngineCounter for FakeCounter {
    fn next_value(&mut self) -> Result<f32> {
        self.0
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(MonitorError::counter_gone("script exhausted")))
    }
}

impl GpuEngineSource for FakeEngines {
    fn instance_names(&mut self) -> Result<Vec<String>> {
        Ok(self.instances.clone())
    }

    fn open_counter(&mut self, instance: &str) -> Result<Box<dyn EngineCounter>> {
        let script = self
            .scripts
            .get(instance)
            .cloned()
            .ok_or_else(|| MonitorError::counter_gone(instance))?;
        Ok(Box::new(FakeCounter(script)))
    }
}

fn sampler(engines: FakeEngines, window: usize) -> GpuSampler {
    GpuSampler::with_source(Ok(Box::new(engines)), window)
}

#[test]
fn test_only_3d_engines_are_tracked() {
    let engines = FakeEngines::default()
        .with("pid_100_luid_0x0_phys_0_eng_0_engtype_3D", vec![Ok(10.0)])
        .with("pid_100_luid_0x0_phys_0_eng_1_engtype_Copy", vec![Ok(99.0)])
        .with("pid_100_luid_0x0_phys_0_eng_2_engtype_VideoDecode", vec![Ok(99.0)]);

    let gpu = sampler(engines, 1);
    assert_eq!(gpu.counter_count(), 1);
    assert_eq!(gpu.sample(), 10.0);
}

#[test]
fn test_adapter_zero_preferred_over_busier_adapter() {
    let engines = FakeEngines::default()
        .with("pid_1_phys_0_eng_0_engtype_3D", vec![Ok(30.0)])
        .with("pid_2_phys_0_eng_0_engtype_3D", vec![Ok(45.0)])
        .with("pid_3_phys_1_eng_0_engtype_3D", vec![Ok(90.0)]);

    assert_eq!(sampler(engines, 1).sample(), 75.0);
}

#[test]
fn test_busiest_adapter_without_adapter_zero() {
    let engines = FakeEngines::default()
        .with("pid_1_phys_1_eng_0_engtype_3D", vec![Ok(20.0)])
        .with("pid_2_phys_2_eng_0_engtype_3D", vec![Ok(35.0)]);

    assert_eq!(sampler(engines, 1).sample(), 35.0);
}

#[test]
fn test_sum_is_capped_at_100() {
    let engines = FakeEngines::default()
        .with("pid_1_phys_0_eng_0_engtype_3D", vec![Ok(70.0)])
        .with("pid_2_phys_0_eng_0_engtype_3D", vec![Ok(60.0)]);

    assert_eq!(sampler(engines, 1).sample(), 100.0);
}

#[test]
fn test_gone_counters_are_retired_for_good() {
    let engines = FakeEngines::default()
        .with("pid_1_phys_0_eng_0_engtype_3D", vec![Ok(20.0), Ok(20.0), Ok(20.0)])
        .with("pid_2_phys_0_eng_0_engtype_3D", vec![Ok(30.0)]);

    let gpu = sampler(engines, 1);
    assert_eq!(gpu.counter_count(), 2);

    assert_eq!(gpu.sample(), 50.0);
    assert_eq!(gpu.sample(), 20.0);
    assert_eq!(gpu.counter_count(), 1);
    assert_eq!(gpu.sample(), 20.0);

    // Last one exhausted: nothing left to read
    assert_eq!(gpu.sample(), 0.0);
    assert_eq!(gpu.counter_count(), 0);
}

#[test]
fn test_transient_failure_keeps_counter() {
    let engines = FakeEngines::default().with(
        "pid_1_phys_0_eng_0_engtype_3D",
        vec![Err(MonitorError::read_failed("busy")), Ok(40.0)],
    );

    let gpu = sampler(engines, 1);
    assert_eq!(gpu.sample(), 0.0);
    assert_eq!(gpu.counter_count(), 1);
    assert_eq!(gpu.sample(), 40.0);
}

#[test]
fn test_smoothing_window_averages_recent_values() {
    let engines = FakeEngines::default().with(
        "pid_1_phys_0_eng_0_engtype_3D",
        vec![Ok(10.0), Ok(20.0), Ok(30.0), Ok(60.0)],
    );

    let gpu = sampler(engines, 3);
    assert_eq!(gpu.sample(), 10.0);
    assert_eq!(gpu.sample(), 15.0);
    assert_eq!(gpu.sample(), 20.0);
    // 10 evicted: (20 + 30 + 60) / 3
    assert!((gpu.sample() - 110.0 / 3.0).abs() < 1e-4);
}

#[test]
fn test_idle_readings_report_zero() {
    let engines = FakeEngines::default()
        .with("pid_1_phys_0_eng_0_engtype_3D", vec![Ok(0.0)])
        .with("pid_2_phys_0_eng_0_engtype_3D", vec![Ok(-3.0)]);

    assert_eq!(sampler(engines, 1).sample(), 0.0);
}

#[test]
fn test_unavailable_source_reports_zero() {
    let gpu = GpuSampler::with_source(
        Err(MonitorError::counter_unavailable("no GPU Engine category")),
        1,
    );

    assert_eq!(gpu.counter_count(), 0);
    assert_eq!(gpu.sample(), 0.0);
    assert_eq!(gpu.sample(), 0.0);
}
