//! GPU 3D-engine utilization sampler.
//!
//! Matches what a task-manager style view reports as "GPU": only 3D engine
//! counters are considered, engine instances on the same physical adapter add
//! up, adapter 0 wins when it has any activity, otherwise the busiest adapter
//! is reported. The result is averaged over a small rolling window.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

use crate::core::system_monitor::history::RollingWindow;
use crate::core::system_monitor::metrics::clamp_percent;
use crate::core::system_monitor::sampler::Sampler;
use crate::core::system_monitor::sources::{EngineCounter, GpuEngineSource};
use crate::error::Result;
use crate::platform::gpu::open_gpu_engine_source;

static PHYS_ID_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"phys_(\d+)").ok());

const ENGINE_TYPE_3D: &str = "engtype_3D";

/// One opened engine counter plus its cached physical adapter id
pub struct GpuCounterHandle {
    pub instance: String,
    pub physical_adapter_id: u32,
    pub last_value: f32,
    counter: Box<dyn EngineCounter>,
}

impl GpuCounterHandle {
    pub fn new(instance: String, counter: Box<dyn EngineCounter>) -> Self {
        let physical_adapter_id = parse_physical_adapter_id(&instance);
        Self {
            instance,
            physical_adapter_id,
            last_value: 0.0,
            counter,
        }
    }
}

impl std::fmt::Debug for GpuCounterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuCounterHandle")
            .field("instance", &self.instance)
            .field("physical_adapter_id", &self.physical_adapter_id)
            .field("last_value", &self.last_value)
            .finish()
    }
}

struct GpuState {
    counters: Vec<GpuCounterHandle>,
    window: RollingWindow,
}

pub struct GpuSampler {
    state: Mutex<GpuState>,
}

impl GpuSampler {
    pub fn new(smoothing_window: usize) -> Self {
        Self::with_source(open_gpu_engine_source(), smoothing_window)
    }

    pub fn with_source(source: Result<Box<dyn GpuEngineSource>>, smoothing_window: usize) -> Self {
        let counters = match source {
            Ok(mut source) => open_3d_counters(source.as_mut()),
            Err(e) => {
                log::warn!("GPU engine counters unavailable, reporting 0: {}", e);
                Vec::new()
            }
        };

        log::debug!("GPU sampler tracking {} 3D engine counters", counters.len());

        Self {
            state: Mutex::new(GpuState {
                counters,
                window: RollingWindow::with_capacity(smoothing_window),
            }),
        }
    }

    /// Number of engine counters still being read
    pub fn counter_count(&self) -> usize {
        self.state.lock().counters.len()
    }
}

impl Sampler for GpuSampler {
    type Output = f32;

    fn name(&self) -> &'static str {
        "gpu"
    }

    fn sample(&self) -> f32 {
        let mut state = self.state.lock();
        if state.counters.is_empty() {
            return 0.0;
        }

        let mut by_adapter: BTreeMap<u32, f32> = BTreeMap::new();

        state.counters.retain_mut(|handle| match handle.counter.next_value() {
            Ok(value) => {
                handle.last_value = value;
                if is_active_reading(value) {
                    *by_adapter.entry(handle.physical_adapter_id).or_insert(0.0) += value;
                }
                true
            }
            Err(e) if e.is_counter_gone() => {
                log::debug!("Retiring GPU counter {}: {}", handle.instance, e);
                false
            }
            Err(e) => {
                log::debug!("GPU counter {} read failed: {}", handle.instance, e);
                true
            }
        });

        let Some(raw) = aggregate_adapters(&by_adapter) else {
            return 0.0;
        };

        let smoothed = state.window.push_and_mean(raw);
        clamp_percent(smoothed.min(100.0))
    }
}

fn open_3d_counters(source: &mut dyn GpuEngineSource) -> Vec<GpuCounterHandle> {
    let instances = match source.instance_names() {
        Ok(instances) => instances,
        Err(e) => {
            log::warn!("Failed to enumerate GPU engine instances: {}", e);
            return Vec::new();
        }
    };

    instances
        .into_iter()
        .filter(|name| is_3d_engine(name))
        .filter_map(|name| match source.open_counter(&name) {
            Ok(counter) => Some(GpuCounterHandle::new(name, counter)),
            Err(e) => {
                log::debug!("Skipping GPU engine instance {}: {}", name, e);
                None
            }
        })
        .collect()
}

pub fn is_3d_engine(instance: &str) -> bool {
    instance.contains(ENGINE_TYPE_3D)
}

/// Adapter id from `phys_<n>` in the instance name, 0 when absent
pub fn parse_physical_adapter_id(instance: &str) -> u32 {
    PHYS_ID_RE
        .as_ref()
        .and_then(|re| re.captures(instance))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Idle engines report exactly 0 and are ignored; out-of-range and NaN too
fn is_active_reading(value: f32) -> bool {
    value > 0.0 && value <= 100.0
}

/// Adapter 0 if it has activity, else the busiest adapter, capped at 100
pub fn aggregate_adapters(by_adapter: &BTreeMap<u32, f32>) -> Option<f32> {
    by_adapter
        .get(&0)
        .copied()
        .or_else(|| by_adapter.values().copied().reduce(f32::max))
        .map(|total| total.min(100.0))
}
