use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::core::config::MonitorConfig;

use super::metrics::{MonitorSnapshot, NetworkRates};
use super::samplers::{CpuSampler, DiskSampler, GpuSampler, MemorySampler, NetworkSampler};

/// A component that produces one current value per poll.
///
/// Implementations absorb their own failures: `sample` never returns an
/// error, it degrades to a neutral value and logs instead.
pub trait Sampler: Send + Sync {
    type Output;

    /// Short name used in log messages
    fn name(&self) -> &'static str;

    fn sample(&self) -> Self::Output;
}

pub type PercentSampler = Box<dyn Sampler<Output = f32>>;
pub type RateSampler = Box<dyn Sampler<Output = NetworkRates>>;

/// The five samplers polled on every cycle
pub struct SamplerSet {
    pub cpu: PercentSampler,
    pub memory: PercentSampler,
    pub gpu: PercentSampler,
    pub disk: PercentSampler,
    pub network: RateSampler,
}

impl SamplerSet {
    /// Samplers backed by the host platform
    pub fn from_host(config: &MonitorConfig) -> Self {
        Self {
            cpu: Box::new(CpuSampler::new()),
            memory: Box::new(MemorySampler::new()),
            gpu: Box::new(GpuSampler::new(config.smoothing_window())),
            disk: Box::new(DiskSampler::new(config.resolve_system_volume())),
            network: Box::new(NetworkSampler::new()),
        }
    }

    /// Poll every sampler in sequence and assemble a snapshot.
    ///
    /// A sampler that panics contributes its default value; the others are
    /// still polled.
    pub fn assemble(&self) -> MonitorSnapshot {
        let cpu = poll_guarded(self.cpu.as_ref());
        let memory = poll_guarded(self.memory.as_ref());
        let gpu = poll_guarded(self.gpu.as_ref());
        let disk = poll_guarded(self.disk.as_ref());
        let network = poll_guarded(self.network.as_ref());

        MonitorSnapshot::new(cpu, memory, gpu, disk, network)
    }
}

fn poll_guarded<T: Default>(sampler: &dyn Sampler<Output = T>) -> T {
    match panic::catch_unwind(AssertUnwindSafe(|| sampler.sample())) {
        Ok(value) => value,
        Err(payload) => {
            log::error!(
                "{} sampler panicked: {}",
                sampler.name(),
                panic_message(payload.as_ref())
            );
            T::default()
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
