//! Sampling and aggregation engine.
//!
//! Per-resource samplers (CPU, memory, GPU, disk, network) polled once per
//! second by the coordinator, which fans each snapshot out to subscribers.

mod coordinator;
mod history;
mod metrics;
mod sampler;
pub mod samplers;
pub mod sources;

pub use coordinator::{MonitorCoordinator, Subscription, POLL_INTERVAL};
pub use history::{RollingWindow, DEFAULT_SMOOTHING_WINDOW};
pub use metrics::{clamp_percent, usage_percent, MonitorSnapshot, NetworkRates};
pub use sampler::{PercentSampler, RateSampler, Sampler, SamplerSet};
pub use samplers::{CpuSampler, DiskSampler, GpuSampler, MemorySampler, NetworkSampler};
pub use sources::{
    Clock, CpuSource, EngineCounter, GpuEngineSource, InterfaceCounters, MemoryReading,
    MemorySource, NetworkSource, SystemClock, VolumeReading, VolumeSource,
};
