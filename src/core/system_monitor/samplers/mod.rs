//! Per-resource samplers.
//!
//! Each sampler owns its host source and its own state, and never lets a
//! failure escape `sample()`.

mod cpu;
mod disk;
mod gpu;
mod memory;
mod network;

pub use cpu::CpuSampler;
pub use disk::DiskSampler;
pub use gpu::{
    aggregate_adapters, is_3d_engine, parse_physical_adapter_id, GpuCounterHandle, GpuSampler,
};
pub use memory::MemorySampler;
pub use network::{compute_rates, NetworkCounterState, NetworkSampler};
