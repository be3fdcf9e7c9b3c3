//! Host metric sources consumed by the samplers.
//!
//! Each trait is the narrow piece of the operating system one sampler needs.
//! Implementations backed by the real host live in the platform layer; tests
//! substitute their own.

use std::time::Instant;

use crate::error::Result;

/// OS-level CPU utilization rate counter
pub trait CpuSource: Send {
    /// Average utilization (percent) since the previous read
    fn next_value(&mut self) -> Result<f32>;
}

/// Physical memory capacity, both values in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryReading {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

pub trait MemorySource: Send {
    fn query(&mut self) -> Result<MemoryReading>;
}

/// Capacity of one volume, both values in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolumeReading {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

pub trait VolumeSource: Send {
    /// `Ok(None)` when the volume is not mounted or not ready
    fn query(&mut self) -> Result<Option<VolumeReading>>;
}

/// Enumerable set of GPU engine performance counters
///
/// Instance names encode the physical adapter (`phys_<n>`) and the engine
/// type (`engtype_<kind>`).
pub trait GpuEngineSource: Send {
    fn instance_names(&mut self) -> Result<Vec<String>>;

    /// Open and prime the counter for one instance
    fn open_counter(&mut self, instance: &str) -> Result<Box<dyn EngineCounter>>;
}

/// One opened GPU engine utilization counter
pub trait EngineCounter: Send {
    /// Current utilization percent.
    ///
    /// Returns `MonitorError::CounterGone` once the instance is permanently
    /// unreadable; any other error is considered transient.
    fn next_value(&mut self) -> Result<f32>;
}

/// Cumulative byte counters of one network interface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub name: String,
    pub is_up: bool,
    pub is_loopback: bool,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

pub trait NetworkSource: Send {
    fn interfaces(&mut self) -> Result<Vec<InterfaceCounters>>;
}

/// Monotonic time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
