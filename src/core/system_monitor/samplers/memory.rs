//! Physical memory utilization sampler.

use parking_lot::Mutex;

use crate::core::system_monitor::metrics::usage_percent;
use crate::core::system_monitor::sampler::Sampler;
use crate::core::system_monitor::sources::MemorySource;
use crate::error::Result;
use crate::platform::host::open_memory_source;

/// `(total - available) / total * 100` over physical memory
pub struct MemorySampler {
    source: Mutex<Option<Box<dyn MemorySource>>>,
}

impl MemorySampler {
    pub fn new() -> Self {
        Self::with_source(open_memory_source())
    }

    pub fn with_source(source: Result<Box<dyn MemorySource>>) -> Self {
        let source = source
            .map_err(|e| log::warn!("Memory counter unavailable, reporting 0: {}", e))
            .ok();

        Self {
            source: Mutex::new(source),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.source.lock().is_none()
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for MemorySampler {
    type Output = f32;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn sample(&self) -> f32 {
        let mut guard = self.source.lock();
        let Some(source) = guard.as_mut() else {
            return 0.0;
        };

        match source.query() {
            Ok(reading) => usage_percent(reading.total_bytes, reading.available_bytes),
            Err(e) => {
                log::debug!("Memory query failed: {}", e);
                0.0
            }
        }
    }
}
