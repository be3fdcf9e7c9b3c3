//! CPU utilization sampler.

use parking_lot::Mutex;

use crate::core::system_monitor::metrics::clamp_percent;
use crate::core::system_monitor::sampler::Sampler;
use crate::core::system_monitor::sources::CpuSource;
use crate::error::Result;
use crate::platform::host::open_cpu_source;

/// Samples overall CPU utilization from one rate counter.
///
/// The counter reports the average since the previous read, so the very
/// first read after opening is meaningless; it is taken and discarded at
/// construction. If the counter cannot be opened the sampler is degraded and
/// reports 0 forever.
pub struct CpuSampler {
    source: Mutex<Option<Box<dyn CpuSource>>>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::with_source(open_cpu_source())
    }

    pub fn with_source(source: Result<Box<dyn CpuSource>>) -> Self {
        let source = match source {
            Ok(mut source) => {
                // Prime the rate counter
                if let Err(e) = source.next_value() {
                    log::debug!("Initial CPU counter read failed: {}", e);
                }
                Some(source)
            }
            Err(e) => {
                log::warn!("CPU counter unavailable, reporting 0: {}", e);
                None
            }
        };

        Self {
            source: Mutex::new(source),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.source.lock().is_none()
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for CpuSampler {
    type Output = f32;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn sample(&self) -> f32 {
        let mut guard = self.source.lock();
        let Some(source) = guard.as_mut() else {
            return 0.0;
        };

        match source.next_value() {
            Ok(value) => clamp_percent(value),
            Err(e) => {
                log::debug!("CPU counter read failed: {}", e);
                0.0
            }
        }
    }
}
