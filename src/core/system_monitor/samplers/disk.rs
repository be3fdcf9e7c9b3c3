//! System volume utilization sampler.

use std::path::PathBuf;

use parking_lot::Mutex;

use crate::core::system_monitor::metrics::usage_percent;
use crate::core::system_monitor::sampler::Sampler;
use crate::core::system_monitor::sources::VolumeSource;
use crate::error::Result;
use crate::platform::host::open_volume_source;

/// `(total - free) / total * 100` for one designated volume
pub struct DiskSampler {
    source: Mutex<Option<Box<dyn VolumeSource>>>,
}

impl DiskSampler {
    /// Sampler for the volume mounted at `volume`
    pub fn new(volume: PathBuf) -> Self {
        Self::with_source(open_volume_source(volume))
    }

    pub fn with_source(source: Result<Box<dyn VolumeSource>>) -> Self {
        let source = source
            .map_err(|e| log::warn!("Volume query unavailable, reporting 0: {}", e))
            .ok();

        Self {
            source: Mutex::new(source),
        }
    }
}

impl Sampler for DiskSampler {
    type Output = f32;

    fn name(&self) -> &'static str {
        "disk"
    }

    fn sample(&self) -> f32 {
        let mut guard = self.source.lock();
        let Some(source) = guard.as_mut() else {
            return 0.0;
        };

        match source.query() {
            Ok(Some(volume)) => usage_percent(volume.total_bytes, volume.free_bytes),
            Ok(None) => {
                log::debug!("System volume not ready");
                0.0
            }
            Err(e) => {
                log::debug!("Volume query failed: {}", e);
                0.0
            }
        }
    }
}
