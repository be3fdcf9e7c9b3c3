#[cfg(feature = "nvml")]
use std::collections::BTreeMap;
#[cfg(feature = "nvml")]
use std::sync::Arc;

#[cfg(feature = "nvml")]
use nvml_wrapper::{error::NvmlError, Nvml};

use crate::core::system_monitor::{EngineCounter, GpuEngineSource};
use crate::error::{MonitorError, Result};

/// 3D engine utilization per NVIDIA device, exposed with the same instance
/// naming as the Windows GPU Engine counters (`phys_<index>_eng_0_engtype_3D`).
pub struct NvmlEngineSource {
    #[cfg(feature = "nvml")]
    nvml: Arc<Nvml>,
    #[cfg(feature = "nvml")]
    instances: BTreeMap<String, u32>,
}

impl NvmlEngineSource {
    pub fn new() -> Result<Self> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Nvml::init().map_err(|e| {
                MonitorError::counter_unavailable(format!("Failed to init NVML: {}", e))
            })?;

            Ok(Self {
                nvml: Arc::new(nvml),
                instances: BTreeMap::new(),
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(MonitorError::counter_unavailable(
                "NVIDIA GPU support not enabled",
            ))
        }
    }
}

impl GpuEngineSource for NvmlEngineSource {
    fn instance_names(&mut self) -> Result<Vec<String>> {
        #[cfg(feature = "nvml")]
        {
            let count = self.nvml.device_count().map_err(|e| {
                MonitorError::read_failed(format!("Failed to count GPUs: {}", e))
            })?;

            self.instances = (0..count)
                .map(|index| (format!("phys_{}_eng_0_engtype_3D", index), index))
                .collect();

            Ok(self.instances.keys().cloned().collect())
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(MonitorError::counter_unavailable(
                "NVIDIA GPU support not enabled",
            ))
        }
    }

    fn open_counter(&mut self, instance: &str) -> Result<Box<dyn EngineCounter>> {
        #[cfg(feature = "nvml")]
        {
            let index = *self.instances.get(instance).ok_or_else(|| {
                MonitorError::counter_gone(format!("Unknown GPU engine instance {}", instance))
            })?;

            let mut counter = NvmlEngineCounter {
                nvml: Arc::clone(&self.nvml),
                index,
            };
            // Verify device answers before handing the counter out
            counter.next_value()?;

            Ok(Box::new(counter))
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = instance;
            Err(MonitorError::counter_unavailable(
                "NVIDIA GPU support not enabled",
            ))
        }
    }
}

#[cfg(feature = "nvml")]
struct NvmlEngineCounter {
    nvml: Arc<Nvml>,
    index: u32,
}

#[cfg(feature = "nvml")]
impl EngineCounter for NvmlEngineCounter {
    fn next_value(&mut self) -> Result<f32> {
        let device = self
            .nvml
            .device_by_index(self.index)
            .map_err(|e| nvml_error(self.index, e))?;

        let utilization = device
            .utilization_rates()
            .map_err(|e| nvml_error(self.index, e))?;

        Ok(utilization.gpu as f32)
    }
}

/// A device that fell off the bus or vanished will never answer again
#[cfg(feature = "nvml")]
fn nvml_error(index: u32, error: NvmlError) -> MonitorError {
    match error {
        NvmlError::GpuLost | NvmlError::NotFound | NvmlError::InvalidArg => {
            MonitorError::counter_gone(format!("GPU {} is gone: {}", index, error))
        }
        other => MonitorError::read_failed(format!("GPU {} read failed: {}", index, other)),
    }
}
