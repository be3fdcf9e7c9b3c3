//! GPU engine counter backends.
//!
//! Windows exposes per-process "GPU Engine" counters through PDH. Elsewhere
//! NVIDIA devices are read through NVML and reported with the same
//! instance naming.

mod nvidia;
#[cfg(windows)]
mod pdh;

pub use nvidia::NvmlEngineSource;
#[cfg(windows)]
pub use pdh::PdhEngineSource;

use crate::core::system_monitor::GpuEngineSource;
use crate::error::Result;

/// Open the engine counter source for this host
///
/// Prefers the Windows GPU Engine category, then NVML.
pub fn open_gpu_engine_source() -> Result<Box<dyn GpuEngineSource>> {
    #[cfg(windows)]
    {
        match PdhEngineSource::new() {
            Ok(source) => return Ok(Box::new(source)),
            Err(e) => log::debug!("PDH GPU engine counters unavailable: {}", e),
        }
    }

    Ok(Box::new(NvmlEngineSource::new()?))
}
