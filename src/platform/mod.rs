// Platform-specific code module

pub mod gpu;
pub mod host;

// Re-exports para imports limpios
pub use gpu::open_gpu_engine_source;
pub use host::{open_cpu_source, open_memory_source, open_network_source, open_volume_source};
