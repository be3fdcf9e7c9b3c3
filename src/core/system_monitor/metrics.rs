use serde::{Deserialize, Serialize};

/// One complete set of readings from a single poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub timestamp: i64, // Unix timestamp
    pub cpu_usage: f32,
    pub memory_usage: f32,
    pub gpu_usage: f32,
    pub disk_usage: f32,
    pub download_bytes_per_sec: u64,
    pub upload_bytes_per_sec: u64,
}

impl MonitorSnapshot {
    /// Build a snapshot stamped with the current time.
    ///
    /// Percentages are clamped to `[0, 100]` here as well, so a misbehaving
    /// sampler can never leak an out-of-range value to subscribers.
    pub fn new(cpu: f32, memory: f32, gpu: f32, disk: f32, network: NetworkRates) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            cpu_usage: clamp_percent(cpu),
            memory_usage: clamp_percent(memory),
            gpu_usage: clamp_percent(gpu),
            disk_usage: clamp_percent(disk),
            download_bytes_per_sec: network.download_bytes_per_sec,
            upload_bytes_per_sec: network.upload_bytes_per_sec,
        }
    }
}

/// Download/upload throughput in bytes per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRates {
    pub download_bytes_per_sec: u64,
    pub upload_bytes_per_sec: u64,
}

impl NetworkRates {
    pub const ZERO: NetworkRates = NetworkRates {
        download_bytes_per_sec: 0,
        upload_bytes_per_sec: 0,
    };

    pub fn new(download_bytes_per_sec: u64, upload_bytes_per_sec: u64) -> Self {
        Self {
            download_bytes_per_sec,
            upload_bytes_per_sec,
        }
    }
}

/// Clamp a percentage into `[0, 100]`, mapping NaN to 0
pub fn clamp_percent(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// `(total - free) / total * 100`, or 0 when the total is unknown
pub fn usage_percent(total: u64, free: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }

    let used = total.saturating_sub(free);
    clamp_percent((used as f64 / total as f64 * 100.0) as f32)
}
