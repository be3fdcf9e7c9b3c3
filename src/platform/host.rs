//! Host sources backed by `sysinfo`.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Instant;

use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

use crate::core::system_monitor::{
    CpuSource, InterfaceCounters, MemoryReading, MemorySource, NetworkSource, VolumeReading,
    VolumeSource,
};
use crate::error::{MonitorError, Result};

pub fn open_cpu_source() -> Result<Box<dyn CpuSource>> {
    Ok(Box::new(SysinfoCpuSource::new()?))
}

pub fn open_memory_source() -> Result<Box<dyn MemorySource>> {
    Ok(Box::new(SysinfoMemorySource::new()?))
}

pub fn open_volume_source(volume: PathBuf) -> Result<Box<dyn VolumeSource>> {
    Ok(Box::new(SysinfoVolumeSource::new(volume)?))
}

pub fn open_network_source() -> Result<Box<dyn NetworkSource>> {
    Ok(Box::new(SysinfoNetworkSource::new()?))
}

fn ensure_supported() -> Result<()> {
    if sysinfo::IS_SUPPORTED_SYSTEM {
        Ok(())
    } else {
        Err(MonitorError::counter_unavailable(
            "system metrics are not supported on this platform",
        ))
    }
}

/// Global CPU usage from `sysinfo`.
///
/// sysinfo needs `MINIMUM_CPU_UPDATE_INTERVAL` between refreshes to compute
/// a meaningful value; faster reads return the previous value.
pub struct SysinfoCpuSource {
    system: System,
    last_refresh: Instant,
    last_value: f32,
}

impl SysinfoCpuSource {
    pub fn new() -> Result<Self> {
        ensure_supported()?;

        let system = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage()),
        );

        if system.cpus().is_empty() {
            return Err(MonitorError::counter_unavailable("no CPUs reported"));
        }

        Ok(Self {
            system,
            last_refresh: Instant::now(),
            last_value: 0.0,
        })
    }
}

impl CpuSource for SysinfoCpuSource {
    fn next_value(&mut self) -> Result<f32> {
        if self.last_refresh.elapsed() < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL {
            return Ok(self.last_value);
        }

        self.system.refresh_cpu_usage();
        self.last_refresh = Instant::now();
        self.last_value = self.system.global_cpu_usage();

        Ok(self.last_value)
    }
}

pub struct SysinfoMemorySource {
    system: System,
}

impl SysinfoMemorySource {
    pub fn new() -> Result<Self> {
        ensure_supported()?;

        Ok(Self {
            system: System::new_with_specifics(
                RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
            ),
        })
    }
}

impl MemorySource for SysinfoMemorySource {
    fn query(&mut self) -> Result<MemoryReading> {
        self.system.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());

        Ok(MemoryReading {
            total_bytes: self.system.total_memory(),
            available_bytes: self.system.available_memory(),
        })
    }
}

/// Total/free space of the disk mounted at one path
pub struct SysinfoVolumeSource {
    disks: Disks,
    volume: PathBuf,
}

impl SysinfoVolumeSource {
    pub fn new(volume: PathBuf) -> Result<Self> {
        ensure_supported()?;

        Ok(Self {
            disks: Disks::new_with_refreshed_list(),
            volume,
        })
    }

    fn find(&self) -> Option<VolumeReading> {
        self.disks
            .iter()
            .find(|disk| disk.mount_point() == self.volume)
            .map(|disk| VolumeReading {
                total_bytes: disk.total_space(),
                free_bytes: disk.available_space(),
            })
    }
}

impl VolumeSource for SysinfoVolumeSource {
    fn query(&mut self) -> Result<Option<VolumeReading>> {
        self.disks.refresh(true);
        if let Some(reading) = self.find() {
            return Ok(Some(reading));
        }

        // The volume may have been mounted since the list was built
        self.disks = Disks::new_with_refreshed_list();
        Ok(self.find())
    }
}

pub struct SysinfoNetworkSource {
    networks: Networks,
}

impl SysinfoNetworkSource {
    pub fn new() -> Result<Self> {
        ensure_supported()?;

        Ok(Self {
            networks: Networks::new_with_refreshed_list(),
        })
    }
}

impl NetworkSource for SysinfoNetworkSource {
    fn interfaces(&mut self) -> Result<Vec<InterfaceCounters>> {
        self.networks.refresh(true);

        Ok(self
            .networks
            .iter()
            .map(|(name, data)| {
                let addrs: Vec<IpAddr> = data.ip_networks().iter().map(|net| net.addr).collect();
                InterfaceCounters {
                    name: name.to_string(),
                    is_up: !addrs.is_empty(),
                    is_loopback: is_loopback(name, &addrs),
                    bytes_received: data.total_received(),
                    bytes_sent: data.total_transmitted(),
                }
            })
            .collect())
    }
}

/// `lo`, `lo0`, `Loopback Pseudo-Interface 1`, or only loopback addresses
fn is_loopback(name: &str, addrs: &[IpAddr]) -> bool {
    let name = name.to_ascii_lowercase();

    let named_loopback = name.starts_with("loopback")
        || name
            .strip_prefix("lo")
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()));

    named_loopback || (!addrs.is_empty() && addrs.iter().all(IpAddr::is_loopback))
}
