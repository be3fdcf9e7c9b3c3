//! Network throughput sampler.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::core::system_monitor::metrics::NetworkRates;
use crate::core::system_monitor::sampler::Sampler;
use crate::core::system_monitor::sources::{Clock, NetworkSource, SystemClock};
use crate::error::Result;
use crate::platform::host::open_network_source;

/// Cumulative totals and the instant they were captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkCounterState {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub captured_at: Instant,
}

struct NetworkInner {
    source: Option<Box<dyn NetworkSource>>,
    baseline: Option<NetworkCounterState>,
}

/// Download/upload rates from cumulative interface counters.
///
/// Only interfaces that are up and not loopback are counted. Rates are
/// `(current - previous) / elapsed`; a counter that went backwards yields 0
/// and a poll with no elapsed time yields `(0, 0)` without touching the
/// stored baseline.
pub struct NetworkSampler {
    inner: Mutex<NetworkInner>,
    clock: Arc<dyn Clock>,
}

impl NetworkSampler {
    pub fn new() -> Self {
        Self::with_source(open_network_source(), Arc::new(SystemClock))
    }

    pub fn with_source(source: Result<Box<dyn NetworkSource>>, clock: Arc<dyn Clock>) -> Self {
        let mut source = source
            .map_err(|e| log::warn!("Network counters unavailable, reporting 0: {}", e))
            .ok();

        let baseline = source.as_mut().and_then(|source| {
            match capture_totals(source.as_mut(), clock.as_ref()) {
                Ok(state) => Some(state),
                Err(e) => {
                    log::warn!("Failed to capture initial network counters: {}", e);
                    None
                }
            }
        });

        Self {
            inner: Mutex::new(NetworkInner { source, baseline }),
            clock,
        }
    }

    /// The totals the next rate is computed against
    pub fn baseline(&self) -> Option<NetworkCounterState> {
        self.inner.lock().baseline
    }
}

impl Default for NetworkSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for NetworkSampler {
    type Output = NetworkRates;

    fn name(&self) -> &'static str {
        "network"
    }

    fn sample(&self) -> NetworkRates {
        let mut inner = self.inner.lock();
        let NetworkInner { source, baseline } = &mut *inner;

        let Some(source) = source.as_mut() else {
            return NetworkRates::ZERO;
        };

        let current = match capture_totals(source.as_mut(), self.clock.as_ref()) {
            Ok(current) => current,
            Err(e) => {
                log::debug!("Network counter read failed: {}", e);
                return NetworkRates::ZERO;
            }
        };

        // First successful read establishes the baseline
        let Some(previous) = *baseline else {
            *baseline = Some(current);
            return NetworkRates::ZERO;
        };

        match compute_rates(&previous, &current) {
            Some(rates) => {
                *baseline = Some(current);
                rates
            }
            None => NetworkRates::ZERO,
        }
    }
}

fn capture_totals(
    source: &mut dyn NetworkSource,
    clock: &dyn Clock,
) -> Result<NetworkCounterState> {
    let (bytes_received, bytes_sent) = source
        .interfaces()?
        .iter()
        .filter(|iface| iface.is_up && !iface.is_loopback)
        .fold((0u64, 0u64), |(rx, tx), iface| {
            (
                rx.saturating_add(iface.bytes_received),
                tx.saturating_add(iface.bytes_sent),
            )
        });

    Ok(NetworkCounterState {
        bytes_received,
        bytes_sent,
        captured_at: clock.now(),
    })
}

/// `None` when no time has elapsed between the two captures
pub fn compute_rates(
    previous: &NetworkCounterState,
    current: &NetworkCounterState,
) -> Option<NetworkRates> {
    let elapsed = current
        .captured_at
        .checked_duration_since(previous.captured_at)?
        .as_secs_f64();

    if elapsed <= 0.0 {
        return None;
    }

    let rate = |now: u64, before: u64| (now.saturating_sub(before) as f64 / elapsed) as u64;

    Some(NetworkRates::new(
        rate(current.bytes_received, previous.bytes_received),
        rate(current.bytes_sent, previous.bytes_sent),
    ))
}
