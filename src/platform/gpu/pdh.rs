//! Windows "GPU Engine" performance counters through PDH.

use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{iter, mem, ptr};

use parking_lot::Mutex;
use windows_sys::Win32::Foundation::ERROR_SUCCESS;
use windows_sys::Win32::System::Performance::{
    PdhAddEnglishCounterW, PdhCloseQuery, PdhCollectQueryData, PdhEnumObjectItemsW,
    PdhGetFormattedCounterValue, PdhOpenQueryW, PdhRemoveCounter, PDH_FMT_COUNTERVALUE,
    PDH_FMT_DOUBLE, PDH_HCOUNTER, PDH_HQUERY, PERF_DETAIL_WIZARD,
};

use crate::core::system_monitor::{EngineCounter, GpuEngineSource};
use crate::error::{MonitorError, Result};

const GPU_ENGINE_OBJECT: &str = "GPU Engine";

/// Reads closer together than this share one collection
const COLLECT_WINDOW: Duration = Duration::from_millis(250);

// pdhmsg.h
const PDH_CSTATUS_NO_INSTANCE: u32 = 0x8000_07D1;
const PDH_MORE_DATA: u32 = 0x8000_07D2;

pub struct PdhEngineSource {
    // Instances found while checking the category exists, handed out first
    discovered: Option<Vec<String>>,
    query: Arc<Mutex<SharedQuery>>,
}

impl PdhEngineSource {
    /// Fails when the GPU Engine category is not registered on this host
    pub fn new() -> Result<Self> {
        let discovered = enumerate_instances().map_err(|e| {
            MonitorError::counter_unavailable(format!("GPU Engine counters unavailable: {}", e))
        })?;

        Ok(Self {
            discovered: Some(discovered),
            query: Arc::new(Mutex::new(SharedQuery::open()?)),
        })
    }
}

impl GpuEngineSource for PdhEngineSource {
    fn instance_names(&mut self) -> Result<Vec<String>> {
        match self.discovered.take() {
            Some(names) => Ok(names),
            None => enumerate_instances(),
        }
    }

    fn open_counter(&mut self, instance: &str) -> Result<Box<dyn EngineCounter>> {
        Ok(Box::new(PdhEngineCounter::open(Arc::clone(&self.query), instance)?))
    }
}

/// The one PDH query every engine counter of a source is added to.
///
/// A poll reads all counters back to back, so the first read of a poll
/// collects and the rest reuse that collection.
struct SharedQuery {
    handle: PDH_HQUERY,
    last_collect: Option<Instant>,
}

// PDH handles are plain process-wide handles; access goes through the mutex
unsafe impl Send for SharedQuery {}

impl SharedQuery {
    fn open() -> Result<Self> {
        let mut handle: PDH_HQUERY = unsafe { mem::zeroed() };
        let status = unsafe { PdhOpenQueryW(ptr::null(), 0, &mut handle) };
        if status != ERROR_SUCCESS {
            return Err(MonitorError::counter_unavailable(format!(
                "Failed to open PDH query: 0x{:08X}",
                status
            )));
        }

        Ok(Self {
            handle,
            last_collect: None,
        })
    }

    fn collect(&mut self) -> std::result::Result<(), u32> {
        let status = unsafe { PdhCollectQueryData(self.handle) };
        if status != ERROR_SUCCESS {
            return Err(status);
        }
        self.last_collect = Some(Instant::now());
        Ok(())
    }

    fn collect_if_stale(&mut self) -> std::result::Result<(), u32> {
        if needs_collect(self.last_collect, Instant::now()) {
            self.collect()
        } else {
            Ok(())
        }
    }
}

impl Drop for SharedQuery {
    fn drop(&mut self) {
        unsafe {
            PdhCloseQuery(self.handle);
        }
    }
}

fn needs_collect(last_collect: Option<Instant>, now: Instant) -> bool {
    match last_collect {
        Some(at) => now.saturating_duration_since(at) >= COLLECT_WINDOW,
        None => true,
    }
}

fn enumerate_instances() -> Result<Vec<String>> {
    let object = to_wide(GPU_ENGINE_OBJECT);
    let mut counter_len: u32 = 0;
    let mut instance_len: u32 = 0;

    // First call only sizes the buffers
    let status = unsafe {
        PdhEnumObjectItemsW(
            ptr::null(),
            ptr::null(),
            object.as_ptr(),
            ptr::null_mut(),
            &mut counter_len,
            ptr::null_mut(),
            &mut instance_len,
            PERF_DETAIL_WIZARD,
            0,
        )
    };

    if status == ERROR_SUCCESS {
        return Ok(Vec::new());
    }
    if status != PDH_MORE_DATA {
        return Err(MonitorError::read_failed(format!(
            "PdhEnumObjectItemsW failed: 0x{:08X}",
            status
        )));
    }

    let mut counters = vec![0u16; counter_len as usize];
    let mut instances = vec![0u16; instance_len as usize];

    let status = unsafe {
        PdhEnumObjectItemsW(
            ptr::null(),
            ptr::null(),
            object.as_ptr(),
            counters.as_mut_ptr(),
            &mut counter_len,
            instances.as_mut_ptr(),
            &mut instance_len,
            PERF_DETAIL_WIZARD,
            0,
        )
    };

    if status != ERROR_SUCCESS {
        return Err(MonitorError::read_failed(format!(
            "PdhEnumObjectItemsW failed: 0x{:08X}",
            status
        )));
    }

    Ok(split_multi_sz(&instances))
}

/// One `\GPU Engine(<instance>)\Utilization Percentage` counter on the shared query
struct PdhEngineCounter {
    instance: String,
    query: Arc<Mutex<SharedQuery>>,
    counter: PDH_HCOUNTER,
}

// Counter handles are only touched while holding the query lock
unsafe impl Send for PdhEngineCounter {}

impl PdhEngineCounter {
    fn open(query: Arc<Mutex<SharedQuery>>, instance: &str) -> Result<Self> {
        let path = to_wide(&format!(
            "\\{}({})\\Utilization Percentage",
            GPU_ENGINE_OBJECT, instance
        ));

        let mut shared = query.lock();

        let mut counter: PDH_HCOUNTER = unsafe { mem::zeroed() };
        let status =
            unsafe { PdhAddEnglishCounterW(shared.handle, path.as_ptr(), 0, &mut counter) };
        if status != ERROR_SUCCESS {
            return Err(counter_error(instance, status));
        }

        // Rate counter: the first collection only establishes its baseline
        if let Err(status) = shared.collect() {
            unsafe {
                PdhRemoveCounter(counter);
            }
            return Err(counter_error(instance, status));
        }

        drop(shared);
        Ok(Self {
            instance: instance.to_string(),
            query,
            counter,
        })
    }
}

impl EngineCounter for PdhEngineCounter {
    fn next_value(&mut self) -> Result<f32> {
        let mut shared = self.query.lock();
        shared
            .collect_if_stale()
            .map_err(|status| counter_error(&self.instance, status))?;

        let mut value: PDH_FMT_COUNTERVALUE = unsafe { mem::zeroed() };
        let status = unsafe {
            PdhGetFormattedCounterValue(self.counter, PDH_FMT_DOUBLE, ptr::null_mut(), &mut value)
        };

        if status == ERROR_SUCCESS {
            let percent = unsafe { value.Anonymous.doubleValue };
            return Ok(percent as f32);
        }

        if value.CStatus == PDH_CSTATUS_NO_INSTANCE {
            return Err(counter_error(&self.instance, value.CStatus));
        }
        Err(counter_error(&self.instance, status))
    }
}

impl Drop for PdhEngineCounter {
    fn drop(&mut self) {
        let _shared = self.query.lock();
        unsafe {
            PdhRemoveCounter(self.counter);
        }
    }
}

/// The owning process exited: the instance will not come back
fn counter_error(instance: &str, status: u32) -> MonitorError {
    if status == PDH_CSTATUS_NO_INSTANCE {
        MonitorError::counter_gone(format!("GPU engine instance {} is gone", instance))
    } else {
        MonitorError::read_failed(format!(
            "GPU engine instance {} read failed: 0x{:08X}",
            instance, status
        ))
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(iter::once(0)).collect()
}

/// Splits a double-NUL-terminated UTF-16 string list
fn split_multi_sz(buffer: &[u16]) -> Vec<String> {
    buffer
        .split(|&c| c == 0)
        .take_while(|item| !item.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}
