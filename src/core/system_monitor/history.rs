use std::collections::VecDeque;

pub const DEFAULT_SMOOTHING_WINDOW: usize = 1;

/// Bounded window of recent readings, averaged for smoothing
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f32>,
}

impl RollingWindow {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SMOOTHING_WINDOW)
    }

    /// A capacity of 0 is treated as 1 (latest value only)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Arithmetic mean of the retained values, `None` when empty
    pub fn mean(&self) -> Option<f32> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f32>() / self.values.len() as f32)
    }

    /// Push a value and return the new mean
    pub fn push_and_mean(&mut self, value: f32) -> f32 {
        self.push(value);
        self.mean().unwrap_or(value)
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new()
    }
}
