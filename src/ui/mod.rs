// UI and formatting module

pub mod formatters;

// Re-export commonly used items for cleaner imports
pub use formatters::{
    format_percent, format_snapshot, format_speed, format_throughput, usage_bar,
};
