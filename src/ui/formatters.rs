use colored::{ColoredString, Colorize};
use humansize::{format_size, FormatSizeOptions, WINDOWS};

use crate::core::system_monitor::MonitorSnapshot;

const BAR_WIDTH: usize = 10;
const KB: u64 = 1024;

/// Format a percentage with one decimal (12.5%)
pub fn format_percent(percent: f32) -> String {
    format!("{:.1}%", percent)
}

/// Format a byte rate with 1024-based units and two decimals (1.50 KB/s)
pub fn format_speed(bytes_per_sec: u64) -> String {
    if bytes_per_sec < KB {
        return format!("{} B/s", bytes_per_sec);
    }

    let options = FormatSizeOptions::from(WINDOWS)
        .decimal_zeroes(2)
        .suffix("/s");

    // WINDOWS divides by 1024 but labels kilobytes "kB"
    format_size(bytes_per_sec, options).replace("kB", "KB")
}

/// Format download and upload rates as `↓ <down> / ↑ <up>`
pub fn format_throughput(download_bytes_per_sec: u64, upload_bytes_per_sec: u64) -> String {
    format!(
        "↓ {} / ↑ {}",
        format_speed(download_bytes_per_sec),
        format_speed(upload_bytes_per_sec)
    )
}

/// Fixed-width bar, colored by load
pub fn usage_bar(percent: f32) -> String {
    let filled = (((percent / 100.0) * BAR_WIDTH as f32) as usize).min(BAR_WIDTH);
    let empty = BAR_WIDTH - filled;

    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(empty));

    format!("[{}]", load_color(bar, percent))
}

fn load_color(text: String, percent: f32) -> ColoredString {
    if percent >= 85.0 {
        text.red()
    } else if percent >= 70.0 {
        text.yellow()
    } else {
        text.green()
    }
}

/// One line per snapshot for the terminal
pub fn format_snapshot(snapshot: &MonitorSnapshot) -> String {
    let gauge = |label: &str, percent: f32| {
        format!(
            "{} {} {:>6}",
            label.bold(),
            usage_bar(percent),
            format_percent(percent)
        )
    };

    format!(
        "{}  {}  {}  {}  {} {}",
        gauge("CPU", snapshot.cpu_usage),
        gauge("MEM", snapshot.memory_usage),
        gauge("GPU", snapshot.gpu_usage),
        gauge("DISK", snapshot.disk_usage),
        "NET".bold(),
        format_throughput(
            snapshot.download_bytes_per_sec,
            snapshot.upload_bytes_per_sec
        )
        .cyan()
    )
}
