//! Monitor command handler.
//!
//! Streams one line per snapshot until Ctrl+C or `--count` is reached.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use crate::core::config::MonitorConfig;
use crate::core::system_monitor::{MonitorCoordinator, MonitorSnapshot};
use crate::ui::format_snapshot;

// How often the wait loop checks for cancellation
const CANCEL_POLL: Duration = Duration::from_millis(200);

/// Execute the monitor command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let json_output = matches.get_flag("json");
    let count = matches.get_one::<u64>("count").copied();

    let config = MonitorConfig::load().context("Failed to load configuration")?;
    let coordinator =
        MonitorCoordinator::from_host(&config).context("Failed to start system monitor")?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = Arc::clone(&cancelled);
    ctrlc::set_handler(move || {
        cancelled_clone.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let (tx, rx) = mpsc::channel::<MonitorSnapshot>();
    let _subscription = coordinator.subscribe(move |snapshot| {
        // Receiver is gone once the command is winding down
        let _ = tx.send(snapshot);
    });

    if !json_output {
        println!("{}", "Monitoring system resources (Ctrl+C to stop)".dimmed());
    }

    coordinator.start();
    log::info!("Monitor started");

    let mut printed: u64 = 0;
    while !cancelled.load(Ordering::Relaxed) {
        if count.is_some_and(|limit| printed >= limit) {
            break;
        }

        match rx.recv_timeout(CANCEL_POLL) {
            Ok(snapshot) => {
                print_snapshot(&snapshot, json_output)?;
                printed += 1;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    coordinator.stop();
    log::info!("Monitor stopped after {} snapshots", printed);

    Ok(())
}

fn print_snapshot(snapshot: &MonitorSnapshot, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!("{}", format_snapshot(snapshot));
    }
    Ok(())
}
