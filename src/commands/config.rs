use crate::core::config::MonitorConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

pub fn handle(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("set", sub_matches)) => handle_set(sub_matches),
        _ => {
            println!("Use 'systatus config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let path = MonitorConfig::get_config_path()?;
    let config = MonitorConfig::load()?;

    println!("{}", "Configuration file:".white());
    println!("  {}", path.display().to_string().dimmed());
    println!();
    println!(
        "{} {}",
        "GPU smoothing window:".white(),
        config.smoothing_window().to_string().cyan().bold()
    );

    let volume = config.resolve_system_volume();
    let origin = if config.system_volume.is_some() {
        "configured"
    } else {
        "system default"
    };
    println!(
        "{} {} {}",
        "Monitored volume:".white(),
        volume.display().to_string().cyan().bold(),
        format!("({})", origin).dimmed()
    );

    Ok(())
}

fn handle_set(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("smoothing-window", sub_matches)) => {
            let window = *sub_matches
                .get_one::<usize>("size")
                .context("Window size is required")?;

            let mut config = MonitorConfig::load()?;
            config.set_smoothing_window(window)?;
            config.save()?;

            println!(
                "{} {}",
                "✓ GPU smoothing window set to:".green(),
                window
            );
            Ok(())
        }
        Some(("volume", sub_matches)) => {
            let path = sub_matches
                .get_one::<String>("path")
                .context("Volume path is required")?;

            let volume = PathBuf::from(path);
            if !volume.exists() {
                println!(
                    "{}",
                    format!("⚠️  Warning: Volume '{}' does not exist", path).yellow()
                );
                println!(
                    "{}",
                    "Disk usage will read 0% until it is mounted.".dimmed()
                );
            }

            let mut config = MonitorConfig::load()?;
            config.set_system_volume(volume);
            config.save()?;

            println!("{} {}", "✓ Monitored volume set to:".green(), path);
            Ok(())
        }
        _ => {
            println!("Use 'systatus config set --help' for more information.");
            Ok(())
        }
    }
}
