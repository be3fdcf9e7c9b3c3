use anyhow::Result;
use clap::{Arg, Command};

use systatus::commands;

fn main() -> Result<()> {
    systatus::init_logging();

    let matches = Command::new("systatus")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live CPU, memory, GPU, disk and network usage")
        .subcommand(
            Command::new("monitor")
                .about("Stream resource usage once per second")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print one JSON object per snapshot")
                        .action(clap::ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .value_name("N")
                        .help("Stop after N snapshots")
                        .value_parser(clap::value_parser!(u64).range(1..))
                )
        )
        .subcommand(
            Command::new("config")
                .about("Show or change settings (use 'systatus config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("show")
                        .about("Show the effective configuration")
                )
                .subcommand(
                    Command::new("set")
                        .about("Set configuration values")
                        .subcommand_required(true)
                        .arg_required_else_help(true)
                        .subcommand(
                            Command::new("smoothing-window")
                                .about("Number of GPU readings averaged together")
                                .arg(
                                    Arg::new("size")
                                        .help("Window size (1 = latest reading only)")
                                        .required(true)
                                        .index(1)
                                        .value_parser(clap::value_parser!(usize))
                                )
                        )
                        .subcommand(
                            Command::new("volume")
                                .about("Volume whose usage is reported")
                                .arg(
                                    Arg::new("path")
                                        .help("Mount point or drive root, e.g. / or D:\\")
                                        .required(true)
                                        .index(1)
                                )
                        )
                )
        )
        .get_matches();

    match matches.subcommand() {
        Some(("monitor", sub_matches)) => {
            commands::monitor(sub_matches)?;
        }
        Some(("config", sub_matches)) => {
            commands::config::handle(sub_matches)?;
        }
        _ => {
            println!("Welcome to systatus!");
            println!("Use 'systatus --help' for more information.");
        }
    }

    Ok(())
}
