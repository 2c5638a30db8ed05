//! CLI argument definitions for `leit`.

use clap::{Arg, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    // Build the CLI definition in one place to keep main.rs slim.
    Command::new("Leit")
        .version("0.2")
        .about("Drive a context-reactive soundtrack from a scenario file")
        .arg_required_else_help(true)
        .arg(
            Arg::new("scenario")
                .value_name("SCENARIO")
                .required(true)
                .help("Path to a scenario JSON file describing signals and entries"),
        )
        .arg(
            Arg::new("music-dir")
                .long("music-dir")
                .short('m')
                .value_name("DIR")
                .help("Directory containing audio tracks (defaults to the scenario's directory)"),
        )
        .arg(
            Arg::new("gain")
                .long("gain")
                .short('g')
                .value_name("GAIN")
                .default_value("70")
                .help("User gain percent (0-100)"),
        )
        .arg(
            Arg::new("tick-ms")
                .long("tick-ms")
                .value_name("MS")
                .default_value("50")
                .help("Tick interval in milliseconds"),
        )
        .arg(
            Arg::new("ticks")
                .long("ticks")
                .value_name("N")
                .help("Exit after N ticks instead of running until 'quit'"),
        )
}
