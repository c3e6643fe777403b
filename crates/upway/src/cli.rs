//! Clap derive structures for the `upway` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// upway -- myUpway to MQTT bridge
#[derive(Debug, Parser)]
#[command(
    name = "upway",
    version,
    about = "Bridge myUpway heat-pump telemetry to MQTT",
    long_about = "Polls the myUpway portal for the current values of a heat pump and\n\
        republishes them to an MQTT broker, announcing every sensor through\n\
        Home Assistant auto-discovery.\n\n\
        Settings come from the environment (MQTT_HOST, MYUPWAY_USERNAME, ...)\n\
        and an optional TOML file; environment values win."
)]
pub struct Cli {
    /// TOML config file (keys are the lower-case environment names)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, env = "UPWAY_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Log in, publish discovery, poll once, drain and exit
    #[arg(long)]
    pub once: bool,

    /// Log publishes instead of sending them to a broker
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}
