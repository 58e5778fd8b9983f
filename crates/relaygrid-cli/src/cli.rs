use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use relaygrid_protection::FlowDirection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "relaygrid", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides the settings file)
    #[arg(long)]
    pub log_level: Option<tracing::Level>,

    /// Settings file (default: <config dir>/relaygrid/relaygrid.toml)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect network cases
    Case {
        #[command(subcommand)]
        command: CaseCommands,
    },
    /// Load, audit and query protection devices
    Devices {
        #[command(subcommand)]
        command: DevicesCommands,
    },
    /// Fault scenario sets
    Scenarios {
        #[command(subcommand)]
        command: ScenariosCommands,
    },
    /// Check primary/backup coordination for every scenario in a set
    Coordinate {
        /// Protection scheme file (yaml, json or toml)
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
        /// Fault scenario set (yaml or json)
        #[arg(long, value_hint = ValueHint::FilePath)]
        scenarios: PathBuf,
        /// Network case; the built-in IEEE 14-bus case when omitted
        #[arg(long, value_hint = ValueHint::FilePath)]
        case: Option<PathBuf>,
        /// Required margin in seconds, overriding scenario and scheme margins
        #[arg(long)]
        margin: Option<f64>,
        /// Output format (default from settings)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Worker threads ("auto" or a count; default from settings)
        #[arg(long)]
        threads: Option<String>,
        /// Exit with an error unless every scenario passes
        #[arg(long)]
        strict: bool,
    },
    /// Print the effective settings
    Settings,
}

#[derive(Subcommand, Debug)]
pub enum CaseCommands {
    /// Element counts and graph statistics
    Stats {
        #[arg(long, value_hint = ValueHint::FilePath)]
        case: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DevicesCommands {
    /// Build the scheme and print its audit findings
    Validate {
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        case: Option<PathBuf>,
    },
    /// Table of devices in the scheme
    List {
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        case: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Ask one device whether it trips for a reading
    Decide {
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        case: Option<PathBuf>,
        /// Device id, e.g. 51_B4
        #[arg(long)]
        device: String,
        #[command(flatten)]
        reading: DecideReading,
    },
}

/// Exactly one kind of reading must be given.
#[derive(Args, Debug)]
#[group(required = true, multiple = true)]
pub struct DecideReading {
    /// Current magnitude in amperes
    #[arg(long, conflicts_with_all = ["primary", "voltage", "command"])]
    pub current: Option<f64>,
    /// Flow direction for a directional reading
    #[arg(long, requires = "current")]
    pub direction: Option<FlowDirection>,
    /// Differential primary-side current in amperes
    #[arg(long, requires = "secondary", conflicts_with_all = ["voltage", "command"])]
    pub primary: Option<f64>,
    /// Differential secondary-side current in amperes
    #[arg(long, requires = "primary")]
    pub secondary: Option<f64>,
    /// Voltage magnitude in per-unit
    #[arg(long, conflicts_with = "command")]
    pub voltage: Option<f64>,
    /// Breaker command
    #[arg(long, value_enum)]
    pub command: Option<BreakerCommand>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BreakerCommand {
    Open,
    Close,
}

#[derive(Subcommand, Debug)]
pub enum ScenariosCommands {
    /// Check a scenario set for duplicate ids, bad severities and unknown zones
    Validate {
        #[arg(long, value_hint = ValueHint::FilePath)]
        spec: PathBuf,
        /// Also check zones and scripted devices against this scheme
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
        #[arg(long, value_hint = ValueHint::FilePath)]
        case: Option<PathBuf>,
    },
    /// List resolved scenarios
    List {
        #[arg(long, value_hint = ValueHint::FilePath)]
        spec: PathBuf,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}
