use clap::Parser;
use relaygrid_cli::cli::{CaseCommands, Cli, Commands, DevicesCommands, ScenariosCommands};
use relaygrid_cli::settings::{load_settings, RelaygridSettings};
use tracing::debug;

mod commands;
mod logging;

use commands::coordinate::CoordinateArgs;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(cli.settings.as_deref())?;
    let level = match cli.log_level {
        Some(level) => level,
        None => settings.log_level()?,
    };
    logging::init(level)?;
    debug!(?settings, "loaded settings");

    match &cli.command {
        Commands::Case { command } => match command {
            CaseCommands::Stats { case } => commands::case::stats(case.as_deref()),
        },
        Commands::Devices { command } => match command {
            DevicesCommands::Validate { config, case } => {
                commands::devices::validate(config, case.as_deref())
            }
            DevicesCommands::List {
                config,
                case,
                format,
            } => commands::devices::list(
                config,
                case.as_deref(),
                format.unwrap_or(settings.output.format),
            ),
            DevicesCommands::Decide {
                config,
                case,
                device,
                reading,
            } => commands::devices::decide(config, case.as_deref(), device, reading),
        },
        Commands::Scenarios { command } => match command {
            ScenariosCommands::Validate { spec, config, case } => {
                commands::scenarios::validate(spec, config.as_deref(), case.as_deref())
            }
            ScenariosCommands::List { spec, format } => {
                commands::scenarios::list(spec, format.unwrap_or(settings.output.format))
            }
        },
        Commands::Coordinate {
            config,
            scenarios,
            case,
            margin,
            format,
            threads,
            strict,
        } => {
            commands::configure_threads(
                threads
                    .as_deref()
                    .unwrap_or(settings.coordination.threads.as_str()),
            );
            commands::coordinate::handle(&CoordinateArgs {
                config,
                scenarios,
                case: case.as_deref(),
                margin: *margin,
                base_current: settings.coordination.base_current_a,
                format: format.unwrap_or(settings.output.format),
                strict: *strict,
            })
        }
        Commands::Settings => print_settings(&settings),
    }
}

fn print_settings(settings: &RelaygridSettings) -> anyhow::Result<()> {
    let text = toml::to_string_pretty(settings)?;
    print!("{text}");
    Ok(())
}
