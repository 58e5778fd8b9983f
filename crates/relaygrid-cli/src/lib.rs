pub mod cli;
pub mod settings;

pub use cli::{
    CaseCommands, Cli, Commands, DecideReading, DevicesCommands, OutputFormat, ScenariosCommands,
};
pub use settings::RelaygridSettings;
