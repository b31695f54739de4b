pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, InstallArgs, TargetArgs};
pub use output::{OutputFormat, OutputFormatter};
