// CLI module for audiotag
//
// Command-line front end over the library: argument parsing, command
// dispatch and output formatting.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config, OutputFormat};
pub use output::OutputFormatter;
