// CLI binary entry point for audiotag

mod cli;

use clap::Parser;
use std::process;

use cli::Config;

fn main() {
    let config = Config::parse();

    let default_filter = if config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli::commands::run(&config) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
