mod cli;
mod coercer;
mod db;
mod error;
mod fmt;
mod importer;
mod loader;
mod logging;
mod maintenance;
mod mapper;
mod models;
mod secrets;
mod settings;
mod transport;
mod vendor;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Load => cli::load::run(),
        Commands::Recover => cli::recover::run(),
        Commands::Transport => cli::transport::run(),
        Commands::PruneLogs => cli::prune_logs::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
