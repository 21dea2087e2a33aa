pub mod load;
pub mod prune_logs;
pub mod recover;
pub mod transport;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "budget",
    about = "Load credit-card and bank CSV exports into the BudgetTracker table."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize every CSV in the source folder, insert in one batch, and archive the files.
    Load,
    /// Replay every archived CSV into the table (disaster recovery). Nothing is moved.
    Recover,
    /// Move vendor exports from the downloads folder into the source folder.
    Transport,
    /// Delete log files older than the retention window.
    PruneLogs,
}
