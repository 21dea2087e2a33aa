use tracing::error;

use crate::error::Result;
use crate::logging;
use crate::maintenance::prune_logs;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings()?;
    let log_dir = settings.log_dir();
    let _guard = logging::init(&log_dir, "prune")?;

    let deleted = prune_logs(&[log_dir], settings.log_retention_days)
        .inspect_err(|e| error!("{e}"))?;
    println!(
        "{deleted} log file(s) older than {} days deleted",
        settings.log_retention_days
    );
    Ok(())
}
