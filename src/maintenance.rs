use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tracing::{error, info};

use crate::error::Result;

const SECONDS_PER_DAY: u64 = 24 * 3600;

/// Delete regular files last modified more than `retention_days` ago.
/// Missing directories and per-file failures are logged, not fatal.
pub fn prune_logs(dirs: &[PathBuf], retention_days: u64) -> Result<usize> {
    let cutoff = retention_days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|secs| SystemTime::now().checked_sub(Duration::from_secs(secs)))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted = 0usize;
    for dir in dirs {
        if !dir.exists() {
            info!("Folder does not exist: {}", dir.display());
            continue;
        }
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let Ok(meta) = std::fs::metadata(&path) else { continue };
            if !meta.is_file() {
                continue;
            }
            let Ok(modified) = meta.modified() else { continue };
            if modified >= cutoff {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!("Deleted file: {}", path.display());
                    deleted += 1;
                }
                Err(e) => error!("Error deleting file {}: {e}", path.display()),
            }
        }
    }
    Ok(deleted)
}
