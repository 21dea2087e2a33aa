use tracing::error;

use crate::error::Result;
use crate::logging;
use crate::settings::load_settings;
use crate::transport::collect_downloads;

pub fn run() -> Result<()> {
    let settings = load_settings()?;
    let _guard = logging::init(&settings.log_dir(), "move_files")?;

    let moved = collect_downloads(&settings).inspect_err(|e| error!("{e}"))?;
    println!("{moved} file(s) moved to {}", settings.source_dir().display());
    Ok(())
}
