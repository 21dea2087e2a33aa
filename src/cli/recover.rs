use tracing::error;

use crate::db::SqliteConnector;
use crate::error::Result;
use crate::loader::Loader;
use crate::logging;
use crate::secrets;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings()?;
    let _guard = logging::init(&settings.log_dir(), "recovery")?;

    let connector = SqliteConnector::new(secrets::from_settings(&settings)?, &settings);
    let report = Loader::new(settings, connector)
        .recover()
        .inspect_err(|e| error!("{e}"))?;

    println!(
        "{} of {} archived files replayed, {} failed; {} rows inserted",
        report.files_replayed, report.files_found, report.files_failed, report.rows_inserted
    );
    Ok(())
}
