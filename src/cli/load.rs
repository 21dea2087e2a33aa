use tracing::error;

use crate::db::SqliteConnector;
use crate::error::Result;
use crate::fmt::money;
use crate::loader::Loader;
use crate::logging;
use crate::secrets;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings()?;
    let _guard = logging::init(&settings.log_dir(), "process")?;

    let connector = SqliteConnector::new(secrets::from_settings(&settings)?, &settings);
    let loader = Loader::new(settings, connector);
    let report = loader.run().inspect_err(|e| error!("{e}"))?;

    println!(
        "{} files found, {} loaded, {} skipped, {} archived; {} rows inserted ({})",
        report.files_found,
        report.files_processed,
        report.files_skipped,
        report.files_archived,
        report.rows_inserted,
        report
            .total_amount
            .map_or_else(|| "total out of range".to_string(), money)
    );
    if report.stats.defaulted_fields() > 0 {
        println!("{} field(s) defaulted during parsing", report.stats.defaulted_fields());
    }
    if report.stats.amounts_clamped > 0 {
        println!("{} amount(s) out of range were clamped", report.stats.amounts_clamped);
    }
    if report.archive_failures > 0 {
        println!(
            "{} file(s) were loaded but could not be archived; remove them from {} before the next run",
            report.archive_failures,
            loader.settings().source_dir().display()
        );
    }
    Ok(())
}
