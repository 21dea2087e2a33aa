use std::path::PathBuf;

use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::coercer::CoercionStats;
use crate::db::SinkConnector;
use crate::error::{LoaderError, Result};
use crate::fmt::money;
use crate::importer::{file_name_of, list_files, move_file, process_file, FileBatch};
use crate::models::TransactionRecord;
use crate::settings::Settings;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files_found: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_archived: usize,
    pub archive_failures: usize,
    pub rows_inserted: usize,
    /// `None` when the sum leaves `Decimal`'s range.
    pub total_amount: Option<Decimal>,
    pub stats: CoercionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub files_found: usize,
    pub files_replayed: usize,
    pub files_failed: usize,
    pub rows_inserted: usize,
}

fn checked_total(records: &[TransactionRecord]) -> Option<Decimal> {
    records
        .iter()
        .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.amount))
}

/// Batch orchestration: parallel per-file normalization, one serialized sink
/// write, then archiving.
pub struct Loader<C: SinkConnector> {
    settings: Settings,
    connector: C,
}

impl<C: SinkConnector> Loader<C> {
    pub fn new(settings: Settings, connector: C) -> Self {
        Self {
            settings,
            connector,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Normalize every file on a worker pool. Results come back in input order;
    /// a failed file is logged and left out.
    fn process_all(&self, files: &[PathBuf]) -> Result<Vec<FileBatch>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.worker_threads)
            .build()?;
        let settings = &self.settings;
        let results: Vec<Result<FileBatch>> =
            pool.install(|| files.par_iter().map(|p| process_file(p, settings)).collect());

        let mut batches = Vec::with_capacity(results.len());
        for (path, result) in files.iter().zip(results) {
            match result {
                Ok(batch) => {
                    debug!("{} read as {}", batch.file_name, batch.profile.label());
                    batches.push(batch);
                }
                Err(e) => error!("Error processing file {}: {e}", file_name_of(path)),
            }
        }
        Ok(batches)
    }

    pub fn run(&self) -> Result<LoadReport> {
        let source_dir = self.settings.source_dir();
        let archive_dir = self.settings.archive_dir();
        std::fs::create_dir_all(&source_dir)?;
        std::fs::create_dir_all(&archive_dir)?;

        let files = list_files(&source_dir, &self.settings.file_extension)?;
        let mut report = LoadReport {
            files_found: files.len(),
            total_amount: Some(Decimal::ZERO),
            ..Default::default()
        };
        if files.is_empty() {
            info!("No CSV files found for processing in {}.", source_dir.display());
            return Ok(report);
        }

        let mut sink = self.connector.connect().inspect_err(|e| {
            error!("Failed to retrieve secrets or connect to the database: {e}");
        })?;

        let batches = self.process_all(&files)?;
        report.files_processed = batches.len();
        report.files_skipped = files.len() - batches.len();
        if batches.is_empty() {
            info!("No files processed successfully.");
            return Ok(report);
        }

        let records: Vec<TransactionRecord> = batches
            .iter()
            .flat_map(|b| b.records.iter().cloned())
            .collect();
        for batch in &batches {
            report.stats.merge(&batch.stats);
        }
        report.total_amount = checked_total(&records);
        if report.total_amount.is_none() {
            warn!("Batch total is outside the representable amount range; not reported.");
        }

        report.rows_inserted = sink.insert_batch(&records).inspect_err(|e| {
            error!("Critical failure during batch insertion: {e}");
        })?;
        info!(
            "Inserted {} rows ({}) from {} files into BudgetTracker.",
            report.rows_inserted,
            report.total_amount.map_or_else(|| "total out of range".to_string(), money),
            batches.len()
        );

        for batch in &batches {
            let dest = archive_dir.join(&batch.file_name);
            match move_file(&batch.path, &dest) {
                Ok(()) => {
                    info!("Archived file: {}", batch.file_name);
                    report.files_archived += 1;
                }
                Err(source) => {
                    let e = LoaderError::ArchiveMove {
                        file: batch.file_name.clone(),
                        source,
                    };
                    // The rows are already committed; a rerun will insert them again.
                    error!("{e}");
                    report.archive_failures += 1;
                }
            }
        }

        Ok(report)
    }

    /// Replay every archived file, oldest name first, committing per file.
    /// Nothing is moved.
    pub fn recover(&self) -> Result<RecoveryReport> {
        let archive_dir = self.settings.archive_dir();
        if !archive_dir.is_dir() {
            info!("Archive folder {} does not exist; nothing to recover.", archive_dir.display());
            return Ok(RecoveryReport::default());
        }
        let files = list_files(&archive_dir, &self.settings.file_extension)?;
        let mut report = RecoveryReport {
            files_found: files.len(),
            ..Default::default()
        };
        if files.is_empty() {
            info!("No archived CSV files found for recovery.");
            return Ok(report);
        }

        let mut sink = self.connector.connect().inspect_err(|e| {
            error!("Database connection error during recovery: {e}");
        })?;
        info!("Database connection established successfully for recovery.");

        for path in &files {
            let file_name = file_name_of(path);
            let outcome = process_file(path, &self.settings)
                .and_then(|batch| sink.insert_batch(&batch.records));
            match outcome {
                Ok(n) => {
                    info!("Inserted {n} rows from {file_name} into BudgetTracker.");
                    report.files_replayed += 1;
                    report.rows_inserted += n;
                }
                Err(e) => {
                    error!("Error processing archived file {file_name}: {e}");
                    report.files_failed += 1;
                }
            }
        }

        if report.files_failed > 0 {
            warn!("{} archived file(s) could not be replayed.", report.files_failed);
        }
        Ok(report)
    }
}
