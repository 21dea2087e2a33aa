use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::coercer::{coerce_rows, CoercedBatch, CoercionStats};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::mapper::map_rows;
use crate::models::{RawRow, TransactionRecord};
use crate::settings::Settings;
use crate::vendor::{classify, VendorProfile};

// ---------------------------------------------------------------------------
// File discovery and moves
// ---------------------------------------------------------------------------

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
}

/// Regular files in `dir` with the given extension (case-insensitive), sorted by name.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extension) {
            files.push(path);
        }
    }
    files.sort_by_key(|p| file_name_of(p));
    Ok(files)
}

/// Rename, falling back to copy + delete when the target is on another filesystem.
pub fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
    }
}

// ---------------------------------------------------------------------------
// CSV reading
// ---------------------------------------------------------------------------

/// Pairs every data row with the header row. Short rows simply lack the
/// trailing columns; cells beyond the header are ignored.
pub struct RowReader<R: Read> {
    rdr: csv::Reader<R>,
    headers: csv::StringRecord,
}

impl<R: Read> RowReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        Ok(Self { rdr, headers })
    }

    /// Up to `limit` rows; an empty result means the input is exhausted.
    pub fn next_chunk(&mut self, limit: usize) -> Result<Vec<RawRow>> {
        let mut rows = Vec::new();
        let mut record = csv::StringRecord::new();
        while rows.len() < limit && self.rdr.read_record(&mut record)? {
            rows.push(
                self.headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.to_string(), v.to_string()))
                    .collect(),
            );
        }
        Ok(rows)
    }

    pub fn read_all(&mut self) -> Result<Vec<RawRow>> {
        self.next_chunk(usize::MAX)
    }
}

pub fn open_rows(path: &Path) -> Result<RowReader<BufReader<File>>> {
    let file = File::open(path)?;
    RowReader::new(BufReader::new(file))
}

// ---------------------------------------------------------------------------
// Per-file pipeline
// ---------------------------------------------------------------------------

/// classify → map → coerce for one set of rows.
pub fn normalize(rows: &[RawRow], profile: VendorProfile) -> CoercedBatch {
    coerce_rows(&map_rows(rows, profile), profile)
}

#[derive(Debug, Clone)]
pub struct FileBatch {
    pub file_name: String,
    pub path: PathBuf,
    pub profile: VendorProfile,
    pub records: Vec<TransactionRecord>,
    pub stats: CoercionStats,
}

pub fn process_file(path: &Path, settings: &Settings) -> Result<FileBatch> {
    let file_name = file_name_of(path);
    let profile = classify(&file_name)?;
    let size = std::fs::metadata(path)?.len();
    let mut reader = open_rows(path)?;

    let batch = if size > settings.large_file_threshold {
        info!(
            "File {file_name} is large ({}), processing in chunks.",
            format_bytes(size)
        );
        let chunk_size = settings.csv_chunk_size.max(1);
        let mut batch = CoercedBatch::default();
        loop {
            let chunk = reader.next_chunk(chunk_size)?;
            if chunk.is_empty() {
                break;
            }
            let part = normalize(&chunk, profile);
            batch.records.extend(part.records);
            batch.stats.merge(&part.stats);
        }
        batch
    } else {
        normalize(&reader.read_all()?, profile)
    };

    if batch.stats.defaulted_fields() > 0 {
        warn!(
            "{file_name}: {} field(s) could not be parsed and were defaulted \
             (transaction dates: {}, clearing dates: {}, amounts: {})",
            batch.stats.defaulted_fields(),
            batch.stats.transaction_dates_defaulted,
            batch.stats.clearing_dates_defaulted,
            batch.stats.amounts_defaulted,
        );
    }
    if batch.stats.amounts_clamped > 0 {
        warn!(
            "{file_name}: {} amount(s) out of range were clamped",
            batch.stats.amounts_clamped
        );
    }
    info!("Processed {file_name} with {} rows.", batch.records.len());

    Ok(FileBatch {
        file_name,
        path: path.to_path_buf(),
        profile,
        records: batch.records,
        stats: batch.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoaderError;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_apple_card_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "Apple Card statement.csv",
            "Transaction Date,Clearing Date,Description,Category,Amount (USD)\n\
             01/05/2023,01/07/2023,MCDONALD'S,Food,12.50\n",
        );
        let batch = process_file(&path, &Settings::default()).unwrap();
        assert_eq!(batch.profile, VendorProfile::AppleCard);
        assert_eq!(batch.records.len(), 1);
        let r = &batch.records[0];
        assert_eq!(r.transaction_date, NaiveDate::from_ymd_opt(2023, 1, 5));
        assert_eq!(r.clearing_date, NaiveDate::from_ymd_opt(2023, 1, 7));
        assert_eq!(r.description.as_deref(), Some("MCDONALD'S"));
        assert_eq!(r.category.as_deref(), Some("Food"));
        assert_eq!(r.amount, Decimal::from_str("12.50").unwrap());
        assert_eq!(r.source.label(), "Apple Card");
    }

    #[test]
    fn test_bank_export_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "EXPORT_march.csv",
            "Date,Description,Amount\n03/10/2023,GROCERY,45.00\n",
        );
        let batch = process_file(&path, &Settings::default()).unwrap();
        let r = &batch.records[0];
        assert_eq!(r.transaction_date, NaiveDate::from_ymd_opt(2023, 3, 10));
        assert_eq!(r.clearing_date, None);
        assert_eq!(r.description.as_deref(), Some("GROCERY"));
        assert_eq!(r.category, None);
        assert_eq!(r.amount, Decimal::from_str("45.00").unwrap());
        assert_eq!(r.source.label(), "5/3 Bank");
    }

    #[test]
    fn test_non_numeric_amount_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "Discover-2023.csv",
            "Trans. Date,Post Date,Description,Amount,Category\n\
             02/01/2023,02/02/2023,MYSTERY,N/A,Misc\n",
        );
        let batch = process_file(&path, &Settings::default()).unwrap();
        assert_eq!(batch.records[0].amount, Decimal::ZERO);
        assert_eq!(batch.stats.amounts_defaulted, 1);
    }

    #[test]
    fn test_unrecognized_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "Unknown Bank.csv", "Date,Amount\n01/01/2023,1\n");
        let err = process_file(&path, &Settings::default()).unwrap_err();
        assert!(matches!(err, LoaderError::UnrecognizedSource(_)));
    }

    #[test]
    fn test_header_only_file_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "EXPORT.csv", "Date,Description,Amount\n");
        let batch = process_file(&path, &Settings::default()).unwrap();
        assert!(batch.records.is_empty());
    }

    #[test]
    fn test_ragged_rows_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "EXPORT.csv",
            "Date,Description,Amount\n03/10/2023,SHORT\n03/11/2023,LONG,1.00,extra\n",
        );
        let batch = process_file(&path, &Settings::default()).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].amount, Decimal::ZERO);
        assert_eq!(batch.records[1].amount, Decimal::ONE);
    }

    #[test]
    fn test_chunked_processing_matches_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = String::from("Date,Description,Amount\n");
        for i in 1..=25 {
            content.push_str(&format!("03/{:02}/2023,ROW {i},{i}.00\n", (i % 28) + 1));
        }
        let path = write(dir.path(), "EXPORT_big.csv", &content);

        let whole = process_file(&path, &Settings::default()).unwrap();
        let chunked_settings = Settings {
            large_file_threshold: 0,
            csv_chunk_size: 7,
            ..Default::default()
        };
        let chunked = process_file(&path, &chunked_settings).unwrap();
        assert_eq!(whole.records, chunked.records);
        assert_eq!(whole.stats, chunked.stats);
        assert_eq!(chunked.records.len(), 25);
    }

    #[test]
    fn test_list_files_filters_extension_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.CSV", "");
        write(dir.path(), "a.csv", "");
        write(dir.path(), "notes.txt", "");
        std::fs::create_dir(dir.path().join("Archive.csv")).unwrap();
        let names: Vec<String> = list_files(dir.path(), "csv")
            .unwrap()
            .iter()
            .map(|p| file_name_of(p))
            .collect();
        assert_eq!(names, ["a.csv", "b.CSV"]);
    }

    #[test]
    fn test_move_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = write(dir.path(), "x.csv", "data");
        let to = dir.path().join("moved.csv");
        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "data");
    }
}
