use tracing::{error, info};

use crate::error::Result;
use crate::importer::{file_name_of, list_files, move_file};
use crate::settings::Settings;
use crate::vendor::classify;

/// Move recognized vendor exports from the downloads folder into the source folder.
/// Returns the number of files moved; individual failures are logged and skipped.
pub fn collect_downloads(settings: &Settings) -> Result<usize> {
    let downloads = settings.downloads_dir();
    let source_dir = settings.source_dir();
    std::fs::create_dir_all(&source_dir)?;

    let mut moved = 0usize;
    for path in list_files(&downloads, &settings.file_extension)? {
        let file_name = file_name_of(&path);
        if classify(&file_name).is_err() {
            continue;
        }
        match move_file(&path, &source_dir.join(&file_name)) {
            Ok(()) => {
                info!("Moved: {file_name}");
                moved += 1;
            }
            Err(e) => error!("Error moving {file_name}: {e}"),
        }
    }

    if moved == 0 {
        info!("No files to move.");
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_only_vendor_exports() {
        let dir = tempfile::tempdir().unwrap();
        let downloads = dir.path().join("Downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        for name in [
            "Apple Card Transactions.csv",
            "Discover-Statement.CSV",
            "EXPORT (3).csv",
            "EXPORT_notes.txt",
            "resume.csv",
        ] {
            std::fs::write(downloads.join(name), "x").unwrap();
        }
        let settings = Settings {
            data_dir: dir.path().join("data").to_string_lossy().to_string(),
            downloads_dir: Some(downloads.to_string_lossy().to_string()),
            ..Default::default()
        };

        assert_eq!(collect_downloads(&settings).unwrap(), 3);
        let source = settings.source_dir();
        assert!(source.join("Apple Card Transactions.csv").exists());
        assert!(source.join("Discover-Statement.CSV").exists());
        assert!(source.join("EXPORT (3).csv").exists());
        assert!(downloads.join("EXPORT_notes.txt").exists());
        assert!(downloads.join("resume.csv").exists());
        assert!(!downloads.join("EXPORT (3).csv").exists());
    }

    #[test]
    fn test_nothing_to_move() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().join("data").to_string_lossy().to_string(),
            downloads_dir: Some(dir.path().to_string_lossy().to_string()),
            ..Default::default()
        };
        assert_eq!(collect_downloads(&settings).unwrap(), 0);
    }
}
