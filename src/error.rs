use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Unrecognized source file: {0} (expected a name starting with 'Apple Card', 'Discover', or 'EXPORT')")]
    UnrecognizedSource(String),

    #[error("Sink connectivity error: {0}")]
    SinkConnectivity(String),

    #[error("Sink write error: {0}")]
    SinkWrite(String),

    #[error("Failed to archive {file}: {source}")]
    ArchiveMove {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Secret error: {0}")]
    Secret(String),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, LoaderError>;
