use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::error::{LoaderError, Result};
use crate::models::{Column, TransactionRecord};
use crate::secrets::{connection_params, ConnectionParams, SecretProvider};
use crate::settings::Settings;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS BudgetTracker (
    id INTEGER PRIMARY KEY,
    TransactionDate TEXT,
    ClearingDate TEXT,
    Description TEXT,
    Category TEXT,
    Amount NUMERIC NOT NULL,
    Source TEXT NOT NULL
);
";

/// Destination for normalized records. One call is one commit.
pub trait Sink {
    fn insert_batch(&mut self, records: &[TransactionRecord]) -> Result<usize>;
}

pub trait SinkConnector {
    fn connect(&self) -> Result<Box<dyn Sink>>;
}

pub fn insert_sql() -> String {
    let columns: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO BudgetTracker ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

pub fn get_connection(db_path: &Path, key: Option<&str>) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    if let Some(key) = key {
        apply_key(&conn, key)?;
    }
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

#[cfg(feature = "sqlcipher")]
fn apply_key(conn: &Connection, key: &str) -> Result<()> {
    conn.pragma_update(None, "key", key)?;
    Ok(())
}

#[cfg(not(feature = "sqlcipher"))]
fn apply_key(_conn: &Connection, _key: &str) -> Result<()> {
    tracing::warn!("database key ignored: built without the sqlcipher feature");
    Ok(())
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open(params: &ConnectionParams) -> Result<Self> {
        if let Some(parent) = params.database.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = get_connection(&params.database, params.key.as_deref())?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn })
    }
}

#[cfg(test)]
impl SqliteSink {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn sink_write(e: rusqlite::Error) -> LoaderError {
    LoaderError::SinkWrite(e.to_string())
}

impl Sink for SqliteSink {
    fn insert_batch(&mut self, records: &[TransactionRecord]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(sink_write)?;
        {
            let mut stmt = tx.prepare_cached(&insert_sql()).map_err(sink_write)?;
            for record in records {
                stmt.execute(rusqlite::params_from_iter(record.as_row()))
                    .map_err(sink_write)?;
            }
        }
        tx.commit().map_err(sink_write)?;
        Ok(records.len())
    }
}

/// Resolves connection parameters from the secret provider on every connect.
pub struct SqliteConnector {
    secrets: Box<dyn SecretProvider>,
    database_secret: String,
    password_secret: String,
}

impl SqliteConnector {
    pub fn new(secrets: Box<dyn SecretProvider>, settings: &Settings) -> Self {
        Self {
            secrets,
            database_secret: settings.database_secret.clone(),
            password_secret: settings.password_secret.clone(),
        }
    }
}

impl SinkConnector for SqliteConnector {
    fn connect(&self) -> Result<Box<dyn Sink>> {
        let params = connection_params(
            self.secrets.as_ref(),
            &self.database_secret,
            &self.password_secret,
        )?;
        let sink = SqliteSink::open(&params).map_err(|e| {
            LoaderError::SinkConnectivity(format!("{}: {e}", params.database.display()))
        })?;
        info!("Database connection established: {}", params.database.display());
        Ok(Box::new(sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::testing::StaticSecrets;
    use crate::vendor::VendorProfile;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn test_sink() -> (tempfile::TempDir, SqliteSink) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db"), None).unwrap();
        (dir, SqliteSink::from_connection(conn).unwrap())
    }

    fn record(desc: &str, amount: &str) -> TransactionRecord {
        TransactionRecord {
            transaction_date: NaiveDate::from_ymd_opt(2023, 3, 10),
            clearing_date: None,
            description: Some(desc.to_string()),
            category: None,
            amount: Decimal::from_str(amount).unwrap(),
            source: VendorProfile::FifthThirdBank,
        }
    }

    #[test]
    fn test_insert_sql_uses_canonical_order() {
        assert_eq!(
            insert_sql(),
            "INSERT INTO BudgetTracker (TransactionDate, ClearingDate, Description, Category, Amount, Source) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        );
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, sink) = test_sink();
        init_db(sink.connection()).unwrap();
    }

    #[test]
    fn test_schema_columns() {
        let (_dir, sink) = test_sink();
        let mut stmt = sink
            .connection()
            .prepare("SELECT name FROM pragma_table_info('BudgetTracker') ORDER BY cid")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        let mut expected = vec!["id"];
        expected.extend(Column::ALL.iter().map(|c| c.name()));
        assert_eq!(names, expected);
    }

    #[cfg(feature = "sqlcipher")]
    #[test]
    fn test_keyed_database_needs_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.db");
        {
            let conn = get_connection(&path, Some("hunter2")).unwrap();
            let mut sink = SqliteSink::from_connection(conn).unwrap();
            sink.insert_batch(&[record("LOCKED", "9.99")]).unwrap();
        }

        let conn = get_connection(&path, Some("hunter2")).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM BudgetTracker", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let plain = Connection::open(&path).unwrap();
        assert!(plain
            .query_row("SELECT count(*) FROM BudgetTracker", [], |r| r.get::<_, i64>(0))
            .is_err());
    }

    #[cfg(not(feature = "sqlcipher"))]
    #[test]
    fn test_key_is_ignored_without_sqlcipher() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.db");
        let conn = get_connection(&path, Some("hunter2")).unwrap();
        let mut sink = SqliteSink::from_connection(conn).unwrap();
        sink.insert_batch(&[record("OPEN", "1.00")]).unwrap();

        let plain = Connection::open(&path).unwrap();
        let count: i64 = plain
            .query_row("SELECT count(*) FROM BudgetTracker", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_insert_batch_writes_all_rows() {
        let (_dir, mut sink) = test_sink();
        let n = sink
            .insert_batch(&[record("GROCERY", "45.00"), record("REFUND", "-5.25")])
            .unwrap();
        assert_eq!(n, 2);

        let conn = sink.connection();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM BudgetTracker", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let (date, clearing, source, amount): (String, Option<String>, String, f64) = conn
            .query_row(
                "SELECT TransactionDate, ClearingDate, Source, Amount FROM BudgetTracker WHERE Description = 'REFUND'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!(date, "2023-03-10");
        assert_eq!(clearing, None);
        assert_eq!(source, "5/3 Bank");
        assert_eq!(amount, -5.25);
    }

    #[test]
    fn test_insert_batch_does_not_dedupe() {
        let (_dir, mut sink) = test_sink();
        sink.insert_batch(&[record("SAME", "1.00")]).unwrap();
        sink.insert_batch(&[record("SAME", "1.00")]).unwrap();
        let count: i64 = sink
            .connection()
            .query_row("SELECT count(*) FROM BudgetTracker", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let (_dir, mut sink) = test_sink();
        sink.connection()
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON BudgetTracker \
                 WHEN NEW.Description = 'BAD' BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        let err = sink
            .insert_batch(&[record("GOOD", "1.00"), record("BAD", "2.00")])
            .unwrap_err();
        assert!(matches!(err, LoaderError::SinkWrite(_)));
        let count: i64 = sink
            .connection()
            .query_row("SELECT count(*) FROM BudgetTracker", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_connector_opens_database_from_secret() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("budget.db");
        let secrets = StaticSecrets::with(&[("sql-database", db_path.to_str().unwrap())]);
        let connector = SqliteConnector::new(Box::new(secrets), &Settings::default());
        let mut sink = connector.connect().unwrap();
        sink.insert_batch(&[record("X", "3")]).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_connector_without_secret_fails() {
        let connector = SqliteConnector::new(Box::new(StaticSecrets::default()), &Settings::default());
        assert!(matches!(connector.connect(), Err(LoaderError::SinkConnectivity(_))));
    }
}
