//! Database layer for the clinic store.
//!
//! SQLite plays the part of the hosted table store: appointments,
//! treatment records, staff profiles, the vaccine catalog and patient
//! groups, plus a change log that feeds realtime subscriptions.

mod schema;
mod appointments;
mod changes;
mod groups;
mod staff;
mod treatments;
mod vaccines;

pub use schema::*;
pub use appointments::*;
#[allow(unused_imports)]
pub use changes::*;
#[allow(unused_imports)]
pub use groups::*;
#[allow(unused_imports)]
pub use staff::*;
#[allow(unused_imports)]
pub use treatments::*;
#[allow(unused_imports)]
pub use vaccines::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Write conflict: {0}")]
    Conflict(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, serde::Serialize, PartialEq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub page: usize,
    /// Requested page size
    pub page_size: usize,
    /// Matching rows across all pages
    pub total: usize,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` rows (at least one).
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 1;
        }
        self.total.div_ceil(self.page_size).max(1)
    }

    /// Whether a following page exists.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_open_on_disk_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.sqlite3");

        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO appointments (appointment_id, patient_name) VALUES ('a1', 'Ana')",
                    [],
                )
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "appointments",
            "treatment_records",
            "staff_profiles",
            "vaccines",
            "patient_groups",
            "group_members",
            "group_files",
            "change_log",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn test_page_math() {
        let page: Page<u8> = Page {
            items: vec![],
            page: 1,
            page_size: 10,
            total: 21,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let empty: Page<u8> = Page {
            items: vec![],
            page: 1,
            page_size: 10,
            total: 0,
        };
        assert_eq!(empty.total_pages(), 1);
        assert!(!empty.has_next());
    }
}
