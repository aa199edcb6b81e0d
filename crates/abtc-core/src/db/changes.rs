//! Change log database operations.

use rusqlite::{params, Connection};
use serde::Serialize;

use super::{Database, DbError, DbResult};
use crate::models::{ChangeEvent, ChangeKind, ChangeTable};

/// Append a change row. Called inside the writer's transaction.
pub(crate) fn log_change<T: Serialize>(
    conn: &Connection,
    table: ChangeTable,
    kind: ChangeKind,
    row_id: &str,
    row: &T,
) -> DbResult<()> {
    let payload = serde_json::to_string(row)?;
    conn.execute(
        r#"
        INSERT INTO change_log (table_name, event, row_id, payload, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            table.as_str(),
            kind.as_str(),
            row_id,
            payload,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Changes logged after `seq`, oldest first.
    pub fn changes_since(&self, seq: i64) -> DbResult<Vec<ChangeEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, table_name, event, row_id, payload, created_at
            FROM change_log
            WHERE seq > ?
            ORDER BY seq
            "#,
        )?;

        let rows = stmt.query_map([seq], |row| {
            Ok(ChangeRow {
                seq: row.get(0)?,
                table_name: row.get(1)?,
                event: row.get(2)?,
                row_id: row.get(3)?,
                payload: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?.try_into()?);
        }
        Ok(events)
    }

    /// Highest logged sequence number (0 when the log is empty).
    pub fn latest_change_seq(&self) -> DbResult<i64> {
        let seq: Option<i64> = self
            .conn
            .query_row("SELECT MAX(seq) FROM change_log", [], |row| row.get(0))?;
        Ok(seq.unwrap_or(0))
    }
}

/// Intermediate row struct for database mapping.
struct ChangeRow {
    seq: i64,
    table_name: String,
    event: String,
    row_id: String,
    payload: String,
    created_at: String,
}

impl TryFrom<ChangeRow> for ChangeEvent {
    type Error = DbError;

    fn try_from(row: ChangeRow) -> Result<Self, Self::Error> {
        let table = ChangeTable::parse(&row.table_name)
            .ok_or_else(|| {
                DbError::Constraint(format!("Unknown change table: {}", row.table_name))
            })?;
        let kind = ChangeKind::parse(&row.event)
            .ok_or_else(|| DbError::Constraint(format!("Unknown change event: {}", row.event)))?;

        Ok(ChangeEvent {
            seq: row.seq,
            table,
            kind,
            row_id: row.row_id,
            payload: serde_json::from_str(&row.payload)?,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_and_read_back() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.latest_change_seq().unwrap(), 0);

        log_change(
            db.conn(),
            ChangeTable::Appointments,
            ChangeKind::Insert,
            "a1",
            &serde_json::json!({"status": "pending"}),
        )
        .unwrap();
        log_change(
            db.conn(),
            ChangeTable::Appointments,
            ChangeKind::Update,
            "a1",
            &serde_json::json!({"status": "confirmed"}),
        )
        .unwrap();

        let all = db.changes_since(0).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, ChangeKind::Insert);
        assert_eq!(all[1].column("status"), Some("confirmed"));

        let latest = db.latest_change_seq().unwrap();
        assert!(db.changes_since(latest).unwrap().is_empty());
    }
}
