//! Vaccine catalog database operations.

use rusqlite::{params, Row};

use super::{Database, DbError, DbResult};
use crate::models::{TreatmentKind, VaccineItem};

impl Database {
    /// Add or update a catalog item.
    pub fn upsert_vaccine(&self, item: &VaccineItem) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO vaccines (vaccine_id, name, kind, stock, active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(vaccine_id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                stock = excluded.stock,
                active = excluded.active
            "#,
            params![item.vaccine_id, item.name, item.kind.as_str(), item.stock, item.active],
        )?;
        Ok(())
    }

    /// List catalog items by name.
    pub fn list_vaccines(&self, active_only: bool) -> DbResult<Vec<VaccineItem>> {
        let sql = if active_only {
            "SELECT vaccine_id, name, kind, stock, active FROM vaccines WHERE active = 1 ORDER BY name"
        } else {
            "SELECT vaccine_id, name, kind, stock, active FROM vaccines ORDER BY name"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], vaccine_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?.try_into()?);
        }
        Ok(items)
    }

    /// Add `delta` vials (negative to consume). Fails if stock would go below zero.
    pub fn adjust_vaccine_stock(&self, vaccine_id: &str, delta: i64) -> DbResult<u32> {
        let result = self.conn.query_row(
            "UPDATE vaccines SET stock = stock + ?1 WHERE vaccine_id = ?2 RETURNING stock",
            params![delta, vaccine_id],
            |row| row.get::<_, u32>(0),
        );

        match result {
            Ok(stock) => Ok(stock),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(DbError::NotFound(format!("vaccine {}", vaccine_id)))
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(DbError::Constraint(format!(
                    "insufficient stock for vaccine {}",
                    vaccine_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Intermediate row struct for database mapping.
struct VaccineRow {
    vaccine_id: String,
    name: String,
    kind: String,
    stock: u32,
    active: bool,
}

fn vaccine_row(row: &Row<'_>) -> rusqlite::Result<VaccineRow> {
    Ok(VaccineRow {
        vaccine_id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        stock: row.get(3)?,
        active: row.get(4)?,
    })
}

impl TryFrom<VaccineRow> for VaccineItem {
    type Error = DbError;

    fn try_from(row: VaccineRow) -> Result<Self, Self::Error> {
        let kind = TreatmentKind::parse(&row.kind)
            .ok_or_else(|| DbError::Constraint(format!("Unknown vaccine kind: {}", row.kind)))?;
        Ok(VaccineItem {
            vaccine_id: row.vaccine_id,
            name: row.name,
            kind,
            stock: row.stock,
            active: row.active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_list() {
        let db = Database::open_in_memory().unwrap();
        let mut verorab = VaccineItem::new("Verorab".into(), TreatmentKind::Pvrv);
        verorab.stock = 20;
        let mut old = VaccineItem::new("Old Stock".into(), TreatmentKind::Pcecv);
        old.active = false;
        db.upsert_vaccine(&verorab).unwrap();
        db.upsert_vaccine(&old).unwrap();

        assert_eq!(db.list_vaccines(true).unwrap().len(), 1);
        assert_eq!(db.list_vaccines(false).unwrap().len(), 2);

        verorab.stock = 25;
        db.upsert_vaccine(&verorab).unwrap();
        let active = db.list_vaccines(true).unwrap();
        assert_eq!(active[0].stock, 25);
    }

    #[test]
    fn test_adjust_stock() {
        let db = Database::open_in_memory().unwrap();
        let mut rabipur = VaccineItem::new("Rabipur".into(), TreatmentKind::Pcecv);
        rabipur.stock = 2;
        db.upsert_vaccine(&rabipur).unwrap();

        assert_eq!(db.adjust_vaccine_stock(&rabipur.vaccine_id, -2).unwrap(), 0);
        let result = db.adjust_vaccine_stock(&rabipur.vaccine_id, -1);
        assert!(matches!(result, Err(DbError::Constraint(_))));
        assert_eq!(db.adjust_vaccine_stock(&rabipur.vaccine_id, 10).unwrap(), 10);

        let missing = db.adjust_vaccine_stock("missing", 1);
        assert!(matches!(missing, Err(DbError::NotFound(_))));
    }
}
