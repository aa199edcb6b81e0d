//! Appointment database operations.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::changes::log_change;
use super::{Database, DbError, DbResult, Page};
use crate::models::{
    Appointment, AppointmentStatus, BiteIncident, ChangeKind, ChangeTable, PatientInfo,
};

const APPOINTMENT_COLUMNS: &str = r#"
    appointment_id, patient_name, age, sex, contact_number, email, address,
    patient_barangay, biting_animal, bite_site, bite_date, bite_time,
    bite_barangay, preferred_date, status, created_at, updated_at
"#;

/// Row-level filter for appointment listings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentQuery {
    /// Only this status
    pub status: Option<AppointmentStatus>,
    /// Only this barangay (incident or residence, case-insensitive)
    pub barangay: Option<String>,
    /// Substring match on patient name or contact number
    pub search: Option<String>,
    /// Preferred (or booking) date on or after
    pub from: Option<NaiveDate>,
    /// Preferred (or booking) date on or before
    pub to: Option<NaiveDate>,
    /// 1-based page number
    pub page: usize,
    /// Rows per page
    pub page_size: usize,
}

impl Default for AppointmentQuery {
    fn default() -> Self {
        Self {
            status: None,
            barangay: None,
            search: None,
            from: None,
            to: None,
            page: 1,
            page_size: 10,
        }
    }
}

impl AppointmentQuery {
    /// Query for all appointments with the given status.
    pub fn with_status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Build the WHERE clause and its bound values.
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(status) = self.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(barangay) = self.barangay.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            clauses.push("(LOWER(TRIM(bite_barangay)) = ? OR LOWER(TRIM(patient_barangay)) = ?)");
            let folded = barangay.to_lowercase();
            values.push(Value::Text(folded.clone()));
            values.push(Value::Text(folded));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            clauses.push(
                "(patient_name LIKE ? ESCAPE '\\' OR contact_number LIKE ? ESCAPE '\\')",
            );
            let pattern = format!("%{}%", escape_like(search));
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }
        if let Some(from) = self.from {
            clauses.push("COALESCE(preferred_date, substr(created_at, 1, 10)) >= ?");
            values.push(Value::Text(from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            clauses.push("COALESCE(preferred_date, substr(created_at, 1, 10)) <= ?");
            values.push(Value::Text(to.format("%Y-%m-%d").to_string()));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!("WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

/// Escape LIKE wildcards so the search matches them literally.
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Database {
    /// Insert a new appointment (patient booking).
    pub fn insert_appointment(&self, appt: &Appointment) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO appointments (
                appointment_id, patient_name, age, sex, contact_number, email,
                address, patient_barangay, biting_animal, bite_site, bite_date,
                bite_time, bite_barangay, preferred_date, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                appt.appointment_id,
                appt.patient.name,
                appt.patient.age,
                appt.patient.sex,
                appt.patient.contact_number,
                appt.patient.email,
                appt.patient.address,
                appt.patient.barangay,
                appt.bite.biting_animal,
                appt.bite.bite_site,
                appt.bite.bite_date,
                appt.bite.bite_time,
                appt.bite.barangay,
                appt.preferred_date,
                appt.status.as_str(),
                appt.created_at,
                appt.updated_at,
            ],
        )?;
        log_change(
            &tx,
            ChangeTable::Appointments,
            ChangeKind::Insert,
            &appt.appointment_id,
            appt,
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Get an appointment by ID.
    pub fn get_appointment(&self, appointment_id: &str) -> DbResult<Option<Appointment>> {
        let sql = format!(
            "SELECT {} FROM appointments WHERE appointment_id = ?",
            APPOINTMENT_COLUMNS
        );
        self.conn
            .query_row(&sql, [appointment_id], appointment_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List one page of appointments matching the query, newest first.
    pub fn list_appointments(&self, query: &AppointmentQuery) -> DbResult<Page<Appointment>> {
        let (where_sql, mut values) = query.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM appointments {}", where_sql);
        let total: i64 = self
            .conn
            .query_row(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?;

        let page = query.page.max(1);
        let page_size = query.page_size.max(1);
        values.push(Value::Integer(page_size as i64));
        values.push(Value::Integer(((page - 1) * page_size) as i64));

        let sql = format!(
            "SELECT {} FROM appointments {} ORDER BY created_at DESC, appointment_id LIMIT ? OFFSET ?",
            APPOINTMENT_COLUMNS, where_sql
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), appointment_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?.try_into()?);
        }

        Ok(Page {
            items,
            page,
            page_size,
            total: total as usize,
        })
    }

    /// List every appointment (analytics and map views), oldest first.
    pub fn list_all_appointments(&self) -> DbResult<Vec<Appointment>> {
        let sql = format!(
            "SELECT {} FROM appointments ORDER BY created_at",
            APPOINTMENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], appointment_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?.try_into()?);
        }
        Ok(items)
    }

    /// Count appointments per status (dashboard tiles).
    pub fn count_appointments_by_status(&self) -> DbResult<HashMap<AppointmentStatus, usize>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM appointments GROUP BY status")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut counts: HashMap<AppointmentStatus, usize> =
            AppointmentStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for row in rows {
            let (status, count) = row?;
            let status = AppointmentStatus::parse(&status)
                .ok_or_else(|| {
                    DbError::Constraint(format!("Unknown appointment status: {}", status))
                })?;
            counts.insert(status, count as usize);
        }
        Ok(counts)
    }

    /// Write a new status. Transition rules are enforced by the caller.
    pub fn set_appointment_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> DbResult<Appointment> {
        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            "UPDATE appointments SET status = ?, updated_at = ? WHERE appointment_id = ?",
            params![status.as_str(), chrono::Utc::now().to_rfc3339(), appointment_id],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("appointment {}", appointment_id)));
        }

        let sql = format!(
            "SELECT {} FROM appointments WHERE appointment_id = ?",
            APPOINTMENT_COLUMNS
        );
        let updated: Appointment = tx
            .query_row(&sql, [appointment_id], appointment_row)?
            .try_into()?;
        log_change(
            &tx,
            ChangeTable::Appointments,
            ChangeKind::Update,
            appointment_id,
            &updated,
        )?;
        tx.commit()?;
        Ok(updated)
    }
}

/// Intermediate row struct for database mapping.
struct AppointmentRow {
    appointment: Appointment,
    status: String,
}

fn appointment_row(row: &Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        appointment: Appointment {
            appointment_id: row.get(0)?,
            patient: PatientInfo {
                name: row.get(1)?,
                age: row.get(2)?,
                sex: row.get(3)?,
                contact_number: row.get(4)?,
                email: row.get(5)?,
                address: row.get(6)?,
                barangay: row.get(7)?,
            },
            bite: BiteIncident {
                biting_animal: row.get(8)?,
                bite_site: row.get(9)?,
                bite_date: row.get(10)?,
                bite_time: row.get(11)?,
                barangay: row.get(12)?,
            },
            preferred_date: row.get(13)?,
            status: AppointmentStatus::Pending,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        },
        status: row.get(14)?,
    })
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = AppointmentStatus::parse(&row.status)
            .ok_or_else(|| {
                DbError::Constraint(format!("Unknown appointment status: {}", row.status))
            })?;
        Ok(Appointment {
            status,
            ..row.appointment
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn make_appointment(name: &str, barangay: &str) -> Appointment {
        let mut patient = PatientInfo::new(name);
        patient.contact_number = Some("09171234567".into());
        patient.barangay = Some(barangay.into());
        patient.age = Some(34);
        let mut bite = BiteIncident::new("dog");
        bite.bite_date = NaiveDate::from_ymd_opt(2024, 5, 2);
        bite.bite_time = Some("14:30".into());
        Appointment::new(patient, bite)
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let appt = make_appointment("Ana Reyes", "Poblacion");
        db.insert_appointment(&appt).unwrap();

        let retrieved = db.get_appointment(&appt.appointment_id).unwrap().unwrap();
        assert_eq!(retrieved, appt);
    }

    #[test]
    fn test_filter_by_status() {
        let db = setup_db();
        let a = make_appointment("Ana", "Poblacion");
        let b = make_appointment("Ben", "San Isidro");
        db.insert_appointment(&a).unwrap();
        db.insert_appointment(&b).unwrap();
        db.set_appointment_status(&b.appointment_id, AppointmentStatus::Confirmed)
            .unwrap();

        let pending = db
            .list_appointments(&AppointmentQuery::with_status(AppointmentStatus::Pending))
            .unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.items[0].patient.name, "Ana");
    }

    #[test]
    fn test_filter_by_barangay_and_search() {
        let db = setup_db();
        db.insert_appointment(&make_appointment("Ana Reyes", "Poblacion")).unwrap();
        db.insert_appointment(&make_appointment("Ben Cruz", "poblacion ")).unwrap();
        db.insert_appointment(&make_appointment("Carla Reyes", "San Isidro")).unwrap();

        let query = AppointmentQuery {
            barangay: Some("POBLACION".into()),
            ..Default::default()
        };
        assert_eq!(db.list_appointments(&query).unwrap().total, 2);

        let query = AppointmentQuery {
            search: Some("Reyes".into()),
            ..Default::default()
        };
        assert_eq!(db.list_appointments(&query).unwrap().total, 2);
    }

    #[test]
    fn test_search_wildcards_match_literally() {
        let db = setup_db();
        db.insert_appointment(&make_appointment("Ana_Reyes", "Poblacion")).unwrap();
        db.insert_appointment(&make_appointment("Ana Reyes", "Poblacion")).unwrap();
        db.insert_appointment(&make_appointment("Ben Cruz", "Poblacion")).unwrap();

        let search = |text: &str| {
            let query = AppointmentQuery {
                search: Some(text.into()),
                ..Default::default()
            };
            db.list_appointments(&query).unwrap().total
        };
        assert_eq!(search("_"), 1);
        assert_eq!(search("Ana_"), 1);
        assert_eq!(search("%"), 0);
        assert_eq!(search("\\"), 0);
        assert_eq!(search("Ana"), 2);
    }

    #[test]
    fn test_pagination() {
        let db = setup_db();
        for i in 0..7 {
            db.insert_appointment(&make_appointment(&format!("Patient {}", i), "Poblacion"))
                .unwrap();
        }

        let query = AppointmentQuery {
            page: 2,
            page_size: 3,
            ..Default::default()
        };
        let page = db.list_appointments(&query).unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total_pages(), 3);

        let query = AppointmentQuery {
            page: 3,
            page_size: 3,
            ..Default::default()
        };
        let last = db.list_appointments(&query).unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_next());
    }

    #[test]
    fn test_count_by_status() {
        let db = setup_db();
        let a = make_appointment("Ana", "Poblacion");
        db.insert_appointment(&a).unwrap();
        db.insert_appointment(&make_appointment("Ben", "Poblacion")).unwrap();
        db.set_appointment_status(&a.appointment_id, AppointmentStatus::Cancelled)
            .unwrap();

        let counts = db.count_appointments_by_status().unwrap();
        assert_eq!(counts[&AppointmentStatus::Pending], 1);
        assert_eq!(counts[&AppointmentStatus::Cancelled], 1);
        assert_eq!(counts[&AppointmentStatus::Completed], 0);
    }

    #[test]
    fn test_set_status_unknown_id() {
        let db = setup_db();
        let result = db.set_appointment_status("missing", AppointmentStatus::Confirmed);
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_writes_are_logged() {
        let db = setup_db();
        let appt = make_appointment("Ana", "Poblacion");
        db.insert_appointment(&appt).unwrap();
        db.set_appointment_status(&appt.appointment_id, AppointmentStatus::Confirmed)
            .unwrap();

        let changes = db.changes_since(0).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, ChangeKind::Insert);
        assert_eq!(changes[0].column("status"), Some("pending"));
        assert_eq!(changes[1].column("status"), Some("confirmed"));
    }
}
