//! Treatment record database operations.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::changes::log_change;
use super::{Database, DbError, DbResult};
use crate::models::{
    BiteIncident, ChangeKind, ChangeTable, DoseNumber, DoseSlot, DoseStatus, ExposureCategory,
    PatientInfo, RigDetails, TreatmentKind, TreatmentRecord,
};

const RECORD_COLUMNS: &str = r#"
    record_id, appointment_id, patient_name, age, sex, contact_number, email,
    address, patient_barangay, biting_animal, bite_site, bite_date, bite_time,
    bite_barangay, exposure_categories, treatments, rig,
    d0_date, d0_status, d0_updated_by, d0_updated_by_name, d0_updated_at,
    d3_date, d3_status, d3_updated_by, d3_updated_by_name, d3_updated_at,
    d7_date, d7_status, d7_updated_by, d7_updated_by_name, d7_updated_at,
    d14_date, d14_status, d14_updated_by, d14_updated_by_name, d14_updated_at,
    d28_date, d28_status, d28_updated_by, d28_updated_by_name, d28_updated_at,
    created_at, updated_at
"#;

/// Index of the first dose column in `RECORD_COLUMNS`.
const FIRST_DOSE_COLUMN: usize = 17;
/// Columns per dose slot.
const DOSE_COLUMNS: usize = 5;

impl Database {
    /// Insert a new treatment record.
    pub fn insert_treatment_record(&self, record: &TreatmentRecord) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO treatment_records (
                record_id, appointment_id, patient_name, age, sex, contact_number,
                email, address, patient_barangay, biting_animal, bite_site, bite_date,
                bite_time, bite_barangay, exposure_categories, treatments, rig,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
            params![
                record.record_id,
                record.appointment_id,
                record.patient.name,
                record.patient.age,
                record.patient.sex,
                record.patient.contact_number,
                record.patient.email,
                record.patient.address,
                record.patient.barangay,
                record.bite.biting_animal,
                record.bite.bite_site,
                record.bite.bite_date,
                record.bite.bite_time,
                record.bite.barangay,
                serde_json::to_string(&record.exposure_categories)?,
                serde_json::to_string(&record.treatments)?,
                record.rig.as_ref().map(serde_json::to_string).transpose()?,
                record.created_at,
                record.updated_at,
            ],
        )?;
        for dose in DoseNumber::ALL {
            write_dose_slot(
                &tx,
                &record.record_id,
                dose,
                record.dose(dose),
                &record.updated_at,
                None,
            )?;
        }
        log_change(
            &tx,
            ChangeTable::TreatmentRecords,
            ChangeKind::Insert,
            &record.record_id,
            record,
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Replace the editable treatment fields (patient, bite, categories,
    /// treatments, RIG). Dose slots are written through `update_dose_slot`
    /// and `update_dose_date`.
    pub fn update_treatment_record(&self, record: &TreatmentRecord) -> DbResult<TreatmentRecord> {
        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            r#"
            UPDATE treatment_records SET
                patient_name = ?2, age = ?3, sex = ?4, contact_number = ?5,
                email = ?6, address = ?7, patient_barangay = ?8,
                biting_animal = ?9, bite_site = ?10, bite_date = ?11,
                bite_time = ?12, bite_barangay = ?13,
                exposure_categories = ?14, treatments = ?15, rig = ?16,
                updated_at = ?17
            WHERE record_id = ?1
            "#,
            params![
                record.record_id,
                record.patient.name,
                record.patient.age,
                record.patient.sex,
                record.patient.contact_number,
                record.patient.email,
                record.patient.address,
                record.patient.barangay,
                record.bite.biting_animal,
                record.bite.bite_site,
                record.bite.bite_date,
                record.bite.bite_time,
                record.bite.barangay,
                serde_json::to_string(&record.exposure_categories)?,
                serde_json::to_string(&record.treatments)?,
                record.rig.as_ref().map(serde_json::to_string).transpose()?,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("treatment record {}", record.record_id)));
        }

        let updated = read_record(&tx, &record.record_id)?
            .ok_or_else(|| DbError::NotFound(format!("treatment record {}", record.record_id)))?;
        log_change(
            &tx,
            ChangeTable::TreatmentRecords,
            ChangeKind::Update,
            &record.record_id,
            &updated,
        )?;
        tx.commit()?;
        Ok(updated)
    }

    /// Write one dose slot and return the updated record.
    ///
    /// With `expected` set, the write only lands if the stored status of
    /// the slot still equals it; otherwise `DbError::Conflict` is returned
    /// and nothing changes.
    pub fn update_dose_slot(
        &self,
        record_id: &str,
        dose: DoseNumber,
        slot: &DoseSlot,
        expected: Option<DoseStatus>,
    ) -> DbResult<TreatmentRecord> {
        let tx = self.conn.unchecked_transaction()?;
        let now = chrono::Utc::now().to_rfc3339();
        let rows_affected = write_dose_slot(&tx, record_id, dose, slot, &now, expected)?;
        if rows_affected == 0 {
            return Err(missing_or_conflict(&tx, record_id, dose)?);
        }

        let updated = read_record(&tx, record_id)?
            .ok_or_else(|| DbError::NotFound(format!("treatment record {}", record_id)))?;
        log_change(
            &tx,
            ChangeTable::TreatmentRecords,
            ChangeKind::Update,
            record_id,
            &updated,
        )?;
        tx.commit()?;
        Ok(updated)
    }

    /// Move one dose to a new date, leaving its status and updater alone.
    pub fn update_dose_date(
        &self,
        record_id: &str,
        dose: DoseNumber,
        date: NaiveDate,
    ) -> DbResult<TreatmentRecord> {
        let tx = self.conn.unchecked_transaction()?;
        let sql = format!(
            "UPDATE treatment_records SET {p}_date = ?2, updated_at = ?3 WHERE record_id = ?1",
            p = dose.column_prefix()
        );
        let rows_affected =
            tx.execute(&sql, params![record_id, date, chrono::Utc::now().to_rfc3339()])?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("treatment record {}", record_id)));
        }

        let updated = read_record(&tx, record_id)?
            .ok_or_else(|| DbError::NotFound(format!("treatment record {}", record_id)))?;
        log_change(
            &tx,
            ChangeTable::TreatmentRecords,
            ChangeKind::Update,
            record_id,
            &updated,
        )?;
        tx.commit()?;
        Ok(updated)
    }

    /// Get a treatment record by ID.
    pub fn get_treatment_record(&self, record_id: &str) -> DbResult<Option<TreatmentRecord>> {
        read_record(&self.conn, record_id)
    }

    /// List all treatment records, newest first.
    pub fn list_treatment_records(&self) -> DbResult<Vec<TreatmentRecord>> {
        let sql = format!(
            "SELECT {} FROM treatment_records ORDER BY created_at DESC",
            RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], record_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// All records for a patient name (case-insensitive, trimmed), oldest first.
    pub fn list_records_for_patient(&self, patient_name: &str) -> DbResult<Vec<TreatmentRecord>> {
        let sql = format!(
            "SELECT {} FROM treatment_records WHERE LOWER(TRIM(patient_name)) = ? ORDER BY created_at",
            RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([patient_name.trim().to_lowercase()], record_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }
}

fn write_dose_slot(
    conn: &Connection,
    record_id: &str,
    dose: DoseNumber,
    slot: &DoseSlot,
    updated_at: &str,
    expected: Option<DoseStatus>,
) -> DbResult<usize> {
    let p = dose.column_prefix();
    let sql = format!(
        "UPDATE treatment_records SET {p}_date = ?2, {p}_status = ?3, {p}_updated_by = ?4, \
         {p}_updated_by_name = ?5, {p}_updated_at = ?6, updated_at = ?7 \
         WHERE record_id = ?1 AND (?8 IS NULL OR {p}_status = ?8)"
    );
    let rows_affected = conn.execute(
        &sql,
        params![
            record_id,
            slot.date,
            slot.status.as_str(),
            slot.updated_by,
            slot.updated_by_name,
            slot.updated_at,
            updated_at,
            expected.map(|s| s.as_str()),
        ],
    )?;
    Ok(rows_affected)
}

/// Explain a zero-row guarded write: the record is gone, or the slot moved on.
fn missing_or_conflict(conn: &Connection, record_id: &str, dose: DoseNumber) -> DbResult<DbError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM treatment_records WHERE record_id = ?)",
        [record_id],
        |row| row.get(0),
    )?;
    Ok(if exists {
        DbError::Conflict(format!(
            "{} of treatment record {} was changed by another writer",
            dose.label(),
            record_id
        ))
    } else {
        DbError::NotFound(format!("treatment record {}", record_id))
    })
}

fn read_record(conn: &Connection, record_id: &str) -> DbResult<Option<TreatmentRecord>> {
    let sql = format!(
        "SELECT {} FROM treatment_records WHERE record_id = ?",
        RECORD_COLUMNS
    );
    conn.query_row(&sql, [record_id], record_row)
        .optional()?
        .map(|row| row.try_into())
        .transpose()
}

/// Intermediate row struct for database mapping.
struct TreatmentRow {
    record_id: String,
    appointment_id: Option<String>,
    patient: PatientInfo,
    bite: BiteIncident,
    exposure_categories: String,
    treatments: String,
    rig: Option<String>,
    doses: Vec<DoseRow>,
    created_at: String,
    updated_at: String,
}

struct DoseRow {
    date: Option<NaiveDate>,
    status: String,
    updated_by: Option<String>,
    updated_by_name: Option<String>,
    updated_at: Option<String>,
}

fn record_row(row: &Row<'_>) -> rusqlite::Result<TreatmentRow> {
    let mut doses = Vec::with_capacity(DoseNumber::ALL.len());
    for dose in DoseNumber::ALL {
        let base = FIRST_DOSE_COLUMN + dose.index() * DOSE_COLUMNS;
        doses.push(DoseRow {
            date: row.get(base)?,
            status: row.get(base + 1)?,
            updated_by: row.get(base + 2)?,
            updated_by_name: row.get(base + 3)?,
            updated_at: row.get(base + 4)?,
        });
    }

    let last_dose_column = FIRST_DOSE_COLUMN + DoseNumber::ALL.len() * DOSE_COLUMNS;
    Ok(TreatmentRow {
        record_id: row.get(0)?,
        appointment_id: row.get(1)?,
        patient: PatientInfo {
            name: row.get(2)?,
            age: row.get(3)?,
            sex: row.get(4)?,
            contact_number: row.get(5)?,
            email: row.get(6)?,
            address: row.get(7)?,
            barangay: row.get(8)?,
        },
        bite: BiteIncident {
            biting_animal: row.get(9)?,
            bite_site: row.get(10)?,
            bite_date: row.get(11)?,
            bite_time: row.get(12)?,
            barangay: row.get(13)?,
        },
        exposure_categories: row.get(14)?,
        treatments: row.get(15)?,
        rig: row.get(16)?,
        doses,
        created_at: row.get(last_dose_column)?,
        updated_at: row.get(last_dose_column + 1)?,
    })
}

impl TryFrom<TreatmentRow> for TreatmentRecord {
    type Error = DbError;

    fn try_from(row: TreatmentRow) -> Result<Self, Self::Error> {
        let exposure_categories: BTreeSet<ExposureCategory> =
            serde_json::from_str(&row.exposure_categories)?;
        let treatments: BTreeSet<TreatmentKind> = serde_json::from_str(&row.treatments)?;
        let rig: Option<RigDetails> = row.rig.as_deref().map(serde_json::from_str).transpose()?;

        let mut doses: [DoseSlot; 5] = Default::default();
        for (slot, dose_row) in doses.iter_mut().zip(row.doses) {
            let status = DoseStatus::parse(&dose_row.status).ok_or_else(|| {
                DbError::Constraint(format!("Unknown dose status: {}", dose_row.status))
            })?;
            *slot = DoseSlot {
                date: dose_row.date,
                status,
                updated_by: dose_row.updated_by,
                updated_by_name: dose_row.updated_by_name,
                updated_at: dose_row.updated_at,
            };
        }

        Ok(TreatmentRecord {
            record_id: row.record_id,
            appointment_id: row.appointment_id,
            patient: row.patient,
            bite: row.bite,
            exposure_categories,
            treatments,
            rig,
            doses,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn make_record(name: &str) -> TreatmentRecord {
        let mut record = TreatmentRecord::new(
            PatientInfo::new(name),
            BiteIncident::new("cat"),
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        );
        record.exposure_categories.insert(ExposureCategory::CategoryII);
        record.treatments.insert(TreatmentKind::Pcecv);
        record.treatments.insert(TreatmentKind::Erig);
        record.rig = Some(RigDetails {
            kind: TreatmentKind::Erig,
            dose_ml: 5.0,
            date_given: NaiveDate::from_ymd_opt(2024, 6, 10),
        });
        record
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let record = make_record("Pedro Penduko");
        db.insert_treatment_record(&record).unwrap();

        let retrieved = db.get_treatment_record(&record.record_id).unwrap().unwrap();
        assert_eq!(retrieved.patient, record.patient);
        assert_eq!(retrieved.exposure_categories, record.exposure_categories);
        assert_eq!(retrieved.treatments, record.treatments);
        assert_eq!(retrieved.rig, record.rig);
        assert_eq!(retrieved.doses, record.doses);
    }

    #[test]
    fn test_update_dose_slot() {
        let db = setup_db();
        let record = make_record("Pedro Penduko");
        db.insert_treatment_record(&record).unwrap();

        let mut slot = record.dose(DoseNumber::D3).clone();
        slot.status = DoseStatus::Missed;
        slot.updated_by = Some("staff-1".into());
        slot.updated_by_name = Some("Nurse Joy".into());
        slot.updated_at = Some("2024-06-13T09:00:00Z".into());

        let updated = db
            .update_dose_slot(&record.record_id, DoseNumber::D3, &slot, None)
            .unwrap();
        assert_eq!(updated.dose(DoseNumber::D3).status, DoseStatus::Missed);
        assert_eq!(updated.dose(DoseNumber::D3).updated_by_name, Some("Nurse Joy".into()));
        // Other slots untouched
        assert_eq!(updated.dose(DoseNumber::D0).status, DoseStatus::Pending);
        assert_eq!(updated.dose(DoseNumber::D7), record.dose(DoseNumber::D7));
    }

    #[test]
    fn test_update_dose_slot_unknown_record() {
        let db = setup_db();
        let result = db.update_dose_slot(
            "missing",
            DoseNumber::D0,
            &DoseSlot::default(),
            Some(DoseStatus::Pending),
        );
        assert!(matches!(result, Err(DbError::NotFound(_))));
        // Nothing logged for a failed write
        assert!(db.changes_since(0).unwrap().is_empty());
    }

    #[test]
    fn test_guarded_dose_write_rejects_stale_status() {
        let db = setup_db();
        let record = make_record("Pedro Penduko");
        db.insert_treatment_record(&record).unwrap();

        let mut completed = record.dose(DoseNumber::D3).clone();
        completed.status = DoseStatus::Completed;
        db.update_dose_slot(
            &record.record_id,
            DoseNumber::D3,
            &completed,
            Some(DoseStatus::Pending),
        )
        .unwrap();
        let logged = db.changes_since(0).unwrap().len();

        let mut missed = record.dose(DoseNumber::D3).clone();
        missed.status = DoseStatus::Missed;
        let result = db.update_dose_slot(
            &record.record_id,
            DoseNumber::D3,
            &missed,
            Some(DoseStatus::Pending),
        );
        assert!(matches!(result, Err(DbError::Conflict(_))));

        let stored = db.get_treatment_record(&record.record_id).unwrap().unwrap();
        assert_eq!(stored.dose(DoseNumber::D3).status, DoseStatus::Completed);
        assert_eq!(db.changes_since(0).unwrap().len(), logged);
    }

    #[test]
    fn test_update_dose_date_keeps_status() {
        let db = setup_db();
        let record = make_record("Pedro Penduko");
        db.insert_treatment_record(&record).unwrap();

        let mut completed = record.dose(DoseNumber::D7).clone();
        completed.status = DoseStatus::Completed;
        completed.updated_by_name = Some("Nurse Joy".into());
        db.update_dose_slot(&record.record_id, DoseNumber::D7, &completed, None)
            .unwrap();

        let new_date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
        let updated = db
            .update_dose_date(&record.record_id, DoseNumber::D7, new_date)
            .unwrap();
        let slot = updated.dose(DoseNumber::D7);
        assert_eq!(slot.date, Some(new_date));
        assert_eq!(slot.status, DoseStatus::Completed);
        assert_eq!(slot.updated_by_name.as_deref(), Some("Nurse Joy"));

        assert!(matches!(
            db.update_dose_date("missing", DoseNumber::D7, new_date),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_treatment_record() {
        let db = setup_db();
        let mut record = make_record("Pedro Penduko");
        db.insert_treatment_record(&record).unwrap();

        record.exposure_categories.insert(ExposureCategory::CategoryIII);
        record.rig = None;
        let updated = db.update_treatment_record(&record).unwrap();
        assert_eq!(updated.exposure_categories.len(), 2);
        assert!(updated.rig.is_none());
    }

    #[test]
    fn test_records_for_patient() {
        let db = setup_db();
        db.insert_treatment_record(&make_record("Pedro Penduko")).unwrap();
        db.insert_treatment_record(&make_record("pedro penduko ")).unwrap();
        db.insert_treatment_record(&make_record("Maria Clara")).unwrap();

        let history = db.list_records_for_patient("PEDRO PENDUKO").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(db.list_treatment_records().unwrap().len(), 3);
    }
}
