//! Patient group database operations.

use rusqlite::{params, Connection, OptionalExtension};

use super::changes::log_change;
use super::{Database, DbError, DbResult};
use crate::models::{ChangeKind, ChangeTable, PatientGroup, PrescriptionFile};

impl Database {
    /// Insert a new group with its initial members. Files carry content and
    /// are added with `attach_group_file`; a group with files is rejected.
    pub fn insert_group(&self, group: &PatientGroup) -> DbResult<()> {
        if !group.files.is_empty() {
            return Err(DbError::Constraint(
                "Group files must be attached with their content".into(),
            ));
        }
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO patient_groups (group_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![group.group_id, group.name, group.created_at],
        )?;
        for (position, record_id) in group.members.iter().enumerate() {
            tx.execute(
                "INSERT INTO group_members (group_id, record_id, position) VALUES (?1, ?2, ?3)",
                params![group.group_id, record_id, position as i64],
            )?;
        }
        log_change(&tx, ChangeTable::PatientGroups, ChangeKind::Insert, &group.group_id, group)?;
        tx.commit()?;
        Ok(())
    }

    /// Get a group with its members and files.
    pub fn get_group(&self, group_id: &str) -> DbResult<Option<PatientGroup>> {
        read_group(&self.conn, group_id)
    }

    /// List all groups by name.
    pub fn list_groups(&self) -> DbResult<Vec<PatientGroup>> {
        let mut stmt = self
            .conn
            .prepare("SELECT group_id FROM patient_groups ORDER BY name, created_at")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(group) = read_group(&self.conn, &id)? {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    /// Append a member at the end of the group. Returns false if already present.
    pub fn add_group_member(&self, group_id: &str, record_id: &str) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let next_position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM group_members WHERE group_id = ?",
            [group_id],
            |row| row.get(0),
        )?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO group_members (group_id, record_id, position) VALUES (?1, ?2, ?3)",
            params![group_id, record_id, next_position],
        )?;
        if inserted > 0 {
            log_group_update(&tx, group_id)?;
        }
        tx.commit()?;
        Ok(inserted > 0)
    }

    /// Remove a member. Returns false if it was not a member.
    pub fn remove_group_member(&self, group_id: &str, record_id: &str) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute(
            "DELETE FROM group_members WHERE group_id = ? AND record_id = ?",
            [group_id, record_id],
        )?;
        if removed > 0 {
            log_group_update(&tx, group_id)?;
        }
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Store a prescription file and its content under a group.
    pub fn attach_group_file(
        &self,
        group_id: &str,
        file: &PrescriptionFile,
        content: &[u8],
    ) -> DbResult<()> {
        if !file.matches(content) {
            return Err(DbError::Constraint(format!(
                "Content does not match metadata of {}",
                file.file_name
            )));
        }
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO group_files
                (file_id, group_id, file_name, content_type, size_bytes, sha256, content, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                file.file_id,
                group_id,
                file.file_name,
                file.content_type,
                file.size_bytes as i64,
                file.sha256,
                content,
                file.uploaded_at,
            ],
        )?;
        log_group_update(&tx, group_id)?;
        tx.commit()?;
        Ok(())
    }

    /// Stored bytes of one prescription file.
    pub fn group_file_content(&self, file_id: &str) -> DbResult<Option<Vec<u8>>> {
        Ok(self
            .conn
            .query_row(
                "SELECT content FROM group_files WHERE file_id = ?",
                [file_id],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?)
    }

    /// Delete a group with its members and files.
    pub fn delete_group(&self, group_id: &str) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(group) = read_group(&tx, group_id)? else {
            return Ok(false);
        };
        tx.execute("DELETE FROM group_members WHERE group_id = ?", [group_id])?;
        tx.execute("DELETE FROM group_files WHERE group_id = ?", [group_id])?;
        tx.execute("DELETE FROM patient_groups WHERE group_id = ?", [group_id])?;
        log_change(&tx, ChangeTable::PatientGroups, ChangeKind::Delete, group_id, &group)?;
        tx.commit()?;
        Ok(true)
    }
}

fn log_group_update(conn: &Connection, group_id: &str) -> DbResult<()> {
    let group = read_group(conn, group_id)?
        .ok_or_else(|| DbError::NotFound(format!("group {}", group_id)))?;
    log_change(conn, ChangeTable::PatientGroups, ChangeKind::Update, group_id, &group)
}

fn read_group(conn: &Connection, group_id: &str) -> DbResult<Option<PatientGroup>> {
    let header = conn
        .query_row(
            "SELECT group_id, name, created_at FROM patient_groups WHERE group_id = ?",
            [group_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;
    let Some((group_id, name, created_at)) = header else {
        return Ok(None);
    };

    let members = conn
        .prepare("SELECT record_id FROM group_members WHERE group_id = ? ORDER BY position")?
        .query_map([&group_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let files = conn
        .prepare(
            r#"
            SELECT file_id, file_name, content_type, size_bytes, sha256, uploaded_at
            FROM group_files
            WHERE group_id = ?
            ORDER BY uploaded_at, file_id
            "#,
        )?
        .query_map([&group_id], |row| {
            Ok(PrescriptionFile {
                file_id: row.get(0)?,
                file_name: row.get(1)?,
                content_type: row.get(2)?,
                size_bytes: row.get::<_, i64>(3)? as u64,
                sha256: row.get(4)?,
                uploaded_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(PatientGroup {
        group_id,
        name,
        members,
        files,
        created_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BiteIncident, PatientInfo, TreatmentRecord};
    use chrono::NaiveDate;

    fn setup_db_with_records(n: usize) -> (Database, Vec<String>) {
        let db = Database::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for i in 0..n {
            let record = TreatmentRecord::new(
                PatientInfo::new(format!("Patient {}", i)),
                BiteIncident::new("dog"),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            );
            db.insert_treatment_record(&record).unwrap();
            ids.push(record.record_id);
        }
        (db, ids)
    }

    #[test]
    fn test_group_roundtrip_keeps_member_order() {
        let (db, ids) = setup_db_with_records(3);
        let mut group = PatientGroup::new("Household A".into());
        group.members = vec![ids[2].clone(), ids[0].clone()];
        db.insert_group(&group).unwrap();

        assert!(db.add_group_member(&group.group_id, &ids[1]).unwrap());
        assert!(!db.add_group_member(&group.group_id, &ids[1]).unwrap());

        let stored = db.get_group(&group.group_id).unwrap().unwrap();
        assert_eq!(stored.members, vec![ids[2].clone(), ids[0].clone(), ids[1].clone()]);
    }

    #[test]
    fn test_remove_member_and_attach_file() {
        let (db, ids) = setup_db_with_records(2);
        let mut group = PatientGroup::new("School trip".into());
        group.members = ids.clone();
        db.insert_group(&group).unwrap();

        assert!(db.remove_group_member(&group.group_id, &ids[0]).unwrap());
        assert!(!db.remove_group_member(&group.group_id, &ids[0]).unwrap());

        let content = b"%PDF-1.4 amoxicillin 500mg".to_vec();
        let file = PrescriptionFile::new("rx.pdf".into(), "application/pdf".into(), &content);
        db.attach_group_file(&group.group_id, &file, &content).unwrap();

        let stored = db.get_group(&group.group_id).unwrap().unwrap();
        assert_eq!(stored.members, vec![ids[1].clone()]);
        assert_eq!(stored.files, vec![file.clone()]);
        assert_eq!(db.group_file_content(&file.file_id).unwrap(), Some(content));
        assert_eq!(db.group_file_content("missing").unwrap(), None);
    }

    #[test]
    fn test_attach_rejects_mismatched_content() {
        let (db, _) = setup_db_with_records(0);
        let group = PatientGroup::new("Mismatch".into());
        db.insert_group(&group).unwrap();

        let file = PrescriptionFile::new("rx.png".into(), "image/png".into(), b"real bytes");
        let result = db.attach_group_file(&group.group_id, &file, b"other bytes");
        assert!(matches!(result, Err(DbError::Constraint(_))));
        assert!(db.get_group(&group.group_id).unwrap().unwrap().files.is_empty());
    }

    #[test]
    fn test_insert_group_with_files_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let mut group = PatientGroup::new("Prefilled".into());
        group
            .files
            .push(PrescriptionFile::new("rx.pdf".into(), "application/pdf".into(), b"x"));
        assert!(matches!(db.insert_group(&group), Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_delete_group() {
        let (db, ids) = setup_db_with_records(1);
        let mut group = PatientGroup::new("Temp".into());
        group.members = ids;
        db.insert_group(&group).unwrap();

        let file = PrescriptionFile::new("rx.pdf".into(), "application/pdf".into(), b"rx");
        db.attach_group_file(&group.group_id, &file, b"rx").unwrap();

        assert!(db.delete_group(&group.group_id).unwrap());
        assert_eq!(db.group_file_content(&file.file_id).unwrap(), None);
        assert!(db.get_group(&group.group_id).unwrap().is_none());
        assert!(!db.delete_group(&group.group_id).unwrap());
        assert!(db.list_groups().unwrap().is_empty());
    }
}
