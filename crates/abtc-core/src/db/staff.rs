//! Staff profile database operations.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Role, StaffProfile};

const STAFF_COLUMNS: &str =
    "staff_id, email, full_name, role, password_hash, active, created_at, updated_at";

impl Database {
    /// Insert a new staff profile.
    pub fn insert_staff(&self, staff: &StaffProfile) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO staff_profiles (
                staff_id, email, full_name, role, password_hash, active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                staff.staff_id,
                staff.email,
                staff.full_name,
                staff.role.as_str(),
                staff.password_hash,
                staff.active,
                staff.created_at,
                staff.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a staff profile by ID.
    pub fn get_staff(&self, staff_id: &str) -> DbResult<Option<StaffProfile>> {
        let sql = format!("SELECT {} FROM staff_profiles WHERE staff_id = ?", STAFF_COLUMNS);
        self.conn
            .query_row(&sql, [staff_id], staff_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a staff profile by login email.
    pub fn get_staff_by_email(&self, email: &str) -> DbResult<Option<StaffProfile>> {
        let sql = format!("SELECT {} FROM staff_profiles WHERE email = ?", STAFF_COLUMNS);
        self.conn
            .query_row(&sql, [email.trim().to_lowercase()], staff_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all staff profiles by name.
    pub fn list_staff(&self) -> DbResult<Vec<StaffProfile>> {
        let sql = format!("SELECT {} FROM staff_profiles ORDER BY full_name", STAFF_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], staff_row)?;

        let mut staff = Vec::new();
        for row in rows {
            staff.push(row?.try_into()?);
        }
        Ok(staff)
    }

    /// Display names keyed by staff ID, for "updated by" columns.
    pub fn staff_names_by_id(&self) -> DbResult<HashMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT staff_id, full_name FROM staff_profiles")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<HashMap<_, _>, _>>().map_err(Into::into)
    }

    /// Enable or disable an account.
    pub fn set_staff_active(&self, staff_id: &str, active: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE staff_profiles SET active = ?, updated_at = ? WHERE staff_id = ?",
            params![active, chrono::Utc::now().to_rfc3339(), staff_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct StaffRow {
    staff_id: String,
    email: String,
    full_name: String,
    role: String,
    password_hash: String,
    active: bool,
    created_at: String,
    updated_at: String,
}

fn staff_row(row: &Row<'_>) -> rusqlite::Result<StaffRow> {
    Ok(StaffRow {
        staff_id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: row.get(3)?,
        password_hash: row.get(4)?,
        active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl TryFrom<StaffRow> for StaffProfile {
    type Error = DbError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| DbError::Constraint(format!("Unknown role: {}", row.role)))?;
        Ok(StaffProfile {
            staff_id: row.staff_id,
            email: row.email,
            full_name: row.full_name,
            role,
            password_hash: row.password_hash,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
