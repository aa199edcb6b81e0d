//! SQLite schema definition.

/// Complete database schema for the clinic store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Appointments (created on booking, never deleted)
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    appointment_id TEXT PRIMARY KEY,
    patient_name TEXT NOT NULL,
    age INTEGER,
    sex TEXT,
    contact_number TEXT,
    email TEXT,
    address TEXT,
    patient_barangay TEXT,
    biting_animal TEXT NOT NULL DEFAULT '',
    bite_site TEXT,
    bite_date TEXT,                              -- YYYY-MM-DD
    bite_time TEXT,                              -- free text as entered
    bite_barangay TEXT,
    preferred_date TEXT,                         -- YYYY-MM-DD
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'confirmed', 'completed', 'cancelled')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status);
CREATE INDEX IF NOT EXISTS idx_appointments_created ON appointments(created_at);

-- Appointments are never deleted in-app
CREATE TRIGGER IF NOT EXISTS appointments_no_delete BEFORE DELETE ON appointments
BEGIN
    SELECT RAISE(ABORT, 'Appointments cannot be deleted');
END;

-- ============================================================================
-- Treatment Records (one per encounter, five dose slots)
-- ============================================================================

CREATE TABLE IF NOT EXISTS treatment_records (
    record_id TEXT PRIMARY KEY,
    appointment_id TEXT REFERENCES appointments(appointment_id),
    patient_name TEXT NOT NULL,
    age INTEGER,
    sex TEXT,
    contact_number TEXT,
    email TEXT,
    address TEXT,
    patient_barangay TEXT,
    biting_animal TEXT NOT NULL DEFAULT '',
    bite_site TEXT,
    bite_date TEXT,
    bite_time TEXT,
    bite_barangay TEXT,
    exposure_categories TEXT NOT NULL DEFAULT '[]',  -- JSON array of categories
    treatments TEXT NOT NULL DEFAULT '[]',           -- JSON array of treatment kinds
    rig TEXT,                                        -- JSON object {kind, dose_ml, date_given}
    d0_date TEXT, d0_status TEXT NOT NULL DEFAULT 'pending',
    d0_updated_by TEXT, d0_updated_by_name TEXT, d0_updated_at TEXT,
    d3_date TEXT, d3_status TEXT NOT NULL DEFAULT 'pending',
    d3_updated_by TEXT, d3_updated_by_name TEXT, d3_updated_at TEXT,
    d7_date TEXT, d7_status TEXT NOT NULL DEFAULT 'pending',
    d7_updated_by TEXT, d7_updated_by_name TEXT, d7_updated_at TEXT,
    d14_date TEXT, d14_status TEXT NOT NULL DEFAULT 'pending',
    d14_updated_by TEXT, d14_updated_by_name TEXT, d14_updated_at TEXT,
    d28_date TEXT, d28_status TEXT NOT NULL DEFAULT 'pending',
    d28_updated_by TEXT, d28_updated_by_name TEXT, d28_updated_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_records_patient ON treatment_records(patient_name);
CREATE INDEX IF NOT EXISTS idx_records_appointment ON treatment_records(appointment_id);

-- ============================================================================
-- Staff Profiles
-- ============================================================================

CREATE TABLE IF NOT EXISTS staff_profiles (
    staff_id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('admin', 'staff')),
    password_hash TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Vaccine Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS vaccines (
    vaccine_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
    active INTEGER NOT NULL DEFAULT 1
);

-- ============================================================================
-- Patient Groups
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_groups (
    group_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id TEXT NOT NULL REFERENCES patient_groups(group_id) ON DELETE CASCADE,
    record_id TEXT NOT NULL REFERENCES treatment_records(record_id),
    position INTEGER NOT NULL,
    PRIMARY KEY (group_id, record_id)
);

CREATE TABLE IF NOT EXISTS group_files (
    file_id TEXT PRIMARY KEY,
    group_id TEXT NOT NULL REFERENCES patient_groups(group_id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    sha256 TEXT NOT NULL,
    content BLOB NOT NULL,
    uploaded_at TEXT NOT NULL
);

-- ============================================================================
-- Change Log (feeds realtime subscriptions)
-- ============================================================================

CREATE TABLE IF NOT EXISTS change_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    table_name TEXT NOT NULL,
    event TEXT NOT NULL CHECK (event IN ('insert', 'update', 'delete')),
    row_id TEXT NOT NULL,
    payload TEXT NOT NULL,                       -- JSON of the row after the change
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_appointment_status_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO appointments (appointment_id, patient_name, status) VALUES ('a1', 'Ana', 'done')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO appointments (appointment_id, patient_name, status) VALUES ('a1', 'Ana', 'pending')",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_appointments_cannot_be_deleted() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO appointments (appointment_id, patient_name) VALUES ('a1', 'Ana')",
            [],
        )
        .unwrap();

        let result = conn.execute("DELETE FROM appointments WHERE appointment_id = 'a1'", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_stock_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO vaccines (vaccine_id, name, kind, stock) VALUES ('v1', 'Verorab', 'pvrv', -1)",
            [],
        );
        assert!(result.is_err());
    }
}
