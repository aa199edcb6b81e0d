//! Change events recorded for every write to a watched table.

use serde::{Deserialize, Serialize};

/// Tables that emit change events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Appointments,
    TreatmentRecords,
    PatientGroups,
}

impl ChangeTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTable::Appointments => "appointments",
            ChangeTable::TreatmentRecords => "treatment_records",
            ChangeTable::PatientGroups => "patient_groups",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "appointments" => Some(ChangeTable::Appointments),
            "treatment_records" => Some(ChangeTable::TreatmentRecords),
            "patient_groups" => Some(ChangeTable::PatientGroups),
            _ => None,
        }
    }
}

/// Kind of row change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "insert" => Some(ChangeKind::Insert),
            "update" => Some(ChangeKind::Update),
            "delete" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// One logged change with the row as it stood afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    /// Monotonic log sequence number
    pub seq: i64,
    /// Source table
    pub table: ChangeTable,
    /// Insert, update or delete
    pub kind: ChangeKind,
    /// Primary key of the changed row
    pub row_id: String,
    /// Row JSON after the change
    pub payload: serde_json::Value,
    /// When the change was logged
    pub created_at: String,
}

impl ChangeEvent {
    /// Look up a top-level string column in the payload.
    ///
    /// Nested objects are searched one level deep so that `status` matches
    /// both `{"status": ..}` and `{"patient": {"barangay": ..}}` style rows.
    pub fn column(&self, column: &str) -> Option<&str> {
        let obj = self.payload.as_object()?;
        if let Some(v) = obj.get(column) {
            return v.as_str();
        }
        obj.values()
            .filter_map(|v| v.as_object())
            .find_map(|nested| nested.get(column).and_then(|v| v.as_str()))
    }
}
