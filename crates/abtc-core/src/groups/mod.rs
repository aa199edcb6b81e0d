//! Patient groups: named, ordered sets of treatment records that share
//! prescription files.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::db::{Database, DbError};
use crate::models::{PatientGroup, PrescriptionFile};
use crate::tracker::PatientSummary;

/// Group management errors.
#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Treatment record not found: {0}")]
    RecordNotFound(String),

    #[error("Prescription file not found: {0}")]
    FileNotFound(String),

    #[error("Group name must not be empty")]
    EmptyName,

    #[error("Prescription file is empty")]
    EmptyFile,
}

pub type GroupResult<T> = Result<T, GroupError>;

/// One row of the group list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupSummary {
    pub group_id: String,
    pub name: String,
    pub member_count: usize,
    pub file_count: usize,
    pub created_at: String,
}

impl From<&PatientGroup> for GroupSummary {
    fn from(group: &PatientGroup) -> Self {
        Self {
            group_id: group.group_id.clone(),
            name: group.name.clone(),
            member_count: group.members.len(),
            file_count: group.files.len(),
            created_at: group.created_at.clone(),
        }
    }
}

/// Group operations over the store.
pub struct GroupManager<'a> {
    db: &'a Database,
}

impl<'a> GroupManager<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create an empty group.
    pub fn create(&self, name: &str) -> GroupResult<PatientGroup> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GroupError::EmptyName);
        }
        let group = PatientGroup::new(name.to_string());
        self.db.insert_group(&group)?;
        info!(group_id = %group.group_id, name, "Group created");
        Ok(group)
    }

    /// Append a patient's record. Returns false if it was already a member.
    pub fn add_patient(&self, group_id: &str, record_id: &str) -> GroupResult<bool> {
        self.load(group_id)?;
        if self.db.get_treatment_record(record_id)?.is_none() {
            return Err(GroupError::RecordNotFound(record_id.to_string()));
        }
        let added = self.db.add_group_member(group_id, record_id)?;
        if added {
            info!(group_id, record_id, "Patient added to group");
        }
        Ok(added)
    }

    /// Remove a patient's record. Returns false if it was not a member.
    pub fn remove_patient(&self, group_id: &str, record_id: &str) -> GroupResult<bool> {
        self.load(group_id)?;
        let removed = self.db.remove_group_member(group_id, record_id)?;
        if removed {
            info!(group_id, record_id, "Patient removed from group");
        }
        Ok(removed)
    }

    /// Store an uploaded prescription file under the group.
    pub fn attach_file(
        &self,
        group_id: &str,
        file_name: &str,
        content_type: &str,
        content: &[u8],
    ) -> GroupResult<PrescriptionFile> {
        if content.is_empty() {
            return Err(GroupError::EmptyFile);
        }
        self.load(group_id)?;
        let file = PrescriptionFile::new(file_name.to_string(), content_type.to_string(), content);
        self.db.attach_group_file(group_id, &file, content)?;
        info!(
            group_id,
            file_id = %file.file_id,
            file_name,
            size_bytes = file.size_bytes,
            "Prescription file attached"
        );
        Ok(file)
    }

    /// Read back the bytes of an attached file.
    pub fn file_content(&self, file_id: &str) -> GroupResult<Vec<u8>> {
        self.db
            .group_file_content(file_id)?
            .ok_or_else(|| GroupError::FileNotFound(file_id.to_string()))
    }

    /// All groups with member and file counts.
    pub fn list(&self) -> GroupResult<Vec<GroupSummary>> {
        Ok(self.db.list_groups()?.iter().map(GroupSummary::from).collect())
    }

    pub fn get(&self, group_id: &str) -> GroupResult<PatientGroup> {
        self.load(group_id)
    }

    /// Member patients in group order. Records deleted since are skipped.
    pub fn members(&self, group_id: &str) -> GroupResult<Vec<PatientSummary>> {
        let group = self.load(group_id)?;
        let mut members = Vec::with_capacity(group.members.len());
        for record_id in &group.members {
            if let Some(record) = self.db.get_treatment_record(record_id)? {
                members.push(PatientSummary::from_record(record));
            }
        }
        Ok(members)
    }

    /// Delete a group. Member records are not touched.
    pub fn delete(&self, group_id: &str) -> GroupResult<()> {
        if !self.db.delete_group(group_id)? {
            return Err(GroupError::GroupNotFound(group_id.to_string()));
        }
        info!(group_id, "Group deleted");
        Ok(())
    }

    fn load(&self, group_id: &str) -> GroupResult<PatientGroup> {
        self.db
            .get_group(group_id)?
            .ok_or_else(|| GroupError::GroupNotFound(group_id.to_string()))
    }
}
