//! Patient groups for prescription file attachment.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A named group of treatment records sharing prescription files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientGroup {
    /// Unique group ID
    pub group_id: String,
    /// Group name
    pub name: String,
    /// Member treatment record IDs, in insertion order
    pub members: Vec<String>,
    /// Prescription files attached to the group
    pub files: Vec<PrescriptionFile>,
    /// Creation timestamp
    pub created_at: String,
}

impl PatientGroup {
    /// Create an empty group.
    pub fn new(name: String) -> Self {
        Self {
            group_id: uuid::Uuid::new_v4().to_string(),
            name,
            members: Vec::new(),
            files: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether the record is already a member.
    pub fn contains(&self, record_id: &str) -> bool {
        self.members.iter().any(|m| m == record_id)
    }
}

/// Metadata of an uploaded prescription file. The bytes are stored
/// alongside it and read back with `Database::group_file_content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionFile {
    /// Unique file ID
    pub file_id: String,
    /// Original file name
    pub file_name: String,
    /// MIME type
    pub content_type: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Hex SHA-256 of the content
    pub sha256: String,
    /// Upload timestamp
    pub uploaded_at: String,
}

impl PrescriptionFile {
    /// Describe `content`; size and digest are taken from the bytes.
    pub fn new(file_name: String, content_type: String, content: &[u8]) -> Self {
        Self {
            file_id: uuid::Uuid::new_v4().to_string(),
            file_name,
            content_type,
            size_bytes: content.len() as u64,
            sha256: content_digest(content),
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether `content` is the file this metadata describes.
    pub fn matches(&self, content: &[u8]) -> bool {
        self.size_bytes == content.len() as u64 && self.sha256 == content_digest(content)
    }
}

fn content_digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
