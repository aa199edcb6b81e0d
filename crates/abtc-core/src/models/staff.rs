//! Staff profile models.

use serde::{Deserialize, Serialize};

/// Dashboard role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }

    /// Admins can do everything staff can.
    pub fn satisfies(&self, required: Role) -> bool {
        matches!((self, required), (Role::Admin, _) | (Role::Staff, Role::Staff))
    }
}

/// A clinic staff account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffProfile {
    /// Unique staff ID
    pub staff_id: String,
    /// Login email (unique, stored lowercase)
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Dashboard role
    pub role: Role,
    /// PBKDF2 password hash, see `auth::hash_password`
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Whether the account may sign in
    pub active: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl StaffProfile {
    /// Create a new active profile. The password hash is set by the auth layer.
    pub fn new(email: &str, full_name: String, role: Role) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            staff_id: uuid::Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            full_name,
            role,
            password_hash: String::new(),
            active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        let staff = StaffProfile::new(" Nurse@Clinic.PH ", "Nurse Joy".into(), Role::Staff);
        assert_eq!(staff.email, "nurse@clinic.ph");
        assert!(staff.active);
    }

    #[test]
    fn test_role_satisfies() {
        assert!(Role::Admin.satisfies(Role::Staff));
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(Role::Staff.satisfies(Role::Staff));
        assert!(!Role::Staff.satisfies(Role::Admin));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let mut staff = StaffProfile::new("a@b.ph", "A".into(), Role::Admin);
        staff.password_hash = "salt$digest".into();
        let json = serde_json::to_string(&staff).unwrap();
        assert!(!json.contains("digest"));
    }
}
