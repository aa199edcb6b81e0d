//! Patient identity and bite incident details.
//!
//! Both appointments and treatment records carry a copy of these fields;
//! the clinic has no separate patient master table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Patient identity, contact and address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PatientInfo {
    /// Full name as written on the booking form
    pub name: String,
    /// Age in years
    pub age: Option<u32>,
    /// Sex as reported ("male", "female", ...)
    pub sex: Option<String>,
    /// Mobile or landline number
    pub contact_number: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Barangay of residence
    pub barangay: Option<String>,
}

impl PatientInfo {
    /// Create patient info with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Name folded for comparisons (trimmed, lowercase, single spaces).
    pub fn normalized_name(&self) -> String {
        self.name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// Details of the bite incident that brought the patient in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BiteIncident {
    /// Biting animal as entered (free text, normalized for analytics)
    pub biting_animal: String,
    /// Body site of the bite
    pub bite_site: Option<String>,
    /// Date of the bite
    pub bite_date: Option<NaiveDate>,
    /// Time of the bite, free text ("14:30", "2:30 PM", ...)
    pub bite_time: Option<String>,
    /// Barangay where the bite happened
    pub barangay: Option<String>,
}

impl BiteIncident {
    /// Create an incident for the given animal.
    pub fn new(biting_animal: impl Into<String>) -> Self {
        Self {
            biting_animal: biting_animal.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_name() {
        let patient = PatientInfo::new("  Juan   Dela Cruz ");
        assert_eq!(patient.normalized_name(), "juan dela cruz");
    }

    #[test]
    fn test_incident_defaults() {
        let bite = BiteIncident::new("dog");
        assert_eq!(bite.biting_animal, "dog");
        assert!(bite.bite_date.is_none());
        assert!(bite.bite_time.is_none());
    }
}
