//! Vaccine catalog models.

use serde::{Deserialize, Serialize};

use super::treatment::TreatmentKind;

/// A vaccine or immunoglobulin product stocked by the clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaccineItem {
    /// Unique vaccine ID
    pub vaccine_id: String,
    /// Brand/product name (e.g., "Verorab", "Rabipur")
    pub name: String,
    /// What kind of biologic this is
    pub kind: TreatmentKind,
    /// Vials on hand
    pub stock: u32,
    /// Whether the product is selectable on the treatment form
    pub active: bool,
}

impl VaccineItem {
    /// Create a new active catalog item with no stock.
    pub fn new(name: String, kind: TreatmentKind) -> Self {
        Self {
            vaccine_id: uuid::Uuid::new_v4().to_string(),
            name,
            kind,
            stock: 0,
            active: true,
        }
    }
}
