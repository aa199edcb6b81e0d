//! Appointment models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::patient::{BiteIncident, PatientInfo};

/// Appointment lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// Booked by the patient, not yet acted on by staff
    Pending,
    /// Accepted by staff
    Confirmed,
    /// Patient was seen
    Completed,
    /// Cancelled by staff
    Cancelled,
}

impl AppointmentStatus {
    /// All statuses in display order.
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether staff may move an appointment from `self` to `next`.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
        )
    }
}

/// A patient booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Unique appointment ID
    pub appointment_id: String,
    /// Patient identity and contact
    pub patient: PatientInfo,
    /// Bite incident reported at booking
    pub bite: BiteIncident,
    /// Date the patient asked to be seen
    pub preferred_date: Option<NaiveDate>,
    /// Current status
    pub status: AppointmentStatus,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Appointment {
    /// Create a new pending appointment.
    pub fn new(patient: PatientInfo, bite: BiteIncident) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            appointment_id: uuid::Uuid::new_v4().to_string(),
            patient,
            bite,
            preferred_date: None,
            status: AppointmentStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Barangay used for mapping: the incident location, else the residence.
    pub fn barangay(&self) -> Option<&str> {
        [&self.bite.barangay, &self.patient.barangay]
            .into_iter()
            .filter_map(|b| b.as_deref())
            .find(|b| !b.trim().is_empty())
    }
}
