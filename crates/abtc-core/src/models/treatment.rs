//! Treatment records and the post-exposure dose schedule.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::patient::{BiteIncident, PatientInfo};

/// Scheduled post-exposure prophylaxis visits, by day offset from D0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DoseNumber {
    D0,
    D3,
    D7,
    D14,
    /// The D28-30 visit
    D28,
}

impl DoseNumber {
    /// All doses in schedule order.
    pub const ALL: [DoseNumber; 5] = [
        DoseNumber::D0,
        DoseNumber::D3,
        DoseNumber::D7,
        DoseNumber::D14,
        DoseNumber::D28,
    ];

    /// Position in the schedule (0..5).
    pub fn index(&self) -> usize {
        match self {
            DoseNumber::D0 => 0,
            DoseNumber::D3 => 1,
            DoseNumber::D7 => 2,
            DoseNumber::D14 => 3,
            DoseNumber::D28 => 4,
        }
    }

    /// Days after D0 this visit is scheduled.
    pub fn offset_days(&self) -> i64 {
        match self {
            DoseNumber::D0 => 0,
            DoseNumber::D3 => 3,
            DoseNumber::D7 => 7,
            DoseNumber::D14 => 14,
            DoseNumber::D28 => 28,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            DoseNumber::D0 => "D0",
            DoseNumber::D3 => "D3",
            DoseNumber::D7 => "D7",
            DoseNumber::D14 => "D14",
            DoseNumber::D28 => "D28-30",
        }
    }

    /// Column prefix in the treatment_records table.
    pub(crate) fn column_prefix(&self) -> &'static str {
        match self {
            DoseNumber::D0 => "d0",
            DoseNumber::D3 => "d3",
            DoseNumber::D7 => "d7",
            DoseNumber::D14 => "d14",
            DoseNumber::D28 => "d28",
        }
    }

    /// Parse a label ("D7", "d28-30", "14", ...).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        let s = s.strip_prefix('d').unwrap_or(&s);
        match s {
            "0" => Some(DoseNumber::D0),
            "3" => Some(DoseNumber::D3),
            "7" => Some(DoseNumber::D7),
            "14" => Some(DoseNumber::D14),
            "28" | "28-30" | "30" => Some(DoseNumber::D28),
            _ => None,
        }
    }
}

/// Status of one dose visit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DoseStatus {
    #[default]
    Pending,
    Completed,
    Missed,
}

impl DoseStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DoseStatus::Pending => "pending",
            DoseStatus::Completed => "completed",
            DoseStatus::Missed => "missed",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(DoseStatus::Pending),
            "completed" => Some(DoseStatus::Completed),
            "missed" => Some(DoseStatus::Missed),
            _ => None,
        }
    }

    /// Completed and missed are terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DoseStatus::Pending)
    }
}

/// One scheduled dose and who last touched it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DoseSlot {
    /// Scheduled date
    pub date: Option<NaiveDate>,
    /// Visit status
    pub status: DoseStatus,
    /// Staff ID of last updater
    pub updated_by: Option<String>,
    /// Staff display name of last updater
    pub updated_by_name: Option<String>,
    /// Timestamp of last status update
    pub updated_at: Option<String>,
}

/// Overall treatment progress derived from the five dose statuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    /// All five doses completed
    Completed,
    /// At least one dose missed
    Incomplete,
    /// Still in progress
    Ongoing,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Completed => "completed",
            CompletionStatus::Incomplete => "incomplete",
            CompletionStatus::Ongoing => "ongoing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "completed" => Some(CompletionStatus::Completed),
            "incomplete" => Some(CompletionStatus::Incomplete),
            "ongoing" => Some(CompletionStatus::Ongoing),
            _ => None,
        }
    }
}

/// WHO exposure category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExposureCategory {
    /// Touching or feeding, licks on intact skin
    CategoryI,
    /// Nibbling of uncovered skin, minor scratches without bleeding
    CategoryII,
    /// Transdermal bites or scratches, licks on broken skin, bat contact
    CategoryIII,
}

impl ExposureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureCategory::CategoryI => "I",
            ExposureCategory::CategoryII => "II",
            ExposureCategory::CategoryIII => "III",
        }
    }

    /// Accepts "III", "cat iii", "category 3" and similar.
    pub fn parse(s: &str) -> Option<Self> {
        let folded = s.trim().to_uppercase();
        let tail = folded
            .trim_start_matches("CATEGORY")
            .trim_start_matches("CAT")
            .trim_start()
            .trim_start_matches('.')
            .trim();
        match tail {
            "I" | "1" => Some(ExposureCategory::CategoryI),
            "II" | "2" => Some(ExposureCategory::CategoryII),
            "III" | "3" => Some(ExposureCategory::CategoryIII),
            _ => None,
        }
    }
}

/// Biologics and adjuncts given during treatment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TreatmentKind {
    /// Purified Vero cell rabies vaccine
    Pvrv,
    /// Purified chick embryo cell vaccine
    Pcecv,
    /// Human rabies immunoglobulin
    Hrig,
    /// Equine rabies immunoglobulin
    Erig,
    /// Tetanus toxoid
    TetanusToxoid,
    /// Anti-tetanus serum
    Ats,
}

impl TreatmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreatmentKind::Pvrv => "pvrv",
            TreatmentKind::Pcecv => "pcecv",
            TreatmentKind::Hrig => "hrig",
            TreatmentKind::Erig => "erig",
            TreatmentKind::TetanusToxoid => "tetanus_toxoid",
            TreatmentKind::Ats => "ats",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "pvrv" => Some(TreatmentKind::Pvrv),
            "pcecv" => Some(TreatmentKind::Pcecv),
            "hrig" => Some(TreatmentKind::Hrig),
            "erig" => Some(TreatmentKind::Erig),
            "tetanus_toxoid" | "tt" => Some(TreatmentKind::TetanusToxoid),
            "ats" => Some(TreatmentKind::Ats),
            _ => None,
        }
    }

    /// Whether this is a rabies immunoglobulin.
    pub fn is_rig(&self) -> bool {
        matches!(self, TreatmentKind::Hrig | TreatmentKind::Erig)
    }
}

/// Rabies immunoglobulin administration details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RigDetails {
    /// HRIG or ERIG
    pub kind: TreatmentKind,
    /// Volume given in mL
    pub dose_ml: f64,
    /// Date given
    pub date_given: Option<NaiveDate>,
}

/// A patient's treatment encounter with its five-dose schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentRecord {
    /// Unique record ID
    pub record_id: String,
    /// Appointment this treatment started from, if any
    pub appointment_id: Option<String>,
    /// Patient identity
    pub patient: PatientInfo,
    /// Bite incident
    pub bite: BiteIncident,
    /// Exposure categories checked on the form
    pub exposure_categories: BTreeSet<ExposureCategory>,
    /// Vaccines and adjuncts selected
    pub treatments: BTreeSet<TreatmentKind>,
    /// RIG given, if any
    pub rig: Option<RigDetails>,
    /// Dose slots in schedule order (D0, D3, D7, D14, D28-30)
    pub doses: [DoseSlot; 5],
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl TreatmentRecord {
    /// Start a treatment with D0 on `d0_date`; later visits are scheduled
    /// by their day offsets.
    pub fn new(patient: PatientInfo, bite: BiteIncident, d0_date: NaiveDate) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let doses = DoseNumber::ALL.map(|dose| DoseSlot {
            date: Some(d0_date + Duration::days(dose.offset_days())),
            ..Default::default()
        });

        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            appointment_id: None,
            patient,
            bite,
            exposure_categories: BTreeSet::new(),
            treatments: BTreeSet::new(),
            rig: None,
            doses,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Get a dose slot.
    pub fn dose(&self, dose: DoseNumber) -> &DoseSlot {
        &self.doses[dose.index()]
    }

    /// Get a mutable dose slot.
    pub fn dose_mut(&mut self, dose: DoseNumber) -> &mut DoseSlot {
        &mut self.doses[dose.index()]
    }

    /// Derive overall completion from the dose statuses.
    pub fn completion_status(&self) -> CompletionStatus {
        if self.doses.iter().all(|d| d.status == DoseStatus::Completed) {
            CompletionStatus::Completed
        } else if self.doses.iter().any(|d| d.status == DoseStatus::Missed) {
            CompletionStatus::Incomplete
        } else {
            CompletionStatus::Ongoing
        }
    }

    /// Number of completed doses (out of five).
    pub fn doses_completed(&self) -> usize {
        self.doses
            .iter()
            .filter(|d| d.status == DoseStatus::Completed)
            .count()
    }

    /// First dose, in schedule order, scheduled on `today`.
    pub fn today_dose(&self, today: NaiveDate) -> Option<DoseNumber> {
        DoseNumber::ALL
            .into_iter()
            .find(|dose| self.dose(*dose).date == Some(today))
    }

    /// First dose still pending, in schedule order.
    pub fn next_pending_dose(&self) -> Option<DoseNumber> {
        DoseNumber::ALL
            .into_iter()
            .find(|dose| self.dose(*dose).status == DoseStatus::Pending)
    }
}
