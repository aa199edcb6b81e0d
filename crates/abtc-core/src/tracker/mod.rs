//! Dose tracker: the per-dose state machines of a treatment record.
//!
//! Each of the five dose slots moves `pending → completed` or
//! `pending → missed`. Staff updates go through [`DoseTracker`], which
//! applies a [`TransitionPolicy`] before anything is written.

mod patients;
mod statistics;

pub use patients::*;
pub use statistics::*;

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{Database, DbError};
use crate::models::{
    CompletionStatus, DoseNumber, DoseSlot, DoseStatus, RigDetails, TreatmentRecord,
};

/// Guarded dose writes re-read and retry this many times before giving up.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Tracker errors.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Treatment record not found: {0}")]
    RecordNotFound(String),

    #[error("Illegal dose transition for {dose}: {from} -> {to}")]
    IllegalTransition {
        dose: &'static str,
        from: &'static str,
        to: &'static str,
    },

    #[error("Invalid RIG details: {0}")]
    InvalidRig(String),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Which dose status changes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Only `pending → completed` and `pending → missed`; re-writing the
    /// current terminal status is accepted as a no-op.
    #[default]
    Monotonic,
    /// Any status may be written at any time.
    Permissive,
}

impl TransitionPolicy {
    /// Parse a configuration value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "monotonic" | "strict" => Some(TransitionPolicy::Monotonic),
            "permissive" | "lenient" => Some(TransitionPolicy::Permissive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionPolicy::Monotonic => "monotonic",
            TransitionPolicy::Permissive => "permissive",
        }
    }

    /// Whether `from → to` is allowed under this policy.
    pub fn allows(&self, from: DoseStatus, to: DoseStatus) -> bool {
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Monotonic => from == DoseStatus::Pending || from == to,
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive overall completion from the five dose statuses.
pub fn completion_status(record: &TreatmentRecord) -> CompletionStatus {
    record.completion_status()
}

/// Lowest-ordered dose scheduled on `today`, if any.
pub fn today_dose(record: &TreatmentRecord, today: NaiveDate) -> Option<DoseNumber> {
    record.today_dose(today)
}

/// Dose tracker over the treatment records table.
pub struct DoseTracker<'a> {
    db: &'a Database,
    policy: TransitionPolicy,
}

impl<'a> DoseTracker<'a> {
    /// Create a tracker with the default (monotonic) policy.
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            policy: TransitionPolicy::default(),
        }
    }

    /// Use a specific transition policy.
    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active transition policy.
    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Record a staff action on one dose slot.
    ///
    /// Writes status, updater and timestamp for the slot. A rejected
    /// transition or a failed write leaves the stored record unchanged.
    /// Under `Monotonic` the write is conditional on the status that was
    /// checked, so a second handle that got there first is re-checked
    /// instead of overwritten.
    pub fn update_dose_status(
        &self,
        record_id: &str,
        dose: DoseNumber,
        new_status: DoseStatus,
        updated_by: &str,
        updated_by_name: &str,
    ) -> TrackerResult<TreatmentRecord> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let record = self
                .db
                .get_treatment_record(record_id)?
                .ok_or_else(|| TrackerError::RecordNotFound(record_id.to_string()))?;

            let current = record.dose(dose);
            if !self.policy.allows(current.status, new_status) {
                warn!(
                    record_id,
                    dose = dose.label(),
                    from = current.status.as_str(),
                    to = new_status.as_str(),
                    "Rejected dose status change"
                );
                return Err(TrackerError::IllegalTransition {
                    dose: dose.label(),
                    from: current.status.as_str(),
                    to: new_status.as_str(),
                });
            }

            let slot = DoseSlot {
                date: current.date,
                status: new_status,
                updated_by: Some(updated_by.to_string()),
                updated_by_name: Some(updated_by_name.to_string()),
                updated_at: Some(chrono::Utc::now().to_rfc3339()),
            };
            let expected = match self.policy {
                TransitionPolicy::Monotonic => Some(current.status),
                TransitionPolicy::Permissive => None,
            };

            match self.db.update_dose_slot(record_id, dose, &slot, expected) {
                Ok(updated) => {
                    info!(
                        record_id,
                        dose = dose.label(),
                        status = new_status.as_str(),
                        updated_by,
                        completion = updated.completion_status().as_str(),
                        "Dose status updated"
                    );
                    return Ok(updated);
                }
                Err(DbError::Conflict(msg)) if attempts < MAX_WRITE_ATTEMPTS => {
                    debug!(record_id, dose = dose.label(), %msg, "Dose slot moved, re-checking");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Move a dose to a new scheduled date (status untouched).
    pub fn reschedule_dose(
        &self,
        record_id: &str,
        dose: DoseNumber,
        date: NaiveDate,
    ) -> TrackerResult<TreatmentRecord> {
        let updated = self
            .db
            .update_dose_date(record_id, dose, date)
            .map_err(|e| match e {
                DbError::NotFound(_) => TrackerError::RecordNotFound(record_id.to_string()),
                other => other.into(),
            })?;
        info!(record_id, dose = dose.label(), %date, "Dose rescheduled");
        Ok(updated)
    }

    /// Record (or with `None`, clear) the immunoglobulin given to a patient.
    ///
    /// Only HRIG and ERIG are accepted, with a positive volume. The kind is
    /// added to the record's treatments.
    pub fn record_rig(
        &self,
        record_id: &str,
        rig: Option<RigDetails>,
    ) -> TrackerResult<TreatmentRecord> {
        if let Some(rig) = &rig {
            if !rig.kind.is_rig() {
                return Err(TrackerError::InvalidRig(format!(
                    "{} is not an immunoglobulin",
                    rig.kind.as_str()
                )));
            }
            if !(rig.dose_ml.is_finite() && rig.dose_ml > 0.0) {
                return Err(TrackerError::InvalidRig(format!(
                    "volume must be positive, got {}",
                    rig.dose_ml
                )));
            }
        }

        let mut record = self
            .db
            .get_treatment_record(record_id)?
            .ok_or_else(|| TrackerError::RecordNotFound(record_id.to_string()))?;
        if let Some(rig) = &rig {
            record.treatments.insert(rig.kind);
        }
        record.rig = rig;
        let updated = self.db.update_treatment_record(&record)?;
        info!(
            record_id,
            rig = updated.rig.as_ref().map(|r| r.kind.as_str()),
            "RIG recorded"
        );
        Ok(updated)
    }

    /// Patients whose dose scheduled for `today` is still pending.
    pub fn patients_due_today(&self, today: NaiveDate) -> TrackerResult<Vec<DueDose>> {
        let records = self.db.list_treatment_records()?;
        let mut due: Vec<DueDose> = records
            .into_iter()
            .filter_map(|record| {
                let dose = record.today_dose(today)?;
                (record.dose(dose).status == DoseStatus::Pending)
                    .then_some(DueDose { dose, record })
            })
            .collect();
        due.sort_by(|a, b| {
            a.dose
                .cmp(&b.dose)
                .then_with(|| a.record.patient.name.cmp(&b.record.patient.name))
        });
        Ok(due)
    }

    /// Pending/completed/missed counts per dose across all records.
    pub fn dose_statistics(&self) -> TrackerResult<DoseStatistics> {
        let records = self.db.list_treatment_records()?;
        Ok(DoseStatistics::from_records(&records))
    }

    /// Patient list with derived completion status, optionally filtered.
    pub fn patient_list(&self, filter: &PatientFilter) -> TrackerResult<Vec<PatientSummary>> {
        let records = self.db.list_treatment_records()?;
        Ok(patients::summarize(records, filter))
    }

    /// Every treatment record for one patient, oldest first.
    pub fn patient_history(&self, patient_name: &str) -> TrackerResult<Vec<PatientSummary>> {
        let records = self.db.list_records_for_patient(patient_name)?;
        Ok(records.into_iter().map(PatientSummary::from_record).collect())
    }
}

/// A record with the dose scheduled for today.
#[derive(Debug, Clone, PartialEq)]
pub struct DueDose {
    /// The dose scheduled today
    pub dose: DoseNumber,
    /// The record it belongs to
    pub record: TreatmentRecord,
}
