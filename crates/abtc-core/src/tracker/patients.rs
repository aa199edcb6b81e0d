//! Patient list and history views.

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::models::{CompletionStatus, DoseNumber, PatientInfo, TreatmentRecord};

/// Minimum similarity for a fuzzy name match.
const MIN_NAME_SIMILARITY: f64 = 0.85;

/// Filter for the patient list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientFilter {
    /// Only records with this completion status
    pub completion: Option<CompletionStatus>,
    /// Name query (substring or fuzzy match)
    pub name: Option<String>,
    /// Only this barangay (residence, case-insensitive)
    pub barangay: Option<String>,
}

/// One row of the patient list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSummary {
    pub record_id: String,
    pub patient_name: String,
    pub barangay: Option<String>,
    pub biting_animal: String,
    pub completion: CompletionStatus,
    /// Completed doses out of five
    pub doses_completed: usize,
    pub next_pending_dose: Option<DoseNumber>,
    pub created_at: String,
}

impl PatientSummary {
    pub fn from_record(record: TreatmentRecord) -> Self {
        Self {
            completion: record.completion_status(),
            doses_completed: record.doses_completed(),
            next_pending_dose: record.next_pending_dose(),
            record_id: record.record_id,
            patient_name: record.patient.name,
            barangay: record.patient.barangay,
            biting_animal: record.bite.biting_animal,
            created_at: record.created_at,
        }
    }
}

/// Whether `name` matches the query by substring or by close spelling.
pub fn name_matches(name: &str, query: &str) -> bool {
    let name = PatientInfo::new(name).normalized_name();
    let query = PatientInfo::new(query).normalized_name();
    if query.is_empty() || name.contains(&query) {
        return true;
    }
    jaro_winkler(&name, &query) >= MIN_NAME_SIMILARITY
        || name
            .split_whitespace()
            .any(|part| jaro_winkler(part, &query) >= MIN_NAME_SIMILARITY)
}

pub(crate) fn summarize(
    records: Vec<TreatmentRecord>,
    filter: &PatientFilter,
) -> Vec<PatientSummary> {
    records
        .into_iter()
        .filter(|r| {
            filter
                .completion
                .map_or(true, |c| r.completion_status() == c)
        })
        .filter(|r| {
            filter
                .name
                .as_deref()
                .map_or(true, |q| name_matches(&r.patient.name, q))
        })
        .filter(|r| {
            filter.barangay.as_deref().map_or(true, |b| {
                r.patient
                    .barangay
                    .as_deref()
                    .is_some_and(|pb| pb.trim().eq_ignore_ascii_case(b.trim()))
            })
        })
        .map(PatientSummary::from_record)
        .collect()
}
