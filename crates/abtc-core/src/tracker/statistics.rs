//! Per-dose queue statistics.

use serde::{Deserialize, Serialize};

use crate::models::{DoseNumber, DoseStatus, TreatmentRecord};

/// Status counts for one dose number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DoseCounts {
    pub pending: usize,
    pub completed: usize,
    pub missed: usize,
}

impl DoseCounts {
    /// Total records counted.
    pub fn total(&self) -> usize {
        self.pending + self.completed + self.missed
    }

    fn add(&mut self, status: DoseStatus) {
        match status {
            DoseStatus::Pending => self.pending += 1,
            DoseStatus::Completed => self.completed += 1,
            DoseStatus::Missed => self.missed += 1,
        }
    }
}

/// Counts for every dose number, in schedule order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DoseStatistics {
    pub per_dose: Vec<(DoseNumber, DoseCounts)>,
}

impl DoseStatistics {
    /// Tally dose statuses across records.
    pub fn from_records(records: &[TreatmentRecord]) -> Self {
        let mut counts = [DoseCounts::default(); 5];
        for record in records {
            for dose in DoseNumber::ALL {
                counts[dose.index()].add(record.dose(dose).status);
            }
        }

        Self {
            per_dose: DoseNumber::ALL.into_iter().zip(counts).collect(),
        }
    }

    /// Counts for a single dose.
    pub fn for_dose(&self, dose: DoseNumber) -> DoseCounts {
        self.per_dose
            .iter()
            .find(|(d, _)| *d == dose)
            .map(|(_, c)| *c)
            .unwrap_or_default()
    }
}
