//! Analytics over appointment records.
//!
//! Every report is a full recomputation over the fetched appointments:
//! group by biting animal, bite time slot, age bucket, barangay and
//! month. Fields that cannot be parsed are counted as skipped and left
//! out of their chart instead of failing the report.

mod buckets;
mod normalizer;

pub use buckets::*;
pub use normalizer::*;

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Appointment, AppointmentStatus};

/// One labelled bar of a chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountBucket {
    pub label: String,
    pub count: usize,
}

/// Cases in one calendar month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthCount {
    pub year: i32,
    pub month: u32,
    pub count: usize,
}

/// How many appointments were left out of each chart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SkippedFields {
    /// Missing or unparseable bite time, or outside charted hours
    pub time: usize,
    /// Missing age
    pub age: usize,
    /// No usable date
    pub date: usize,
    /// No barangay
    pub barangay: usize,
}

/// Restricts which appointments enter a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsFilter {
    /// Only incidents in this calendar year
    pub year: Option<i32>,
    /// Only appointments in this status
    pub status: Option<AppointmentStatus>,
}

/// Full analytics payload for the dashboard charts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsReport {
    pub total: usize,
    pub by_status: Vec<CountBucket>,
    pub by_animal: Vec<CountBucket>,
    pub by_time_slot: Vec<CountBucket>,
    pub by_age: Vec<CountBucket>,
    pub by_barangay: Vec<CountBucket>,
    pub by_month: Vec<MonthCount>,
    pub skipped: SkippedFields,
}

impl AnalyticsReport {
    /// Build a report with the default animal vocabulary.
    pub fn build(appointments: &[Appointment], filter: &AnalyticsFilter) -> Self {
        Self::build_with(appointments, filter, &AnimalNormalizer::new())
    }

    /// Build a report with a custom animal normalizer.
    pub fn build_with(
        appointments: &[Appointment],
        filter: &AnalyticsFilter,
        normalizer: &AnimalNormalizer,
    ) -> Self {
        let selected: Vec<&Appointment> = appointments
            .iter()
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .filter(|a| {
                filter
                    .year
                    .map_or(true, |y| incident_date(a).is_some_and(|d| d.year() == y))
            })
            .collect();

        let mut skipped = SkippedFields::default();

        let mut status_counts: HashMap<AppointmentStatus, usize> = HashMap::new();
        let mut animal_counts: HashMap<String, usize> = HashMap::new();
        let mut slot_counts: HashMap<TimeSlot, usize> = HashMap::new();
        let mut age_counts: HashMap<AgeBucket, usize> = HashMap::new();
        let mut month_counts: BTreeMap<(i32, u32), usize> = BTreeMap::new();
        // Folded name → (display name of first occurrence, count)
        let mut barangay_counts: HashMap<String, (String, usize)> = HashMap::new();

        for appt in &selected {
            *status_counts.entry(appt.status).or_default() += 1;
            *animal_counts
                .entry(normalizer.normalize(&appt.bite.biting_animal))
                .or_default() += 1;

            match appt.bite.bite_time.as_deref().and_then(TimeSlot::from_text) {
                Some(slot) => *slot_counts.entry(slot).or_default() += 1,
                None => {
                    debug!(appointment_id = %appt.appointment_id, "Skipping bite time");
                    skipped.time += 1;
                }
            }

            match appt.patient.age {
                Some(age) => *age_counts.entry(AgeBucket::from_age(age)).or_default() += 1,
                None => skipped.age += 1,
            }

            match incident_date(appt) {
                Some(date) => *month_counts.entry((date.year(), date.month())).or_default() += 1,
                None => {
                    debug!(appointment_id = %appt.appointment_id, "Skipping undated appointment");
                    skipped.date += 1;
                }
            }

            match appt.barangay() {
                Some(name) => {
                    let display = name.split_whitespace().collect::<Vec<_>>().join(" ");
                    barangay_counts
                        .entry(display.to_lowercase())
                        .or_insert_with(|| (display, 0))
                        .1 += 1;
                }
                None => skipped.barangay += 1,
            }
        }

        Self {
            total: selected.len(),
            by_status: AppointmentStatus::ALL
                .iter()
                .map(|s| bucket(s.as_str(), status_counts.get(s).copied().unwrap_or(0)))
                .collect(),
            by_animal: ranked(animal_counts.into_iter()),
            by_time_slot: TimeSlot::ALL
                .iter()
                .map(|s| bucket(s.label(), slot_counts.get(s).copied().unwrap_or(0)))
                .collect(),
            by_age: AgeBucket::ALL
                .iter()
                .map(|a| bucket(a.label(), age_counts.get(a).copied().unwrap_or(0)))
                .collect(),
            by_barangay: ranked(barangay_counts.into_values()),
            by_month: month_counts
                .into_iter()
                .map(|((year, month), count)| MonthCount { year, month, count })
                .collect(),
            skipped,
        }
    }

    /// Count for one animal bucket (0 when absent).
    pub fn animal_count(&self, animal: &str) -> usize {
        self.by_animal
            .iter()
            .find(|b| b.label == animal)
            .map_or(0, |b| b.count)
    }

    /// Distinct years present, ascending (for the year selector).
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.by_month.iter().map(|m| m.year).collect();
        years.dedup();
        years
    }

    /// Serialize for the dashboard.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Date of the incident, falling back to the booking date.
pub fn incident_date(appt: &Appointment) -> Option<NaiveDate> {
    appt.bite.bite_date.or_else(|| {
        appt.created_at
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    })
}

fn bucket(label: &str, count: usize) -> CountBucket {
    CountBucket {
        label: label.to_string(),
        count,
    }
}

/// Sort by count descending, then label.
fn ranked(counts: impl Iterator<Item = (String, usize)>) -> Vec<CountBucket> {
    let mut buckets: Vec<CountBucket> = counts
        .map(|(label, count)| CountBucket { label, count })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    buckets
}
