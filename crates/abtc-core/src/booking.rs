//! Staff actions on appointments: confirm, cancel, complete, and start
//! a treatment record from a booking.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::db::{Database, DbError};
use crate::models::{Appointment, AppointmentStatus, TreatmentRecord};

/// Booking errors.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

pub type BookingResult<T> = Result<T, BookingError>;

/// Appointment desk for the admin and staff dashboards.
pub struct AppointmentDesk<'a> {
    db: &'a Database,
}

impl<'a> AppointmentDesk<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record a new patient booking.
    pub fn book(&self, appointment: &Appointment) -> BookingResult<()> {
        self.db.insert_appointment(appointment)?;
        info!(appointment_id = %appointment.appointment_id, "Appointment booked");
        Ok(())
    }

    /// Accept a pending booking.
    pub fn confirm(&self, appointment_id: &str) -> BookingResult<Appointment> {
        self.transition(appointment_id, AppointmentStatus::Confirmed)
    }

    /// Cancel a pending or confirmed booking.
    pub fn cancel(&self, appointment_id: &str) -> BookingResult<Appointment> {
        self.transition(appointment_id, AppointmentStatus::Cancelled)
    }

    /// Mark a confirmed booking as seen.
    pub fn complete(&self, appointment_id: &str) -> BookingResult<Appointment> {
        self.transition(appointment_id, AppointmentStatus::Completed)
    }

    /// Open a treatment record for a confirmed booking, with D0 on `d0_date`.
    ///
    /// The appointment is marked completed in the same step.
    pub fn start_treatment(
        &self,
        appointment_id: &str,
        d0_date: NaiveDate,
    ) -> BookingResult<TreatmentRecord> {
        let appointment = self.load(appointment_id)?;
        if appointment.status != AppointmentStatus::Confirmed {
            return Err(BookingError::InvalidTransition {
                from: appointment.status.as_str(),
                to: AppointmentStatus::Completed.as_str(),
            });
        }

        let mut record = TreatmentRecord::new(
            appointment.patient.clone(),
            appointment.bite.clone(),
            d0_date,
        );
        record.appointment_id = Some(appointment.appointment_id.clone());
        self.db.insert_treatment_record(&record)?;
        self.transition(appointment_id, AppointmentStatus::Completed)?;

        info!(
            appointment_id,
            record_id = %record.record_id,
            %d0_date,
            "Treatment started"
        );
        Ok(record)
    }

    fn load(&self, appointment_id: &str) -> BookingResult<Appointment> {
        self.db
            .get_appointment(appointment_id)?
            .ok_or_else(|| BookingError::NotFound(appointment_id.to_string()))
    }

    fn transition(
        &self,
        appointment_id: &str,
        next: AppointmentStatus,
    ) -> BookingResult<Appointment> {
        let appointment = self.load(appointment_id)?;
        if !appointment.status.can_transition_to(next) {
            return Err(BookingError::InvalidTransition {
                from: appointment.status.as_str(),
                to: next.as_str(),
            });
        }

        let updated = self.db.set_appointment_status(appointment_id, next)?;
        info!(
            appointment_id,
            from = appointment.status.as_str(),
            to = next.as_str(),
            "Appointment status changed"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BiteIncident, DoseNumber, PatientInfo};

    fn setup() -> (Database, Appointment) {
        let db = Database::open_in_memory().unwrap();
        let appt = Appointment::new(PatientInfo::new("Gabriela Silang"), BiteIncident::new("cat"));
        AppointmentDesk::new(&db).book(&appt).unwrap();
        (db, appt)
    }

    #[test]
    fn test_confirm_then_complete() {
        let (db, appt) = setup();
        let desk = AppointmentDesk::new(&db);

        let confirmed = desk.confirm(&appt.appointment_id).unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        let completed = desk.complete(&appt.appointment_id).unwrap();
        assert_eq!(completed.status, AppointmentStatus::Completed);
    }

    #[test]
    fn test_cannot_complete_pending() {
        let (db, appt) = setup();
        let desk = AppointmentDesk::new(&db);
        let result = desk.complete(&appt.appointment_id);
        assert!(matches!(result, Err(BookingError::InvalidTransition { .. })));

        let stored = db.get_appointment(&appt.appointment_id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Pending);
    }

    #[test]
    fn test_cancelled_is_final() {
        let (db, appt) = setup();
        let desk = AppointmentDesk::new(&db);
        desk.cancel(&appt.appointment_id).unwrap();
        assert!(desk.confirm(&appt.appointment_id).is_err());
        assert!(desk.cancel(&appt.appointment_id).is_err());
    }

    #[test]
    fn test_start_treatment() {
        let (db, appt) = setup();
        let desk = AppointmentDesk::new(&db);
        desk.confirm(&appt.appointment_id).unwrap();

        let d0 = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let record = desk.start_treatment(&appt.appointment_id, d0).unwrap();
        assert_eq!(record.appointment_id.as_deref(), Some(appt.appointment_id.as_str()));
        assert_eq!(record.patient.name, "Gabriela Silang");
        assert_eq!(record.dose(DoseNumber::D14).date, NaiveDate::from_ymd_opt(2024, 7, 15));

        let stored = db.get_appointment(&appt.appointment_id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Completed);
    }

    #[test]
    fn test_start_treatment_requires_confirmation() {
        let (db, appt) = setup();
        let desk = AppointmentDesk::new(&db);
        let d0 = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert!(desk.start_treatment(&appt.appointment_id, d0).is_err());
        assert!(db.list_treatment_records().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_appointment() {
        let db = Database::open_in_memory().unwrap();
        let desk = AppointmentDesk::new(&db);
        assert!(matches!(desk.confirm("nope"), Err(BookingError::NotFound(_))));
    }
}
