//! ABTC Core Library
//!
//! Clinic core for a municipal Animal Bite Treatment Center: patient
//! bookings, the five-dose post-exposure schedule, dashboards and the
//! barangay case map.
//!
//! # Architecture
//!
//! ```text
//!   Patient booking ──► appointments (pending)
//!                             │  staff confirm / cancel
//!                             ▼
//!                       confirmed ──► start treatment ──► treatment_records
//!                                                               │
//!                                   D0 → D3 → D7 → D14 → D28-30 │ dose updates
//!                                                               ▼
//!                ┌──────────────┬───────────────┬──────────────┴─────┐
//!                ▼              ▼               ▼                    ▼
//!            Analytics      Barangay map    Due today           change_log
//!            (charts)       (case counts)   (per dose)       ──► realtime feed
//! ```
//!
//! Every write appends to `change_log` in the same transaction, so the
//! feed never shows a change that was rolled back.
//!
//! # Modules
//!
//! - [`db`]: SQLite table store with change log
//! - [`models`]: Domain types (Appointment, TreatmentRecord, StaffProfile, etc.)
//! - [`booking`]: Appointment status transitions and treatment start
//! - [`tracker`]: Dose status state model, due-today queue, patient list
//! - [`analytics`]: Chart aggregation (animal, time slot, age, barangay, month)
//! - [`geo`]: Barangay coordinates and case-count markers
//! - [`groups`]: Patient groups with prescription files
//! - [`auth`]: Staff sign-in, sessions, role checks
//! - [`feed`]: Filtered change subscriptions
//! - [`config`]: Environment configuration

pub mod analytics;
pub mod auth;
pub mod booking;
pub mod config;
pub mod db;
pub mod feed;
pub mod geo;
pub mod groups;
pub mod logging;
pub mod models;
pub mod tracker;

// Re-export commonly used types
pub use analytics::{AnalyticsFilter, AnalyticsReport, AnimalNormalizer};
pub use auth::{Session, SessionEvent, SessionManager};
pub use booking::AppointmentDesk;
pub use config::ClinicConfig;
pub use db::{AppointmentQuery, Database, Page};
pub use feed::{ChangeFeed, ChangeFilter};
pub use geo::{BarangayCases, BarangayLocator};
pub use groups::GroupManager;
pub use logging::init_logging;
pub use models::{
    Appointment, AppointmentStatus, BiteIncident, ChangeEvent, CompletionStatus, DoseNumber,
    DoseStatus, PatientGroup, PatientInfo, Role, StaffProfile, TreatmentRecord, VaccineItem,
};
pub use tracker::{DoseTracker, PatientFilter, PatientSummary, TransitionPolicy};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use models::{ChangeKind, ChangeTable, DoseSlot, ExposureCategory, RigDetails, TreatmentKind};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum AbtcError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for AbtcError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => AbtcError::NotFound(what),
            db::DbError::Conflict(msg) => AbtcError::InvalidTransition(msg),
            other => AbtcError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AbtcError {
    fn from(e: serde_json::Error) -> Self {
        AbtcError::SerializationError(e.to_string())
    }
}

impl From<booking::BookingError> for AbtcError {
    fn from(e: booking::BookingError) -> Self {
        match e {
            booking::BookingError::Database(db) => db.into(),
            booking::BookingError::NotFound(id) => AbtcError::NotFound(id),
            other @ booking::BookingError::InvalidTransition { .. } => {
                AbtcError::InvalidTransition(other.to_string())
            }
        }
    }
}

impl From<tracker::TrackerError> for AbtcError {
    fn from(e: tracker::TrackerError) -> Self {
        match e {
            tracker::TrackerError::Database(db) => db.into(),
            tracker::TrackerError::RecordNotFound(id) => AbtcError::NotFound(id),
            other @ tracker::TrackerError::IllegalTransition { .. } => {
                AbtcError::InvalidTransition(other.to_string())
            }
            other @ tracker::TrackerError::InvalidRig(_) => {
                AbtcError::InvalidInput(other.to_string())
            }
        }
    }
}

impl From<auth::AuthError> for AbtcError {
    fn from(e: auth::AuthError) -> Self {
        match e {
            auth::AuthError::Database(db) => db.into(),
            other @ auth::AuthError::WeakPassword(_) => AbtcError::InvalidInput(other.to_string()),
            other => AbtcError::Unauthorized(other.to_string()),
        }
    }
}

impl From<groups::GroupError> for AbtcError {
    fn from(e: groups::GroupError) -> Self {
        match e {
            groups::GroupError::Database(db) => db.into(),
            other @ (groups::GroupError::EmptyName | groups::GroupError::EmptyFile) => {
                AbtcError::InvalidInput(other.to_string())
            }
            other => AbtcError::NotFound(other.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for AbtcError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        AbtcError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path with default settings.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<AbtcCore>, AbtcError> {
    let config = ClinicConfig {
        db_path: path,
        ..Default::default()
    };
    AbtcCore::open(Database::open(&config.db_path)?, config)
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<AbtcCore>, AbtcError> {
    AbtcCore::open(Database::open_in_memory()?, ClinicConfig::default())
}

/// Open the database named by `ABTC_DB_PATH`, with logging enabled.
#[uniffi::export]
pub fn open_database_from_env() -> Result<Arc<AbtcCore>, AbtcError> {
    init_logging();
    let config = ClinicConfig::load();
    AbtcCore::open(Database::open(&config.db_path)?, config)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe clinic handle for FFI.
///
/// Locks are always taken in field order (db, sessions, feed,
/// subscriptions).
#[derive(uniffi::Object)]
pub struct AbtcCore {
    db: Arc<Mutex<Database>>,
    sessions: Mutex<SessionManager>,
    feed: Mutex<ChangeFeed>,
    subscriptions: Mutex<HashMap<u64, feed::Subscription>>,
    config: ClinicConfig,
}

impl AbtcCore {
    fn open(db: Database, config: ClinicConfig) -> Result<Arc<Self>, AbtcError> {
        let feed = ChangeFeed::starting_at(db.latest_change_seq()?);
        Ok(Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            sessions: Mutex::new(SessionManager::new()),
            feed: Mutex::new(feed),
            subscriptions: Mutex::new(HashMap::new()),
            config,
        }))
    }

    /// Current session if it has at least `role`.
    fn require(&self, role: Role) -> Result<Session, AbtcError> {
        let sessions = self.sessions.lock()?;
        Ok(sessions.require_role(role)?.clone())
    }

    fn tracker<'a>(&self, db: &'a Database) -> DoseTracker<'a> {
        DoseTracker::new(db).with_policy(self.config.dose_policy)
    }

    /// Push freshly logged changes to subscribers.
    fn publish(&self, db: &Database) -> Result<(), AbtcError> {
        self.feed.lock()?.pump(db)?;
        Ok(())
    }

    fn subscribe(&self, filter: ChangeFilter) -> Result<u64, AbtcError> {
        let subscription = self.feed.lock()?.subscribe(filter);
        let id = subscription.id.0;
        self.subscriptions.lock()?.insert(id, subscription);
        Ok(id)
    }
}

#[uniffi::export]
impl AbtcCore {
    // =========================================================================
    // Auth Operations
    // =========================================================================

    /// Create a staff account. Needs an admin session once any account exists.
    pub fn register_staff(
        &self,
        email: String,
        full_name: String,
        role: String,
        password: String,
    ) -> Result<FfiStaff, AbtcError> {
        let role = parse_role(&role)?;
        let db = self.db.lock()?;
        let sessions = self.sessions.lock()?;
        let staff = sessions.register_staff(&db, &email, full_name, role, &password)?;
        Ok(staff.into())
    }

    pub fn sign_in(&self, email: String, password: String) -> Result<FfiSession, AbtcError> {
        let db = self.db.lock()?;
        let mut sessions = self.sessions.lock()?;
        Ok(sessions.sign_in(&db, &email, &password)?.into())
    }

    /// Returns false if nobody was signed in.
    pub fn sign_out(&self) -> Result<bool, AbtcError> {
        Ok(self.sessions.lock()?.sign_out().is_some())
    }

    pub fn current_session(&self) -> Result<Option<FfiSession>, AbtcError> {
        Ok(self.sessions.lock()?.current_session().cloned().map(Into::into))
    }

    /// Staff accounts by name (admin only).
    pub fn list_staff(&self) -> Result<Vec<FfiStaff>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Admin)?;
        Ok(db.list_staff()?.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// Public booking form. No session needed.
    pub fn book_appointment(
        &self,
        patient: FfiPatientInfo,
        bite: FfiBiteIncident,
        preferred_date: Option<String>,
    ) -> Result<FfiAppointment, AbtcError> {
        let patient: PatientInfo = patient.into();
        if patient.name.trim().is_empty() {
            return Err(AbtcError::InvalidInput("Patient name is required".into()));
        }
        let mut appointment = Appointment::new(patient, bite.try_into()?);
        appointment.preferred_date = parse_optional_date(preferred_date.as_deref())?;

        let db = self.db.lock()?;
        AppointmentDesk::new(&db).book(&appointment)?;
        self.publish(&db)?;
        Ok(appointment.into())
    }

    pub fn get_appointment(
        &self,
        appointment_id: String,
    ) -> Result<Option<FfiAppointment>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        Ok(db.get_appointment(&appointment_id)?.map(Into::into))
    }

    /// One page of the appointment table, newest first.
    pub fn list_appointments(
        &self,
        status: Option<String>,
        search: Option<String>,
        barangay: Option<String>,
        page: u32,
    ) -> Result<FfiAppointmentPage, AbtcError> {
        let query = AppointmentQuery {
            status: status.as_deref().map(parse_appointment_status).transpose()?,
            search,
            barangay,
            page: page.max(1) as usize,
            page_size: self.config.page_size,
            ..Default::default()
        };
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        Ok(db.list_appointments(&query)?.into())
    }

    pub fn confirm_appointment(&self, appointment_id: String) -> Result<FfiAppointment, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let updated = AppointmentDesk::new(&db).confirm(&appointment_id)?;
        self.publish(&db)?;
        Ok(updated.into())
    }

    pub fn cancel_appointment(&self, appointment_id: String) -> Result<FfiAppointment, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let updated = AppointmentDesk::new(&db).cancel(&appointment_id)?;
        self.publish(&db)?;
        Ok(updated.into())
    }

    pub fn complete_appointment(
        &self,
        appointment_id: String,
    ) -> Result<FfiAppointment, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let updated = AppointmentDesk::new(&db).complete(&appointment_id)?;
        self.publish(&db)?;
        Ok(updated.into())
    }

    /// Open a treatment record from a confirmed appointment.
    pub fn start_treatment(
        &self,
        appointment_id: String,
        d0_date: String,
    ) -> Result<FfiTreatmentRecord, AbtcError> {
        let d0 = parse_date(&d0_date)?;
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let record = AppointmentDesk::new(&db).start_treatment(&appointment_id, d0)?;
        self.publish(&db)?;
        Ok(record.into())
    }

    // =========================================================================
    // Treatment Operations
    // =========================================================================

    /// Open a treatment record for a walk-in patient.
    pub fn create_treatment_record(
        &self,
        patient: FfiPatientInfo,
        bite: FfiBiteIncident,
        d0_date: String,
    ) -> Result<FfiTreatmentRecord, AbtcError> {
        let record = TreatmentRecord::new(patient.into(), bite.try_into()?, parse_date(&d0_date)?);
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        db.insert_treatment_record(&record)?;
        self.publish(&db)?;
        Ok(record.into())
    }

    pub fn get_treatment_record(
        &self,
        record_id: String,
    ) -> Result<Option<FfiTreatmentRecord>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        Ok(db.get_treatment_record(&record_id)?.map(Into::into))
    }

    /// Set exposure categories and treatments given (dose slots untouched).
    pub fn update_treatment_details(
        &self,
        record_id: String,
        exposure_categories: Vec<String>,
        treatments: Vec<String>,
    ) -> Result<FfiTreatmentRecord, AbtcError> {
        let categories = exposure_categories
            .iter()
            .map(|c| {
                ExposureCategory::parse(c).ok_or_else(|| {
                    AbtcError::InvalidInput(format!("Unknown exposure category: {}", c))
                })
            })
            .collect::<Result<_, _>>()?;
        let kinds = treatments
            .iter()
            .map(|t| {
                TreatmentKind::parse(t)
                    .ok_or_else(|| AbtcError::InvalidInput(format!("Unknown treatment: {}", t)))
            })
            .collect::<Result<_, _>>()?;

        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let mut record = db
            .get_treatment_record(&record_id)?
            .ok_or_else(|| AbtcError::NotFound(record_id.clone()))?;
        record.exposure_categories = categories;
        record.treatments = kinds;
        let updated = db.update_treatment_record(&record)?;
        self.publish(&db)?;
        Ok(updated.into())
    }

    /// Record the immunoglobulin given (HRIG or ERIG), or clear it with `None`.
    pub fn record_rig(
        &self,
        record_id: String,
        rig: Option<FfiRigDetails>,
    ) -> Result<FfiTreatmentRecord, AbtcError> {
        let rig = rig.map(RigDetails::try_from).transpose()?;
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let updated = self.tracker(&db).record_rig(&record_id, rig)?;
        self.publish(&db)?;
        Ok(updated.into())
    }

    /// Mark one dose completed or missed, stamped with the signed-in staff.
    pub fn update_dose_status(
        &self,
        record_id: String,
        dose: String,
        status: String,
    ) -> Result<FfiTreatmentRecord, AbtcError> {
        let dose = parse_dose(&dose)?;
        let status = DoseStatus::parse(&status)
            .ok_or_else(|| AbtcError::InvalidInput(format!("Unknown dose status: {}", status)))?;

        let db = self.db.lock()?;
        let session = self.require(Role::Staff)?;
        let updated = self.tracker(&db).update_dose_status(
            &record_id,
            dose,
            status,
            &session.staff_id,
            &session.full_name,
        )?;
        self.publish(&db)?;
        Ok(updated.into())
    }

    pub fn reschedule_dose(
        &self,
        record_id: String,
        dose: String,
        date: String,
    ) -> Result<FfiTreatmentRecord, AbtcError> {
        let dose = parse_dose(&dose)?;
        let date = parse_date(&date)?;
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let updated = self.tracker(&db).reschedule_dose(&record_id, dose, date)?;
        self.publish(&db)?;
        Ok(updated.into())
    }

    /// Patients with a pending dose scheduled today (clinic-local date).
    pub fn patients_due_today(&self) -> Result<Vec<FfiDueDose>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let due = self.tracker(&db).patients_due_today(self.config.today())?;
        Ok(due.into_iter().map(Into::into).collect())
    }

    pub fn dose_statistics(&self) -> Result<Vec<FfiDoseCounts>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let stats = self.tracker(&db).dose_statistics()?;
        Ok(stats
            .per_dose
            .into_iter()
            .map(|(dose, counts)| FfiDoseCounts {
                dose: dose.label().to_string(),
                pending: counts.pending as u32,
                completed: counts.completed as u32,
                missed: counts.missed as u32,
            })
            .collect())
    }

    pub fn patient_list(
        &self,
        completion: Option<String>,
        name: Option<String>,
        barangay: Option<String>,
    ) -> Result<Vec<FfiPatientSummary>, AbtcError> {
        let completion = completion
            .as_deref()
            .map(|c| {
                CompletionStatus::parse(c).ok_or_else(|| {
                    AbtcError::InvalidInput(format!("Unknown completion status: {}", c))
                })
            })
            .transpose()?;
        let filter = PatientFilter {
            completion,
            name,
            barangay,
        };
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let list = self.tracker(&db).patient_list(&filter)?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub fn patient_history(
        &self,
        patient_name: String,
    ) -> Result<Vec<FfiPatientSummary>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let history = self.tracker(&db).patient_history(&patient_name)?;
        Ok(history.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Analytics Operations
    // =========================================================================

    /// Full chart payload as JSON.
    pub fn analytics_json(
        &self,
        year: Option<i32>,
        status: Option<String>,
    ) -> Result<String, AbtcError> {
        let filter = AnalyticsFilter {
            year,
            status: status.as_deref().map(parse_appointment_status).transpose()?,
        };
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let appointments = db.list_all_appointments()?;
        Ok(AnalyticsReport::build(&appointments, &filter).to_json()?)
    }

    /// Case-count markers for the barangay map.
    pub fn map_cases(&self, year: Option<i32>) -> Result<Vec<FfiBarangayCases>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let appointments: Vec<Appointment> = db
            .list_all_appointments()?
            .into_iter()
            .filter(|a| {
                year.map_or(true, |y| {
                    analytics::incident_date(a).is_some_and(|d| chrono::Datelike::year(&d) == y)
                })
            })
            .collect();
        let markers = BarangayLocator::new().case_counts(&appointments);
        Ok(markers.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Group Operations
    // =========================================================================

    pub fn create_group(&self, name: String) -> Result<FfiGroupSummary, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let group = GroupManager::new(&db).create(&name)?;
        self.publish(&db)?;
        Ok(groups::GroupSummary::from(&group).into())
    }

    pub fn list_groups(&self) -> Result<Vec<FfiGroupSummary>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        Ok(GroupManager::new(&db).list()?.into_iter().map(Into::into).collect())
    }

    pub fn add_group_patient(
        &self,
        group_id: String,
        record_id: String,
    ) -> Result<bool, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let added = GroupManager::new(&db).add_patient(&group_id, &record_id)?;
        self.publish(&db)?;
        Ok(added)
    }

    pub fn remove_group_patient(
        &self,
        group_id: String,
        record_id: String,
    ) -> Result<bool, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let removed = GroupManager::new(&db).remove_patient(&group_id, &record_id)?;
        self.publish(&db)?;
        Ok(removed)
    }

    pub fn group_members(&self, group_id: String) -> Result<Vec<FfiPatientSummary>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let members = GroupManager::new(&db).members(&group_id)?;
        Ok(members.into_iter().map(Into::into).collect())
    }

    /// Upload a prescription file to a group. Size and digest come from `content`.
    pub fn attach_group_file(
        &self,
        group_id: String,
        file_name: String,
        content_type: String,
        content: Vec<u8>,
    ) -> Result<FfiPrescriptionFile, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let file =
            GroupManager::new(&db).attach_file(&group_id, &file_name, &content_type, &content)?;
        self.publish(&db)?;
        Ok(file.into())
    }

    /// Download the bytes of an attached prescription file.
    pub fn group_file_content(&self, file_id: String) -> Result<Vec<u8>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        Ok(GroupManager::new(&db).file_content(&file_id)?)
    }

    pub fn group_files(&self, group_id: String) -> Result<Vec<FfiPrescriptionFile>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let group = GroupManager::new(&db).get(&group_id)?;
        Ok(group.files.into_iter().map(Into::into).collect())
    }

    pub fn delete_group(&self, group_id: String) -> Result<(), AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        GroupManager::new(&db).delete(&group_id)?;
        self.publish(&db)?;
        Ok(())
    }

    // =========================================================================
    // Vaccine Catalog Operations
    // =========================================================================

    /// Add or update a catalog item (admin only).
    pub fn upsert_vaccine(&self, item: FfiVaccine) -> Result<(), AbtcError> {
        let item: VaccineItem = item.try_into()?;
        let db = self.db.lock()?;
        self.require(Role::Admin)?;
        db.upsert_vaccine(&item)?;
        Ok(())
    }

    pub fn list_vaccines(&self, active_only: bool) -> Result<Vec<FfiVaccine>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        Ok(db.list_vaccines(active_only)?.into_iter().map(Into::into).collect())
    }

    /// Add (or with a negative delta, consume) vials. Returns the new stock.
    pub fn adjust_vaccine_stock(&self, vaccine_id: String, delta: i64) -> Result<u32, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        let stock = db.adjust_vaccine_stock(&vaccine_id, delta).map_err(|e| match e {
            db::DbError::Constraint(msg) => AbtcError::InvalidInput(msg),
            other => other.into(),
        })?;
        Ok(stock)
    }

    // =========================================================================
    // Realtime Feed Operations
    // =========================================================================

    /// Subscribe to newly booked (pending) appointments.
    pub fn subscribe_new_appointments(&self) -> Result<u64, AbtcError> {
        self.require(Role::Staff)?;
        self.subscribe(ChangeFilter::new_pending_appointments())
    }

    /// Subscribe to changes, optionally restricted to a table and event kind.
    pub fn subscribe_changes(
        &self,
        table: Option<String>,
        kind: Option<String>,
    ) -> Result<u64, AbtcError> {
        self.require(Role::Staff)?;
        let mut filter = ChangeFilter::all();
        if let Some(table) = table {
            filter = filter.table(
                ChangeTable::parse(&table)
                    .ok_or_else(|| AbtcError::InvalidInput(format!("Unknown table: {}", table)))?,
            );
        }
        if let Some(kind) = kind {
            filter = filter.kind(
                ChangeKind::parse(&kind)
                    .ok_or_else(|| AbtcError::InvalidInput(format!("Unknown event: {}", kind)))?,
            );
        }
        self.subscribe(filter)
    }

    /// Events delivered to a subscription since the last poll.
    pub fn poll_changes(&self, subscription_id: u64) -> Result<Vec<FfiChangeEvent>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        self.publish(&db)?;
        let subscriptions = self.subscriptions.lock()?;
        let subscription = subscriptions
            .get(&subscription_id)
            .ok_or_else(|| AbtcError::NotFound(format!("subscription {}", subscription_id)))?;
        subscription
            .drain()
            .into_iter()
            .map(FfiChangeEvent::try_from)
            .collect()
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, subscription_id: u64) -> Result<bool, AbtcError> {
        self.require(Role::Staff)?;
        self.feed.lock()?.unsubscribe(feed::SubscriptionId(subscription_id));
        Ok(self.subscriptions.lock()?.remove(&subscription_id).is_some())
    }

    /// Logged changes after `since_seq`, for catching up after a reconnect.
    pub fn replay_changes(&self, since_seq: i64) -> Result<Vec<FfiChangeEvent>, AbtcError> {
        let db = self.db.lock()?;
        self.require(Role::Staff)?;
        ChangeFeed::replay_since(&db, since_seq, &ChangeFilter::all())?
            .into_iter()
            .map(FfiChangeEvent::try_from)
            .collect()
    }
}

// =========================================================================
// Input Parsing
// =========================================================================

fn parse_date(s: &str) -> Result<NaiveDate, AbtcError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| AbtcError::InvalidInput(format!("Invalid date {:?}: {}", s, e)))
}

fn parse_optional_date(s: Option<&str>) -> Result<Option<NaiveDate>, AbtcError> {
    s.filter(|d| !d.trim().is_empty()).map(parse_date).transpose()
}

fn parse_dose(s: &str) -> Result<DoseNumber, AbtcError> {
    DoseNumber::parse(s).ok_or_else(|| AbtcError::InvalidInput(format!("Unknown dose: {}", s)))
}

fn parse_role(s: &str) -> Result<Role, AbtcError> {
    Role::parse(s).ok_or_else(|| AbtcError::InvalidInput(format!("Unknown role: {}", s)))
}

fn parse_appointment_status(s: &str) -> Result<AppointmentStatus, AbtcError> {
    AppointmentStatus::parse(s)
        .ok_or_else(|| AbtcError::InvalidInput(format!("Unknown appointment status: {}", s)))
}

fn date_string(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient identity.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientInfo {
    pub name: String,
    pub age: Option<u32>,
    pub sex: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub barangay: Option<String>,
}

impl From<PatientInfo> for FfiPatientInfo {
    fn from(p: PatientInfo) -> Self {
        Self {
            name: p.name,
            age: p.age,
            sex: p.sex,
            contact_number: p.contact_number,
            email: p.email,
            address: p.address,
            barangay: p.barangay,
        }
    }
}

impl From<FfiPatientInfo> for PatientInfo {
    fn from(p: FfiPatientInfo) -> Self {
        PatientInfo {
            name: p.name.trim().to_string(),
            age: p.age,
            sex: p.sex,
            contact_number: p.contact_number,
            email: p.email,
            address: p.address,
            barangay: p.barangay,
        }
    }
}

/// FFI-safe bite incident. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBiteIncident {
    pub biting_animal: String,
    pub bite_site: Option<String>,
    pub bite_date: Option<String>,
    pub bite_time: Option<String>,
    pub barangay: Option<String>,
}

impl From<BiteIncident> for FfiBiteIncident {
    fn from(b: BiteIncident) -> Self {
        Self {
            biting_animal: b.biting_animal,
            bite_site: b.bite_site,
            bite_date: date_string(b.bite_date),
            bite_time: b.bite_time,
            barangay: b.barangay,
        }
    }
}

impl TryFrom<FfiBiteIncident> for BiteIncident {
    type Error = AbtcError;

    fn try_from(b: FfiBiteIncident) -> Result<Self, Self::Error> {
        Ok(BiteIncident {
            biting_animal: b.biting_animal,
            bite_site: b.bite_site,
            bite_date: parse_optional_date(b.bite_date.as_deref())?,
            bite_time: b.bite_time,
            barangay: b.barangay,
        })
    }
}

/// FFI-safe appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub appointment_id: String,
    pub patient: FfiPatientInfo,
    pub bite: FfiBiteIncident,
    pub preferred_date: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Appointment> for FfiAppointment {
    fn from(a: Appointment) -> Self {
        Self {
            appointment_id: a.appointment_id,
            patient: a.patient.into(),
            bite: a.bite.into(),
            preferred_date: date_string(a.preferred_date),
            status: a.status.as_str().to_string(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// FFI-safe page of appointments.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointmentPage {
    pub items: Vec<FfiAppointment>,
    pub page: u32,
    pub total_pages: u32,
    pub total: u32,
}

impl From<Page<Appointment>> for FfiAppointmentPage {
    fn from(page: Page<Appointment>) -> Self {
        Self {
            page: page.page as u32,
            total_pages: page.total_pages() as u32,
            total: page.total as u32,
            items: page.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// FFI-safe dose slot.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoseSlot {
    pub dose: String,
    pub date: Option<String>,
    pub status: String,
    pub updated_by_name: Option<String>,
    pub updated_at: Option<String>,
}

impl FfiDoseSlot {
    fn new(dose: DoseNumber, slot: DoseSlot) -> Self {
        Self {
            dose: dose.label().to_string(),
            date: date_string(slot.date),
            status: slot.status.as_str().to_string(),
            updated_by_name: slot.updated_by_name,
            updated_at: slot.updated_at,
        }
    }
}

/// FFI-safe RIG details. `kind` is `hrig` or `erig`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRigDetails {
    pub kind: String,
    pub dose_ml: f64,
    pub date_given: Option<String>,
}

impl From<RigDetails> for FfiRigDetails {
    fn from(r: RigDetails) -> Self {
        Self {
            kind: r.kind.as_str().to_string(),
            dose_ml: r.dose_ml,
            date_given: date_string(r.date_given),
        }
    }
}

impl TryFrom<FfiRigDetails> for RigDetails {
    type Error = AbtcError;

    fn try_from(r: FfiRigDetails) -> Result<Self, Self::Error> {
        let kind = TreatmentKind::parse(&r.kind)
            .ok_or_else(|| AbtcError::InvalidInput(format!("Unknown RIG kind: {}", r.kind)))?;
        Ok(RigDetails {
            kind,
            dose_ml: r.dose_ml,
            date_given: parse_optional_date(r.date_given.as_deref())?,
        })
    }
}

/// FFI-safe treatment record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTreatmentRecord {
    pub record_id: String,
    pub appointment_id: Option<String>,
    pub patient: FfiPatientInfo,
    pub bite: FfiBiteIncident,
    pub exposure_categories: Vec<String>,
    pub treatments: Vec<String>,
    pub rig: Option<FfiRigDetails>,
    pub doses: Vec<FfiDoseSlot>,
    pub completion: String,
    pub doses_completed: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TreatmentRecord> for FfiTreatmentRecord {
    fn from(r: TreatmentRecord) -> Self {
        let completion = r.completion_status().as_str().to_string();
        let doses_completed = r.doses_completed() as u32;
        Self {
            record_id: r.record_id,
            appointment_id: r.appointment_id,
            patient: r.patient.into(),
            bite: r.bite.into(),
            exposure_categories: r
                .exposure_categories
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            treatments: r.treatments.iter().map(|t| t.as_str().to_string()).collect(),
            rig: r.rig.map(Into::into),
            doses: DoseNumber::ALL
                .into_iter()
                .zip(r.doses)
                .map(|(dose, slot)| FfiDoseSlot::new(dose, slot))
                .collect(),
            completion,
            doses_completed,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// FFI-safe due-today row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDueDose {
    pub dose: String,
    pub record_id: String,
    pub patient_name: String,
    pub contact_number: Option<String>,
}

impl From<tracker::DueDose> for FfiDueDose {
    fn from(due: tracker::DueDose) -> Self {
        Self {
            dose: due.dose.label().to_string(),
            record_id: due.record.record_id,
            patient_name: due.record.patient.name,
            contact_number: due.record.patient.contact_number,
        }
    }
}

/// FFI-safe per-dose status counts.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoseCounts {
    pub dose: String,
    pub pending: u32,
    pub completed: u32,
    pub missed: u32,
}

/// FFI-safe patient list row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientSummary {
    pub record_id: String,
    pub patient_name: String,
    pub barangay: Option<String>,
    pub biting_animal: String,
    pub completion: String,
    pub doses_completed: u32,
    pub next_pending_dose: Option<String>,
    pub created_at: String,
}

impl From<PatientSummary> for FfiPatientSummary {
    fn from(s: PatientSummary) -> Self {
        Self {
            record_id: s.record_id,
            patient_name: s.patient_name,
            barangay: s.barangay,
            biting_animal: s.biting_animal,
            completion: s.completion.as_str().to_string(),
            doses_completed: s.doses_completed as u32,
            next_pending_dose: s.next_pending_dose.map(|d| d.label().to_string()),
            created_at: s.created_at,
        }
    }
}

/// FFI-safe map marker.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBarangayCases {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Placeholder coordinate for a barangay missing from the table
    pub approximate: bool,
    pub count: u32,
    pub intensity: f64,
}

impl From<BarangayCases> for FfiBarangayCases {
    fn from(m: BarangayCases) -> Self {
        Self {
            name: m.name,
            lat: m.location.lat,
            lng: m.location.lng,
            approximate: m.location.source == geo::LocationSource::Approximate,
            count: m.count as u32,
            intensity: m.intensity,
        }
    }
}

/// FFI-safe group list row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiGroupSummary {
    pub group_id: String,
    pub name: String,
    pub member_count: u32,
    pub file_count: u32,
    pub created_at: String,
}

impl From<groups::GroupSummary> for FfiGroupSummary {
    fn from(g: groups::GroupSummary) -> Self {
        Self {
            group_id: g.group_id,
            name: g.name,
            member_count: g.member_count as u32,
            file_count: g.file_count as u32,
            created_at: g.created_at,
        }
    }
}

/// FFI-safe prescription file metadata.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescriptionFile {
    pub file_id: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub uploaded_at: String,
}

impl From<models::PrescriptionFile> for FfiPrescriptionFile {
    fn from(f: models::PrescriptionFile) -> Self {
        Self {
            file_id: f.file_id,
            file_name: f.file_name,
            content_type: f.content_type,
            size_bytes: f.size_bytes,
            sha256: f.sha256,
            uploaded_at: f.uploaded_at,
        }
    }
}

/// FFI-safe session.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSession {
    pub session_id: String,
    pub staff_id: String,
    pub role: String,
    pub full_name: String,
    pub issued_at: String,
}

impl From<Session> for FfiSession {
    fn from(s: Session) -> Self {
        Self {
            session_id: s.session_id,
            staff_id: s.staff_id,
            role: s.role.as_str().to_string(),
            full_name: s.full_name,
            issued_at: s.issued_at,
        }
    }
}

/// FFI-safe staff profile (no password hash).
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStaff {
    pub staff_id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub active: bool,
}

impl From<StaffProfile> for FfiStaff {
    fn from(s: StaffProfile) -> Self {
        Self {
            staff_id: s.staff_id,
            email: s.email,
            full_name: s.full_name,
            role: s.role.as_str().to_string(),
            active: s.active,
        }
    }
}

/// FFI-safe vaccine catalog item. An empty `vaccine_id` creates a new item.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVaccine {
    pub vaccine_id: String,
    pub name: String,
    pub kind: String,
    pub stock: u32,
    pub active: bool,
}

impl From<VaccineItem> for FfiVaccine {
    fn from(v: VaccineItem) -> Self {
        Self {
            vaccine_id: v.vaccine_id,
            name: v.name,
            kind: v.kind.as_str().to_string(),
            stock: v.stock,
            active: v.active,
        }
    }
}

impl TryFrom<FfiVaccine> for VaccineItem {
    type Error = AbtcError;

    fn try_from(v: FfiVaccine) -> Result<Self, Self::Error> {
        let kind = TreatmentKind::parse(&v.kind)
            .ok_or_else(|| AbtcError::InvalidInput(format!("Unknown vaccine kind: {}", v.kind)))?;
        let mut item = VaccineItem::new(v.name, kind);
        if !v.vaccine_id.trim().is_empty() {
            item.vaccine_id = v.vaccine_id;
        }
        item.stock = v.stock;
        item.active = v.active;
        Ok(item)
    }
}

/// FFI-safe change event. The row is passed as JSON text.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChangeEvent {
    pub seq: i64,
    pub table: String,
    pub event: String,
    pub row_id: String,
    pub payload_json: String,
    pub created_at: String,
}

impl TryFrom<ChangeEvent> for FfiChangeEvent {
    type Error = AbtcError;

    fn try_from(e: ChangeEvent) -> Result<Self, Self::Error> {
        Ok(Self {
            seq: e.seq,
            table: e.table.as_str().to_string(),
            event: e.kind.as_str().to_string(),
            row_id: e.row_id,
            payload_json: serde_json::to_string(&e.payload)?,
            created_at: e.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(name: &str, barangay: &str) -> FfiPatientInfo {
        FfiPatientInfo {
            name: name.into(),
            age: Some(30),
            sex: None,
            contact_number: Some("09171234567".into()),
            email: None,
            address: None,
            barangay: Some(barangay.into()),
        }
    }

    fn bite(animal: &str) -> FfiBiteIncident {
        FfiBiteIncident {
            biting_animal: animal.into(),
            bite_site: Some("left leg".into()),
            bite_date: Some("2024-06-01".into()),
            bite_time: Some("3:15 PM".into()),
            barangay: None,
        }
    }

    fn signed_in_core() -> Arc<AbtcCore> {
        let core = open_database_in_memory().unwrap();
        core.register_staff(
            "admin@abtc.ph".into(),
            "Dr. Reyes".into(),
            "admin".into(),
            "correct horse".into(),
        )
        .unwrap();
        core.sign_in("admin@abtc.ph".into(), "correct horse".into()).unwrap();
        core
    }

    #[test]
    fn test_booking_is_public_but_listing_needs_session() {
        let core = open_database_in_memory().unwrap();
        core.book_appointment(patient("Juan", "Poblacion"), bite("dog"), None)
            .unwrap();
        assert!(matches!(
            core.list_appointments(None, None, None, 1),
            Err(AbtcError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_booking_to_dose_update_flow() {
        let core = signed_in_core();
        let appt = core
            .book_appointment(
                patient("Juan Dela Cruz", "Poblacion"),
                bite("Dog"),
                Some("2024-06-02".into()),
            )
            .unwrap();
        assert_eq!(appt.status, "pending");

        core.confirm_appointment(appt.appointment_id.clone()).unwrap();
        let record = core
            .start_treatment(appt.appointment_id.clone(), "2024-06-02".into())
            .unwrap();
        assert_eq!(record.doses[1].date.as_deref(), Some("2024-06-05"));
        assert_eq!(record.completion, "ongoing");

        let updated = core
            .update_dose_status(record.record_id.clone(), "D0".into(), "completed".into())
            .unwrap();
        assert_eq!(updated.doses[0].status, "completed");
        assert_eq!(updated.doses[0].updated_by_name.as_deref(), Some("Dr. Reyes"));

        let err = core.update_dose_status(record.record_id, "D0".into(), "missed".into());
        assert!(matches!(err, Err(AbtcError::InvalidTransition(_))));

        let page = core.list_appointments(Some("completed".into()), None, None, 1).unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_new_appointment_subscription() {
        let core = signed_in_core();
        let sub = core.subscribe_new_appointments().unwrap();

        let appt = core
            .book_appointment(patient("Maria", "Mabini"), bite("cat"), None)
            .unwrap();
        core.confirm_appointment(appt.appointment_id).unwrap();

        let events = core.poll_changes(sub).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].table, "appointments");
        assert!(events[0].payload_json.contains("Maria"));
        assert!(core.poll_changes(sub).unwrap().is_empty());

        assert!(core.unsubscribe(sub).unwrap());
        assert!(matches!(core.poll_changes(sub), Err(AbtcError::NotFound(_))));
    }

    #[test]
    fn test_feed_needs_session() {
        let core = signed_in_core();
        let sub = core.subscribe_changes(None, None).unwrap();
        core.sign_out().unwrap();

        assert!(matches!(core.subscribe_new_appointments(), Err(AbtcError::Unauthorized(_))));
        assert!(matches!(core.subscribe_changes(None, None), Err(AbtcError::Unauthorized(_))));

        // Public booking still works, but its row is not handed out
        core.book_appointment(patient("Another", "Mabini"), bite("dog"), None)
            .unwrap();
        assert!(matches!(core.poll_changes(sub), Err(AbtcError::Unauthorized(_))));
        assert!(matches!(core.unsubscribe(sub), Err(AbtcError::Unauthorized(_))));
        assert!(matches!(core.replay_changes(0), Err(AbtcError::Unauthorized(_))));

        core.sign_in("admin@abtc.ph".into(), "correct horse".into()).unwrap();
        let events = core.poll_changes(sub).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].payload_json.contains("Another"));
    }

    #[test]
    fn test_record_rig_through_facade() {
        let core = signed_in_core();
        let record = core
            .create_treatment_record(
                patient("Rig Patient", "Rizal"),
                bite("dog"),
                "2024-06-01".into(),
            )
            .unwrap();
        assert!(record.rig.is_none());

        let updated = core
            .record_rig(
                record.record_id.clone(),
                Some(FfiRigDetails {
                    kind: "HRIG".into(),
                    dose_ml: 2.5,
                    date_given: Some("2024-06-01".into()),
                }),
            )
            .unwrap();
        let rig = updated.rig.expect("rig recorded");
        assert_eq!((rig.kind.as_str(), rig.dose_ml), ("hrig", 2.5));
        assert_eq!(rig.date_given.as_deref(), Some("2024-06-01"));
        assert!(updated.treatments.contains(&"hrig".to_string()));

        let fetched = core.get_treatment_record(record.record_id.clone()).unwrap().unwrap();
        assert!(fetched.rig.is_some());

        assert!(matches!(
            core.record_rig(
                record.record_id,
                Some(FfiRigDetails {
                    kind: "pcecv".into(),
                    dose_ml: 1.0,
                    date_given: None,
                }),
            ),
            Err(AbtcError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_analytics_and_map() {
        let core = signed_in_core();
        core.book_appointment(patient("A", "Poblacion"), bite("dog"), None).unwrap();
        core.book_appointment(patient("B", "poblacion"), bite("DOG "), None).unwrap();
        core.book_appointment(patient("C", "Unlisted"), bite("Pusa"), None).unwrap();

        let json = core.analytics_json(Some(2024), None).unwrap();
        let report: AnalyticsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.animal_count("Dog"), 2);
        assert_eq!(report.animal_count("Cat"), 1);

        let markers = core.map_cases(None).unwrap();
        assert_eq!(markers[0].name, "Poblacion");
        assert_eq!(markers[0].count, 2);
        assert!(!markers[0].approximate);
        assert!(markers.iter().any(|m| m.name == "Unlisted" && m.approximate));
    }

    #[test]
    fn test_groups_and_vaccines() {
        let core = signed_in_core();
        let record = core
            .create_treatment_record(patient("Walk In", "Rizal"), bite("dog"), "2024-06-01".into())
            .unwrap();
        let group = core.create_group("Rizal household".into()).unwrap();
        assert!(core.add_group_patient(group.group_id.clone(), record.record_id.clone()).unwrap());
        let scan = b"%PDF-1.7 prescription".to_vec();
        let file = core
            .attach_group_file(
                group.group_id.clone(),
                "rx.pdf".into(),
                "application/pdf".into(),
                scan.clone(),
            )
            .unwrap();
        assert_eq!(file.size_bytes, scan.len() as u64);
        assert_eq!(core.group_file_content(file.file_id.clone()).unwrap(), scan);
        assert_eq!(core.group_files(group.group_id.clone()).unwrap()[0].sha256, file.sha256);
        assert!(matches!(
            core.attach_group_file(
                group.group_id.clone(),
                "empty.pdf".into(),
                "application/pdf".into(),
                vec![],
            ),
            Err(AbtcError::InvalidInput(_))
        ));

        let list = core.list_groups().unwrap();
        assert_eq!((list[0].member_count, list[0].file_count), (1, 1));
        assert_eq!(core.group_members(group.group_id.clone()).unwrap()[0].patient_name, "Walk In");

        core.upsert_vaccine(FfiVaccine {
            vaccine_id: "verorab".into(),
            name: "Verorab".into(),
            kind: "PVRV".into(),
            stock: 3,
            active: true,
        })
        .unwrap();
        assert_eq!(core.adjust_vaccine_stock("verorab".into(), -1).unwrap(), 2);
        assert!(matches!(
            core.adjust_vaccine_stock("verorab".into(), -5),
            Err(AbtcError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        let core = signed_in_core();
        assert!(matches!(
            core.book_appointment(patient("  ", "Poblacion"), bite("dog"), None),
            Err(AbtcError::InvalidInput(_))
        ));
        assert!(matches!(
            core.start_treatment("x".into(), "06/01/2024".into()),
            Err(AbtcError::InvalidInput(_))
        ));
        assert!(matches!(
            core.list_appointments(Some("archived".into()), None, None, 1),
            Err(AbtcError::InvalidInput(_))
        ));
    }
}
