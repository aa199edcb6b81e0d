//! Staff sign-in, sessions and role checks.
//!
//! The manager keeps at most one live session (one dashboard per process)
//! and notifies registered listeners on every sign-in and sign-out.

mod password;

pub use password::{hash_password, verify_password};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Database, DbError};
use crate::models::{Role, StaffProfile};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Authentication errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is disabled: {0}")]
    AccountDisabled(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Requires {required} role")]
    Forbidden { required: &'static str },

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// A signed-in staff member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub staff_id: String,
    pub role: Role,
    pub full_name: String,
    pub issued_at: String,
}

impl Session {
    fn for_staff(staff: &StaffProfile) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            staff_id: staff.staff_id.clone(),
            role: staff.role,
            full_name: staff.full_name.clone(),
            issued_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Auth state change delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut(Session),
}

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(&SessionEvent) + Send + Sync>;

/// Holds the current session and its listeners.
#[derive(Default)]
pub struct SessionManager {
    current: Option<Session>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check credentials and start a session, replacing any existing one.
    pub fn sign_in(&mut self, db: &Database, email: &str, password: &str) -> AuthResult<Session> {
        let Some(staff) = db.get_staff_by_email(email)? else {
            warn!(email = %email.trim(), "Sign-in for unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &staff.password_hash) {
            warn!(staff_id = %staff.staff_id, "Sign-in with wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !staff.active {
            return Err(AuthError::AccountDisabled(staff.email));
        }

        self.sign_out();
        let session = Session::for_staff(&staff);
        info!(staff_id = %session.staff_id, role = session.role.as_str(), "Signed in");
        self.current = Some(session.clone());
        self.notify(&SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// End the current session. Returns the session that was ended, if any.
    pub fn sign_out(&mut self) -> Option<Session> {
        let session = self.current.take()?;
        info!(staff_id = %session.staff_id, "Signed out");
        self.notify(&SessionEvent::SignedOut(session.clone()));
        Some(session)
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// The current session if its role satisfies `required`.
    pub fn require_role(&self, required: Role) -> AuthResult<&Session> {
        let session = self.current.as_ref().ok_or(AuthError::NotSignedIn)?;
        if session.role.satisfies(required) {
            Ok(session)
        } else {
            Err(AuthError::Forbidden {
                required: required.as_str(),
            })
        }
    }

    /// Register a listener for sign-in and sign-out events.
    pub fn on_change<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Create a staff account.
    ///
    /// Needs an admin session, except for the very first account, which
    /// bootstraps an empty clinic.
    pub fn register_staff(
        &self,
        db: &Database,
        email: &str,
        full_name: String,
        role: Role,
        password: &str,
    ) -> AuthResult<StaffProfile> {
        if !db.list_staff()?.is_empty() {
            self.require_role(Role::Admin)?;
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let mut staff = StaffProfile::new(email, full_name, role);
        staff.password_hash = hash_password(password);
        db.insert_staff(&staff)?;
        info!(staff_id = %staff.staff_id, role = role.as_str(), "Staff registered");
        Ok(staff)
    }

    fn notify(&self, event: &SessionEvent) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn setup() -> (Database, SessionManager) {
        let db = Database::open_in_memory().unwrap();
        let sessions = SessionManager::new();
        sessions
            .register_staff(&db, "admin@abtc.ph", "Dr. Reyes".into(), Role::Admin, "correct horse")
            .unwrap();
        (db, sessions)
    }

    #[test]
    fn test_sign_in_and_out() {
        let (db, mut sessions) = setup();
        let session = sessions.sign_in(&db, " ADMIN@abtc.ph", "correct horse").unwrap();
        assert_eq!(session.full_name, "Dr. Reyes");
        assert_eq!(session.role, Role::Admin);
        assert_eq!(sessions.current_session(), Some(&session));

        assert_eq!(sessions.sign_out(), Some(session));
        assert!(sessions.current_session().is_none());
        assert!(sessions.sign_out().is_none());
    }

    #[test]
    fn test_bad_credentials() {
        let (db, mut sessions) = setup();
        assert!(matches!(
            sessions.sign_in(&db, "admin@abtc.ph", "wrong password"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            sessions.sign_in(&db, "nobody@abtc.ph", "correct horse"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(sessions.current_session().is_none());
    }

    #[test]
    fn test_disabled_account() {
        let (db, mut sessions) = setup();
        let admin = db.get_staff_by_email("admin@abtc.ph").unwrap().unwrap();
        db.set_staff_active(&admin.staff_id, false).unwrap();
        assert!(matches!(
            sessions.sign_in(&db, "admin@abtc.ph", "correct horse"),
            Err(AuthError::AccountDisabled(_))
        ));
    }

    #[test]
    fn test_registration_requires_admin_after_bootstrap() {
        let (db, mut sessions) = setup();
        let result = sessions.register_staff(
            &db,
            "joy@abtc.ph",
            "Nurse Joy".into(),
            Role::Staff,
            "password1",
        );
        assert!(matches!(result, Err(AuthError::NotSignedIn)));

        sessions.sign_in(&db, "admin@abtc.ph", "correct horse").unwrap();
        sessions
            .register_staff(&db, "joy@abtc.ph", "Nurse Joy".into(), Role::Staff, "password1")
            .unwrap();

        sessions.sign_in(&db, "joy@abtc.ph", "password1").unwrap();
        let result =
            sessions.register_staff(&db, "x@abtc.ph", "X".into(), Role::Staff, "password1");
        assert!(matches!(result, Err(AuthError::Forbidden { required: "admin" })));
    }

    #[test]
    fn test_weak_password_rejected() {
        let db = Database::open_in_memory().unwrap();
        let sessions = SessionManager::new();
        let result = sessions.register_staff(&db, "a@abtc.ph", "A".into(), Role::Admin, "short");
        assert!(matches!(result, Err(AuthError::WeakPassword(8))));
        assert!(db.list_staff().unwrap().is_empty());
    }

    #[test]
    fn test_listeners_see_events_in_order() {
        let (db, mut sessions) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = sessions.on_change(move |event| {
            let tag = match event {
                SessionEvent::SignedIn(_) => "in",
                SessionEvent::SignedOut(_) => "out",
            };
            sink.lock().unwrap().push(tag);
        });

        sessions.sign_in(&db, "admin@abtc.ph", "correct horse").unwrap();
        // Signing in again ends the previous session first
        sessions.sign_in(&db, "admin@abtc.ph", "correct horse").unwrap();
        sessions.sign_out();
        assert_eq!(*seen.lock().unwrap(), vec!["in", "out", "in", "out"]);

        assert!(sessions.remove_listener(id));
        sessions.sign_in(&db, "admin@abtc.ph", "correct horse").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_staff_role_guard() {
        let (db, mut sessions) = setup();
        sessions.sign_in(&db, "admin@abtc.ph", "correct horse").unwrap();
        assert!(sessions.require_role(Role::Staff).is_ok());
        assert!(sessions.require_role(Role::Admin).is_ok());
    }
}
