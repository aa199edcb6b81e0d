//! Clinic settings read from the environment.
//!
//! Missing keys fall back to defaults with an `info!`; unparseable values
//! fall back with a `warn!`. Loading never fails.

use std::{env, fmt::Display, str::FromStr};

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::tracker::TransitionPolicy;

pub const DEFAULT_DB_PATH: &str = "abtc.sqlite3";
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Philippine Standard Time
pub const DEFAULT_TIMEZONE_OFFSET_HOURS: i32 = 8;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClinicConfig {
    /// SQLite file backing the table store
    pub db_path: String,
    /// Rows per page in the appointment list
    pub page_size: usize,
    /// Which dose status changes are accepted
    pub dose_policy: TransitionPolicy,
    /// Offset from UTC used to decide what "today" is
    pub timezone_offset_hours: i32,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            dose_policy: TransitionPolicy::default(),
            timezone_offset_hours: DEFAULT_TIMEZONE_OFFSET_HOURS,
        }
    }
}

impl ClinicConfig {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the environment, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            db_path: lookup("ABTC_DB_PATH")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| {
                    info!("ABTC_DB_PATH not set, using default: {}", defaults.db_path);
                    defaults.db_path.clone()
                }),
            page_size: try_load(&lookup, "ABTC_PAGE_SIZE", defaults.page_size, parse_page_size),
            dose_policy: try_load(&lookup, "ABTC_DOSE_POLICY", defaults.dose_policy, |raw| {
                TransitionPolicy::parse(raw)
                    .ok_or_else(|| "expected monotonic or permissive".to_string())
            }),
            timezone_offset_hours: try_load(
                &lookup,
                "ABTC_TIMEZONE_OFFSET_HOURS",
                defaults.timezone_offset_hours,
                parse_offset,
            ),
        }
    }

    /// Clinic-local offset from UTC.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset_hours * 3600).unwrap_or(Utc.fix())
    }

    /// Today's date on the clinic's clock.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset()).date_naive()
    }
}

fn try_load<T, F, L>(lookup: &L, key: &'static str, default: T, parse: F) -> T
where
    T: Display,
    F: Fn(&str) -> Result<T, String>,
    L: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    match parse(raw.trim()).map_err(|reason| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason,
    }) {
        Ok(value) => value,
        Err(e) => {
            warn!("{e}, using default: {default}");
            default
        }
    }
}

fn parse_page_size(raw: &str) -> Result<usize, String> {
    match parse_number::<usize>(raw)? {
        0 => Err("must be at least 1".to_string()),
        n => Ok(n),
    }
}

fn parse_offset(raw: &str) -> Result<i32, String> {
    let hours = parse_number::<i32>(raw)?;
    if (-12..=14).contains(&hours) {
        Ok(hours)
    } else {
        Err("must be between -12 and 14".to_string())
    }
}

fn parse_number<T: FromStr>(raw: &str) -> Result<T, String>
where
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| e.to_string())
}
