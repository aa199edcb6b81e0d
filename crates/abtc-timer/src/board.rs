//! The set of timers shown on one workstation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::timer::{Timer, TimerId, TimerState};

/// Timer errors.
#[derive(Error, Debug, PartialEq)]
pub enum TimerError {
    #[error("Timer not found: {0}")]
    NotFound(TimerId),

    #[error("Timer duration must be greater than zero")]
    ZeroDuration,

    #[error("Timer already running: {0}")]
    AlreadyRunning(TimerId),

    #[error("Timer is not running: {0}")]
    NotRunning(TimerId),

    #[error("Timer already finished, reset it first: {0}")]
    Finished(TimerId),

    #[error("Invalid saved board: {0}")]
    Json(String),
}

impl From<serde_json::Error> for TimerError {
    fn from(e: serde_json::Error) -> Self {
        TimerError::Json(e.to_string())
    }
}

pub type TimerResult<T> = Result<T, TimerError>;

/// Ordered collection of countdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerBoard {
    timers: Vec<Timer>,
}

impl TimerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an idle timer. A blank label becomes "Timer N".
    pub fn add(&mut self, label: &str, duration: Duration) -> TimerResult<TimerId> {
        if duration.is_zero() {
            return Err(TimerError::ZeroDuration);
        }
        let label = match label.trim() {
            "" => format!("Timer {}", self.timers.len() + 1),
            l => l.to_string(),
        };
        let timer = Timer::new(label, duration);
        let id = timer.id.clone();
        debug!(timer = %id, label = %timer.label, secs = duration.as_secs(), "Timer added");
        self.timers.push(timer);
        Ok(id)
    }

    /// Start an idle timer or resume a paused one.
    pub fn start(&mut self, id: &TimerId, now: Duration) -> TimerResult<()> {
        let timer = self.get_mut(id)?;
        let remaining = match timer.state {
            TimerState::Idle => timer.duration,
            TimerState::Paused { remaining } => remaining,
            TimerState::Running { .. } => return Err(TimerError::AlreadyRunning(id.clone())),
            TimerState::Finished => return Err(TimerError::Finished(id.clone())),
        };
        timer.state = TimerState::Running {
            started_at: now,
            remaining,
        };
        Ok(())
    }

    /// Pause a running timer. One that already ran out becomes finished.
    pub fn pause(&mut self, id: &TimerId, now: Duration) -> TimerResult<()> {
        let timer = self.get_mut(id)?;
        if !timer.is_running() {
            return Err(TimerError::NotRunning(id.clone()));
        }
        let remaining = timer.remaining(now);
        timer.state = if remaining.is_zero() {
            TimerState::Finished
        } else {
            TimerState::Paused { remaining }
        };
        Ok(())
    }

    /// Back to idle with the full duration.
    pub fn reset(&mut self, id: &TimerId) -> TimerResult<()> {
        self.get_mut(id)?.state = TimerState::Idle;
        Ok(())
    }

    pub fn remove(&mut self, id: &TimerId) -> TimerResult<Timer> {
        let index = self
            .timers
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| TimerError::NotFound(id.clone()))?;
        Ok(self.timers.remove(index))
    }

    /// Advance the clock. Returns timers that ran out since the last tick,
    /// in board order.
    pub fn tick(&mut self, now: Duration) -> Vec<TimerId> {
        let mut finished = Vec::new();
        for timer in self.timers.iter_mut() {
            if timer.is_running() && timer.remaining(now).is_zero() {
                timer.state = TimerState::Finished;
                info!(timer = %timer.id, label = %timer.label, "Timer finished");
                finished.push(timer.id.clone());
            }
        }
        finished
    }

    pub fn remaining(&self, id: &TimerId, now: Duration) -> TimerResult<Duration> {
        Ok(self.get(id)?.remaining(now))
    }

    pub fn get(&self, id: &TimerId) -> TimerResult<&Timer> {
        self.timers
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| TimerError::NotFound(id.clone()))
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Serialize for saving across restarts.
    pub fn to_json(&self) -> TimerResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> TimerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn get_mut(&mut self, id: &TimerId) -> TimerResult<&mut Timer> {
        self.timers
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| TimerError::NotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_start_pause_resume() {
        let mut board = TimerBoard::new();
        let id = board.add("RIG observation", secs(60)).unwrap();

        board.start(&id, secs(0)).unwrap();
        assert_eq!(board.remaining(&id, secs(20)).unwrap(), secs(40));
        board.pause(&id, secs(20)).unwrap();
        assert_eq!(board.remaining(&id, secs(500)).unwrap(), secs(40));

        board.start(&id, secs(500)).unwrap();
        assert_eq!(board.remaining(&id, secs(530)).unwrap(), secs(10));
        assert_eq!(board.start(&id, secs(531)), Err(TimerError::AlreadyRunning(id.clone())));
    }

    #[test]
    fn test_tick_reports_each_finish_once() {
        let mut board = TimerBoard::new();
        let short = board.add("Wash", secs(10)).unwrap();
        let long = board.add("Observe", secs(30)).unwrap();
        board.start(&short, secs(0)).unwrap();
        board.start(&long, secs(0)).unwrap();

        assert!(board.tick(secs(5)).is_empty());
        assert_eq!(board.tick(secs(10)), vec![short.clone()]);
        assert!(board.tick(secs(11)).is_empty());
        assert_eq!(board.tick(secs(60)), vec![long]);

        assert_eq!(board.start(&short, secs(61)), Err(TimerError::Finished(short.clone())));
        board.reset(&short).unwrap();
        assert_eq!(board.remaining(&short, secs(61)).unwrap(), secs(10));
    }

    #[test]
    fn test_pause_after_expiry_finishes() {
        let mut board = TimerBoard::new();
        let id = board.add("Skin test", secs(15)).unwrap();
        assert_eq!(board.pause(&id, secs(0)), Err(TimerError::NotRunning(id.clone())));
        board.start(&id, secs(0)).unwrap();
        board.pause(&id, secs(20)).unwrap();
        assert!(board.get(&id).unwrap().is_finished());
    }

    #[test]
    fn test_add_and_remove() {
        let mut board = TimerBoard::new();
        assert_eq!(board.add("x", Duration::ZERO), Err(TimerError::ZeroDuration));
        let a = board.add("  ", secs(5)).unwrap();
        let b = board.add("Second", secs(5)).unwrap();
        assert_eq!(board.get(&a).unwrap().label, "Timer 1");

        assert_eq!(board.remove(&a).unwrap().id, a);
        assert_eq!(board.remove(&a), Err(TimerError::NotFound(a.clone())));
        assert_eq!(board.len(), 1);
        assert_eq!(board.timers()[0].id, b);
    }

    #[test]
    fn test_json_restore() {
        let mut board = TimerBoard::new();
        let id = board.add("Observe", secs(90)).unwrap();
        board.start(&id, secs(10)).unwrap();

        let restored = TimerBoard::from_json(&board.to_json().unwrap()).unwrap();
        assert_eq!(restored, board);
        assert_eq!(restored.remaining(&id, secs(40)).unwrap(), secs(60));
        assert!(matches!(TimerBoard::from_json("{"), Err(TimerError::Json(_))));
    }

    proptest! {
        #[test]
        fn prop_remaining_never_exceeds_duration(
            duration in 1u64..10_000,
            start in 0u64..10_000,
            elapsed in 0u64..20_000,
        ) {
            let mut board = TimerBoard::new();
            let id = board.add("p", secs(duration)).unwrap();
            board.start(&id, secs(start)).unwrap();
            let left = board.remaining(&id, secs(start + elapsed)).unwrap();
            prop_assert!(left <= secs(duration));
            prop_assert_eq!(left, secs(duration.saturating_sub(elapsed)));
        }
    }
}
