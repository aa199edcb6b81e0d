//! A single countdown.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Stable timer handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(pub String);

impl TimerId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a countdown stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimerState {
    /// Not started, or reset
    Idle,
    /// Counting down since `started_at` with `remaining` left at that moment
    Running { started_at: Duration, remaining: Duration },
    /// Stopped with `remaining` left
    Paused { remaining: Duration },
    /// Reached zero
    Finished,
}

/// A labelled countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub id: TimerId,
    pub label: String,
    /// Full countdown length
    pub duration: Duration,
    pub state: TimerState,
}

impl Timer {
    pub(crate) fn new(label: String, duration: Duration) -> Self {
        Self {
            id: TimerId::new(),
            label,
            duration,
            state: TimerState::Idle,
        }
    }

    /// Time left at `now`. Never negative.
    pub fn remaining(&self, now: Duration) -> Duration {
        match self.state {
            TimerState::Idle => self.duration,
            TimerState::Running { started_at, remaining } => {
                remaining.saturating_sub(now.saturating_sub(started_at))
            }
            TimerState::Paused { remaining } => remaining,
            TimerState::Finished => Duration::ZERO,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub fn is_finished(&self) -> bool {
        self.state == TimerState::Finished
    }
}
