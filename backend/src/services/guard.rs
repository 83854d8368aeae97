//! Single-flight guard for report runs.
//!
//! At most one run executes at a time, and a run whose key equals the most
//! recently completed one is refused. Both rules are enforced by one
//! mutex-protected state so the check and the claim are atomic.

use parking_lot::Mutex;
use std::sync::Arc;

/// Why the guard refused to start a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardRejection {
    #[error("a run is already in flight")]
    Busy,
    #[error("duplicate of the last completed run: {0}")]
    Duplicate(String),
}

#[derive(Debug, Default)]
struct GuardState {
    in_flight: Option<String>,
    last_completed: Option<String>,
}

/// Shared run guard. Cloning shares the state.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGuard {
    state: Arc<Mutex<GuardState>>,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard for `key`.
    ///
    /// The returned permit releases the claim when dropped; call
    /// [`RunPermit::complete`] to also record `key` as the last completed run.
    pub fn begin(&self, key: impl Into<String>) -> Result<RunPermit, GuardRejection> {
        let key = key.into();
        let mut state = self.state.lock();
        if state.in_flight.is_some() {
            return Err(GuardRejection::Busy);
        }
        if state.last_completed.as_deref() == Some(key.as_str()) {
            return Err(GuardRejection::Duplicate(key));
        }
        state.in_flight = Some(key.clone());
        Ok(RunPermit {
            guard: self.clone(),
            key,
            completed: false,
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    pub fn in_flight_key(&self) -> Option<String> {
        self.state.lock().in_flight.clone()
    }

    pub fn last_completed_key(&self) -> Option<String> {
        self.state.lock().last_completed.clone()
    }

    /// Drop the duplicate marker when it equals `key`.
    pub fn forget_completed(&self, key: &str) {
        let mut state = self.state.lock();
        if state.last_completed.as_deref() == Some(key) {
            state.last_completed = None;
        }
    }

    fn release(&self, key: &str, completed: bool) {
        let mut state = self.state.lock();
        if state.in_flight.as_deref() == Some(key) {
            state.in_flight = None;
        }
        state.last_completed = completed.then(|| key.to_string());
    }
}

/// Claim on the guard held for the duration of one run.
#[derive(Debug)]
pub struct RunPermit {
    guard: ConcurrencyGuard,
    key: String,
    completed: bool,
}

impl RunPermit {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Finish the run successfully.
    pub fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        // An abandoned or failed run clears the duplicate marker too.
        self.guard.release(&self.key, self.completed);
    }
}
