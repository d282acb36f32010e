//! Waiting for an uploaded file to become usable
//!
//! Uploaded videos are processed remotely before they can be referenced in a
//! generation request. The wait is a small state machine:
//!
//! ```text
//! Submitted --poll--> Polling --poll--> ... --> Active | Failed
//!     \                  \
//!      +--- deadline ----+--> TimedOut
//! ```
//!
//! Time is read through [`Clock`] so tests can drive the machine without
//! sleeping.

use std::time::{Duration, Instant};

use super::InvocationError;
use crate::config::ActivationConfig;

/// Source of time for the activation wait
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Poll cadence and deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ActivationPolicy {
    fn default() -> Self {
        Self::from(&ActivationConfig::default())
    }
}

impl From<&ActivationConfig> for ActivationPolicy {
    fn from(config: &ActivationConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            timeout: config.timeout(),
        }
    }
}

/// Activation wait states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationState {
    Submitted,
    Polling { last_state: String },
    Active,
    Failed { state: String },
    TimedOut { last_state: Option<String> },
}

impl ActivationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActivationState::Active
                | ActivationState::Failed { .. }
                | ActivationState::TimedOut { .. }
        )
    }

    fn last_state(&self) -> Option<String> {
        match self {
            ActivationState::Polling { last_state } => Some(last_state.clone()),
            _ => None,
        }
    }

    /// Transition on a remote state report. A missing state counts as active.
    pub fn observe(self, remote: Option<&str>) -> Self {
        let Some(state) = remote else {
            return ActivationState::Active;
        };

        let upper = state.to_uppercase();
        if upper.contains("ACTIVE") {
            ActivationState::Active
        } else if upper.contains("FAILED") {
            ActivationState::Failed {
                state: state.to_string(),
            }
        } else {
            ActivationState::Polling {
                last_state: state.to_string(),
            }
        }
    }

    /// Transition when the deadline has passed
    pub fn expire(self) -> Self {
        if self.is_terminal() {
            return self;
        }
        ActivationState::TimedOut {
            last_state: self.last_state(),
        }
    }
}

/// Poll `remote_state` until the file is active, failed, or the policy's
/// deadline passes. Errors from `remote_state` end the wait immediately.
pub fn wait_until_active<F>(
    clock: &dyn Clock,
    policy: &ActivationPolicy,
    mut remote_state: F,
) -> Result<(), InvocationError>
where
    F: FnMut() -> Result<Option<String>, InvocationError>,
{
    // A deadline past the clock's range never expires.
    let deadline = clock.now().checked_add(policy.timeout);
    let mut state = ActivationState::Submitted;

    loop {
        if deadline.is_some_and(|deadline| clock.now() >= deadline) {
            state = state.expire();
        } else {
            let remote = remote_state()?;
            state = state.observe(remote.as_deref());
        }

        match state {
            ActivationState::Active => return Ok(()),
            ActivationState::Failed { state } => {
                return Err(InvocationError::ActivationFailed(state))
            }
            ActivationState::TimedOut { last_state } => {
                return Err(InvocationError::ActivationTimedOut { last_state })
            }
            ActivationState::Submitted | ActivationState::Polling { .. } => {
                tracing::trace!(?state, "file not active yet");
                clock.sleep(policy.poll_interval);
            }
        }
    }
}
