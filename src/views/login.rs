//! Login view: key entry, validation and hand-off to the browser view.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::api::LicenseTransport;
use crate::bridge::{BridgeStore, SessionRecord};
use crate::commands::{self, CommandError, LoginOutcome};
use crate::state::AppState;

pub const VIEW_NAME: &str = "Login";

/// Result of one submit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A validation is already pending; the control is disabled.
    Busy,
    Failed(CommandError),
    LoggedIn(LoginOutcome),
}

/// Resets the in-flight flag however the submit ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct LoginController {
    in_flight: AtomicBool,
}

impl LoginController {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Validate `key`. On success the session record is persisted for the
    /// browser view before returning.
    pub async fn submit<T: LicenseTransport>(&self, state: &AppState<T>, key: &str) -> SubmitOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Validation already in flight, ignoring submit");
            return SubmitOutcome::Busy;
        }
        let _guard = InFlight(&self.in_flight);

        match commands::validate_subscription(state, key).await {
            Ok(outcome) => {
                let record = SessionRecord {
                    key: key.trim().to_string(),
                    user: outcome.user.clone(),
                    subscription: outcome.subscription.clone(),
                    app_config: outcome.app_config.clone(),
                };
                // The browser view only loses its user badge without the record.
                if let Err(e) = state.bridge.persist(&record) {
                    log::warn!("Failed to store session record: {}", e);
                }
                SubmitOutcome::LoggedIn(outcome)
            }
            Err(e) => SubmitOutcome::Failed(e),
        }
    }

    /// Re-validate the key from a stored session record, if any.
    ///
    /// Returns `None` when there is nothing to resume. A record whose key the
    /// server rejects is cleared; a connection failure keeps it.
    pub async fn resume<T: LicenseTransport>(&self, state: &AppState<T>) -> Option<SubmitOutcome> {
        let record = match state.bridge.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                log::info!("No stored session, resume skipped");
                return None;
            }
            Err(e) => {
                log::warn!("Failed to read session record: {}", e);
                return None;
            }
        };

        log::info!("Resuming stored session");
        let outcome = self.submit(state, &record.key).await;
        if let SubmitOutcome::Failed(CommandError::Rejected(msg)) = &outcome {
            log::info!("Stored session is no longer valid: {}", msg);
            if let Err(e) = state.bridge.clear() {
                log::warn!("Failed to clear session record: {}", e);
            }
        }
        Some(outcome)
    }
}
