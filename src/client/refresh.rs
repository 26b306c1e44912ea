//! Single-flight guard for session refresh.
//!
//! At most one refresh runs per gate. Callers that arrive while one is in flight await that same
//! future and all observe its outcome. The slot is emptied as soon as the flight settles, so the
//! next burst of 401s starts a fresh refresh.

use crate::client::error::RefreshFailure;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Mutex, PoisonError};

pub type RefreshOutcome = Result<(), RefreshFailure>;

type Flight = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Default)]
pub struct RefreshGate {
    slot: Mutex<Option<Flight>>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the in-flight refresh, or starts one with `start` if none is running.
    ///
    /// `start` is only invoked when this caller becomes the leader.
    pub async fn run<F>(&self, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        match self.run_unless(|| false, start).await {
            Some(outcome) => outcome,
            None => Ok(()),
        }
    }

    /// Like [`run`](Self::run), but when no refresh is in flight `already_refreshed` is consulted
    /// under the slot lock first; if it returns true nothing starts and `None` is returned.
    ///
    /// A leader publishes its new credentials before its flight settles, so checking under the
    /// lock cannot miss a refresh that completed between the caller's 401 and this call.
    pub async fn run_unless<C, F>(&self, already_refreshed: C, start: F) -> Option<RefreshOutcome>
    where
        C: FnOnce() -> bool,
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        let flight = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None if already_refreshed() => return None,
                None => {
                    let flight = start().shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let outcome = flight.clone().await;

        // Only the flight we awaited is cleared; a newer one may already occupy the slot.
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
            *slot = None;
        }
        Some(outcome)
    }

    /// Whether a refresh is currently in flight.
    pub fn in_flight(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
