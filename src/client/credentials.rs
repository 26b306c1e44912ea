use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use tokio::sync::watch;

/// Tokens the client attaches to requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Signed-in status, observable by the application to route to its login screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Nothing known yet (no login, no failed refresh).
    Unknown,
    SignedIn,
    /// A refresh failed or the user logged out.
    SignedOut,
}

struct Slot {
    credentials: Option<Credentials>,
    generation: u64,
}

/// Current credentials plus a generation counter bumped on every change.
pub struct CredentialStore {
    slot: RwLock<Slot>,
    state: watch::Sender<AuthState>,
}

impl CredentialStore {
    pub fn new(initial: Option<Credentials>) -> Self {
        let state = if initial.is_some() {
            AuthState::SignedIn
        } else {
            AuthState::Unknown
        };
        let (tx, _rx) = watch::channel(state);
        Self {
            slot: RwLock::new(Slot {
                credentials: initial,
                generation: 0,
            }),
            state: tx,
        }
    }

    /// Credentials and the generation they belong to.
    pub fn snapshot(&self) -> (Option<Credentials>, u64) {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        (slot.credentials.clone(), slot.generation)
    }

    pub fn generation(&self) -> u64 {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .credentials
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
    }

    /// Stores new credentials and marks the client signed in.
    pub fn set(&self, credentials: Credentials) {
        {
            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            slot.credentials = Some(credentials);
            slot.generation += 1;
        }
        self.state.send_replace(AuthState::SignedIn);
    }

    /// Drops credentials and marks the client signed out.
    pub fn clear(&self) {
        {
            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            slot.credentials = None;
            slot.generation += 1;
        }
        self.state.send_replace(AuthState::SignedOut);
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(access: &str) -> Credentials {
        Credentials {
            access_token: access.into(),
            refresh_token: Some(format!("{}-refresh", access)),
        }
    }

    #[test]
    fn generation_moves_on_every_change() {
        let store = CredentialStore::new(None);
        assert_eq!(store.state(), AuthState::Unknown);
        assert_eq!(store.generation(), 0);

        store.set(creds("a"));
        assert_eq!(store.generation(), 1);
        assert_eq!(store.refresh_token().as_deref(), Some("a-refresh"));

        store.clear();
        let (current, generation) = store.snapshot();
        assert!(current.is_none());
        assert_eq!(generation, 2);
        assert_eq!(store.state(), AuthState::SignedOut);
    }

    #[tokio::test]
    async fn subscribers_see_sign_out() {
        let store = CredentialStore::new(Some(creds("a")));
        let mut rx = store.subscribe();
        assert_eq!(*rx.borrow(), AuthState::SignedIn);

        store.clear();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), AuthState::SignedOut);
    }
}
