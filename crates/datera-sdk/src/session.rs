//! Session token storage shared by every call on a connection.

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{RwLock, RwLockWriteGuard};

/// Holder of the current session token.
///
/// Reads take the lock in shared mode. Login, logout and invalidation take it
/// exclusively, so concurrent logins serialize.
#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<SecretString>>,
}

impl Session {
    /// Create an empty (logged out) session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a token is held.
    pub async fn has_logged_in(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Current token, if any.
    pub async fn token(&self) -> Option<String> {
        self.token
            .read()
            .await
            .as_ref()
            .map(|token| token.expose_secret().to_string())
    }

    /// Drop the token unconditionally.
    pub async fn clear(&self) {
        self.token.write().await.take();
    }

    /// Drop the token only if it is still `stale`.
    ///
    /// Returns true if the token was dropped. A token stored by a concurrent
    /// login is left alone.
    pub async fn invalidate(&self, stale: &str) -> bool {
        let mut token = self.token.write().await;
        let matches = token
            .as_ref()
            .is_some_and(|current| current.expose_secret() == stale);
        if matches {
            token.take();
        }
        matches
    }

    /// Exclusive access for the duration of a login.
    pub(crate) async fn lock(&self) -> RwLockWriteGuard<'_, Option<SecretString>> {
        self.token.write().await
    }
}
