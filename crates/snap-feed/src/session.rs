//! The signed-in user, scoped from sign-in to sign-out.
//!
//! A [`Session`] is created from whatever the auth provider reports as the
//! current identity and is passed explicitly to every operation that acts on
//! behalf of the user. Ending the session consumes it.

use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use snap_types::{Timestamp, User, UserId};

use crate::error::{FeedError, FeedResult};

/// Source of the current account identity.
///
/// Credential sign-in and sign-up happen elsewhere; the engine only reads
/// who is signed in.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, or `None` when nobody is signed in.
    async fn current_user(&self) -> FeedResult<Option<User>>;
}

/// An auth provider with a fixed answer, for tests and embedding.
#[derive(Clone, Debug, Default)]
pub struct StaticAuth {
    user: Option<User>,
}

impl StaticAuth {
    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn current_user(&self) -> FeedResult<Option<User>> {
        Ok(self.user.clone())
    }
}

/// The current user's state for the lifetime of one sign-in.
#[derive(Debug)]
pub struct Session {
    user: RwLock<User>,
    started: Timestamp,
}

impl Session {
    /// Start a session for whoever `auth` reports as signed in.
    pub async fn sign_in(auth: &dyn AuthProvider) -> FeedResult<Self> {
        let user = auth.current_user().await?.ok_or(FeedError::NotSignedIn)?;
        info!(user = %user.id, login = %user.login, "session started");
        Ok(Self::for_user(user))
    }

    /// Start a session for a known user.
    pub fn for_user(user: User) -> Self {
        Self {
            user: RwLock::new(user),
            started: Timestamp::now(),
        }
    }

    /// A snapshot of the current user.
    pub fn user(&self) -> User {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn user_id(&self) -> UserId {
        self.user.read().unwrap_or_else(|e| e.into_inner()).id.clone()
    }

    pub fn avatar(&self) -> Option<String> {
        self.user
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .avatar
            .clone()
    }

    pub fn started(&self) -> Timestamp {
        self.started
    }

    pub(crate) fn replace_avatar(&self, url: String) {
        self.user.write().unwrap_or_else(|e| e.into_inner()).avatar = Some(url);
    }

    /// End the session, returning the final user state.
    pub fn sign_out(self) -> User {
        let user = self.user.into_inner().unwrap_or_else(|e| e.into_inner());
        info!(user = %user.id, "session ended");
        user
    }
}
