// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication backends.
//!
//! Each backend turns one kind of credential into a user record. The
//! `Authenticator` owns the configured set and dispatches a credential to
//! the backends that accept it, in order, until one resolves a user.

pub mod facebook;
pub mod foursquare;
pub mod lazy;
pub mod password;
pub mod twitter;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use facebook::FacebookBackend;
pub use foursquare::FoursquareBackend;
pub use lazy::LazyUserBackend;
pub use password::PasswordBackend;
pub use twitter::TwitterBackend;

use crate::config::Config;
use crate::db::UserStore;
use crate::error::Result;
use crate::models::User;
use crate::request::RequestContext;
use crate::services::{FacebookClient, FoursquareClient, OAuth1Token, TwitterClient};

/// A credential presented for authentication.
#[derive(Clone)]
pub enum Credentials {
    Password { username: String, password: String },
    /// Authorization code from the Facebook OAuth redirect
    Facebook { code: String },
    /// Token pair from a completed Twitter OAuth 1.0a dance
    Twitter { token: OAuth1Token },
    /// Authorization code from the Foursquare OAuth redirect
    Foursquare { code: String },
    /// No credential: provision a guest
    Guest,
}

impl Credentials {
    /// The backend kind that handles this credential.
    pub fn kind(&self) -> BackendKind {
        match self {
            Credentials::Password { .. } => BackendKind::Password,
            Credentials::Facebook { .. } => BackendKind::Facebook,
            Credentials::Twitter { .. } => BackendKind::Twitter,
            Credentials::Foursquare { .. } => BackendKind::Foursquare,
            Credentials::Guest => BackendKind::Lazy,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Credentials::Facebook { .. } => f.write_str("Facebook { .. }"),
            Credentials::Twitter { token } => {
                f.debug_struct("Twitter").field("token", token).finish()
            }
            Credentials::Foursquare { .. } => f.write_str("Foursquare { .. }"),
            Credentials::Guest => f.write_str("Guest"),
        }
    }
}

/// Identifies a backend, e.g. in a session, for later `get_user` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Password,
    Facebook,
    Twitter,
    Foursquare,
    Lazy,
}

/// The contract every backend implements.
///
/// `authenticate` returns `Ok(None)` both for credentials of another kind
/// and for credentials that do not match a user.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn authenticate(
        &self,
        credentials: &Credentials,
        request: &RequestContext,
    ) -> Result<Option<User>>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;
}

/// Primary-key lookup shared by all backends.
pub(crate) async fn lookup_user(store: &dyn UserStore, user_id: &str) -> Result<Option<User>> {
    let user = store.get_user(user_id).await?;
    if user.is_none() {
        tracing::debug!(user_id, "User not found");
    }
    Ok(user)
}

/// The closed set of backends.
pub enum Backend {
    Password(PasswordBackend),
    Facebook(FacebookBackend),
    Twitter(TwitterBackend),
    Foursquare(FoursquareBackend),
    Lazy(LazyUserBackend),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Password(_) => BackendKind::Password,
            Backend::Facebook(_) => BackendKind::Facebook,
            Backend::Twitter(_) => BackendKind::Twitter,
            Backend::Foursquare(_) => BackendKind::Foursquare,
            Backend::Lazy(_) => BackendKind::Lazy,
        }
    }

    fn inner(&self) -> &dyn AuthBackend {
        match self {
            Backend::Password(b) => b,
            Backend::Facebook(b) => b,
            Backend::Twitter(b) => b,
            Backend::Foursquare(b) => b,
            Backend::Lazy(b) => b,
        }
    }
}

#[async_trait]
impl AuthBackend for Backend {
    async fn authenticate(
        &self,
        credentials: &Credentials,
        request: &RequestContext,
    ) -> Result<Option<User>> {
        self.inner().authenticate(credentials, request).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.inner().get_user(user_id).await
    }
}

/// A user resolved by a specific backend.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub backend: BackendKind,
}

/// Dispatches credentials over the configured backends.
pub struct Authenticator {
    store: Arc<dyn UserStore>,
    backends: Vec<Backend>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn UserStore>, backends: Vec<Backend>) -> Self {
        Self { store, backends }
    }

    /// Build the standard backend set from configuration.
    ///
    /// Password and guest login are always available; each social backend
    /// is added only when its credentials are configured.
    pub fn from_config(config: &Config, store: Arc<dyn UserStore>) -> Self {
        let http = reqwest::Client::new();
        let mut backends = vec![Backend::Password(PasswordBackend::new(store.clone()))];

        if let Some(creds) = &config.facebook {
            let client = FacebookClient::new(http.clone(), creds, &config.facebook_graph_url);
            backends.push(Backend::Facebook(FacebookBackend::new(
                store.clone(),
                client,
                &config.facebook_callback_path,
            )));
        }

        if let Some(creds) = &config.twitter {
            let client = TwitterClient::new(http.clone(), creds, &config.twitter_api_url);
            backends.push(Backend::Twitter(TwitterBackend::new(store.clone(), client)));
        }

        if let Some(creds) = &config.foursquare {
            let client = FoursquareClient::new(
                http.clone(),
                creds,
                &config.foursquare_oauth_url,
                &config.foursquare_api_url,
            );
            backends.push(Backend::Foursquare(FoursquareBackend::new(
                store.clone(),
                client,
                &config.foursquare_callback_path,
            )));
        }

        backends.push(Backend::Lazy(LazyUserBackend::new(store.clone())));

        let kinds: Vec<BackendKind> = backends.iter().map(Backend::kind).collect();
        tracing::info!(backends = ?kinds, "Authentication backends configured");

        Self::new(store, backends)
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        self.backends.iter().map(Backend::kind).collect()
    }

    /// Try each backend that accepts `credentials`; the first user wins.
    ///
    /// The winning user's `last_access` is stamped and saved.
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
        request: &RequestContext,
    ) -> Result<Option<AuthenticatedUser>> {
        let wanted = credentials.kind();

        for backend in self.backends.iter().filter(|b| b.kind() == wanted) {
            if let Some(mut user) = backend.authenticate(credentials, request).await? {
                user.touch();
                self.store.save_user(&user).await?;

                tracing::info!(
                    user_id = %user.id,
                    username = %user.username,
                    backend = ?backend.kind(),
                    "User authenticated"
                );

                return Ok(Some(AuthenticatedUser {
                    user,
                    backend: backend.kind(),
                }));
            }
        }

        tracing::debug!(backend = ?wanted, "No backend accepted credentials");
        Ok(None)
    }

    /// Resolve a user through the backend that authenticated it.
    pub async fn get_user(&self, kind: BackendKind, user_id: &str) -> Result<Option<User>> {
        match self.backends.iter().find(|b| b.kind() == kind) {
            Some(backend) => backend.get_user(user_id).await,
            None => {
                tracing::warn!(backend = ?kind, "Backend not configured");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_secrets() {
        let password = Credentials::Password {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let shown = format!("{:?}", password);
        assert!(shown.contains("alice"));
        assert!(!shown.contains("hunter2"));

        let code = Credentials::Facebook {
            code: "one-time-code".to_string(),
        };
        assert!(!format!("{:?}", code).contains("one-time-code"));

        let twitter = Credentials::Twitter {
            token: OAuth1Token {
                key: "key".to_string(),
                secret: "token-secret".to_string(),
            },
        };
        assert!(!format!("{:?}", twitter).contains("token-secret"));
        assert_eq!(twitter.kind(), BackendKind::Twitter);
    }
}
