// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Guest ("lazy") users: password-less accounts created on demand.

use std::sync::Arc;

use async_trait::async_trait;
use rand::distr::{Alphanumeric, SampleString};

use super::{lookup_user, AuthBackend, Credentials};
use crate::db::UserStore;
use crate::error::{Result, UniqueField};
use crate::models::User;
use crate::request::RequestContext;

pub const GUEST_USERNAME_PREFIX: &str = "guest-";
pub const GUEST_SUFFIX_LEN: usize = 6;

/// Produces the random part of a guest username.
pub type SuffixSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Six random characters from `[A-Za-z0-9]`.
pub fn random_suffix() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), GUEST_SUFFIX_LEN)
}

pub struct LazyUserBackend {
    store: Arc<dyn UserStore>,
    suffix: SuffixSource,
}

impl LazyUserBackend {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self::with_suffix_source(store, Arc::new(random_suffix))
    }

    pub fn with_suffix_source(store: Arc<dyn UserStore>, suffix: SuffixSource) -> Self {
        Self { store, suffix }
    }

    /// Create a new guest user.
    ///
    /// Retries with a fresh name for as long as the username is taken;
    /// any other storage error is returned.
    pub async fn authenticate_guest(&self) -> Result<User> {
        loop {
            let username = format!("{}{}", GUEST_USERNAME_PREFIX, (self.suffix)());
            let mut user = User::new(username);
            user.set_unusable_password();

            match self.store.create_user(&user).await {
                Ok(()) => {
                    tracing::info!(user_id = %user.id, username = %user.username, "Guest user created");
                    return Ok(user);
                }
                Err(e) if e.is_duplicate(UniqueField::Username) => {
                    tracing::debug!(username = %user.username, "Guest username taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl AuthBackend for LazyUserBackend {
    async fn authenticate(
        &self,
        credentials: &Credentials,
        _request: &RequestContext,
    ) -> Result<Option<User>> {
        match credentials {
            Credentials::Guest => self.authenticate_guest().await.map(Some),
            _ => Ok(None),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        lookup_user(self.store.as_ref(), user_id).await
    }
}
