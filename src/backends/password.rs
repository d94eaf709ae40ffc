// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Username/password authentication.

use std::sync::Arc;

use async_trait::async_trait;

use super::{lookup_user, AuthBackend, Credentials};
use crate::db::UserStore;
use crate::error::Result;
use crate::models::User;
use crate::request::RequestContext;

pub struct PasswordBackend {
    store: Arc<dyn UserStore>,
}

impl PasswordBackend {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Look up `username` case-insensitively and check `password`.
    ///
    /// Unknown users and wrong passwords are both `Ok(None)`.
    pub async fn authenticate_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        let Some(user) = self.store.find_by_username(username).await? else {
            tracing::debug!(username, "Password login for unknown user");
            return Ok(None);
        };

        if user.check_password(password) {
            Ok(Some(user))
        } else {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            Ok(None)
        }
    }
}

#[async_trait]
impl AuthBackend for PasswordBackend {
    async fn authenticate(
        &self,
        credentials: &Credentials,
        _request: &RequestContext,
    ) -> Result<Option<User>> {
        match credentials {
            Credentials::Password { username, password } => {
                self.authenticate_password(username, password).await
            }
            _ => Ok(None),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        lookup_user(self.store.as_ref(), user_id).await
    }
}
