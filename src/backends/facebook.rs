// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Facebook login.

use std::sync::Arc;

use async_trait::async_trait;

use super::{lookup_user, AuthBackend, Credentials};
use crate::db::{get_or_create_by_provider, ProviderKey, UserStore};
use crate::error::{AppError, Result};
use crate::models::{Gender, User};
use crate::request::RequestContext;
use crate::services::FacebookClient;

pub struct FacebookBackend {
    store: Arc<dyn UserStore>,
    client: FacebookClient,
    callback_path: String,
}

impl FacebookBackend {
    pub fn new(store: Arc<dyn UserStore>, client: FacebookClient, callback_path: &str) -> Self {
        Self {
            store,
            client,
            callback_path: callback_path.to_string(),
        }
    }

    /// Exchange `code` for an access token, fetch the profile, and find or
    /// create the linked user. The latest token is always stored.
    pub async fn authenticate_code(&self, code: &str, request: &RequestContext) -> Result<User> {
        let redirect_uri = request.build_absolute_uri(&self.callback_path);
        let access_token = self.client.exchange_code(code, &redirect_uri).await?;
        let profile = self.client.get_profile(&access_token).await?;

        let username = profile.default_username();
        if username.is_empty() {
            return Err(AppError::provider(
                "Facebook",
                format!("profile {} has no usable username", profile.id),
            ));
        }

        let (mut user, created) = get_or_create_by_provider(
            self.store.as_ref(),
            &ProviderKey::Facebook(profile.id),
            || {
                let mut user = User::new(username);
                user.first_name = non_empty(profile.first_name.clone());
                user.last_name = non_empty(profile.last_name.clone());
                user.email = non_empty(profile.email.clone());
                user.gender = profile.gender.as_deref().and_then(Gender::from_provider);
                user.facebook_link = non_empty(profile.link.clone());
                user
            },
        )
        .await?;

        user.facebook_token = Some(access_token);
        self.store.save_user(&user).await?;

        tracing::info!(
            user_id = %user.id,
            facebook_id = profile.id,
            created,
            "Facebook login"
        );

        Ok(user)
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[async_trait]
impl AuthBackend for FacebookBackend {
    async fn authenticate(
        &self,
        credentials: &Credentials,
        request: &RequestContext,
    ) -> Result<Option<User>> {
        match credentials {
            Credentials::Facebook { code } => self.authenticate_code(code, request).await.map(Some),
            _ => Ok(None),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        lookup_user(self.store.as_ref(), user_id).await
    }
}
