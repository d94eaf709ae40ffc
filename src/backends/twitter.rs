// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Twitter login.

use std::sync::Arc;

use async_trait::async_trait;

use super::facebook::non_empty;
use super::{lookup_user, AuthBackend, Credentials};
use crate::db::{get_or_create_by_provider, ProviderKey, UserStore};
use crate::error::{AppError, Result};
use crate::models::User;
use crate::request::RequestContext;
use crate::services::{OAuth1Token, TwitterClient};

pub struct TwitterBackend {
    store: Arc<dyn UserStore>,
    client: TwitterClient,
}

impl TwitterBackend {
    pub fn new(store: Arc<dyn UserStore>, client: TwitterClient) -> Self {
        Self { store, client }
    }

    /// Resolve the account owning `token` and find or create its user.
    /// The token pair is stored on every login.
    pub async fn authenticate_token(&self, token: &OAuth1Token) -> Result<User> {
        let twitter_user = self.client.verify_credentials(token).await?;

        if twitter_user.screen_name.is_empty() {
            return Err(AppError::provider(
                "Twitter",
                format!("account {} has no screen name", twitter_user.id),
            ));
        }

        let (mut user, created) = get_or_create_by_provider(
            self.store.as_ref(),
            &ProviderKey::Twitter(twitter_user.id),
            || {
                let mut user = User::new(twitter_user.screen_name.clone());
                user.first_name = non_empty(twitter_user.name.clone());
                user
            },
        )
        .await?;

        user.twitter_token_key = Some(token.key.clone());
        user.twitter_token_secret = Some(token.secret.clone());
        self.store.save_user(&user).await?;

        tracing::info!(
            user_id = %user.id,
            twitter_id = twitter_user.id,
            created,
            "Twitter login"
        );

        Ok(user)
    }
}

#[async_trait]
impl AuthBackend for TwitterBackend {
    async fn authenticate(
        &self,
        credentials: &Credentials,
        _request: &RequestContext,
    ) -> Result<Option<User>> {
        match credentials {
            Credentials::Twitter { token } => self.authenticate_token(token).await.map(Some),
            _ => Ok(None),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        lookup_user(self.store.as_ref(), user_id).await
    }
}
