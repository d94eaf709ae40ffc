// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Foursquare login.

use std::sync::Arc;

use async_trait::async_trait;

use super::facebook::non_empty;
use super::{lookup_user, AuthBackend, Credentials};
use crate::db::{get_or_create_by_provider, ProviderKey, UserStore};
use crate::error::{AppError, Result};
use crate::models::{Gender, User};
use crate::request::RequestContext;
use crate::services::FoursquareClient;

pub struct FoursquareBackend {
    store: Arc<dyn UserStore>,
    client: FoursquareClient,
    callback_path: String,
}

impl FoursquareBackend {
    pub fn new(store: Arc<dyn UserStore>, client: FoursquareClient, callback_path: &str) -> Self {
        Self {
            store,
            client,
            callback_path: callback_path.to_string(),
        }
    }

    pub async fn authenticate_code(&self, code: &str, request: &RequestContext) -> Result<User> {
        let redirect_uri = request.build_absolute_uri(&self.callback_path);
        let access_token = self.client.exchange_code(code, &redirect_uri).await?;
        let foursquare_user = self.client.get_self(&access_token).await?;

        let username = foursquare_user.default_username();
        if username.is_empty() {
            return Err(AppError::provider(
                "Foursquare",
                format!("user {} has no usable username", foursquare_user.id),
            ));
        }

        let (mut user, created) = get_or_create_by_provider(
            self.store.as_ref(),
            &ProviderKey::Foursquare(foursquare_user.id.clone()),
            || {
                let mut user = User::new(username);
                user.first_name = non_empty(foursquare_user.first_name.clone());
                user.last_name = non_empty(foursquare_user.last_name.clone());
                user.email = non_empty(foursquare_user.email());
                user.gender = foursquare_user
                    .gender
                    .as_deref()
                    .and_then(Gender::from_provider);
                user.foursquare_picture_url = foursquare_user.photo.as_ref().map(|p| p.url());
                user
            },
        )
        .await?;

        user.foursquare_token = Some(access_token);
        self.store.save_user(&user).await?;

        tracing::info!(
            user_id = %user.id,
            foursquare_id = %foursquare_user.id,
            created,
            "Foursquare login"
        );

        Ok(user)
    }
}

#[async_trait]
impl AuthBackend for FoursquareBackend {
    async fn authenticate(
        &self,
        credentials: &Credentials,
        request: &RequestContext,
    ) -> Result<Option<User>> {
        match credentials {
            Credentials::Foursquare { code } => {
                self.authenticate_code(code, request).await.map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        lookup_user(self.store.as_ref(), user_id).await
    }
}
