// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Facebook Graph API client.
//!
//! Handles:
//! - Authorization-code exchange for an access token
//! - Fetching the current user's public profile

use serde::Deserialize;

use super::{check_response_json, check_response_text, deserialize_numeric_id};
use crate::config::ProviderCredentials;
use crate::error::{AppError, Result};

const PROVIDER: &str = "Facebook";

/// Facebook Graph API client.
#[derive(Clone)]
pub struct FacebookClient {
    http: reqwest::Client,
    graph_url: String,
    app_id: String,
    app_secret: String,
}

impl FacebookClient {
    pub fn new(http: reqwest::Client, credentials: &ProviderCredentials, graph_url: &str) -> Self {
        Self {
            http,
            graph_url: graph_url.trim_end_matches('/').to_string(),
            app_id: credentials.client_id.clone(),
            app_secret: credentials.client_secret.clone(),
        }
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/oauth/access_token", self.graph_url))
            .query(&[
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, format!("Token exchange failed: {}", e)))?;

        let body = check_response_text(PROVIDER, response).await?;

        parse_access_token(&body)
            .ok_or_else(|| AppError::provider(PROVIDER, "No access_token in token response"))
    }

    /// Get the authenticated user's profile.
    pub async fn get_profile(&self, access_token: &str) -> Result<FacebookProfile> {
        let response = self
            .http
            .get(format!("{}/me", self.graph_url))
            .query(&[("access_token", access_token)])
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, format!("Profile request failed: {}", e)))?;

        check_response_json(PROVIDER, response).await
    }
}

/// Extract the access token from a token-endpoint body.
///
/// Older Graph API versions answer with a form-encoded body
/// (`access_token=...&expires=...`), newer ones with JSON. For form bodies
/// the last `access_token` value wins.
fn parse_access_token(body: &str) -> Option<String> {
    let trimmed = body.trim();

    if trimmed.starts_with('{') {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: Option<String>,
        }
        return serde_json::from_str::<TokenResponse>(trimmed)
            .ok()?
            .access_token
            .filter(|t| !t.is_empty());
    }

    url::form_urlencoded::parse(trimmed.as_bytes())
        .filter(|(key, _)| key == "access_token")
        .map(|(_, value)| value.into_owned())
        .last()
        .filter(|t| !t.is_empty())
}

/// Public profile returned by `/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct FacebookProfile {
    #[serde(deserialize_with = "deserialize_numeric_id")]
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl FacebookProfile {
    /// `username` if Facebook sent one, else first name + last name.
    pub fn default_username(&self) -> String {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "{}{}",
                self.first_name.as_deref().unwrap_or_default(),
                self.last_name.as_deref().unwrap_or_default()
            ),
        }
    }
}
