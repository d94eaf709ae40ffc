// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Foursquare API client.

use serde::Deserialize;

use super::check_response_json;
use crate::config::ProviderCredentials;
use crate::error::{AppError, Result};

const PROVIDER: &str = "Foursquare";

/// API version date sent with every v2 request.
pub const API_VERSION: &str = "20140806";

/// Foursquare API client.
#[derive(Clone)]
pub struct FoursquareClient {
    http: reqwest::Client,
    oauth_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
}

impl FoursquareClient {
    pub fn new(
        http: reqwest::Client,
        credentials: &ProviderCredentials,
        oauth_url: &str,
        api_url: &str,
    ) -> Self {
        Self {
            http,
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
        }
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/oauth2/access_token", self.oauth_url))
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, format!("Token exchange failed: {}", e)))?;

        let token: TokenResponse = check_response_json(PROVIDER, response).await?;

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::provider(PROVIDER, "No access_token in token response"))
    }

    /// Get the authenticated user (`/v2/users/self`).
    pub async fn get_self(&self, access_token: &str) -> Result<FoursquareUser> {
        let response = self
            .http
            .get(format!("{}/v2/users/self", self.api_url))
            .query(&[("oauth_token", access_token), ("v", API_VERSION)])
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER, format!("Profile request failed: {}", e)))?;

        let envelope: Envelope = check_response_json(PROVIDER, response).await?;
        Ok(envelope.response.user)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    response: EnvelopeResponse,
}

#[derive(Deserialize)]
struct EnvelopeResponse {
    user: FoursquareUser,
}

/// User object from `/v2/users/self`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoursquareUser {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub contact: Option<Contact>,
    /// "male", "female" or "none"
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub photo: Option<Photo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub email: Option<String>,
}

/// Profile photo: a plain URL in old responses, prefix/suffix parts in new.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Photo {
    Url(String),
    Parts { prefix: String, suffix: String },
}

impl Photo {
    /// Full-size photo URL.
    pub fn url(&self) -> String {
        match self {
            Photo::Url(url) => url.clone(),
            Photo::Parts { prefix, suffix } => format!("{}original{}", prefix, suffix),
        }
    }
}

impl FoursquareUser {
    /// First name + last name.
    pub fn default_username(&self) -> String {
        format!(
            "{}{}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
    }

    pub fn email(&self) -> Option<String> {
        self.contact.as_ref().and_then(|c| c.email.clone())
    }
}
