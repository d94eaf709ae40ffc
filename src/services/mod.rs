// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - provider API clients.

pub mod facebook;
pub mod foursquare;
pub mod twitter;

pub use facebook::{FacebookClient, FacebookProfile};
pub use foursquare::{FoursquareClient, FoursquareUser};
pub use twitter::{OAuth1Signer, OAuth1Token, TwitterClient, TwitterUser};

use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Return the body of a successful response, or a provider error.
pub(crate) async fn check_response_text(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::provider(provider, format!("Failed to read body: {}", e)))?;

    if !status.is_success() {
        tracing::error!(provider, status = %status, body = %body, "Provider request failed");
        return Err(AppError::provider(provider, format!("HTTP {}: {}", status, body)));
    }

    Ok(body)
}

/// Check response status and parse the JSON body.
pub(crate) async fn check_response_json<T: DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T> {
    let body = check_response_text(provider, response).await?;
    serde_json::from_str(&body)
        .map_err(|e| AppError::provider(provider, format!("JSON parse error: {}", e)))
}

/// Accept a numeric ID sent either as a JSON number or a numeric string.
pub(crate) fn deserialize_numeric_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumericId {
        Number(u64),
        Text(String),
    }

    match NumericId::deserialize(deserializer)? {
        NumericId::Number(n) => Ok(n),
        NumericId::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
