// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Twitter API client with OAuth 1.0a request signing.
//!
//! Twitter login hands us an already-authorized token pair, so there is no
//! code exchange here: requests are signed with the consumer credentials
//! plus the user's token (HMAC-SHA1, RFC 5849).

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use rand::distr::{Alphanumeric, SampleString};
use serde::Deserialize;
use sha1::Sha1;

use super::{check_response_json, deserialize_numeric_id};
use crate::config::ProviderCredentials;
use crate::error::{AppError, Result};
use crate::time_utils::unix_timestamp;

// Type alias for HMAC-SHA1
type HmacSha1 = Hmac<Sha1>;

const PROVIDER: &str = "Twitter";
const NONCE_LEN: usize = 32;

/// An authorized OAuth 1.0a access token.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth1Token {
    pub key: String,
    pub secret: String,
}

impl fmt::Debug for OAuth1Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Token")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Signs requests on behalf of one consumer (application).
#[derive(Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
}

/// RFC 3986 percent-encoding (unreserved characters pass through).
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

impl OAuth1Signer {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    /// Build the `Authorization` header value for a request.
    ///
    /// `params` are the request's query and form parameters; they take part
    /// in the signature but are not placed in the header.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        token: &OAuth1Token,
        nonce: &str,
        timestamp: i64,
    ) -> Result<String> {
        let timestamp = timestamp.to_string();
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", token.key.as_str()),
            ("oauth_version", "1.0"),
        ];

        let signature = self.signature(method, url, params, &oauth_params, &token.secret)?;
        oauth_params.push(("oauth_signature", signature.as_str()));
        oauth_params.sort();

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();

        Ok(format!("OAuth {}", fields.join(", ")))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        oauth_params: &[(&str, &str)],
        token_secret: &str,
    ) -> Result<String> {
        let mut encoded: Vec<(String, String)> = params
            .iter()
            .chain(oauth_params.iter())
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        encoded.sort();

        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(url),
            encode(&param_string)
        );
        let signing_key = format!("{}&{}", encode(&self.consumer_secret), encode(token_secret));

        let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(base_string.as_bytes());

        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

/// Generate a random nonce for a signed request.
pub fn generate_nonce() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), NONCE_LEN)
}

/// Twitter REST API client.
#[derive(Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    api_url: String,
    signer: OAuth1Signer,
}

impl TwitterClient {
    pub fn new(http: reqwest::Client, credentials: &ProviderCredentials, api_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            signer: OAuth1Signer::new(&credentials.client_id, &credentials.client_secret),
        }
    }

    /// Get the account that owns `token`.
    pub async fn verify_credentials(&self, token: &OAuth1Token) -> Result<TwitterUser> {
        let url = format!("{}/1.1/account/verify_credentials.json", self.api_url);
        let params = [("skip_status", "true")];

        let header = self.signer.authorization_header(
            "GET",
            &url,
            &params,
            token,
            &generate_nonce(),
            unix_timestamp(chrono::Utc::now()),
        )?;

        let response = self
            .http
            .get(&url)
            .query(&params)
            .header(reqwest::header::AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| {
                AppError::provider(PROVIDER, format!("verify_credentials failed: {}", e))
            })?;

        check_response_json(PROVIDER, response).await
    }
}

/// Account returned by `verify_credentials`.
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterUser {
    #[serde(deserialize_with = "deserialize_numeric_id")]
    pub id: u64,
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference request from Twitter's "Creating a signature" guide.
    fn reference_signer() -> OAuth1Signer {
        OAuth1Signer::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
        )
    }

    fn reference_token() -> OAuth1Token {
        OAuth1Token {
            key: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
        }
    }

    #[test]
    fn signature_matches_reference_vector() {
        let header = reference_signer()
            .authorization_header(
                "POST",
                "https://api.twitter.com/1.1/statuses/update.json",
                &[
                    ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
                    ("include_entities", "true"),
                ],
                &reference_token(),
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
                1318622958,
            )
            .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains(r#"oauth_signature="hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D""#));
        assert!(header.contains(r#"oauth_consumer_key="xvz1evFS4wEEPTGEFPHBog""#));
        assert!(header.contains(r#"oauth_timestamp="1318622958""#));
        // Request parameters are signed but not sent in the header
        assert!(!header.contains("status"));
    }

    #[test]
    fn token_debug_hides_secret() {
        let shown = format!("{:?}", reference_token());
        assert!(shown.contains("370773112-"));
        assert!(!shown.contains("LswwdoUaIvS8"));
    }

    #[test]
    fn nonce_is_alphanumeric() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(nonce, generate_nonce());
    }
}
