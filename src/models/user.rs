// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and authentication.

use std::borrow::Cow;
use std::collections::HashMap;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{AppError, Result};
use crate::time_utils::format_utc_rfc3339;

/// Oldest accepted birthdate, in days before today.
pub const LOWER_DATE_LIMIT_DAYS: i64 = 366 * 120;

/// Maximum stored length of a Facebook access token.
pub const FACEBOOK_TOKEN_MAX_LEN: usize = 150;
// `validator` length bounds are `u64`; mirror of `FACEBOOK_TOKEN_MAX_LEN`.
const FACEBOOK_TOKEN_MAX_LEN_U64: u64 = FACEBOOK_TOKEN_MAX_LEN as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Parse a provider's gender string. Anything unrecognised (including
    /// Foursquare's "none") maps to `None`.
    pub fn from_provider(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Sl,
}

/// HTTP conditional-request validators for one open client connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Last `ETag` seen, echoed as `If-None-Match`
    pub http_if_none_match: Option<String>,
    /// Last `Last-Modified` seen, echoed as `If-Modified-Since`
    pub http_if_modified_since: Option<String>,
}

/// User document stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct User {
    /// Generated primary key (also used as document ID)
    pub id: String,
    /// Unique, matched case-insensitively on login
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    /// Argon2 PHC string; `None` means no usable password
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// When the account was created (RFC3339)
    pub date_joined: String,

    // ─── Profile ─────────────────────────────────────────────────
    #[serde(default)]
    #[validate(custom(function = "validate_birthdate_today"))]
    pub birthdate: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub language: Option<Language>,

    // ─── Facebook ────────────────────────────────────────────────
    #[serde(default)]
    pub facebook_id: Option<u64>,
    #[serde(default)]
    #[validate(length(max = FACEBOOK_TOKEN_MAX_LEN_U64))]
    pub facebook_token: Option<String>,
    #[serde(default)]
    pub facebook_link: Option<String>,

    // ─── Twitter ─────────────────────────────────────────────────
    #[serde(default)]
    pub twitter_id: Option<u64>,
    #[serde(default)]
    pub twitter_token_key: Option<String>,
    #[serde(default)]
    pub twitter_token_secret: Option<String>,

    // ─── Foursquare ──────────────────────────────────────────────
    #[serde(default)]
    pub foursquare_id: Option<String>,
    #[serde(default)]
    pub foursquare_token: Option<String>,
    #[serde(default)]
    pub foursquare_picture_url: Option<String>,

    // ─── Connection bookkeeping ──────────────────────────────────
    #[serde(default)]
    pub opened_connections: Vec<Connection>,
    /// Real-time messaging state
    #[serde(default)]
    pub channel: HashMap<String, serde_json::Value>,
    /// Last authenticated access (RFC3339)
    #[serde(default)]
    pub last_access: Option<String>,
}

fn default_true() -> bool {
    true
}

impl User {
    /// A fresh, active user with a generated ID and no password.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            password: None,
            first_name: None,
            last_name: None,
            email: None,
            is_active: true,
            date_joined: format_utc_rfc3339(Utc::now()),
            birthdate: None,
            gender: None,
            language: None,
            facebook_id: None,
            facebook_token: None,
            facebook_link: None,
            twitter_id: None,
            twitter_token_key: None,
            twitter_token_secret: None,
            foursquare_id: None,
            foursquare_token: None,
            foursquare_picture_url: None,
            opened_connections: Vec::new(),
            channel: HashMap::new(),
            last_access: None,
        }
    }

    /// Hash and store `raw` as the user's password.
    pub fn set_password(&mut self, raw: &str) -> Result<()> {
        let salt_bytes: [u8; 16] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Salt encoding failed: {}", e)))?;

        let hash = Argon2::default()
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

        self.password = Some(hash.to_string());
        Ok(())
    }

    pub fn set_unusable_password(&mut self) {
        self.password = None;
    }

    pub fn has_usable_password(&self) -> bool {
        self.password
            .as_deref()
            .is_some_and(|hash| PasswordHash::new(hash).is_ok())
    }

    /// Check `raw` against the stored hash. Empty input never matches.
    pub fn check_password(&self, raw: &str) -> bool {
        if raw.is_empty() {
            return false;
        }
        let Some(stored) = self.password.as_deref() else {
            return false;
        };
        let Ok(parsed) = PasswordHash::new(stored) else {
            tracing::warn!(user_id = %self.id, "Stored password hash is malformed");
            return false;
        };
        Argon2::default()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok()
    }

    /// Record an authenticated access at the current time.
    pub fn touch(&mut self) {
        self.last_access = Some(format_utc_rfc3339(Utc::now()));
    }
}

/// Check that `birthdate` lies in `[today - 366*120 days, today]`.
pub fn validate_birthdate(
    birthdate: &NaiveDate,
    today: NaiveDate,
) -> std::result::Result<(), ValidationError> {
    let lower = today - Duration::days(LOWER_DATE_LIMIT_DAYS);
    if *birthdate < lower || *birthdate > today {
        let mut error = ValidationError::new("birthdate_range");
        error.message = Some(Cow::Owned(format!(
            "birthdate must be between {} and {}",
            lower, today
        )));
        return Err(error);
    }
    Ok(())
}

fn validate_birthdate_today(birthdate: &NaiveDate) -> std::result::Result<(), ValidationError> {
    validate_birthdate(birthdate, Utc::now().date_naive())
}

fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}
