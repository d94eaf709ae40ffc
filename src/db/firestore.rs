// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing `UserStore`.
//!
//! Firestore has no secondary unique indexes, so uniqueness is enforced by
//! a companion `user_keys` collection. Each unique `(field, value)` pair a
//! user holds is a document there whose ID is `<field>:<value>`. Claims are
//! made with a create (insert) write, which Firestore rejects if the
//! document already exists.

use async_trait::async_trait;
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{collections, key_difference, unique_keys, ProviderKey, UserStore};
use crate::error::{AppError, Result, UniqueField};
use crate::models::User;

/// Body of a `user_keys` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserKey {
    user_id: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

fn key_doc_id(field: UniqueField, value: &str) -> String {
    // Document IDs may not contain '/'
    format!("{}:{}", field, urlencoding::encode(value))
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Unique Key Claims ───────────────────────────────────────

    async fn get_key_owner(&self, field: UniqueField, value: &str) -> Result<Option<String>> {
        let key: Option<UserKey> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_KEYS)
            .obj()
            .one(&key_doc_id(field, value))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(key.map(|k| k.user_id))
    }

    /// Claim one key for `user_id`. Returns `true` if a new claim was made,
    /// `false` if `user_id` already held it.
    async fn claim_key(&self, field: UniqueField, value: &str, user_id: &str) -> Result<bool> {
        match self.get_key_owner(field, value).await? {
            Some(owner) if owner == user_id => return Ok(false),
            Some(_) => return Err(AppError::DuplicateKey(field)),
            None => {}
        }

        let result: std::result::Result<UserKey, FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USER_KEYS)
            .document_id(key_doc_id(field, value))
            .object(&UserKey {
                user_id: user_id.to_string(),
            })
            .execute()
            .await;

        match result {
            Ok(_) => Ok(true),
            // Someone created the key between our read and our insert
            Err(FirestoreError::DataConflictError(_)) => Err(AppError::DuplicateKey(field)),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn release_key(&self, field: UniqueField, value: &str) -> Result<()> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USER_KEYS)
            .document_id(key_doc_id(field, value))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Claim all keys, releasing the ones claimed here if any claim fails.
    async fn claim_all(&self, keys: &[(UniqueField, String)], user_id: &str) -> Result<()> {
        let mut claimed = Vec::new();

        for (field, value) in keys {
            match self.claim_key(*field, value, user_id).await {
                Ok(true) => claimed.push((*field, value.clone())),
                Ok(false) => {}
                Err(e) => {
                    self.release_quietly(&claimed).await;
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    async fn release_quietly(&self, keys: &[(UniqueField, String)]) {
        for (field, value) in keys {
            if let Err(e) = self.release_key(*field, value).await {
                tracing::warn!(
                    error = %e,
                    field = %field,
                    value = %value,
                    "Failed to release unique key claim"
                );
            }
        }
    }

    async fn lookup(&self, field: UniqueField, value: &str) -> Result<Option<User>> {
        let Some(user_id) = self.get_key_owner(field, value).await? else {
            return Ok(None);
        };

        let user = self.get_user(&user_id).await?;
        if user.is_none() {
            tracing::warn!(field = %field, user_id = %user_id, "Key claim points at missing user");
        }
        Ok(user)
    }

    async fn delete_user_quietly(&self, user_id: &str) {
        let result = match self.get_client() {
            Ok(client) => client
                .fluent()
                .delete()
                .from(collections::USERS)
                .document_id(user_id)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, user_id, "Failed to remove unclaimed user");
        }
    }

    async fn write_user(&self, user: &User) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for FirestoreDb {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.lookup(UniqueField::Username, &username.to_lowercase())
            .await
    }

    async fn find_by_provider(&self, key: &ProviderKey) -> Result<Option<User>> {
        self.lookup(key.field(), &key.value()).await
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        user.validate()?;

        // Write before claiming so every claim points at a stored user
        self.write_user(user).await?;

        if let Err(e) = self.claim_all(&unique_keys(user), &user.id).await {
            self.delete_user_quietly(&user.id).await;
            return Err(e);
        }

        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let Some(previous) = self.get_user(&user.id).await? else {
            return self.create_user(user).await;
        };

        user.validate()?;

        let old_keys = unique_keys(&previous);
        let new_keys = unique_keys(user);
        self.claim_all(&new_keys, &user.id).await?;

        if let Err(e) = self.write_user(user).await {
            // Only the claims made for this write; the stored user keeps its own
            self.release_quietly(&key_difference(&new_keys, &old_keys)).await;
            return Err(e);
        }

        self.release_quietly(&key_difference(&old_keys, &new_keys)).await;

        Ok(())
    }
}
