//! Database layer.
//!
//! `UserStore` is the seam between the authentication backends and
//! persistence. `FirestoreDb` is the production document store;
//! `MemoryStore` backs tests and local development.

pub mod firestore;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::{AppError, Result, UniqueField};
use crate::models::User;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Unique-key claims, keyed by `<field>:<value>`
    pub const USER_KEYS: &str = "user_keys";
}

/// A provider account identifier, used as the find-or-create key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderKey {
    Facebook(u64),
    Twitter(u64),
    Foursquare(String),
}

impl ProviderKey {
    pub fn field(&self) -> UniqueField {
        match self {
            ProviderKey::Facebook(_) => UniqueField::FacebookId,
            ProviderKey::Twitter(_) => UniqueField::TwitterId,
            ProviderKey::Foursquare(_) => UniqueField::FoursquareId,
        }
    }

    pub fn value(&self) -> String {
        match self {
            ProviderKey::Facebook(id) | ProviderKey::Twitter(id) => id.to_string(),
            ProviderKey::Foursquare(id) => id.clone(),
        }
    }

    /// Write this key onto the matching provider field of `user`.
    pub fn apply(&self, user: &mut User) {
        match self {
            ProviderKey::Facebook(id) => user.facebook_id = Some(*id),
            ProviderKey::Twitter(id) => user.twitter_id = Some(*id),
            ProviderKey::Foursquare(id) => user.foursquare_id = Some(id.clone()),
        }
    }
}

/// Every unique `(field, value)` pair a user occupies.
///
/// Usernames are lowercased so that uniqueness is case-insensitive.
/// Provider IDs come first: when two logins race for the same provider
/// account, the loser must fail on the provider key, not the username.
pub fn unique_keys(user: &User) -> Vec<(UniqueField, String)> {
    let mut keys = Vec::new();
    if let Some(id) = user.facebook_id {
        keys.push((UniqueField::FacebookId, id.to_string()));
    }
    if let Some(id) = user.twitter_id {
        keys.push((UniqueField::TwitterId, id.to_string()));
    }
    if let Some(id) = &user.foursquare_id {
        keys.push((UniqueField::FoursquareId, id.clone()));
    }
    keys.push((UniqueField::Username, user.username.to_lowercase()));
    keys
}

/// Keys in `from` that are not in `to`.
pub(crate) fn key_difference(
    from: &[(UniqueField, String)],
    to: &[(UniqueField, String)],
) -> Vec<(UniqueField, String)> {
    from.iter().filter(|k| !to.contains(k)).cloned().collect()
}

/// How often a lost find-or-create race re-reads the winner's record.
const RACE_REREAD_ATTEMPTS: u32 = 5;
const RACE_REREAD_BACKOFF: Duration = Duration::from_millis(20);

/// Persistence operations the authentication backends rely on.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch by primary key.
    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Case-insensitive username lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_provider(&self, key: &ProviderKey) -> Result<Option<User>>;

    /// Insert a new user.
    ///
    /// Fails with `AppError::DuplicateKey` if the username or any provider
    /// ID is already taken, leaving the store unchanged.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Insert or replace a user, keeping unique-key claims in step.
    async fn save_user(&self, user: &User) -> Result<()>;
}

/// Find the user linked to `key`, or create one from `defaults`.
///
/// Returns the user and whether it was created. If a concurrent login
/// claims the same provider key between the lookup and the insert, the
/// insert fails with a duplicate on that field and the winner's record is
/// returned instead.
pub async fn get_or_create_by_provider<F>(
    store: &dyn UserStore,
    key: &ProviderKey,
    defaults: F,
) -> Result<(User, bool)>
where
    F: FnOnce() -> User,
{
    if let Some(existing) = store.find_by_provider(key).await? {
        return Ok((existing, false));
    }

    let mut user = defaults();
    key.apply(&mut user);

    match store.create_user(&user).await {
        Ok(()) => Ok((user, true)),
        Err(e) if e.is_duplicate(key.field()) => {
            tracing::debug!(
                field = %key.field(),
                value = %key.value(),
                "Lost find-or-create race, loading existing user"
            );
            // The winner's claim can be visible before its user document
            for attempt in 1..=RACE_REREAD_ATTEMPTS {
                if let Some(existing) = store.find_by_provider(key).await? {
                    return Ok((existing, false));
                }
                tokio::time::sleep(RACE_REREAD_BACKOFF * attempt).await;
            }
            Err(AppError::Database(format!(
                "{} {} claimed but no user found",
                key.field(),
                key.value()
            )))
        }
        Err(e) => Err(e),
    }
}
