// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory user store.
//!
//! Unique keys are claimed through `DashMap::entry`, which holds the shard
//! lock for the duration of the check-and-insert, so two concurrent creates
//! for the same key cannot both succeed.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use validator::Validate;

use super::{key_difference, unique_keys, ProviderKey, UserStore};
use crate::error::{AppError, Result, UniqueField};
use crate::models::User;

type KeyMap = DashMap<(UniqueField, String), String>;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    /// `(field, value)` -> user ID
    keys: KeyMap,
}

impl MemoryStore {
    pub fn new() -> Self {
        tracing::info!("Creating in-memory user store");
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// All stored users, in no particular order.
    pub fn users(&self) -> Vec<User> {
        self.users.iter().map(|entry| entry.value().clone()).collect()
    }

    fn lookup(&self, field: UniqueField, value: String) -> Option<User> {
        let user_id = self.keys.get(&(field, value))?.value().clone();
        self.users.get(&user_id).map(|u| u.value().clone())
    }

    /// Claim every key for `user_id`, or none of them.
    ///
    /// Keys already held by `user_id` are left alone.
    fn claim_all(&self, keys: &[(UniqueField, String)], user_id: &str) -> Result<()> {
        let mut claimed = Vec::new();
        let mut conflict = None;

        for key in keys {
            // The entry holds its shard's write lock until the match ends
            match self.keys.entry(key.clone()) {
                Entry::Occupied(entry) if entry.get() == user_id => {}
                Entry::Occupied(_) => conflict = Some(key.0),
                Entry::Vacant(entry) => {
                    entry.insert(user_id.to_string());
                    claimed.push(key.clone());
                }
            }

            if let Some(field) = conflict {
                release(&self.keys, &claimed, user_id);
                return Err(AppError::DuplicateKey(field));
            }
        }

        Ok(())
    }
}

/// Drop claims on `keys` that still point at `user_id`.
fn release(keys: &KeyMap, to_release: &[(UniqueField, String)], user_id: &str) {
    for key in to_release {
        keys.remove_if(key, |_, owner| owner == user_id);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.lookup(UniqueField::Username, username.to_lowercase()))
    }

    async fn find_by_provider(&self, key: &ProviderKey) -> Result<Option<User>> {
        Ok(self.lookup(key.field(), key.value()))
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        user.validate()?;

        // Insert before claiming so every claim points at a stored user
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Database(format!("User {} already exists", user.id)));
            }
            Entry::Vacant(entry) => {
                entry.insert(user.clone());
            }
        }

        if let Err(e) = self.claim_all(&unique_keys(user), &user.id) {
            self.users.remove(&user.id);
            return Err(e);
        }

        tracing::debug!(user_id = %user.id, username = %user.username, "User created");
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let previous = self.users.get(&user.id).map(|u| u.value().clone());
        let Some(previous) = previous else {
            return self.create_user(user).await;
        };

        user.validate()?;

        let new_keys = unique_keys(user);
        self.claim_all(&new_keys, &user.id)?;

        let stale = key_difference(&unique_keys(&previous), &new_keys);
        release(&self.keys, &stale, &user.id);

        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStore::new();
        let user = User::new("Alice");
        store.create_user(&user).await.unwrap();

        let fetched = store.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "Alice");
        assert!(store.get_user("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_username_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        let user = User::new("Alice");
        store.create_user(&user).await.unwrap();

        let found = store.find_by_username("aLiCe").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(store.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_differing_in_case() {
        let store = MemoryStore::new();
        store.create_user(&User::new("Alice")).await.unwrap();

        let err = store.create_user(&User::new("ALICE")).await.unwrap_err();
        assert!(err.is_duplicate(UniqueField::Username));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_create_releases_partial_claims() {
        let store = MemoryStore::new();
        let mut first = User::new("first");
        first.twitter_id = Some(99);
        store.create_user(&first).await.unwrap();

        // Username is free, twitter_id is not: nothing should stick.
        let mut second = User::new("second");
        second.twitter_id = Some(99);
        let err = store.create_user(&second).await.unwrap_err();
        assert!(err.is_duplicate(UniqueField::TwitterId));

        store.create_user(&User::new("second")).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_moves_username_claim() {
        let store = MemoryStore::new();
        let mut user = User::new("old-name");
        store.create_user(&user).await.unwrap();

        user.username = "new-name".to_string();
        user.foursquare_id = Some("abc".to_string());
        store.save_user(&user).await.unwrap();

        assert!(store.find_by_username("old-name").await.unwrap().is_none());
        assert!(store.find_by_username("NEW-NAME").await.unwrap().is_some());
        let by_provider = store
            .find_by_provider(&ProviderKey::Foursquare("abc".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_provider.id, user.id);

        // The old name is free again
        store.create_user(&User::new("old-name")).await.unwrap();
    }

    #[tokio::test]
    async fn test_username_conflict_after_provider_claim() {
        // The provider key is claimed first, so releasing it after the
        // username collides must not wait on the colliding entry's shard.
        for i in 0..500u64 {
            let store = MemoryStore::new();
            store.create_user(&User::new("AB")).await.unwrap();

            let mut user = User::new("ab");
            user.facebook_id = Some(i);
            let err = store.create_user(&user).await.unwrap_err();
            assert!(err.is_duplicate(UniqueField::Username));

            assert_eq!(store.len(), 1);
            assert!(store
                .find_by_provider(&ProviderKey::Facebook(i))
                .await
                .unwrap()
                .is_none());
        }
    }

    #[tokio::test]
    async fn test_claims_always_resolve_to_user() {
        let store = MemoryStore::new();
        let mut user = User::new("alice");
        user.twitter_id = Some(5);
        store.create_user(&user).await.unwrap();

        for entry in store.keys.iter() {
            assert!(store.users.contains_key(entry.value()));
        }

        let mut clash = User::new("bob");
        clash.twitter_id = Some(5);
        store.create_user(&clash).await.unwrap_err();
        assert!(store.get_user(&clash.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_user() {
        let store = MemoryStore::new();
        let mut user = User::new("alice");
        user.email = Some("nope".to_string());

        let err = store.save_user(&user).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.is_empty());
    }
}
