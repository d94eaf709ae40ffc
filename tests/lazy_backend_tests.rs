// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Guest user provisioning.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use piplmesh_auth::backends::lazy::{GUEST_SUFFIX_LEN, GUEST_USERNAME_PREFIX};
use piplmesh_auth::backends::{AuthBackend, Credentials, LazyUserBackend};
use piplmesh_auth::db::{FirestoreDb, MemoryStore, ProviderKey, UserStore};
use piplmesh_auth::error::{AppError, Result, UniqueField};
use piplmesh_auth::models::User;
use piplmesh_auth::request::RequestContext;

/// A store whose creates always fail with a duplicate on `field`.
struct ConflictingStore {
    field: UniqueField,
    creates: AtomicUsize,
}

#[async_trait]
impl UserStore for ConflictingStore {
    async fn get_user(&self, _id: &str) -> Result<Option<User>> {
        Ok(None)
    }

    async fn find_by_username(&self, _username: &str) -> Result<Option<User>> {
        Ok(None)
    }

    async fn find_by_provider(&self, _key: &ProviderKey) -> Result<Option<User>> {
        Ok(None)
    }

    async fn create_user(&self, _user: &User) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Err(AppError::DuplicateKey(self.field))
    }

    async fn save_user(&self, _user: &User) -> Result<()> {
        Ok(())
    }
}

fn request() -> RequestContext {
    RequestContext::new("http", "localhost:8000")
}

fn is_guest_username(name: &str) -> bool {
    name.strip_prefix(GUEST_USERNAME_PREFIX).is_some_and(|suffix| {
        suffix.len() == GUEST_SUFFIX_LEN && suffix.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

#[tokio::test]
async fn test_guest_user_created() {
    let store = Arc::new(MemoryStore::new());
    let backend = LazyUserBackend::new(store.clone());

    let user = backend
        .authenticate(&Credentials::Guest, &request())
        .await
        .unwrap()
        .unwrap();

    assert!(is_guest_username(&user.username), "bad name {}", user.username);
    assert!(!user.has_usable_password());
    assert!(user.is_active);
    assert_eq!(store.len(), 1);
    assert_eq!(
        store.get_user(&user.id).await.unwrap().unwrap().username,
        user.username
    );
}

#[tokio::test]
async fn test_guest_retries_on_username_collision() {
    let store = Arc::new(MemoryStore::new());
    store.create_user(&User::new("guest-ab12cd")).await.unwrap();

    let suffixes = Arc::new(Mutex::new(vec!["zz99yy".to_string(), "ab12cd".to_string()]));
    let calls = suffixes.clone();
    let backend = LazyUserBackend::with_suffix_source(
        store.clone(),
        Arc::new(move || calls.lock().unwrap().pop().unwrap_or_default()),
    );

    let user = backend.authenticate_guest().await.unwrap();

    assert_eq!(user.username, "guest-zz99yy");
    assert!(suffixes.lock().unwrap().is_empty());
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_guest_collision_is_case_insensitive() {
    let store = Arc::new(MemoryStore::new());
    store.create_user(&User::new("guest-ABC123")).await.unwrap();

    let suffixes = Arc::new(Mutex::new(vec!["xyz789".to_string(), "abc123".to_string()]));
    let backend = LazyUserBackend::with_suffix_source(
        store.clone(),
        Arc::new(move || suffixes.lock().unwrap().pop().unwrap_or_default()),
    );

    let user = backend.authenticate_guest().await.unwrap();
    assert_eq!(user.username, "guest-xyz789");
}

#[tokio::test]
async fn test_many_guests_have_unique_names() {
    let store = Arc::new(MemoryStore::new());
    let backend = LazyUserBackend::new(store.clone());

    let mut names = HashSet::new();
    for _ in 0..2000 {
        let user = backend.authenticate_guest().await.unwrap();
        assert!(is_guest_username(&user.username), "bad name {}", user.username);
        assert!(names.insert(user.username.to_lowercase()));
    }

    assert_eq!(store.len(), 2000);
}

#[tokio::test]
async fn test_ignores_other_credentials() {
    let store = Arc::new(MemoryStore::new());
    let backend = LazyUserBackend::new(store.clone());

    let creds = Credentials::Password {
        username: "alice".to_string(),
        password: "x".to_string(),
    };
    assert!(backend.authenticate(&creds, &request()).await.unwrap().is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_storage_failure_is_not_retried() {
    let backend = LazyUserBackend::new(Arc::new(FirestoreDb::new_mock()));

    let err = backend.authenticate_guest().await.unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
}

#[tokio::test]
async fn test_non_username_conflict_is_not_retried() {
    let store = Arc::new(ConflictingStore {
        field: UniqueField::FacebookId,
        creates: AtomicUsize::new(0),
    });
    let backend = LazyUserBackend::new(store.clone());

    let err = backend.authenticate_guest().await.unwrap_err();
    assert!(err.is_duplicate(UniqueField::FacebookId));
    assert_eq!(store.creates.load(Ordering::SeqCst), 1);
}
