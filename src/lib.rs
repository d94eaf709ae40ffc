// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! PiplMesh authentication: user model and login backends.
//!
//! This crate resolves credentials (passwords, Facebook/Foursquare OAuth
//! codes, Twitter OAuth 1.0a tokens, or nothing at all for guests) into
//! user records kept in a document store.

pub mod backends;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod request;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use backends::Authenticator;
use config::{Config, StoreKind};
use db::{FirestoreDb, MemoryStore, UserStore};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
    pub authenticator: Authenticator,
}

impl AppState {
    /// Open the configured store and build the backends.
    pub async fn from_config(config: Config) -> error::Result<Self> {
        let store: Arc<dyn UserStore> = match config.store {
            StoreKind::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
            StoreKind::Memory => Arc::new(MemoryStore::new()),
        };

        let authenticator = Authenticator::from_config(&config, store.clone());

        Ok(Self {
            config,
            store,
            authenticator,
        })
    }
}
