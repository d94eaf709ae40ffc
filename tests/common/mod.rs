// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test helpers: a mock provider API and preconfigured stores.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use piplmesh_auth::backends::Authenticator;
use piplmesh_auth::config::Config;
use piplmesh_auth::db::{FirestoreDb, MemoryStore};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Responses served by the mock provider, and the requests it saw.
#[derive(Default)]
pub struct MockProvider {
    pub facebook_profile: Mutex<Value>,
    pub twitter_user: Mutex<Value>,
    pub foursquare_user: Mutex<Value>,
    /// `(path, query)` of every request, in arrival order
    pub requests: Mutex<Vec<(String, HashMap<String, String>)>>,
}

impl MockProvider {
    fn record(&self, path: &str, query: &HashMap<String, String>) {
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), query.clone()));
    }

    /// Query of the most recent request to `path`.
    #[allow(dead_code)]
    pub fn last_query(&self, path: &str) -> Option<HashMap<String, String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, q)| q.clone())
    }

    #[allow(dead_code)]
    pub fn set_facebook_profile(&self, profile: Value) {
        *self.facebook_profile.lock().unwrap() = profile;
    }

    #[allow(dead_code)]
    pub fn set_twitter_user(&self, user: Value) {
        *self.twitter_user.lock().unwrap() = user;
    }

    #[allow(dead_code)]
    pub fn set_foursquare_user(&self, user: Value) {
        *self.foursquare_user.lock().unwrap() = user;
    }
}

type Shared = State<Arc<MockProvider>>;
type Params = Query<HashMap<String, String>>;

/// Facebook answers in the legacy form-encoded format; the token embeds the
/// code so tests can tell logins apart.
async fn facebook_token(State(mock): Shared, Query(q): Params) -> (StatusCode, String) {
    mock.record("/oauth/access_token", &q);
    match q.get("code") {
        Some(code) if code != "bad" => (
            StatusCode::OK,
            format!("access_token=fb-token-{}&expires=5183999", code),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Invalid verification code format."}}"#.to_string(),
        ),
    }
}

async fn facebook_me(State(mock): Shared, Query(q): Params) -> Json<Value> {
    mock.record("/me", &q);
    Json(mock.facebook_profile.lock().unwrap().clone())
}

async fn twitter_verify(
    State(mock): Shared,
    Query(q): Params,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    mock.record("/1.1/account/verify_credentials.json", &q);
    let signed = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| {
            h.starts_with("OAuth ")
                && h.contains("oauth_signature=")
                && !h.contains(r#"oauth_token="revoked""#)
        });

    if !signed {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"errors": [{"code": 32, "message": "Could not authenticate you."}]})),
        );
    }
    (StatusCode::OK, Json(mock.twitter_user.lock().unwrap().clone()))
}

async fn foursquare_token(State(mock): Shared, Query(q): Params) -> Json<Value> {
    mock.record("/oauth2/access_token", &q);
    match q.get("code") {
        Some(code) if code != "bad" => Json(json!({"access_token": format!("4sq-token-{}", code)})),
        _ => Json(json!({"error": "invalid_grant"})),
    }
}

async fn foursquare_self(State(mock): Shared, Query(q): Params) -> Json<Value> {
    mock.record("/v2/users/self", &q);
    let user = mock.foursquare_user.lock().unwrap().clone();
    let response = if user.is_null() {
        json!({})
    } else {
        json!({"user": user})
    };
    Json(json!({"meta": {"code": 200}, "response": response}))
}

/// Start the mock provider on an ephemeral port.
/// Returns its base URL and shared state.
#[allow(dead_code)]
pub async fn start_mock_provider() -> (String, Arc<MockProvider>) {
    let mock = Arc::new(MockProvider::default());

    let app = Router::new()
        .route("/oauth/access_token", get(facebook_token))
        .route("/me", get(facebook_me))
        .route("/1.1/account/verify_credentials.json", get(twitter_verify))
        .route("/oauth2/access_token", get(foursquare_token))
        .route("/v2/users/self", get(foursquare_self))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock provider");
    let addr = listener.local_addr().expect("No local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock provider failed");
    });

    (format!("http://{}", addr), mock)
}

/// Test config with every provider pointed at `base_url`.
#[allow(dead_code)]
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::test_default();
    config.facebook_graph_url = base_url.to_string();
    config.twitter_api_url = base_url.to_string();
    config.foursquare_oauth_url = base_url.to_string();
    config.foursquare_api_url = base_url.to_string();
    config
}

/// A memory store, a mock provider, and an authenticator wired to both.
#[allow(dead_code)]
pub async fn test_authenticator() -> (Authenticator, Arc<MemoryStore>, Arc<MockProvider>) {
    let (base_url, mock) = start_mock_provider().await;
    let store = Arc::new(MemoryStore::new());
    let authenticator = Authenticator::from_config(&test_config(&base_url), store.clone());
    (authenticator, store, mock)
}
