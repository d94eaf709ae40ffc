//! Application configuration loaded from environment variables.
//!
//! Provider credentials are read once at startup and handed to each
//! backend explicitly; nothing reads settings after construction.

use std::env;

/// OAuth application credentials for one provider.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    /// Client ID / app ID / consumer key
    pub client_id: String,
    /// Client secret / app secret / consumer secret
    pub client_secret: String,
}

/// Which user store the binary should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Firestore,
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Providers (each pair optional) ---
    /// Facebook app ID and secret
    pub facebook: Option<ProviderCredentials>,
    /// Twitter consumer key and secret
    pub twitter: Option<ProviderCredentials>,
    /// Foursquare client ID and secret
    pub foursquare: Option<ProviderCredentials>,

    // --- Callback paths (joined with the request host) ---
    pub facebook_callback_path: String,
    pub foursquare_callback_path: String,

    // --- Provider endpoints ---
    pub facebook_graph_url: String,
    pub twitter_api_url: String,
    pub foursquare_oauth_url: String,
    pub foursquare_api_url: String,

    // --- Storage ---
    /// GCP project ID
    pub gcp_project_id: String,
    pub store: StoreKind,
}

pub const DEFAULT_FACEBOOK_GRAPH_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_TWITTER_API_URL: &str = "https://api.twitter.com";
pub const DEFAULT_FOURSQUARE_OAUTH_URL: &str = "https://foursquare.com";
pub const DEFAULT_FOURSQUARE_API_URL: &str = "https://api.foursquare.com";

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store = match env::var("USER_STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            Ok("firestore") | Err(_) => StoreKind::Firestore,
            Ok(other) => return Err(ConfigError::Invalid("USER_STORE", other.to_string())),
        };

        Ok(Self {
            facebook: provider_from_env("FACEBOOK_APP_ID", "FACEBOOK_APP_SECRET")?,
            twitter: provider_from_env("TWITTER_CONSUMER_KEY", "TWITTER_CONSUMER_SECRET")?,
            foursquare: provider_from_env("FOURSQUARE_CLIENT_ID", "FOURSQUARE_CLIENT_SECRET")?,
            facebook_callback_path: env::var("FACEBOOK_CALLBACK_PATH")
                .unwrap_or_else(|_| "/auth/facebook/callback".to_string()),
            foursquare_callback_path: env::var("FOURSQUARE_CALLBACK_PATH")
                .unwrap_or_else(|_| "/auth/foursquare/callback".to_string()),
            facebook_graph_url: env::var("FACEBOOK_GRAPH_URL")
                .unwrap_or_else(|_| DEFAULT_FACEBOOK_GRAPH_URL.to_string()),
            twitter_api_url: env::var("TWITTER_API_URL")
                .unwrap_or_else(|_| DEFAULT_TWITTER_API_URL.to_string()),
            foursquare_oauth_url: env::var("FOURSQUARE_OAUTH_URL")
                .unwrap_or_else(|_| DEFAULT_FOURSQUARE_OAUTH_URL.to_string()),
            foursquare_api_url: env::var("FOURSQUARE_API_URL")
                .unwrap_or_else(|_| DEFAULT_FOURSQUARE_API_URL.to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            store,
        })
    }

    /// Config for tests: every provider configured, memory store.
    pub fn test_default() -> Self {
        let creds = |id: &str, secret: &str| {
            Some(ProviderCredentials {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
            })
        };
        Self {
            facebook: creds("test_fb_app", "test_fb_secret"),
            twitter: creds("test_tw_key", "test_tw_secret"),
            foursquare: creds("test_4sq_id", "test_4sq_secret"),
            facebook_callback_path: "/auth/facebook/callback".to_string(),
            foursquare_callback_path: "/auth/foursquare/callback".to_string(),
            facebook_graph_url: DEFAULT_FACEBOOK_GRAPH_URL.to_string(),
            twitter_api_url: DEFAULT_TWITTER_API_URL.to_string(),
            foursquare_oauth_url: DEFAULT_FOURSQUARE_OAUTH_URL.to_string(),
            foursquare_api_url: DEFAULT_FOURSQUARE_API_URL.to_string(),
            gcp_project_id: "test-project".to_string(),
            store: StoreKind::Memory,
        }
    }
}

/// Read an optional credential pair. Both halves or neither.
fn provider_from_env(
    id_var: &'static str,
    secret_var: &'static str,
) -> Result<Option<ProviderCredentials>, ConfigError> {
    let id = env::var(id_var).ok().map(|v| v.trim().to_string());
    let secret = env::var(secret_var).ok().map(|v| v.trim().to_string());

    match (id, secret) {
        (Some(client_id), Some(client_secret)) => Ok(Some(ProviderCredentials {
            client_id,
            client_secret,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => {
            tracing::warn!(set = id_var, missing = secret_var, "Half-configured provider");
            Err(ConfigError::Missing(secret_var))
        }
        (None, Some(_)) => {
            tracing::warn!(set = secret_var, missing = id_var, "Half-configured provider");
            Err(ConfigError::Missing(id_var))
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
