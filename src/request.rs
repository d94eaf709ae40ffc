// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The slice of an inbound request that backends need: where it was
//! addressed, so OAuth callback URIs can be built absolute.

use axum::http::{header, HeaderMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    scheme: String,
    host: String,
}

impl RequestContext {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// Derive scheme and host from request headers.
    ///
    /// `X-Forwarded-Proto` wins when present (TLS terminated upstream);
    /// otherwise localhost is plain HTTP and everything else HTTPS.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost:8080")
            .to_string();

        let forwarded = headers
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| s == "http" || s == "https");

        let scheme = forwarded.unwrap_or_else(|| {
            if host.contains("localhost") || host.contains("127.0.0.1") {
                "http".to_string()
            } else {
                "https".to_string()
            }
        });

        Self { scheme, host }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Join `path` onto this request's origin.
    pub fn build_absolute_uri(&self, path: &str) -> String {
        format!(
            "{}://{}/{}",
            self.scheme,
            self.host,
            path.trim_start_matches('/')
        )
    }
}
