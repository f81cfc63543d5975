//! Offline cache layer: request classification and caching strategies.
//!
//! Models the client-edge interception layer of the app. Every intercepted
//! request is classified once, the class maps to a fixed strategy, and the
//! [`controller::CacheController`] executes that strategy against a pluggable
//! network edge ([`Fetch`]) and a versioned [`cache::CacheSet`].
//!
//! The strategy table, not scattered conditionals, is the contract:
//!
//! | class       | strategy                                            |
//! |-------------|-----------------------------------------------------|
//! | Navigation  | network-first, cached page or offline page fallback |
//! | ApiRead     | network-first, cached JSON + `_offline` marker      |
//! | ApiWrite    | network-only, synthesized 503 when unreachable      |
//! | Static      | cache-first, fetch and fill on miss                 |

pub mod cache;
pub mod controller;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use cache::{CacheKey, CacheSet};
pub use controller::CacheController;

/// Path prefix that marks a request as a data-API call.
pub const API_PREFIX: &str = "/api/";

/// Page served when a navigation cannot be satisfied from network or cache.
pub const OFFLINE_PAGE: &str = "/offline.html";

// ── Request / response ──────────────────────────────────────────────

/// An intercepted request, reduced to what routing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineRequest {
    pub method: String,
    pub url: String,
    /// True for full-page navigations.
    pub navigation: bool,
    /// True when the request destination is a document (HTML).
    pub document: bool,
}

impl OfflineRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: "GET".into(),
            url: url.into(),
            navigation: false,
            document: false,
        }
    }

    pub fn navigate(url: &str) -> Self {
        Self {
            method: "GET".into(),
            url: url.into(),
            navigation: true,
            document: true,
        }
    }

    pub fn post(url: &str) -> Self {
        Self {
            method: "POST".into(),
            url: url.into(),
            navigation: false,
            document: false,
        }
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(&self.method, &self.url)
    }
}

/// A captured or synthesized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl OfflineResponse {
    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: "application/json".into(),
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }

    pub fn html(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/html".into(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Parse the body as JSON; `None` when it is not valid JSON.
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

// ── Classification ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    Navigation,
    ApiRead,
    ApiWrite,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Try network, fall back to cached page or the offline page.
    NetworkFirst,
    /// Try network, fall back to cached JSON with an offline marker.
    NetworkFirstJsonFallback,
    /// Never cached; synthesize a refusal when the network is down.
    NetworkOnly,
    /// Serve from cache, fetch and fill on miss.
    CacheFirst,
}

pub fn classify(req: &OfflineRequest) -> RequestClass {
    if req.navigation {
        RequestClass::Navigation
    } else if req.url.starts_with(API_PREFIX) {
        if req.method == "GET" {
            RequestClass::ApiRead
        } else {
            RequestClass::ApiWrite
        }
    } else {
        RequestClass::Static
    }
}

pub fn strategy_for(class: RequestClass) -> Strategy {
    match class {
        RequestClass::Navigation => Strategy::NetworkFirst,
        RequestClass::ApiRead => Strategy::NetworkFirstJsonFallback,
        RequestClass::ApiWrite => Strategy::NetworkOnly,
        RequestClass::Static => Strategy::CacheFirst,
    }
}

// ── Network edge ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable")]
    Offline,
    #[error("fetch failed: {0}")]
    Failed(String),
}

/// The pluggable network edge. Production wires a real client; tests script
/// responses and flip an offline toggle.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, req: &OfflineRequest) -> Result<OfflineResponse, FetchError>;
}
