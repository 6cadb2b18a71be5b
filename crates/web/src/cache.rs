//! Whole-response page cache.
//!
//! Rendered pages are stored by request path and query for a fixed time to
//! live. Nothing invalidates an entry when the underlying data changes; an
//! entry is only replaced once it has expired or after [`ResponseCache::clear`].
//! Only anonymous requests are served from or stored in the cache, since
//! a logged-in page carries its viewer's navigation bar.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;
use yatube_db::entities::user;

/// Default bound on stored entries.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// A stored response.
#[derive(Debug, Clone)]
struct CachedResponse {
    status: StatusCode,
    content_type: Option<HeaderValue>,
    body: Bytes,
    expires_at: Instant,
}

impl CachedResponse {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    fn to_response(&self) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        if let Some(content_type) = &self.content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type.clone());
        }
        response
    }
}

/// Process-wide response cache keyed by URL.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CachedResponse>>>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseCache {
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache holding at most `max_entries` responses. When full,
    /// the entry closest to expiry makes room for a new one.
    #[must_use]
    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh response for `key`.
    pub async fn get(&self, key: &str) -> Option<Response> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(Instant::now()))
            .map(CachedResponse::to_response)
    }

    /// Store a response body for `key`, replacing any previous entry.
    ///
    /// Expired entries are dropped first, then the entry closest to expiry
    /// if the cache is still full.
    pub async fn insert(
        &self,
        key: String,
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    ) {
        let now = Instant::now();
        let entry = CachedResponse {
            status,
            content_type,
            body,
            expires_at: now + self.ttl,
        };

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_fresh(now));

        if entries.len() >= self.max_entries
            && !entries.contains_key(&key)
            && let Some(evicted) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone())
        {
            entries.remove(&evicted);
            tracing::debug!(key = %evicted, "Page cache full, evicted entry");
        }

        entries.insert(key, entry);
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        tracing::debug!("Response cache cleared");
    }

    /// Number of stored entries, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn cache_key(req: &Request) -> String {
    req.uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), ToString::to_string)
}

/// Serve anonymous `GET` requests from the cache, storing successful
/// responses.
pub async fn cache_page(State(cache): State<ResponseCache>, req: Request, next: Next) -> Response {
    if req.method() != Method::GET || req.extensions().get::<user::Model>().is_some() {
        return next.run(req).await;
    }

    let key = cache_key(&req);
    if let Some(response) = cache.get(&key).await {
        tracing::debug!(key = %key, "Page cache hit");
        return response;
    }
    tracing::debug!(key = %key, "Page cache miss");

    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer response for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    cache
        .insert(
            key,
            parts.status,
            parts.headers.get(header::CONTENT_TYPE).cloned(),
            bytes.clone(),
        )
        .await;

    Response::from_parts(parts, Body::from(bytes))
}
