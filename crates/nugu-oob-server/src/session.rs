//! Browser sessions keyed by a cookie.
//!
//! Holds the in-flight CSRF state and the last token issued to this browser.
//! Nothing here is persisted; a restart forgets every session.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use nugu_oob_oauth::TokenRecord;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "nugu_oob_session";

/// Default maximum number of live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Default idle time after which a session is forgotten (1 hour).
pub const DEFAULT_SESSION_TTL: Option<Duration> = Some(Duration::from_secs(3600));

/// Per-browser session state.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    /// CSRF state for the authorization-code flow in progress.
    pub oauth_state: Option<String>,
    /// Last token issued during this session.
    pub token: Option<TokenRecord>,
}

#[derive(Debug)]
struct Entry {
    data: SessionData,
    last_seen: Instant,
}

/// In-memory session store.
///
/// Bounded: idle sessions expire after the TTL, and when the store is full
/// the least recently used session is evicted to make room.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
    max_sessions: usize,
    ttl: Option<Duration>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_config(DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    /// Create a store with default capacity and TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with explicit capacity and idle TTL.
    pub fn with_config(max_sessions: usize, ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
            ttl,
        }
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(entry.last_seen) >= ttl)
    }

    /// Snapshot of a session, if the id is known and not expired.
    ///
    /// Reading a session counts as activity.
    pub async fn get(&self, id: Option<Uuid>) -> Option<SessionData> {
        let id = id?;
        let now = Instant::now();
        let mut sessions = self.inner.write().await;

        let entry = sessions.get_mut(&id)?;
        if self.is_expired(entry, now) {
            sessions.remove(&id);
            debug!(session = %id, "Session expired");
            return None;
        }
        entry.last_seen = now;
        Some(entry.data.clone())
    }

    /// Mutate a session, creating it when the id is absent, unknown or expired.
    ///
    /// Returns the id the caller must hand back in the cookie.
    pub async fn update<F>(&self, id: Option<Uuid>, f: F) -> Uuid
    where
        F: FnOnce(&mut SessionData),
    {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        sessions.retain(|_, entry| !self.is_expired(entry, now));

        let id = match id {
            Some(id) if sessions.contains_key(&id) => id,
            _ => {
                if sessions.len() >= self.max_sessions
                    && let Some(oldest) = sessions
                        .iter()
                        .min_by_key(|(_, entry)| entry.last_seen)
                        .map(|(id, _)| *id)
                {
                    sessions.remove(&oldest);
                    debug!(session = %oldest, "Session evicted");
                }
                let id = Uuid::new_v4();
                debug!(session = %id, "Session created");
                id
            }
        };

        let entry = sessions.entry(id).or_insert_with(|| Entry {
            data: SessionData::default(),
            last_seen: now,
        });
        entry.last_seen = now;
        f(&mut entry.data);
        id
    }

    /// Drop a session. Returns `true` if it existed.
    pub async fn remove(&self, id: Option<Uuid>) -> bool {
        let Some(id) = id else {
            return false;
        };
        let removed = self.inner.write().await.remove(&id).is_some();
        if removed {
            debug!(session = %id, "Session cleared");
        }
        removed
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        before - sessions.len()
    }

    /// Number of sessions held, including ones not yet purged.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cookie handling
// ─────────────────────────────────────────────────────────────────────────────

/// Session id carried by the request, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCookie(pub Option<Uuid>);

impl SessionCookie {
    pub fn id(&self) -> Option<Uuid> {
        self.0
    }
}

impl<S> FromRequestParts<S> for SessionCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionCookie(session_id_from_headers(&parts.headers)))
    }
}

/// Extract the session id from the `Cookie` headers.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value binding the browser to a session.
pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}; HttpOnly; SameSite=Lax; Path=/", SESSION_COOKIE, id)
}

/// `Set-Cookie` value that expires the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_update_creates_session() {
        let store = SessionStore::new();
        let id = store
            .update(None, |s| s.oauth_state = Some("state".to_string()))
            .await;

        let session = store.get(Some(id)).await.unwrap();
        assert_eq!(session.oauth_state.as_deref(), Some("state"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_reuses_known_session() {
        let store = SessionStore::new();
        let id = store.update(None, |_| {}).await;
        let same = store
            .update(Some(id), |s| s.oauth_state = Some("x".to_string()))
            .await;

        assert_eq!(id, same);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_replaces_unknown_id() {
        let store = SessionStore::new();
        let stale = Uuid::new_v4();
        let id = store.update(Some(stale), |_| {}).await;

        assert_ne!(id, stale);
        assert!(store.get(Some(stale)).await.is_none());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = SessionStore::with_config(2, None);
        let first = store.update(None, |_| {}).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.update(None, |_| {}).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        // Touch the first so the second becomes the oldest
        assert!(store.get(Some(first)).await.is_some());
        tokio::time::sleep(Duration::from_millis(5)).await;

        let third = store.update(None, |_| {}).await;
        assert_eq!(store.len().await, 2);
        assert!(store.get(Some(first)).await.is_some());
        assert!(store.get(Some(second)).await.is_none());
        assert!(store.get(Some(third)).await.is_some());
    }

    #[tokio::test]
    async fn test_many_anonymous_requests_stay_bounded() {
        let store = SessionStore::with_config(8, None);
        for _ in 0..50 {
            store.update(None, |_| {}).await;
        }
        assert_eq!(store.len().await, 8);
    }

    #[tokio::test]
    async fn test_expired_session_is_forgotten() {
        let store = SessionStore::with_config(10, Some(Duration::ZERO));
        let id = store
            .update(None, |s| s.oauth_state = Some("state".to_string()))
            .await;

        assert!(store.get(Some(id)).await.is_none());
        assert!(store.is_empty().await);

        store.update(None, |_| {}).await;
        assert_eq!(store.cleanup_expired().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::new();
        let id = store.update(None, |_| {}).await;

        assert!(store.remove(Some(id)).await);
        assert!(!store.remove(Some(id)).await);
        assert!(!store.remove(None).await);
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_session_id_from_headers() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}; other=1", SESSION_COOKIE, id))
                .unwrap(),
        );

        assert_eq!(session_id_from_headers(&headers), Some(id));
    }

    #[test]
    fn test_session_id_ignores_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("nugu_oob_session=not-a-uuid"),
        );
        assert_eq!(session_id_from_headers(&headers), None);
        assert_eq!(session_id_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_values() {
        let id = Uuid::new_v4();
        assert!(session_cookie(id).starts_with(&format!("nugu_oob_session={}", id)));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
