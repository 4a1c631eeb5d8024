//! In-memory chat sessions

use agent_core::Context;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Sessions kept before the least recently used are evicted
pub const DEFAULT_MAX_SESSIONS: u64 = 10_000;

/// A session untouched for this long is dropped
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(60 * 60);

/// A session's conversation state; held for the duration of a turn
pub type SessionHandle = Arc<Mutex<Context>>;

/// Chat sessions keyed by id
///
/// Turns within one session are serialized by the session's lock; different
/// sessions run independently. Idle sessions expire and the store is capped.
/// A turn already holding a handle finishes even if its session is evicted.
pub struct SessionStore {
    sessions: Cache<String, SessionHandle>,
}

impl SessionStore {
    /// Store with the default capacity and idle timeout
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE)
    }

    /// Store holding at most `max_sessions`, each expiring after `idle` without use
    pub fn with_limits(max_sessions: u64, idle: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(max_sessions)
                .time_to_idle(idle)
                .build(),
        }
    }

    /// The session for `id`, creating it (with a fresh id when `None`)
    pub async fn get_or_create(&self, id: Option<&str>) -> (String, SessionHandle) {
        let id = id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        let handle = self
            .sessions
            .get_with(id.clone(), async {
                debug!(session_id = %id, "Created chat session");
                Arc::new(Mutex::new(Context::new().with_session_id(id.clone())))
            })
            .await;
        (id, handle)
    }

    /// The live session for `id`
    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id).await
    }

    /// Number of live sessions
    pub async fn len(&self) -> u64 {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count()
    }

    /// True when no session is live
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_are_reused_by_id() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);

        let (id, first) = store.get_or_create(None).await;
        assert!(Uuid::parse_str(&id).is_ok());
        first.lock().await.insert("marker", serde_json::json!(1));

        let (same_id, again) = store.get_or_create(Some(&id)).await;
        assert_eq!(same_id, id);
        assert!(again.lock().await.get("marker").is_some());
        assert_eq!(again.lock().await.session_id(), Some(id.as_str()));

        let (named, _) = store.get_or_create(Some("browser-tab-1")).await;
        assert_eq!(named, "browser-tab-1");
        assert_eq!(store.len().await, 2);
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_idle_session_expires() {
        let store = SessionStore::with_limits(100, Duration::from_millis(50));
        let (id, _) = store.get_or_create(Some("browser-tab-1")).await;
        assert!(store.get(&id).await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(store.get(&id).await.is_none());
        assert!(store.is_empty().await);

        let (_, fresh) = store.get_or_create(Some(&id)).await;
        assert!(fresh.lock().await.get("marker").is_none());
    }

    #[tokio::test]
    async fn test_store_is_capped() {
        let store = SessionStore::with_limits(5, DEFAULT_SESSION_IDLE);
        for i in 0..50 {
            store.get_or_create(Some(&format!("tab-{i}"))).await;
        }
        assert!(store.len().await <= 5);
    }
}
