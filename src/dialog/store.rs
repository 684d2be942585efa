use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use teloxide::types::ChatId;
use tokio::sync::{Mutex, RwLock};

use crate::models::Session;

/// In-progress dialogs are discarded after this much inactivity.
pub const SESSION_TIMEOUT_SECS: i64 = 5 * 60;

/// Time source, injected so expiry can be driven in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Keyed store of in-progress dialog sessions, owned by the bot instance.
/// Each entry carries its own mutex so events for one chat are handled one
/// at a time even if the transport redelivers or runs multiple workers.
pub struct SessionStore {
    sessions: RwLock<HashMap<ChatId, Arc<Mutex<Session>>>>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            clock,
            timeout: Duration::seconds(SESSION_TIMEOUT_SECS),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn get(&self, chat_id: ChatId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&chat_id).cloned()
    }

    /// Returns the session cell for the chat, creating a fresh one if absent.
    /// Expiry is the caller's concern: the caller holds the per-key lock and
    /// decides whether to restart the dialog.
    pub async fn get_or_create(&self, chat_id: ChatId) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.write().await;
        let now = self.clock.now();
        sessions
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::fresh(now))))
            .clone()
    }

    /// True once the session has been idle strictly longer than the timeout.
    pub fn is_expired(&self, session: &Session) -> bool {
        self.clock.now().signed_duration_since(session.last_active) > self.timeout
    }

    pub fn touch(&self, session: &mut Session) {
        session.last_active = self.clock.now();
    }

    pub async fn clear(&self, chat_id: ChatId) {
        self.sessions.write().await.remove(&chat_id);
    }

    /// Drops expired entries. Entries currently locked by a handler are in
    /// use and left alone.
    pub async fn remove_expired(&self) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, cell| match cell.try_lock() {
            Ok(session) => !self.is_expired(&session),
            Err(_) => true,
        });
        let after = sessions.len();
        if after < before {
            log::debug!("🧹 Sessions cleaned: {} -> {} entries", before, after);
        }
    }
}
