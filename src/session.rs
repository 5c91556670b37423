use crate::assistants::{ChatSession, Persona};
use crate::utils::bet_tracker::BetTracker;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Sessions idle longer than this are dropped
pub const SESSION_TTL_HOURS: i64 = 24;

/// Per-visitor state: tracked bets and assistant conversations
#[derive(Debug, Clone)]
pub struct Session {
    pub tracker: BetTracker,
    pub chats: HashMap<Persona, ChatSession>,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            tracker: BetTracker::new(),
            chats: HashMap::new(),
            last_seen: Utc::now(),
        }
    }
}

/// Sessions keyed by the id stored in the visitor's cookie
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh and return `id` when it names a live session
    pub async fn touch(&self, id: Option<Uuid>) -> Option<Uuid> {
        let id = id?;
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id)?;
        let now = Utc::now();
        if session.last_seen < now - Duration::hours(SESSION_TTL_HOURS) {
            return None;
        }
        session.last_seen = now;
        Some(id)
    }

    /// Run `f` against a session's state. The session is created on first use.
    pub async fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.sessions.write().await;

        if !sessions.contains_key(&id) {
            let cutoff = Utc::now() - Duration::hours(SESSION_TTL_HOURS);
            let before = sessions.len();
            sessions.retain(|_, session| session.last_seen >= cutoff);
            if sessions.len() < before {
                tracing::debug!("Expired {} idle sessions", before - sessions.len());
            }
        }

        let session = sessions.entry(id).or_insert_with(Session::new);
        session.last_seen = Utc::now();
        f(session)
    }

    /// Copy of the conversation with `persona`, so the model call can run
    /// without holding the store lock
    pub async fn chat(&self, id: Uuid, persona: Persona) -> ChatSession {
        self.with_session(id, |session| {
            session
                .chats
                .get(&persona)
                .cloned()
                .unwrap_or_else(|| ChatSession::new(persona))
        })
        .await
    }

    pub async fn save_chat(&self, id: Uuid, chat: ChatSession) {
        self.with_session(id, |session| {
            session.chats.insert(chat.persona(), chat);
        })
        .await
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
