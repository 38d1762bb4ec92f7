use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderValue};
use parking_lot::Mutex;
use partnerdesk_agent::{ChatSession, Message};
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "partnerdesk_session";
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(12 * 60 * 60);

enum ChatSlot {
    Ready(ChatSession),
    InFlight { id: Uuid, messages: Vec<Message> },
}

struct Entry {
    chat: ChatSlot,
    last_seen: Instant,
}

impl Entry {
    fn expired(&self, idle: Duration) -> bool {
        matches!(self.chat, ChatSlot::Ready(_)) && self.last_seen.elapsed() >= idle
    }
}

pub struct SessionRegistry {
    idle: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_idle(DEFAULT_SESSION_IDLE)
    }

    pub fn with_idle(idle: Duration) -> Self {
        Self {
            idle,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.expired(self.idle));
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "sessions_pruned");
        }
        sessions.insert(
            token.clone(),
            Entry {
                chat: ChatSlot::Ready(ChatSession::new()),
                last_seen: Instant::now(),
            },
        );
        token
    }

    // Refreshes the idle clock of a live session.
    pub fn contains(&self, token: &str) -> bool {
        let mut sessions = self.sessions.lock();
        let Some(entry) = sessions.get_mut(token) else {
            return false;
        };
        if !entry.expired(self.idle) {
            entry.last_seen = Instant::now();
            return true;
        }
        sessions.remove(token);
        false
    }

    pub fn remove(&self, token: &str) -> bool {
        self.sessions.lock().remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn history(&self, token: &str) -> Option<(Uuid, Vec<Message>)> {
        match &self.sessions.lock().get(token)?.chat {
            ChatSlot::Ready(chat) => Some((chat.id(), chat.messages().to_vec())),
            ChatSlot::InFlight { id, messages } => Some((*id, messages.clone())),
        }
    }

    /// `None` when the token is unknown or a turn is already in progress.
    pub fn checkout(&self, token: &str) -> Option<ChatTurn<'_>> {
        let mut sessions = self.sessions.lock();
        let entry = sessions.get_mut(token)?;
        let (id, messages) = match &entry.chat {
            ChatSlot::Ready(chat) => (chat.id(), chat.messages().to_vec()),
            ChatSlot::InFlight { .. } => return None,
        };
        match std::mem::replace(&mut entry.chat, ChatSlot::InFlight { id, messages }) {
            ChatSlot::Ready(chat) => Some(ChatTurn {
                registry: self,
                token: token.to_string(),
                chat,
            }),
            ChatSlot::InFlight { .. } => None,
        }
    }

    fn checkin(&self, token: &str, chat: ChatSession) {
        if let Some(entry) = self.sessions.lock().get_mut(token) {
            entry.chat = ChatSlot::Ready(chat);
            entry.last_seen = Instant::now();
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Hands the conversation back when dropped, even if the request was cancelled
// mid-turn.
pub struct ChatTurn<'a> {
    registry: &'a SessionRegistry,
    token: String,
    chat: ChatSession,
}

impl ChatTurn<'_> {
    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatSession {
        &mut self.chat
    }
}

impl Drop for ChatTurn<'_> {
    fn drop(&mut self) {
        let mut chat = std::mem::take(&mut self.chat);
        chat.interrupt();
        self.registry.checkin(&self.token, chat);
    }
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

pub fn session_cookie(token: &str) -> HeaderValue {
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict");
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| expired_cookie())
}

pub fn expired_cookie() -> HeaderValue {
    HeaderValue::from_static("partnerdesk_session=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}
