use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use partnerdesk_core::AgentSettings;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AgentError;
use crate::runtime::{AgentInvocation, AgentRuntime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingReply,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    id: Uuid,
    messages: Vec<Message>,
    state: SessionState,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn interrupt(&mut self) {
        if self.state == SessionState::AwaitingReply {
            warn!(session_id = %self.id, "agent_turn_interrupted");
            self.push(
                Role::Assistant,
                format!("An error occurred: {}", AgentError::Interrupted),
            );
            self.state = SessionState::Idle;
        }
    }

    fn push(&mut self, role: Role, content: String) {
        self.messages.push(Message { role, content });
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AgentRelay {
    runtime: Option<Arc<dyn AgentRuntime>>,
    agent_id: String,
    alias_id: String,
}

impl AgentRelay {
    pub fn new(runtime: Option<Arc<dyn AgentRuntime>>, settings: &AgentSettings) -> Self {
        Self {
            runtime,
            agent_id: settings.agent_id.clone(),
            alias_id: settings.alias_id.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn backend(&self) -> Option<&'static str> {
        self.runtime.as_ref().map(|runtime| runtime.name())
    }

    pub async fn send(&self, session: &mut ChatSession, prompt: &str) -> Message {
        session.push(Role::User, prompt.to_string());
        session.state = SessionState::AwaitingReply;
        let started = Instant::now();
        let content = match self.complete(session.id, prompt).await {
            Ok(reply) => {
                info!(
                    session_id = %session.id,
                    latency_ms = started.elapsed().as_millis() as u64,
                    reply_chars = reply.chars().count(),
                    "agent_reply"
                );
                reply
            }
            Err(err) => {
                error!(session_id = %session.id, error = %err, "agent_failed");
                format!("An error occurred: {err}")
            }
        };
        let reply = Message {
            role: Role::Assistant,
            content,
        };
        session.messages.push(reply.clone());
        session.state = SessionState::Idle;
        reply
    }

    async fn complete(&self, session_id: Uuid, prompt: &str) -> Result<String, AgentError> {
        let runtime = self.runtime.as_ref().ok_or(AgentError::Unavailable)?;
        let mut chunks = runtime
            .invoke(AgentInvocation {
                agent_id: self.agent_id.clone(),
                alias_id: self.alias_id.clone(),
                session_id: session_id.to_string(),
                input_text: prompt.to_string(),
            })
            .await?;
        let mut reply = String::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            let text =
                std::str::from_utf8(&chunk).map_err(|err| AgentError::Decode(err.to_string()))?;
            reply.push_str(text);
        }
        Ok(reply)
    }
}
