use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::AgentError;

pub type ChunkStream = BoxStream<'static, Result<Bytes, AgentError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInvocation {
    pub agent_id: String,
    pub alias_id: String,
    pub session_id: String,
    pub input_text: String,
}

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    fn name(&self) -> &'static str;

    async fn invoke(&self, invocation: AgentInvocation) -> Result<ChunkStream, AgentError>;
}
