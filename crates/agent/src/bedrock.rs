use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockagentruntime::error::DisplayErrorContext;
use aws_sdk_bedrockagentruntime::types::ResponseStream;
use aws_sdk_bedrockagentruntime::Client;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::error::AgentError;
use crate::runtime::{AgentInvocation, AgentRuntime, ChunkStream};

#[derive(Clone)]
pub struct BedrockAgentRuntime {
    client: Client,
}

impl BedrockAgentRuntime {
    pub fn new(sdk: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk),
        }
    }
}

#[async_trait]
impl AgentRuntime for BedrockAgentRuntime {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    async fn invoke(&self, invocation: AgentInvocation) -> Result<ChunkStream, AgentError> {
        info!(
            agent_id = %invocation.agent_id,
            session_id = %invocation.session_id,
            "invoke_agent"
        );
        let output = self
            .client
            .invoke_agent()
            .agent_id(invocation.agent_id)
            .agent_alias_id(invocation.alias_id)
            .session_id(invocation.session_id)
            .input_text(invocation.input_text)
            .send()
            .await
            .map_err(|err| AgentError::Request(DisplayErrorContext(&err).to_string()))?;

        let chunks = stream::unfold(Some(output.completion), |state| async move {
            let mut receiver = state?;
            loop {
                match receiver.recv().await {
                    Ok(Some(ResponseStream::Chunk(part))) => {
                        let payload = part
                            .bytes()
                            .map(|blob| Bytes::copy_from_slice(blob.as_ref()))
                            .unwrap_or_default();
                        return Some((Ok(payload), Some(receiver)));
                    }
                    Ok(Some(other)) => {
                        debug!(event = ?other, "skipping non-chunk agent event");
                    }
                    Ok(None) => return None,
                    Err(err) => {
                        let err = AgentError::Stream(DisplayErrorContext(&err).to_string());
                        return Some((Err(err), None));
                    }
                }
            }
        });
        Ok(chunks.boxed())
    }
}
