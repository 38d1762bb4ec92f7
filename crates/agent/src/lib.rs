mod bedrock;
mod error;
mod local;
mod relay;
mod runtime;

use std::sync::Arc;

use aws_config::SdkConfig;
use partnerdesk_core::{AgentBackend, AgentSettings};

pub use bedrock::BedrockAgentRuntime;
pub use error::AgentError;
pub use local::LocalAgentRuntime;
pub use relay::{AgentRelay, ChatSession, Message, Role, SessionState};
pub use runtime::{AgentInvocation, AgentRuntime, ChunkStream};

pub fn relay_for(settings: &AgentSettings, sdk: Option<&SdkConfig>) -> AgentRelay {
    let runtime: Option<Arc<dyn AgentRuntime>> = match settings.backend {
        AgentBackend::Local => Some(Arc::new(LocalAgentRuntime::new())),
        AgentBackend::Bedrock => {
            sdk.map(|sdk| Arc::new(BedrockAgentRuntime::new(sdk)) as Arc<dyn AgentRuntime>)
        }
    };
    AgentRelay::new(runtime, settings)
}
