use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Bedrock client is not available. Cannot proceed.")]
    Unavailable,
    #[error("agent request failed: {0}")]
    Request(String),
    #[error("agent response stream failed: {0}")]
    Stream(String),
    #[error("agent reply chunk is not valid UTF-8: {0}")]
    Decode(String),
    #[error("the request ended before the agent replied")]
    Interrupted,
}
