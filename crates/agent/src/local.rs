use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use crate::error::AgentError;
use crate::runtime::{AgentInvocation, AgentRuntime, ChunkStream};

const DEFAULT_WORDS_PER_CHUNK: usize = 4;
const MAX_ECHO_WORDS: usize = 40;

#[derive(Debug, Clone)]
pub struct LocalAgentRuntime {
    words_per_chunk: usize,
}

impl LocalAgentRuntime {
    pub fn new() -> Self {
        Self::with_chunk_words(DEFAULT_WORDS_PER_CHUNK)
    }

    pub fn with_chunk_words(words_per_chunk: usize) -> Self {
        Self {
            words_per_chunk: words_per_chunk.max(1),
        }
    }

    pub fn reply_for(&self, input: &str) -> String {
        let summary = summarize_text(input, MAX_ECHO_WORDS);
        if summary.is_empty() {
            return "I did not receive a question. What would you like to know about our partners?"
                .to_string();
        }
        format!("(offline agent) You asked about: {summary}")
    }

    fn split(&self, reply: &str) -> Vec<Bytes> {
        let words: Vec<&str> = reply.split(' ').collect();
        words
            .chunks(self.words_per_chunk)
            .enumerate()
            .map(|(idx, group)| {
                let mut text = group.join(" ");
                if idx > 0 {
                    text.insert(0, ' ');
                }
                Bytes::from(text)
            })
            .collect()
    }
}

impl Default for LocalAgentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRuntime for LocalAgentRuntime {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn invoke(&self, invocation: AgentInvocation) -> Result<ChunkStream, AgentError> {
        let chunks = self.split(&self.reply_for(&invocation.input_text));
        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}

fn summarize_text(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<&str>>()
        .join(" ")
}
