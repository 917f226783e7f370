//! Scripted providers for orchestrator tests.

use async_trait::async_trait;
use ferrocode_core::error::ProviderError;
use ferrocode_core::event::AgentEvent;
use ferrocode_core::provider::{ChunkStream, Provider, ProviderRequest, StreamChunk};
use std::sync::Mutex;
use tokio::sync::{Notify, mpsc};

/// Streams one scripted reply per call, chunk by chunk.
///
/// Panics if called more often than replies were scripted.
pub struct ScriptedProvider {
    replies: Mutex<Vec<Vec<String>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    gate: Option<(Notify, Notify)>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Vec<&str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|chunks| chunks.into_iter().map(String::from).collect())
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold every stream open until [`release`](Self::release) is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some((Notify::new(), Notify::new()));
        self
    }

    pub async fn wait_until_called(&self) {
        if let Some((called, _)) = &self.gate {
            called.notified().await;
        }
    }

    pub fn release(&self) {
        if let Some((_, open)) = &self.gate {
            open.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn next_reply(&self, request: ProviderRequest) -> Vec<String> {
        self.requests.lock().unwrap().push(request);
        let mut replies = self.replies.lock().unwrap();
        assert!(!replies.is_empty(), "ScriptedProvider: no more replies");
        replies.remove(0)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        let chunks = self.next_reply(request);
        if let Some((called, open)) = &self.gate {
            called.notify_one();
            open.notified().await;
        }

        let (tx, rx) = mpsc::channel(chunks.len() + 1);
        for chunk in chunks {
            let _ = tx.send(Ok(StreamChunk::text(chunk))).await;
        }
        let _ = tx.send(Ok(StreamChunk::done())).await;
        Ok(rx)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["scripted-model".into()])
    }
}

/// Streams a few chunks, then fails.
pub struct FailingProvider {
    before: Vec<String>,
}

impl FailingProvider {
    pub fn after(chunks: Vec<&str>) -> Self {
        Self {
            before: chunks.into_iter().map(String::from).collect(),
        }
    }
}

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn stream(&self, _request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        let (tx, rx) = mpsc::channel(self.before.len() + 1);
        for chunk in &self.before {
            let _ = tx.send(Ok(StreamChunk::text(chunk.clone()))).await;
        }
        let _ = tx
            .send(Err(ProviderError::StreamInterrupted("connection reset".into())))
            .await;
        Ok(rx)
    }
}

/// Everything currently queued on a sink channel.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<AgentEvent>) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
