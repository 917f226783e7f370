//! OpenAI-compatible provider implementation.
//!
//! Works with: Groq (the default), OpenAI, OpenRouter, Ollama, vLLM and any
//! other endpoint exposing `/chat/completions` and `/models`.
//!
//! Supports:
//! - Streaming chat completions (SSE)
//! - Model listing

use async_trait::async_trait;
use futures::StreamExt;
use ferrocode_core::error::ProviderError;
use ferrocode_core::message::ChatMessage;
use ferrocode_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Deadline for non-streaming requests such as `/models`.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Longest silence tolerated between two reads of a streaming body.
const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// An OpenAI-compatible completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        // Streams are bounded per read (STREAM_IDLE_TIMEOUT), never in total.
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn to_api_messages(messages: &[ChatMessage]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }
        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }
        body
    }

    /// Map non-success statuses onto provider errors.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let body: ModelList = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let mut models: Vec<String> = body.data.into_iter().map(|m| m.id).collect();
        models.sort();
        Ok(models)
    }

    async fn stream(&self, request: ProviderRequest) -> std::result::Result<ChunkStream, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request, true);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(forward_sse(
            Box::pin(response.bytes_stream()),
            tx,
            self.name.clone(),
            STREAM_IDLE_TIMEOUT,
        ));

        Ok(rx)
    }
}

/// Read an SSE byte stream and forward parsed chunks until `[DONE]`, the end
/// of the body, an error, or `idle` without any data.
async fn forward_sse<S, B, E>(
    mut byte_stream: S,
    tx: mpsc::Sender<Result<StreamChunk, ProviderError>>,
    provider_name: String,
    idle: Duration,
) where
    S: futures::Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut lines = LineBuffer::default();

    loop {
        let bytes = match tokio::time::timeout(idle, byte_stream.next()).await {
            Ok(Some(Ok(b))) => b,
            Ok(Some(Err(e))) => {
                let _ = tx.send(Err(ProviderError::StreamInterrupted(e.to_string()))).await;
                return;
            }
            Ok(None) => break,
            Err(_) => {
                let message = format!("no data for {}s", idle.as_secs());
                let _ = tx.send(Err(ProviderError::StreamInterrupted(message))).await;
                return;
            }
        };

        lines.extend(bytes.as_ref());

        while let Some(line) = lines.next_line() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(provider = %provider_name, error = %e, "Dropping SSE line with invalid UTF-8");
                    continue;
                }
            };

            match parse_sse_line(&line) {
                SseLine::Skip => {}
                SseLine::Unparseable(error) => {
                    trace!(provider = %provider_name, line = %line, error = %error, "Ignoring unparseable SSE chunk");
                }
                SseLine::Chunk(chunk) => {
                    let done = chunk.done;
                    if tx.send(Ok(chunk)).await.is_err() {
                        return; // receiver dropped
                    }
                    if done {
                        return;
                    }
                }
            }
        }
    }

    // Stream ended without [DONE]
    let _ = tx.send(Ok(StreamChunk::done())).await;
}

/// Splits a byte stream into lines.
///
/// Network chunks can end in the middle of a multi-byte character, so bytes
/// are only decoded once a whole line has arrived.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// The next complete line, without its `\n` or `\r\n` terminator.
    fn next_line(&mut self) -> Option<Result<String, std::string::FromUtf8Error>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8(line))
    }
}

/// One line of an SSE body, interpreted.
#[derive(Debug)]
enum SseLine {
    /// Blank lines, comments, non-data fields, empty deltas
    Skip,
    Unparseable(String),
    Chunk(StreamChunk),
}

fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();

    if data == "[DONE]" {
        return SseLine::Chunk(StreamChunk::done());
    }

    let stream_resp = match serde_json::from_str::<StreamResponse>(data) {
        Ok(r) => r,
        Err(e) => return SseLine::Unparseable(e.to_string()),
    };

    // Usage arrives on the last chunk when the server reports it.
    if let Some(usage) = stream_resp.usage {
        let content = stream_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|c| !c.is_empty());
        return SseLine::Chunk(StreamChunk {
            content,
            done: true,
            usage: Some(usage.into()),
        });
    }

    match stream_resp.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(content) if !content.is_empty() => SseLine::Chunk(StreamChunk::text(content)),
        _ => SseLine::Skip,
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_keeps_name_and_url() {
        let provider = OpenAiCompatProvider::new("groq", GROQ_BASE_URL, "gsk-test");
        assert_eq!(provider.name(), "groq");
        assert_eq!(provider.base_url(), GROQ_BASE_URL);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("custom", "http://localhost:11434/v1/", "");
        assert_eq!(provider.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![ChatMessage::system("You are helpful"), ChatMessage::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
        assert_eq!(api_messages[1].content, "Hello");
    }

    #[test]
    fn request_body_carries_sampling() {
        let req = ProviderRequest::new("llama3-70b-8192", vec![ChatMessage::user("hi")], SamplingParams::default());
        let body = OpenAiCompatProvider::request_body(&req, true);
        assert_eq!(body["model"], "llama3-70b-8192");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["top_p"], 1.0);
        assert!(body.get("stop").is_none());
        assert_eq!(body["messages"][0]["role"], "user");
    }

    // --- Line splitting tests ---

    #[test]
    fn multibyte_char_split_across_reads_survives() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"}}]}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut lines = LineBuffer::default();
        lines.extend(&line[..split]);
        assert!(lines.next_line().is_none());
        lines.extend(&line[split..]);

        let decoded = lines.next_line().unwrap().unwrap();
        match parse_sse_line(&decoded) {
            SseLine::Chunk(chunk) => assert_eq!(chunk.content.as_deref(), Some("café")),
            other => panic!("expected chunk, got {other:?}"),
        }
        assert!(lines.next_line().is_none());
    }

    #[test]
    fn crlf_and_multiple_lines_per_read() {
        let mut lines = LineBuffer::default();
        lines.extend(b"data: one\r\n\ndata: tw");
        assert_eq!(lines.next_line().unwrap().unwrap(), "data: one");
        assert_eq!(lines.next_line().unwrap().unwrap(), "");
        assert!(lines.next_line().is_none());
        lines.extend(b"o\n");
        assert_eq!(lines.next_line().unwrap().unwrap(), "data: two");
    }

    #[test]
    fn invalid_utf8_line_is_an_error_not_a_replacement() {
        let mut lines = LineBuffer::default();
        lines.extend(b"data: \xff\n");
        assert!(lines.next_line().unwrap().is_err());
        assert!(lines.next_line().is_none());
    }

    // --- Forwarding tests ---

    type Read = Result<Vec<u8>, String>;

    async fn collect(rx: &mut ChunkStream) -> (String, Option<ProviderError>) {
        let mut text = String::new();
        while let Some(item) = rx.recv().await {
            match item {
                Ok(chunk) => {
                    text.push_str(chunk.content.as_deref().unwrap_or_default());
                    if chunk.done {
                        return (text, None);
                    }
                }
                Err(e) => return (text, Some(e)),
            }
        }
        (text, None)
    }

    #[tokio::test]
    async fn forwarded_text_keeps_split_characters() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"}}]}\n\ndata: [DONE]\n".as_bytes();
        let split = body.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let reads: Vec<Read> = vec![Ok(body[..split].to_vec()), Ok(body[split..].to_vec())];

        let (tx, mut rx) = mpsc::channel(8);
        forward_sse(futures::stream::iter(reads), tx, "test".into(), STREAM_IDLE_TIMEOUT).await;

        let (text, error) = collect(&mut rx).await;
        assert_eq!(text, "café");
        assert!(error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stream_outlives_a_total_deadline() {
        // Five reads 60s apart: five minutes in total, never idle for 120s.
        let reads = futures::stream::unfold(0u8, |n| async move {
            if n == 5 {
                return None;
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
            let line = format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{n}\"}}}}]}}\n");
            Some((Ok::<_, String>(line.into_bytes()), n + 1))
        });

        let (tx, mut rx) = mpsc::channel(8);
        forward_sse(Box::pin(reads), tx, "test".into(), STREAM_IDLE_TIMEOUT).await;

        let (text, error) = collect(&mut rx).await;
        assert_eq!(text, "01234");
        assert!(error.is_none(), "{error:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_stream_is_interrupted() {
        let first: Read = Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n".to_vec());
        let reads = futures::stream::iter(vec![first]).chain(futures::stream::pending());

        let (tx, mut rx) = mpsc::channel(8);
        forward_sse(Box::pin(reads), tx, "test".into(), STREAM_IDLE_TIMEOUT).await;

        let (text, error) = collect(&mut rx).await;
        assert_eq!(text, "hi");
        assert!(matches!(error, Some(ProviderError::StreamInterrupted(_))));
    }

    #[tokio::test]
    async fn body_error_is_reported() {
        let reads: Vec<Read> = vec![Err("connection reset".into())];
        let (tx, mut rx) = mpsc::channel(8);
        forward_sse(futures::stream::iter(reads), tx, "test".into(), STREAM_IDLE_TIMEOUT).await;

        match collect(&mut rx).await {
            (_, Some(ProviderError::StreamInterrupted(msg))) => assert!(msg.contains("connection reset")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    // --- SSE parsing tests ---

    #[test]
    fn parse_stream_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        match parse_sse_line(line) {
            SseLine::Chunk(chunk) => {
                assert_eq!(chunk.content.as_deref(), Some("Hello"));
                assert!(!chunk.done);
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn parse_stream_finish_chunk_is_skipped() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert!(matches!(parse_sse_line(line), SseLine::Skip));
    }

    #[test]
    fn parse_done_marker() {
        match parse_sse_line("data: [DONE]") {
            SseLine::Chunk(chunk) => assert!(chunk.done),
            other => panic!("expected done chunk, got {other:?}"),
        }
    }

    #[test]
    fn parse_usage_chunk_ends_stream() {
        let line = r#"data: {"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        match parse_sse_line(line) {
            SseLine::Chunk(chunk) => {
                assert!(chunk.done);
                assert_eq!(chunk.usage.map(|u| u.total_tokens), Some(15));
            }
            other => panic!("expected usage chunk, got {other:?}"),
        }
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        assert!(matches!(parse_sse_line(""), SseLine::Skip));
        assert!(matches!(parse_sse_line(": keep-alive"), SseLine::Skip));
        assert!(matches!(parse_sse_line("event: ping"), SseLine::Skip));
    }

    #[test]
    fn garbage_data_is_unparseable() {
        assert!(matches!(parse_sse_line("data: {not json"), SseLine::Unparseable(_)));
    }

    #[test]
    fn parse_model_list() {
        let data = r#"{"object":"list","data":[{"id":"llama3-70b-8192","owned_by":"Meta","context_window":8192},{"id":"mixtral-8x7b-32768"}]}"#;
        let parsed: ModelList = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].id, "llama3-70b-8192");
    }
}
