//! Deterministic scripted chat backend for tests and offline demos.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::sleep;

use super::backend::{ByteStream, ChatBackend, ChatRequest};
use crate::error::{ClientError, Result};

/// One step of a scripted response body.
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Deliver raw bytes as one network read.
    Chunk(Bytes),
    /// Fail the body with a transport error.
    Error(String),
    /// Pause before the next step.
    Delay(Duration),
    /// Never produce anything again.
    Hang,
}

impl MockStep {
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk(Bytes::from(text.into()))
    }

    /// Wrap a JSON payload as a complete `data: ` event.
    pub fn frame(payload: impl AsRef<str>) -> Self {
        Self::chunk(format!("data: {}\n\n", payload.as_ref()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

/// Scripted outcome of one `open_stream` call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Stream(Vec<MockStep>),
    HttpError { status: u16, message: String },
    ConnectError(String),
}

impl MockResponse {
    /// Each payload becomes one `data: ` event delivered in its own read.
    pub fn frames(payloads: Vec<String>) -> Self {
        Self::Stream(payloads.into_iter().map(MockStep::frame).collect())
    }

    /// Raw chunks, exactly as given, for testing read boundaries.
    pub fn chunks(chunks: Vec<&str>) -> Self {
        Self::Stream(chunks.into_iter().map(MockStep::chunk).collect())
    }

    pub fn steps(steps: Vec<MockStep>) -> Self {
        Self::Stream(steps)
    }

    pub fn http_error(status: u16, message: impl Into<String>) -> Self {
        Self::HttpError {
            status,
            message: message.into(),
        }
    }

    pub fn connect_error(message: impl Into<String>) -> Self {
        Self::ConnectError(message.into())
    }
}

/// A chat backend that replays scripted responses and records requests.
#[derive(Debug, Default)]
pub struct MockChatBackend {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatBackend {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_response(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn open_stream(&self, request: ChatRequest) -> Result<ByteStream> {
        self.requests.lock().push(request);
        let response = self.responses.lock().pop_front();

        match response {
            None => Err(ClientError::Transport(
                "mock backend has no scripted response".to_string(),
            )),
            Some(MockResponse::HttpError { status, message }) => {
                Err(ClientError::Http { status, message })
            }
            Some(MockResponse::ConnectError(message)) => Err(ClientError::Transport(message)),
            Some(MockResponse::Stream(steps)) => Ok(Box::pin(async_stream::stream! {
                for step in steps {
                    match step {
                        MockStep::Chunk(bytes) => {
                            yield Ok(bytes);
                        }
                        MockStep::Error(message) => {
                            yield Err(ClientError::Transport(message));
                            return;
                        }
                        MockStep::Delay(duration) => sleep(duration).await,
                        MockStep::Hang => futures::future::pending::<()>().await,
                    }
                }
            })),
        }
    }
}

/// `{"choices":[{"delta":{"content":...}}]}`
pub fn content_frame(text: &str) -> String {
    serde_json::json!({
        "choices": [{"delta": {"content": text}, "finish_reason": null}]
    })
    .to_string()
}

/// A single tool call fragment at index 0
pub fn tool_call_frame(id: &str, name: &str, arguments: &str) -> String {
    serde_json::json!({
        "choices": [{
            "delta": {
                "tool_calls": [{
                    "index": 0,
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments}
                }]
            },
            "finish_reason": null
        }]
    })
    .to_string()
}

/// `finish_reason: "stop"` with an empty delta
pub fn stop_frame() -> String {
    serde_json::json!({
        "choices": [{"delta": {}, "finish_reason": "stop"}]
    })
    .to_string()
}

/// Source citations attached to an otherwise empty chunk
pub fn sources_frame(sources: &[(&str, &str)]) -> String {
    let sources: Vec<_> = sources
        .iter()
        .map(|(file, sheet)| serde_json::json!({"file": file, "sheet": sheet}))
        .collect();
    serde_json::json!({ "choices": [], "sources": sources }).to_string()
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::chat::message::ChatTurn;

    #[tokio::test]
    async fn replays_chunks_and_records_requests() {
        let backend = MockChatBackend::new(vec![MockResponse::chunks(vec!["a", "b"])]);
        let request = ChatRequest::new("rag-excel", vec![ChatTurn::user("q")], 0.7);

        let stream = backend.open_stream(request.clone()).await.unwrap();
        let chunks: Vec<Bytes> = stream.map(|chunk| chunk.unwrap()).collect().await;

        assert_eq!(chunks, vec![Bytes::from("a"), Bytes::from("b")]);
        assert_eq!(backend.requests(), vec![request]);
    }

    #[tokio::test]
    async fn exhausted_script_is_transport_error() {
        let backend = MockChatBackend::default();
        let result = backend
            .open_stream(ChatRequest::new("m", Vec::new(), 0.0))
            .await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
}
