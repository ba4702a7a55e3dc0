//! Chat backend trait and the HTTP implementation

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;

use super::message::ChatTurn;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http_client::{build_http_client, response_to_error};

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Raw response body, chunked as the transport delivers it
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Streaming chat completion request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatRequest {
    /// Create a streaming request
    pub fn new(model: impl Into<String>, messages: Vec<ChatTurn>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature,
            stream: true,
        }
    }
}

/// Anything that can answer a chat request with a byte stream
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the request and return the body once the response headers
    /// arrived with a success status.
    async fn open_stream(&self, request: ChatRequest) -> Result<ByteStream>;
}

/// Chat backend speaking to `POST /v1/chat/completions`
pub struct HttpChatBackend {
    client: Client,
    config: ClientConfig,
}

impl HttpChatBackend {
    /// Create a new backend from config
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: build_http_client(&config)?,
            config,
        })
    }

    /// Create a backend that shares an existing HTTP client
    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn open_stream(&self, request: ChatRequest) -> Result<ByteStream> {
        let url = self.config.endpoint(CHAT_COMPLETIONS_PATH)?;
        tracing::debug!(
            %url,
            model = %request.model,
            messages = request.messages.len(),
            "Opening chat stream"
        );

        // No request timeout here: a long answer keeps the body open.
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ClientError::Transport(format!("Stream error: {e}"))));
        Ok(Box::pin(body))
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn backend_for(server: &MockServer) -> HttpChatBackend {
        HttpChatBackend::new(ClientConfig::new(server.uri()).with_header("X-Client", "ragsheet"))
            .expect("backend should build")
    }

    #[tokio::test]
    async fn posts_streaming_request_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("X-Client", "ragsheet"))
            .and(body_partial_json(serde_json::json!({
                "model": "rag-excel",
                "stream": true,
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "total sales?"}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("data: [DONE]\n\n", "text/event-stream"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest::new(
            "rag-excel",
            vec![
                ChatTurn::user("hi"),
                ChatTurn::assistant("hello"),
                ChatTurn::user("total sales?"),
            ],
            0.7,
        );
        let chunks: Vec<Bytes> = backend_for(&server)
            .open_stream(request)
            .await
            .expect("stream should open")
            .try_collect()
            .await
            .expect("body should be readable");

        let body: Vec<u8> = chunks.concat();
        assert_eq!(body, b"data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"detail": "vector store missing"})),
            )
            .mount(&server)
            .await;

        let result = backend_for(&server)
            .open_stream(ChatRequest::new("rag-excel", vec![ChatTurn::user("q")], 0.7))
            .await;

        match result {
            Err(ClientError::Http { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "vector store missing");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        // Nothing listens on port 9 of localhost in test environments.
        let backend = HttpChatBackend::new(ClientConfig::new("http://127.0.0.1:9")).unwrap();
        let result = backend
            .open_stream(ChatRequest::new("rag-excel", vec![ChatTurn::user("q")], 0.7))
            .await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
}
