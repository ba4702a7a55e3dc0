//! Facade sharing one HTTP connection pool across all service clients

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::chat::{HttpChatBackend, StreamingChatSession};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::files::FileClient;
use crate::health::{HealthClient, HealthMonitor, HealthProbe, HealthStatus};
use crate::http_client::build_http_client;

/// Entry point for talking to a ragsheet server.
///
/// Cloning is cheap; all clones share the same connection pool.
#[derive(Clone)]
pub struct RagClient {
    http: Client,
    config: ClientConfig,
}

impl RagClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = build_http_client(&config)?;
        tracing::debug!(base_url = %config.base_url, model = %config.model, "Created client");
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn chat_backend(&self) -> HttpChatBackend {
        HttpChatBackend::with_client(self.http.clone(), self.config.clone())
    }

    /// New conversation backed by the HTTP chat endpoint
    pub fn session(&self) -> StreamingChatSession {
        StreamingChatSession::new(Arc::new(self.chat_backend()), &self.config)
    }

    pub fn files(&self) -> FileClient {
        FileClient::with_client(self.http.clone(), self.config.clone())
    }

    pub fn health(&self) -> HealthClient {
        HealthClient::with_client(self.http.clone(), self.config.clone())
    }

    /// One-shot health probe
    pub async fn check_health(&self) -> Result<HealthStatus> {
        self.health().check().await
    }

    pub fn spawn_health_monitor(
        &self,
        interval: Duration,
        cancel: CancellationToken,
    ) -> HealthMonitor {
        HealthMonitor::spawn(Arc::new(self.health()), interval, cancel)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::ClientError;

    fn ignore_snapshot(_: &crate::ConversationSnapshot) {}

    #[test]
    fn rejects_invalid_config() {
        let result = RagClient::new(ClientConfig::new("ftp://example.com"));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn session_streams_through_http_backend() {
        let server = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"42\"},\"finish_reason\":null}]}\n\n\
                    data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n";
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let client = RagClient::new(ClientConfig::new(server.uri())).unwrap();
        let session = client.session();
        let reply = session
            .send("What is the total?", &ignore_snapshot)
            .await
            .unwrap();

        assert_eq!(reply.content, "42");
        assert_eq!(session.conversation().messages.len(), 2);
    }

    #[tokio::test]
    async fn health_shortcut_uses_shared_pool() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "healthy",
                "vector_store_ready": false,
                "knowledge_base_files": 0
            })))
            .mount(&server)
            .await;

        let client = RagClient::new(ClientConfig::new(server.uri())).unwrap();
        let health = client.check_health().await.unwrap();
        assert_eq!(health.status, "healthy");
        assert!(!health.vector_store_ready);
    }
}
