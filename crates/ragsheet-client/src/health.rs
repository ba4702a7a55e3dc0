//! Backend health probing and periodic readiness monitoring

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http_client::{build_http_client, response_to_error};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Body of `GET /health`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub vector_store_ready: bool,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub knowledge_base_files: u64,
}

/// Source of health information
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> Result<HealthStatus>;
}

/// HTTP client for `GET /health`
#[derive(Clone)]
pub struct HealthClient {
    client: Client,
    config: ClientConfig,
}

impl HealthClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: build_http_client(&config)?,
            config,
        })
    }

    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl HealthProbe for HealthClient {
    async fn check(&self) -> Result<HealthStatus> {
        let url = self.config.endpoint("/health")?;
        let mut request = self.client.get(url);
        if let Some(timeout) = self.config.request_timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Health check failed: {e}")))?;
        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }
        Ok(response.json().await?)
    }
}

/// Caller-side view of backend readiness
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SystemStatus {
    pub online: bool,
    pub vector_store_ready: bool,
    pub file_count: u64,
    pub last_update: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl SystemStatus {
    /// Fold one probe result into the status.
    ///
    /// A failed probe only flips `online`; the last known knowledge-base
    /// details are kept for display.
    pub fn apply(&self, probe: Result<HealthStatus>) -> Self {
        match probe {
            Ok(health) => Self {
                online: true,
                vector_store_ready: health.vector_store_ready,
                file_count: health.knowledge_base_files,
                last_update: health.last_update,
                checked_at: Some(Utc::now()),
            },
            Err(_) => Self {
                online: false,
                checked_at: Some(Utc::now()),
                ..self.clone()
            },
        }
    }

    /// Refuse to chat when the backend is offline or has no index yet
    pub fn ensure_ready(&self) -> Result<()> {
        if !self.online {
            return Err(ClientError::Precondition(
                "System offline: check the server connection".to_string(),
            ));
        }
        if !self.vector_store_ready {
            return Err(ClientError::Precondition(
                "Knowledge base not ready: upload a spreadsheet first".to_string(),
            ));
        }
        Ok(())
    }
}

/// Background task polling a [`HealthProbe`] and publishing [`SystemStatus`].
pub struct HealthMonitor {
    receiver: watch::Receiver<SystemStatus>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Check immediately, then every `interval` until `cancel` fires.
    pub fn spawn(
        probe: Arc<dyn HealthProbe>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (sender, receiver) = watch::channel(SystemStatus::default());
        let refresh = Arc::new(Notify::new());

        let handle = {
            let refresh = refresh.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {}
                        _ = refresh.notified() => ticker.reset(),
                    }

                    let result = probe.check().await;
                    match &result {
                        Ok(health) => tracing::debug!(
                            ready = health.vector_store_ready,
                            files = health.knowledge_base_files,
                            "Health check succeeded"
                        ),
                        Err(e) => tracing::warn!(error = %e, "Health check failed"),
                    }
                    sender.send_modify(|status| *status = status.apply(result));
                }
                tracing::debug!("Health monitor stopped");
            })
        };

        Self {
            receiver,
            refresh,
            cancel,
            handle,
        }
    }

    /// Latest published status
    pub fn status(&self) -> SystemStatus {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SystemStatus> {
        self.receiver.clone()
    }

    /// Probe now instead of waiting for the next tick (e.g. after an upload)
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stop polling and wait for the task to exit
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Health monitor task ended abnormally");
        }
    }
}
