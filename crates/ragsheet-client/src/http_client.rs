use reqwest::{Client, Response};
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

const DISABLE_SYSTEM_PROXY_ENV: &str = "RAGSHEET_DISABLE_SYSTEM_PROXY";

// Truncate error bodies so large HTML error pages stay out of messages.
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_http_client(config: &ClientConfig) -> Result<Client> {
    let mut builder = Client::builder().default_headers(config.header_map()?);
    if should_disable_system_proxy() {
        builder = builder.no_proxy();
    }
    builder
        .build()
        .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}

#[derive(Deserialize)]
struct ErrorDetail {
    detail: String,
}

/// Turn a non-success response into [`ClientError::Http`].
pub(crate) async fn response_to_error(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ErrorDetail>(&body) {
        Ok(detail) => detail.detail,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => truncate_body(&body),
    };

    ClientError::Http {
        status: status.as_u16(),
        message,
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &body[..end])
}
