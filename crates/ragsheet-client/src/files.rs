//! Knowledge-base file management

use std::path::Path;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http_client::{build_http_client, response_to_error};

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME: &str = "application/vnd.ms-excel";

const SPREADSHEET_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub filename: String,
    pub size: u64,
    pub modified_time: String,
    #[serde(default)]
    pub file_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileInfo>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub knowledge_base_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub file_id: String,
    pub message: String,
    pub file_hash: String,
}

/// Response of delete and rebuild endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub filename: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Spreadsheet MIME type for a file name, if it has a supported extension
pub fn spreadsheet_mime(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match extension.as_str() {
        "xlsx" => Some(XLSX_MIME),
        "xls" => Some(XLS_MIME),
        _ => None,
    }
}

/// Client-side pre-check run before any upload request is issued.
///
/// A file passes with either a spreadsheet extension or a spreadsheet MIME type.
pub fn validate_upload(filename: &str, mime: Option<&str>, size: u64) -> Result<()> {
    let mime_ok = matches!(mime, Some(XLSX_MIME) | Some(XLS_MIME));
    if !mime_ok && spreadsheet_mime(filename).is_none() {
        return Err(ClientError::Validation(format!(
            "only spreadsheet files are supported ({}): {filename}",
            SPREADSHEET_EXTENSIONS
                .iter()
                .map(|ext| format!(".{ext}"))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ClientError::Validation(format!(
            "file exceeds the 10 MiB limit ({} bytes): {filename}",
            size
        )));
    }
    Ok(())
}

/// Client for the `/v1/files` endpoints
#[derive(Clone)]
pub struct FileClient {
    client: Client,
    config: ClientConfig,
}

impl FileClient {
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

    fn with_timeout(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    /// List files in the knowledge base
    pub async fn list(&self) -> Result<FileListResponse> {
        let url = self.config.endpoint("/v1/files/list")?;
        let response = self.with_timeout(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Validate and upload a spreadsheet from disk
    pub async fn upload_path(&self, path: &Path) -> Result<UploadResponse> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ClientError::Validation(format!("not a file path: {}", path.display()))
            })?
            .to_string();

        let size = tokio::fs::metadata(path).await?.len();
        validate_upload(&filename, None, size)?;

        let bytes = tokio::fs::read(path).await?;
        self.upload_bytes(&filename, bytes).await
    }

    /// Validate and upload in-memory spreadsheet content
    pub async fn upload_bytes(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse> {
        validate_upload(filename, None, bytes.len() as u64)?;
        let mime = spreadsheet_mime(filename).unwrap_or(XLSX_MIME);

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime)?;
        let form = Form::new().part("file", part);

        let url = self.config.endpoint("/v1/files/upload")?;
        tracing::info!(filename, "Uploading file");
        let response = self
            .with_timeout(self.client.post(url).multipart(form))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Delete a file by name
    pub async fn delete(&self, filename: &str) -> Result<ActionResponse> {
        if filename.trim().is_empty() {
            return Err(ClientError::Validation("file name is empty".to_string()));
        }
        let path = format!("/v1/files/{}", urlencoding::encode(filename));
        let url = self.config.endpoint(&path)?;
        tracing::info!(filename, "Deleting file");
        let response = self.with_timeout(self.client.delete(url)).send().await?;
        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Ask the server to rebuild its vector store from all files
    pub async fn rebuild_index(&self) -> Result<ActionResponse> {
        let url = self.config.endpoint("/v1/vector_store/rebuild")?;
        let response = self.with_timeout(self.client.post(url)).send().await?;
        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }
        Ok(response.json().await?)
    }
}

/// Human-readable size: Bytes, KB, MB, GB with two decimals
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> FileClient {
        FileClient::new(ClientConfig::new(server.uri())).unwrap()
    }

    #[test]
    fn validates_extension_and_mime() {
        assert!(validate_upload("data.xlsx", None, 1).is_ok());
        assert!(validate_upload("DATA.XLS", None, 1).is_ok());
        assert!(validate_upload("export", Some(XLSX_MIME), 1).is_ok());
        assert!(matches!(
            validate_upload("notes.csv", Some("text/csv"), 1),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn validates_size_limit() {
        assert!(validate_upload("big.xlsx", None, MAX_UPLOAD_BYTES).is_ok());
        assert!(matches!(
            validate_upload("big.xlsx", None, MAX_UPLOAD_BYTES + 1),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
    }

    #[tokio::test]
    async fn lists_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [{
                    "filename": "sales.xlsx",
                    "size": 2048,
                    "modified_time": "2024-05-01T10:00:00",
                    "file_hash": "abc"
                }],
                "total_count": 1,
                "knowledge_base_dir": "/srv/kb"
            })))
            .mount(&server)
            .await;

        let listing = client_for(&server).list().await.unwrap();
        assert_eq!(listing.total_count, 1);
        assert_eq!(listing.files[0].filename, "sales.xlsx");
        assert_eq!(listing.files[0].size, 2048);
    }

    #[tokio::test]
    async fn rejects_invalid_upload_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/files/upload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .upload_bytes("notes.txt", b"hello".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn uploads_file_from_disk() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/files/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "filename": "q1.xlsx",
                "file_id": "file_20240501_abc12345",
                "message": "uploaded",
                "file_hash": "abc12345"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("q1.xlsx");
        std::fs::write(&file, b"PK\x03\x04fake").unwrap();

        let response = client_for(&server).upload_path(&file).await.unwrap();
        assert!(response.success);
        assert_eq!(response.filename, "q1.xlsx");
    }

    #[tokio::test]
    async fn delete_encodes_filename_and_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/files/Q1%20report.xlsx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "deleted",
                "filename": "Q1 report.xlsx"
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/files/missing.xlsx"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"detail": "file missing.xlsx not found"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let deleted = client.delete("Q1 report.xlsx").await.unwrap();
        assert_eq!(deleted.filename.as_deref(), Some("Q1 report.xlsx"));

        match client.delete("missing.xlsx").await {
            Err(ClientError::Http { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "file missing.xlsx not found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rebuild_posts_to_vector_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/vector_store/rebuild"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "rebuilding"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).rebuild_index().await.unwrap();
        assert!(response.success);
        assert_eq!(response.message, "rebuilding");
    }
}
