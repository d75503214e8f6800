use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::domain::{ContentId, DirectoryStat, RemotePath};
use crate::error::UploadError;

/// Mutable-directory operations of a content-addressed store.
pub trait StorageClient: Send + Sync {
    /// Fails with [`UploadError::DirectoryExists`] when `path` is already present.
    fn make_directory(&self, path: &RemotePath) -> Result<(), UploadError>;
    fn write_file(&self, path: &RemotePath, contents: Vec<u8>) -> Result<(), UploadError>;
    fn stat_directory(&self, path: &RemotePath) -> Result<DirectoryStat, UploadError>;
}

/// Client for the files API of a Kubo RPC endpoint.
#[derive(Clone)]
pub struct IpfsHttpClient {
    client: Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatResponse {
    hash: String,
    blocks: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    message: String,
}

const ALREADY_EXISTS: &str = "file already exists";

impl IpfsHttpClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, UploadError> {
        let api_base = Self::api_base(endpoint)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ipfs-collection-upload/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| UploadError::StorageHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| UploadError::StorageHttp(err.to_string()))?;
        Ok(Self { client, api_base })
    }

    /// Normalizes `http://host:5001`, `http://host:5001/` and
    /// `http://host:5001/api/v0` to the same RPC base.
    pub fn api_base(endpoint: &str) -> Result<String, UploadError> {
        let trimmed = endpoint.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(UploadError::InvalidEndpoint(endpoint.to_string()));
        }
        if trimmed.ends_with("/api/v0") {
            Ok(trimmed.to_string())
        } else {
            Ok(format!("{trimmed}/api/v0"))
        }
    }

    fn url(&self, command: &str) -> String {
        format!("{}/files/{command}", self.api_base)
    }

    fn handle_status(path: &RemotePath, response: Response) -> Result<Response, UploadError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response
            .text()
            .unwrap_or_else(|_| "storage request failed".to_string());
        Err(status_error(path, status, body))
    }
}

/// Classifies a failed RPC response. Kubo reports errors as
/// `{"Message", "Code", "Type"}`; anything else is passed through verbatim.
fn status_error(path: &RemotePath, status: u16, body: String) -> UploadError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|err| err.message)
        .unwrap_or(body);
    if message.trim() == ALREADY_EXISTS {
        return UploadError::DirectoryExists(path.to_string());
    }
    UploadError::StorageStatus { status, message }
}

impl StorageClient for IpfsHttpClient {
    fn make_directory(&self, path: &RemotePath) -> Result<(), UploadError> {
        let response = self
            .client
            .post(self.url("mkdir"))
            .query(&[("arg", path.as_str())])
            .send()
            .map_err(|err| UploadError::StorageHttp(err.to_string()))?;
        Self::handle_status(path, response)?;
        Ok(())
    }

    fn write_file(&self, path: &RemotePath, contents: Vec<u8>) -> Result<(), UploadError> {
        let form = Form::new().part("file", Part::bytes(contents).file_name("file"));
        let response = self
            .client
            .post(self.url("write"))
            .query(&[
                ("arg", path.as_str()),
                ("create", "true"),
                ("truncate", "true"),
            ])
            .multipart(form)
            .send()
            .map_err(|err| UploadError::StorageHttp(err.to_string()))?;
        Self::handle_status(path, response)?;
        Ok(())
    }

    fn stat_directory(&self, path: &RemotePath) -> Result<DirectoryStat, UploadError> {
        let response = self
            .client
            .post(self.url("stat"))
            .query(&[("arg", path.as_str())])
            .send()
            .map_err(|err| UploadError::StorageHttp(err.to_string()))?;
        let response = Self::handle_status(path, response)?;
        let stat: StatResponse = response
            .json()
            .map_err(|err| UploadError::StorageResponse(err.to_string()))?;
        Ok(DirectoryStat {
            content_id: ContentId::new(stat.hash),
            block_count: stat.blocks,
        })
    }
}
