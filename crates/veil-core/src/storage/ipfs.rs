//! IPFS HTTP API store (`/api/v0/add`).
//!
//! Files are added in one request with `wrap-with-directory`, so the node
//! answers with one NDJSON line per file plus a final line, with an empty
//! `Name`, for the wrapping directory.

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;

use super::{ContentStore, UploadFile};
use crate::config::StorageCredentials;
use crate::error::{PipelineError, PipelineResult};

const SERVICE: &str = "content store";

/// Pinning IPFS endpoint scoped to one space.
pub struct IpfsStore {
    client: Client,
    credentials: StorageCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddEntry {
    name: String,
    hash: String,
}

fn remote(message: String, status_code: Option<u16>) -> PipelineError {
    PipelineError::Remote {
        service: SERVICE.to_string(),
        message,
        status_code,
    }
}

/// CID of the wrapping directory in an `add` response.
fn directory_cid(body: &str) -> PipelineResult<String> {
    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        let entry: AddEntry = serde_json::from_str(line)
            .map_err(|e| remote(format!("Failed to parse response: {e}"), None))?;
        if entry.name.is_empty() {
            return Ok(entry.hash);
        }
    }
    Err(remote("Response has no directory entry".to_string(), None))
}

impl IpfsStore {
    pub fn new(credentials: StorageCredentials) -> Self {
        Self {
            client: Client::new(),
            credentials,
        }
    }
}

#[async_trait]
impl ContentStore for IpfsStore {
    fn name(&self) -> &str {
        "IPFS"
    }

    async fn upload_directory(&self, files: &[UploadFile]) -> PipelineResult<String> {
        let form = files.iter().fold(multipart::Form::new(), |form, file| {
            let part = multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone());
            form.part("file", part)
        });

        let resp = self
            .client
            .post(format!("{}/api/v0/add", self.credentials.api_url))
            .query(&[
                ("pin", "true"),
                ("cid-version", "1"),
                ("wrap-with-directory", "true"),
            ])
            .bearer_auth(&self.credentials.token)
            .header("X-Space", &self.credentials.space)
            .multipart(form)
            .send()
            .await
            .map_err(|e| remote(format!("Request failed: {e}"), None))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(remote(
                format!("IPFS add failed (HTTP {status}): {body}"),
                Some(status.as_u16()),
            ));
        }
        directory_cid(&body)
    }
}
