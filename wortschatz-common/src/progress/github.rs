//! GitHub contents API client
//!
//! Files are addressed as `{api_base}/repos/{owner/name}/contents/{path}`;
//! the blob `sha` serves as revision identifier and content travels base64
//! encoded.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::remote::{PutOutcome, RemoteBlob, RemoteError, RemoteStore};
use crate::config::MirrorConfig;

const USER_AGENT: &str = concat!("wortschatz/", env!("CARGO_PKG_VERSION"));
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    #[serde(default)]
    content: Option<PutContent>,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

/// Progress document storage in a GitHub repository
pub struct GitHubContentsStore {
    http_client: reqwest::Client,
    api_base: String,
    repository: String,
    branch: String,
    token: String,
}

impl GitHubContentsStore {
    pub fn new(config: &MirrorConfig) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: config.api_base.clone(),
            repository: config.repository.clone(),
            branch: config.branch.clone(),
            token: config.token.clone(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.repository,
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, GITHUB_ACCEPT)
    }
}

#[async_trait]
impl RemoteStore for GitHubContentsStore {
    fn describe(&self) -> String {
        format!("github:{}@{}", self.repository, self.branch)
    }

    async fn get(&self, path: &str) -> Result<Option<RemoteBlob>, RemoteError> {
        let response = self
            .authorized(self.http_client.get(self.contents_url(path)))
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api(status.as_u16(), error_text));
        }

        let contents: ContentsResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        if let Some(encoding) = contents.encoding.as_deref() {
            if encoding != "base64" {
                return Err(RemoteError::Decode(format!(
                    "unsupported content encoding '{}'",
                    encoding
                )));
            }
        }

        let content = decode_content(contents.content.as_deref().unwrap_or(""))?;
        Ok(Some(RemoteBlob {
            content,
            revision: contents.sha,
        }))
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        previous: Option<&str>,
        message: &str,
    ) -> Result<PutOutcome, RemoteError> {
        let body = PutRequest {
            message,
            content: STANDARD.encode(content),
            branch: &self.branch,
            sha: previous,
        };

        let response = self
            .authorized(self.http_client.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let revision = response
                    .json::<PutResponse>()
                    .await
                    .ok()
                    .and_then(|r| r.content)
                    .map(|c| c.sha);
                Ok(PutOutcome::Written { revision })
            }
            // 409: sha does not match; 422: file exists but no sha was sent
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                tracing::debug!(status = status.as_u16(), "GitHub rejected stale revision");
                Ok(PutOutcome::Conflict)
            }
            _ => {
                let error_text = response.text().await.unwrap_or_default();
                Err(RemoteError::Api(status.as_u16(), error_text))
            }
        }
    }
}

/// Decode GitHub's base64 payload, which is wrapped at 60 columns
fn decode_content(encoded: &str) -> Result<Vec<u8>, RemoteError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Decode(e.to_string()))
}
