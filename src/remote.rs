//! Collaborators backed by the Lead Directory Service.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::payload::LeadPayload;

/// Reports which of the given emails are already on record.
#[async_trait]
pub trait DuplicateChecker: Send + Sync {
    async fn check_duplicates(&self, emails: &[String]) -> anyhow::Result<Vec<String>>;
}

/// Creates one lead. The error's message is what gets reported for the row.
#[async_trait]
pub trait RecordCreator: Send + Sync {
    async fn create_record(&self, payload: &LeadPayload) -> anyhow::Result<()>;
}

/// Checker for dry runs: nothing is ever on record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemoteCheck;

#[async_trait]
impl DuplicateChecker for NoRemoteCheck {
    async fn check_duplicates(&self, _emails: &[String]) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl DirectoryConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct DuplicateQuery<'a> {
    emails: &'a [String],
}

#[derive(Deserialize)]
struct DuplicateAnswer {
    existing: Vec<String>,
}

/// HTTP client for the directory's duplicate-check and creation endpoints.
pub struct DirectoryClient {
    client: reqwest::Client,
    config: DirectoryConfig,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, config })
    }

    /// Use an already configured HTTP client; `config.timeout` is ignored.
    pub fn with_http_client(client: reqwest::Client, config: DirectoryConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        if self.config.base_url.ends_with('/') {
            format!("{}{}", self.config.base_url, path)
        } else {
            format!("{}/{}", self.config.base_url, path)
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(self.url(path));
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(anyhow!("HTTP {}: {}", status.as_u16(), body.trim()))
}

#[async_trait]
impl DuplicateChecker for DirectoryClient {
    async fn check_duplicates(&self, emails: &[String]) -> anyhow::Result<Vec<String>> {
        let response = self
            .post("leads/duplicates")
            .json(&DuplicateQuery { emails })
            .send()
            .await
            .context("duplicate check request failed")?;
        let answer: DuplicateAnswer = ensure_success(response)
            .await?
            .json()
            .await
            .context("duplicate check returned malformed JSON")?;
        Ok(answer.existing)
    }
}

#[async_trait]
impl RecordCreator for DirectoryClient {
    async fn create_record(&self, payload: &LeadPayload) -> anyhow::Result<()> {
        let response = self
            .post("leads")
            .json(payload)
            .send()
            .await
            .context("create request failed")?;
        ensure_success(response).await?;
        Ok(())
    }
}
