use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Snapshot;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Server is missing N8N_WEBHOOK_INGEST_URL")]
    MissingIngestUrl,
    #[error("Server is missing N8N_WEBHOOK_SNAPSHOT_URL")]
    MissingSnapshotUrl,
    #[error("Timed out contacting n8n")]
    Timeout,
    #[error("{0}")]
    Request(#[source] reqwest::Error),
    #[error("n8n answered with status {0}")]
    Status(u16),
    #[error("n8n returned an unexpected payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Request(err)
        }
    }
}

#[derive(Debug, Clone)]
pub struct N8nSettings {
    pub ingest_url: Option<String>,
    pub snapshot_url: Option<String>,
    pub timeout: Duration,
}

/// Status and body exactly as n8n answered, ready to be passed through
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Value,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct N8nClient {
    http: reqwest::Client,
    ingest_url: Option<String>,
    snapshot_url: Option<String>,
}

impl N8nClient {
    pub fn new(settings: &N8nSettings) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http,
            ingest_url: settings.ingest_url.clone(),
            snapshot_url: settings.snapshot_url.clone(),
        })
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot_url.is_some()
    }

    /// Forwards a leave application to the ingest webhook
    pub async fn ingest(&self, payload: &impl Serialize) -> Result<UpstreamReply, UpstreamError> {
        let url = self.ingest_url.as_deref().ok_or(UpstreamError::MissingIngestUrl)?;

        debug!(url, "Forwarding application to n8n");

        let res = self.http.post(url).json(payload).send().await?;
        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "n8n rejected the application");
        }

        Ok(UpstreamReply {
            status: status.as_u16(),
            body: read_json_safe(status.as_u16(), status.canonical_reason(), &text),
        })
    }

    /// Current applications and balance, used to revalidate the local store
    pub async fn snapshot(&self) -> Result<Snapshot, UpstreamError> {
        let url = self.snapshot_url.as_deref().ok_or(UpstreamError::MissingSnapshotUrl)?;

        let res = self.http.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let text = res.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Parses `text` as JSON, wrapping anything else in an error envelope that keeps the raw body
pub fn read_json_safe(status: u16, reason: Option<&str>, text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({
        "ok": false,
        "message": format!("Upstream returned non-JSON ({} {})", status, reason.unwrap_or_default()),
        "raw": text,
    }))
}
