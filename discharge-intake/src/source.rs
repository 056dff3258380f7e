//! Data access for upstream admission feeds.
//!
//! A source performs one request/response fetch and hands back the raw JSON
//! payload. Seed data lives in [`crate::seed`] and never goes through here
//! unless wrapped in a [`StaticSource`] explicitly.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use discharge_core::PipelineError;
use serde_json::Value;

/// Failure talking to the upstream source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FetchError> for PipelineError {
    fn from(err: FetchError) -> Self {
        PipelineError::ExternalFetch(err.to_string())
    }
}

/// Upstream EHR/referral feed returning a JSON array of raw admissions.
pub trait AdmissionSource {
    fn fetch(&self) -> Result<Value, FetchError>;

    fn describe(&self) -> String {
        "admission source".to_string()
    }
}

/// Reads an exported admissions file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AdmissionSource for JsonFileSource {
    fn fetch(&self) -> Result<Value, FetchError> {
        let data = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|err| FetchError::InvalidPayload(err.to_string()))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[derive(Debug, Clone)]
enum StaticReply {
    Payload(Value),
    Unavailable(String),
    Timeout(Duration),
}

/// In-memory source with a fixed reply.
#[derive(Debug, Clone)]
pub struct StaticSource {
    reply: StaticReply,
}

impl StaticSource {
    pub fn new(payload: Value) -> Self {
        Self {
            reply: StaticReply::Payload(payload),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            reply: StaticReply::Unavailable(message.into()),
        }
    }

    pub fn timing_out(after: Duration) -> Self {
        Self {
            reply: StaticReply::Timeout(after),
        }
    }
}

impl AdmissionSource for StaticSource {
    fn fetch(&self) -> Result<Value, FetchError> {
        match &self.reply {
            StaticReply::Payload(value) => Ok(value.clone()),
            StaticReply::Unavailable(message) => Err(FetchError::Unavailable(message.clone())),
            StaticReply::Timeout(after) => Err(FetchError::Timeout(*after)),
        }
    }

    fn describe(&self) -> String {
        "static payload".to_string()
    }
}

/// Treats a reply that arrives after `limit` as a timeout and drops it.
#[derive(Debug, Clone)]
pub struct WithDeadline<S> {
    inner: S,
    limit: Duration,
}

impl<S> WithDeadline<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

impl<S: AdmissionSource> AdmissionSource for WithDeadline<S> {
    fn fetch(&self) -> Result<Value, FetchError> {
        let started = Instant::now();
        let reply = self.inner.fetch()?;
        if started.elapsed() > self.limit {
            return Err(FetchError::Timeout(self.limit));
        }
        Ok(reply)
    }

    fn describe(&self) -> String {
        format!("{} (deadline {:?})", self.inner.describe(), self.limit)
    }
}
