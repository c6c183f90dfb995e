use super::errors::{ClassifiedError, ProbeFailure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered probe-specific findings. Insertion order is preserved so the
/// rendered report reads the way the probe recorded it.
pub type Details = IndexMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Completed,
    Failed,
    Skipped,
}

/// A classified failure plus whatever findings the probe gathered before it
/// failed. A DNS success followed by a refused GET keeps the DNS finding.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeError {
    pub failure: ProbeFailure,
    pub partial: Details,
}

impl ProbeError {
    pub fn with_partial(failure: ProbeFailure, partial: Details) -> Self {
        Self { failure, partial }
    }
}

impl From<ProbeFailure> for ProbeError {
    fn from(failure: ProbeFailure) -> Self {
        Self {
            failure,
            partial: Details::new(),
        }
    }
}

/// What a probe's `run` returns to the orchestrator.
pub type Outcome = Result<Details, ProbeError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub identity: String,
    pub status: ProbeStatus,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub details: Details,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ClassifiedError>,
}

impl ProbeResult {
    pub fn completed(identity: &str, details: Details) -> Self {
        Self {
            identity: identity.to_string(),
            status: ProbeStatus::Completed,
            details,
            error: None,
        }
    }

    pub fn failed(identity: &str, error: ProbeError) -> Self {
        Self {
            identity: identity.to_string(),
            status: ProbeStatus::Failed,
            details: error.partial,
            error: Some(ClassifiedError::from(&error.failure)),
        }
    }

    pub fn skipped(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            status: ProbeStatus::Skipped,
            details: Details::new(),
            error: None,
        }
    }

    pub fn from_outcome(identity: &str, outcome: Outcome) -> Self {
        match outcome {
            Ok(details) => Self::completed(identity, details),
            Err(error) => Self::failed(identity, error),
        }
    }

    pub fn is_retryable_failure(&self) -> bool {
        self.status == ProbeStatus::Failed
            && self.error.as_ref().is_some_and(|e| e.is_retryable())
    }
}
