use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified probe failure. The classification drives retry eligibility and
/// report rendering; the message text is advisory.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeFailure {
    #[error("DNS resolution failed: {0}")]
    Resolution(String),

    #[error("connection failed: {0}")]
    Transport(String),

    #[error("timeout after {0}s")]
    Timeout(u64),

    #[error("TLS verification failed: {0}")]
    Tls(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

impl ProbeFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeFailure::Resolution(_) => "resolution",
            ProbeFailure::Transport(_) => "transport",
            ProbeFailure::Timeout(_) => "timeout",
            ProbeFailure::Tls(_) => "tls",
            ProbeFailure::Protocol(_) => "protocol",
            ProbeFailure::Decode(_) => "decode",
        }
    }
}

/// Wire form of a failure as it appears in a probe result: a stable
/// classification tag plus the rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: String,
    pub message: String,
}

impl ClassifiedError {
    /// Timeouts are the one class the retry controller re-runs.
    pub fn is_retryable(&self) -> bool {
        self.kind == "timeout"
    }
}

impl From<&ProbeFailure> for ClassifiedError {
    fn from(failure: &ProbeFailure) -> Self {
        Self {
            kind: failure.kind().to_string(),
            message: failure.to_string(),
        }
    }
}
