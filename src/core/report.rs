use super::result::{ProbeResult, ProbeStatus};
use super::target::TargetDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Report-facing view of the target. The credential itself never leaves the
/// descriptor; only its presence is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub resource_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    pub credential_present: bool,
    pub probe_timeout_secs: u64,
}

impl From<&TargetDescriptor> for TargetSummary {
    fn from(target: &TargetDescriptor) -> Self {
        Self {
            resource_url: target.resource_url.to_string(),
            api_endpoint: target.api_endpoint.as_ref().map(|u| u.to_string()),
            credential_present: target.api_credential.is_some(),
            probe_timeout_secs: target.probe_timeout.as_secs(),
        }
    }
}

/// Report-level case annotation. Not a probe result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseInfo {
    pub case_id: String,
    pub platform: String,
    pub recorded_at: DateTime<Utc>,
}

impl CaseInfo {
    pub fn new(case_id: &str) -> Self {
        Self {
            case_id: case_id.to_string(),
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            recorded_at: Utc::now(),
        }
    }
}

/// The aggregate outcome of one run. Owned by the orchestrator while probes
/// execute; afterwards only the retry controller replaces single entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub target: TargetSummary,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<CaseInfo>,
    pub results: Vec<ProbeResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,
}

impl RunReport {
    pub fn new(target: &TargetDescriptor) -> Self {
        Self {
            target: TargetSummary::from(target),
            started_at: Utc::now(),
            case: None,
            results: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn result(&self, identity: &str) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.identity == identity)
    }

    pub fn position(&self, identity: &str) -> Option<usize> {
        self.results.iter().position(|r| r.identity == identity)
    }

    pub fn count(&self, status: ProbeStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ProbeFailure;
    use crate::core::result::Details;
    use url::Url;

    fn target_with_api() -> TargetDescriptor {
        TargetDescriptor::new(Url::parse("https://img.example.com/a.jpg").unwrap()).with_api(
            Url::parse("https://api.example.com/v1").unwrap(),
            "super-secret-token".into(),
        )
    }

    #[test]
    fn summary_never_carries_the_credential() {
        let report = RunReport::new(&target_with_api());
        let encoded = serde_json::to_string(&report).unwrap();
        assert!(!encoded.contains("super-secret-token"));
        assert!(report.target.credential_present);
    }

    #[test]
    fn lookup_by_identity() {
        let mut report = RunReport::new(&target_with_api());
        report
            .results
            .push(ProbeResult::completed("Public Access", Details::new()));
        report.results.push(ProbeResult::failed(
            "Cert Validation",
            ProbeFailure::Tls("bad chain".into()).into(),
        ));
        report.results.push(ProbeResult::skipped("Rate Limit Test"));

        assert_eq!(report.position("Cert Validation"), Some(1));
        assert_eq!(report.count(ProbeStatus::Completed), 1);
        assert_eq!(report.count(ProbeStatus::Failed), 1);
        assert_eq!(report.count(ProbeStatus::Skipped), 1);
        assert!(report.result("DNS Records").is_none());
    }
}
