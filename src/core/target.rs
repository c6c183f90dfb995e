use std::time::Duration;
use url::Url;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RATE_LIMIT_ATTEMPTS: usize = 5;

/// Everything a run needs to know about what it is diagnosing. Built once by
/// the config layer, never mutated; the engine reads no ambient state.
#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    pub resource_url: Url,
    pub api_endpoint: Option<Url>,
    pub api_credential: Option<String>,
    pub case_id: Option<String>,
    pub probe_timeout: Duration,
    pub rate_limit_attempts: usize,
}

impl TargetDescriptor {
    pub fn new(resource_url: Url) -> Self {
        Self {
            resource_url,
            api_endpoint: None,
            api_credential: None,
            case_id: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            rate_limit_attempts: DEFAULT_RATE_LIMIT_ATTEMPTS,
        }
    }

    pub fn with_api(mut self, endpoint: Url, credential: String) -> Self {
        self.api_endpoint = Some(endpoint);
        self.api_credential = Some(credential);
        self
    }

    pub fn with_case(mut self, case_id: String) -> Self {
        self.case_id = Some(case_id);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn host(&self) -> Option<&str> {
        self.resource_url.host_str()
    }

    /// Credentialed probes run only when both endpoint and credential exist.
    pub fn has_api(&self) -> bool {
        self.api_endpoint.is_some() && self.api_credential.is_some()
    }

    /// Derived descriptor for a single retry with a widened timeout. The
    /// original descriptor stays untouched.
    pub fn escalated(&self, factor: u32) -> Self {
        let mut derived = self.clone();
        derived.probe_timeout = self.probe_timeout * factor;
        derived
    }
}
