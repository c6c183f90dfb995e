pub mod access;
pub mod api;
pub mod dns;
pub mod encoding;
pub mod headers;
pub mod image;
pub mod latency;
pub mod proxy;
pub mod redirect;
pub mod tls;

use crate::core::errors::ProbeFailure;
use crate::core::result::Outcome;
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

pub(crate) const PROBE_USER_AGENT: &str = concat!("imgprobe/", env!("CARGO_PKG_VERSION"));

/// One independent diagnostic check. Probes share nothing but the read-only
/// target and context; running one twice with the same target is consistent
/// modulo transient network state.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable identity. Report consumers and the retry controller key on it;
    /// renaming one is a breaking change.
    fn identity(&self) -> &'static str;

    /// Whether this probe can run at all for the given target. A false
    /// predicate yields a Skipped result, never a Failed one.
    fn applicable(&self, _target: &TargetDescriptor) -> bool {
        true
    }

    /// Wall-clock budget the orchestrator enforces around `run`.
    fn timeout(&self, target: &TargetDescriptor) -> Duration {
        target.probe_timeout
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome;
}

/// Shared read-only resources for probe execution: one verifying client and
/// one that surfaces redirects instead of following them.
pub struct ProbeContext {
    http: reqwest::Client,
    no_redirect: reqwest::Client,
}

impl ProbeContext {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .build()
            .expect("failed to build HTTP client");
        let no_redirect = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build HTTP client");
        Self { http, no_redirect }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn no_redirect_client(&self) -> &reqwest::Client {
        &self.no_redirect
    }
}

impl Default for ProbeContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a transport-layer error onto the failure taxonomy. The deepest cause
/// in the source chain carries the useful message; reqwest's outer layers
/// only say "error sending request".
pub(crate) fn classify(err: &reqwest::Error, budget: Duration) -> ProbeFailure {
    if err.is_timeout() {
        return ProbeFailure::Timeout(budget.as_secs());
    }
    let root = root_cause(err);
    let lower = root.to_lowercase();
    if lower.contains("certificate")
        || lower.contains("handshake")
        || lower.contains("tls")
        || lower.contains("ssl")
    {
        return ProbeFailure::Tls(root);
    }
    if lower.contains("dns") || lower.contains("resolve") || lower.contains("name or service") {
        return ProbeFailure::Resolution(root);
    }
    if err.is_decode() || err.is_body() {
        return ProbeFailure::Decode(root);
    }
    ProbeFailure::Transport(root)
}

pub(crate) fn root_cause(err: &reqwest::Error) -> String {
    let mut cause: &dyn std::error::Error = err;
    while let Some(next) = cause.source() {
        cause = next;
    }
    cause.to_string()
}

pub(crate) async fn resolve_host(host: &str) -> Result<Vec<IpAddr>, ProbeFailure> {
    match tokio::net::lookup_host((host, 0u16)).await {
        Ok(addrs) => {
            let ips: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
            if ips.is_empty() {
                Err(ProbeFailure::Resolution(format!("no addresses for {host}")))
            } else {
                Ok(ips)
            }
        }
        Err(e) => Err(ProbeFailure::Resolution(e.to_string())),
    }
}

pub(crate) fn require_host(target: &TargetDescriptor) -> Result<String, ProbeFailure> {
    target
        .host()
        .map(str::to_string)
        .ok_or_else(|| ProbeFailure::Resolution("resource URL has no hostname".into()))
}
