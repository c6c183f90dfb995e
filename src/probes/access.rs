use super::{classify, require_host, resolve_host, Probe, ProbeContext};
use crate::core::errors::ProbeFailure;
use crate::core::result::{Details, Outcome, ProbeError};
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use serde_json::json;

/// Can the resource be fetched at all: DNS first, then a plain GET. A DNS
/// failure ends the probe early; the GET is never attempted against a name
/// that does not resolve.
pub struct PublicAccess;

#[async_trait]
impl Probe for PublicAccess {
    fn identity(&self) -> &'static str {
        "Public Access"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let mut details = Details::new();
        details.insert("url".into(), json!(target.resource_url.as_str()));

        let host = match require_host(target) {
            Ok(host) => host,
            Err(failure) => {
                details.insert("dns_resolved".into(), json!(false));
                return Err(ProbeError::with_partial(failure, details));
            }
        };

        match resolve_host(&host).await {
            Ok(_) => {
                details.insert("dns_resolved".into(), json!(true));
            }
            Err(failure) => {
                details.insert("dns_resolved".into(), json!(false));
                return Err(ProbeError::with_partial(failure, details));
            }
        }

        let response = ctx
            .client()
            .get(target.resource_url.clone())
            .timeout(target.probe_timeout)
            .send()
            .await;
        match response {
            Ok(resp) => {
                let status = resp.status();
                details.insert("status_code".into(), json!(status.as_u16()));
                if status.is_success() {
                    details.insert("reachable".into(), json!(true));
                    Ok(details)
                } else {
                    details.insert("reachable".into(), json!(false));
                    Err(ProbeError::with_partial(
                        ProbeFailure::Protocol(format!("received status {}", status)),
                        details,
                    ))
                }
            }
            Err(e) => {
                details.insert("reachable".into(), json!(false));
                Err(ProbeError::with_partial(
                    classify(&e, target.probe_timeout),
                    details,
                ))
            }
        }
    }
}
