use super::{root_cause, Probe, ProbeContext};
use crate::core::errors::ProbeFailure;
use crate::core::result::{Details, Outcome, ProbeError};
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use serde_json::json;

/// Does the TLS handshake complete against the trusted root bundle. The
/// classification distinguishes a verification failure from a plain
/// connection problem; the probe resolves and connects on its own, sharing
/// nothing with Public Access.
pub struct CertValidation;

#[async_trait]
impl Probe for CertValidation {
    fn identity(&self) -> &'static str {
        "Cert Validation"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let mut details = Details::new();
        details.insert("url".into(), json!(target.resource_url.as_str()));

        match ctx
            .client()
            .get(target.resource_url.clone())
            .timeout(target.probe_timeout)
            .send()
            .await
        {
            Ok(resp) => {
                details.insert("cert_valid".into(), json!(true));
                details.insert("status_code".into(), json!(resp.status().as_u16()));
                Ok(details)
            }
            Err(e) => {
                details.insert("cert_valid".into(), json!(false));
                let failure = if e.is_timeout() {
                    ProbeFailure::Timeout(target.probe_timeout.as_secs())
                } else {
                    let root = root_cause(&e);
                    let lower = root.to_lowercase();
                    if lower.contains("certificate")
                        || lower.contains("handshake")
                        || lower.contains("tls")
                        || lower.contains("ssl")
                    {
                        ProbeFailure::Tls(root)
                    } else {
                        // Everything else, DNS included, is a transport-level
                        // inability to even start the handshake.
                        ProbeFailure::Transport(root)
                    }
                };
                Err(ProbeError::with_partial(failure, details))
            }
        }
    }
}
