use super::{require_host, resolve_host, Probe, ProbeContext};
use crate::core::result::{Details, Outcome, ProbeError};
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use serde_json::json;
use std::net::IpAddr;

/// A and AAAA answers for the resource host.
pub struct DnsRecords;

#[async_trait]
impl Probe for DnsRecords {
    fn identity(&self) -> &'static str {
        "DNS Records"
    }

    async fn run(&self, target: &TargetDescriptor, _ctx: &ProbeContext) -> Outcome {
        let mut details = Details::new();
        let host = require_host(target)
            .map_err(|f| ProbeError::with_partial(f, Details::new()))?;
        details.insert("hostname".into(), json!(host));

        let ips = resolve_host(&host)
            .await
            .map_err(|f| ProbeError::with_partial(f, details.clone()))?;

        let a: Vec<String> = ips
            .iter()
            .filter(|ip| ip.is_ipv4())
            .map(|ip| ip.to_string())
            .collect();
        let aaaa: Vec<String> = ips
            .iter()
            .filter(|ip| ip.is_ipv6())
            .map(|ip| ip.to_string())
            .collect();
        details.insert("a_records".into(), json!(a));
        details.insert("aaaa_records".into(), json!(aaaa));
        Ok(details)
    }
}

/// DNS blocklists consulted per resolved IPv4 address. An answer means the
/// address is listed; NXDOMAIN means it is not.
const BLOCKLISTS: [&str; 2] = ["zen.spamhaus.org", "bl.spamcop.net"];

/// Deeper network posture: resolved addresses plus DNSBL listing state for
/// the first IPv4 answer.
pub struct NetworkDiagnostics;

#[async_trait]
impl Probe for NetworkDiagnostics {
    fn identity(&self) -> &'static str {
        "Network Diagnostics"
    }

    async fn run(&self, target: &TargetDescriptor, _ctx: &ProbeContext) -> Outcome {
        let mut details = Details::new();
        let host = require_host(target)
            .map_err(|f| ProbeError::with_partial(f, Details::new()))?;
        details.insert("hostname".into(), json!(host));

        let ips = resolve_host(&host)
            .await
            .map_err(|f| ProbeError::with_partial(f, details.clone()))?;
        details.insert(
            "resolved_ips".into(),
            json!(ips.iter().map(|ip| ip.to_string()).collect::<Vec<_>>()),
        );

        if let Some(IpAddr::V4(v4)) = ips.iter().find(|ip| ip.is_ipv4()) {
            details.insert("checked_ip".into(), json!(v4.to_string()));
            let octets = v4.octets();
            let reversed = format!("{}.{}.{}.{}", octets[3], octets[2], octets[1], octets[0]);

            let mut listings = serde_json::Map::new();
            for blocklist in BLOCKLISTS {
                let query = format!("{reversed}.{blocklist}");
                let verdict = match resolve_host(&query).await {
                    Ok(_) => "listed",
                    Err(_) => "not listed",
                };
                listings.insert(blocklist.to_string(), json!(verdict));
            }
            details.insert("blocklists".into(), serde_json::Value::Object(listings));
        }

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use url::Url;

    #[tokio::test]
    async fn loopback_records_partition_by_family() {
        let target = TargetDescriptor::new(Url::parse("http://127.0.0.1/x.jpg").unwrap());
        let details = DnsRecords.run(&target, &ProbeContext::new()).await.unwrap();

        assert_eq!(details["a_records"], json!(["127.0.0.1"]));
        assert_eq!(details["aaaa_records"], json!([]));
    }

    #[tokio::test]
    async fn unresolvable_host_fails_with_resolution_tag() {
        let target = TargetDescriptor::new(Url::parse("http://ghost.host.invalid/x.jpg").unwrap());
        let err = DnsRecords
            .run(&target, &ProbeContext::new())
            .await
            .unwrap_err();

        assert_eq!(err.failure.kind(), "resolution");
        assert_eq!(err.partial["hostname"], json!("ghost.host.invalid"));
    }

    #[tokio::test]
    async fn network_diagnostics_records_blocklist_verdicts_for_v4() {
        let target = TargetDescriptor::new(Url::parse("http://127.0.0.1/x.jpg").unwrap());
        let details = NetworkDiagnostics
            .run(&target, &ProbeContext::new())
            .await
            .unwrap();

        assert_eq!(details["checked_ip"], json!("127.0.0.1"));
        let listings = details["blocklists"].as_object().unwrap();
        assert_eq!(listings.len(), BLOCKLISTS.len());
        for verdict in listings.values() {
            let verdict = verdict.as_str().unwrap();
            assert!(verdict == "listed" || verdict == "not listed");
        }
    }
}
