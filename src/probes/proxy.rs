use super::{classify, Probe, ProbeContext};
use crate::core::result::{Details, Outcome, ProbeError};
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use serde_json::json;

/// Response headers that betray an intermediary or CDN in front of the origin.
const PROXY_HEADERS: [&str; 9] = [
    "via",
    "x-cache",
    "x-served-by",
    "cf-ray",
    "x-amz-cf-id",
    "x-forwarded-for",
    "x-real-ip",
    "age",
    "server",
];

/// Is a proxy or CDN answering instead of the origin. Only headers that are
/// actually present make it into the findings.
pub struct ProxyDetection;

#[async_trait]
impl Probe for ProxyDetection {
    fn identity(&self) -> &'static str {
        "Proxy Detection"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let resp = ctx
            .client()
            .get(target.resource_url.clone())
            .timeout(target.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                ProbeError::with_partial(classify(&e, target.probe_timeout), Details::new())
            })?;

        let mut seen = serde_json::Map::new();
        for name in PROXY_HEADERS {
            if let Some(value) = resp.headers().get(name).and_then(|v| v.to_str().ok()) {
                seen.insert(name.to_string(), json!(value));
            }
        }

        let mut details = Details::new();
        // `server` alone is not evidence of an intermediary
        let detected = seen.keys().any(|k| k != "server");
        details.insert("detected".into(), json!(detected));
        details.insert("proxy_headers".into(), serde_json::Value::Object(seen));
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use url::Url;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn cdn_headers_are_collected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Via", "1.1 varnish")
                    .insert_header("X-Cache", "HIT"),
            )
            .mount(&server)
            .await;

        let target = TargetDescriptor::new(Url::parse(&server.uri()).unwrap());
        let details = ProxyDetection
            .run(&target, &ProbeContext::new())
            .await
            .unwrap();

        assert_eq!(details["detected"], json!(true));
        assert_eq!(details["proxy_headers"]["via"], json!("1.1 varnish"));
        assert_eq!(details["proxy_headers"]["x-cache"], json!("HIT"));
    }

    #[tokio::test]
    async fn bare_origin_reports_nothing_detected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let target = TargetDescriptor::new(Url::parse(&server.uri()).unwrap());
        let details = ProxyDetection
            .run(&target, &ProbeContext::new())
            .await
            .unwrap();

        assert_eq!(details["detected"], json!(false));
    }
}
