use super::{classify, Probe, ProbeContext};
use crate::core::errors::ProbeFailure;
use crate::core::result::{Details, Outcome, ProbeError};
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use url::Url;

const INTER_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// All three API probes require both endpoint and credential; without them
/// the orchestrator records a Skipped result and `run` is never called.
fn api_parts(target: &TargetDescriptor) -> Result<(&Url, &str), ProbeError> {
    match (&target.api_endpoint, &target.api_credential) {
        (Some(endpoint), Some(credential)) => Ok((endpoint, credential)),
        _ => Err(ProbeError::from(ProbeFailure::Protocol(
            "probe invoked without api endpoint and credential".into(),
        ))),
    }
}

/// The minimal generation request the upstream API accepts, keyed to the
/// image under diagnosis.
fn generation_payload(target: &TargetDescriptor) -> serde_json::Value {
    json!({
        "prompt": "Diagnostic test prompt",
        "keyframes": {
            "frame1": { "type": "image", "url": target.resource_url.as_str() }
        },
        "loop": false,
        "aspect_ratio": "9:16"
    })
}

/// Parse the body as JSON when possible, otherwise keep a bounded fragment.
fn body_fragment(text: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => value,
        Err(_) => json!(text.chars().take(512).collect::<String>()),
    }
}

/// One real generation request. A non-2xx answer is itself the finding the
/// reader came for, so it completes with `request_success=false`.
pub struct ApiJsonRequest;

#[async_trait]
impl Probe for ApiJsonRequest {
    fn identity(&self) -> &'static str {
        "API JSON Request"
    }

    fn applicable(&self, target: &TargetDescriptor) -> bool {
        target.has_api()
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let (endpoint, credential) = api_parts(target)?;
        let mut details = Details::new();
        details.insert("endpoint".into(), json!(endpoint.as_str()));

        let response = ctx
            .client()
            .post(endpoint.clone())
            .bearer_auth(credential)
            .json(&generation_payload(target))
            .timeout(target.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                ProbeError::with_partial(classify(&e, target.probe_timeout), details.clone())
            })?;

        let status = response.status().as_u16();
        details.insert("status_code".into(), json!(status));
        let text = response.text().await.unwrap_or_default();
        details.insert("response_body".into(), body_fragment(&text));
        details.insert(
            "request_success".into(),
            json!(matches!(status, 200 | 201 | 202)),
        );
        Ok(details)
    }
}

/// N sequential generation requests with a fixed pause between them. Attempt
/// outcomes, including per-attempt errors, are the payload; the probe itself
/// never fails once it starts issuing requests.
pub struct RateLimitTest;

#[async_trait]
impl Probe for RateLimitTest {
    fn identity(&self) -> &'static str {
        "Rate Limit Test"
    }

    fn applicable(&self, target: &TargetDescriptor) -> bool {
        target.has_api()
    }

    fn timeout(&self, target: &TargetDescriptor) -> Duration {
        let attempts = target.rate_limit_attempts as u32;
        target.probe_timeout * attempts + INTER_REQUEST_DELAY * attempts
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let (endpoint, credential) = api_parts(target)?;
        let payload = generation_payload(target);

        let mut responses = Vec::with_capacity(target.rate_limit_attempts);
        for attempt in 1..=target.rate_limit_attempts {
            let mut entry = serde_json::Map::new();
            entry.insert("attempt".into(), json!(attempt));

            match ctx
                .client()
                .post(endpoint.clone())
                .bearer_auth(credential)
                .json(&payload)
                .timeout(target.probe_timeout)
                .send()
                .await
            {
                Ok(resp) => {
                    entry.insert("status_code".into(), json!(resp.status().as_u16()));
                    let text = resp.text().await.unwrap_or_default();
                    entry.insert("body".into(), body_fragment(&text));
                }
                Err(e) => {
                    entry.insert("status_code".into(), json!(null));
                    entry.insert(
                        "body".into(),
                        json!(format!("request error: {}", classify(&e, target.probe_timeout))),
                    );
                }
            }
            responses.push(serde_json::Value::Object(entry));

            if attempt < target.rate_limit_attempts {
                tokio::time::sleep(INTER_REQUEST_DELAY).await;
            }
        }

        let mut details = Details::new();
        details.insert("endpoint".into(), json!(endpoint.as_str()));
        details.insert("num_attempts".into(), json!(target.rate_limit_attempts));
        details.insert("responses".into(), json!(responses));
        Ok(details)
    }
}

/// One authenticated request; anything but a 401 means the credential was
/// accepted.
pub struct ApiAuthentication;

#[async_trait]
impl Probe for ApiAuthentication {
    fn identity(&self) -> &'static str {
        "API Authentication"
    }

    fn applicable(&self, target: &TargetDescriptor) -> bool {
        target.has_api()
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let (endpoint, credential) = api_parts(target)?;
        let mut details = Details::new();
        details.insert("endpoint".into(), json!(endpoint.as_str()));

        let response = ctx
            .client()
            .get(endpoint.clone())
            .bearer_auth(credential)
            .timeout(target.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                ProbeError::with_partial(classify(&e, target.probe_timeout), details.clone())
            })?;

        let status = response.status().as_u16();
        details.insert("status_code".into(), json!(status));
        details.insert("authenticated".into(), json!(status != 401));
        Ok(details)
    }
}
