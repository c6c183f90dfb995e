use super::{classify, Probe, ProbeContext, PROBE_USER_AGENT};
use crate::core::result::{Details, Outcome, ProbeError};
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use serde_json::json;

/// Declared vs. actual content metadata. A mismatch between the advertised
/// and delivered length is a finding, not a failure.
pub struct HeadersContent;

#[async_trait]
impl Probe for HeadersContent {
    fn identity(&self) -> &'static str {
        "Headers and Content"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let mut details = Details::new();

        let resp = ctx
            .client()
            .get(target.resource_url.clone())
            .timeout(target.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                ProbeError::with_partial(classify(&e, target.probe_timeout), Details::new())
            })?;

        details.insert(
            "content_type".into(),
            json!(header_str(&resp, CONTENT_TYPE)),
        );
        let declared = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        details.insert("content_length_header".into(), json!(declared));

        let body = resp.bytes().await.map_err(|e| {
            ProbeError::with_partial(classify(&e, target.probe_timeout), details.clone())
        })?;
        let actual = body.len() as u64;
        details.insert("content_length_actual".into(), json!(actual));
        details.insert(
            "length_mismatch".into(),
            json!(declared.is_some_and(|d| d != actual)),
        );

        Ok(details)
    }
}

/// Some origins answer HEAD differently than GET; record what HEAD says.
pub struct HttpHead;

#[async_trait]
impl Probe for HttpHead {
    fn identity(&self) -> &'static str {
        "HTTP HEAD Check"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let resp = ctx
            .client()
            .head(target.resource_url.clone())
            .timeout(target.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                ProbeError::with_partial(classify(&e, target.probe_timeout), Details::new())
            })?;

        let mut details = Details::new();
        details.insert("status_code".into(), json!(resp.status().as_u16()));

        let mut headers = serde_json::Map::new();
        for (name, value) in resp.headers() {
            headers.insert(
                name.as_str().to_string(),
                json!(String::from_utf8_lossy(value.as_bytes())),
            );
        }
        details.insert("headers".into(), serde_json::Value::Object(headers));
        Ok(details)
    }
}

/// Presence of an Access-Control-Allow-Origin answer for browser callers.
pub struct CorsCheck;

#[async_trait]
impl Probe for CorsCheck {
    fn identity(&self) -> &'static str {
        "CORS Check"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let resp = ctx
            .client()
            .request(reqwest::Method::OPTIONS, target.resource_url.clone())
            .timeout(target.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                ProbeError::with_partial(classify(&e, target.probe_timeout), Details::new())
            })?;

        let mut details = Details::new();
        details.insert("status_code".into(), json!(resp.status().as_u16()));
        details.insert(
            "access_control_allow_origin".into(),
            json!(header_str(&resp, ACCESS_CONTROL_ALLOW_ORIGIN)),
        );
        Ok(details)
    }
}

/// Whether the origin commits to HTTPS via Strict-Transport-Security.
pub struct HstsCheck;

#[async_trait]
impl Probe for HstsCheck {
    fn identity(&self) -> &'static str {
        "HSTS Check"
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

        let mut details = Details::new();
        details.insert(
            "strict_transport_security".into(),
            json!(header_str(&resp, reqwest::header::STRICT_TRANSPORT_SECURITY)
                .unwrap_or_else(|| "Not set".to_string())),
        );
        Ok(details)
    }
}

/// Some origins gate on the User-Agent string. Compare an anonymous request
/// with one identifying this tool.
pub struct UserAgentVariation;

#[async_trait]
impl Probe for UserAgentVariation {
    fn identity(&self) -> &'static str {
        "User-Agent Variation"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let mut details = Details::new();

        let default = ctx
            .client()
            .get(target.resource_url.clone())
            .timeout(target.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                ProbeError::with_partial(classify(&e, target.probe_timeout), Details::new())
            })?;
        details.insert("status_code_default".into(), json!(default.status().as_u16()));

        let custom = ctx
            .client()
            .get(target.resource_url.clone())
            .header(USER_AGENT, PROBE_USER_AGENT)
            .timeout(target.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                ProbeError::with_partial(classify(&e, target.probe_timeout), details.clone())
            })?;
        details.insert(
            "status_code_custom_agent".into(),
            json!(custom.status().as_u16()),
        );
        details.insert("user_agent".into(), json!(PROBE_USER_AGENT));

        Ok(details)
    }
}

fn header_str(resp: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    resp.headers()
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).to_string())
}
