use super::{classify, Probe, ProbeContext};
use crate::core::result::{Details, Outcome, ProbeError};
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING};
use serde_json::json;

/// Does the origin compress when asked to. The client performs no automatic
/// decompression, so the Content-Encoding answer arrives intact.
pub struct ContentEncoding;

#[async_trait]
impl Probe for ContentEncoding {
    fn identity(&self) -> &'static str {
        "Content Encoding"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let resp = ctx
            .client()
            .get(target.resource_url.clone())
            .header(ACCEPT_ENCODING, "gzip, deflate")
            .timeout(target.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                ProbeError::with_partial(classify(&e, target.probe_timeout), Details::new())
            })?;

        let encoding = resp
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();

        let mut details = Details::new();
        details.insert("compressed".into(), json!(encoding != "none"));
        details.insert("encoding".into(), json!(encoding));
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use url::Url;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn compressed_answer_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Accept-Encoding", "gzip, deflate"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Encoding", "gzip"))
            .mount(&server)
            .await;

        let target = TargetDescriptor::new(Url::parse(&server.uri()).unwrap());
        let details = ContentEncoding
            .run(&target, &ProbeContext::new())
            .await
            .unwrap();

        assert_eq!(details["compressed"], json!(true));
        assert_eq!(details["encoding"], json!("gzip"));
    }

    #[tokio::test]
    async fn plain_answer_reads_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let target = TargetDescriptor::new(Url::parse(&server.uri()).unwrap());
        let details = ContentEncoding
            .run(&target, &ProbeContext::new())
            .await
            .unwrap();

        assert_eq!(details["compressed"], json!(false));
        assert_eq!(details["encoding"], json!("none"));
    }
}
