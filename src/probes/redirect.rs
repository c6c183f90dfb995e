use super::{classify, Probe, ProbeContext};
use crate::core::errors::ProbeFailure;
use crate::core::result::{Details, Outcome, ProbeError};
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use serde_json::json;
use url::Url;

const MAX_REDIRECTS: usize = 10;

/// Walks the redirect chain hop by hop so every intermediate status code is
/// preserved in order, along with the final URL.
pub struct RedirectCheck;

#[async_trait]
impl Probe for RedirectCheck {
    fn identity(&self) -> &'static str {
        "Redirect Check"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let mut chain: Vec<u16> = Vec::new();
        let mut current: Url = target.resource_url.clone();

        for _ in 0..=MAX_REDIRECTS {
            let response = ctx
                .no_redirect_client()
                .get(current.clone())
                .timeout(target.probe_timeout)
                .send()
                .await;
            let resp = match response {
                Ok(resp) => resp,
                Err(e) => {
                    return Err(ProbeError::with_partial(
                        classify(&e, target.probe_timeout),
                        chain_details(&chain, &current, None),
                    ));
                }
            };

            let status = resp.status();
            if !status.is_redirection() {
                return Ok(chain_details(&chain, &current, Some(status.as_u16())));
            }

            chain.push(status.as_u16());
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let Some(location) = location else {
                return Err(ProbeError::with_partial(
                    ProbeFailure::Protocol(format!("{} redirect without Location header", status)),
                    chain_details(&chain, &current, Some(status.as_u16())),
                ));
            };
            current = match current.join(&location) {
                Ok(next) => next,
                Err(e) => {
                    return Err(ProbeError::with_partial(
                        ProbeFailure::Protocol(format!("unusable Location {location:?}: {e}")),
                        chain_details(&chain, &current, Some(status.as_u16())),
                    ));
                }
            };
        }

        Err(ProbeError::with_partial(
            ProbeFailure::Protocol(format!("more than {MAX_REDIRECTS} redirects")),
            chain_details(&chain, &current, None),
        ))
    }
}

fn chain_details(chain: &[u16], final_url: &Url, final_status: Option<u16>) -> Details {
    let mut details = Details::new();
    details.insert("is_redirecting".into(), json!(!chain.is_empty()));
    details.insert("chain".into(), json!(chain));
    details.insert("final_url".into(), json!(final_url.as_str()));
    if let Some(status) = final_status {
        details.insert("final_status".into(), json!(status));
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn records_the_chain_in_hop_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/mid"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mid"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/end"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/end"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let target =
            TargetDescriptor::new(Url::parse(&format!("{}/start", server.uri())).unwrap());
        let details = RedirectCheck
            .run(&target, &ProbeContext::new())
            .await
            .unwrap();

        assert_eq!(details["is_redirecting"], json!(true));
        assert_eq!(details["chain"], json!([302, 301]));
        assert_eq!(details["final_status"], json!(200));
        assert!(details["final_url"]
            .as_str()
            .unwrap()
            .ends_with("/end"));
    }

    #[tokio::test]
    async fn direct_response_reports_no_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let target = TargetDescriptor::new(Url::parse(&server.uri()).unwrap());
        let details = RedirectCheck
            .run(&target, &ProbeContext::new())
            .await
            .unwrap();

        assert_eq!(details["is_redirecting"], json!(false));
        assert_eq!(details["chain"], json!([]));
    }

    #[tokio::test]
    async fn redirect_without_location_is_a_protocol_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let target = TargetDescriptor::new(Url::parse(&server.uri()).unwrap());
        let err = RedirectCheck
            .run(&target, &ProbeContext::new())
            .await
            .unwrap_err();

        assert_eq!(err.failure.kind(), "protocol");
        assert_eq!(err.partial["chain"], json!([302]));
    }
}
