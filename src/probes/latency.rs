use super::{classify, Probe, ProbeContext};
use crate::core::result::{Details, Outcome, ProbeError};
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use serde_json::json;
use std::time::{Duration, Instant};

/// Stricter budget than the run default: a borderline-slow origin should
/// show up here even when the other probes pass.
const LATENCY_BUDGET: Duration = Duration::from_secs(5);

/// Round-trip time for one GET under a fixed 5s budget. The elapsed time is
/// recorded even when the request fails, so a timeout still tells the reader
/// how long it waited.
pub struct LatencyCheck;

#[async_trait]
impl Probe for LatencyCheck {
    fn identity(&self) -> &'static str {
        "Latency & Timeout"
    }

    fn timeout(&self, _target: &TargetDescriptor) -> Duration {
        // one second of grace so the request-level deadline below fires first
        LATENCY_BUDGET + Duration::from_secs(1)
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let mut details = Details::new();
        details.insert("budget_seconds".into(), json!(LATENCY_BUDGET.as_secs()));

        let start = Instant::now();
        let response = ctx
            .client()
            .get(target.resource_url.clone())
            .timeout(LATENCY_BUDGET)
            .send()
            .await;
        let elapsed = start.elapsed();
        details.insert(
            "latency_seconds".into(),
            json!((elapsed.as_secs_f64() * 1000.0).round() / 1000.0),
        );

        match response {
            Ok(resp) => {
                details.insert("status_code".into(), json!(resp.status().as_u16()));
                Ok(details)
            }
            Err(e) => Err(ProbeError::with_partial(
                classify(&e, LATENCY_BUDGET),
                details,
            )),
        }
    }
}
