use super::report::RunReport;
use super::result::{ProbeResult, ProbeStatus};
use super::scheduler::Orchestrator;
use super::target::TargetDescriptor;
use anyhow::{bail, Result};
use std::collections::HashSet;

/// Multiplier applied to the target's probe timeout for the single retry.
pub const ESCALATION_FACTOR: u32 = 3;

/// Re-runs one timed-out probe on explicit request. Never automatic, at most
/// one attempt per probe per run; a successful re-run replaces the original
/// result at its original plan position.
pub struct RetryController<'a> {
    orchestrator: &'a Orchestrator,
    attempted: HashSet<String>,
}

#[derive(Debug)]
pub enum RetryOutcome {
    /// The re-run completed; the report now carries the replacement.
    Replaced,
    /// The re-run failed again; the original result was kept. The fresh
    /// failure is returned for display only.
    StillFailing(ProbeResult),
}

impl<'a> RetryController<'a> {
    pub fn new(orchestrator: &'a Orchestrator) -> Self {
        Self {
            orchestrator,
            attempted: HashSet::new(),
        }
    }

    /// Identities currently offered for retry: failed with a retryable
    /// classification and not yet attempted this run.
    pub fn eligible(&self, report: &RunReport) -> Vec<String> {
        report
            .results
            .iter()
            .filter(|r| r.is_retryable_failure() && !self.attempted.contains(&r.identity))
            .map(|r| r.identity.clone())
            .collect()
    }

    pub async fn retry(
        &mut self,
        target: &TargetDescriptor,
        report: &mut RunReport,
        identity: &str,
    ) -> Result<RetryOutcome> {
        let Some(position) = report.position(identity) else {
            bail!("no result named {identity:?} in this report");
        };
        if !report.results[position].is_retryable_failure() {
            bail!("{identity:?} is not a retryable failure");
        }
        if !self.attempted.insert(identity.to_string()) {
            bail!("{identity:?} was already retried this run");
        }

        let escalated = target.escalated(ESCALATION_FACTOR);
        tracing::info!(
            "retrying {} with timeout {:?}",
            identity,
            escalated.probe_timeout
        );

        let Some(rerun) = self.orchestrator.run_single(identity, &escalated).await else {
            bail!("probe {identity:?} is not registered");
        };

        if rerun.status == ProbeStatus::Completed {
            report.results[position] = rerun;
            Ok(RetryOutcome::Replaced)
        } else {
            tracing::warn!("retry of {} failed again; keeping original result", identity);
            Ok(RetryOutcome::StillFailing(rerun))
        }
    }
}
