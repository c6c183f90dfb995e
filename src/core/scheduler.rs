use super::errors::ProbeFailure;
use super::registry::ProbeRegistry;
use super::report::{CaseInfo, RunReport};
use super::result::{ProbeResult, ProbeStatus};
use super::target::TargetDescriptor;
use crate::probes::{Probe, ProbeContext};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Invoked as "probe at plan index N finished with result R". In concurrent
/// runs the callback order follows completion, not plan order.
pub type ProgressFn = dyn Fn(usize, &ProbeResult) + Send + Sync;

#[derive(Default)]
pub struct RunOptions {
    /// None or 1 = sequential; N>1 = bounded concurrent execution.
    pub concurrency: Option<usize>,
    /// Checked between plan steps; an in-flight probe still runs to its own
    /// deadline.
    pub cancel: Option<Arc<AtomicBool>>,
    pub progress: Option<Box<ProgressFn>>,
}

/// Runs the plan for one target: select, execute, aggregate, finalize. Owns
/// the report until it hands it back; individual probe failures never abort
/// the run.
pub struct Orchestrator {
    registry: ProbeRegistry,
    ctx: ProbeContext,
}

impl Orchestrator {
    pub fn new(registry: ProbeRegistry) -> Self {
        Self {
            registry,
            ctx: ProbeContext::new(),
        }
    }

    /// The ordered execution plan. Every registered probe is planned;
    /// applicability is decided at execution time so skipped probes stay
    /// visible in the report.
    pub fn plan(&self, _target: &TargetDescriptor) -> Vec<&'static str> {
        self.registry.identities()
    }

    /// The subset of the plan that will actually execute for this target.
    pub fn applicable_probes(&self, target: &TargetDescriptor) -> Vec<&'static str> {
        self.registry.applicable_identities(target)
    }

    pub async fn run(&self, target: &TargetDescriptor) -> RunReport {
        self.run_with(target, &RunOptions::default()).await
    }

    pub async fn run_with(&self, target: &TargetDescriptor, opts: &RunOptions) -> RunReport {
        let mut report = RunReport::new(target);
        tracing::info!(
            "running {} probes against {}",
            self.registry.len(),
            target.resource_url
        );

        match opts.concurrency {
            Some(workers) if workers > 1 => {
                self.run_concurrent(target, opts, workers, &mut report).await
            }
            _ => self.run_sequential(target, opts, &mut report).await,
        }

        self.finalize(target, &mut report);
        report
    }

    /// Re-run one probe by identity, e.g. for a retry with an escalated
    /// descriptor. None if the identity is unknown.
    pub async fn run_single(
        &self,
        identity: &str,
        target: &TargetDescriptor,
    ) -> Option<ProbeResult> {
        let probe = self.registry.get(identity)?;
        Some(self.execute_one(probe, target).await)
    }

    async fn run_sequential(
        &self,
        target: &TargetDescriptor,
        opts: &RunOptions,
        report: &mut RunReport,
    ) {
        for (idx, probe) in self.registry.iter().enumerate() {
            if cancelled(&opts.cancel) {
                tracing::warn!(
                    "run cancelled after {} of {} probes",
                    report.results.len(),
                    self.registry.len()
                );
                break;
            }
            let result = self.execute_one(probe, target).await;
            if let Some(cb) = &opts.progress {
                cb(idx, &result);
            }
            log_result(&result);
            report.results.push(result);
        }
    }

    /// Bounded concurrent execution. Results land in pre-sized, index-addressed
    /// slots so the report keeps plan order no matter the completion order.
    async fn run_concurrent(
        &self,
        target: &TargetDescriptor,
        opts: &RunOptions,
        workers: usize,
        report: &mut RunReport,
    ) {
        let total = self.registry.len();
        let mut slots: Vec<Option<ProbeResult>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        let mut completions = stream::iter(self.registry.iter().enumerate().map(
            |(idx, probe)| async move {
                if cancelled(&opts.cancel) {
                    return (idx, None);
                }
                (idx, Some(self.execute_one(probe, target).await))
            },
        ))
        .buffer_unordered(workers);

        while let Some((idx, completed)) = completions.next().await {
            if let Some(result) = completed {
                if let Some(cb) = &opts.progress {
                    cb(idx, &result);
                }
                log_result(&result);
                slots[idx] = Some(result);
            }
        }

        report.results = slots.into_iter().flatten().collect();
    }

    async fn execute_one(&self, probe: &dyn Probe, target: &TargetDescriptor) -> ProbeResult {
        if !probe.applicable(target) {
            tracing::debug!("{}: not applicable, skipping", probe.identity());
            return ProbeResult::skipped(probe.identity());
        }

        let budget = probe.timeout(target);
        tracing::debug!("{}: starting, budget {:?}", probe.identity(), budget);
        match tokio::time::timeout(budget, probe.run(target, &self.ctx)).await {
            Ok(outcome) => ProbeResult::from_outcome(probe.identity(), outcome),
            Err(_) => {
                let secs = budget.as_secs_f64().ceil() as u64;
                ProbeResult::failed(probe.identity(), ProbeFailure::Timeout(secs).into())
            }
        }
    }

    fn finalize(&self, target: &TargetDescriptor, report: &mut RunReport) {
        if let Some(case_id) = &target.case_id {
            report.case = Some(CaseInfo::new(case_id));
        }
        tracing::info!(
            "run complete: {} completed, {} failed, {} skipped",
            report.count(ProbeStatus::Completed),
            report.count(ProbeStatus::Failed),
            report.count(ProbeStatus::Skipped)
        );
    }
}

fn cancelled(flag: &Option<Arc<AtomicBool>>) -> bool {
    flag.as_ref().is_some_and(|f| f.load(Ordering::Relaxed))
}

fn log_result(result: &ProbeResult) {
    match result.status {
        ProbeStatus::Completed => tracing::info!("{}: completed", result.identity),
        ProbeStatus::Failed => {
            let tag = result.error.as_ref().map(|e| e.kind.as_str()).unwrap_or("?");
            tracing::warn!("{}: failed ({})", result.identity, tag);
        }
        ProbeStatus::Skipped => tracing::debug!("{}: skipped", result.identity),
    }
}
