use crate::cli::args::Cli;
use crate::config;
use crate::core::registry::ProbeRegistry;
use crate::core::report::RunReport;
use crate::core::retry::{RetryController, RetryOutcome, ESCALATION_FACTOR};
use crate::core::scheduler::{Orchestrator, RunOptions};
use crate::core::target::TargetDescriptor;
use crate::reporters::writer;
use crate::ui::{printer, progress::RunProgress};
use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use url::Url;

/// The interactive flow as an explicit state machine. Retrying never
/// re-enters the whole flow; a "run another" answer loops back to Prompting
/// instead of recursing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WizardState {
    Prompting,
    Running,
    AwaitingRetryDecision,
    Reporting,
    Done,
}

fn post_run_state(has_retryable_failure: bool) -> WizardState {
    if has_retryable_failure {
        WizardState::AwaitingRetryDecision
    } else {
        WizardState::Reporting
    }
}

pub async fn run(cli: &Cli) -> Result<()> {
    println!("{}", "imgprobe guided diagnostics".blue().bold());
    println!("Answer a few questions and every applicable probe will run.\n");

    let orchestrator = Orchestrator::new(ProbeRegistry::standard());
    let mut state = WizardState::Prompting;
    let mut prepared: Option<config::ResolvedRun> = None;
    let mut report: Option<RunReport> = None;

    while state != WizardState::Done {
        state = match state {
            WizardState::Prompting => {
                prepared = Some(prompt_target(cli)?);
                report = None;
                WizardState::Running
            }

            WizardState::Running => {
                let run = prepared.as_ref().context("no target prepared")?;
                let applicable = orchestrator.applicable_probes(&run.target);
                println!(
                    "\nRunning {} of {} probes for this target...",
                    applicable.len(),
                    orchestrator.plan(&run.target).len()
                );
                let progress = RunProgress::new(orchestrator.plan(&run.target).len());
                let opts = RunOptions {
                    progress: Some(progress.observer()),
                    ..Default::default()
                };
                let finished = orchestrator.run_with(&run.target, &opts).await;
                progress.finish();

                let has_retryable = finished.results.iter().any(|r| r.is_retryable_failure());
                report = Some(finished);
                post_run_state(has_retryable)
            }

            WizardState::AwaitingRetryDecision => {
                let run = prepared.as_ref().context("no target prepared")?;
                let finished = report.as_mut().context("no report to patch")?;
                let mut controller = RetryController::new(&orchestrator);

                // one offer per timed-out probe; declining is final for this run
                for identity in controller.eligible(finished) {
                    let question = format!(
                        "{identity} timed out. Retry once with a {ESCALATION_FACTOR}x timeout?"
                    );
                    if !confirm(&question, false)? {
                        continue;
                    }
                    match controller.retry(&run.target, finished, &identity).await? {
                        RetryOutcome::Replaced => {
                            println!("  {} {identity} completed on retry", "✓".green());
                        }
                        RetryOutcome::StillFailing(fresh) => {
                            let tag = fresh
                                .error
                                .as_ref()
                                .map(|e| e.kind.clone())
                                .unwrap_or_default();
                            println!(
                                "  {} {identity} failed again ({tag}); keeping the original error",
                                "✗".red()
                            );
                        }
                    }
                }
                WizardState::Reporting
            }

            WizardState::Reporting => {
                let run = prepared.as_ref().context("no target prepared")?;
                let finished = report.as_mut().context("no report to write")?;
                writer::write_all(finished, &run.output_dir)?;
                printer::print_summary(finished);

                if confirm("Run another test?", false)? {
                    WizardState::Prompting
                } else {
                    WizardState::Done
                }
            }

            WizardState::Done => WizardState::Done,
        };
    }

    println!("\n{}", "Thanks for using imgprobe.".blue().bold());
    Ok(())
}

/// Ask for the URL (and optionally API access), reusing any flags already on
/// the command line. Each wizard run gets its own case id so results land in
/// their own directory.
fn prompt_target(cli: &Cli) -> Result<config::ResolvedRun> {
    let resource_url = match &cli.url {
        Some(url) => Url::parse(url).context("invalid --url")?,
        None => loop {
            let answer = prompt_line("What is the URL of the image to test?")?;
            match Url::parse(&answer) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => break url,
                _ => println!("  Please enter a full http(s) URL."),
            }
        },
    };

    let mut target = TargetDescriptor::new(resource_url);

    let credential = match &cli.api_key {
        Some(key) => Some(key.clone()),
        None => {
            if confirm("Do you have an API credential? (unlocks API probes)", false)? {
                Some(prompt_line("Credential:")?)
            } else {
                None
            }
        }
    };
    if let Some(credential) = credential {
        let endpoint = match &cli.api_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => prompt_line("API endpoint URL:")?,
        };
        let endpoint = Url::parse(&endpoint).context("invalid API endpoint")?;
        target = target.with_api(endpoint, credential);
    }

    let case_id = cli
        .case
        .clone()
        .unwrap_or_else(|| format!("wizard-{}", chrono::Utc::now().timestamp()));
    target = target.with_case(case_id.clone());

    let output_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| config::default_output_dir(Some(&case_id)));

    Ok(config::ResolvedRun { target, output_dir })
}

fn prompt_line(message: &str) -> Result<String> {
    print!("{message} ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn confirm(message: &str, default_yes: bool) -> Result<bool> {
    let suffix = if default_yes { "[Y/n]" } else { "[y/N]" };
    let answer = prompt_line(&format!("{message} {suffix}"))?;
    Ok(parse_confirm(&answer, default_yes))
}

fn parse_confirm(answer: &str, default_yes: bool) -> bool {
    match answer.trim().to_lowercase().as_str() {
        "" => default_yes,
        "y" | "yes" => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_failures_gate_the_retry_state() {
        assert_eq!(post_run_state(true), WizardState::AwaitingRetryDecision);
        assert_eq!(post_run_state(false), WizardState::Reporting);
    }

    #[test]
    fn confirm_parsing_honors_the_default() {
        assert!(parse_confirm("", true));
        assert!(!parse_confirm("", false));
        assert!(parse_confirm("y", false));
        assert!(parse_confirm("YES", false));
        assert!(!parse_confirm("n", true));
        assert!(!parse_confirm("anything else", true));
    }
}
