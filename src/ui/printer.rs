use crate::core::report::RunReport;
use crate::core::result::ProbeStatus;
use colored::Colorize;

pub fn print_summary(report: &RunReport) {
    println!("\n{}", "═══════════════════════════════════════".green().bold());
    println!("{}", "imgprobe run complete".green().bold());
    println!("{}", "═══════════════════════════════════════".green().bold());

    println!("\n{}: {}", "Target".cyan().bold(), report.target.resource_url);
    if let Some(case) = &report.case {
        println!("{}: {}", "Case".cyan().bold(), case.case_id);
    }

    println!("\n{}", "Results:".yellow().bold());
    println!(
        "  Completed: {}",
        report
            .count(ProbeStatus::Completed)
            .to_string()
            .green()
            .bold()
    );
    let failed = report.count(ProbeStatus::Failed);
    if failed > 0 {
        println!("  Failed: {}", failed.to_string().red().bold());
    }
    let skipped = report.count(ProbeStatus::Skipped);
    if skipped > 0 {
        println!("  Skipped: {}", skipped.to_string().dimmed());
    }

    let failures: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.status == ProbeStatus::Failed)
        .collect();
    if !failures.is_empty() {
        println!("\n{}", "Failed probes:".yellow().bold());
        for result in failures {
            let (kind, message) = result
                .error
                .as_ref()
                .map(|e| (e.kind.as_str(), e.message.as_str()))
                .unwrap_or(("?", ""));
            println!(
                "  {} {} — [{}] {}",
                "✗".red(),
                result.identity.red(),
                kind,
                message
            );
        }
    }

    if !report.artifacts.is_empty() {
        println!("\n{}", "Reports written to:".yellow().bold());
        for path in &report.artifacts {
            println!("  {}", path.display());
        }
    }
}
