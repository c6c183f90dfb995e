use crate::core::report::RunReport;
use crate::core::result::ProbeStatus;
use anyhow::Result;

/// Lossless structured form: the report tree exactly as serde sees it,
/// suitable for re-ingestion. Pure; repeated calls are byte-identical.
pub fn to_json(report: &RunReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Human-readable form: one section per probe result in plan order, one line
/// per finding, errors rendered on their own line. Pure, like `to_json`.
pub fn to_text(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str("imgprobe diagnostic report\n");
    out.push_str("==========================\n");
    out.push_str(&format!("Target: {}\n", report.target.resource_url));
    if let Some(endpoint) = &report.target.api_endpoint {
        out.push_str(&format!("API endpoint: {}\n", endpoint));
    }
    out.push_str(&format!(
        "Started: {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Probe timeout: {}s\n\n",
        report.target.probe_timeout_secs
    ));

    if let Some(case) = &report.case {
        out.push_str("Case Information\n");
        out.push_str(&format!("  case_id: {}\n", case.case_id));
        out.push_str(&format!("  platform: {}\n", case.platform));
        out.push_str(&format!(
            "  recorded_at: {}\n\n",
            case.recorded_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    for result in &report.results {
        out.push_str(&format!("Test: {}\n", result.identity));
        out.push_str(&format!("  status: {}\n", status_label(result.status)));
        for (key, value) in &result.details {
            out.push_str(&format!("  {}: {}\n", key, render_value(value)));
        }
        if let Some(error) = &result.error {
            out.push_str(&format!("  Error: [{}] {}\n", error.kind, error.message));
        }
        out.push('\n');
    }

    if !report.artifacts.is_empty() {
        out.push_str("Artifacts:\n");
        for path in &report.artifacts {
            out.push_str(&format!("  {}\n", path.display()));
        }
    }

    out
}

fn status_label(status: ProbeStatus) -> &'static str {
    match status {
        ProbeStatus::Completed => "completed",
        ProbeStatus::Failed => "failed",
        ProbeStatus::Skipped => "skipped",
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ProbeFailure;
    use crate::core::report::CaseInfo;
    use crate::core::result::{Details, ProbeResult};
    use crate::core::target::TargetDescriptor;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use url::Url;

    fn sample_report() -> RunReport {
        let target =
            TargetDescriptor::new(Url::parse("https://img.example.com/photo.jpg").unwrap())
                .with_case("CASE-12".into());
        let mut report = RunReport::new(&target);
        report.case = Some(CaseInfo::new("CASE-12"));

        let mut details = Details::new();
        details.insert("dns_resolved".into(), json!(true));
        details.insert("reachable".into(), json!(true));
        details.insert("status_code".into(), json!(200));
        report
            .results
            .push(ProbeResult::completed("Public Access", details));

        let mut partial = Details::new();
        partial.insert("cert_valid".into(), json!(false));
        report.results.push(ProbeResult::failed(
            "Cert Validation",
            crate::core::result::ProbeError::with_partial(
                ProbeFailure::Tls("self-signed certificate".into()),
                partial,
            ),
        ));

        report
            .results
            .push(ProbeResult::skipped("API Authentication"));
        report
    }

    #[test]
    fn rendering_is_idempotent_in_both_forms() {
        let report = sample_report();
        assert_eq!(to_text(&report), to_text(&report));
        assert_eq!(to_json(&report).unwrap(), to_json(&report).unwrap());
    }

    #[test]
    fn structured_form_round_trips_losslessly() {
        let report = sample_report();
        let decoded: RunReport = serde_json::from_str(&to_json(&report).unwrap()).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn sections_follow_result_order() {
        let text = to_text(&sample_report());
        let access = text.find("Test: Public Access").unwrap();
        let cert = text.find("Test: Cert Validation").unwrap();
        let auth = text.find("Test: API Authentication").unwrap();
        assert!(access < cert && cert < auth);
    }

    #[test]
    fn errors_render_on_their_own_tagged_line() {
        let text = to_text(&sample_report());
        assert!(text.contains("  Error: [tls] TLS verification failed: self-signed certificate"));
        // findings gathered before the failure still render as findings
        assert!(text.contains("  cert_valid: false"));
    }

    #[test]
    fn skipped_results_stay_visible() {
        let text = to_text(&sample_report());
        assert!(text.contains("Test: API Authentication\n  status: skipped"));
    }

    #[test]
    fn case_section_is_not_a_probe_section() {
        let text = to_text(&sample_report());
        assert!(text.contains("Case Information\n  case_id: CASE-12"));
        assert!(!text.contains("Test: Case Information"));
    }
}
