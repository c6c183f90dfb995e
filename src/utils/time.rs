use chrono::{DateTime, Utc};
use regex::Regex;

/// File stem shared by the two report artifacts of one run.
pub fn artifact_stem(started_at: &DateTime<Utc>) -> String {
    format!("{}-diagnostic", started_at.format("%Y-%m-%dT%H%M%S"))
}

/// Sanitize a case id or hostname for use as a path component.
pub fn sanitize_component(raw: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9\-_\.]").expect("static pattern");
    re.replace_all(raw, "_").to_string()
}
