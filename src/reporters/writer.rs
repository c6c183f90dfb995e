use super::render;
use crate::core::report::RunReport;
use crate::utils::{fs::atomic_write, time};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub struct WrittenArtifacts {
    pub json: PathBuf,
    pub text: PathBuf,
}

/// Persist both serializations of a finished run. Artifact paths are recorded
/// on the report first so they appear inside the persisted forms; after this
/// the report is closed.
pub fn write_all(report: &mut RunReport, out_dir: &Path) -> Result<WrittenArtifacts> {
    let stem = time::artifact_stem(&report.started_at);
    let json_path = out_dir.join(format!("{stem}.json"));
    let text_path = out_dir.join(format!("{stem}.txt"));
    report.artifacts = vec![json_path.clone(), text_path.clone()];

    atomic_write(&json_path, render::to_json(report)?.as_bytes())?;
    atomic_write(&text_path, render::to_text(report).as_bytes())?;

    tracing::info!(
        "report written: {} and {}",
        json_path.display(),
        text_path.display()
    );
    Ok(WrittenArtifacts {
        json: json_path,
        text: text_path,
    })
}
