//! Report Writer
//!
//! Writes a [`RunReport`] as JSON under `<output_dir>/<Strategy>/`.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use swarm_events::{report_file_name, RunReport};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where a report for this run lands under `output_dir`
pub fn report_path(output_dir: &Path, report: &RunReport) -> PathBuf {
    output_dir
        .join(&report.metadata.strategy)
        .join(report_file_name(&report.metadata))
}

/// Write the report, creating the strategy directory if needed.
pub fn write_report(output_dir: &Path, report: &RunReport) -> Result<PathBuf, OutputError> {
    let path = report_path(output_dir, report);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, report.to_json()?)?;
    tracing::info!("Wrote {} rows to {}", report.data.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_events::fixtures;
    use tempfile::tempdir;

    #[test]
    fn test_report_path_layout() {
        let report = fixtures::sample_report();
        let path = report_path(Path::new("results"), &report);

        assert_eq!(path, Path::new("results/DropZeros/2_2_1_2_10_10.json"));
    }

    #[test]
    fn test_write_report_roundtrip() {
        let dir = tempdir().unwrap();
        let report = fixtures::sample_report();

        let path = write_report(dir.path(), &report).unwrap();
        assert!(path.exists());

        let content = fs::read_to_string(&path).unwrap();
        let parsed = RunReport::from_json(&content).unwrap();
        assert_eq!(parsed, report);
    }
}
