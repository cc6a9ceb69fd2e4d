use std::path::{Path, PathBuf};

use lvr_lib::types::{ComparisonResult, ThresholdEvaluation};
use lvr_lib::{generate_top_issues, LvrError, Snapshot, Summary};

/// Issues listed in a compare summary before the pass/fail line.
const MAX_TOP_ISSUES: usize = 8;

/// Read, parse and validate one snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, LvrError> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        LvrError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read snapshot {}: {e}", path.display()),
        ))
    })?;
    Snapshot::from_json(&data).map_err(|e| match e {
        LvrError::Serialization(inner) => LvrError::invalid_snapshot(format!(
            "{} is not a snapshot: {inner}",
            path.display()
        )),
        LvrError::InvalidSnapshot(msg) => {
            LvrError::invalid_snapshot(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

pub fn load_snapshots(paths: &[PathBuf]) -> Result<Vec<Snapshot>, LvrError> {
    paths.iter().map(|p| load_snapshot(p)).collect()
}

/// Ranked issues plus one closing line with the verdict.
pub fn generate_summary(result: &ComparisonResult, evaluation: &ThresholdEvaluation) -> Summary {
    let mut top_issues = generate_top_issues(result, MAX_TOP_ISSUES);

    for violation in evaluation.failures.iter().chain(&evaluation.warnings) {
        top_issues.push(violation.message.clone());
    }

    if evaluation.passed {
        top_issues.push(format!(
            "Layout check passed ({:.1}% similarity, {} difference(s))",
            result.similarity,
            result.differences.len()
        ));
    } else {
        top_issues.push(format!(
            "Layout check failed ({:.1}% similarity, {} threshold failure(s))",
            result.similarity,
            evaluation.failures.len()
        ));
    }

    Summary { top_issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lvr_lib::types::{ComparisonSummary, ThresholdCategory, ThresholdViolation};
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_snapshot_reads_valid_json() {
        let file = write_temp(
            r#"{"url":"https://example.test","viewport":{"width":800,"height":600},
                "elements":[{"tagName":"main","rect":{"x":0,"y":0,"width":800,"height":600}}]}"#,
        );
        let snapshot = load_snapshot(file.path()).unwrap();
        assert_eq!(snapshot.viewport.width, 800);
        assert_eq!(snapshot.elements.len(), 1);
    }

    #[test]
    fn load_snapshot_names_the_file_on_parse_errors() {
        let file = write_temp("{\"url\": 1}");
        let err = load_snapshot(file.path()).unwrap_err();
        assert!(matches!(err, LvrError::InvalidSnapshot(_)));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn load_snapshot_rejects_zero_viewport() {
        let file = write_temp(r#"{"url":"u","viewport":{"width":0,"height":600},"elements":[]}"#);
        assert!(matches!(
            load_snapshot(file.path()),
            Err(LvrError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_snapshot(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(matches!(err, LvrError::Io(_)));
    }

    #[test]
    fn summary_ends_with_verdict() {
        let result = ComparisonResult {
            similarity: 80.0,
            differences: vec![],
            summary: ComparisonSummary::default(),
        };
        let evaluation = ThresholdEvaluation {
            passed: false,
            failures: vec![ThresholdViolation {
                category: ThresholdCategory::Similarity,
                message: "Similarity 80.0% is below the minimum of 95.0%".to_string(),
                actual: 80.0,
                limit: 95.0,
            }],
            warnings: vec![],
        };
        let summary = generate_summary(&result, &evaluation);
        assert_eq!(summary.top_issues.len(), 2);
        assert!(summary.top_issues[0].contains("below the minimum"));
        assert!(summary.top_issues[1].starts_with("Layout check failed"));
    }
}
