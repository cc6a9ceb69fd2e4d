use serde_json::Value;

use crate::types::{ComparisonResult, DiffSeverity, DifferenceType, VisualDifference};

const PRIORITY_REMOVED: u8 = 0;
const PRIORITY_ADDED: u8 = 1;
const PRIORITY_MODIFIED: u8 = 2;
const PRIORITY_MOVED: u8 = 3;

/// Added/removed elements beyond this count are summarized in one line.
const LIST_LIMIT: usize = 3;

#[derive(Debug, Clone)]
struct RankedIssue {
    severity_rank: u8,
    priority_rank: u8,
    message: String,
}

impl RankedIssue {
    fn new(severity: DiffSeverity, priority_rank: u8, message: impl Into<String>) -> Self {
        let severity_rank = match severity {
            DiffSeverity::Major => 0,
            DiffSeverity::Moderate => 1,
            DiffSeverity::Minor => 2,
        };
        Self {
            severity_rank,
            priority_rank,
            message: message.into(),
        }
    }
}

/// Human-readable issue lines, most severe first.
pub fn generate_top_issues(result: &ComparisonResult, max_issues: usize) -> Vec<String> {
    let mut issues: Vec<RankedIssue> = Vec::new();

    issues.extend(issues_from_unpaired(result, DifferenceType::Removed));
    issues.extend(issues_from_unpaired(result, DifferenceType::Added));

    for diff in &result.differences {
        match diff.difference_type {
            DifferenceType::Modified => issues.push(RankedIssue::new(
                diff.severity,
                PRIORITY_MODIFIED,
                modified_message(diff),
            )),
            DifferenceType::Moved => issues.push(RankedIssue::new(
                diff.severity,
                PRIORITY_MOVED,
                format!("{} moved by {:.0}px.", describe(diff), diff.position_diff),
            )),
            DifferenceType::Added | DifferenceType::Removed => {}
        }
    }

    issues.sort_by(|a, b| {
        a.severity_rank
            .cmp(&b.severity_rank)
            .then_with(|| a.priority_rank.cmp(&b.priority_rank))
            .then_with(|| a.message.cmp(&b.message))
    });
    issues
        .into_iter()
        .take(max_issues)
        .map(|i| i.message)
        .collect()
}

fn issues_from_unpaired(result: &ComparisonResult, kind: DifferenceType) -> Vec<RankedIssue> {
    let (priority, verb) = match kind {
        DifferenceType::Removed => (PRIORITY_REMOVED, "is missing from the current snapshot"),
        _ => (PRIORITY_ADDED, "appears only in the current snapshot"),
    };
    let matching: Vec<&VisualDifference> = result
        .differences
        .iter()
        .filter(|d| d.difference_type == kind)
        .collect();

    if matching.len() > LIST_LIMIT {
        let plural = if kind == DifferenceType::Removed {
            "are missing from the current snapshot"
        } else {
            "appear only in the current snapshot"
        };
        return vec![RankedIssue::new(
            DiffSeverity::Major,
            priority,
            format!("{} elements {}.", matching.len(), plural),
        )];
    }
    matching
        .into_iter()
        .map(|d| RankedIssue::new(d.severity, priority, format!("{} {}.", describe(d), verb)))
        .collect()
}

fn describe(diff: &VisualDifference) -> String {
    let Some(element) = diff.element() else {
        return "element".to_string();
    };
    match element.text.as_deref() {
        Some(text) if text.chars().count() > 30 => {
            let truncated: String = text.chars().take(27).collect();
            format!("{} '{}...'", element.describe(), truncated)
        }
        Some(text) => format!("{} '{}'", element.describe(), text),
        None => element.describe(),
    }
}

fn modified_message(diff: &VisualDifference) -> String {
    let parts: Vec<String> = diff
        .changes
        .iter()
        .map(|c| format!("{} {} -> {}", c.property, render(&c.before), render(&c.after)))
        .collect();
    format!("{} changed: {}.", describe(diff), parts.join(", "))
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "none".to_string(),
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}
