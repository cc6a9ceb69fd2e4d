//! Semantic-tree comparator.
//!
//! Compares the group hierarchies of two snapshots rather than their raw
//! elements. Groups are flattened, paired on geometric fingerprints, and the
//! score discounts moved groups relative to other changes.

use tracing::debug;

use super::elements::{similarity_score, CompareOptions};
use crate::error::{LvrError, Result};
use crate::grouping::snapshot_groups;
use crate::matching::fingerprint::match_groups;
use crate::matching::text::compare_text;
use crate::types::group::flatten_groups;
use crate::types::{
    ComparisonResult, ComparisonSummary, DiffSeverity, DifferenceType, ElementRef,
    PropertyChange, SemanticGroup, Snapshot, VisualDifference,
};

/// Compare two snapshots by their semantic groups.
///
/// Captured `semanticGroups` are used when present; otherwise groups are
/// built from the elements.
pub fn compare_semantic(
    baseline: &Snapshot,
    current: &Snapshot,
    options: &CompareOptions,
) -> Result<ComparisonResult> {
    if !options.allow_viewport_mismatch && baseline.viewport != current.viewport {
        return Err(LvrError::ViewportMismatch {
            baseline: baseline.viewport,
            current: current.viewport,
        });
    }
    let base = snapshot_groups(baseline, &options.grouping);
    let curr = snapshot_groups(current, &options.grouping);
    Ok(compare_groups(&base, &curr, options))
}

/// Compare two group forests.
///
/// Similarity is `100 * max(0, 1 - weighted / total)` where `weighted` counts
/// added, removed and modified groups fully and moved groups at
/// `moved_weight`, and `total` is the larger side's group count.
pub fn compare_groups(
    baseline: &[SemanticGroup],
    current: &[SemanticGroup],
    options: &CompareOptions,
) -> ComparisonResult {
    let base = flatten_groups(baseline);
    let curr = flatten_groups(current);
    let pairing = match_groups(&base, &curr, &options.fingerprint);

    let mut summary = ComparisonSummary {
        baseline_elements: base.len(),
        current_elements: curr.len(),
        ..ComparisonSummary::default()
    };
    let mut slots: Vec<Option<VisualDifference>> = vec![None; base.len()];

    for &(i, j, _) in &pairing.pairs {
        match diff_groups(i, base[i], j, curr[j], options) {
            Some(diff) => {
                match diff.difference_type {
                    DifferenceType::Moved => summary.moved += 1,
                    _ => summary.modified += 1,
                }
                slots[i] = Some(diff);
            }
            None => summary.unchanged += 1,
        }
    }
    for &i in &pairing.unmatched_baseline {
        summary.removed += 1;
        slots[i] = Some(unpaired(
            DifferenceType::Removed,
            Some(ElementRef::from_group(i, base[i])),
            None,
        ));
    }
    let mut differences: Vec<VisualDifference> = slots.into_iter().flatten().collect();
    for &j in &pairing.unmatched_current {
        summary.added += 1;
        differences.push(unpaired(
            DifferenceType::Added,
            None,
            Some(ElementRef::from_group(j, curr[j])),
        ));
    }

    let weighted = (summary.added + summary.removed + summary.modified) as f64
        + options.moved_weight * summary.moved as f64;
    let similarity = similarity_score(weighted, base.len().max(curr.len()));
    debug!(
        baseline = base.len(),
        current = curr.len(),
        differences = differences.len(),
        similarity,
        "compared semantic groups"
    );

    ComparisonResult {
        similarity,
        differences,
        summary,
    }
}

fn unpaired(
    difference_type: DifferenceType,
    baseline: Option<ElementRef>,
    current: Option<ElementRef>,
) -> VisualDifference {
    VisualDifference {
        difference_type,
        severity: DiffSeverity::Major,
        baseline,
        current,
        position_diff: 0.0,
        size_diff: 0.0,
        changes: Vec::new(),
    }
}

fn diff_groups(
    i: usize,
    a: &SemanticGroup,
    j: usize,
    b: &SemanticGroup,
    options: &CompareOptions,
) -> Option<VisualDifference> {
    let mut changes = Vec::new();
    let size_threshold = options.size_threshold();
    for (name, before, after, limit) in [
        ("x", a.bounds.x, b.bounds.x, options.threshold),
        ("y", a.bounds.y, b.bounds.y, options.threshold),
        ("width", a.bounds.width, b.bounds.width, size_threshold),
        ("height", a.bounds.height, b.bounds.height, size_threshold),
    ] {
        if (before - after).abs() > limit {
            changes.push(PropertyChange::new(name, before, after));
        }
    }
    let type_changed = a.group_type != b.group_type;
    if type_changed {
        changes.push(PropertyChange::new(
            "type",
            a.group_type.as_str(),
            b.group_type.as_str(),
        ));
    }
    if !options.ignore_text && !compare_text(&a.label, &b.label, &options.text_options()).identical {
        changes.push(PropertyChange::new("label", a.label.as_str(), b.label.as_str()));
    }
    if changes.is_empty() {
        return None;
    }

    let position_diff = a.bounds.position_delta(&b.bounds);
    let size_diff = a.bounds.size_delta(&b.bounds);
    let only_position = changes.iter().all(|c| c.property == "x" || c.property == "y");
    let shifted = a.bounds.axis_shift(&b.bounds) > options.moved_distance;
    let difference_type = if only_position && shifted {
        DifferenceType::Moved
    } else {
        DifferenceType::Modified
    };
    let severity = if difference_type == DifferenceType::Moved
        || type_changed
        || options.element_impact(position_diff, size_diff) >= options.moderate_impact
    {
        DiffSeverity::Moderate
    } else {
        DiffSeverity::Minor
    };

    Some(VisualDifference {
        difference_type,
        severity,
        baseline: Some(ElementRef::from_group(i, a)),
        current: Some(ElementRef::from_group(j, b)),
        position_diff,
        size_diff,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rect, SemanticType};
    use crate::viewport::Viewport;

    fn group(kind: SemanticType, rect: Rect, label: &str) -> SemanticGroup {
        let mut g = SemanticGroup::new("g", kind, rect);
        g.label = label.to_string();
        g
    }

    fn nav() -> SemanticGroup {
        group(SemanticType::Navigation, Rect::new(0.0, 0.0, 1280.0, 60.0), "Main menu")
    }

    fn section(height: f64) -> SemanticGroup {
        group(SemanticType::Section, Rect::new(0.0, 60.0, 1280.0, height), "Hero")
    }

    #[test]
    fn added_section_is_reported() {
        let result = compare_groups(&[nav()], &[nav(), section(500.0)], &CompareOptions::default());
        assert_eq!(result.summary.added, 1);
        assert_eq!(result.differences.len(), 1);
        assert_eq!(result.differences[0].difference_type, DifferenceType::Added);
        assert_eq!(
            result.differences[0].current.as_ref().map(|c| c.tag_name.as_str()),
            Some("section")
        );
        assert!((result.similarity - 50.0).abs() < 1e-9);
    }

    #[test]
    fn moved_groups_are_discounted() {
        let moved_nav = group(
            SemanticType::Navigation,
            Rect::new(0.0, 80.0, 1280.0, 60.0),
            "Main menu",
        );
        // 80px away still clears the fingerprint floor through size and aspect
        let result = compare_groups(
            &[nav(), section(500.0)],
            &[moved_nav, section(500.0)],
            &CompareOptions::default(),
        );
        assert_eq!(result.summary.moved, 1);
        assert!((result.similarity - 90.0).abs() < 1e-9, "got {}", result.similarity);
    }

    #[test]
    fn height_change_is_modified() {
        let result =
            compare_groups(&[section(500.0)], &[section(510.0)], &CompareOptions::default());
        assert_eq!(result.summary.modified, 1);
        let change = result.differences[0].change("height").unwrap();
        assert_eq!(change.before, 500.0);
        assert_eq!(change.after, 510.0);
    }

    #[test]
    fn builds_groups_when_snapshot_has_none() {
        let nav_node = crate::types::VisualNode::new("nav", Rect::new(0.0, 0.0, 1280.0, 60.0));
        let a = Snapshot::new("u", Viewport::default(), vec![nav_node.clone()]);
        let result = compare_semantic(&a, &a, &CompareOptions::default()).unwrap();
        assert_eq!(result.similarity, 100.0);
        assert_eq!(result.summary.unchanged, 1);

        let mut b = a.clone();
        b.semantic_groups = Some(vec![nav(), section(500.0)]);
        let result = compare_semantic(&a, &b, &CompareOptions::default()).unwrap();
        assert_eq!(result.summary.added, 1);
    }

    #[test]
    fn type_change_is_moderate() {
        let a = group(SemanticType::Section, Rect::new(0.0, 0.0, 400.0, 400.0), "Box");
        let b = group(SemanticType::Container, Rect::new(0.0, 0.0, 400.0, 400.0), "Box");
        let result = compare_groups(&[a], &[b], &CompareOptions::default());
        assert_eq!(result.summary.modified, 1);
        assert_eq!(result.differences[0].severity, DiffSeverity::Moderate);
        assert!(result.differences[0].change("type").is_some());
    }
}
