//! Element-level comparator.
//!
//! Flattens both snapshots, drops ignored subtrees, pairs the remaining
//! elements and reports every pair that differs beyond the configured
//! tolerances, plus every unpaired element as added or removed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::selectors::{compile_selectors, matches_any};
use crate::error::{LvrError, Result};
use crate::grouping::GroupBuilderConfig;
use crate::matching::fingerprint::FingerprintConfig;
use crate::matching::matcher::{pair_elements, Pairing};
use crate::matching::similarity::MatcherConfig;
use crate::matching::text::{compare_text, TextCompareOptions, TextNormalization};
use crate::types::{
    ComparisonResult, ComparisonSummary, DiffSeverity, DifferenceType, ElementRef, FlatElement,
    PropertyChange, Snapshot, TextCompareMode, VisualDifference, VisualNode,
};

/// How elements of the two snapshots are put into correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementIdentity {
    /// Fuzzy best-first matching on weighted similarity.
    #[default]
    Similarity,
    /// `tag-class-id-index` keys. Any insertion or removal shifts the index
    /// of every later element, so this is only reliable when the page has
    /// not changed structurally or has only been appended to.
    Generated,
}

impl fmt::Display for ElementIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementIdentity::Similarity => "similarity",
            ElementIdentity::Generated => "generated",
        })
    }
}

impl FromStr for ElementIdentity {
    type Err = LvrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "similarity" => Ok(ElementIdentity::Similarity),
            "generated" => Ok(ElementIdentity::Generated),
            _ => Err(LvrError::config(format!("Unknown element identity: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompareOptions {
    /// x/y deltas must exceed this many pixels to be reported.
    pub threshold: f64,
    /// width/height deltas must exceed this; falls back to `threshold`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_threshold: Option<f64>,
    pub ignore_text: bool,
    pub ignore_style: bool,
    pub text_compare_mode: TextCompareMode,
    pub text_normalization: TextNormalization,
    /// 0-100, used by the `similarity` text mode.
    pub text_similarity_threshold: f64,
    pub ignore_selectors: Vec<String>,
    pub identity: ElementIdentity,
    pub allow_viewport_mismatch: bool,
    /// A pair whose only changes are x/y is reported as moved rather than
    /// modified once its x or y offset alone exceeds this. The matcher uses
    /// the same per-axis rule.
    pub moved_distance: f64,
    /// Pixel delta that corresponds to an impact of 1.0 before capping.
    pub impact_scale: f64,
    /// Cap on the position and size impact of one modified element.
    pub max_element_impact: f64,
    /// Floor on the impact of any modified or moved element.
    pub min_element_impact: f64,
    /// Modified elements at or above this impact are moderate, below it minor.
    pub moderate_impact: f64,
    /// Weight of a moved group relative to other changes in the semantic variant.
    pub moved_weight: f64,
    #[serde(skip)]
    pub matcher: MatcherConfig,
    #[serde(skip)]
    pub fingerprint: FingerprintConfig,
    #[serde(skip)]
    pub grouping: GroupBuilderConfig,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            size_threshold: None,
            ignore_text: false,
            ignore_style: false,
            text_compare_mode: TextCompareMode::Normalized,
            text_normalization: TextNormalization::default(),
            text_similarity_threshold: 90.0,
            ignore_selectors: Vec::new(),
            identity: ElementIdentity::Similarity,
            allow_viewport_mismatch: false,
            moved_distance: 50.0,
            impact_scale: 200.0,
            max_element_impact: 0.3,
            min_element_impact: 0.05,
            moderate_impact: 0.1,
            moved_weight: 0.2,
            matcher: MatcherConfig::default(),
            fingerprint: FingerprintConfig::default(),
            grouping: GroupBuilderConfig::default(),
        }
    }
}

impl CompareOptions {
    pub fn text_options(&self) -> TextCompareOptions {
        TextCompareOptions {
            mode: self.text_compare_mode,
            normalization: self.text_normalization,
            similarity_threshold: self.text_similarity_threshold,
            weights: self.matcher.text_weights,
        }
    }

    pub fn size_threshold(&self) -> f64 {
        self.size_threshold.unwrap_or(self.threshold)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(LvrError::config("compare threshold must be a non-negative pixel value"));
        }
        if self.size_threshold.is_some_and(|t| !t.is_finite() || t < 0.0) {
            return Err(LvrError::config(
                "compare sizeThreshold must be a non-negative pixel value",
            ));
        }
        if !(0.0..=100.0).contains(&self.text_similarity_threshold) {
            return Err(LvrError::config("textSimilarityThreshold must be within 0-100"));
        }
        if self.impact_scale <= 0.0 {
            return Err(LvrError::config("impactScale must be positive"));
        }
        if self.moved_distance < 0.0 {
            return Err(LvrError::config("movedDistance must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.moved_weight) {
            return Err(LvrError::config("movedWeight must be within 0-1"));
        }
        compile_selectors(&self.ignore_selectors)?;
        self.matcher.validate()?;
        self.fingerprint.validate()
    }

    /// Impact of one modified or moved element.
    pub fn element_impact(&self, position_diff: f64, size_diff: f64) -> f64 {
        let position = (position_diff / self.impact_scale).min(self.max_element_impact);
        let size = (size_diff / self.impact_scale).min(self.max_element_impact);
        position.max(size).max(self.min_element_impact)
    }
}

/// `tag-class-id-index` key of a flattened element.
pub fn generated_key(element: &FlatElement<'_>) -> String {
    let node = element.node;
    format!(
        "{}-{}-{}-{}",
        node.tag(),
        node.classes().collect::<Vec<_>>().join("."),
        node.dom_id().unwrap_or(""),
        element.index
    )
}

fn pair_by_generated_key(baseline: &[FlatElement<'_>], current: &[FlatElement<'_>]) -> Pairing {
    let mut by_key: HashMap<String, usize> = current
        .iter()
        .enumerate()
        .map(|(j, e)| (generated_key(e), j))
        .collect();
    let mut consumed = vec![false; current.len()];
    let mut pairing = Pairing::default();

    for (i, element) in baseline.iter().enumerate() {
        match by_key.remove(&generated_key(element)) {
            Some(j) => {
                consumed[j] = true;
                pairing.pairs.push((i, j, 1.0));
            }
            None => pairing.unmatched_baseline.push(i),
        }
    }
    pairing.unmatched_current = (0..current.len()).filter(|&j| !consumed[j]).collect();
    pairing
}

/// Compare two snapshots element by element.
///
/// Fails on a viewport mismatch (unless allowed) and on malformed ignore
/// selectors. Differences are listed in baseline order, followed by added
/// elements in current order.
pub fn compare(
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
    let selectors = compile_selectors(&options.ignore_selectors)?;
    let keep = |node: &VisualNode| !matches_any(node, &selectors);
    let base = baseline.flatten_where(keep);
    let curr = current.flatten_where(keep);

    let pairing = match options.identity {
        ElementIdentity::Similarity => pair_elements(&base, &curr, &options.matcher),
        ElementIdentity::Generated => pair_by_generated_key(&base, &curr),
    };

    let mut summary = ComparisonSummary {
        baseline_elements: base.len(),
        current_elements: curr.len(),
        ..ComparisonSummary::default()
    };
    let mut slots: Vec<Option<VisualDifference>> = vec![None; base.len()];
    let mut impacts = Vec::with_capacity(base.len().max(curr.len()));

    for &(i, j, _) in &pairing.pairs {
        match diff_pair(&base[i], &curr[j], options) {
            Some(diff) => {
                impacts.push(options.element_impact(diff.position_diff, diff.size_diff));
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
        impacts.push(1.0);
        summary.removed += 1;
        slots[i] = Some(unpaired(DifferenceType::Removed, Some(&base[i]), None));
    }

    let mut differences: Vec<VisualDifference> = slots.into_iter().flatten().collect();
    for &j in &pairing.unmatched_current {
        impacts.push(1.0);
        summary.added += 1;
        differences.push(unpaired(DifferenceType::Added, None, Some(&curr[j])));
    }

    // summed in a fixed order so swapping the sides gives the same total
    impacts.sort_by(f64::total_cmp);
    let impact: f64 = impacts.iter().sum();
    let similarity = similarity_score(impact, base.len().max(curr.len()));
    debug!(
        baseline = base.len(),
        current = curr.len(),
        differences = differences.len(),
        similarity,
        identity = %options.identity,
        "compared snapshots"
    );

    Ok(ComparisonResult {
        similarity,
        differences,
        summary,
    })
}

/// `100 * max(0, 1 - impact / max_elements)`; two empty sides are identical.
pub fn similarity_score(impact: f64, max_elements: usize) -> f64 {
    if max_elements == 0 {
        return 100.0;
    }
    100.0 * (1.0 - impact / max_elements as f64).max(0.0)
}

fn unpaired(
    difference_type: DifferenceType,
    baseline: Option<&FlatElement<'_>>,
    current: Option<&FlatElement<'_>>,
) -> VisualDifference {
    VisualDifference {
        difference_type,
        severity: DiffSeverity::Major,
        baseline: baseline.map(|e| ElementRef::from_node(e.index, e.node)),
        current: current.map(|e| ElementRef::from_node(e.index, e.node)),
        position_diff: 0.0,
        size_diff: 0.0,
        changes: Vec::new(),
    }
}

fn diff_pair(
    baseline: &FlatElement<'_>,
    current: &FlatElement<'_>,
    options: &CompareOptions,
) -> Option<VisualDifference> {
    let (a, b) = (baseline.node, current.node);
    let changes = pair_changes(a, b, options);
    if changes.is_empty() {
        return None;
    }

    let position_diff = a.rect.position_delta(&b.rect);
    let size_diff = a.rect.size_delta(&b.rect);
    let only_position = changes.iter().all(|c| c.property == "x" || c.property == "y");
    let shifted = a.rect.axis_shift(&b.rect) > options.moved_distance;
    let difference_type = if only_position && shifted {
        DifferenceType::Moved
    } else {
        DifferenceType::Modified
    };
    let severity = match difference_type {
        DifferenceType::Moved => DiffSeverity::Moderate,
        _ if options.element_impact(position_diff, size_diff) >= options.moderate_impact => {
            DiffSeverity::Moderate
        }
        _ => DiffSeverity::Minor,
    };

    Some(VisualDifference {
        difference_type,
        severity,
        baseline: Some(ElementRef::from_node(baseline.index, a)),
        current: Some(ElementRef::from_node(current.index, b)),
        position_diff,
        size_diff,
        changes,
    })
}

fn pair_changes(a: &VisualNode, b: &VisualNode, options: &CompareOptions) -> Vec<PropertyChange> {
    let mut changes = Vec::new();
    let size_threshold = options.size_threshold();
    for (name, before, after, limit) in [
        ("x", a.rect.x, b.rect.x, options.threshold),
        ("y", a.rect.y, b.rect.y, options.threshold),
        ("width", a.rect.width, b.rect.width, size_threshold),
        ("height", a.rect.height, b.rect.height, size_threshold),
    ] {
        if (before - after).abs() > limit {
            changes.push(PropertyChange::new(name, before, after));
        }
    }

    if a.tag() != b.tag() {
        changes.push(PropertyChange::new("tagName", a.tag_name.as_str(), b.tag_name.as_str()));
    }
    if a.class_name.split_whitespace().ne(b.class_name.split_whitespace()) {
        changes.push(PropertyChange::new(
            "className",
            a.class_name.as_str(),
            b.class_name.as_str(),
        ));
    }

    if !options.ignore_text {
        let before = a.text.as_deref().unwrap_or("");
        let after = b.text.as_deref().unwrap_or("");
        if !compare_text(before, after, &options.text_options()).identical {
            changes.push(PropertyChange::new("text", a.text.as_deref(), b.text.as_deref()));
        }
    }

    if !options.ignore_style && (a.style.is_some() || b.style.is_some()) {
        let before = a.style.clone().unwrap_or_default().entries();
        let after = b.style.clone().unwrap_or_default().entries();
        for ((name, x), (_, y)) in before.into_iter().zip(after) {
            if x != y {
                changes.push(PropertyChange::new(format!("style.{name}"), x, y));
            }
        }
    }
    changes
}
