//! Output types: matches, comparison results, flakiness analyses,
//! calibrated settings and threshold evaluations.
//!
//! All of these are constructed fresh per call and never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::core::Rect;
use super::group::SemanticGroup;
use super::node::VisualNode;
use crate::error::LvrError;

// ============================================================================
// Matching
// ============================================================================

/// How a baseline element relates to a current element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Moved,
    Changed,
    Added,
    Removed,
}

/// Lightweight description of an element on one side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRef {
    /// Position in the flattened snapshot.
    pub index: usize,
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub rect: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementRef {
    pub fn from_node(index: usize, node: &VisualNode) -> Self {
        Self {
            index,
            tag_name: node.tag_name.clone(),
            class_name: node.class_name.clone(),
            id: node.id.clone(),
            rect: node.rect,
            text: node.trimmed_text().map(str::to_string),
        }
    }

    /// Describe a semantic group as an element: its type stands in for the
    /// tag and its label for the text.
    pub fn from_group(index: usize, group: &SemanticGroup) -> Self {
        Self {
            index,
            tag_name: group.group_type.as_str().to_string(),
            class_name: String::new(),
            id: Some(group.id.clone()),
            rect: group.bounds,
            text: Some(group.label.clone()).filter(|l| !l.is_empty()),
        }
    }

    /// `tag#id.class` style description for messages.
    pub fn describe(&self) -> String {
        let mut out = self.tag_name.to_ascii_lowercase();
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            out.push('#');
            out.push_str(id);
        }
        for class in self.class_name.split_whitespace() {
            out.push('.');
            out.push_str(class);
        }
        out
    }
}

/// A single property that differs between the two sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChange {
    pub property: String,
    pub before: Value,
    pub after: Value,
}

impl PropertyChange {
    pub fn new(property: impl Into<String>, before: impl Into<Value>, after: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            before: before.into(),
            after: after.into(),
        }
    }
}

/// One correspondence produced by the matching engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<ElementRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<ElementRef>,
    pub match_type: MatchType,
    /// Weighted similarity in `[0, 1]`; zero for added/removed.
    pub similarity: f64,
    pub position_diff: f64,
    pub size_diff: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<PropertyChange>,
}

// ============================================================================
// Comparison
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferenceType {
    Added,
    Removed,
    Modified,
    Moved,
}

impl fmt::Display for DifferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DifferenceType::Added => "added",
            DifferenceType::Removed => "removed",
            DifferenceType::Modified => "modified",
            DifferenceType::Moved => "moved",
        })
    }
}

/// Severity level of a difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffSeverity {
    Minor,
    Moderate,
    Major,
}

/// One reported difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualDifference {
    #[serde(rename = "type")]
    pub difference_type: DifferenceType,
    pub severity: DiffSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<ElementRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<ElementRef>,
    pub position_diff: f64,
    pub size_diff: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<PropertyChange>,
}

impl VisualDifference {
    /// The element the difference is about: current side when present.
    pub fn element(&self) -> Option<&ElementRef> {
        self.current.as_ref().or(self.baseline.as_ref())
    }

    pub fn change(&self, property: &str) -> Option<&PropertyChange> {
        self.changes.iter().find(|c| c.property == property)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub moved: usize,
    pub unchanged: usize,
    pub baseline_elements: usize,
    pub current_elements: usize,
}

impl ComparisonSummary {
    pub fn total_differences(&self) -> usize {
        self.added + self.removed + self.modified + self.moved
    }
}

/// Aggregate of one pairwise comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Overall similarity, 0-100.
    pub similarity: f64,
    #[serde(default)]
    pub differences: Vec<VisualDifference>,
    pub summary: ComparisonSummary,
}

impl ComparisonResult {
    pub fn is_identical(&self) -> bool {
        self.differences.is_empty()
    }
}

/// How text content is compared between matched elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextCompareMode {
    Exact,
    #[default]
    Normalized,
    Similarity,
}

impl FromStr for TextCompareMode {
    type Err = LvrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(TextCompareMode::Exact),
            "normalized" => Ok(TextCompareMode::Normalized),
            "similarity" => Ok(TextCompareMode::Similarity),
            _ => Err(LvrError::config(format!("Unknown text compare mode: {s}"))),
        }
    }
}

/// Outcome of comparing two text values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextComparison {
    pub identical: bool,
    /// Fuzzy similarity in `[0, 1]`.
    pub similarity: f64,
    pub mode: TextCompareMode,
}

// ============================================================================
// Flakiness
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlakinessType {
    Position,
    Size,
    Content,
    Existence,
    Style,
    Mixed,
}

impl fmt::Display for FlakinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlakinessType::Position => "position",
            FlakinessType::Size => "size",
            FlakinessType::Content => "content",
            FlakinessType::Existence => "existence",
            FlakinessType::Style => "style",
            FlakinessType::Mixed => "mixed",
        })
    }
}

/// One bucket of a value histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueCount {
    pub value: Value,
    pub count: usize,
    pub percentage: f64,
}

/// Observed values of one property across samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyVariation {
    pub property: String,
    pub values: Vec<ValueCount>,
    /// Population variance for numeric properties; for text-like
    /// properties the share of samples that differ from the modal value.
    pub variance: f64,
    /// Max minus min for numeric properties, zero otherwise.
    pub range: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlakyElement {
    /// Tag/class/role fingerprint; never a snapshot-local id.
    pub identifier: String,
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_name: String,
    pub flakiness_type: FlakinessType,
    /// Fraction of samples in which the element was observed.
    pub occurrence_rate: f64,
    pub variations: Vec<PropertyVariation>,
}

/// Aggregate instability across repeated samples of the same page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlakinessAnalysis {
    /// 0-100, higher means more unstable.
    pub overall_score: f64,
    pub total_samples: usize,
    pub total_elements: usize,
    pub stable_count: usize,
    pub unstable_count: usize,
    #[serde(default)]
    pub flaky_elements: Vec<FlakyElement>,
    #[serde(default)]
    pub by_type: BTreeMap<FlakinessType, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

// ============================================================================
// Calibration
// ============================================================================

/// Tolerances derived from observed flakiness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSettings {
    /// Pixels.
    pub position_tolerance: f64,
    /// Pixels.
    pub size_tolerance: f64,
    /// 0-100.
    pub text_similarity_threshold: f64,
    /// 0-100.
    pub similarity_threshold: f64,
    /// Space-separated class lists; each ignores elements carrying all of them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_classes: Vec<String>,
    /// Tag names whose instances are ignored.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationResult {
    pub settings: ComparisonSettings,
    pub analysis: FlakinessAnalysis,
    /// 0-100.
    pub confidence: f64,
    /// Similarity of every later sample to the first, under the calibrated settings.
    pub sample_similarities: Vec<f64>,
}

// ============================================================================
// Threshold evaluation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThresholdCategory {
    Similarity,
    Position,
    Size,
    ElementCount,
    Scrollable,
    ZIndex,
}

impl fmt::Display for ThresholdCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThresholdCategory::Similarity => "similarity",
            ThresholdCategory::Position => "position",
            ThresholdCategory::Size => "size",
            ThresholdCategory::ElementCount => "elementCount",
            ThresholdCategory::Scrollable => "scrollable",
            ThresholdCategory::ZIndex => "zIndex",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdViolation {
    pub category: ThresholdCategory,
    pub message: String,
    pub actual: f64,
    pub limit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdEvaluation {
    pub passed: bool,
    #[serde(default)]
    pub failures: Vec<ThresholdViolation>,
    #[serde(default)]
    pub warnings: Vec<ThresholdViolation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_ref_describes_compound_selector() {
        let node = VisualNode::new("DIV", Rect::new(0.0, 0.0, 10.0, 10.0))
            .with_id("hero")
            .with_class("banner  wide");
        let r = ElementRef::from_node(3, &node);
        assert_eq!(r.describe(), "div#hero.banner.wide");
        assert_eq!(r.index, 3);
    }

    #[test]
    fn difference_serializes_with_type_key() {
        let diff = VisualDifference {
            difference_type: DifferenceType::Modified,
            severity: DiffSeverity::Moderate,
            baseline: None,
            current: None,
            position_diff: 0.0,
            size_diff: 100.0,
            changes: vec![PropertyChange::new("height", 500.0, 600.0)],
        };
        let json = serde_json::to_value(&diff).unwrap();
        assert_eq!(json["type"], "modified");
        assert_eq!(json["severity"], "moderate");
        assert_eq!(json["changes"][0]["property"], "height");
        assert_eq!(json["changes"][0]["before"], 500.0);
    }

    #[test]
    fn severity_orders_minor_to_major() {
        assert!(DiffSeverity::Minor < DiffSeverity::Moderate);
        assert!(DiffSeverity::Moderate < DiffSeverity::Major);
    }

    #[test]
    fn flakiness_by_type_serializes_as_map() {
        let mut by_type = BTreeMap::new();
        by_type.insert(FlakinessType::Position, 2);
        let analysis = FlakinessAnalysis {
            overall_score: 10.0,
            total_samples: 3,
            total_elements: 20,
            stable_count: 18,
            unstable_count: 2,
            flaky_elements: vec![],
            by_type,
            recommendations: vec![],
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["byType"]["position"], 2);
        assert_eq!(json["overallScore"], 10.0);
    }

    #[test]
    fn text_compare_mode_parses() {
        assert_eq!(
            "Similarity".parse::<TextCompareMode>().unwrap(),
            TextCompareMode::Similarity
        );
        assert!("fuzzy".parse::<TextCompareMode>().is_err());
    }
}
