//! Per-pair scoring for the node-level matcher.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::text::{normalize_text, text_similarity, TextNormalization, TextSimilarityWeights};
use crate::classify::classify_type;
use crate::error::{LvrError, Result};
use crate::types::{MatchType, Rect, SemanticType, VisualNode};

/// Component weights of the node similarity score.
///
/// Weights of components that are absent on both sides are dropped and the
/// rest renormalized, so the score stays in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeWeights {
    pub tag: f64,
    pub semantic_type: f64,
    pub class_name: f64,
    pub text: f64,
    pub geometry: f64,
    pub accessibility: f64,
}

impl Default for NodeWeights {
    fn default() -> Self {
        Self {
            tag: 0.30,
            semantic_type: 0.20,
            class_name: 0.15,
            text: 0.15,
            geometry: 0.20,
            accessibility: 0.10,
        }
    }
}

impl NodeWeights {
    fn as_array(&self) -> [f64; 6] {
        [
            self.tag,
            self.semantic_type,
            self.class_name,
            self.text,
            self.geometry,
            self.accessibility,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatcherConfig {
    pub weights: NodeWeights,
    pub text_weights: TextSimilarityWeights,
    /// Pairs scoring below this are never matched.
    pub acceptance_floor: f64,
    /// Minimum similarity for an `exact` match.
    pub exact_similarity: f64,
    /// Every rect delta must be strictly below this for an `exact` match.
    pub exact_pixel_tolerance: f64,
    /// An x or y delta above this (with enough similarity) makes a `moved` match.
    pub moved_distance: f64,
    /// Similarity strictly above this is required for a `moved` match.
    pub moved_similarity: f64,
    /// Euclidean distance at which the position score reaches zero.
    pub position_scale: f64,
    /// Sum of width and height deltas at which the size score reaches zero.
    pub size_scale: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            weights: NodeWeights::default(),
            text_weights: TextSimilarityWeights::default(),
            acceptance_floor: 0.3,
            exact_similarity: 0.999,
            exact_pixel_tolerance: 1.0,
            moved_distance: 50.0,
            moved_similarity: 0.6,
            position_scale: 100.0,
            size_scale: 50.0,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        let weights = self.weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(LvrError::config("matcher weights must be non-negative"));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(LvrError::config("matcher weights must not all be zero"));
        }
        let text = [
            self.text_weights.levenshtein,
            self.text_weights.jaro_winkler,
            self.text_weights.dice,
            self.text_weights.jaccard,
        ];
        if text.iter().any(|w| !w.is_finite() || *w < 0.0) || self.text_weights.total() <= 0.0 {
            return Err(LvrError::config(
                "text similarity weights must be non-negative and not all zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.acceptance_floor) {
            return Err(LvrError::config("matcher acceptanceFloor must be within 0-1"));
        }
        if self.position_scale <= 0.0 || self.size_scale <= 0.0 {
            return Err(LvrError::config("matcher scales must be positive"));
        }
        if self.moved_distance < 0.0 || self.exact_pixel_tolerance < 0.0 {
            return Err(LvrError::config("matcher pixel distances must be non-negative"));
        }
        Ok(())
    }
}

/// Precomputed, comparison-ready view of one node.
#[derive(Debug, Clone)]
pub struct NodeFeatures<'a> {
    pub node: &'a VisualNode,
    pub tag: String,
    pub semantic_type: SemanticType,
    pub classes: HashSet<String>,
    pub text: Option<String>,
}

impl<'a> NodeFeatures<'a> {
    pub fn new(node: &'a VisualNode) -> Self {
        Self {
            node,
            tag: node.tag(),
            semantic_type: classify_type(node),
            classes: node.classes().map(str::to_string).collect(),
            text: node
                .trimmed_text()
                .map(|t| normalize_text(t, &TextNormalization::default())),
        }
    }
}

/// Position and size agreement, averaged, in `[0, 1]`.
pub fn geometry_similarity(a: &Rect, b: &Rect, config: &MatcherConfig) -> f64 {
    let position = (1.0 - a.position_delta(b) / config.position_scale).max(0.0);
    let size_delta = (a.width - b.width).abs() + (a.height - b.height).abs();
    let size = (1.0 - size_delta / config.size_scale).max(0.0);
    (position + size) / 2.0
}

/// Share of accessibility fields that agree, or `None` when neither side has any.
pub fn accessibility_similarity(a: &VisualNode, b: &VisualNode) -> Option<f64> {
    if !a.has_accessibility_info() && !b.has_accessibility_info() {
        return None;
    }
    let mut fields = 0usize;
    let mut equal = 0usize;
    let mut check = |x: Option<&str>, y: Option<&str>| {
        if x.is_some() || y.is_some() {
            fields += 1;
            if x == y {
                equal += 1;
            }
        }
    };
    check(a.role_lower().as_deref(), b.role_lower().as_deref());
    check(a.aria_label.as_deref(), b.aria_label.as_deref());
    let keys: HashSet<&String> = a.aria_attributes.keys().chain(b.aria_attributes.keys()).collect();
    for key in keys {
        check(
            a.aria_attributes.get(key).map(String::as_str),
            b.aria_attributes.get(key).map(String::as_str),
        );
    }
    if fields == 0 {
        return Some(1.0);
    }
    Some(equal as f64 / fields as f64)
}

/// Weighted similarity of two nodes, in `[0, 1]`.
pub fn node_similarity(a: &NodeFeatures<'_>, b: &NodeFeatures<'_>, config: &MatcherConfig) -> f64 {
    let w = &config.weights;
    let mut score = 0.0;
    let mut weight = 0.0;
    let mut add = |component_weight: f64, value: f64| {
        score += component_weight * value;
        weight += component_weight;
    };

    add(w.tag, f64::from(u8::from(a.tag == b.tag)));
    add(w.semantic_type, f64::from(u8::from(a.semantic_type == b.semantic_type)));
    if !a.classes.is_empty() || !b.classes.is_empty() {
        add(w.class_name, super::text::jaccard(&a.classes, &b.classes));
    }
    match (&a.text, &b.text) {
        (None, None) => {}
        (Some(x), Some(y)) => add(w.text, text_similarity(x, y, &config.text_weights)),
        _ => add(w.text, 0.0),
    }
    add(w.geometry, geometry_similarity(&a.node.rect, &b.node.rect, config));
    if let Some(value) = accessibility_similarity(a.node, b.node) {
        add(w.accessibility, value);
    }

    if weight <= 0.0 {
        return 0.0;
    }
    (score / weight).clamp(0.0, 1.0)
}

/// Classify an accepted pair as exact, moved or changed.
pub fn classify_match(a: &Rect, b: &Rect, similarity: f64, config: &MatcherConfig) -> MatchType {
    let dx = (a.x - b.x).abs();
    let dy = (a.y - b.y).abs();
    let dw = (a.width - b.width).abs();
    let dh = (a.height - b.height).abs();
    let tol = config.exact_pixel_tolerance;

    if similarity >= config.exact_similarity && dx < tol && dy < tol && dw < tol && dh < tol {
        MatchType::Exact
    } else if a.axis_shift(b) > config.moved_distance && similarity > config.moved_similarity {
        MatchType::Moved
    } else {
        MatchType::Changed
    }
}
