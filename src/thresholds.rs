//! Threshold Evaluator: a declarative pass/fail policy over one comparison.
//!
//! Every configured category is checked independently. Strict categories
//! produce failures, which block `passed`; lenient ones only warn.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LvrError, Result};
use crate::types::{
    DifferenceType, Snapshot, ThresholdCategory, ThresholdEvaluation, ThresholdViolation,
    VisualDifference,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThresholdConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<SimilarityThreshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionThreshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeThreshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_count: Option<ElementCountThreshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrollable: Option<ScrollableThreshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<ZIndexThreshold>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityThreshold {
    /// 0-100.
    pub min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionThreshold {
    /// Largest allowed displacement of one element, in pixels.
    pub max_shift: f64,
    #[serde(default = "default_strict")]
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeThreshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pixels: Option<f64>,
    /// 0-100, relative to the baseline dimension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_percent: Option<f64>,
    #[serde(default = "default_strict")]
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementCountThreshold {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_added: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_removed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_modified: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollableThreshold {
    /// Most scrollable elements (overflow scroll/auto) allowed in any one snapshot.
    pub max_elements: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZIndexThreshold {
    pub allow_changes: bool,
}

fn default_strict() -> bool {
    true
}

impl ThresholdConfig {
    pub fn is_empty(&self) -> bool {
        self == &ThresholdConfig::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(s) = &self.similarity {
            if !(0.0..=100.0).contains(&s.min) {
                return Err(LvrError::config("thresholds.similarity.min must be within 0-100"));
            }
        }
        if let Some(p) = &self.position {
            if !p.max_shift.is_finite() || p.max_shift < 0.0 {
                return Err(LvrError::config(
                    "thresholds.position.maxShift must be a non-negative pixel value",
                ));
            }
        }
        if let Some(s) = &self.size {
            if s.max_pixels.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(LvrError::config(
                    "thresholds.size.maxPixels must be a non-negative pixel value",
                ));
            }
            if s.max_percent.is_some_and(|v| !(0.0..=100.0).contains(&v)) {
                return Err(LvrError::config("thresholds.size.maxPercent must be within 0-100"));
            }
        }
        Ok(())
    }
}

/// Evaluate one comparison against the policy.
///
/// `snapshots` feed the scrollable-element check; it is skipped without them.
pub fn evaluate(
    config: &ThresholdConfig,
    differences: &[VisualDifference],
    similarity: f64,
    snapshots: Option<&[Snapshot]>,
) -> ThresholdEvaluation {
    let mut failures = Vec::new();
    let mut warnings = Vec::new();

    if let Some(threshold) = &config.similarity {
        if similarity < threshold.min {
            failures.push(ThresholdViolation {
                category: ThresholdCategory::Similarity,
                message: format!(
                    "Similarity {:.1}% is below the minimum of {:.1}%",
                    similarity, threshold.min
                ),
                actual: similarity,
                limit: threshold.min,
            });
        }
    }

    if let Some(threshold) = &config.position {
        let shifted: Vec<f64> = differences
            .iter()
            .filter(|d| is_paired(d) && d.position_diff > threshold.max_shift)
            .map(|d| d.position_diff)
            .collect();
        if let Some(worst) = shifted.iter().copied().reduce(f64::max) {
            let violation = ThresholdViolation {
                category: ThresholdCategory::Position,
                message: format!(
                    "{} element(s) shifted by more than {}px (largest {:.1}px)",
                    shifted.len(),
                    threshold.max_shift,
                    worst
                ),
                actual: worst,
                limit: threshold.max_shift,
            };
            push(&mut failures, &mut warnings, threshold.strict, violation);
        }
    }

    if let Some(threshold) = &config.size {
        check_size(threshold, differences, &mut failures, &mut warnings);
    }

    if let Some(threshold) = &config.element_count {
        let count = |kind: DifferenceType| {
            differences
                .iter()
                .filter(|d| d.difference_type == kind)
                .count()
        };
        for (kind, limit) in [
            (DifferenceType::Added, threshold.max_added),
            (DifferenceType::Removed, threshold.max_removed),
            (DifferenceType::Modified, threshold.max_modified),
        ] {
            let Some(limit) = limit else { continue };
            let actual = count(kind);
            if actual > limit {
                failures.push(ThresholdViolation {
                    category: ThresholdCategory::ElementCount,
                    message: format!("{actual} {kind} element(s) exceed the limit of {limit}"),
                    actual: actual as f64,
                    limit: limit as f64,
                });
            }
        }
    }

    if let (Some(threshold), Some(snapshots)) = (&config.scrollable, snapshots) {
        let worst = snapshots
            .iter()
            .map(|s| {
                s.flatten()
                    .iter()
                    .filter(|e| e.node.style.as_ref().is_some_and(|st| st.is_scrollable()))
                    .count()
            })
            .max()
            .unwrap_or(0);
        if worst > threshold.max_elements {
            failures.push(ThresholdViolation {
                category: ThresholdCategory::Scrollable,
                message: format!(
                    "{worst} scrollable element(s) exceed the limit of {}",
                    threshold.max_elements
                ),
                actual: worst as f64,
                limit: threshold.max_elements as f64,
            });
        }
    }

    if let Some(threshold) = &config.z_index {
        if !threshold.allow_changes {
            let changed = differences
                .iter()
                .filter(|d| d.change("style.zIndex").is_some())
                .count();
            if changed > 0 {
                failures.push(ThresholdViolation {
                    category: ThresholdCategory::ZIndex,
                    message: format!("{changed} element(s) changed z-index"),
                    actual: changed as f64,
                    limit: 0.0,
                });
            }
        }
    }

    debug!(
        failures = failures.len(),
        warnings = warnings.len(),
        "evaluated thresholds"
    );
    ThresholdEvaluation {
        passed: failures.is_empty(),
        failures,
        warnings,
    }
}

fn is_paired(diff: &VisualDifference) -> bool {
    matches!(
        diff.difference_type,
        DifferenceType::Modified | DifferenceType::Moved
    )
}

fn push(
    failures: &mut Vec<ThresholdViolation>,
    warnings: &mut Vec<ThresholdViolation>,
    strict: bool,
    violation: ThresholdViolation,
) {
    if strict {
        failures.push(violation);
    } else {
        warnings.push(violation);
    }
}

fn check_size(
    threshold: &SizeThreshold,
    differences: &[VisualDifference],
    failures: &mut Vec<ThresholdViolation>,
    warnings: &mut Vec<ThresholdViolation>,
) {
    let mut worst_pixels = 0.0f64;
    let mut worst_percent = 0.0f64;
    for diff in differences.iter().filter(|d| is_paired(d)) {
        let (Some(before), Some(after)) = (&diff.baseline, &diff.current) else {
            continue;
        };
        let dw = (before.rect.width - after.rect.width).abs();
        let dh = (before.rect.height - after.rect.height).abs();
        worst_pixels = worst_pixels.max(dw).max(dh);
        worst_percent = worst_percent
            .max(percent(dw, before.rect.width))
            .max(percent(dh, before.rect.height));
    }

    if let Some(limit) = threshold.max_pixels {
        if worst_pixels > limit {
            push(
                failures,
                warnings,
                threshold.strict,
                ThresholdViolation {
                    category: ThresholdCategory::Size,
                    message: format!("Size changed by {worst_pixels:.1}px, limit is {limit}px"),
                    actual: worst_pixels,
                    limit,
                },
            );
        }
    }
    if let Some(limit) = threshold.max_percent {
        if worst_percent > limit {
            push(
                failures,
                warnings,
                threshold.strict,
                ThresholdViolation {
                    category: ThresholdCategory::Size,
                    message: format!("Size changed by {worst_percent:.1}%, limit is {limit}%"),
                    actual: worst_percent,
                    limit,
                },
            );
        }
    }
}

/// Relative change against `base`; growing from nothing counts as 100%.
fn percent(delta: f64, base: f64) -> f64 {
    if base <= 0.0 {
        if delta > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        100.0 * delta / base
    }
}
