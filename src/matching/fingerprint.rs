//! Group-level matching on geometric fingerprints.
//!
//! Groups carry no stable identity across snapshots, so they are matched on
//! where they are, how big they are and their shape. Candidates of a
//! different semantic type stay eligible but are penalized.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::matcher::{greedy_pairs_with_preference, Pairing};
use crate::error::{LvrError, Result};
use crate::types::{Rect, SemanticGroup};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FingerprintConfig {
    pub position_weight: f64,
    pub size_weight: f64,
    pub aspect_ratio_weight: f64,
    /// Multiplier applied to the score of a cross-type candidate.
    pub type_mismatch_penalty: f64,
    pub acceptance_floor: f64,
    pub position_scale: f64,
    pub size_scale: f64,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            position_weight: 0.4,
            size_weight: 0.4,
            aspect_ratio_weight: 0.2,
            type_mismatch_penalty: 0.5,
            acceptance_floor: 0.3,
            position_scale: 100.0,
            size_scale: 50.0,
        }
    }
}

impl FingerprintConfig {
    pub fn validate(&self) -> Result<()> {
        let weights = [self.position_weight, self.size_weight, self.aspect_ratio_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(LvrError::config(
                "fingerprint weights must be non-negative and not all zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.type_mismatch_penalty) {
            return Err(LvrError::config("typeMismatchPenalty must be within 0-1"));
        }
        if !(0.0..=1.0).contains(&self.acceptance_floor) {
            return Err(LvrError::config("fingerprint acceptanceFloor must be within 0-1"));
        }
        if self.position_scale <= 0.0 || self.size_scale <= 0.0 {
            return Err(LvrError::config("fingerprint scales must be positive"));
        }
        Ok(())
    }
}

/// `min / max` of the two aspect ratios; degenerate rects only match each other.
pub fn aspect_ratio_similarity(a: &Rect, b: &Rect) -> f64 {
    match (a.aspect_ratio(), b.aspect_ratio()) {
        (Some(x), Some(y)) => {
            let (lo, hi) = if x < y { (x, y) } else { (y, x) };
            if hi <= 0.0 {
                1.0
            } else {
                lo / hi
            }
        }
        (None, None) => 1.0,
        _ => 0.0,
    }
}

/// Geometric score of two rects, ignoring type.
pub fn geometric_score(a: &Rect, b: &Rect, config: &FingerprintConfig) -> f64 {
    let position = (1.0 - a.position_delta(b) / config.position_scale).max(0.0);
    let size_delta = (a.width - b.width).abs() + (a.height - b.height).abs();
    let size = (1.0 - size_delta / config.size_scale).max(0.0);
    let aspect = aspect_ratio_similarity(a, b);

    let total = config.position_weight + config.size_weight + config.aspect_ratio_weight;
    if total <= 0.0 {
        return 0.0;
    }
    (config.position_weight * position + config.size_weight * size + config.aspect_ratio_weight * aspect)
        / total
}

/// Fingerprint similarity of two groups, type penalty included.
pub fn fingerprint_similarity(a: &SemanticGroup, b: &SemanticGroup, config: &FingerprintConfig) -> f64 {
    let geometric = geometric_score(&a.bounds, &b.bounds, config);
    if a.group_type == b.group_type {
        geometric
    } else {
        geometric * config.type_mismatch_penalty
    }
}

/// Greedy best-first pairing of two group lists.
///
/// On equal scores a same-type candidate beats a cross-type one.
pub fn match_groups(
    baseline: &[&SemanticGroup],
    current: &[&SemanticGroup],
    config: &FingerprintConfig,
) -> Pairing {
    let pairing = greedy_pairs_with_preference(
        baseline.len(),
        current.len(),
        config.acceptance_floor,
        |i, j| {
            let (b, c) = (baseline[i], current[j]);
            (fingerprint_similarity(b, c, config), u8::from(b.group_type == c.group_type))
        },
    );
    debug!(
        baseline = baseline.len(),
        current = current.len(),
        matched = pairing.pairs.len(),
        "paired groups"
    );
    pairing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SemanticType;

    fn group(kind: SemanticType, rect: Rect) -> SemanticGroup {
        SemanticGroup::new("g", kind, rect)
    }

    #[test]
    fn identical_groups_score_one() {
        let g = group(SemanticType::Section, Rect::new(0.0, 60.0, 1280.0, 500.0));
        assert!((fingerprint_similarity(&g, &g, &FingerprintConfig::default()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn type_mismatch_halves_the_score() {
        let config = FingerprintConfig::default();
        let a = group(SemanticType::Section, Rect::new(0.0, 0.0, 100.0, 100.0));
        let b = group(SemanticType::Container, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!((fingerprint_similarity(&a, &b, &config) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn aspect_ratio_is_min_over_max() {
        let wide = Rect::new(0.0, 0.0, 200.0, 100.0);
        let square = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!((aspect_ratio_similarity(&wide, &square) - 0.5).abs() < 1e-9);
        let flat = Rect::new(0.0, 0.0, 100.0, 0.0);
        assert_eq!(aspect_ratio_similarity(&flat, &square), 0.0);
        assert_eq!(aspect_ratio_similarity(&flat, &flat), 1.0);
    }

    #[test]
    fn same_type_wins_at_same_position() {
        let rect = Rect::new(0.0, 0.0, 300.0, 200.0);
        let baseline = group(SemanticType::Navigation, rect);
        let cross = group(SemanticType::Section, rect);
        let nudged = group(SemanticType::Navigation, Rect::new(0.0, 30.0, 300.0, 200.0));
        let pairing = match_groups(&[&baseline], &[&cross, &nudged], &FingerprintConfig::default());
        // nudged scores 0.88, cross 0.5
        assert_eq!(pairing.pairs[0].1, 1);
    }

    #[test]
    fn cross_type_wins_when_same_type_is_far_off() {
        let rect = Rect::new(0.0, 0.0, 300.0, 200.0);
        let baseline = group(SemanticType::Navigation, rect);
        let cross = group(SemanticType::Section, rect);
        let far = group(SemanticType::Navigation, Rect::new(0.0, 90.0, 300.0, 230.0));
        let pairing = match_groups(&[&baseline], &[&far, &cross], &FingerprintConfig::default());
        assert_eq!(pairing.pairs[0].1, 1);
    }

    #[test]
    fn equal_scores_prefer_same_type() {
        let config = FingerprintConfig {
            type_mismatch_penalty: 1.0,
            ..FingerprintConfig::default()
        };
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let baseline = group(SemanticType::List, rect);
        let cross = group(SemanticType::Table, rect);
        let same = group(SemanticType::List, rect);
        let pairing = match_groups(&[&baseline], &[&cross, &same], &config);
        assert_eq!(pairing.pairs[0].1, 1);
    }

    #[test]
    fn exact_fit_is_claimed_before_a_nearer_miss() {
        // baseline 0 scores 0.92 against current 1, which fits baseline 1 exactly
        let hero = |y| group(SemanticType::Section, Rect::new(0.0, y, 1280.0, 400.0));
        let baseline = [hero(0.0), hero(20.0)];
        let current = [hero(60.0), hero(20.0)];
        let pairing = match_groups(
            &[&baseline[0], &baseline[1]],
            &[&current[0], &current[1]],
            &FingerprintConfig::default(),
        );
        assert_eq!(pairing.pairs.len(), 2);
        assert_eq!((pairing.pairs[0].0, pairing.pairs[0].1), (0, 0));
        assert_eq!((pairing.pairs[1].0, pairing.pairs[1].1), (1, 1));
    }
}
