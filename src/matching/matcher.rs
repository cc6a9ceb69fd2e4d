//! Greedy best-first correspondence between two element collections.
//!
//! Every baseline/current pair is scored, pairs below the acceptance floor
//! are dropped, and the rest are accepted from the highest score down while
//! both ends are still free. This is not an optimal assignment: a high-scoring
//! pair can block two pairs whose combined score is larger.
//!
//! Equal scores are ordered by the pair's lower index, then its higher index,
//! then its baseline index. That key is the same for `(i, j)` and `(j, i)`,
//! so swapping the two collections mirrors the pairing exactly.

use std::cmp::Ordering;

use tracing::{debug, trace};

use super::similarity::{classify_match, node_similarity, MatcherConfig, NodeFeatures};
use crate::types::{ElementRef, FlatElement, MatchType, NodeMatch, PropertyChange, VisualNode};

/// Positions of paired and unpaired items within the two input slices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pairing {
    /// `(baseline position, current position, similarity)`, in baseline order.
    pub pairs: Vec<(usize, usize, f64)>,
    pub unmatched_baseline: Vec<usize>,
    pub unmatched_current: Vec<usize>,
}

/// Greedy pairing over an arbitrary score.
///
/// `score(i, j)` rates baseline item `i` against current item `j`. The
/// pairing is swap-symmetric whenever `score` is.
pub fn greedy_pairs<F>(baseline_len: usize, current_len: usize, floor: f64, mut score: F) -> Pairing
where
    F: FnMut(usize, usize) -> f64,
{
    greedy_pairs_with_preference(baseline_len, current_len, floor, |i, j| (score(i, j), 0))
}

/// Greedy pairing where `score(i, j)` also returns a preference rank.
///
/// On equal scores the higher preference is accepted first; the index key
/// only decides between pairs that tie on both.
pub fn greedy_pairs_with_preference<F>(
    baseline_len: usize,
    current_len: usize,
    floor: f64,
    mut score: F,
) -> Pairing
where
    F: FnMut(usize, usize) -> (f64, u8),
{
    let mut candidates = Vec::new();
    for i in 0..baseline_len {
        for j in 0..current_len {
            let (s, preference) = score(i, j);
            if s >= floor {
                candidates.push(Candidate { i, j, score: s, preference });
            }
        }
    }
    candidates.sort_by(Candidate::rank);

    let mut baseline_taken = vec![false; baseline_len];
    let mut current_taken = vec![false; current_len];
    let mut pairing = Pairing::default();
    for c in candidates {
        if baseline_taken[c.i] || current_taken[c.j] {
            continue;
        }
        baseline_taken[c.i] = true;
        current_taken[c.j] = true;
        pairing.pairs.push((c.i, c.j, c.score));
    }
    pairing.pairs.sort_by_key(|&(i, _, _)| i);

    pairing.unmatched_baseline = free_positions(&baseline_taken);
    pairing.unmatched_current = free_positions(&current_taken);
    pairing
}

struct Candidate {
    i: usize,
    j: usize,
    score: f64,
    preference: u8,
}

impl Candidate {
    fn rank(a: &Self, b: &Self) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.preference.cmp(&a.preference))
            .then_with(|| a.index_key().cmp(&b.index_key()))
    }

    fn index_key(&self) -> (usize, usize, usize) {
        (self.i.min(self.j), self.i.max(self.j), self.i)
    }
}

fn free_positions(taken: &[bool]) -> Vec<usize> {
    taken
        .iter()
        .enumerate()
        .filter(|(_, taken)| !**taken)
        .map(|(k, _)| k)
        .collect()
}

/// Pair flattened elements using the weighted node similarity.
pub fn pair_elements(
    baseline: &[FlatElement<'_>],
    current: &[FlatElement<'_>],
    config: &MatcherConfig,
) -> Pairing {
    let base: Vec<NodeFeatures<'_>> = baseline.iter().map(|e| NodeFeatures::new(e.node)).collect();
    let curr: Vec<NodeFeatures<'_>> = current.iter().map(|e| NodeFeatures::new(e.node)).collect();

    let pairing = greedy_pairs(base.len(), curr.len(), config.acceptance_floor, |i, j| {
        let s = node_similarity(&base[i], &curr[j], config);
        trace!(baseline = baseline[i].index, current = current[j].index, score = s, "scored pair");
        s
    });

    debug!(
        baseline = baseline.len(),
        current = current.len(),
        matched = pairing.pairs.len(),
        "paired elements"
    );
    pairing
}

/// Match two element collections, covering every element exactly once.
///
/// Matched pairs come first in baseline order, followed by `removed`
/// baseline elements and then `added` current elements.
pub fn match_elements(
    baseline: &[FlatElement<'_>],
    current: &[FlatElement<'_>],
    config: &MatcherConfig,
) -> Vec<NodeMatch> {
    let pairing = pair_elements(baseline, current, config);
    let mut matches = Vec::with_capacity(baseline.len().max(current.len()));

    for &(i, j, similarity) in &pairing.pairs {
        let (b, c) = (baseline[i].node, current[j].node);
        matches.push(NodeMatch {
            baseline: Some(ElementRef::from_node(baseline[i].index, b)),
            current: Some(ElementRef::from_node(current[j].index, c)),
            match_type: classify_match(&b.rect, &c.rect, similarity, config),
            similarity,
            position_diff: b.rect.position_delta(&c.rect),
            size_diff: b.rect.size_delta(&c.rect),
            changes: node_changes(b, c, config.exact_pixel_tolerance),
        });
    }
    for &i in &pairing.unmatched_baseline {
        matches.push(unpaired(MatchType::Removed, Some(&baseline[i]), None));
    }
    for &j in &pairing.unmatched_current {
        matches.push(unpaired(MatchType::Added, None, Some(&current[j])));
    }
    matches
}

fn unpaired(
    match_type: MatchType,
    baseline: Option<&FlatElement<'_>>,
    current: Option<&FlatElement<'_>>,
) -> NodeMatch {
    NodeMatch {
        baseline: baseline.map(|e| ElementRef::from_node(e.index, e.node)),
        current: current.map(|e| ElementRef::from_node(e.index, e.node)),
        match_type,
        similarity: 0.0,
        position_diff: 0.0,
        size_diff: 0.0,
        changes: Vec::new(),
    }
}

/// Geometry deltas at or above `pixel_tolerance`, plus any identity or
/// content property that differs.
pub fn node_changes(a: &VisualNode, b: &VisualNode, pixel_tolerance: f64) -> Vec<PropertyChange> {
    let mut changes = Vec::new();
    for (name, before, after) in [
        ("x", a.rect.x, b.rect.x),
        ("y", a.rect.y, b.rect.y),
        ("width", a.rect.width, b.rect.width),
        ("height", a.rect.height, b.rect.height),
    ] {
        if (before - after).abs() >= pixel_tolerance {
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
    for (name, before, after) in [
        ("text", a.trimmed_text(), b.trimmed_text()),
        ("role", a.role.as_deref(), b.role.as_deref()),
        ("ariaLabel", a.aria_label.as_deref(), b.aria_label.as_deref()),
    ] {
        if before != after {
            changes.push(PropertyChange::new(name, before, after));
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rect, Snapshot};
    use crate::viewport::Viewport;

    fn snapshot(elements: Vec<VisualNode>) -> Snapshot {
        Snapshot::new("https://example.com", Viewport::default(), elements)
    }

    fn card(x: f64, y: f64, text: &str) -> VisualNode {
        VisualNode::new("div", Rect::new(x, y, 200.0, 100.0))
            .with_class("card")
            .with_text(text)
    }

    #[test]
    fn every_element_is_covered_once() {
        let a = snapshot(vec![card(0.0, 0.0, "one"), card(0.0, 120.0, "two")]);
        let b = snapshot(vec![
            card(0.0, 0.0, "one"),
            VisualNode::new("img", Rect::new(600.0, 600.0, 10.0, 10.0)),
        ]);
        let matches = match_elements(&a.flatten(), &b.flatten(), &MatcherConfig::default());
        let exact = matches.iter().filter(|m| m.match_type == MatchType::Exact).count();
        assert_eq!(exact, 1);
        assert_eq!(matches.len(), 3);
        assert!(matches.iter().any(|m| m.match_type == MatchType::Removed));
        assert!(matches.iter().any(|m| m.match_type == MatchType::Added));
    }

    #[test]
    fn first_baseline_element_wins_ties() {
        let a = snapshot(vec![card(0.0, 0.0, "same"), card(0.0, 0.0, "same")]);
        let b = snapshot(vec![card(0.0, 0.0, "same")]);
        let pairing = pair_elements(&a.flatten(), &b.flatten(), &MatcherConfig::default());
        assert_eq!(pairing.pairs.len(), 1);
        assert_eq!(pairing.pairs[0].0, 0);
        assert_eq!(pairing.unmatched_baseline, vec![1]);
    }

    #[test]
    fn equal_candidates_resolve_to_the_first() {
        let pairing = greedy_pairs(1, 3, 0.3, |_, _| 0.8);
        assert_eq!(pairing.pairs, vec![(0, 0, 0.8)]);
        assert_eq!(pairing.unmatched_current, vec![1, 2]);
    }

    #[test]
    fn below_floor_becomes_add_and_remove() {
        let pairing = greedy_pairs(2, 2, 0.3, |_, _| 0.29);
        assert!(pairing.pairs.is_empty());
        assert_eq!(pairing.unmatched_baseline, vec![0, 1]);
        assert_eq!(pairing.unmatched_current, vec![0, 1]);
    }

    #[test]
    fn highest_score_is_claimed_first() {
        // baseline 1 needs current 0 more than baseline 0 does
        let scores = [[0.8, 0.5], [0.95, 0.1]];
        let pairing = greedy_pairs(2, 2, 0.3, |i, j| scores[i][j]);
        assert_eq!(pairing.pairs, vec![(0, 1, 0.5), (1, 0, 0.95)]);
        assert!(pairing.unmatched_baseline.is_empty());
    }

    #[test]
    fn greedy_is_not_optimal() {
        // 0.85 + 0.85 beats 0.9, but the 0.9 pair is taken first
        let scores = [[0.9, 0.85], [0.85, 0.1]];
        let pairing = greedy_pairs(2, 2, 0.3, |i, j| scores[i][j]);
        assert_eq!(pairing.pairs, vec![(0, 0, 0.9)]);
        assert_eq!(pairing.unmatched_baseline, vec![1]);
        assert_eq!(pairing.unmatched_current, vec![1]);
    }

    #[test]
    fn swapping_sides_mirrors_the_pairing() {
        let scores = [
            [0.7, 0.7, 0.4, 0.9],
            [0.7, 0.7, 0.9, 0.2],
            [0.5, 0.9, 0.9, 0.6],
        ];
        let forward = greedy_pairs(3, 4, 0.3, |i, j| scores[i][j]);
        let backward = greedy_pairs(4, 3, 0.3, |i, j| scores[j][i]);

        let mut mirrored: Vec<(usize, usize, f64)> =
            backward.pairs.iter().map(|&(i, j, s)| (j, i, s)).collect();
        mirrored.sort_by_key(|&(i, _, _)| i);
        assert_eq!(forward.pairs, mirrored);
        assert_eq!(forward.unmatched_baseline, backward.unmatched_current);
        assert_eq!(forward.unmatched_current, backward.unmatched_baseline);
    }

    #[test]
    fn preference_breaks_equal_scores() {
        let pairing = greedy_pairs_with_preference(1, 2, 0.3, |_, j| (0.6, u8::from(j == 1)));
        assert_eq!(pairing.pairs, vec![(0, 1, 0.6)]);
    }

    #[test]
    fn moved_elements_are_classified() {
        let a = snapshot(vec![card(0.0, 0.0, "Pricing plans")]);
        let b = snapshot(vec![card(0.0, 80.0, "Pricing plans")]);
        let matches = match_elements(&a.flatten(), &b.flatten(), &MatcherConfig::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_type, MatchType::Moved);
        assert_eq!(matches[0].position_diff, 80.0);
        assert_eq!(matches[0].changes.len(), 1);
        assert_eq!(matches[0].changes[0].property, "y");
    }

    #[test]
    fn changes_list_text_and_class() {
        let a = card(0.0, 0.0, "Buy now");
        let b = card(0.0, 0.0, "Buy later").with_class("card sale");
        let props: Vec<String> = node_changes(&a, &b, 1.0)
            .into_iter()
            .map(|c| c.property)
            .collect();
        assert_eq!(props, vec!["className", "text"]);
    }
}
