//! Property-based invariants of the comparison engine.
//!
//! 1. Comparing a snapshot with itself yields 100% similarity and no differences.
//! 2. Swapping baseline and current swaps added/removed and keeps similarity.
//! 3. Raising the change threshold never adds differences or lowers similarity.
//! 4. Classification is a pure function of the node.
//! 5. Identical repeated samples are never flaky.

use lvr_lib::{
    classify, compare, detect_flakiness, CompareOptions, FlakinessOptions, Rect, Snapshot,
    Viewport, VisualNode,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

const TAGS: &[&str] = &["div", "button", "p", "section", "img", "a", "h2", "nav"];
const TEXTS: &[&str] = &["Buy now", "Welcome back", "Terms and conditions apply"];

fn node_strategy() -> impl Strategy<Value = VisualNode> {
    (
        0..TAGS.len(),
        0.0f64..1200.0,
        0.0f64..2000.0,
        1.0f64..400.0,
        1.0f64..400.0,
        proptest::option::of(0..TEXTS.len()),
    )
        .prop_map(|(tag, x, y, w, h, text)| {
            let node = VisualNode::new(TAGS[tag], Rect::new(x, y, w, h));
            match text {
                Some(t) => node.with_text(TEXTS[t]),
                None => node,
            }
        })
}

fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    proptest::collection::vec(node_strategy(), 0..12)
        .prop_map(|elements| Snapshot::new("https://example.test/", Viewport::default(), elements))
}

/// Elements no generated node can resemble: unique tag, far below the page.
fn extra(i: usize) -> VisualNode {
    VisualNode::new("aside", Rect::new(0.0, 50_000.0 + 500.0 * i as f64, 300.0, 200.0))
}

fn jitter(snapshot: &Snapshot, offsets: &[f64]) -> Snapshot {
    let mut moved = snapshot.clone();
    for (node, dx) in moved.elements.iter_mut().zip(offsets.iter().cycle()) {
        node.rect.x += dx;
    }
    moved
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Identity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn comparing_with_itself_is_identical(s in snapshot_strategy()) {
        let result = compare(&s, &s, &CompareOptions::default()).unwrap();
        prop_assert_eq!(result.similarity, 100.0);
        prop_assert!(result.differences.is_empty(), "unexpected differences: {:?}", result.differences);
        prop_assert_eq!(result.summary.unchanged, s.elements.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Direction symmetry
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn swapping_sides_swaps_added_and_removed(a in snapshot_strategy(), b in snapshot_strategy()) {
        let options = CompareOptions::default();
        let forward = compare(&a, &b, &options).unwrap();
        let backward = compare(&b, &a, &options).unwrap();

        prop_assert!((forward.similarity - backward.similarity).abs() < 1e-9,
            "forward {} vs backward {}", forward.similarity, backward.similarity);
        prop_assert_eq!(forward.summary.added, backward.summary.removed);
        prop_assert_eq!(forward.summary.removed, backward.summary.added);
        prop_assert_eq!(forward.summary.moved, backward.summary.moved);
        prop_assert_eq!(forward.summary.modified, backward.summary.modified);
        prop_assert_eq!(forward.differences.len(), backward.differences.len());
    }

    #[test]
    fn swapping_jittered_copies_keeps_similarity(
        s in snapshot_strategy(),
        offsets in proptest::collection::vec(-80.0f64..80.0, 1..6),
        extras in 0usize..4,
    ) {
        let mut current = jitter(&s, &offsets);
        current.elements.extend((0..extras).map(extra));

        let options = CompareOptions::default();
        let forward = compare(&s, &current, &options).unwrap();
        let backward = compare(&current, &s, &options).unwrap();

        prop_assert!((forward.similarity - backward.similarity).abs() < 1e-9);
        prop_assert_eq!(forward.summary.added, backward.summary.removed);
        prop_assert_eq!(forward.summary.removed, backward.summary.added);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Threshold monotonicity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn larger_threshold_never_adds_differences(
        s in snapshot_strategy(),
        offsets in proptest::collection::vec(0.0f64..20.0, 1..6),
        low in 0.0f64..10.0,
        extra_threshold in 0.0f64..10.0,
    ) {
        let current = jitter(&s, &offsets);
        let loose = CompareOptions { threshold: low + extra_threshold, ..CompareOptions::default() };
        let tight = CompareOptions { threshold: low, ..CompareOptions::default() };

        let tight_result = compare(&s, &current, &tight).unwrap();
        let loose_result = compare(&s, &current, &loose).unwrap();

        prop_assert!(loose_result.differences.len() <= tight_result.differences.len());
        prop_assert!(loose_result.similarity >= tight_result.similarity - 1e-9);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Classification determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn classification_is_deterministic(node in node_strategy()) {
        let viewport = Viewport::default();
        let first = classify(&node, &viewport);
        let second = classify(&node.clone(), &viewport);
        prop_assert_eq!(first, second);
        prop_assert!((0.0..=100.0).contains(&first.importance));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Stable repeats
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn identical_samples_have_zero_flakiness(s in snapshot_strategy(), copies in 2usize..5) {
        let samples = vec![s; copies];
        let analysis = detect_flakiness(&samples, &FlakinessOptions::default()).unwrap();
        prop_assert_eq!(analysis.overall_score, 0.0);
        prop_assert!(analysis.flaky_elements.is_empty());
        prop_assert_eq!(analysis.total_samples, copies);
    }
}
