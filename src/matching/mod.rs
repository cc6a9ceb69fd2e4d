//! Similarity & matching engine.
//!
//! - [`text`] - fuzzy text similarity and text compare modes
//! - [`similarity`] - weighted per-pair node scoring and match typing
//! - [`matcher`] - greedy best-first pairing of element collections
//! - [`fingerprint`] - geometric matching of semantic groups
//!
//! Matching is greedy rather than an optimal assignment. Callers only see the
//! [`Pairing`] / [`NodeMatch`](crate::types::NodeMatch) contract, so a
//! different assignment strategy can replace it without touching the
//! comparators.

pub mod fingerprint;
pub mod matcher;
pub mod similarity;
pub mod text;

pub use fingerprint::{fingerprint_similarity, match_groups, FingerprintConfig};
pub use matcher::{
    greedy_pairs, greedy_pairs_with_preference, match_elements, pair_elements, Pairing,
};
pub use similarity::{node_similarity, MatcherConfig, NodeFeatures, NodeWeights};
pub use text::{
    compare_text, normalize_text, text_similarity, TextCompareOptions, TextNormalization,
    TextSimilarityWeights,
};
