//! Fuzzy text similarity and text comparison modes.
//!
//! The combined score blends normalized Levenshtein, Jaro-Winkler, Dice
//! bigram and token Jaccard similarity. It is used both to correlate
//! elements and to decide whether content changed.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::{TextCompareMode, TextComparison};

/// Blend weights for [`text_similarity`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextSimilarityWeights {
    pub levenshtein: f64,
    pub jaro_winkler: f64,
    pub dice: f64,
    pub jaccard: f64,
}

impl Default for TextSimilarityWeights {
    fn default() -> Self {
        Self {
            levenshtein: 0.3,
            jaro_winkler: 0.3,
            dice: 0.2,
            jaccard: 0.2,
        }
    }
}

impl TextSimilarityWeights {
    pub fn total(&self) -> f64 {
        self.levenshtein + self.jaro_winkler + self.dice + self.jaccard
    }
}

/// Normalization applied in `normalized` and `similarity` modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextNormalization {
    pub trim: bool,
    pub remove_extra_spaces: bool,
    pub ignore_case: bool,
}

impl Default for TextNormalization {
    fn default() -> Self {
        Self {
            trim: true,
            remove_extra_spaces: true,
            ignore_case: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextCompareOptions {
    pub mode: TextCompareMode,
    pub normalization: TextNormalization,
    /// 0-100; in `similarity` mode a score at or above this counts as unchanged.
    pub similarity_threshold: f64,
    pub weights: TextSimilarityWeights,
}

impl Default for TextCompareOptions {
    fn default() -> Self {
        Self {
            mode: TextCompareMode::Normalized,
            normalization: TextNormalization::default(),
            similarity_threshold: 90.0,
            weights: TextSimilarityWeights::default(),
        }
    }
}

pub fn normalize_text(input: &str, options: &TextNormalization) -> String {
    let mut out = if options.remove_extra_spaces {
        let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
        if options.trim {
            collapsed
        } else {
            // keep a single leading/trailing space where there was whitespace
            let lead = if input.starts_with(char::is_whitespace) { " " } else { "" };
            let trail = if input.ends_with(char::is_whitespace) && !collapsed.is_empty() {
                " "
            } else {
                ""
            };
            format!("{lead}{collapsed}{trail}")
        }
    } else if options.trim {
        input.trim().to_string()
    } else {
        input.to_string()
    };
    if options.ignore_case {
        out = out.to_lowercase();
    }
    out
}

pub fn compare_text(a: &str, b: &str, options: &TextCompareOptions) -> TextComparison {
    let (identical, similarity) = match options.mode {
        TextCompareMode::Exact => {
            let identical = a == b;
            let similarity = if identical {
                1.0
            } else {
                text_similarity(a, b, &options.weights)
            };
            (identical, similarity)
        }
        TextCompareMode::Normalized => {
            let na = normalize_text(a, &options.normalization);
            let nb = normalize_text(b, &options.normalization);
            let identical = na == nb;
            let similarity = if identical {
                1.0
            } else {
                text_similarity(&na, &nb, &options.weights)
            };
            (identical, similarity)
        }
        TextCompareMode::Similarity => {
            let na = normalize_text(a, &options.normalization);
            let nb = normalize_text(b, &options.normalization);
            let similarity = text_similarity(&na, &nb, &options.weights);
            (similarity * 100.0 >= options.similarity_threshold, similarity)
        }
    };
    TextComparison {
        identical,
        similarity,
        mode: options.mode,
    }
}

/// Weighted blend of the four similarity measures, in `[0, 1]`.
///
/// Symmetric: the arguments are put in a fixed order before scoring.
pub fn text_similarity(a: &str, b: &str, weights: &TextSimilarityWeights) -> f64 {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    let score = weights.levenshtein * levenshtein_similarity(a, b)
        + weights.jaro_winkler * jaro_winkler(a, b)
        + weights.dice * dice_coefficient(a, b)
        + weights.jaccard * token_jaccard(a, b);
    (score / total).clamp(0.0, 1.0)
}

pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - distance / longer length`; identical empty strings score 1.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
}

pub fn jaro(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if !b_matched[j] && b[j] == *ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut k = 0usize;
    for (i, ca) in a.iter().enumerate() {
        if !a_matched[i] {
            continue;
        }
        while !b_matched[k] {
            k += 1;
        }
        if *ca != b[k] {
            transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let t = transpositions as f64 / 2.0;
    (m / a.len() as f64 + m / b.len() as f64 + (m - t) / m) / 3.0
}

pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let j = jaro(a, b);
    let prefix = a
        .chars()
        .zip(b.chars())
        .take(4)
        .take_while(|(x, y)| x == y)
        .count() as f64;
    (j + prefix * 0.1 * (1.0 - j)).clamp(0.0, 1.0)
}

fn bigrams(s: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = HashMap::new();
    for pair in chars.windows(2) {
        *out.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    out
}

/// Sørensen-Dice over character bigram multisets.
///
/// Strings too short to have bigrams score 1 when equal, 0 otherwise.
pub fn dice_coefficient(a: &str, b: &str) -> f64 {
    let ba = bigrams(a);
    let bb = bigrams(b);
    let total: usize = ba.values().sum::<usize>() + bb.values().sum::<usize>();
    if total == 0 {
        return if a == b { 1.0 } else { 0.0 };
    }
    let common: usize = ba
        .iter()
        .map(|(gram, count)| (*count).min(bb.get(gram).copied().unwrap_or(0)))
        .sum();
    2.0 * common as f64 / total as f64
}

/// Jaccard similarity of whitespace-separated tokens; two empty sets score 1.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();
    jaccard(&set_a, &set_b)
}

pub fn jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn levenshtein_known_values() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert!(close(levenshtein_similarity("kitten", "sitting"), 1.0 - 3.0 / 7.0));
        assert_eq!(levenshtein_similarity("", ""), 1.0);
    }

    #[test]
    fn jaro_winkler_known_values() {
        assert!(close(jaro("MARTHA", "MARHTA"), 0.944));
        assert!(close(jaro_winkler("MARTHA", "MARHTA"), 0.961));
        assert!(close(jaro_winkler("DIXON", "DICKSONX"), 0.813));
        assert_eq!(jaro("abc", "xyz"), 0.0);
    }

    #[test]
    fn dice_handles_short_strings() {
        assert_eq!(dice_coefficient("a", "a"), 1.0);
        assert_eq!(dice_coefficient("a", "b"), 0.0);
        assert!(close(dice_coefficient("night", "nacht"), 0.25));
    }

    #[test]
    fn jaccard_of_empty_sets_is_one() {
        assert_eq!(token_jaccard("", "   "), 1.0);
        assert!(close(token_jaccard("a b c", "b c d"), 0.5));
    }

    #[test]
    fn combined_similarity_bounds() {
        let w = TextSimilarityWeights::default();
        assert_eq!(text_similarity("same", "same", &w), 1.0);
        assert_eq!(text_similarity("", "x", &w), 0.0);
        let s = text_similarity("Add to cart", "Add to basket", &w);
        assert!(s > 0.5 && s < 1.0, "got {s}");
    }

    #[test]
    fn blended_similarity_ignores_argument_order() {
        let w = TextSimilarityWeights::default();
        for (a, b) in [("Checkout", "Check out now"), ("abcdef", "fedcba"), ("Sale", "Sales")] {
            assert_eq!(text_similarity(a, b, &w), text_similarity(b, a, &w));
        }
    }

    #[test]
    fn normalized_mode_collapses_whitespace() {
        let options = TextCompareOptions {
            mode: TextCompareMode::Normalized,
            normalization: TextNormalization {
                remove_extra_spaces: true,
                ..TextNormalization::default()
            },
            ..TextCompareOptions::default()
        };
        assert!(compare_text("Hello World", "Hello  World", &options).identical);

        let exact = TextCompareOptions {
            mode: TextCompareMode::Exact,
            ..TextCompareOptions::default()
        };
        let result = compare_text("Hello World", "Hello  World", &exact);
        assert!(!result.identical);
        assert!(result.similarity > 0.8);
    }

    #[test]
    fn normalized_mode_respects_case_option() {
        let case_sensitive = TextCompareOptions {
            normalization: TextNormalization {
                ignore_case: false,
                ..TextNormalization::default()
            },
            ..TextCompareOptions::default()
        };
        assert!(!compare_text("Sign in", "sign in", &case_sensitive).identical);
        assert!(compare_text("Sign in", "sign in", &TextCompareOptions::default()).identical);
    }

    #[test]
    fn similarity_mode_uses_threshold() {
        let options = TextCompareOptions {
            mode: TextCompareMode::Similarity,
            similarity_threshold: 80.0,
            ..TextCompareOptions::default()
        };
        assert!(compare_text("Updated 5 minutes ago", "Updated 6 minutes ago", &options).identical);
        assert!(!compare_text("Welcome back", "Checkout failed", &options).identical);
    }

    #[test]
    fn normalize_without_trim_keeps_single_edge_space() {
        let n = TextNormalization {
            trim: false,
            remove_extra_spaces: true,
            ignore_case: false,
        };
        assert_eq!(normalize_text("  a   b  ", &n), " a b ");
    }
}
