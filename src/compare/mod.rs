//! Comparator: aggregates per-element matches into a [`ComparisonResult`].
//!
//! Two variants share [`CompareOptions`]: [`compare`] works on raw elements,
//! [`compare_semantic`] on semantic group trees.
//!
//! [`ComparisonResult`]: crate::types::ComparisonResult

pub mod elements;
pub mod issues;
pub mod selectors;
pub mod semantic;

pub use crate::matching::text::compare_text;
pub use elements::{compare, generated_key, similarity_score, CompareOptions, ElementIdentity};
pub use issues::generate_top_issues;
pub use selectors::{compile_selectors, parse_ignore_selectors, Selector};
pub use semantic::{compare_groups, compare_semantic};
