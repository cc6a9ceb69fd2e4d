//! Value objects shared by every stage of the pipeline.
//!
//! - [`core`] - geometry primitives ([`Rect`])
//! - [`node`] - captured snapshots and their elements
//! - [`group`] - semantic types, semantic groups, proximity clusters
//! - [`results`] - comparison, flakiness, calibration and threshold outputs
//!
//! Everything here is plain data: serializable to camelCase JSON, no
//! back-references, never mutated after a snapshot is captured.

pub mod core;
pub mod group;
pub mod node;
pub mod results;

pub use self::core::Rect;
pub use crate::viewport::Viewport;
pub use group::{NodeGroup, SemanticGroup, SemanticType};
pub use node::{ComputedStyle, FlatElement, LayoutStatistics, Snapshot, VisualNode};
pub use results::{
    CalibrationResult, ComparisonResult, ComparisonSettings, ComparisonSummary, DiffSeverity,
    DifferenceType, ElementRef, FlakinessAnalysis, FlakinessType, FlakyElement, MatchType,
    NodeMatch, PropertyChange, PropertyVariation, TextCompareMode, TextComparison,
    ThresholdCategory, ThresholdEvaluation, ThresholdViolation, ValueCount, VisualDifference,
};
