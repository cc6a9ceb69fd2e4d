//! Layout Visual Regression (LVR) Library
//!
//! Structural comparison of rendered web pages. A snapshot is a tree of
//! captured elements; the library classifies them, groups them into
//! semantic regions, matches them across two snapshots and scores the
//! change. Repeated samples of one page calibrate tolerances so later
//! comparisons ignore known noise.
//!
//! # Module Overview
//!
//! - [`classify`] - semantic type and importance of each element
//! - [`grouping`] - semantic group trees and proximity clusters
//! - [`matching`] - text and node similarity, greedy and fingerprint matching
//! - [`compare`] - element and semantic comparators, ranked issue summary
//! - [`flakiness`] - instability detection and tolerance calibration
//! - [`thresholds`] - pass/fail policy over one comparison
//! - [`config`] - configuration file support
//! - [`types`] - core data types and structures
//! - [`output`] - JSON output schemas
//!
//! The library performs no I/O and installs no logging subscriber.
//!
//! # Example
//!
//! ```no_run
//! use lvr_lib::{calibrate, compare, CalibrationOptions, Snapshot};
//!
//! # fn example(samples: Vec<Snapshot>, current: Snapshot) -> lvr_lib::Result<()> {
//! // Learn the noise floor from repeated captures of the same page
//! let calibration = calibrate(&samples, &CalibrationOptions::default())?;
//!
//! // Compare a new capture with the calibrated tolerances
//! let options = calibration.settings.to_compare_options();
//! let result = compare(&samples[0], &current, &options)?;
//! println!("similarity {:.1}%", result.similarity);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod compare;
pub mod config;
pub mod error;
pub mod flakiness;
pub mod grouping;
pub mod matching;
pub mod output;
pub mod thresholds;
pub mod types;
pub mod viewport;

pub use classify::{classify, Classification};
pub use compare::{
    compare, compare_groups, compare_semantic, compare_text, generate_top_issues, CompareOptions,
    ElementIdentity,
};
pub use config::Config;
pub use error::{ErrorCategory, ErrorPayload, LvrError, Result};
pub use flakiness::{
    calibrate, detect_flakiness, CalibrationOptions, FlakinessOptions, Strictness, MIN_SAMPLES,
};
pub use grouping::{build_groups, cluster_nodes, GroupBuilderConfig, ProximityConfig};
pub use matching::{match_elements, match_groups, FingerprintConfig, MatcherConfig};
pub use output::{
    AnalyzeOutput, CalibrateOutput, CompareMode, CompareOutput, ErrorOutput, LvrOutput, Summary,
    LVR_OUTPUT_VERSION,
};
pub use thresholds::{evaluate, ThresholdConfig};
pub use types::{
    CalibrationResult, ComparisonResult, ComparisonSettings, FlakinessAnalysis, NodeGroup, Rect,
    SemanticGroup, SemanticType, Snapshot, VisualNode,
};
pub use viewport::Viewport;
