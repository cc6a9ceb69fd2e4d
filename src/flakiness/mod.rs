//! Flakiness Detector and Calibrator.
//!
//! [`detect_flakiness`] classifies every element of N >= 2 samples of one
//! page as stable or flaky; [`calibrate`] turns that noise into
//! [`ComparisonSettings`](crate::types::ComparisonSettings).

pub mod calibrator;
pub mod detector;

pub use calibrator::{calibrate, CalibrationOptions, Strictness};
pub use detector::{detect_flakiness, FlakinessOptions, MIN_SAMPLES};
