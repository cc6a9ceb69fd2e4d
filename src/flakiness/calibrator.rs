//! Tolerance calibration from observed flakiness.
//!
//! The calibrator measures how much a page moves between captures that
//! should be identical and turns that noise floor into [`ComparisonSettings`]
//! for later comparisons.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::detector::{analyze_tracks, ensure_samples, track_elements, FlakinessOptions, RectField};
use crate::compare::{compare, CompareOptions, Selector};
use crate::error::{LvrError, Result};
use crate::matching::text::text_similarity;
use crate::thresholds::{PositionThreshold, SimilarityThreshold, SizeThreshold, ThresholdConfig};
use crate::types::{
    CalibrationResult, ComparisonSettings, FlakinessAnalysis, FlakinessType, FlakyElement,
    Snapshot, TextCompareMode,
};

/// How far calibrated tolerances stretch beyond the observed noise.
///
/// `low` is the most forgiving, `high` accepts exactly what was observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    Low,
    #[default]
    Medium,
    High,
}

impl Strictness {
    /// Applied to the largest observed pixel range.
    pub fn multiplier(&self) -> f64 {
        match self {
            Strictness::Low => 1.5,
            Strictness::Medium => 1.2,
            Strictness::High => 1.0,
        }
    }

    /// Subtracted from the lowest observed text similarity (0-100).
    fn text_margin(&self) -> f64 {
        match self {
            Strictness::Low => 10.0,
            Strictness::Medium => 5.0,
            Strictness::High => 0.0,
        }
    }

    /// Text threshold when no element's text varied.
    fn default_text_threshold(&self) -> f64 {
        match self {
            Strictness::Low => 85.0,
            Strictness::Medium => 90.0,
            Strictness::High => 95.0,
        }
    }

    /// Subtracted from the lowest sample-to-reference similarity.
    fn similarity_margin(&self) -> f64 {
        match self {
            Strictness::Low => 5.0,
            Strictness::Medium => 2.0,
            Strictness::High => 0.0,
        }
    }

    /// Content/existence variance above which an element is ignored outright.
    fn volatility_threshold(&self) -> f64 {
        match self {
            Strictness::Low => 0.2,
            Strictness::Medium => 0.3,
            Strictness::High => 0.5,
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strictness::Low => "low",
            Strictness::Medium => "medium",
            Strictness::High => "high",
        })
    }
}

impl FromStr for Strictness {
    type Err = LvrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Strictness::Low),
            "medium" => Ok(Strictness::Medium),
            "high" => Ok(Strictness::High),
            other => Err(LvrError::config(format!(
                "unknown strictness '{other}', expected low, medium or high"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalibrationOptions {
    pub strictness: Strictness,
    /// Floor for the calibrated position tolerance, in pixels.
    pub min_position_tolerance: f64,
    /// Floor for the calibrated size tolerance, in pixels.
    pub min_size_tolerance: f64,
    #[serde(skip)]
    pub flakiness: FlakinessOptions,
    /// Base options the calibrated settings are layered onto when scoring samples.
    #[serde(skip)]
    pub compare: CompareOptions,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            strictness: Strictness::default(),
            min_position_tolerance: 2.0,
            min_size_tolerance: 2.0,
            flakiness: FlakinessOptions::default(),
            compare: CompareOptions::default(),
        }
    }
}

impl CalibrationOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.min_position_tolerance.is_finite() || self.min_position_tolerance < 0.0 {
            return Err(LvrError::config("calibration minPositionTolerance must be non-negative"));
        }
        if !self.min_size_tolerance.is_finite() || self.min_size_tolerance < 0.0 {
            return Err(LvrError::config("calibration minSizeTolerance must be non-negative"));
        }
        self.flakiness.validate()?;
        self.compare.validate()
    }
}

/// Derive comparison tolerances from N >= 2 samples of the same page.
pub fn calibrate(samples: &[Snapshot], options: &CalibrationOptions) -> Result<CalibrationResult> {
    ensure_samples(samples)?;
    let strictness = options.strictness;
    let tracks = track_elements(samples, &options.flakiness.matcher);
    let analysis = analyze_tracks(&tracks, samples.len(), &options.flakiness);

    let max_range = |fields: [RectField; 2]| {
        tracks
            .iter()
            .flat_map(|t| fields.map(|f| t.range(f)))
            .fold(0.0, f64::max)
    };
    let position_noise = max_range([RectField::X, RectField::Y]);
    let size_noise = max_range([RectField::Width, RectField::Height]);
    let position_tolerance =
        (position_noise * strictness.multiplier()).ceil().max(options.min_position_tolerance);
    let size_tolerance =
        (size_noise * strictness.multiplier()).ceil().max(options.min_size_tolerance);

    let weights = &options.compare.matcher.text_weights;
    let lowest_text = tracks
        .iter()
        .map(|t| t.distinct_texts())
        .filter(|texts| texts.len() > 1)
        .flat_map(|texts| {
            let texts: Vec<&str> = texts.into_iter().map(|t| t.unwrap_or("")).collect();
            let mut sims = Vec::new();
            for (i, a) in texts.iter().enumerate() {
                for b in &texts[i + 1..] {
                    sims.push(text_similarity(a, b, weights));
                }
            }
            sims
        })
        .reduce(f64::min);
    let text_similarity_threshold = match lowest_text {
        Some(sim) => (sim * 100.0 - strictness.text_margin()).clamp(50.0, 100.0),
        None => strictness.default_text_threshold(),
    };

    let (ignore_classes, ignore_types) = volatile_elements(&analysis, strictness);

    let mut settings = ComparisonSettings {
        position_tolerance,
        size_tolerance,
        text_similarity_threshold,
        similarity_threshold: 100.0,
        ignore_classes,
        ignore_types,
    };

    let calibrated = settings.apply_to(options.compare.clone());
    let reference = &samples[0];
    let sample_similarities = samples[1..]
        .iter()
        .map(|s| compare(reference, s, &calibrated).map(|r| r.similarity))
        .collect::<Result<Vec<f64>>>()?;
    let lowest = sample_similarities
        .iter()
        .copied()
        .fold(100.0, f64::min);
    settings.similarity_threshold = (lowest - strictness.similarity_margin()).clamp(0.0, 100.0);

    let confidence = confidence(&analysis);
    debug!(
        samples = samples.len(),
        %strictness,
        position_tolerance,
        size_tolerance,
        text_similarity_threshold,
        similarity_threshold = settings.similarity_threshold,
        confidence,
        "calibrated comparison settings"
    );

    Ok(CalibrationResult {
        settings,
        analysis,
        confidence,
        sample_similarities,
    })
}

/// Elements whose only instability is content or existence and whose
/// variance clears the volatility threshold. Each contributes its full class
/// list, which later ignores only elements carrying every one of those
/// classes. Classless elements contribute their tag.
fn volatile_elements(
    analysis: &FlakinessAnalysis,
    strictness: Strictness,
) -> (Vec<String>, Vec<String>) {
    let mut classes: Vec<String> = Vec::new();
    let mut types: Vec<String> = Vec::new();
    for element in &analysis.flaky_elements {
        let property = match element.flakiness_type {
            FlakinessType::Content => "text",
            FlakinessType::Existence => "existence",
            _ => continue,
        };
        let volatile = element
            .variations
            .iter()
            .any(|v| v.property == property && v.variance > strictness.volatility_threshold());
        if !volatile {
            continue;
        }
        let class_set = element
            .class_name
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        if class_set.is_empty() {
            push_unique(&mut types, &element.tag_name.to_ascii_lowercase());
        } else {
            push_unique(&mut classes, &class_set);
        }
    }
    (classes, types)
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// `100 - (50 * flaky fraction + 50 * mean variation magnitude)`.
fn confidence(analysis: &FlakinessAnalysis) -> f64 {
    if analysis.total_elements == 0 {
        return 100.0;
    }
    let flaky_fraction = analysis.unstable_count as f64 / analysis.total_elements as f64;
    let magnitudes: Vec<f64> = analysis.flaky_elements.iter().map(magnitude).collect();
    let mean_magnitude = if magnitudes.is_empty() {
        0.0
    } else {
        magnitudes.iter().sum::<f64>() / magnitudes.len() as f64
    };
    (100.0 - (50.0 * flaky_fraction + 50.0 * mean_magnitude)).clamp(0.0, 100.0)
}

/// Worst variation of one element on a 0-1 scale: pixel ranges saturate at
/// 100px, text-like properties use their variance directly.
fn magnitude(element: &FlakyElement) -> f64 {
    element
        .variations
        .iter()
        .map(|v| {
            if v.range > 0.0 {
                (v.range / 100.0).min(1.0)
            } else {
                v.variance.clamp(0.0, 1.0)
            }
        })
        .fold(0.0, f64::max)
}

impl ComparisonSettings {
    /// Default comparator options with these tolerances applied.
    pub fn to_compare_options(&self) -> CompareOptions {
        self.apply_to(CompareOptions::default())
    }

    /// Layer these tolerances onto existing options. Ignored classes and
    /// types are appended to the existing ignore selectors; each
    /// `ignore_classes` entry becomes one compound class selector.
    pub fn apply_to(&self, mut options: CompareOptions) -> CompareOptions {
        options.threshold = self.position_tolerance;
        options.size_threshold = Some(self.size_tolerance);
        options.text_compare_mode = TextCompareMode::Similarity;
        options.text_similarity_threshold = self.text_similarity_threshold;
        let selectors = self
            .ignore_classes
            .iter()
            .map(|set| Selector::for_classes(set.split_whitespace()))
            .chain(self.ignore_types.iter().map(|t| Selector::for_tag(t.trim())))
            .filter(|selector| !selector.is_empty())
            .map(|selector| selector.to_string());
        for selector in selectors {
            if !options.ignore_selectors.contains(&selector) {
                options.ignore_selectors.push(selector);
            }
        }
        options
    }

    /// A strict threshold policy enforcing these tolerances.
    pub fn to_threshold_config(&self) -> ThresholdConfig {
        ThresholdConfig {
            similarity: Some(SimilarityThreshold {
                min: self.similarity_threshold,
            }),
            position: Some(PositionThreshold {
                max_shift: self.position_tolerance,
                strict: true,
            }),
            size: Some(SizeThreshold {
                max_pixels: Some(self.size_tolerance),
                max_percent: None,
                strict: true,
            }),
            ..ThresholdConfig::default()
        }
    }
}
