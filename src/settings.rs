use std::path::Path;

use lvr_lib::compare::parse_ignore_selectors;
use lvr_lib::thresholds::SimilarityThreshold;
use lvr_lib::types::TextCompareMode;
use lvr_lib::{CalibrationOptions, CompareOptions, Config, LvrError, Strictness, ThresholdConfig};

use crate::cli::{StrictnessArg, TextModeArg};

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct CompareFlagSources {
    pub threshold: bool,
}

impl CompareFlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            threshold: flag_present(args, "--threshold"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Merge CLI arguments into the configured compare options, preferring CLI
/// when flags are present. Ignore selectors from both sources are combined.
pub fn resolve_compare_options(
    config: &Config,
    flags: &CompareFlagSources,
    cli_threshold: f64,
    cli_text_mode: Option<TextModeArg>,
    cli_ignore_selectors: Option<&str>,
) -> CompareOptions {
    let mut options = config.compare_options();
    if flags.threshold {
        options.threshold = cli_threshold;
    }
    if let Some(mode) = cli_text_mode {
        options.text_compare_mode = text_mode_from_cli(mode);
    }
    for selector in parse_ignore_selectors(cli_ignore_selectors) {
        if !options.ignore_selectors.contains(&selector) {
            options.ignore_selectors.push(selector);
        }
    }
    options
}

/// Configured thresholds, with `--min-similarity` replacing the similarity gate.
pub fn resolve_thresholds(config: &Config, cli_min_similarity: Option<f64>) -> ThresholdConfig {
    let mut thresholds = config.thresholds.clone();
    if let Some(min) = cli_min_similarity {
        thresholds.similarity = Some(SimilarityThreshold { min });
    }
    thresholds
}

pub fn resolve_calibration_options(
    config: &Config,
    strictness_flag: bool,
    cli_strictness: StrictnessArg,
) -> CalibrationOptions {
    let mut options = config.calibration_options();
    if strictness_flag {
        options.strictness = strictness_from_cli(cli_strictness);
    }
    options
}

pub fn text_mode_from_cli(mode: TextModeArg) -> TextCompareMode {
    match mode {
        TextModeArg::Exact => TextCompareMode::Exact,
        TextModeArg::Normalized => TextCompareMode::Normalized,
        TextModeArg::Similarity => TextCompareMode::Similarity,
    }
}

pub fn strictness_from_cli(strictness: StrictnessArg) -> Strictness {
    match strictness {
        StrictnessArg::Low => Strictness::Low,
        StrictnessArg::Medium => Strictness::Medium,
        StrictnessArg::High => Strictness::High,
    }
}

/// Load config from a TOML or YAML file, or return defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, LvrError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let content = std::fs::read_to_string(path).map_err(|e| {
        LvrError::Config(format!("Failed to read config {}: {}", path.display(), e))
    })?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    let parsed = if is_yaml {
        Config::from_yaml_str(&content)
    } else {
        Config::from_toml_str(&content)
    };
    parsed.map_err(|e| match e {
        LvrError::Config(msg) => {
            LvrError::Config(format!("Invalid config ({}): {}", path.display(), msg))
        }
        other => other,
    })
}

/// Format effective compare settings as a single-line string.
pub fn format_effective_config(
    options: &CompareOptions,
    thresholds: &ThresholdConfig,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let min_similarity = thresholds
        .similarity
        .map(|s| format!("{:.1}", s.min))
        .unwrap_or_else(|| "none".to_string());
    format!(
        "Effective config [{source}]: threshold={:.1}px, size-threshold={:.1}px, text-mode={:?}, text-similarity={:.1}, identity={}, ignore=[{}], moved-distance={:.1}px, acceptance-floor={:.2}, min-similarity={}",
        options.threshold,
        options.size_threshold(),
        options.text_compare_mode,
        options.text_similarity_threshold,
        options.identity,
        options.ignore_selectors.join(","),
        options.moved_distance,
        options.matcher.acceptance_floor,
        min_similarity
    )
}
