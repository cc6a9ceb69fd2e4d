use std::path::PathBuf;
use std::process::ExitCode;

use lvr_lib::output::LVR_OUTPUT_VERSION;
use lvr_lib::{compare, compare_semantic, evaluate, CompareMode, CompareOutput, LvrError, LvrOutput};
use tracing::{debug, info};

use crate::cli::{CompareModeArg, OutputFormat, TextModeArg};
use crate::formatting::{exit_code_for_compare, render_error, write_output};
use crate::pipeline::{generate_summary, load_snapshot};
use crate::settings::{
    format_effective_config, load_config, resolve_compare_options, resolve_thresholds,
    CompareFlagSources,
};

/// Run the compare command.
#[allow(clippy::too_many_arguments)]
pub fn run_compare(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    baseline: PathBuf,
    current: PathBuf,
    mode: CompareModeArg,
    threshold: f64,
    text_mode: Option<TextModeArg>,
    ignore_selectors: Option<String>,
    min_similarity: Option<f64>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let flag_sources = CompareFlagSources::from_args(raw_args);
    let options = resolve_compare_options(
        &config,
        &flag_sources,
        threshold,
        text_mode,
        ignore_selectors.as_deref(),
    );
    let thresholds = resolve_thresholds(&config, min_similarity);
    if let Err(err) = options.validate().and_then(|_| thresholds.validate()) {
        return render_error(err, format, output);
    }
    debug!(
        "{}",
        format_effective_config(&options, &thresholds, config_path.as_deref())
    );

    let base_snapshot = match load_snapshot(&baseline) {
        Ok(snapshot) => snapshot,
        Err(err) => return render_error(err, format, output),
    };
    let current_snapshot = match load_snapshot(&current) {
        Ok(snapshot) => snapshot,
        Err(err) => return render_error(err, format, output),
    };
    let snapshots = [base_snapshot, current_snapshot];
    let [base_snapshot, current_snapshot] = &snapshots;

    let compare_mode = match mode {
        CompareModeArg::Elements => CompareMode::Elements,
        CompareModeArg::Semantic => CompareMode::Semantic,
    };
    let result = match compare_mode {
        CompareMode::Elements => compare(base_snapshot, current_snapshot, &options),
        CompareMode::Semantic => compare_semantic(base_snapshot, current_snapshot, &options),
    };
    let result = match result {
        Ok(result) => result,
        Err(err) => return render_error(err, format, output),
    };

    let evaluation = evaluate(
        &thresholds,
        &result.differences,
        result.similarity,
        Some(&snapshots[..]),
    );
    let passed = evaluation.passed;
    info!(
        similarity = result.similarity,
        differences = result.differences.len(),
        passed,
        "comparison complete"
    );

    let summary = generate_summary(&result, &evaluation);
    let body = LvrOutput::Compare(CompareOutput {
        version: LVR_OUTPUT_VERSION.to_string(),
        baseline: baseline.display().to_string(),
        current: current.display().to_string(),
        compare_mode,
        viewport: base_snapshot.viewport,
        passed,
        result,
        evaluation,
        summary: Some(summary),
    });

    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(
            LvrError::Io(std::io::Error::other(err.to_string())),
            format,
            output,
        );
    }
    exit_code_for_compare(passed)
}
