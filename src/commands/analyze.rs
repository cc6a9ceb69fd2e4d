use std::path::PathBuf;
use std::process::ExitCode;

use lvr_lib::grouping::snapshot_groups;
use lvr_lib::output::LVR_OUTPUT_VERSION;
use lvr_lib::{cluster_nodes, AnalyzeOutput, LvrError, LvrOutput};
use tracing::info;

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::pipeline::load_snapshot;
use crate::settings::load_config;

/// Run the analyze command.
pub fn run_analyze(
    config_path: Option<PathBuf>,
    snapshot_path: PathBuf,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let snapshot = match load_snapshot(&snapshot_path) {
        Ok(snapshot) => snapshot,
        Err(err) => return render_error(err, format, output),
    };

    let statistics = snapshot.compute_statistics();
    let groups = snapshot_groups(&snapshot, &config.grouping).into_owned();
    let clusters = cluster_nodes(&snapshot.flatten(), &snapshot.viewport, &config.proximity);
    info!(
        elements = statistics.total_elements,
        groups = groups.len(),
        clusters = clusters.len(),
        "analysis complete"
    );

    let body = LvrOutput::Analyze(AnalyzeOutput {
        version: LVR_OUTPUT_VERSION.to_string(),
        snapshot: snapshot_path.display().to_string(),
        viewport: snapshot.viewport,
        statistics,
        groups,
        clusters,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(
            LvrError::Io(std::io::Error::other(err.to_string())),
            format,
            output,
        );
    }
    ExitCode::SUCCESS
}
