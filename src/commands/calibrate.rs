use std::path::PathBuf;
use std::process::ExitCode;

use lvr_lib::output::LVR_OUTPUT_VERSION;
use lvr_lib::{calibrate, CalibrateOutput, LvrError, LvrOutput};
use tracing::info;

use crate::cli::{OutputFormat, StrictnessArg};
use crate::formatting::{render_error, write_output};
use crate::pipeline::load_snapshots;
use crate::settings::{flag_present, load_config, resolve_calibration_options};

/// Run the calibrate command.
pub fn run_calibrate(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    samples: Vec<PathBuf>,
    strictness: StrictnessArg,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let options = resolve_calibration_options(
        &config,
        flag_present(raw_args, "--strictness"),
        strictness,
    );

    let snapshots = match load_snapshots(&samples) {
        Ok(snapshots) => snapshots,
        Err(err) => return render_error(err, format, output),
    };
    let calibration = match calibrate(&snapshots, &options) {
        Ok(result) => result,
        Err(err) => return render_error(err, format, output),
    };
    info!(
        samples = snapshots.len(),
        strictness = %options.strictness,
        confidence = calibration.confidence,
        "calibration complete"
    );

    let body = LvrOutput::Calibrate(CalibrateOutput {
        version: LVR_OUTPUT_VERSION.to_string(),
        samples: samples.iter().map(|p| p.display().to_string()).collect(),
        calibration,
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
