mod cli;
mod commands;
mod formatting;
mod pipeline;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_analyze, run_calibrate, run_compare};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Compare {
            baseline,
            current,
            mode,
            threshold,
            text_mode,
            ignore_selectors,
            min_similarity,
            format,
            output,
        } => run_compare(
            &raw_args,
            args.config,
            baseline,
            current,
            mode,
            threshold,
            text_mode,
            ignore_selectors,
            min_similarity,
            format,
            output,
        ),
        Commands::Calibrate {
            samples,
            strictness,
            format,
            output,
        } => run_calibrate(&raw_args, args.config, samples, strictness, format, output),
        Commands::Analyze {
            snapshot,
            format,
            output,
        } => run_analyze(args.config, snapshot, format, output),
    }
}

/// Logs go to stderr so JSON on stdout stays clean. `RUST_LOG` wins over
/// `--verbose`.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "lvr=debug,lvr_lib=debug"
    } else {
        "lvr=info,lvr_lib=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
