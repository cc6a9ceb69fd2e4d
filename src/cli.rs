use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lvr")]
#[command(
    version,
    about = "Layout Visual Regression - structural comparison of rendered pages",
    long_about = "Layout Visual Regression (LVR)\n\nModes:\n- compare: diff two captured snapshots element by element or by semantic group, and gate the result on thresholds.\n- calibrate: measure noise across repeated captures of one page and derive tolerances.\n- analyze: print statistics, semantic groups and proximity clusters for one snapshot.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose (debug) logging on stderr")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML, or YAML by .yaml/.yml extension); CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare a baseline snapshot against a current snapshot
    Compare {
        #[arg(long, value_name = "PATH", help = "Baseline snapshot JSON")]
        baseline: PathBuf,

        #[arg(long, value_name = "PATH", help = "Current snapshot JSON")]
        current: PathBuf,

        #[arg(long, value_enum, default_value = "elements", help = "Comparison variant")]
        mode: CompareModeArg,

        #[arg(
            long,
            default_value = "2",
            value_name = "PX",
            help = "Position delta (pixels) an element must exceed to count as changed"
        )]
        threshold: f64,

        #[arg(long, value_enum, help = "Text comparison mode")]
        text_mode: Option<TextModeArg>,

        #[arg(
            long,
            help = "Selectors to ignore (comma-separated; supports #id, .class, tag and compounds)"
        )]
        ignore_selectors: Option<String>,

        #[arg(
            long,
            value_name = "PERCENT",
            help = "Fail when similarity (0-100) falls below this value"
        )]
        min_similarity: Option<f64>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Derive comparison tolerances from repeated samples of one page
    Calibrate {
        #[arg(required = true, value_name = "SAMPLE", help = "Snapshot JSON files (at least 2)")]
        samples: Vec<PathBuf>,

        #[arg(long, value_enum, default_value = "medium", help = "Calibration strictness")]
        strictness: StrictnessArg,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },

    /// Print statistics, semantic groups and proximity clusters of one snapshot
    Analyze {
        #[arg(value_name = "SNAPSHOT", help = "Snapshot JSON file")]
        snapshot: PathBuf,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum CompareModeArg {
    #[default]
    Elements,
    Semantic,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TextModeArg {
    Exact,
    Normalized,
    Similarity,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum StrictnessArg {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
