use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use lvr_lib::{CompareMode, ErrorOutput, LvrError, LvrOutput};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &LvrOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: LvrError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    tracing::debug!(error = %err, "command failed");
    let payload = LvrOutput::Error(ErrorOutput::from_payload(err.to_payload()));

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Exit code 2 is reserved for errors; threshold failures use 1.
    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(body: &LvrOutput, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &LvrOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &LvrOutput, colorize: bool) -> String {
    match body {
        LvrOutput::Compare(out) => {
            let mut buf = String::new();
            let status = if out.passed { "PASS" } else { "FAIL" };
            let status_colored = color(status, if out.passed { "32" } else { "31" }, colorize);
            let mode = match out.compare_mode {
                CompareMode::Elements => "elements",
                CompareMode::Semantic => "semantic",
            };
            writeln!(buf, "{} Layout check ({} mode)", status_colored, mode).ok();
            let similarity = color(
                &format!("{:.1}%", out.result.similarity),
                score_color_code(out.result.similarity),
                colorize,
            );
            writeln!(buf, "Similarity: {similarity}").ok();

            let s = &out.result.summary;
            writeln!(
                buf,
                "Elements: {} baseline / {} current; {} added, {} removed, {} modified, {} moved, {} unchanged",
                s.baseline_elements,
                s.current_elements,
                s.added,
                s.removed,
                s.modified,
                s.moved,
                s.unchanged
            )
            .ok();

            let mut issues: Vec<String> = out
                .summary
                .as_ref()
                .map(|s| s.top_issues.clone())
                .unwrap_or_default();
            if issues.len() > 5 {
                issues.truncate(5);
            }
            if !issues.is_empty() {
                writeln!(buf, "Top issues (max 5):").ok();
                for issue in issues {
                    writeln!(buf, "- {issue}").ok();
                }
            }

            if !out.evaluation.failures.is_empty() {
                writeln!(buf, "Threshold failures:").ok();
                for v in &out.evaluation.failures {
                    writeln!(buf, "- [{}] {}", v.category, v.message).ok();
                }
            }
            if !out.evaluation.warnings.is_empty() {
                writeln!(buf, "Threshold warnings:").ok();
                for v in &out.evaluation.warnings {
                    writeln!(buf, "- [{}] {}", v.category, v.message).ok();
                }
            }
            buf
        }
        LvrOutput::Calibrate(out) => {
            let mut buf = String::new();
            let header = color("[CALIBRATE]", "36", colorize);
            let result = &out.calibration;
            writeln!(
                buf,
                "{} {} samples, confidence {:.1}%",
                header,
                out.samples.len(),
                result.confidence
            )
            .ok();
            let settings = &result.settings;
            writeln!(buf, "Settings:").ok();
            writeln!(buf, "- {:24} {:.1}px", "positionTolerance", settings.position_tolerance).ok();
            writeln!(buf, "- {:24} {:.1}px", "sizeTolerance", settings.size_tolerance).ok();
            writeln!(
                buf,
                "- {:24} {:.1}",
                "textSimilarityThreshold", settings.text_similarity_threshold
            )
            .ok();
            writeln!(
                buf,
                "- {:24} {:.1}",
                "similarityThreshold", settings.similarity_threshold
            )
            .ok();
            if !settings.ignore_classes.is_empty() {
                writeln!(buf, "- {:24} {}", "ignoreClasses", settings.ignore_classes.join(", ")).ok();
            }
            if !settings.ignore_types.is_empty() {
                writeln!(buf, "- {:24} {}", "ignoreTypes", settings.ignore_types.join(", ")).ok();
            }
            let analysis = &result.analysis;
            writeln!(
                buf,
                "Flakiness: {:.1} ({} of {} elements unstable)",
                analysis.overall_score, analysis.unstable_count, analysis.total_elements
            )
            .ok();
            for element in &analysis.flaky_elements {
                writeln!(
                    buf,
                    "- {:32} {} ({:.0}% present)",
                    element.identifier,
                    element.flakiness_type,
                    element.occurrence_rate * 100.0
                )
                .ok();
            }
            if !analysis.recommendations.is_empty() {
                writeln!(buf, "Recommendations:").ok();
                for r in &analysis.recommendations {
                    writeln!(buf, "- {r}").ok();
                }
            }
            buf
        }
        LvrOutput::Analyze(out) => {
            let mut buf = String::new();
            let header = color("[ANALYZE]", "34", colorize);
            let stats = &out.statistics;
            writeln!(buf, "{} {} ({})", header, out.snapshot, out.viewport).ok();
            writeln!(
                buf,
                "Elements: {} total, {} interactive, {} with text, depth {}",
                stats.total_elements,
                stats.interactive_elements,
                stats.text_elements,
                stats.max_depth
            )
            .ok();
            if !stats.by_type.is_empty() {
                writeln!(buf, "By type:").ok();
                for (kind, count) in &stats.by_type {
                    writeln!(buf, "- {:12} {}", kind.as_str(), count).ok();
                }
            }
            if !out.groups.is_empty() {
                writeln!(buf, "Groups:").ok();
                let mut stack: Vec<(&lvr_lib::SemanticGroup, usize)> =
                    out.groups.iter().rev().map(|g| (g, 0)).collect();
                while let Some((group, depth)) = stack.pop() {
                    writeln!(
                        buf,
                        "{:indent$}- {} {} '{}' ({:.0})",
                        "",
                        group.id,
                        group.group_type.as_str(),
                        group.label,
                        group.importance,
                        indent = depth * 2
                    )
                    .ok();
                    stack.extend(group.children.iter().rev().map(|c| (c, depth + 1)));
                }
            }
            if !out.clusters.is_empty() {
                writeln!(buf, "Clusters: {}", out.clusters.len()).ok();
            }
            buf
        }
        LvrOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Map a 0-100 similarity to an ANSI color code.
fn score_color_code(score: f64) -> &'static str {
    if score >= 95.0 {
        "32" // green
    } else if score >= 80.0 {
        "33" // yellow
    } else {
        "31" // red
    }
}

/// Determine exit code for the compare command.
pub fn exit_code_for_compare(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
