use lvr_lib::{LvrOutput, Rect, Snapshot, Viewport, VisualNode};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn page(extra_section: bool, banner_y: f64) -> Snapshot {
    let mut elements = vec![
        VisualNode::new("nav", Rect::new(0.0, 0.0, 1280.0, 60.0))
            .with_class("top-nav")
            .with_children(vec![
                VisualNode::new("a", Rect::new(20.0, 15.0, 80.0, 30.0)).with_text("Home"),
            ]),
        VisualNode::new("div", Rect::new(0.0, banner_y, 1280.0, 120.0))
            .with_class("banner")
            .with_text("Free delivery"),
    ];
    if extra_section {
        elements.push(VisualNode::new(
            "section",
            Rect::new(0.0, 400.0, 1280.0, 300.0),
        ));
    }
    Snapshot::new("https://shop.example.test/", Viewport::default(), elements)
}

fn write_snapshot(dir: &Path, name: &str, snapshot: &Snapshot) -> PathBuf {
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(snapshot).expect("serialize snapshot");
    std::fs::write(&path, json).expect("write snapshot");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lvr"))
        .args(args)
        .output()
        .expect("run lvr")
}

fn parse_json(stdout: &[u8]) -> LvrOutput {
    serde_json::from_slice(stdout).expect("output should be valid JSON")
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

#[test]
fn compare_exit_code_passes_for_identical_snapshots() {
    let dir = TempDir::new().expect("tempdir");
    let baseline = write_snapshot(dir.path(), "baseline.json", &page(false, 100.0));
    let current = write_snapshot(dir.path(), "current.json", &page(false, 100.0));

    let output = run(&[
        "compare",
        "--baseline",
        arg(&baseline),
        "--current",
        arg(&current),
        "--format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(0));

    match parse_json(&output.stdout) {
        LvrOutput::Compare(out) => {
            assert!(out.passed);
            assert_eq!(out.result.similarity, 100.0);
            assert!(out.result.differences.is_empty());
        }
        other => panic!("expected compare output, got {other:?}"),
    }
}

#[test]
fn compare_exit_code_fails_below_min_similarity() {
    let dir = TempDir::new().expect("tempdir");
    let baseline = write_snapshot(dir.path(), "baseline.json", &page(false, 100.0));
    let current = write_snapshot(dir.path(), "current.json", &page(true, 100.0));

    let output = run(&[
        "compare",
        "--baseline",
        arg(&baseline),
        "--current",
        arg(&current),
        "--min-similarity",
        "99",
    ]);
    assert_eq!(output.status.code(), Some(1));

    match parse_json(&output.stdout) {
        LvrOutput::Compare(out) => {
            assert!(!out.passed);
            assert_eq!(out.result.summary.added, 1);
            assert_eq!(out.evaluation.failures.len(), 1);
            let top = out.summary.map(|s| s.top_issues).unwrap_or_default();
            assert!(
                top.iter().any(|t| t.contains("Layout check failed")),
                "summary should state the outcome, got {top:?}"
            );
        }
        other => panic!("expected compare output, got {other:?}"),
    }
}

#[test]
fn compare_without_thresholds_passes_even_with_differences() {
    let dir = TempDir::new().expect("tempdir");
    let baseline = write_snapshot(dir.path(), "baseline.json", &page(false, 100.0));
    let current = write_snapshot(dir.path(), "current.json", &page(true, 100.0));

    let output = run(&[
        "compare",
        "--baseline",
        arg(&baseline),
        "--current",
        arg(&current),
    ]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn compare_exit_code_returns_fatal_for_missing_input() {
    let dir = TempDir::new().expect("tempdir");
    let baseline = write_snapshot(dir.path(), "baseline.json", &page(false, 100.0));
    let missing = dir.path().join("missing.json");

    let output = run(&[
        "compare",
        "--baseline",
        arg(&baseline),
        "--current",
        arg(&missing),
    ]);
    assert_eq!(output.status.code(), Some(2));

    match parse_json(&output.stdout) {
        LvrOutput::Error(err) => {
            assert!(
                err.error.message.contains("missing.json"),
                "error should name the file, got {}",
                err.error.message
            );
        }
        other => panic!("expected error output, got {other:?}"),
    }
}

#[test]
fn compare_rejects_malformed_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let baseline = write_snapshot(dir.path(), "baseline.json", &page(false, 100.0));
    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{\"url\": \"x\"").expect("write broken snapshot");

    let output = run(&[
        "compare",
        "--baseline",
        arg(&baseline),
        "--current",
        arg(&broken),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(matches!(parse_json(&output.stdout), LvrOutput::Error(_)));
}

#[test]
fn compare_accepts_config_flag_and_still_passes() {
    let dir = TempDir::new().expect("tempdir");
    let baseline = write_snapshot(dir.path(), "baseline.json", &page(false, 100.0));
    let current = write_snapshot(dir.path(), "current.json", &page(false, 104.0));
    let cfg_path = dir.path().join("lvr.toml");
    std::fs::write(&cfg_path, "[compare]\nthreshold = 5\n").expect("write config");

    let output = run(&[
        "--config",
        arg(&cfg_path),
        "compare",
        "--baseline",
        arg(&baseline),
        "--current",
        arg(&current),
    ]);
    assert_eq!(output.status.code(), Some(0));

    match parse_json(&output.stdout) {
        LvrOutput::Compare(out) => assert!(out.result.differences.is_empty()),
        other => panic!("expected compare output, got {other:?}"),
    }
}

#[test]
fn compare_applies_thresholds_from_yaml_config() {
    let dir = TempDir::new().expect("tempdir");
    let baseline = write_snapshot(dir.path(), "baseline.json", &page(false, 100.0));
    let current = write_snapshot(dir.path(), "current.json", &page(true, 100.0));
    let cfg_path = dir.path().join("lvr.yaml");
    std::fs::write(&cfg_path, "thresholds:\n  elementCount:\n    maxAdded: 0\n")
        .expect("write config");

    let output = run(&[
        "compare",
        "--config",
        arg(&cfg_path),
        "--baseline",
        arg(&baseline),
        "--current",
        arg(&current),
    ]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn invalid_config_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let baseline = write_snapshot(dir.path(), "baseline.json", &page(false, 100.0));
    let cfg_path = dir.path().join("lvr.toml");
    std::fs::write(&cfg_path, "[compare]\nthreshold = -1\n").expect("write config");

    let output = run(&[
        "--config",
        arg(&cfg_path),
        "compare",
        "--baseline",
        arg(&baseline),
        "--current",
        arg(&baseline),
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn calibrate_with_one_sample_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let sample = write_snapshot(dir.path(), "s1.json", &page(false, 100.0));

    let output = run(&["calibrate", arg(&sample)]);
    assert_eq!(output.status.code(), Some(2));

    match parse_json(&output.stdout) {
        LvrOutput::Error(err) => {
            assert!(
                err.error.message.contains("got 1"),
                "expected sample count in message, got {}",
                err.error.message
            );
        }
        other => panic!("expected error output, got {other:?}"),
    }
}

#[test]
fn calibrate_reports_tolerances_for_noisy_samples() {
    let dir = TempDir::new().expect("tempdir");
    let samples: Vec<PathBuf> = [100.0, 110.0, 105.0]
        .iter()
        .enumerate()
        .map(|(i, y)| write_snapshot(dir.path(), &format!("s{i}.json"), &page(false, *y)))
        .collect();

    let output = run(&[
        "calibrate",
        arg(&samples[0]),
        arg(&samples[1]),
        arg(&samples[2]),
        "--strictness",
        "high",
    ]);
    assert_eq!(output.status.code(), Some(0));

    match parse_json(&output.stdout) {
        LvrOutput::Calibrate(out) => {
            assert_eq!(out.samples.len(), 3);
            assert!(out.calibration.settings.position_tolerance >= 10.0);
        }
        other => panic!("expected calibrate output, got {other:?}"),
    }
}

#[test]
fn analyze_prints_statistics() {
    let dir = TempDir::new().expect("tempdir");
    let snapshot = write_snapshot(dir.path(), "page.json", &page(true, 100.0));
    let report = dir.path().join("report.json");

    let output = run(&["analyze", arg(&snapshot), "--output", arg(&report)]);
    assert_eq!(output.status.code(), Some(0));

    let written = std::fs::read(&report).expect("report written");
    match parse_json(&written) {
        LvrOutput::Analyze(out) => {
            assert_eq!(out.statistics.total_elements, 4);
            assert!(!out.groups.is_empty());
        }
        other => panic!("expected analyze output, got {other:?}"),
    }
}

#[test]
fn pretty_format_emits_json_when_not_a_terminal() {
    let dir = TempDir::new().expect("tempdir");
    let baseline = write_snapshot(dir.path(), "baseline.json", &page(false, 100.0));

    let output = run(&[
        "compare",
        "--baseline",
        arg(&baseline),
        "--current",
        arg(&baseline),
        "--format",
        "pretty",
    ]);
    assert_eq!(output.status.code(), Some(0));
    let pretty: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("pretty output should be JSON");
    assert_eq!(pretty.get("mode").and_then(|v| v.as_str()), Some("compare"));
    assert_eq!(pretty.get("passed").and_then(|v| v.as_bool()), Some(true));
}
