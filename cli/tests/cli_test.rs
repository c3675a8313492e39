//! Integration tests for the pdfpyramid binary.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn pdfpyramid(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pdfpyramid"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("PDFPYRAMID_THREADS")
        .env_remove("PDFPYRAMID_OUTPUT")
        .output()
        .expect("failed to run pdfpyramid")
}

fn geometry<'a>(width: &'a str, unit: &'a str) -> Vec<&'a str> {
    vec![
        "--width",
        width,
        "--height",
        "100",
        "--reference-size",
        "1",
        "--unit",
        unit,
        "--units-per-meter",
        "64",
        "--tile-size",
        "50",
    ]
}

fn generate(input: &Path, output: &Path, width: &str, unit: &str) -> Output {
    let input = input.to_string_lossy().into_owned();
    let output = output.to_string_lossy().into_owned();
    let mut args = vec!["generate", input.as_str(), "--output", output.as_str()];
    args.extend(geometry(width, unit));
    pdfpyramid(&args)
}

#[test]
fn test_units_lists_every_unit() {
    let out = pdfpyramid(&["units"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    for name in ["millimeter", "meter", "kilometer", "inch", "foot", "yard", "mile"] {
        assert!(stdout.contains(name), "missing {}", name);
    }
}

#[test]
fn test_plan_json() {
    let mut args = vec!["plan", "--json"];
    args.extend(geometry("100", "meter"));
    let out = pdfpyramid(&args);
    assert!(out.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let levels = plan["levels"].as_array().unwrap();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0]["columns"], 1);
    assert_eq!(levels[1]["columns"], 2);
    assert_eq!(levels[1]["rows"], 2);
}

#[test]
fn test_invalid_number_exits_with_validation_status() {
    let tmp = tempdir().unwrap();
    let output = tmp.path().join("out");
    let out = generate(&tmp.path().join("plan.pdf"), &output, "wide", "meter");

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("width"));
    assert!(!output.exists());
}

#[test]
fn test_unknown_unit_lists_valid_units() {
    let tmp = tempdir().unwrap();
    let output = tmp.path().join("out");
    let out = generate(&tmp.path().join("plan.pdf"), &output, "100", "furlong");

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("furlong is not a valid unit name"));
    assert!(stderr.contains("millimeter"));
    assert!(!output.exists());
}

#[test]
fn test_non_pdf_input_is_rejected_before_output() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("notes.pdf");
    std::fs::write(&input, b"just text").unwrap();
    let output = tmp.path().join("out");

    let out = generate(&input, &output, "100", "meter");
    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists());
}

#[test]
fn test_compress_missing_dir() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("nothing");
    let out = pdfpyramid(&["compress", dir.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_missing_unit_exits_with_validation_status() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("plan.pdf");
    let out = pdfpyramid(&[
        "generate",
        input.to_str().unwrap(),
        "--width",
        "100",
        "--height",
        "100",
        "--reference-size",
        "1",
        "--units-per-meter",
        "64",
    ]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("--unit"));
    assert!(stderr.contains("millimeter"));
}

#[test]
fn test_missing_plan_flag_exits_with_validation_status() {
    let out = pdfpyramid(&[
        "plan", "--width", "100", "--height", "100", "--reference-size", "1", "--unit", "meter",
    ]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("--units-per-meter"));
    assert!(!stderr.contains("Please choose a unit"));
}

#[test]
fn test_help_still_succeeds() {
    let out = pdfpyramid(&["--help"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("generate"));
}
