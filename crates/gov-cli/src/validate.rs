//! # Validate Subcommand
//!
//! Validates policy files against their schema version and prints one
//! line per file followed by its issues. Directories are walked
//! recursively for `*.yaml`, `*.yml`, and `*.json` files.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use gov_core::SchemaVersion;
use gov_schema::{FileReport, FileValidationResult, PolicyValidator};
use serde::Serialize;

use crate::config::GovConfig;

/// Arguments for `govern validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Policy files or directories to validate.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Validate against this schema version instead of each document's
    /// declared `apiVersion`.
    #[arg(long)]
    pub schema_version: Option<SchemaVersion>,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Machine-readable result for one file.
#[derive(Debug, Serialize)]
struct JsonFileResult<'a> {
    path: String,
    #[serde(flatten)]
    result: Option<&'a FileValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Execute `govern validate`.
///
/// Returns 0 when every file is valid, 1 otherwise. Advisory issues are
/// printed but never change the exit code.
pub fn run_validate(args: &ValidateArgs, config: &GovConfig) -> Result<u8> {
    let validator = config.validator()?;
    let mut reports = Vec::new();
    for path in &args.paths {
        reports.extend(collect(&validator, path, args.schema_version)?);
    }
    if reports.is_empty() {
        bail!("no policy documents found");
    }

    let failed = reports.iter().filter(|r| !r.passed()).count();
    if args.json {
        print_json(&reports)?;
    } else {
        print_text(&reports);
        println!();
        println!("Policies: {}/{} passed", reports.len() - failed, reports.len());
    }
    tracing::info!(total = reports.len(), failed, "validation finished");

    Ok(if failed == 0 { 0 } else { 1 })
}

fn collect(
    validator: &PolicyValidator,
    path: &Path,
    target: Option<SchemaVersion>,
) -> Result<Vec<FileReport>> {
    if path.is_dir() {
        return Ok(validator.validate_dir(path, target).results);
    }
    if !path.is_file() {
        bail!("path does not exist: {}", path.display());
    }
    Ok(vec![FileReport {
        path: path.to_path_buf(),
        outcome: validator.validate_file(path, target),
    }])
}

fn print_text(reports: &[FileReport]) {
    for report in reports {
        match &report.outcome {
            Ok(result) => {
                let status = if result.valid { "OK" } else { "FAIL" };
                if result.policy_name.is_empty() {
                    println!("{status}: {}", report.path.display());
                } else {
                    println!("{status}: {} ({})", report.path.display(), result.policy_name);
                }
                for issue in &result.issues {
                    println!("  {issue}");
                }
            }
            Err(e) => println!("FAIL: {}: {e}", report.path.display()),
        }
    }
}

fn print_json(reports: &[FileReport]) -> Result<()> {
    let entries: Vec<JsonFileResult<'_>> = reports
        .iter()
        .map(|report| JsonFileResult {
            path: report.path.display().to_string(),
            result: report.outcome.as_ref().ok(),
            error: report.outcome.as_ref().err().map(|e| e.to_string()),
        })
        .collect();
    let rendered =
        serde_json::to_string_pretty(&entries).context("failed to serialize validation results")?;
    println!("{rendered}");
    Ok(())
}
