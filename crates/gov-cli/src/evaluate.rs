//! # Evaluate Subcommand
//!
//! Loads every policy under `--policies`, validates each one, registers the
//! valid ones, and evaluates the resources in `--resources` against them.
//!
//! The resources file is a YAML or JSON sequence of resource documents
//! (`{id, type, properties}`); a single mapping is treated as a list of one.
//! Evaluation refuses to run when any policy file is invalid, or when two
//! files declare the same policy name, since a skipped or shadowed policy
//! would let resources pass that it should have blocked.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use gov_core::{find_documents, load_document, load_resources, Policy, SchemaVersion};
use gov_engine::{EvaluationResult, Registration, RulesEngine};
use gov_schema::{declared_version, PolicyValidator};

use crate::config::GovConfig;

/// Arguments for `govern evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Policy files or directories.
    #[arg(short, long, required = true, num_args = 1..)]
    pub policies: Vec<PathBuf>,

    /// Resources file (YAML or JSON sequence).
    #[arg(short, long)]
    pub resources: PathBuf,

    /// Validate policies against this schema version instead of their
    /// declared `apiVersion`.
    #[arg(long)]
    pub schema_version: Option<SchemaVersion>,

    /// Worker threads. Defaults to the configured value or available
    /// parallelism.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Exit 1 on any violation, including those from `audit` policies.
    #[arg(long)]
    pub strict: bool,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute `govern evaluate`.
///
/// Returns 1 when a resource is blocked (any violation under `--strict`),
/// 0 otherwise.
pub fn run_evaluate(args: &EvaluateArgs, config: &GovConfig) -> Result<u8> {
    let validator = config.validator()?;
    let engine = RulesEngine::new();
    let mut sources = BTreeMap::new();
    for path in &args.policies {
        load_policies(
            &engine,
            &validator,
            &mut sources,
            path,
            args.schema_version,
            config,
        )?;
    }
    if engine.is_empty() {
        bail!("no policies loaded");
    }

    let resources = load_resources(&args.resources)?;
    let workers = args.workers.unwrap_or_else(|| config.workers());
    let results = engine.evaluate_batch(&resources, workers);
    tracing::info!(
        policies = engine.len(),
        resources = results.len(),
        workers,
        "evaluation finished"
    );

    if args.json {
        let rendered = serde_json::to_string_pretty(&results)
            .context("failed to serialize evaluation results")?;
        println!("{rendered}");
    } else {
        print_text(&results);
    }

    let failing = results
        .iter()
        .filter(|r| if args.strict { !r.passed } else { r.is_blocking() })
        .count();
    Ok(if failing == 0 { 0 } else { 1 })
}

/// Policy id to the file that declared it.
type PolicySources = BTreeMap<String, PathBuf>;

fn load_policies(
    engine: &RulesEngine,
    validator: &PolicyValidator,
    sources: &mut PolicySources,
    root: &Path,
    target: Option<SchemaVersion>,
    config: &GovConfig,
) -> Result<()> {
    if !root.exists() {
        bail!("path does not exist: {}", root.display());
    }
    let mut invalid = 0usize;
    for path in find_documents(root) {
        let document = load_document(&path)?;
        let version = target
            .or_else(|| declared_version(&document))
            .unwrap_or(config.default_schema_version);
        let report = validator.validate_value(&document, version);
        if !report.valid {
            invalid += 1;
            eprintln!("FAIL: {}", path.display());
            for issue in report.errors() {
                eprintln!("  {issue}");
            }
            continue;
        }
        let policy = Policy::from_value(&document)
            .with_context(|| format!("failed to decode policy {}", path.display()))?;
        let id = policy.id().to_string();
        if let Some(first) = sources.get(&id) {
            bail!(
                "policy '{id}' is declared by both {} and {}; refusing to evaluate",
                first.display(),
                path.display()
            );
        }
        let registration = engine
            .register_policy(policy)
            .with_context(|| format!("failed to register policy {}", path.display()))?;
        if registration == Registration::Replaced {
            bail!(
                "policy '{id}' from {} replaced an already registered policy; refusing to evaluate",
                path.display()
            );
        }
        sources.insert(id, path);
    }
    if invalid > 0 {
        bail!(
            "{invalid} policy file(s) under {} failed validation; refusing to evaluate",
            root.display()
        );
    }
    Ok(())
}

fn print_text(results: &[EvaluationResult]) {
    for (i, result) in results.iter().enumerate() {
        let label = result
            .resource_id
            .clone()
            .unwrap_or_else(|| format!("#{i}"));
        let status = if result.passed {
            "PASS"
        } else if result.is_blocking() {
            "BLOCK"
        } else {
            "WARN"
        };
        println!("{status}: {label} ({})", result.resource_type);
        for v in &result.violations {
            println!(
                "  [{}] {}/{}: {} ({})",
                v.severity, v.policy_id, v.rule_name, v.message, v.enforcement
            );
            if let Some(error) = &v.error {
                println!("    {error}");
            }
        }
    }
    let passed = results.iter().filter(|r| r.passed).count();
    println!();
    println!("Resources: {passed}/{} passed", results.len());
}
