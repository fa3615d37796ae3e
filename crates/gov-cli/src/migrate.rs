//! # Migrate Subcommand
//!
//! Rewrites a policy document from one schema version to another using the
//! migration table, then writes the result to `--output` or stdout. The
//! input file is never modified.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use gov_core::{load_document, render_document, DocumentFormat, SchemaVersion};
use gov_schema::declared_version;

use crate::config::GovConfig;

/// Arguments for `govern migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Policy document to migrate.
    pub file: PathBuf,

    /// Source version. Defaults to the document's declared `apiVersion`.
    #[arg(long)]
    pub from: Option<SchemaVersion>,

    /// Target version. Defaults to the newest version in the migration table.
    #[arg(long)]
    pub to: Option<SchemaVersion>,

    /// Write the migrated document here instead of stdout. The format
    /// follows the file extension.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Validate the migrated document against the target version.
    #[arg(long)]
    pub check: bool,
}

/// Execute `govern migrate`.
///
/// Returns 1 only when `--check` is given and the migrated document is
/// invalid. A missing migration path is an error.
pub fn run_migrate(args: &MigrateArgs, config: &GovConfig) -> Result<u8> {
    let migrator = config.migrator()?;
    let document = load_document(&args.file)?;

    let Some(from) = args.from.or_else(|| declared_version(&document)) else {
        bail!(
            "{} has no parseable apiVersion; pass --from",
            args.file.display()
        );
    };
    let Some(to) = args.to.or_else(|| migrator.latest_version()) else {
        bail!("migration table is empty; pass --to");
    };

    let migrated = migrator
        .migrate(&document, from, to)
        .with_context(|| format!("failed to migrate {}", args.file.display()))?;
    tracing::info!(file = %args.file.display(), %from, %to, "policy migrated");

    let format = DocumentFormat::from_path(args.output.as_deref().unwrap_or(args.file.as_path()));
    let rendered = render_document(&migrated, format)?;
    match &args.output {
        Some(path) => std::fs::write(path, &rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{rendered}"),
    }

    if !args.check {
        return Ok(0);
    }
    let report = config.validator()?.validate_value(&migrated, to);
    for issue in &report.issues {
        eprintln!("  {issue}");
    }
    if report.valid {
        Ok(0)
    } else {
        eprintln!("FAIL: migrated document is not valid for {to}");
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1_0: &str = "\
apiVersion: governance/v1.0.0
kind: Policy
metadata:
  name: s3-encryption
  version: 1.0.0
  labels:
    team: storage
spec:
  target:
    resourceType: aws_s3_bucket
  rules:
    - name: encryption-enabled
      condition: $.encryption != null
      severity: high
";

    fn args(file: PathBuf, output: PathBuf) -> MigrateArgs {
        MigrateArgs {
            file,
            from: None,
            to: Some(SchemaVersion::new(1, 1, 0)),
            output: Some(output),
            check: true,
        }
    }

    #[test]
    fn migrates_labels_to_tags_and_checks_result() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("s3.yaml");
        let output = dir.path().join("s3-migrated.yaml");
        std::fs::write(&input, V1_0).unwrap();

        let code = run_migrate(&args(input.clone(), output.clone()), &GovConfig::default()).unwrap();
        assert_eq!(code, 0);

        let migrated = load_document(&output).unwrap();
        assert_eq!(migrated["apiVersion"], "governance/v1.1.0");
        assert_eq!(migrated["metadata"]["tags"]["team"], "storage");
        assert!(migrated["metadata"].get("labels").is_none());
        assert_eq!(migrated["spec"]["enforcement"], "enforce");

        // Input untouched.
        assert_eq!(std::fs::read_to_string(&input).unwrap(), V1_0);
    }

    #[test]
    fn json_output_follows_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("s3.yaml");
        let output = dir.path().join("s3.json");
        std::fs::write(&input, V1_0).unwrap();
        run_migrate(&args(input, output.clone()), &GovConfig::default()).unwrap();
        let raw = std::fs::read_to_string(&output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["kind"], "Policy");
    }

    #[test]
    fn unknown_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("s3.yaml");
        let output = dir.path().join("out.yaml");
        std::fs::write(&input, V1_0).unwrap();
        let mut a = args(input, output.clone());
        a.to = Some(SchemaVersion::new(2, 0, 0));
        let err = run_migrate(&a, &GovConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("no migration path"));
        assert!(!output.exists());
    }

    #[test]
    fn check_reports_invalid_result() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bare.yaml");
        std::fs::write(&input, "apiVersion: governance/v1.0.0\nkind: Policy\nspec: {}\n").unwrap();
        let code = run_migrate(
            &args(input, dir.path().join("out.yaml")),
            &GovConfig::default(),
        )
        .unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn missing_version_requires_from() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bare.yaml");
        std::fs::write(&input, "kind: Policy\n").unwrap();
        let a = args(input, dir.path().join("out.yaml"));
        assert!(run_migrate(&a, &GovConfig::default()).is_err());
    }
}
