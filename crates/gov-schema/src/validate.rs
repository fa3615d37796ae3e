//! # Policy Validation
//!
//! Checks a raw policy document against a target schema version and
//! reports every defect found, in a fixed order:
//!
//! 1. **Structural**: `apiVersion`, `kind`, `metadata`, `spec` and their
//!    required fields, then the version's field layout.
//! 2. **Referential**: per rule, in document order: `name` and `condition`
//!    present, names unique, condition compiles.
//! 3. **Enumeration**: unrecognized severity values (warnings).
//! 4. **Best practice**: missing description, rules with no severity
//!    (informational).
//!
//! Validation never stops at the first defect and never fails as a call:
//! a document is valid iff no [`IssueSeverity::Error`] issue was produced.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gov_condition::{default_compiler, ConditionCompiler};
use gov_core::{
    find_documents, load_document, ApiVersion, Enforcement, PolicySeverity, PolicyVersion,
    SchemaVersion, DEFAULT_NAMESPACE, POLICY_KIND,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::layout::{LayoutRegistry, V1_0_0};

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// How serious a validation issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueSeverity {
    /// The document is invalid.
    Error,
    /// Advisory: a value is present but unexpected.
    Warning,
    /// Advisory: a recommended field is missing.
    Info,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        })
    }
}

/// One finding about a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Error, warning, or info.
    pub severity: IssueSeverity,
    /// Human-readable description.
    pub message: String,
    /// Dotted location of the offending field, e.g. `spec.rules[2].name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {}: {}", self.severity, path, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

/// Accumulates issues in discovery order.
#[derive(Debug, Default)]
struct IssueCollector {
    issues: Vec<ValidationIssue>,
}

impl IssueCollector {
    fn push(&mut self, severity: IssueSeverity, path: Option<String>, message: String) {
        self.issues.push(ValidationIssue {
            severity,
            message,
            path,
        });
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.push(IssueSeverity::Error, Some(path.into()), message.into());
    }

    fn error_at_root(&mut self, message: impl Into<String>) {
        self.push(IssueSeverity::Error, None, message.into());
    }

    fn warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.push(IssueSeverity::Warning, Some(path.into()), message.into());
    }

    fn info(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.push(IssueSeverity::Info, Some(path.into()), message.into());
    }

    fn missing(&mut self, path: &str) {
        self.error(path, format!("missing required field: {path}"));
    }

    fn finish(self) -> ValidationReport {
        let valid = !self
            .issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Error);
        ValidationReport {
            valid,
            issues: self.issues,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of validating one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff no issue is an error.
    pub valid: bool,
    /// Every issue, in discovery order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Error-level issues.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.with_severity(IssueSeverity::Error)
    }

    /// Warning-level issues.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.with_severity(IssueSeverity::Warning)
    }

    /// Info-level issues.
    pub fn infos(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.with_severity(IssueSeverity::Info)
    }

    fn with_severity(&self, severity: IssueSeverity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }
}

/// Outcome of validating one policy file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileValidationResult {
    /// True iff no issue is an error.
    pub valid: bool,
    /// `metadata.name`, or empty when absent.
    pub policy_name: String,
    /// Every issue, in discovery order.
    pub issues: Vec<ValidationIssue>,
}

/// A file found during a directory walk, with its result.
#[derive(Debug)]
pub struct FileReport {
    /// Path of the policy file.
    pub path: PathBuf,
    /// Validation result, or why the file could not be loaded.
    pub outcome: Result<FileValidationResult, SchemaError>,
}

impl FileReport {
    /// Whether the file loaded and validated cleanly.
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, Ok(result) if result.valid)
    }
}

/// Result of validating every policy file under a directory.
#[derive(Debug)]
pub struct DirectoryValidationReport {
    /// Number of policy files found.
    pub total: usize,
    /// Number that loaded and validated.
    pub passed: usize,
    /// Number that failed to load or were invalid.
    pub failed: usize,
    /// Per-file results, in path order.
    pub results: Vec<FileReport>,
}

impl DirectoryValidationReport {
    /// Files that failed to load or were invalid.
    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.results.iter().filter(|r| !r.passed())
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Validates policy documents against a schema version.
///
/// Stateless with respect to documents; one instance can be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct PolicyValidator {
    compiler: Arc<dyn ConditionCompiler>,
    layouts: Arc<LayoutRegistry>,
    namespace: String,
    default_version: SchemaVersion,
}

impl PolicyValidator {
    /// A validator using the JSONPath compiler, the built-in layouts, the
    /// `governance` namespace, and `v1.0.0` as the fallback version.
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            compiler: default_compiler(),
            layouts: Arc::new(LayoutRegistry::builtin()?),
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_version: V1_0_0,
        })
    }

    /// Use a different condition compiler.
    pub fn with_compiler(mut self, compiler: Arc<dyn ConditionCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Expect a different `apiVersion` namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Version used by [`validate_file`](Self::validate_file) when neither
    /// the caller nor the document names one.
    pub fn with_default_version(mut self, version: SchemaVersion) -> Self {
        self.default_version = version;
        self
    }

    /// Expected `apiVersion` namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Schema versions this validator has layouts for.
    pub fn supported_versions(&self) -> Vec<SchemaVersion> {
        self.layouts.versions()
    }

    /// Validate `document` against `target`, returning the verdict and the
    /// ordered issue list.
    pub fn validate(
        &self,
        document: &Value,
        target: SchemaVersion,
    ) -> (bool, Vec<ValidationIssue>) {
        let report = self.validate_value(document, target);
        (report.valid, report.issues)
    }

    /// Validate `document` against `target`.
    pub fn validate_value(&self, document: &Value, target: SchemaVersion) -> ValidationReport {
        let mut issues = IssueCollector::default();

        let Some(root) = document.as_object() else {
            issues.error_at_root(format!(
                "policy document must be a mapping, found {}",
                type_name(document)
            ));
            return issues.finish();
        };

        self.check_structure(root, document, target, &mut issues);
        let rules = root
            .get("spec")
            .and_then(|s| s.get("rules"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        self.check_rules(rules, &mut issues);
        check_severities(root, rules, &mut issues);
        check_best_practices(root, rules, &mut issues);

        let report = issues.finish();
        tracing::debug!(
            target_version = %target,
            valid = report.valid,
            errors = report.errors().count(),
            warnings = report.warnings().count(),
            infos = report.infos().count(),
            "policy validated"
        );
        report
    }

    /// Load and validate a policy file.
    ///
    /// When `target` is `None` the document's own `apiVersion` decides; if
    /// that is absent or malformed, the validator's default version is used
    /// and the structural check reports the `apiVersion` problem.
    pub fn validate_file(
        &self,
        path: &Path,
        target: Option<SchemaVersion>,
    ) -> Result<FileValidationResult, SchemaError> {
        let document = load_document(path)?;
        let target = target
            .or_else(|| declared_version(&document))
            .unwrap_or(self.default_version);
        let report = self.validate_value(&document, target);
        let policy_name = document
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(FileValidationResult {
            valid: report.valid,
            policy_name,
            issues: report.issues,
        })
    }

    /// Validate every `*.yaml`, `*.yml`, and `*.json` file under `dir`.
    pub fn validate_dir(
        &self,
        dir: &Path,
        target: Option<SchemaVersion>,
    ) -> DirectoryValidationReport {
        let results: Vec<FileReport> = find_documents(dir)
            .into_iter()
            .map(|path| {
                let outcome = self.validate_file(&path, target);
                if let Err(e) = &outcome {
                    tracing::warn!(path = %path.display(), error = %e, "policy file failed to load");
                }
                FileReport { path, outcome }
            })
            .collect();
        let passed = results.iter().filter(|r| r.passed()).count();
        DirectoryValidationReport {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            results,
        }
    }

    // -----------------------------------------------------------------------
    // Structural
    // -----------------------------------------------------------------------

    fn check_structure(
        &self,
        root: &Map<String, Value>,
        document: &Value,
        target: SchemaVersion,
        issues: &mut IssueCollector,
    ) {
        self.check_api_version(root.get("apiVersion"), target, issues);

        match root.get("kind") {
            None => issues.missing("kind"),
            Some(Value::String(kind)) if kind == POLICY_KIND => {}
            Some(other) => issues.error(
                "kind",
                format!("kind must be '{POLICY_KIND}', found {}", display_value(other)),
            ),
        }

        match root.get("metadata") {
            None => issues.missing("metadata"),
            Some(Value::Object(metadata)) => {
                require_string(metadata, "metadata", "name", issues);
                match metadata.get("version") {
                    None => issues.missing("metadata.version"),
                    Some(Value::String(v)) if PolicyVersion::parse(v).is_ok() => {}
                    Some(other) => issues.error(
                        "metadata.version",
                        format!(
                            "metadata.version must be a semantic version string, found {}",
                            display_value(other)
                        ),
                    ),
                }
            }
            Some(other) => issues.error(
                "metadata",
                format!("metadata must be a mapping, found {}", type_name(other)),
            ),
        }

        match root.get("spec") {
            None => issues.missing("spec"),
            Some(Value::Object(spec)) => {
                match spec.get("target") {
                    None => issues.missing("spec.target"),
                    Some(Value::Object(target)) => {
                        require_string(target, "spec.target", "resourceType", issues);
                    }
                    Some(other) => issues.error(
                        "spec.target",
                        format!("spec.target must be a mapping, found {}", type_name(other)),
                    ),
                }
                match spec.get("rules") {
                    None => issues.missing("spec.rules"),
                    Some(Value::Array(_)) => {}
                    Some(other) => issues.error(
                        "spec.rules",
                        format!("spec.rules must be a sequence, found {}", type_name(other)),
                    ),
                }
                if let Some(mode) = spec.get("enforcement") {
                    if mode.as_str().and_then(Enforcement::parse).is_none() {
                        issues.error(
                            "spec.enforcement",
                            format!(
                                "invalid enforcement mode {} (expected enforce or audit)",
                                display_value(mode)
                            ),
                        );
                    }
                }
            }
            Some(other) => issues.error(
                "spec",
                format!("spec must be a mapping, found {}", type_name(other)),
            ),
        }

        match self.layouts.check(&target, document) {
            Some(violations) => {
                for v in violations {
                    let path = if v.path.is_empty() { "$".to_string() } else { v.path };
                    issues.error(path, format!("field layout ({target}): {}", v.message));
                }
            }
            None => issues.error_at_root(format!(
                "unsupported schema version {target} (supported: {})",
                join_versions(&self.layouts.versions())
            )),
        }
    }

    fn check_api_version(
        &self,
        raw: Option<&Value>,
        target: SchemaVersion,
        issues: &mut IssueCollector,
    ) {
        let Some(raw) = raw else {
            issues.missing("apiVersion");
            return;
        };
        let parsed = raw.as_str().map(ApiVersion::parse);
        match parsed {
            Some(Ok(api)) => {
                if api.namespace != self.namespace {
                    issues.error(
                        "apiVersion",
                        format!(
                            "apiVersion namespace '{}' does not match expected '{}'",
                            api.namespace, self.namespace
                        ),
                    );
                }
                if api.version != target {
                    issues.error(
                        "apiVersion",
                        format!(
                            "apiVersion declares schema {} but validation targets {target}",
                            api.version
                        ),
                    );
                }
            }
            _ => issues.error(
                "apiVersion",
                format!(
                    "invalid apiVersion {} (expected <namespace>/<version>)",
                    display_value(raw)
                ),
            ),
        }
    }

    // -----------------------------------------------------------------------
    // Referential
    // -----------------------------------------------------------------------

    fn check_rules(&self, rules: &[Value], issues: &mut IssueCollector) {
        let mut seen: HashSet<&str> = HashSet::with_capacity(rules.len());
        for (idx, rule) in rules.iter().enumerate() {
            let at = format!("spec.rules[{idx}]");
            let Some(rule) = rule.as_object() else {
                issues.error(
                    at,
                    format!("rule must be a mapping, found {}", type_name(rule)),
                );
                continue;
            };

            let name = match rule.get("name") {
                Some(Value::String(name)) if !name.trim().is_empty() => {
                    if !seen.insert(name.as_str()) {
                        issues.error(format!("{at}.name"), format!("duplicate rule name: {name}"));
                    }
                    Some(name.as_str())
                }
                None => {
                    issues.error(
                        format!("{at}.name"),
                        format!("rule at index {idx} is missing required field: name"),
                    );
                    None
                }
                Some(other) => {
                    issues.error(
                        format!("{at}.name"),
                        format!(
                            "rule name must be a non-empty string, found {}",
                            display_value(other)
                        ),
                    );
                    None
                }
            };
            let label = name.map_or_else(|| format!("#{idx}"), str::to_string);

            match rule.get("condition") {
                None => issues.error(
                    format!("{at}.condition"),
                    format!("rule '{label}' is missing required field: condition"),
                ),
                Some(Value::String(condition)) => {
                    if let Err(e) = self.compiler.compile(condition) {
                        issues.error(
                            format!("{at}.condition"),
                            format!("invalid JSONPath expression in rule '{label}': {e}"),
                        );
                    }
                }
                Some(other) => issues.error(
                    format!("{at}.condition"),
                    format!(
                        "rule '{label}' condition must be a JSONPath string, found {}",
                        type_name(other)
                    ),
                ),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Enumeration and best practice
// ---------------------------------------------------------------------------

fn check_severities(root: &Map<String, Value>, rules: &[Value], issues: &mut IssueCollector) {
    if let Some(severity) = root.get("metadata").and_then(|m| m.get("severity")) {
        check_severity_value(severity, "metadata.severity".to_string(), issues);
    }
    for (idx, rule) in rules.iter().enumerate() {
        if let Some(severity) = rule.get("severity") {
            check_severity_value(severity, format!("spec.rules[{idx}].severity"), issues);
        }
    }
}

fn check_severity_value(value: &Value, path: String, issues: &mut IssueCollector) {
    if value.as_str().and_then(PolicySeverity::parse).is_none() {
        let expected: Vec<&str> = PolicySeverity::ALL.iter().map(|s| s.as_str()).collect();
        issues.warning(
            path,
            format!(
                "unusual severity value {} (expected one of {})",
                display_value(value),
                expected.join(", ")
            ),
        );
    }
}

fn check_best_practices(root: &Map<String, Value>, rules: &[Value], issues: &mut IssueCollector) {
    if let Some(Value::Object(metadata)) = root.get("metadata") {
        if !metadata.contains_key("description") {
            issues.info(
                "metadata.description",
                "missing recommended field: metadata.description",
            );
        }
    }
    // Rules carrying a message are not flagged for a missing severity.
    for (idx, rule) in rules.iter().enumerate() {
        let Some(rule) = rule.as_object() else {
            continue;
        };
        if !rule.contains_key("severity") && !rule.contains_key("message") {
            let label = rule
                .get("name")
                .and_then(Value::as_str)
                .map_or_else(|| format!("#{idx}"), str::to_string);
            issues.info(
                format!("spec.rules[{idx}].severity"),
                format!("missing recommended field: severity in rule '{label}'"),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_string(
    parent: &Map<String, Value>,
    parent_path: &str,
    field: &str,
    issues: &mut IssueCollector,
) {
    let path = format!("{parent_path}.{field}");
    match parent.get(field) {
        None => issues.missing(&path),
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        Some(other) => issues.error(
            path.clone(),
            format!("{path} must be a non-empty string, found {}", display_value(other)),
        ),
    }
}

/// The schema version a document declares in `apiVersion`, if parseable.
pub fn declared_version(document: &Value) -> Option<SchemaVersion> {
    document
        .get("apiVersion")
        .and_then(Value::as_str)
        .and_then(|raw| ApiVersion::parse(raw).ok())
        .map(|api| api.version)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn join_versions(versions: &[SchemaVersion]) -> String {
    versions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_condition::fake::{FakeCompiler, FakeOutcome};
    use proptest::prelude::*;
    use serde_json::json;

    fn validator() -> PolicyValidator {
        PolicyValidator::new().unwrap()
    }

    fn base_policy() -> Value {
        json!({
            "apiVersion": "governance/v1.0.0",
            "kind": "Policy",
            "metadata": {
                "name": "test-policy",
                "version": "1.0.0",
                "description": "Test policy"
            },
            "spec": {
                "target": {"resourceType": "aws_s3_bucket"},
                "rules": [{
                    "name": "test-rule",
                    "condition": "$.encryption != null",
                    "message": "Must have encryption"
                }]
            }
        })
    }

    fn messages(issues: &[ValidationIssue]) -> Vec<String> {
        issues.iter().map(|i| i.message.to_lowercase()).collect()
    }

    #[test]
    fn complete_policy_has_no_issues() {
        let (valid, issues) = validator().validate(&base_policy(), V1_0_0);
        assert!(valid, "{issues:?}");
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn missing_metadata_and_spec_are_errors() {
        let doc = json!({"apiVersion": "governance/v1.0.0", "kind": "Policy"});
        let report = validator().validate_value(&doc, V1_0_0);
        assert!(!report.valid);
        let paths: Vec<_> = report.errors().filter_map(|i| i.path.as_deref()).collect();
        assert!(paths.contains(&"metadata"));
        assert!(paths.contains(&"spec"));
    }

    #[test]
    fn non_mapping_document_is_one_error() {
        let report = validator().validate_value(&json!(["not", "a", "policy"]), V1_0_0);
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].message.contains("mapping"));
    }

    #[test]
    fn container_shape_defects_are_reported_once() {
        let mut doc = base_policy();
        doc["metadata"] = json!("oops");
        doc["spec"]["rules"] = json!("nope");
        let report = validator().validate_value(&doc, V1_0_0);
        let paths: Vec<_> = report.errors().filter_map(|i| i.path.as_deref()).collect();
        assert_eq!(paths, vec!["metadata", "spec.rules"]);

        let mut doc = base_policy();
        doc["spec"]["rules"] = json!(["not-a-rule"]);
        let report = validator().validate_value(&doc, V1_0_0);
        let errors: Vec<_> = report.errors().map(|i| i.message.as_str()).collect();
        assert_eq!(errors, vec!["rule must be a mapping, found string"]);
    }

    #[test]
    fn metadata_version_accepts_full_semver() {
        let mut doc = base_policy();
        for version in ["1.2.0-rc.1", "0.1.0+build.5", "2.0.0-alpha.1+sha.abc"] {
            doc["metadata"]["version"] = json!(version);
            let (valid, issues) = validator().validate(&doc, V1_0_0);
            assert!(valid, "{version}: {issues:?}");
        }
        for version in ["1.0", "v1.0.0", "1.0.0-"] {
            doc["metadata"]["version"] = json!(version);
            let report = validator().validate_value(&doc, V1_0_0);
            assert!(!report.valid, "{version} should be rejected");
            assert_eq!(
                report.errors().next().and_then(|i| i.path.as_deref()),
                Some("metadata.version")
            );
        }
    }

    #[test]
    fn duplicate_rule_names_reported_on_second_occurrence() {
        let mut doc = base_policy();
        doc["spec"]["rules"] = json!([
            {"name": "same-name", "condition": "$.encryption != null", "severity": "high"},
            {"name": "same-name", "condition": "$.versioning == true", "severity": "high"},
            {"name": "same-name", "condition": "$.logging == true", "severity": "high"}
        ]);
        let (valid, issues) = validator().validate(&doc, V1_0_0);
        assert!(!valid);
        let dups: Vec<_> = issues
            .iter()
            .filter(|i| i.message.contains("duplicate rule name: same-name"))
            .collect();
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].path.as_deref(), Some("spec.rules[1].name"));
    }

    #[test]
    fn invalid_condition_mentions_jsonpath() {
        let mut doc = base_policy();
        doc["spec"]["rules"][0]["condition"] = json!("invalid jsonpath!!!");
        let (valid, issues) = validator().validate(&doc, V1_0_0);
        assert!(!valid);
        assert!(messages(&issues).iter().any(|m| m.contains("jsonpath")));
        assert_eq!(issues[0].path.as_deref(), Some("spec.rules[0].condition"));
    }

    #[test]
    fn best_practice_advisories_keep_policy_valid() {
        let doc = json!({
            "apiVersion": "governance/v1.0.0",
            "kind": "Policy",
            "metadata": {"name": "test-policy", "version": "1.0.0"},
            "spec": {
                "target": {"resourceType": "aws_s3_bucket"},
                "rules": [{"name": "test-rule", "condition": "$.encryption != null"}]
            }
        });
        let report = validator().validate_value(&doc, V1_0_0);
        assert!(report.valid);
        assert_eq!(report.infos().count(), 2);
        let msgs = messages(&report.issues);
        assert!(msgs.iter().any(|m| m.contains("description")));
        assert!(msgs.iter().any(|m| m.contains("severity")));
    }

    #[test]
    fn unusual_severity_is_a_warning() {
        let mut doc = base_policy();
        doc["metadata"]["severity"] = json!("unknown-severity");
        doc["spec"]["rules"][0]["severity"] = json!("invalid-severity");
        let report = validator().validate_value(&doc, V1_0_0);
        assert!(report.valid);
        let warnings: Vec<_> = report.warnings().collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings
            .iter()
            .all(|w| w.message.to_lowercase().contains("unusual severity")));
        assert_eq!(warnings[0].path.as_deref(), Some("metadata.severity"));
    }

    #[test]
    fn api_version_mismatches_are_errors() {
        let mut doc = base_policy();
        doc["apiVersion"] = json!("other/v1.1.0");
        let report = validator().validate_value(&doc, V1_0_0);
        let errs: Vec<_> = report.errors().map(|i| i.message.clone()).collect();
        assert_eq!(errs.len(), 2, "{errs:?}");
        assert!(errs[0].contains("namespace 'other'"));
        assert!(errs[1].contains("v1.1.0"));

        doc["apiVersion"] = json!("v1.0.0");
        let report = validator().validate_value(&doc, V1_0_0);
        assert!(report.errors().any(|i| i.message.contains("invalid apiVersion")));
    }

    #[test]
    fn custom_namespace() {
        let mut doc = base_policy();
        doc["apiVersion"] = json!("acme/v1.0.0");
        let v = validator().with_namespace("acme");
        assert_eq!(v.namespace(), "acme");
        assert!(v.validate_value(&doc, V1_0_0).valid);
    }

    #[test]
    fn wrong_kind_and_bad_enforcement() {
        let mut doc = base_policy();
        doc["kind"] = json!("Rule");
        doc["spec"]["enforcement"] = json!("block");
        let report = validator().validate_value(&doc, V1_0_0);
        let paths: Vec<_> = report.errors().filter_map(|i| i.path.clone()).collect();
        assert_eq!(paths, vec!["kind", "spec.enforcement"]);
    }

    #[test]
    fn layout_depends_on_target_version() {
        let mut doc = base_policy();
        doc["metadata"]["labels"] = json!({"env": "prod"});
        assert!(validator().validate_value(&doc, V1_0_0).valid);

        doc["apiVersion"] = json!("governance/v1.1.0");
        let report = validator().validate_value(&doc, crate::layout::V1_1_0);
        assert!(!report.valid);
        let err = report.errors().next().unwrap();
        assert_eq!(err.path.as_deref(), Some("metadata.labels"));
        assert!(err.message.contains("field layout (v1.1.0)"));
    }

    #[test]
    fn unsupported_target_version() {
        let mut doc = base_policy();
        doc["apiVersion"] = json!("governance/v2.0.0");
        let report = validator().validate_value(&doc, SchemaVersion::new(2, 0, 0));
        assert!(!report.valid);
        assert!(report
            .errors()
            .any(|i| i.message.contains("unsupported schema version v2.0.0")));
    }

    #[test]
    fn issue_order_follows_check_phases() {
        let doc = json!({
            "apiVersion": "governance/v1.0.0",
            "kind": "Policy",
            "metadata": {"name": "p", "version": "1.0.0", "severity": "urgent"},
            "spec": {
                "target": {"resourceType": "t"},
                "rules": [
                    {"name": "a", "condition": "$.x"},
                    {"condition": "$.y", "severity": "high"}
                ]
            }
        });
        let report = validator().validate_value(&doc, V1_0_0);
        let kinds: Vec<_> = report.issues.iter().map(|i| i.severity).collect();
        assert_eq!(
            kinds,
            vec![
                IssueSeverity::Error,   // rule #1 name
                IssueSeverity::Warning, // metadata.severity
                IssueSeverity::Info,    // description
                IssueSeverity::Info,    // rule a severity
            ]
        );
    }

    #[test]
    fn compiler_is_injected() {
        let compiler = FakeCompiler::new()
            .with("$.encryption != null", FakeOutcome::RejectCompile("nope".into()));
        let v = validator().with_compiler(Arc::new(compiler));
        let (valid, issues) = v.validate(&base_policy(), V1_0_0);
        assert!(!valid);
        assert!(issues[0].message.ends_with("at position 0: nope"));
    }

    #[test]
    fn validate_file_defaults_to_declared_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.yaml");
        let mut doc = base_policy();
        doc["apiVersion"] = json!("governance/v1.1.0");
        doc["metadata"]["name"] = json!("file-test");
        std::fs::write(&path, serde_yaml::to_string(&doc).unwrap()).unwrap();

        let result = validator().validate_file(&path, None).unwrap();
        assert!(result.valid, "{:?}", result.issues);
        assert_eq!(result.policy_name, "file-test");

        let result = validator().validate_file(&path, Some(V1_0_0)).unwrap();
        assert!(!result.valid);
    }

    #[test]
    fn validate_file_reports_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "metadata: [unclosed").unwrap();
        let err = validator().validate_file(&path, None).unwrap_err();
        assert!(matches!(err, SchemaError::DocumentLoad(_)));
        assert!(validator()
            .validate_file(&dir.path().join("absent.yaml"), None)
            .is_err());
    }

    #[test]
    fn validate_dir_counts_every_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            serde_json::to_string(&base_policy()).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("b.yaml"), "kind: Policy\n").unwrap();
        std::fs::write(dir.path().join("c.yaml"), "metadata: [unclosed").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let report = validator().validate_dir(dir.path(), None);
        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 2);
        let failed: Vec<_> = report
            .failures()
            .filter_map(|r| r.path.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(failed, vec!["b.yaml", "c.yaml"]);
    }

    #[test]
    fn issue_serializes_with_uppercase_severity() {
        let issue = ValidationIssue {
            severity: IssueSeverity::Warning,
            message: "m".into(),
            path: None,
        };
        assert_eq!(
            serde_json::to_value(&issue).unwrap(),
            json!({"severity": "WARNING", "message": "m"})
        );
        assert_eq!(issue.to_string(), "[WARNING] m");
    }

    fn rule_names() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::hash_set("[a-z][a-z0-9-]{0,15}", 0..40)
            .prop_map(|set| set.into_iter().collect())
    }

    proptest! {
        #[test]
        fn unique_well_formed_rules_stay_valid(names in rule_names()) {
            let mut doc = base_policy();
            doc["spec"]["rules"] = names
                .iter()
                .map(|n| json!({"name": n, "condition": format!("$.{} != null", n.replace('-', "_")), "severity": "low"}))
                .collect();
            let (valid, issues) = validator().validate(&doc, V1_0_0);
            prop_assert!(valid);
            prop_assert!(issues.is_empty(), "{:?}", issues);
        }

        #[test]
        fn validation_is_deterministic(names in proptest::collection::vec("[a-c]{1,2}", 0..12)) {
            let mut doc = base_policy();
            doc["spec"]["rules"] = names
                .iter()
                .map(|n| json!({"name": n, "condition": "$.a == 1"}))
                .collect();
            let v = validator();
            prop_assert_eq!(v.validate_value(&doc, V1_0_0), v.validate_value(&doc, V1_0_0));
        }
    }
}
