//! # Engine Flows
//!
//! Policies loaded from disk, validated, registered, and evaluated,
//! including concurrent evaluation against a shared registry.

use std::sync::Arc;
use std::thread;

use gov_condition::fake::{FakeCompiler, FakeOutcome};
use gov_core::{find_documents, load_document, Enforcement, PolicySeverity, Resource};
use gov_engine::{RulesEngine, Violation};
use gov_schema::{declared_version, PolicyValidator, V1_0_0};
use proptest::prelude::*;
use serde_json::{json, Value};

fn s3_policy() -> Value {
    json!({
        "apiVersion": "governance/v1.0.0",
        "kind": "Policy",
        "metadata": {"name": "s3-encryption", "version": "1.0.0", "description": "enc"},
        "spec": {
            "target": {"resourceType": "aws_s3_bucket"},
            "rules": [{
                "name": "encryption-required",
                "condition": "$.encryption != null",
                "message": "Bucket must be encrypted"
            }]
        }
    })
}

fn s3_engine() -> RulesEngine {
    let engine = RulesEngine::new();
    assert!(engine.register(&s3_policy()));
    engine
}

fn bucket(properties: Value) -> Resource {
    Resource::new("aws_s3_bucket", properties)
}

#[test]
fn s3_encryption_scenario() {
    let engine = s3_engine();

    let encrypted = engine.evaluate(&bucket(json!({"encryption": "AES256"})));
    assert!(encrypted.passed);
    assert!(encrypted.violations.is_empty());
    assert_eq!(encrypted.policies_evaluated, 1);

    let open = engine.evaluate(&bucket(json!({})));
    assert!(!open.passed);
    assert_eq!(open.violations.len(), 1);
    assert_eq!(
        open.violations[0],
        Violation {
            policy_id: "s3-encryption".into(),
            rule_name: "encryption-required".into(),
            message: "Bucket must be encrypted".into(),
            severity: PolicySeverity::Medium,
            enforcement: Enforcement::Enforce,
            error: None,
        }
    );
    assert!(open.is_blocking());
}

#[test]
fn unmatched_resource_type_always_passes() {
    let engine = s3_engine();
    let result = engine.evaluate(&Resource::new("aws_instance", json!({})));
    assert!(result.passed);
    assert!(result.violations.is_empty());
    assert_eq!(result.policies_evaluated, 0);

    let empty = RulesEngine::new();
    assert!(empty.evaluate(&bucket(json!({}))).passed);
}

#[test]
fn raw_documents_round_trip_through_engine() {
    let engine = s3_engine();
    let result = engine
        .evaluate_value(&json!({"id": "logs", "type": "aws_s3_bucket", "properties": {}}))
        .unwrap();
    assert_eq!(result.resource_id.as_deref(), Some("logs"));
    assert!(!result.passed);

    assert!(engine.evaluate_value(&json!({"properties": {}})).is_err());
    assert!(!engine.register(&json!({"metadata": {}, "spec": {"target": {}}})));
    assert!(!engine.register(&json!({
        "metadata": {"name": "no-target"},
        "spec": {"target": {"resourceType": ""}}
    })));
    assert_eq!(engine.len(), 1);
}

#[test]
fn validated_directory_feeds_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("s3.json"),
        serde_json::to_string_pretty(&s3_policy()).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("vm.yaml"),
        "\
apiVersion: governance/v1.1.0
kind: Policy
metadata:
  name: vm-monitoring
  version: 2.1.0
  severity: low
spec:
  target:
    resourceType: aws_instance
  enforcement: audit
  rules:
    - name: monitoring-on
      condition: $.monitoring == true
",
    )
    .unwrap();

    let validator = PolicyValidator::new().unwrap();
    let engine = RulesEngine::new();
    for path in find_documents(dir.path()) {
        let doc = load_document(&path).unwrap();
        let target = declared_version(&doc).unwrap_or(V1_0_0);
        assert!(validator.validate(&doc, target).0, "{}", path.display());
        assert!(engine.register(&doc));
    }
    assert_eq!(engine.policy_ids(), vec!["s3-encryption", "vm-monitoring"]);

    let vm = engine.evaluate(&Resource::new("aws_instance", json!({"monitoring": false})));
    assert!(!vm.passed);
    assert!(!vm.is_blocking());
    assert_eq!(vm.violations[0].severity, PolicySeverity::Low);
    assert_eq!(vm.violations[0].message, "rule 'monitoring-on' failed");
}

#[test]
fn violations_follow_policy_id_then_rule_order() {
    let engine = RulesEngine::new();
    for name in ["zeta", "alpha"] {
        assert!(engine.register(&json!({
            "metadata": {"name": name},
            "spec": {
                "target": {"resourceType": "aws_s3_bucket"},
                "rules": [
                    {"name": "second-field", "condition": "$.b == true"},
                    {"name": "first-field", "condition": "$.a == true"}
                ]
            }
        })));
    }
    let result = engine.evaluate(&bucket(json!({})));
    let order: Vec<_> = result
        .violations
        .iter()
        .map(|v| format!("{}/{}", v.policy_id, v.rule_name))
        .collect();
    assert_eq!(
        order,
        vec![
            "alpha/second-field",
            "alpha/first-field",
            "zeta/second-field",
            "zeta/first-field"
        ]
    );
}

#[test]
fn condition_errors_are_contained_to_their_rule() {
    let compiler = Arc::new(
        FakeCompiler::new()
            .with("explode", FakeOutcome::Error("type mismatch".into()))
            .with("deny", FakeOutcome::Fail),
    );
    let engine = RulesEngine::with_compiler(compiler);
    assert!(engine.register(&json!({
        "metadata": {"name": "mixed"},
        "spec": {
            "target": {"resourceType": "t"},
            "rules": [
                {"name": "a", "condition": "explode"},
                {"name": "b", "condition": "allow"},
                {"name": "c", "condition": "deny"}
            ]
        }
    })));

    let result = engine.evaluate(&Resource::new("t", json!({})));
    let names: Vec<_> = result.violations.iter().map(|v| v.rule_name.as_str()).collect();
    assert_eq!(names, vec!["a", "c"]);
    assert!(result.violations[0].error.is_some());
    assert!(result.violations[1].error.is_none());
}

fn mixed_resources(n: usize) -> Vec<Resource> {
    (0..n)
        .map(|i| {
            let properties = if i % 3 == 0 {
                json!({})
            } else {
                json!({"encryption": "aws:kms"})
            };
            let resource_type = if i % 5 == 0 { "aws_instance" } else { "aws_s3_bucket" };
            Resource::new(resource_type, properties).with_id(format!("r-{i}"))
        })
        .collect()
}

#[test]
fn concurrent_callers_match_sequential_evaluation() {
    let engine = Arc::new(s3_engine());
    let resources = Arc::new(mixed_resources(100));
    let sequential: Vec<_> = resources.iter().map(|r| engine.evaluate(r)).collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let resources = Arc::clone(&resources);
            thread::spawn(move || {
                resources
                    .iter()
                    .map(|r| engine.evaluate(r))
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), sequential);
    }

    assert_eq!(engine.evaluate_batch(&resources, 4), sequential);
}

#[test]
fn readers_never_observe_a_partial_policy() {
    let engine = Arc::new(RulesEngine::new());
    let v1 = json!({
        "metadata": {"name": "p"},
        "spec": {"target": {"resourceType": "t"}, "rules": [
            {"name": "one", "condition": "$.x == 1"}
        ]}
    });
    let v2 = json!({
        "metadata": {"name": "p"},
        "spec": {"target": {"resourceType": "t"}, "rules": [
            {"name": "two-a", "condition": "$.x == 2"},
            {"name": "two-b", "condition": "$.y == 2"}
        ]}
    });
    assert!(engine.register(&v1));

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..200 {
                assert!(engine.register(if i % 2 == 0 { &v2 } else { &v1 }));
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let resource = Resource::new("t", json!({}));
                for _ in 0..500 {
                    let names: Vec<_> = engine
                        .evaluate(&resource)
                        .violations
                        .into_iter()
                        .map(|v| v.rule_name)
                        .collect();
                    assert!(
                        names == ["one"] || names == ["two-a", "two-b"],
                        "mixed policy state: {names:?}"
                    );
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(engine.len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn batch_size_and_workers_do_not_change_results(n in 0usize..60, workers in 1usize..9) {
        let engine = s3_engine();
        let resources = mixed_resources(n);
        let sequential: Vec<_> = resources.iter().map(|r| engine.evaluate(r)).collect();
        prop_assert_eq!(engine.evaluate_batch(&resources, workers), sequential);
    }
}
