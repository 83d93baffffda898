//! End-to-end scoring and ranking scenarios against resolved policies.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{json, Value};
use triage_core::{compute_plan, resolve_policy, IncidentRecord, Policy};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

fn reference_policy() -> Policy {
    resolve_policy(&json!({
        "minutes_per_impacted_layer": { "db": 10, "api": 5 },
        "multipliers": {
            "by_environment": { "prod": 2.0 },
            "by_failure_type": { "timeout": 1.5 }
        },
        "module_priority_score": { "payments": 3 },
        "caps": { "per_incident_minutes_max": 40 }
    }))
    .expect("resolve reference policy")
}

fn incidents(raw: Value) -> Vec<IncidentRecord> {
    serde_json::from_value(raw).expect("incident records")
}

#[test]
fn reference_incident_is_capped_and_scored() {
    let plan = compute_plan(
        &reference_policy(),
        &incidents(json!([{
            "module": "payments",
            "environment": "prod",
            "failure_type": "timeout",
            "impacted_layers": ["db", "api"]
        }])),
    )
    .expect("plan");

    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].base_minutes, dec("15"));
    assert_eq!(plan[0].final_minutes, dec("40.0"));
    assert_eq!(plan[0].priority_score, dec("9.0"));
}

#[test]
fn compute_is_deterministic() {
    let records = incidents(json!([
        { "test_id": "a", "module": "search", "impacted_layers": ["api"] },
        { "test_id": "b", "module": "payments", "environment": "prod", "impacted_layers": ["db"] },
        { "test_id": "c", "module": "Search", "impacted_layers": [] },
        { "test_id": "d", "failure_type": "timeout", "impacted_layers": ["api", "db"] }
    ]));
    let policy = reference_policy();

    let first = compute_plan(&policy, &records).expect("first");
    let second = compute_plan(&policy, &records).expect("second");

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first).expect("serialize"),
        serde_json::to_vec(&second).expect("serialize")
    );
}

#[test]
fn unknown_keys_behave_like_unit_weights() {
    let policy = reference_policy();
    let unknown = incidents(json!([{
        "module": "ledger",
        "environment": "qa",
        "failure_type": "segfault",
        "impacted_layers": ["api"]
    }]));
    let missing = incidents(json!([{ "impacted_layers": ["api"] }]));

    let a = compute_plan(&policy, &unknown).expect("unknown");
    let b = compute_plan(&policy, &missing).expect("missing");

    assert_eq!(a[0].final_minutes, dec("5"));
    assert_eq!(a[0].priority_score, dec("1"));
    assert_eq!(a[0].final_minutes, b[0].final_minutes);
    assert_eq!(a[0].priority_score, b[0].priority_score);
}

#[test]
fn cap_is_never_exceeded() {
    let policy = reference_policy();
    let cap = policy.cap.expect("cap");
    let records = incidents(json!([
        { "environment": "prod", "failure_type": "timeout", "impacted_layers": ["db", "db", "db"] },
        { "environment": "prod", "impacted_layers": ["db", "api"] },
        { "impacted_layers": ["api"] }
    ]));

    for entry in compute_plan(&policy, &records).expect("plan") {
        assert!(entry.final_minutes <= cap, "{:?} exceeds cap", entry);
    }
}

#[test]
fn uncapped_policy_reports_full_product() {
    let mut policy = reference_policy();
    policy.cap = None;
    let records = incidents(json!([{
        "environment": "prod",
        "failure_type": "timeout",
        "impacted_layers": ["db", "api"]
    }]));

    let plan = compute_plan(&policy, &records).expect("plan");
    assert_eq!(plan[0].final_minutes, dec("45"));
}

#[test]
fn half_up_rounding_on_exact_midpoints() {
    let policy = resolve_policy(&json!({
        "minutes_per_impacted_layer": { "api": 2.345 },
        "module_priority_score": { "payments": 0.1235 }
    }))
    .expect("resolve");
    let records = incidents(json!([{ "module": "payments", "impacted_layers": ["api"] }]));

    let plan = compute_plan(&policy, &records).expect("plan");
    assert_eq!(plan[0].final_minutes, dec("2.35"));
    assert_eq!(plan[0].priority_score, dec("0.124"));
    // base minutes stay unrounded
    assert_eq!(plan[0].base_minutes, dec("2.345"));
}

#[test]
fn ranking_uses_priority_then_module() {
    let policy = resolve_policy(&json!({
        "module_priority_score": { "Zeta": 5, "alpha": 5, "beta": 7 }
    }))
    .expect("resolve");
    let records = incidents(json!([
        { "test_id": 1, "module": "Zeta" },
        { "test_id": 2, "module": "alpha" },
        { "test_id": 3, "module": "beta" }
    ]));

    let plan = compute_plan(&policy, &records).expect("plan");
    let modules: Vec<_> = plan.iter().map(|e| e.module.as_deref()).collect();
    assert_eq!(modules, vec![Some("beta"), Some("alpha"), Some("Zeta")]);
}

#[test]
fn equal_keys_keep_input_order() {
    let records = incidents(json!([
        { "test_id": "first", "module": "api" },
        { "test_id": "second", "module": "API" },
        { "test_id": "third", "module": "Api" }
    ]));

    let plan = compute_plan(&Policy::default(), &records).expect("plan");
    let ids: Vec<_> = plan.iter().map(|e| e.test_id.clone()).collect();
    assert_eq!(
        ids,
        vec![Some(json!("first")), Some(json!("second")), Some(json!("third"))]
    );
}

#[test]
fn plan_serializes_with_downstream_field_names() {
    let plan = compute_plan(
        &reference_policy(),
        &incidents(json!([{
            "test_id": "T-1",
            "module": "payments",
            "environment": "prod",
            "failure_type": "timeout",
            "impacted_layers": ["db", "api"]
        }])),
    )
    .expect("plan");

    let v = serde_json::to_value(&plan).expect("to_value");
    let obj = v[0].as_object().expect("entry object");
    for key in [
        "test_id",
        "module",
        "environment",
        "failure_type",
        "impacted_layers",
        "Base_minutes",
        "Final_minutes",
        "priority_score",
    ] {
        assert!(obj.contains_key(key), "missing key: {}", key);
    }
    assert_eq!(v[0]["Final_minutes"], json!(40.0));
    assert_eq!(v[0]["priority_score"], json!(9.0));
}
