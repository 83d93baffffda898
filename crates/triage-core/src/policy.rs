//! Policy resolution.
//!
//! Turns a raw policy document (parsed YAML/JSON) into the lookup tables the
//! plan computer reads. Missing sections resolve to empty tables and a
//! missing cap resolves to `None`; the resolver never invents a numeric cap.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{PlanError, Result};
use crate::numeric::coerce_decimal;

/// Multiplier used for environments and failure types absent from the policy.
pub const DEFAULT_MULTIPLIER: Decimal = Decimal::ONE;

/// Base priority used for modules absent from the policy.
pub const DEFAULT_MODULE_PRIORITY: Decimal = Decimal::ONE;

const LAYER_MINUTES_KEY: &str = "minutes_per_impacted_layer";
const MULTIPLIERS_KEY: &str = "multipliers";
const BY_ENVIRONMENT_KEY: &str = "by_environment";
const BY_FAILURE_TYPE_KEY: &str = "by_failure_type";
const MODULE_PRIORITY_KEY: &str = "module_priority_score";
const CAPS_KEY: &str = "caps";
const CAP_KEY: &str = "per_incident_minutes_max";

/// Resolved scoring policy.
///
/// Shared read-only by every incident of a plan computation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Policy {
    /// Minutes contributed by each impacted layer.
    pub layer_minutes: BTreeMap<String, Decimal>,
    /// Multiplier per environment name.
    pub env_multiplier: BTreeMap<String, Decimal>,
    /// Multiplier per failure type.
    pub failure_multiplier: BTreeMap<String, Decimal>,
    /// Base priority per module.
    pub module_priority: BTreeMap<String, Decimal>,
    /// Ceiling on final minutes; `None` means unbounded.
    pub cap: Option<Decimal>,
}

impl Policy {
    /// Minutes for a layer; unknown layers contribute zero.
    pub fn layer_minutes(&self, layer: &str) -> Decimal {
        self.layer_minutes
            .get(layer)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Multiplier for an environment, defaulting to 1.0.
    pub fn env_multiplier(&self, environment: Option<&str>) -> Decimal {
        lookup(&self.env_multiplier, environment, DEFAULT_MULTIPLIER)
    }

    /// Multiplier for a failure type, defaulting to 1.0.
    pub fn failure_multiplier(&self, failure_type: Option<&str>) -> Decimal {
        lookup(&self.failure_multiplier, failure_type, DEFAULT_MULTIPLIER)
    }

    /// Base priority for a module, defaulting to 1.0.
    pub fn module_priority(&self, module: Option<&str>) -> Decimal {
        lookup(&self.module_priority, module, DEFAULT_MODULE_PRIORITY)
    }

    /// Apply `cap` only when the resolved policy has none of its own.
    pub fn with_default_cap(mut self, cap: Decimal) -> Self {
        if self.cap.is_none() {
            self.cap = Some(cap);
        }
        self
    }

    /// Reject values the scoring rules are not defined for.
    ///
    /// Resolution itself passes negative numbers through; callers that want
    /// fail-fast behavior run this before computing a plan.
    pub fn validate(&self) -> Result<()> {
        check_all(&self.layer_minutes, LAYER_MINUTES_KEY, non_negative)?;
        let env_path = format!("{MULTIPLIERS_KEY}.{BY_ENVIRONMENT_KEY}");
        check_all(&self.env_multiplier, &env_path, positive_multiplier)?;
        let fail_path = format!("{MULTIPLIERS_KEY}.{BY_FAILURE_TYPE_KEY}");
        check_all(&self.failure_multiplier, &fail_path, positive_multiplier)?;
        check_all(&self.module_priority, MODULE_PRIORITY_KEY, non_negative)?;

        if let Some(cap) = self.cap {
            if cap < Decimal::ZERO {
                return Err(PlanError::InvalidPolicy {
                    path: format!("{CAPS_KEY}.{CAP_KEY}"),
                    reason: format!("cap must not be negative (got {cap})"),
                });
            }
        }
        Ok(())
    }
}

fn lookup(table: &BTreeMap<String, Decimal>, key: Option<&str>, default: Decimal) -> Decimal {
    key.and_then(|k| table.get(k))
        .copied()
        .unwrap_or(default)
}

fn non_negative(v: Decimal) -> std::result::Result<(), &'static str> {
    if v >= Decimal::ZERO {
        Ok(())
    } else {
        Err("value must not be negative")
    }
}

fn positive_multiplier(v: Decimal) -> std::result::Result<(), &'static str> {
    if v > Decimal::ZERO {
        Ok(())
    } else {
        Err("multiplier must be positive")
    }
}

fn check_all(
    table: &BTreeMap<String, Decimal>,
    section: &str,
    check: impl Fn(Decimal) -> std::result::Result<(), &'static str>,
) -> Result<()> {
    for (key, value) in table {
        check(*value).map_err(|reason| PlanError::InvalidPolicy {
            path: format!("{section}.{key}"),
            reason: format!("{reason} (got {value})"),
        })?;
    }
    Ok(())
}

/// Resolve a raw policy document into a [`Policy`].
///
/// Recognized layout:
///
/// ```yaml
/// minutes_per_impacted_layer: { db: 10, api: 5 }
/// multipliers:
///   by_environment: { prod: 2.0 }
///   by_failure_type: { timeout: 1.5 }
/// module_priority_score: { payments: 3 }
/// caps:
///   per_incident_minutes_max: 60
/// ```
///
/// Unrecognized keys are ignored. A `null` document resolves to the empty
/// policy.
pub fn resolve_policy(raw: &Value) -> Result<Policy> {
    let root = as_section(Some(raw), "<root>")?;

    let multipliers = as_section(root.and_then(|r| r.get(MULTIPLIERS_KEY)), MULTIPLIERS_KEY)?;
    let caps = as_section(root.and_then(|r| r.get(CAPS_KEY)), CAPS_KEY)?;

    let layer_minutes = resolve_table(root, LAYER_MINUTES_KEY, LAYER_MINUTES_KEY)?;
    let env_multiplier = resolve_table(
        multipliers,
        BY_ENVIRONMENT_KEY,
        &format!("{MULTIPLIERS_KEY}.{BY_ENVIRONMENT_KEY}"),
    )?;
    let failure_multiplier = resolve_table(
        multipliers,
        BY_FAILURE_TYPE_KEY,
        &format!("{MULTIPLIERS_KEY}.{BY_FAILURE_TYPE_KEY}"),
    )?;
    let module_priority = resolve_table(root, MODULE_PRIORITY_KEY, MODULE_PRIORITY_KEY)?;

    let cap = match caps.and_then(|c| c.get(CAP_KEY)) {
        None | Some(Value::Null) => None,
        Some(v) => Some(coerce_decimal(v, &format!("{CAPS_KEY}.{CAP_KEY}"))?),
    };

    Ok(Policy {
        layer_minutes,
        env_multiplier,
        failure_multiplier,
        module_priority,
        cap,
    })
}

/// A missing or `null` section is treated as empty; any other non-object is
/// an error.
fn as_section<'a>(value: Option<&'a Value>, section: &str) -> Result<Option<&'a Map<String, Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(PlanError::InvalidSection {
            section: section.to_string(),
        }),
    }
}

fn resolve_table(
    parent: Option<&Map<String, Value>>,
    key: &str,
    path: &str,
) -> Result<BTreeMap<String, Decimal>> {
    let Some(section) = as_section(parent.and_then(|p| p.get(key)), path)? else {
        return Ok(BTreeMap::new());
    };

    section
        .iter()
        .map(|(name, value)| {
            let number = coerce_decimal(value, &format!("{path}.{name}"))?;
            Ok((name.clone(), number))
        })
        .collect()
}
