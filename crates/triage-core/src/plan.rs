//! Plan computation: per-incident scoring followed by a single ranking pass.
//!
//! For each incident:
//!
//! 1. `base_minutes` = sum of layer minutes over `impacted_layers` (duplicates count again)
//! 2. `raw_final` = `base_minutes * env_multiplier * failure_multiplier`
//! 3. `final_minutes` = `min(raw_final, cap)` rounded half-up to 2 places
//! 4. `priority_score` = `module_priority * env_multiplier * failure_multiplier`
//!    rounded half-up to 3 places
//!
//! Entries are then ordered by `priority_score` descending, then by module
//! name case-insensitively. Ties keep input order.

use std::cmp::Reverse;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PlanError, Result};
use crate::incident::IncidentRecord;
use crate::numeric::{round_half_up, MINUTES_DP, PRIORITY_DP};
use crate::obs::{emit_incident_scored, emit_plan_computed, PlanSpan};
use crate::policy::Policy;

/// One ranked line of the remediation plan.
///
/// Field names on the wire match the plan files already consumed downstream
/// (`Base_minutes`, `Final_minutes`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub test_id: Option<Value>,
    pub module: Option<String>,
    pub environment: Option<String>,
    pub failure_type: Option<String>,
    pub impacted_layers: Vec<String>,
    /// Unrounded sum of layer minutes.
    #[serde(rename = "Base_minutes")]
    pub base_minutes: Decimal,
    #[serde(rename = "Final_minutes")]
    pub final_minutes: Decimal,
    pub priority_score: Decimal,
}

impl PlanEntry {
    /// Secondary sort key: lowercased module, empty when absent.
    pub fn module_key(&self) -> String {
        self.module.as_deref().unwrap_or_default().to_lowercase()
    }
}

/// Score a single incident against the policy.
///
/// Pure: depends only on `policy` and `incident`.
pub fn score_incident(policy: &Policy, incident: &IncidentRecord) -> Result<PlanEntry> {
    let overflow = |stage: &'static str| PlanError::Overflow {
        test_id: incident.display_id(),
        stage,
    };

    let base_minutes = incident
        .impacted_layers
        .iter()
        .try_fold(Decimal::ZERO, |acc, layer| {
            acc.checked_add(policy.layer_minutes(layer))
        })
        .ok_or_else(|| overflow("base_minutes"))?;

    let env_mult = policy.env_multiplier(incident.environment.as_deref());
    let fail_mult = policy.failure_multiplier(incident.failure_type.as_deref());

    let raw_final = base_minutes
        .checked_mul(env_mult)
        .and_then(|v| v.checked_mul(fail_mult))
        .ok_or_else(|| overflow("final_minutes"))?;

    let (bounded, capped) = match policy.cap {
        Some(cap) if raw_final > cap => (cap, true),
        _ => (raw_final, false),
    };
    let final_minutes = round_half_up(bounded, MINUTES_DP);

    let priority_score = policy
        .module_priority(incident.module.as_deref())
        .checked_mul(env_mult)
        .and_then(|v| v.checked_mul(fail_mult))
        .map(|v| round_half_up(v, PRIORITY_DP))
        .ok_or_else(|| overflow("priority_score"))?;

    emit_incident_scored(
        &incident.display_id(),
        final_minutes,
        priority_score,
        capped,
    );

    Ok(PlanEntry {
        test_id: incident.test_id.clone(),
        module: incident.module.clone(),
        environment: incident.environment.clone(),
        failure_type: incident.failure_type.clone(),
        impacted_layers: incident.impacted_layers.clone(),
        base_minutes,
        final_minutes,
        priority_score,
    })
}

/// Order entries by priority descending, then module ascending
/// (case-insensitive).
///
/// `sort_by_cached_key` is stable, so entries with equal keys keep their
/// relative order.
pub fn rank_entries(entries: &mut [PlanEntry]) {
    entries.sort_by_cached_key(|e| (Reverse(e.priority_score), e.module_key()));
}

/// Score every incident, then rank the complete set.
///
/// Fails fast on the first incident that cannot be scored; no partial plan
/// is returned.
pub fn compute_plan(policy: &Policy, incidents: &[IncidentRecord]) -> Result<Vec<PlanEntry>> {
    let _span = PlanSpan::enter(incidents.len());

    let mut entries = incidents
        .iter()
        .map(|incident| score_incident(policy, incident))
        .collect::<Result<Vec<_>>>()?;

    rank_entries(&mut entries);

    let total = total_final_minutes(&entries)?;
    emit_plan_computed(entries.len(), entries_at_cap(policy, &entries), total);

    Ok(entries)
}

/// Number of entries whose `final_minutes` equals the cap as it appears
/// after rounding.
pub fn entries_at_cap(policy: &Policy, entries: &[PlanEntry]) -> usize {
    match policy.cap {
        Some(cap) => {
            let cap = round_half_up(cap, MINUTES_DP);
            entries.iter().filter(|e| e.final_minutes == cap).count()
        }
        None => 0,
    }
}

/// Sum of `final_minutes` across the plan.
pub fn total_final_minutes(entries: &[PlanEntry]) -> Result<Decimal> {
    checked_total(entries, |e| e.final_minutes, "total_final_minutes")
}

/// Sum of the unrounded `base_minutes` across the plan.
pub fn total_base_minutes(entries: &[PlanEntry]) -> Result<Decimal> {
    checked_total(entries, |e| e.base_minutes, "total_base_minutes")
}

fn checked_total(
    entries: &[PlanEntry],
    field: impl Fn(&PlanEntry) -> Decimal,
    stage: &'static str,
) -> Result<Decimal> {
    entries
        .iter()
        .try_fold(Decimal::ZERO, |acc, e| acc.checked_add(field(e)))
        .ok_or(PlanError::TotalOverflow { stage })
}
