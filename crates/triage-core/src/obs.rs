//! Structured observability hooks for plan generation.
//!
//! This module provides:
//! - A plan-scoped tracing span via the `PlanSpan` RAII guard
//! - Emission functions for key events: policy resolved, incident scored,
//!   plan computed, plan written
//!
//! Per-incident events are emitted at `debug!`; everything else at `info!`.
//! Set `RUST_LOG=triage_core=debug` to see individual scores.

use rust_decimal::Decimal;
use tracing::{debug, info};

/// RAII guard that enters a plan-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = PlanSpan::enter(incidents.len());
/// // every event below is tagged with incidents = N
/// ```
pub struct PlanSpan {
    _span: tracing::span::EnteredSpan,
}

impl PlanSpan {
    /// Create and enter a span tagged with the number of incidents.
    pub fn enter(incidents: usize) -> Self {
        let span = tracing::info_span!("triage.plan", incidents = incidents);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: policy resolved, with table sizes and the cap (if any).
pub fn emit_policy_resolved(
    layers: usize,
    environments: usize,
    failure_types: usize,
    modules: usize,
    cap: Option<Decimal>,
) {
    match cap {
        Some(cap) => info!(
            event = "policy.resolved",
            layers = layers,
            environments = environments,
            failure_types = failure_types,
            modules = modules,
            cap = %cap,
        ),
        None => info!(
            event = "policy.resolved",
            layers = layers,
            environments = environments,
            failure_types = failure_types,
            modules = modules,
            cap = "none",
        ),
    }
}

/// Emit event: one incident scored.
pub fn emit_incident_scored(
    test_id: &str,
    final_minutes: Decimal,
    priority_score: Decimal,
    capped: bool,
) {
    debug!(
        event = "incident.scored",
        test_id = %test_id,
        final_minutes = %final_minutes,
        priority_score = %priority_score,
        capped = capped,
    );
}

/// Emit event: plan computed and ranked.
pub fn emit_plan_computed(entries: usize, at_cap: usize, total_final_minutes: Decimal) {
    info!(
        event = "plan.computed",
        entries = entries,
        at_cap = at_cap,
        total_final_minutes = %total_final_minutes,
    );
}

/// Emit event: plan written to disk.
pub fn emit_plan_written(path: &std::path::Path, entries: usize, digest: &str) {
    info!(
        event = "plan.written",
        path = %path.display(),
        entries = entries,
        digest = %digest,
    );
}
