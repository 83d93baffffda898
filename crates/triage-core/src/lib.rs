//! Triage core library.
//!
//! Turns test-failure records into a ranked remediation plan:
//! [`resolve_policy`] normalizes a raw policy document, [`compute_plan`]
//! scores every incident against it and orders the result.

pub mod artifact;
pub mod error;
pub mod incident;
pub mod numeric;
pub mod obs;
pub mod plan;
pub mod policy;
pub mod telemetry;

pub use artifact::{
    load_incidents, load_policy_document, parse_incidents, plan_digest, render_plan_summary_md,
    write_plan_json, write_plan_summary_md, PlanSummary,
};
pub use error::{PlanError, Result};
pub use incident::IncidentRecord;
pub use numeric::{coerce_decimal, round_half_up, MINUTES_DP, PRIORITY_DP};
pub use obs::{
    emit_incident_scored, emit_plan_computed, emit_plan_written, emit_policy_resolved, PlanSpan,
};
pub use plan::{
    compute_plan, entries_at_cap, rank_entries, score_incident, total_base_minutes,
    total_final_minutes, PlanEntry,
};
pub use policy::{resolve_policy, Policy, DEFAULT_MODULE_PRIORITY, DEFAULT_MULTIPLIER};
pub use telemetry::{default_directives, init_tracing, LogFormat};

/// Triage version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
