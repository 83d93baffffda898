//! File glue around the plan computation: loading inputs, writing the plan
//! and rendering a Markdown summary.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::incident::IncidentRecord;
use crate::plan::{total_base_minutes, total_final_minutes, PlanEntry};

/// Read a policy document. YAML is accepted, and therefore JSON as well.
///
/// An empty file yields `Value::Null`, which resolves to the empty policy.
pub fn load_policy_document(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read policy {:?}", path))?;
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(&content).with_context(|| format!("parse policy {:?}", path))
}

/// Read incident records from a JSON array file or a JSON Lines file.
pub fn load_incidents(path: &Path) -> Result<Vec<IncidentRecord>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read failures {:?}", path))?;
    parse_incidents(&content).with_context(|| format!("parse failures {:?}", path))
}

/// Parse incident records.
///
/// Content starting with `[` is a single JSON array; otherwise every
/// non-blank line is one JSON object.
pub fn parse_incidents(content: &str) -> Result<Vec<IncidentRecord>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("parse JSON array of incidents");
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("parse incident on line {}", idx + 1))
        })
        .collect()
}

/// Write the ranked plan as pretty JSON.
pub fn write_plan_json(path: &Path, entries: &[PlanEntry]) -> Result<()> {
    let mut content = serde_json::to_string_pretty(entries).context("serialize plan")?;
    content.push('\n');
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// SHA-256 of the compact JSON encoding of the plan, hex encoded.
///
/// Two runs over the same policy and incidents produce the same digest.
pub fn plan_digest(entries: &[PlanEntry]) -> crate::Result<String> {
    let bytes = serde_json::to_vec(entries)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Data model behind the Markdown plan report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanSummary {
    pub incidents: usize,
    pub total_base_minutes: Decimal,
    pub total_final_minutes: Decimal,
    pub digest: String,
    pub entries: Vec<PlanEntry>,
}

impl PlanSummary {
    pub fn from_entries(entries: &[PlanEntry]) -> crate::Result<Self> {
        Ok(Self {
            incidents: entries.len(),
            total_base_minutes: total_base_minutes(entries)?,
            total_final_minutes: total_final_minutes(entries)?,
            digest: plan_digest(entries)?,
            entries: entries.to_vec(),
        })
    }
}

/// Render the plan report.
pub fn render_plan_summary_md(summary: &PlanSummary) -> String {
    let mut out = String::new();
    out.push_str("# Remediation Plan\n\n");
    out.push_str(&format!(
        "- incidents: {}\n- total base minutes: {:.2}\n- total final minutes: {:.2}\n- digest: `{}`\n\n",
        summary.incidents, summary.total_base_minutes, summary.total_final_minutes, summary.digest
    ));

    if summary.entries.is_empty() {
        out.push_str("_No incidents._\n");
        return out;
    }

    out.push_str("| # | test | module | environment | failure type | layers | minutes | priority |\n");
    out.push_str("|---|------|--------|-------------|--------------|--------|---------|----------|\n");
    for (rank, entry) in summary.entries.iter().enumerate() {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {:.2} | {:.3} |\n",
            rank + 1,
            test_id_cell(entry.test_id.as_ref()),
            entry.module.as_deref().unwrap_or("-"),
            entry.environment.as_deref().unwrap_or("-"),
            entry.failure_type.as_deref().unwrap_or("-"),
            if entry.impacted_layers.is_empty() {
                "-".to_string()
            } else {
                entry.impacted_layers.join(", ")
            },
            entry.final_minutes,
            entry.priority_score,
        ));
    }
    out
}

/// Write the plan report.
pub fn write_plan_summary_md(path: &Path, summary: &PlanSummary) -> Result<()> {
    let md = render_plan_summary_md(summary);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

fn test_id_cell(test_id: Option<&Value>) -> String {
    match test_id {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
