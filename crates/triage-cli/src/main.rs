//! Triage - remediation plan generator
//!
//! The `triage-plan` command turns a policy file and a failures file into a
//! ranked remediation plan.
//!
//! ## Commands
//!
//! - `plan`: Score and rank failures, write `plan.json`
//! - `validate`: Resolve a policy and check its values
//! - `policy`: Print the resolved policy tables as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use triage_core::{
    compute_plan, emit_plan_written, emit_policy_resolved, load_incidents, load_policy_document,
    plan_digest, resolve_policy, write_plan_json, write_plan_summary_md, LogFormat, PlanSummary,
    Policy,
};

#[derive(Parser)]
#[command(name = "triage-plan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic remediation plan for failing tests", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score failures against a policy and write the ranked plan
    Plan {
        /// Policy file (YAML or JSON)
        #[arg(long, env = "TRIAGE_POLICY")]
        policy: PathBuf,

        /// Failures file (JSON array or JSON Lines)
        #[arg(long, env = "TRIAGE_FAILURES")]
        failures: PathBuf,

        /// Output path for the plan
        #[arg(short, long, env = "TRIAGE_OUTPUT", default_value = "plan.json")]
        output: PathBuf,

        /// Also write a Markdown report to this path
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Cap in minutes, used only when the policy defines none
        #[arg(long)]
        default_cap: Option<Decimal>,

        /// Reject negative minutes/priorities and non-positive multipliers
        #[arg(long)]
        strict: bool,
    },

    /// Resolve a policy file and check its values
    Validate {
        /// Policy file (YAML or JSON)
        #[arg(long, env = "TRIAGE_POLICY")]
        policy: PathBuf,
    },

    /// Print the resolved policy as JSON
    Policy {
        /// Policy file (YAML or JSON)
        #[arg(long, env = "TRIAGE_POLICY")]
        policy: PathBuf,

        /// Cap in minutes, used only when the policy defines none
        #[arg(long)]
        default_cap: Option<Decimal>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    triage_core::init_tracing(LogFormat::from_json_flag(cli.json), level);

    match cli.command {
        Commands::Plan {
            policy,
            failures,
            output,
            summary,
            default_cap,
            strict,
        } => {
            let written = cmd_plan(
                &policy,
                &failures,
                &output,
                summary.as_deref(),
                default_cap,
                strict,
            )?;
            println!("Wrote {} incidents to {}", written.entries, output.display());
            println!("Digest: {}", written.digest);
            Ok(())
        }
        Commands::Validate { policy } => cmd_validate(&policy),
        Commands::Policy {
            policy,
            default_cap,
        } => cmd_policy(&policy, default_cap),
    }
}

/// Outcome of a `plan` invocation.
#[derive(Debug)]
struct PlanWritten {
    entries: usize,
    digest: String,
}

/// Load and resolve a policy, applying the caller's default cap if given.
fn load_policy(path: &Path, default_cap: Option<Decimal>) -> Result<Policy> {
    let raw = load_policy_document(path)?;
    let mut policy =
        resolve_policy(&raw).with_context(|| format!("resolve policy {:?}", path))?;
    if let Some(cap) = default_cap {
        policy = policy.with_default_cap(cap);
    }

    emit_policy_resolved(
        policy.layer_minutes.len(),
        policy.env_multiplier.len(),
        policy.failure_multiplier.len(),
        policy.module_priority.len(),
        policy.cap,
    );
    Ok(policy)
}

fn cmd_plan(
    policy_path: &Path,
    failures_path: &Path,
    output: &Path,
    summary: Option<&Path>,
    default_cap: Option<Decimal>,
    strict: bool,
) -> Result<PlanWritten> {
    let policy = load_policy(policy_path, default_cap)?;
    if strict {
        policy
            .validate()
            .with_context(|| format!("policy {:?} rejected", policy_path))?;
    }

    let incidents = load_incidents(failures_path)?;
    info!(incidents = incidents.len(), "loaded failures");

    let plan = compute_plan(&policy, &incidents).context("compute plan")?;
    write_plan_json(output, &plan)?;

    let digest = plan_digest(&plan).context("digest plan")?;
    emit_plan_written(output, plan.len(), &digest);

    if let Some(path) = summary {
        let report = PlanSummary::from_entries(&plan).context("summarize plan")?;
        write_plan_summary_md(path, &report)?;
        info!(path = %path.display(), "wrote summary");
    }

    Ok(PlanWritten {
        entries: plan.len(),
        digest,
    })
}

fn cmd_validate(policy_path: &Path) -> Result<()> {
    let policy = load_policy(policy_path, None)?;
    policy
        .validate()
        .with_context(|| format!("policy {:?} rejected", policy_path))?;

    println!("Policy OK: {}", policy_path.display());
    println!("  layers:        {}", policy.layer_minutes.len());
    println!("  environments:  {}", policy.env_multiplier.len());
    println!("  failure types: {}", policy.failure_multiplier.len());
    println!("  modules:       {}", policy.module_priority.len());
    match policy.cap {
        Some(cap) => println!("  cap:           {} min", cap),
        None => println!("  cap:           none"),
    }
    Ok(())
}

fn cmd_policy(policy_path: &Path, default_cap: Option<Decimal>) -> Result<()> {
    let policy = load_policy(policy_path, default_cap)?;
    let rendered = serde_json::to_string_pretty(&policy).context("serialize policy")?;
    println!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::{json, Value};

    const POLICY: &str = "minutes_per_impacted_layer:\n  db: 10\n  api: 5\nmultipliers:\n  by_environment:\n    prod: 2.0\n  by_failure_type:\n    timeout: 1.5\nmodule_priority_score:\n  payments: 3\n";

    const FAILURES: &str = "{\"test_id\":\"T-1\",\"module\":\"search\",\"impacted_layers\":[\"api\"]}\n{\"test_id\":\"T-2\",\"module\":\"payments\",\"environment\":\"prod\",\"failure_type\":\"timeout\",\"impacted_layers\":[\"db\",\"api\"]}\n";

    fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
        let policy = dir.join("policy.yaml");
        let failures = dir.join("failures.jsonl");
        std::fs::write(&policy, POLICY).expect("write policy");
        std::fs::write(&failures, FAILURES).expect("write failures");
        (policy, failures)
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plan_args_parse_with_defaults() {
        let cli = Cli::try_parse_from([
            "triage-plan",
            "plan",
            "--policy",
            "p.yaml",
            "--failures",
            "f.jsonl",
            "--default-cap",
            "60",
        ])
        .expect("parse");

        match cli.command {
            Commands::Plan {
                output,
                default_cap,
                strict,
                ..
            } => {
                assert_eq!(output, PathBuf::from("plan.json"));
                assert_eq!(default_cap, Some(Decimal::from(60)));
                assert!(!strict);
            }
            _ => panic!("expected plan command"),
        }
    }

    #[test]
    fn plan_writes_ranked_output_and_summary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (policy, failures) = write_inputs(dir.path());
        let output = dir.path().join("plan.json");
        let summary = dir.path().join("plan.md");

        let written = cmd_plan(&policy, &failures, &output, Some(&summary), None, true)
            .expect("plan");
        assert_eq!(written.entries, 2);
        assert_eq!(written.digest.len(), 64);

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(&output).expect("read")).expect("json");
        assert_eq!(raw[0]["test_id"], json!("T-2"));
        // no cap in the policy: 15 * 2.0 * 1.5
        assert_eq!(raw[0]["Final_minutes"], json!(45.0));
        assert_eq!(raw[1]["test_id"], json!("T-1"));
        assert!(summary.exists());
    }

    #[test]
    fn default_cap_applies_when_policy_has_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (policy, failures) = write_inputs(dir.path());
        let output = dir.path().join("plan.json");

        cmd_plan(&policy, &failures, &output, None, Some(Decimal::from(40)), false)
            .expect("plan");

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(&output).expect("read")).expect("json");
        assert_eq!(raw[0]["Final_minutes"], json!(40.0));
    }

    #[test]
    fn rerun_produces_same_digest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (policy, failures) = write_inputs(dir.path());

        let a = cmd_plan(&policy, &failures, &dir.path().join("a.json"), None, None, false)
            .expect("first");
        let b = cmd_plan(&policy, &failures, &dir.path().join("b.json"), None, None, false)
            .expect("second");
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn strict_mode_rejects_negative_minutes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_, failures) = write_inputs(dir.path());
        let policy = dir.path().join("bad.yaml");
        std::fs::write(&policy, "minutes_per_impacted_layer:\n  db: -5\n").expect("write");

        let err = cmd_plan(
            &policy,
            &failures,
            &dir.path().join("plan.json"),
            None,
            None,
            true,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("minutes_per_impacted_layer.db"));
        assert!(cmd_validate(&policy).is_err());
    }

    #[test]
    fn validate_accepts_good_policy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (policy, _) = write_inputs(dir.path());
        cmd_validate(&policy).expect("valid");
    }
}
