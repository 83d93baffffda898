//! Incident records: one recorded test failure awaiting triage.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single test failure as supplied by the failures file.
///
/// Every field is optional on the wire. `test_id` is opaque and carried
/// through verbatim, whatever JSON scalar it happens to be.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    #[serde(default)]
    pub test_id: Option<Value>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub failure_type: Option<String>,
    /// Layers in reported order. Duplicates are kept.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub impacted_layers: Vec<String>,
}

impl IncidentRecord {
    /// Build a record for a module with the given impacted layers.
    pub fn new(module: impl Into<String>, layers: &[&str]) -> Self {
        Self {
            module: Some(module.into()),
            impacted_layers: layers.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_test_id(mut self, test_id: impl Into<Value>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_failure_type(mut self, failure_type: impl Into<String>) -> Self {
        self.failure_type = Some(failure_type.into());
        self
    }

    /// Identifier used in log lines and error messages.
    pub fn display_id(&self) -> String {
        match &self.test_id {
            None | Some(Value::Null) => "<none>".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
