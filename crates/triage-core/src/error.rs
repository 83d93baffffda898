//! Error taxonomy for policy resolution and plan computation.

/// Errors produced while resolving a policy or scoring incidents.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("policy section {section} must be a mapping")]
    InvalidSection { section: String },

    #[error("value at {path} is not a number: {value}")]
    InvalidNumber { path: String, value: String },

    #[error("value at {path} is outside the decimal range: {value}")]
    OutOfRange { path: String, value: String },

    #[error("invalid policy value at {path}: {reason}")]
    InvalidPolicy { path: String, reason: String },

    #[error("decimal overflow while computing {stage} for test {test_id}")]
    Overflow { test_id: String, stage: &'static str },

    #[error("decimal overflow while computing {stage} across the plan")]
    TotalOverflow { stage: &'static str },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for plan operations.
pub type Result<T> = std::result::Result<T, PlanError>;
