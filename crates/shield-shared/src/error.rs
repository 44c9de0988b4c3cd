//! Error taxonomy for the report pipeline.
//!
//! Every failure is scoped to the session or request that produced it.
//! Nothing here is fatal to the process.

use crate::contract::SchemaViolation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix shown to the user when a live generation fails
pub const GENERATION_FAILED_PREFIX: &str = "Failed to generate AI response.";

/// Coarse category of a [`ShieldError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Network,
    Parse,
    Schema,
    NotFound,
    Storage,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Input => "input",
            ErrorKind::Network => "network",
            ErrorKind::Parse => "parse",
            ErrorKind::Schema => "schema",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShieldError {
    /// Blank issue text or an invalid setting, rejected before any external call
    #[error("Input error: {0}")]
    Input(String),

    /// Transport failure, timeout or non-2xx status from the generation service
    #[error("Network error: {0}")]
    Network(String),

    /// The service returned something that is not well-formed JSON
    #[error("Parse error: the service returned unparsable output ({0})")]
    Parse(String),

    /// Well-formed but contract-violating document
    #[error("Schema violation: {0}")]
    Schema(SchemaViolation),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Programming errors; never produced by expected failure modes
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShieldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShieldError::Input(_) => ErrorKind::Input,
            ShieldError::Network(_) => ErrorKind::Network,
            ShieldError::Parse(_) => ErrorKind::Parse,
            ShieldError::Schema(_) => ErrorKind::Schema,
            ShieldError::NotFound(_) => ErrorKind::NotFound,
            ShieldError::Storage(_) => ErrorKind::Storage,
            ShieldError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ShieldError::Input(_) => -32602,
            ShieldError::Network(_) => -32001,
            ShieldError::Parse(_) => -32700,
            ShieldError::Schema(_) => -32002,
            ShieldError::NotFound(_) => -32004,
            ShieldError::Storage(_) => -32005,
            ShieldError::Internal(_) => -32603,
        }
    }

    /// Only transport-level failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShieldError::Network(_))
    }

    /// Text shown in the report's display slot when generation fails
    pub fn user_message(&self) -> String {
        match self {
            ShieldError::Input(msg) => msg.clone(),
            ShieldError::NotFound(what) => format!("Nothing found for {}.", what),
            ShieldError::Schema(v) => format!(
                "{} The service returned a document that violates the report contract: {}",
                GENERATION_FAILED_PREFIX, v
            ),
            ShieldError::Parse(_) => format!(
                "{} The service returned unparsable output.",
                GENERATION_FAILED_PREFIX
            ),
            other => format!("{} {}", GENERATION_FAILED_PREFIX, other),
        }
    }
}

impl From<SchemaViolation> for ShieldError {
    fn from(v: SchemaViolation) -> Self {
        ShieldError::Schema(v)
    }
}

impl From<serde_json::Error> for ShieldError {
    fn from(e: serde_json::Error) -> Self {
        ShieldError::Parse(e.to_string())
    }
}

pub type ShieldResult<T> = std::result::Result<T, ShieldError>;
