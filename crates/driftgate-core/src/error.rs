//! Fatal error taxonomy for the engine.
//!
//! Only conditions that abort an operation live here. Per-rule evaluation
//! failures are captured as [`crate::rules::RuleViolation`] records, and a
//! corrupt ledger file is recovered to an empty history — neither surfaces
//! as a `GateError`.

use thiserror::Error;

/// Fatal engine error.
#[derive(Debug, Error)]
pub enum GateError {
    /// Unusable input: no header row, no numeric column, or a stress target
    /// that is neither a file nor a directory.
    #[error("invalid input: {0}")]
    Input(String),

    /// Malformed configuration primitive (weights string, score mode, …).
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, GateError>;
