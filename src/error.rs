//! Error types for the scorekeeper.

use thiserror::Error;

/// Result type alias for scorekeeper operations
pub type Result<T> = std::result::Result<T, ScoreError>;

/// Errors that can occur while keeping score.
#[derive(Error, Debug)]
pub enum ScoreError {
    /// Failed to read or write a local file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Cached state could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A round with both winner flags set
    #[error("Invalid round {round_id}: both teams marked as winner")]
    InvalidRound { round_id: String },

    /// Rejected user input (blank name, non-positive payout, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stake or balance left the representable range
    #[error("Amount overflow while {0}")]
    AmountOverflow(String),

    /// The resolved player is already on the roster
    #[error("Player '{name}' is already on the roster")]
    DuplicatePlayer { name: String },

    /// No roster entry matches the given id or name
    #[error("No player matching '{0}' on the roster")]
    PlayerNotFound(String),

    /// Tried to remove a round from an empty history
    #[error("No rounds to remove")]
    NoRounds,

    /// A destructive action was attempted without confirmation
    #[error("Refusing to {action} without confirmation (pass --yes)")]
    ConfirmationRequired { action: String },

    /// The document store failed; local state is left untouched
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Compare-and-set on lifetime records lost a race
    #[error("Lifetime records changed concurrently (expected revision {expected}, found {found})")]
    Conflict { expected: u64, found: u64 },
}

impl ScoreError {
    /// Wraps any displayable failure as a persistence error with context.
    pub fn persistence(context: &str, err: impl std::fmt::Display) -> Self {
        ScoreError::Persistence(format!("{}: {}", context, err))
    }
}
