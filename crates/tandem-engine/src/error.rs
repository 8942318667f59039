//! Engine error types.

/// Errors surfaced by engine sessions.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested subcommand is not part of the engine's surface.
    #[error("unknown subcommand: `{subcommand}`")]
    UnknownSubcommand { subcommand: String },

    /// The subcommand ran but reported failure.
    #[error("`{subcommand}` failed: {reason}")]
    ExecutionFailed { subcommand: String, reason: String },

    /// The invocation was cancelled before completion.
    #[error("execution cancelled")]
    Cancelled,

    /// Underlying I/O failure while streaming output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;
