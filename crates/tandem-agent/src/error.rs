//! Orchestration error types.
//!
//! All core subsystems surface errors through [`AgentError`].  Worker
//! execution itself is deliberately infallible at the signature level (an
//! [`crate::react::AgentResult`] always comes back, carrying its error as
//! data) so a failed worker can never poison its batch.

/// Unified error type for the orchestration core.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // -- LLM errors ----------------------------------------------------------
    /// An LLM call inside a worker turn failed.
    #[error("LLM call failed on turn {turn}: {reason}")]
    LlmTurnFailed { turn: u32, reason: String },

    /// The LLM manager could not manufacture a client.
    #[error("failed to create LLM client for {provider}/{model}: {reason}")]
    ClientCreationFailed {
        provider: String,
        model: String,
        reason: String,
    },

    // -- Dispatch errors -----------------------------------------------------
    /// The requested agent type is not registered.
    #[error("unknown agent type: `{agent}`")]
    UnknownAgent { agent: String },

    /// A custom agent tried to claim a reserved built-in name.
    #[error("agent type `{agent}` is reserved for a built-in agent")]
    ReservedAgentType { agent: String },

    /// An agent with the same type is already registered.
    #[error("agent type `{agent}` is already registered")]
    DuplicateAgentType { agent: String },

    // -- Tool policy errors --------------------------------------------------
    /// The subcommand is not on the agent's whitelist.
    #[error("command `{command}` is not allowed for this agent")]
    CommandNotAllowed { command: String },

    /// A read-only agent attempted a write command.
    #[error("read-only agent may not run write command `{command}`")]
    ReadOnlyViolation { command: String },

    /// The configured policy checker denied the call.
    #[error("blocked by policy: {reason}")]
    PolicyDenied { reason: String },

    /// Tool arguments could not be decoded.
    #[error("invalid tool arguments: {reason}")]
    InvalidToolArgs { reason: String },

    // -- Cancellation --------------------------------------------------------
    /// The supervisor context was cancelled or the worker deadline passed.
    #[error("cancelled")]
    Cancelled,

    // -- Upstream crate errors -----------------------------------------------
    /// An error propagated from the engine contract.
    #[error("engine error: {0}")]
    Engine(#[from] tandem_engine::EngineError),

    /// An error propagated from the skill subsystem.
    #[error("skill error: {0}")]
    Skill(#[from] tandem_skills::SkillError),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // -- Generic -------------------------------------------------------------
    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the orchestration core.
pub type Result<T> = std::result::Result<T, AgentError>;
