//! Error types for the skill subsystem.

/// Skill-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("skill not found: `{0}`")]
    NotFound(String),

    #[error("skill `{0}` is descriptive and cannot be executed")]
    NotExecutable(String),

    #[error("skill `{name}` is already registered")]
    Duplicate { name: String },

    #[error("script execution failed for skill `{skill}`: {reason}")]
    ScriptFailed { skill: String, reason: String },

    #[error("persona repository error: {0}")]
    Repository(String),

    #[error("engine error: {0}")]
    Engine(#[from] tandem_engine::EngineError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SkillError>;
