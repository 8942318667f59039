//! Worker-agent trait and per-invocation dependencies.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tandem_engine::EngineFactory;
use tandem_skills::SkillSet;

use crate::llm::LlmClient;
use crate::lockmgr::FileLockManager;
use crate::react::AgentResult;

// ---------------------------------------------------------------------------
// Policy checking
// ---------------------------------------------------------------------------

/// The outcome of a pre-tool policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The tool invocation may proceed.
    Allow,
    /// The tool invocation is denied with a reason.
    Deny(String),
}

/// Security policy hook invoked before every tool execution.
///
/// Implementations may prompt the user interactively; they are responsible
/// for serializing those prompts so concurrent workers never interleave on
/// stdin.
#[async_trait]
pub trait PolicyChecker: Send + Sync {
    /// Evaluate a tool call, prompting the user if the policy requires it.
    async fn check_and_prompt(&self, tool_name: &str, raw_args: &str) -> PolicyDecision;
}

// ---------------------------------------------------------------------------
// Worker dependencies
// ---------------------------------------------------------------------------

/// Everything a worker needs for one `execute` call.
///
/// Built fresh by the dispatcher per agent call: the LLM client is newly
/// manufactured, the lock manager and engine factory are shared process-wide.
#[derive(Clone)]
pub struct WorkerDeps {
    /// Fresh LLM client for this invocation.
    pub llm: Arc<dyn LlmClient>,
    /// Shared per-path write-lock registry.
    pub locks: Arc<FileLockManager>,
    /// Factory for per-tool-call engine sessions.
    pub engine: Arc<dyn EngineFactory>,
    /// Optional pre-execution policy hook.
    pub policy: Option<Arc<dyn PolicyChecker>>,
}

// ---------------------------------------------------------------------------
// Worker agents
// ---------------------------------------------------------------------------

/// A specialized worker: identity, prompt, tool whitelist, skills, and an
/// execution entry point.
///
/// Implementations: the twelve built-ins in [`crate::builtin`] (fixed prompt
/// and whitelist) and the persona-backed [`crate::custom::CustomAgent`].
#[async_trait]
pub trait WorkerAgent: Send + Sync {
    /// The agent's type identifier.  Always lowercase.
    fn agent_type(&self) -> &str;

    /// One-line description for the supervisor catalog.
    fn description(&self) -> &str;

    /// The system prompt this agent runs under.
    fn system_prompt(&self) -> String;

    /// Whitelisted engine subcommands, deduplicated and sorted.
    fn allowed_commands(&self) -> &[String];

    /// Whether this agent is barred from write commands.
    fn is_read_only(&self) -> bool;

    /// The agent's skill library.
    fn skills(&self) -> &SkillSet;

    /// Run a task to completion (or cancellation).
    ///
    /// Never fails at the signature level: errors come back inside the
    /// [`AgentResult`] so one worker cannot poison its batch.
    async fn execute(&self, token: &CancellationToken, task: &str, deps: &WorkerDeps)
    -> AgentResult;
}
