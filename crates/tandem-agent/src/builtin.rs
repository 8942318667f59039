//! Built-in worker agents.
//!
//! Twelve constant-configured specialists, each an adapter over the ReAct
//! loop with a fixed identity, system prompt, command whitelist, and
//! read-only flag.  The planner is the one exception: it has no tool access
//! and answers with a single LLM call.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tandem_engine::{arg_hint, is_write_command};
use tandem_skills::SkillSet;

use crate::error::AgentError;
use crate::llm::ChatMessage;
use crate::react::{AgentResult, ReactConfig, react_loop};
use crate::worker::{WorkerAgent, WorkerDeps};

/// Agent types that custom agents may never override.
pub const RESERVED_TYPES: &[&str] = &[
    "coder",
    "deps",
    "diagnostics",
    "file",
    "formatter",
    "git",
    "planner",
    "refactor",
    "reviewer",
    "search",
    "shell",
    "tester",
];

/// Whether `agent_type` (any case) names a built-in agent.
pub fn is_reserved_type(agent_type: &str) -> bool {
    let lower = agent_type.to_ascii_lowercase();
    RESERVED_TYPES.contains(&lower.as_str())
}

/// The reserved type list as owned strings.
pub fn reserved_types() -> Vec<String> {
    RESERVED_TYPES.iter().map(|s| (*s).to_owned()).collect()
}

// ---------------------------------------------------------------------------
// Prompt assembly
// ---------------------------------------------------------------------------

/// The tool-call grammar every tool-capable worker is taught.
pub(crate) const TOOL_PROTOCOL: &str = r#"## Tool Protocol
Invoke engine commands by emitting tool-call tags in your response:
    <tool_call name="@agent" args="SUBCOMMAND --flag value" />
or with JSON arguments:
    <tool_call name="@agent" args='{"cmd":"SUBCOMMAND","args":{"flag":"value"}}' />
Results arrive in the next user message. Emit INDEPENDENT calls together in
one response; emit DEPENDENT calls in later turns, after their inputs exist.
When the task is complete, reply with plain text and no tool calls.
"#;

/// Warning injected into read-only agents' prompts.
pub(crate) const READ_ONLY_WARNING: &str =
    "READ-ONLY: you may not modify any file or run any command that mutates \
     state. Report what you find; never attempt a workaround.\n";

/// Footer rules shared by every worker prompt.
pub(crate) const RULE_FOOTER: &str = "## Rules\n\
     - Use only the commands listed above.\n\
     - Prefer small, verifiable steps; read before you write.\n\
     - Your final plain-text reply is reported back to the supervisor, so \
       make it a concise account of what you did and found.\n";

/// Bullet list of commands with their usage hints.
pub(crate) fn command_listing(commands: &[String]) -> String {
    if commands.is_empty() {
        return "(none -- answer from reasoning alone)\n".to_owned();
    }
    let mut out = String::new();
    for command in commands {
        match arg_hint(command) {
            Some(hint) => out.push_str(&format!("- {hint}\n")),
            None => out.push_str(&format!("- {command}\n")),
        }
    }
    out
}

/// Compose the common worker prompt: identity, mission, tool protocol,
/// command list with usage hints, read-only warning, skill catalog, rules.
pub(crate) fn compose_worker_prompt(
    agent_type: &str,
    description: &str,
    mission: &str,
    commands: &[String],
    read_only: bool,
    skills: &SkillSet,
) -> String {
    let mut prompt = format!(
        "You are the Tandem `{agent_type}` agent: {description}\n\n## Mission\n{mission}\n"
    );

    prompt.push('\n');
    prompt.push_str(TOOL_PROTOCOL);

    prompt.push_str("\n## Available Commands\n");
    prompt.push_str(&command_listing(commands));

    if read_only {
        prompt.push('\n');
        prompt.push_str(READ_ONLY_WARNING);
    }

    if !skills.is_empty() {
        prompt.push_str("\n## Skills\n");
        prompt.push_str(&skills.catalog_string());
        prompt.push('\n');
    }

    prompt.push('\n');
    prompt.push_str(RULE_FOOTER);

    prompt
}

/// Deduplicate and sort a command list.
pub(crate) fn normalize_commands(commands: &[&str]) -> Vec<String> {
    commands
        .iter()
        .map(|c| (*c).to_owned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// The standard built-in agent
// ---------------------------------------------------------------------------

/// A constant-configured worker running the ReAct loop.
pub struct BuiltinAgent {
    agent_type: &'static str,
    description: &'static str,
    system_prompt: String,
    allowed_commands: Vec<String>,
    read_only: bool,
    skills: SkillSet,
}

impl BuiltinAgent {
    fn new(
        agent_type: &'static str,
        description: &'static str,
        mission: &'static str,
        commands: &[&str],
        read_only: bool,
    ) -> Self {
        let allowed_commands = normalize_commands(commands);
        debug_assert!(
            !read_only || !allowed_commands.iter().any(|c| is_write_command(c)),
            "read-only agent `{agent_type}` lists a write command"
        );
        let skills = SkillSet::new();
        let system_prompt = compose_worker_prompt(
            agent_type,
            description,
            mission,
            &allowed_commands,
            read_only,
            &skills,
        );
        Self {
            agent_type,
            description,
            system_prompt,
            allowed_commands,
            read_only,
            skills,
        }
    }
}

#[async_trait]
impl WorkerAgent for BuiltinAgent {
    fn agent_type(&self) -> &str {
        self.agent_type
    }

    fn description(&self) -> &str {
        self.description
    }

    fn system_prompt(&self) -> String {
        self.system_prompt.clone()
    }

    fn allowed_commands(&self) -> &[String] {
        &self.allowed_commands
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn skills(&self) -> &SkillSet {
        &self.skills
    }

    async fn execute(
        &self,
        token: &CancellationToken,
        task: &str,
        deps: &WorkerDeps,
    ) -> AgentResult {
        let config = ReactConfig {
            max_turns: 0,
            system_prompt: self.system_prompt.clone(),
            allowed_commands: self.allowed_commands.clone(),
            read_only: self.read_only,
        };
        react_loop(token, &config, self.agent_type, task, deps).await
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// The planner has no tool access: one LLM call in, plan text out.
pub struct PlannerAgent {
    system_prompt: String,
    allowed_commands: Vec<String>,
    skills: SkillSet,
}

impl PlannerAgent {
    fn new() -> Self {
        let system_prompt = r#"You are the Tandem `planner` agent: you decompose goals into ordered task lists.

## Mission
Given a goal, produce a numbered plan of concrete steps. For each step name
the agent type best suited to it (file, search, coder, shell, git, reviewer,
tester, refactor, formatter, diagnostics, deps) and state what it should do.
Mark which steps are independent of each other and can run in parallel.

You have no tool access. Answer from reasoning alone, in plain text.
"#
        .to_owned();
        Self {
            system_prompt,
            allowed_commands: Vec::new(),
            skills: SkillSet::new(),
        }
    }
}

#[async_trait]
impl WorkerAgent for PlannerAgent {
    fn agent_type(&self) -> &str {
        "planner"
    }

    fn description(&self) -> &str {
        "Decomposes goals into ordered, dependency-aware task lists."
    }

    fn system_prompt(&self) -> String {
        self.system_prompt.clone()
    }

    fn allowed_commands(&self) -> &[String] {
        &self.allowed_commands
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn skills(&self) -> &SkillSet {
        &self.skills
    }

    async fn execute(
        &self,
        token: &CancellationToken,
        task: &str,
        deps: &WorkerDeps,
    ) -> AgentResult {
        let history = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(task),
        ];
        let mut result = AgentResult {
            agent: "planner".to_owned(),
            task: task.to_owned(),
            ..Default::default()
        };

        let response = tokio::select! {
            _ = token.cancelled() => {
                result.error = Some(AgentError::Cancelled.to_string());
                return result;
            }
            res = deps.llm.send_prompt("", &history, 0) => res,
        };

        match response {
            Ok(text) => result.output = text,
            Err(e) => {
                result.error = Some(
                    AgentError::LlmTurnFailed {
                        turn: 0,
                        reason: e.to_string(),
                    }
                    .to_string(),
                );
            }
        }
        result
    }
}

// ---------------------------------------------------------------------------
// The twelve
// ---------------------------------------------------------------------------

/// Construct the full set of built-in agents.
pub fn builtin_agents() -> Vec<Arc<dyn WorkerAgent>> {
    vec![
        Arc::new(BuiltinAgent::new(
            "file",
            "Fast filesystem reconnaissance: reads files, lists trees, searches content.",
            "Answer questions about what exists in the workspace. Read the files \
             the task names, search for the terms it mentions, and report the \
             relevant contents verbatim with paths and line context.",
            &["read", "tree", "search"],
            true,
        )),
        Arc::new(BuiltinAgent::new(
            "search",
            "Locates symbols, patterns, and usages across the workspace.",
            "Find every occurrence that matters for the task: definitions, call \
             sites, configuration references. Start broad, narrow by directory, \
             and report findings as `path: context` lines.",
            &["search", "tree", "read"],
            true,
        )),
        Arc::new(BuiltinAgent::new(
            "reviewer",
            "Reviews code for defects, style drift, and risky changes.",
            "Read the code under review and report concrete problems: logic \
             errors, missed edge cases, inconsistent naming, unsafe patterns. \
             Cite file and line for every finding. Do not propose patches you \
             cannot verify by reading.",
            &["read", "search", "tree"],
            true,
        )),
        Arc::new(PlannerAgent::new()),
        Arc::new(BuiltinAgent::new(
            "coder",
            "Implements and edits code.",
            "Make the change the task describes. Read the affected files first, \
             then write new files or patch existing ones with minimal, focused \
             diffs. Match the surrounding style.",
            &["write", "patch", "read", "tree"],
            false,
        )),
        Arc::new(BuiltinAgent::new(
            "shell",
            "Runs shell commands and test suites.",
            "Execute the commands the task requires and report their output \
             faithfully, including failures. Never chain destructive commands \
             without being asked.",
            &["exec", "test"],
            false,
        )),
        Arc::new(BuiltinAgent::new(
            "git",
            "Inspects and operates on the repository history.",
            "Use the git subcommands to answer questions about repository \
             state: what changed, what is staged, which branch is active, what \
             the recent history looks like. Use exec only for git operations \
             the dedicated subcommands do not cover.",
            &["git-status", "git-diff", "git-log", "git-changed", "git-branch", "exec"],
            false,
        )),
        Arc::new(BuiltinAgent::new(
            "formatter",
            "Normalizes code style and formatting.",
            "Bring files into conformance with the project's formatting rules: \
             run the formatter where one exists, patch residual style issues by \
             hand. Never change behavior.",
            &["read", "patch", "exec", "tree"],
            false,
        )),
        Arc::new(BuiltinAgent::new(
            "refactor",
            "Restructures code without changing behavior.",
            "Apply the requested restructuring: rename, extract, move, inline. \
             Search for every usage before touching a definition, and keep each \
             patch mechanical and reviewable.",
            &["read", "write", "patch", "search", "tree"],
            false,
        )),
        Arc::new(BuiltinAgent::new(
            "tester",
            "Writes and runs tests.",
            "Add the tests the task asks for, mirroring the project's existing \
             test layout and assertion style, then run them and report results. \
             A failing test you wrote is a finding, not an error.",
            &["read", "write", "patch", "exec", "test", "search", "tree"],
            false,
        )),
        Arc::new(BuiltinAgent::new(
            "diagnostics",
            "Investigates build failures and runtime errors.",
            "Reproduce the reported failure, read the surrounding code and \
             logs, and narrow the cause. Report the smallest explanation that \
             accounts for every symptom, plus the evidence.",
            &["read", "search", "tree", "exec"],
            false,
        )),
        Arc::new(BuiltinAgent::new(
            "deps",
            "Audits and updates project dependencies.",
            "Inspect manifest and lock files, query the toolchain for outdated \
             or vulnerable dependencies, and report exact versions with the \
             commands needed to update them.",
            &["read", "exec", "search", "tree"],
            false,
        )),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
