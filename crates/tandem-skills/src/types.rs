//! Skill and persona record types.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tandem_engine::EngineFactory;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// How a skill participates in a worker's behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillKind {
    /// Prompt-time knowledge only; listed in the agent's catalog.
    Descriptive,
    /// Carries a script the worker engine can run directly.
    Executable,
}

/// The async body of an executable skill.
///
/// Receives the caller-supplied input map and an engine factory for shelling
/// out; returns the script's textual output.  Boxed so arbitrary closures can
/// be registered without leaking concrete types into the skill set.
pub type ScriptFn = Arc<
    dyn Fn(
            HashMap<String, String>,
            Arc<dyn EngineFactory>,
        ) -> Pin<Box<dyn Future<Output = Result<String>> + Send>>
        + Send
        + Sync,
>;

/// A named capability attached to a worker agent.
#[derive(Clone)]
pub struct Skill {
    /// Unique name within the owning agent (e.g. `changelog/generate.sh`).
    pub name: String,
    /// Short description shown in catalogs and prompts.
    pub description: String,
    /// Descriptive or executable.
    pub kind: SkillKind,
    /// The script body; present iff `kind == Executable`.
    pub script: Option<ScriptFn>,
}

impl Skill {
    /// Create a descriptive (prompt-only) skill.
    pub fn descriptive(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: SkillKind::Descriptive,
            script: None,
        }
    }

    /// Create an executable skill backed by `script`.
    pub fn executable(
        name: impl Into<String>,
        description: impl Into<String>,
        script: ScriptFn,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: SkillKind::Executable,
            script: Some(script),
        }
    }
}

impl std::fmt::Debug for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Skill")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Script interpreters
// ---------------------------------------------------------------------------

/// Supported script interpreters, inferred from file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptInterpreter {
    /// Shell script (`.sh`, `.bash`).
    Shell,
    /// Python script (`.py`).
    Python,
    /// JavaScript (`.js`, `.mjs`).
    JavaScript,
    /// TypeScript (`.ts`, `.mts`).
    TypeScript,
}

impl ScriptInterpreter {
    /// Detect the interpreter from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "sh" | "bash" => Some(Self::Shell),
            "py" => Some(Self::Python),
            "js" | "mjs" => Some(Self::JavaScript),
            "ts" | "mts" => Some(Self::TypeScript),
            _ => None,
        }
    }

    /// Detect the interpreter from a script path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// The command used to run scripts with this interpreter.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Shell => "bash",
            Self::Python => "python3",
            Self::JavaScript => "node",
            Self::TypeScript => "deno run",
        }
    }
}

/// The shell command line that executes `path`, with the interpreter inferred
/// from the extension.  Unknown extensions fall back to direct invocation.
pub fn inferred_exec_command(path: &Path) -> String {
    match ScriptInterpreter::from_path(path) {
        Some(interp) => format!("{} {}", interp.command(), path.display()),
        None => path.display().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Persona records
// ---------------------------------------------------------------------------

/// A user-authored agent description, as yielded by a persona repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaAgentRecord {
    /// The agent's name (becomes the lowercase agent type).
    pub name: String,
    /// Short description shown in the supervisor catalog.
    pub description: String,
    /// Declarative tool names (`Read`, `Grep`, `Glob`, `Bash`, `Write`,
    /// `Edit`, `Agent`).
    #[serde(default)]
    pub tools: Vec<String>,
    /// Names of skills attached to this agent.
    #[serde(default)]
    pub skills: Vec<String>,
    /// The specialized-knowledge body text.
    #[serde(default)]
    pub content: String,
}

/// A skill definition yielded by a persona repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaSkillRecord {
    /// Unique skill name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Instruction body for the LLM.
    #[serde(default)]
    pub content: String,
    /// Nested documentation files, keyed by relative path.  BTreeMap so
    /// prompt assembly iterates in sorted order.
    #[serde(default)]
    pub subskills: BTreeMap<String, PathBuf>,
    /// Bundled executable scripts, keyed by relative path.
    #[serde(default)]
    pub scripts: BTreeMap<String, PathBuf>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
