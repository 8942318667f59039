//! Custom worker agents promoted from persona records.
//!
//! Users author agents declaratively: a name, a description, a list of
//! abstract tool names (`Read`, `Grep`, `Glob`, `Bash`, `Write`, `Edit`,
//! `Agent`), skill references, and a Markdown knowledge body.  This module
//! maps those declarations onto the engine's concrete subcommand surface and
//! assembles a full worker from the fields -- the prompt is built from data,
//! not code.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tandem_engine::{EngineFactory, StreamWriter};
use tandem_skills::{
    PersonaAgentRecord, PersonaSkillRecord, PersonaRepository, ScriptFn, Skill, SkillError,
    SkillSet, inferred_exec_command,
};

use crate::builtin::{
    READ_ONLY_WARNING, RULE_FOOTER, TOOL_PROTOCOL, command_listing, normalize_commands,
};
use crate::error::Result;
use crate::react::{AgentResult, ReactConfig, react_loop};
use crate::registry::AgentRegistry;
use crate::worker::{WorkerAgent, WorkerDeps};

// ---------------------------------------------------------------------------
// Tool mapping
// ---------------------------------------------------------------------------

/// Engine subcommands a declarative tool name grants.
fn map_tool(tool: &str) -> &'static [&'static str] {
    if tool.eq_ignore_ascii_case("Read") {
        &["read"]
    } else if tool.eq_ignore_ascii_case("Grep") {
        &["search"]
    } else if tool.eq_ignore_ascii_case("Glob") {
        &["tree"]
    } else if tool.eq_ignore_ascii_case("Bash") {
        &["exec", "test", "git-status", "git-diff", "git-log", "git-changed", "git-branch"]
    } else if tool.eq_ignore_ascii_case("Write") {
        &["write"]
    } else if tool.eq_ignore_ascii_case("Edit") {
        &["patch"]
    } else {
        // `Agent` and anything unrecognized grant nothing.
        &[]
    }
}

/// A tool set is read-only unless it grants `Write`, `Edit`, or `Bash`.
///
/// Note the asymmetry with the engine's write-command classification: `Bash`
/// maps to `exec`/`test`/`git-*`, of which the `git-*` subcommands are
/// read-only, but a `Bash`-capable agent is still treated as a writer.
fn is_read_only_tool_set(tools: &[String]) -> bool {
    !tools.iter().any(|t| {
        t.eq_ignore_ascii_case("Write") || t.eq_ignore_ascii_case("Edit") || t.eq_ignore_ascii_case("Bash")
    })
}

// ---------------------------------------------------------------------------
// Custom agent
// ---------------------------------------------------------------------------

/// A worker agent whose identity, prompt, whitelist, and skills come from a
/// persona record.
pub struct CustomAgent {
    agent_type: String,
    description: String,
    system_prompt: String,
    allowed_commands: Vec<String>,
    read_only: bool,
    skills: SkillSet,
}

impl CustomAgent {
    /// Build a worker from a persona record and its resolved skill records.
    pub fn from_persona(record: &PersonaAgentRecord, skills: &[PersonaSkillRecord]) -> Self {
        let agent_type = record.name.to_ascii_lowercase();

        let mut granted: Vec<&str> = record
            .tools
            .iter()
            .flat_map(|t| map_tool(t).iter().copied())
            .collect();
        if granted.is_empty() {
            granted = vec!["read", "search", "tree"];
        }
        let allowed_commands = normalize_commands(&granted);
        let read_only = is_read_only_tool_set(&record.tools);

        let skill_set = build_skill_set(skills);
        let system_prompt = compose_custom_prompt(
            &agent_type,
            &record.description,
            &record.content,
            &allowed_commands,
            read_only,
            skills,
        );

        tracing::debug!(
            agent = %agent_type,
            commands = ?allowed_commands,
            read_only,
            skills = skill_set.len(),
            "custom agent assembled"
        );

        Self {
            agent_type,
            description: record.description.clone(),
            system_prompt,
            allowed_commands,
            read_only,
            skills: skill_set,
        }
    }
}

#[async_trait]
impl WorkerAgent for CustomAgent {
    fn agent_type(&self) -> &str {
        &self.agent_type
    }

    fn description(&self) -> &str {
        &self.description
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
        react_loop(token, &config, &self.agent_type, task, deps).await
    }
}

// ---------------------------------------------------------------------------
// Prompt assembly
// ---------------------------------------------------------------------------

fn compose_custom_prompt(
    agent_type: &str,
    description: &str,
    content: &str,
    commands: &[String],
    read_only: bool,
    skills: &[PersonaSkillRecord],
) -> String {
    let mut prompt = format!("# Agent: {agent_type}\n\n{description}\n");

    if !content.trim().is_empty() {
        prompt.push_str("\n## Specialized Knowledge\n");
        prompt.push_str(content.trim());
        prompt.push('\n');
    }

    prompt.push('\n');
    prompt.push_str(TOOL_PROTOCOL);

    prompt.push_str("\n## Available Commands\n");
    prompt.push_str(&command_listing(commands));

    if read_only {
        prompt.push('\n');
        prompt.push_str(READ_ONLY_WARNING);
    }

    for skill in skills {
        prompt.push_str(&format!("\n## Skill: {}\n{}\n", skill.name, skill.description));
        if !skill.content.trim().is_empty() {
            prompt.push('\n');
            prompt.push_str(skill.content.trim());
            prompt.push('\n');
        }
        if !skill.subskills.is_empty() {
            prompt.push_str("\nReference files:\n");
            for rel in skill.subskills.keys() {
                prompt.push_str(&format!("- {rel}\n"));
            }
        }
        if !skill.scripts.is_empty() {
            prompt.push_str("\nScripts:\n");
            for (rel, abs) in &skill.scripts {
                prompt.push_str(&format!("- {rel} (run with: `{}`)\n", inferred_exec_command(abs)));
            }
        }
    }

    prompt.push('\n');
    prompt.push_str(RULE_FOOTER);

    prompt
}

// ---------------------------------------------------------------------------
// Skill promotion
// ---------------------------------------------------------------------------

/// Persona skills become descriptive entries; each bundled script becomes an
/// executable skill keyed `<skill>/<script>` that shells out via `exec`.
fn build_skill_set(skills: &[PersonaSkillRecord]) -> SkillSet {
    let mut set = SkillSet::new();

    for skill in skills {
        if let Err(e) = set.register(Skill::descriptive(&skill.name, &skill.description)) {
            tracing::warn!(skill = %skill.name, error = %e, "skipping duplicate persona skill");
            continue;
        }

        for (rel, abs) in &skill.scripts {
            let key = format!("{}/{}", skill.name, rel);
            let command = inferred_exec_command(abs);
            let skill_name = key.clone();

            let script: ScriptFn = Arc::new(move |_input, engine| {
                let command = command.clone();
                let skill_name = skill_name.clone();
                Box::pin(async move {
                    run_script_via_exec(engine, &command).await.map_err(|e| {
                        SkillError::ScriptFailed {
                            skill: skill_name.clone(),
                            reason: e.to_string(),
                        }
                    })
                })
            });

            let description = format!("Run the `{rel}` script from skill `{}`.", skill.name);
            if let Err(e) = set.register(Skill::executable(&key, description, script)) {
                tracing::warn!(skill = %key, error = %e, "skipping duplicate script skill");
            }
        }
    }

    set
}

/// Shell a script out through the engine's `exec` subcommand, capturing
/// combined output.
async fn run_script_via_exec(
    engine: Arc<dyn EngineFactory>,
    command: &str,
) -> tandem_engine::Result<String> {
    let stdout_buf = Arc::new(Mutex::new(String::new()));
    let stderr_buf = Arc::new(Mutex::new(String::new()));

    let stdout = StreamWriter::new({
        let buf = Arc::clone(&stdout_buf);
        move |line| {
            let mut b = buf.lock().unwrap();
            b.push_str(line);
            b.push('\n');
        }
    });
    let stderr = StreamWriter::new({
        let buf = Arc::clone(&stderr_buf);
        move |line| {
            let mut b = buf.lock().unwrap();
            b.push_str("ERR: ");
            b.push_str(line);
            b.push('\n');
        }
    });

    let mut session = engine.session(stdout, stderr);
    let result = session
        .execute("exec", &["--cmd".to_owned(), command.to_owned()])
        .await;
    drop(session);

    result?;
    let mut output = stdout_buf.lock().unwrap().clone();
    output.push_str(&stderr_buf.lock().unwrap());
    Ok(output)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Promote every persona record into a registered custom agent.
///
/// Reserved built-in names and duplicate custom names are skipped with a
/// warning; a bad record never aborts the load pass.  Returns the number of
/// agents registered.
pub fn load_custom_agents(
    repo: &dyn PersonaRepository,
    registry: &AgentRegistry,
) -> Result<usize> {
    let records = repo.list_agents().map_err(crate::error::AgentError::from)?;
    let mut loaded = 0;

    for record in records {
        let mut skill_records = Vec::new();
        for name in &record.skills {
            match repo.get_skill(name) {
                Ok(Some(skill)) => skill_records.push(skill),
                Ok(None) => {
                    tracing::warn!(agent = %record.name, skill = %name, "persona skill not found");
                }
                Err(e) => {
                    tracing::warn!(agent = %record.name, skill = %name, error = %e, "failed to load persona skill");
                }
            }
        }

        let agent = Arc::new(CustomAgent::from_persona(&record, &skill_records));
        match registry.register_custom(agent) {
            Ok(()) => {
                tracing::info!(agent = %record.name.to_ascii_lowercase(), "custom agent loaded");
                loaded += 1;
            }
            Err(e) => {
                tracing::warn!(agent = %record.name, error = %e, "skipping custom agent");
            }
        }
    }

    Ok(loaded)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn record(name: &str, tools: &[&str]) -> PersonaAgentRecord {
        PersonaAgentRecord {
            name: name.to_owned(),
            description: format!("{name} test agent"),
            tools: tools.iter().map(|t| (*t).to_owned()).collect(),
            skills: Vec::new(),
            content: String::new(),
        }
    }

    #[test]
    fn tool_mapping_grants_subcommands() {
        let agent = CustomAgent::from_persona(&record("Stylist", &["Read", "Edit"]), &[]);
        assert_eq!(agent.agent_type(), "stylist");
        assert_eq!(agent.allowed_commands(), ["patch", "read"]);
        assert!(!agent.is_read_only());
    }

    #[test]
    fn bash_expands_to_exec_and_git_family() {
        let agent = CustomAgent::from_persona(&record("Runner", &["Bash"]), &[]);
        let commands = agent.allowed_commands();
        for expected in ["exec", "test", "git-status", "git-diff", "git-log", "git-changed", "git-branch"] {
            assert!(commands.contains(&expected.to_owned()), "missing {expected}");
        }
        assert!(!agent.is_read_only());
    }

    #[test]
    fn empty_tool_list_gets_read_defaults() {
        let agent = CustomAgent::from_persona(&record("Scout", &[]), &[]);
        assert_eq!(agent.allowed_commands(), ["read", "search", "tree"]);
        assert!(agent.is_read_only());
    }

    #[test]
    fn agent_tool_alone_still_defaults() {
        let agent = CustomAgent::from_persona(&record("Meta", &["Agent"]), &[]);
        assert_eq!(agent.allowed_commands(), ["read", "search", "tree"]);
    }

    #[test]
    fn read_only_inferred_from_tools() {
        assert!(CustomAgent::from_persona(&record("A", &["Read", "Grep", "Glob"]), &[]).is_read_only());
        assert!(!CustomAgent::from_persona(&record("B", &["Read", "Write"]), &[]).is_read_only());
        assert!(!CustomAgent::from_persona(&record("C", &["Read", "Bash"]), &[]).is_read_only());
    }

    #[test]
    fn prompt_carries_knowledge_and_skills() {
        let mut scripts = BTreeMap::new();
        scripts.insert("run.py".to_owned(), PathBuf::from("/skills/audit/run.py"));
        let mut subskills = BTreeMap::new();
        subskills.insert("checklist.md".to_owned(), PathBuf::from("/skills/audit/checklist.md"));

        let skill = PersonaSkillRecord {
            name: "audit".to_owned(),
            description: "Audits licenses.".to_owned(),
            content: "Check every manifest.".to_owned(),
            subskills,
            scripts,
        };

        let mut rec = record("Auditor", &["Read"]);
        rec.content = "Prefer SPDX identifiers.".to_owned();

        let agent = CustomAgent::from_persona(&rec, &[skill]);
        let prompt = agent.system_prompt();

        assert!(prompt.contains("# Agent: auditor"));
        assert!(prompt.contains("## Specialized Knowledge"));
        assert!(prompt.contains("Prefer SPDX identifiers."));
        assert!(prompt.contains("## Skill: audit"));
        assert!(prompt.contains("- checklist.md"));
        assert!(prompt.contains("python3 /skills/audit/run.py"));
        assert!(prompt.contains("READ-ONLY"));
    }

    #[test]
    fn scripts_become_executable_skills() {
        let mut scripts = BTreeMap::new();
        scripts.insert("gen.sh".to_owned(), PathBuf::from("/skills/changelog/gen.sh"));

        let skill = PersonaSkillRecord {
            name: "changelog".to_owned(),
            description: "Generates changelogs.".to_owned(),
            content: String::new(),
            subskills: BTreeMap::new(),
            scripts,
        };

        let agent = CustomAgent::from_persona(&record("Historian", &["Read"]), &[skill]);
        let skills = agent.skills();

        assert!(skills.get("changelog").is_some());
        let script_skill = skills.get("changelog/gen.sh").unwrap();
        assert_eq!(script_skill.kind, tandem_skills::SkillKind::Executable);
    }
}
