//! Named skill registry for a single agent.
//!
//! A [`SkillSet`] is built once at agent construction and never mutated
//! afterwards, so it carries no interior locking.  Lookups, catalog
//! formatting, and direct execution of script skills all go through it.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use tandem_engine::EngineFactory;

use crate::error::{Result, SkillError};
use crate::types::{Skill, SkillKind};

/// Mapping from skill name to [`Skill`], unique per agent.
#[derive(Debug, Clone, Default)]
pub struct SkillSet {
    skills: BTreeMap<String, Skill>,
}

impl SkillSet {
    /// Create an empty skill set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a skill.  Names are unique within an agent.
    pub fn register(&mut self, skill: Skill) -> Result<()> {
        if self.skills.contains_key(&skill.name) {
            return Err(SkillError::Duplicate {
                name: skill.name.clone(),
            });
        }
        tracing::debug!(skill = %skill.name, kind = ?skill.kind, "skill registered");
        self.skills.insert(skill.name.clone(), skill);
        Ok(())
    }

    /// Look up a skill by name.
    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.get(name)
    }

    /// All skills in name order.
    pub fn list(&self) -> Vec<&Skill> {
        self.skills.values().collect()
    }

    /// Number of registered skills.
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Run an executable skill directly, bypassing the LLM.
    ///
    /// Fails with [`SkillError::NotFound`] for unknown names and
    /// [`SkillError::NotExecutable`] for descriptive skills.
    pub async fn execute(
        &self,
        name: &str,
        input: HashMap<String, String>,
        engine: Arc<dyn EngineFactory>,
    ) -> Result<String> {
        let skill = self
            .skills
            .get(name)
            .ok_or_else(|| SkillError::NotFound(name.to_owned()))?;

        let script = match (skill.kind, &skill.script) {
            (SkillKind::Executable, Some(script)) => Arc::clone(script),
            _ => return Err(SkillError::NotExecutable(name.to_owned())),
        };

        tracing::info!(skill = %name, "executing skill script");
        script(input, engine).await
    }

    /// One line per skill, tagged `[descriptive]` or `[script]`.
    pub fn catalog_string(&self) -> String {
        self.skills
            .values()
            .map(|s| {
                let tag = match s.kind {
                    SkillKind::Descriptive => "descriptive",
                    SkillKind::Executable => "script",
                };
                format!("- {} [{}]: {}", s.name, tag, s.description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
