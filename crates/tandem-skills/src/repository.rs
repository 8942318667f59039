//! Persona repository trait.
//!
//! Personas are user-authored Markdown files with YAML frontmatter describing
//! custom agents and their skills.  Loading and parsing those files happens
//! outside this workspace; the orchestration core only needs a read-only view
//! over the parsed records.

use crate::error::Result;
use crate::types::{PersonaAgentRecord, PersonaSkillRecord};

/// Read-only access to parsed persona records.
pub trait PersonaRepository: Send + Sync {
    /// All user-authored agent records.
    fn list_agents(&self) -> Result<Vec<PersonaAgentRecord>>;

    /// Look up a skill record by name.  Returns `Ok(None)` when the skill is
    /// referenced by an agent but absent from the repository.
    fn get_skill(&self, name: &str) -> Result<Option<PersonaSkillRecord>>;
}
