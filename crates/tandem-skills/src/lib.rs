//! Skill system for Tandem worker agents.
//!
//! A skill is a named capability attached to an agent.  It comes in two
//! flavors:
//!
//! - **Descriptive** skills are prompt-time knowledge: they appear in the
//!   agent's catalog so the LLM knows the capability exists and how to reach
//!   it through ordinary tool calls.
//!
//! - **Executable** skills carry a script body the worker engine can invoke
//!   directly, bypassing the LLM entirely for mechanical operations.
//!
//! The crate also defines the **persona record** types and the read-only
//! [`PersonaRepository`] trait.  Persona loading (YAML-frontmatter Markdown
//! on disk) happens outside this workspace; the orchestration core only
//! consumes the records, promoting them into custom worker agents.

pub mod error;
pub mod repository;
pub mod set;
pub mod types;

pub use error::{Result, SkillError};
pub use repository::PersonaRepository;
pub use set::SkillSet;
pub use types::{
    PersonaAgentRecord, PersonaSkillRecord, ScriptFn, ScriptInterpreter, Skill, SkillKind,
    inferred_exec_command,
};
