//! Worker agent registry.
//!
//! Thread-safe mapping from agent type to implementation, backed by
//! [`DashMap`] (lock-free reads, per-entry write locking), shared across the
//! dispatcher and loaders.  Built-in type names are reserved: a custom agent
//! can never shadow one, so `get("coder")` is always the built-in regardless
//! of what a persona directory declares.

use std::sync::Arc;

use dashmap::DashMap;

use crate::builtin::{builtin_agents, is_reserved_type};
use crate::error::{AgentError, Result};
use crate::worker::WorkerAgent;

/// Concurrent agent registry.  Cheaply cloneable and `Send + Sync`.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: Arc<DashMap<String, Arc<dyn WorkerAgent>>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the twelve built-ins.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for agent in builtin_agents() {
            // Built-in types are unique by construction.
            registry.agents.insert(agent.agent_type().to_owned(), agent);
        }
        registry
    }

    /// Register an agent under its (lowercase) type.
    ///
    /// Fails on duplicates; use [`AgentRegistry::register_custom`] for
    /// persona-derived agents so reserved names are enforced too.
    pub fn register(&self, agent: Arc<dyn WorkerAgent>) -> Result<()> {
        let key = agent.agent_type().to_ascii_lowercase();
        if self.agents.contains_key(&key) {
            return Err(AgentError::DuplicateAgentType { agent: key });
        }
        tracing::info!(agent = %key, "agent registered");
        self.agents.insert(key, agent);
        Ok(())
    }

    /// Register a custom agent, refusing reserved built-in names.
    pub fn register_custom(&self, agent: Arc<dyn WorkerAgent>) -> Result<()> {
        let key = agent.agent_type().to_ascii_lowercase();
        if is_reserved_type(&key) {
            return Err(AgentError::ReservedAgentType { agent: key });
        }
        self.register(agent)
    }

    /// Look up an agent by type (case-insensitive).
    pub fn get(&self, agent_type: &str) -> Option<Arc<dyn WorkerAgent>> {
        self.agents
            .get(&agent_type.to_ascii_lowercase())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Whether an agent type is registered.
    pub fn contains(&self, agent_type: &str) -> bool {
        self.agents.contains_key(&agent_type.to_ascii_lowercase())
    }

    /// All agents, sorted by type name for deterministic catalogs.
    pub fn all(&self) -> Vec<Arc<dyn WorkerAgent>> {
        let mut agents: Vec<_> = self
            .agents
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        agents.sort_by(|a, b| a.agent_type().cmp(b.agent_type()));
        agents
    }

    /// All registered type names, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<_> = self.agents.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Markdown catalog describing every agent, injected into the supervisor
    /// system prompt.
    pub fn catalog_string(&self) -> String {
        let mut catalog = String::new();
        for agent in self.all() {
            catalog.push_str(&format!("## {}\n", agent.agent_type()));
            catalog.push_str(agent.description());
            catalog.push('\n');
            if agent.is_read_only() {
                catalog.push_str("READ-ONLY\n");
            }
            let commands = agent.allowed_commands();
            if commands.is_empty() {
                catalog.push_str("Commands: (none)\n");
            } else {
                catalog.push_str(&format!("Commands: {}\n", commands.join(", ")));
            }
            let skills = agent.skills();
            if !skills.is_empty() {
                catalog.push_str("Skills:\n");
                catalog.push_str(&skills.catalog_string());
                catalog.push('\n');
            }
            catalog.push('\n');
        }
        catalog
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom::CustomAgent;
    use tandem_skills::PersonaAgentRecord;

    fn custom(name: &str) -> Arc<dyn WorkerAgent> {
        Arc::new(CustomAgent::from_persona(
            &PersonaAgentRecord {
                name: name.to_owned(),
                description: "test".to_owned(),
                tools: vec!["Read".to_owned()],
                skills: Vec::new(),
                content: String::new(),
            },
            &[],
        ))
    }

    #[test]
    fn builtins_are_registered() {
        let registry = AgentRegistry::with_builtins();
        assert_eq!(registry.len(), 12);
        assert!(registry.get("coder").is_some());
        assert!(registry.get("CODER").is_some());
        assert!(registry.get("stylist").is_none());
    }

    #[test]
    fn custom_cannot_shadow_builtin() {
        let registry = AgentRegistry::with_builtins();
        let err = registry.register_custom(custom("Coder")).unwrap_err();
        assert!(matches!(err, AgentError::ReservedAgentType { .. }));

        // The built-in survives.
        let agent = registry.get("coder").unwrap();
        assert!(agent.allowed_commands().contains(&"write".to_owned()));
    }

    #[test]
    fn duplicate_custom_names_rejected() {
        let registry = AgentRegistry::with_builtins();
        registry.register_custom(custom("stylist")).unwrap();
        let err = registry.register_custom(custom("Stylist")).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateAgentType { .. }));
    }

    #[test]
    fn all_is_sorted_by_type() {
        let registry = AgentRegistry::with_builtins();
        registry.register_custom(custom("aardvark")).unwrap();

        let types: Vec<_> = registry.all().iter().map(|a| a.agent_type().to_owned()).collect();
        let mut sorted = types.clone();
        sorted.sort();
        assert_eq!(types, sorted);
        assert_eq!(types[0], "aardvark");
    }

    #[test]
    fn catalog_lists_every_agent() {
        let registry = AgentRegistry::with_builtins();
        let catalog = registry.catalog_string();
        for agent in registry.all() {
            assert!(catalog.contains(&format!("## {}", agent.agent_type())));
        }
        assert!(catalog.contains("READ-ONLY"));
        assert!(catalog.contains("Commands: (none)")); // planner
    }
}
