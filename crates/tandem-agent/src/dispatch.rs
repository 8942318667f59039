//! Agent-call directive parsing.
//!
//! The supervisor LLM fans work out by embedding `<agent_call>` tags in its
//! response:
//!
//! ```text
//! <agent_call agent="coder" task="implement the parser" />
//! <agent_call agent="reviewer" task="review it">focus on error paths</agent_call>
//! ```
//!
//! Each accepted directive gets a fresh process-unique `ac-N` id and is
//! returned in textual order.

use crate::callid::next_call_id;
use crate::tagscan::scan_tags;

/// A parsed dispatch directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCall {
    /// Target agent type, lowercased.
    pub agent: String,
    /// The task description; paired-tag bodies are appended on a new line.
    pub task: String,
    /// Process-unique call id (`ac-N`).
    pub id: String,
    /// The raw directive text as it appeared in the response.
    pub raw: String,
}

/// Extract every well-formed `<agent_call>` directive from `text`.
///
/// Directives missing either the `agent` or `task` attribute are discarded.
pub fn parse_agent_calls(text: &str) -> Vec<AgentCall> {
    scan_tags(text, "agent_call")
        .into_iter()
        .filter_map(|tag| {
            let agent = tag.attr("agent")?.to_ascii_lowercase();
            let mut task = tag.attr("task")?.to_owned();

            if let Some(body) = &tag.body {
                let body = body.trim();
                if !body.is_empty() {
                    task.push('\n');
                    task.push_str(body);
                }
            }

            let call = AgentCall {
                agent,
                task,
                id: next_call_id(),
                raw: tag.raw,
            };
            tracing::debug!(agent = %call.agent, call_id = %call.id, "agent call parsed");
            Some(call)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
