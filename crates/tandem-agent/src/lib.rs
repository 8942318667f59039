//! Multi-agent orchestration core for Tandem.
//!
//! This crate turns a single supervisor LLM conversation into a fan-out
//! machine: the supervisor emits `<agent_call>` directives, the dispatcher
//! runs them as a bounded pool of concurrent workers, and each worker drives
//! its own private ReAct loop against a whitelisted slice of the external
//! command engine.
//!
//! ## Architecture
//!
//! ```text
//! supervisor LLM text
//!        │  <agent_call agent="coder" task="..."/>
//!        ▼
//!  ┌───────────┐    ┌────────────┐    ┌──────────────┐
//!  │ dispatch  │───>│ Dispatcher │───>│ WorkerAgent  │  (× maxWorkers)
//!  │  parser   │    │ (semaphore)│    │  ReAct loop  │
//!  └───────────┘    └────────────┘    └──────┬───────┘
//!                                            │ <tool_call .../>
//!                                     ┌──────┴───────┐
//!                                     │ command      │
//!                                     │ engine       │
//!                                     └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`llm`] -- LLM client/manager interfaces and message types.
//! - [`lockmgr`] -- per-path mutex registry serializing file writes.
//! - [`toolcall`] / [`dispatch`] -- tag parsers for the two wire formats.
//! - [`react`] -- the worker ReAct loop (send, parse, validate, execute,
//!   feed back).
//! - [`worker`] / [`builtin`] / [`custom`] -- the worker-agent trait, the
//!   twelve built-ins, and the persona-backed custom adapter.
//! - [`registry`] -- thread-safe agent registry with reserved names.
//! - [`dispatcher`] -- bounded-concurrency fan-out executor.
//! - [`prompt`] -- supervisor system-prompt assembly.

pub mod builtin;
pub mod callid;
pub mod custom;
pub mod dispatch;
pub mod dispatcher;
pub mod error;
pub mod llm;
pub mod lockmgr;
pub mod prompt;
pub mod react;
pub mod registry;
mod tagscan;
pub mod toolcall;
pub mod worker;

pub use builtin::{builtin_agents, is_reserved_type, reserved_types};
pub use callid::next_call_id;
pub use custom::{CustomAgent, load_custom_agents};
pub use dispatch::{AgentCall, parse_agent_calls};
pub use dispatcher::{Dispatcher, DispatcherConfig, format_results};
pub use error::{AgentError, Result};
pub use llm::{ChatMessage, LlmClient, LlmManager, Role};
pub use lockmgr::FileLockManager;
pub use prompt::orchestrator_system_prompt;
pub use react::{
    AgentResult, DEFAULT_MAX_TURNS, MAX_WORKER_OUTPUT_BYTES, ReactConfig, ToolCallRecord,
    react_loop,
};
pub use registry::AgentRegistry;
pub use toolcall::{DecodedCall, ToolCallTag, decode_args, extract_file_path, parse_tool_calls};
pub use worker::{PolicyChecker, PolicyDecision, WorkerAgent, WorkerDeps};
