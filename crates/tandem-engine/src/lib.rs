//! Command-engine contract for Tandem.
//!
//! The engine is the external executor that workers drive: a set of
//! line-oriented subcommands (`read`, `write`, `patch`, `search`, `exec`, the
//! `git-*` family, ...) invoked with CLI-style `--key value` arguments.  Its
//! behavior lives outside this repository; this crate defines only the
//! contract the orchestration core programs against:
//!
//! - [`Engine`] / [`EngineFactory`] -- one engine *session* per tool call,
//!   constructed around a pair of injected output writers.
//! - [`StreamWriter`] -- line-buffered capture with a per-line callback, so
//!   parallel workers can collect output without sharing a stream.
//! - [`command`] -- subcommand metadata: the write-command classification that
//!   drives read-only policy and file locking, and per-command usage hints
//!   consumed by agent prompt assembly.

pub mod command;
pub mod error;
pub mod stream;
pub mod traits;

pub use command::{WRITE_COMMANDS, arg_hint, is_write_command, known_subcommands};
pub use error::{EngineError, Result};
pub use stream::StreamWriter;
pub use traits::{Engine, EngineFactory};
