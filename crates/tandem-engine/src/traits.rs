//! Engine session traits.
//!
//! A worker obtains a fresh [`Engine`] session per tool call from an
//! [`EngineFactory`], handing it a pair of [`StreamWriter`]s that capture
//! stdout and stderr.  Sessions are single-use: the orchestration core never
//! shares one across tool calls, which is what lets read-only calls run in
//! parallel without shared buffers.

use async_trait::async_trait;

use crate::error::Result;
use crate::stream::StreamWriter;

/// One engine session: executes a single subcommand, streaming output into
/// the writers it was constructed with.
#[async_trait]
pub trait Engine: Send {
    /// Execute `subcommand` with CLI-style `--key value` arguments.
    ///
    /// Output is streamed through the session's writers as it is produced;
    /// the returned `Result` carries only the success/failure of the
    /// invocation itself.
    async fn execute(&mut self, subcommand: &str, args: &[String]) -> Result<()>;
}

/// Manufactures fresh engine sessions.
///
/// Implementations are expected to be cheap: the core calls `session` once
/// per tool invocation.
pub trait EngineFactory: Send + Sync {
    /// Create a session that writes stdout lines to `stdout` and stderr
    /// lines to `stderr`.
    fn session(&self, stdout: StreamWriter, stderr: StreamWriter) -> Box<dyn Engine>;
}
