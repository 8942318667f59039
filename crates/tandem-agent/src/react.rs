//! The worker ReAct loop.
//!
//! Executes one worker's task against an LLM with tool access, inside the
//! agent's policy envelope.  Each turn: send the conversation, parse
//! `<tool_call>` directives from the response, validate them against the
//! whitelist and read-only flag, execute (read-only batches in parallel,
//! anything else serially, writes under per-path locks), then feed the
//! results back as a user message -- always in the LLM's own emission order,
//! never completion order.
//!
//! Tool failures never abort the loop; they surface in feedback so the LLM
//! can diagnose and retry within its remaining turn budget.  Only LLM-call
//! failures and cancellation end a run early, and both return the partial
//! result accumulated so far.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tandem_engine::{EngineFactory, StreamWriter, is_write_command};

use crate::error::AgentError;
use crate::llm::ChatMessage;
use crate::lockmgr::FileLockManager;
use crate::toolcall::{decode_args, extract_file_path, parse_tool_calls};
use crate::worker::{PolicyChecker, PolicyDecision, WorkerDeps};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Turn budget used when the config leaves `max_turns` at zero.
pub const DEFAULT_MAX_TURNS: u32 = 10;

/// Truncation cap applied to each tool's output, each turn's feedback, and
/// the final assembled output.
pub const MAX_WORKER_OUTPUT_BYTES: usize = 30 * 1024;

/// Suffix appended to truncated output.
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

// ---------------------------------------------------------------------------
// Configuration and results
// ---------------------------------------------------------------------------

/// Policy envelope for one worker invocation.
#[derive(Debug, Clone, Default)]
pub struct ReactConfig {
    /// Maximum LLM turns; `0` means [`DEFAULT_MAX_TURNS`].
    pub max_turns: u32,
    /// The worker's system prompt.
    pub system_prompt: String,
    /// Whitelisted engine subcommands.
    pub allowed_commands: Vec<String>,
    /// Whether write commands are barred outright.
    pub read_only: bool,
}

impl ReactConfig {
    /// The effective turn budget.
    pub fn effective_max_turns(&self) -> u32 {
        if self.max_turns == 0 {
            DEFAULT_MAX_TURNS
        } else {
            self.max_turns
        }
    }
}

/// One concrete tool invocation inside a worker, in chronological order.
#[derive(Debug, Clone, Default)]
pub struct ToolCallRecord {
    /// The engine subcommand that ran (or was denied).
    pub name: String,
    /// The raw args attribute as emitted by the LLM.
    pub args: String,
    /// Captured stdout plus `ERR:`-prefixed stderr, truncated.
    pub output: String,
    /// Execution or policy error, if any.
    pub error: Option<String>,
}

/// Outcome record for one worker execution.
#[derive(Debug, Clone, Default)]
pub struct AgentResult {
    /// The agent-call id this execution served.
    pub call_id: String,
    /// The agent type that ran.
    pub agent: String,
    /// The task text.
    pub task: String,
    /// Accumulated assistant text and tool feedback, truncated.
    pub output: String,
    /// Terminal error, if the run failed or was cancelled.
    pub error: Option<String>,
    /// Wall-clock execution time (filled by the dispatcher).
    pub duration: Duration,
    /// Every tool invocation, in call order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Maximum concurrent tool calls observed in any single turn; `0` when
    /// the loop stayed sequential.
    pub parallel_calls: usize,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

enum Verdict {
    Runnable {
        subcommand: String,
        cli_args: Vec<String>,
    },
    ParseError(String),
    Blocked(String),
}

struct ValidatedCall {
    name: String,
    raw_args: String,
    verdict: Verdict,
}

fn validate(config: &ReactConfig, name: &str, raw_args: &str) -> ValidatedCall {
    let verdict = match decode_args(raw_args) {
        Err(e) => Verdict::ParseError(e.to_string()),
        Ok(decoded) => {
            if !config
                .allowed_commands
                .iter()
                .any(|c| c == &decoded.subcommand)
            {
                Verdict::Blocked(
                    AgentError::CommandNotAllowed {
                        command: decoded.subcommand,
                    }
                    .to_string(),
                )
            } else if config.read_only && is_write_command(&decoded.subcommand) {
                Verdict::Blocked(
                    AgentError::ReadOnlyViolation {
                        command: decoded.subcommand,
                    }
                    .to_string(),
                )
            } else {
                Verdict::Runnable {
                    subcommand: decoded.subcommand,
                    cli_args: decoded.cli_args,
                }
            }
        }
    };

    ValidatedCall {
        name: name.to_owned(),
        raw_args: raw_args.to_owned(),
        verdict,
    }
}

// ---------------------------------------------------------------------------
// The loop
// ---------------------------------------------------------------------------

/// Run the ReAct loop for one worker invocation.
///
/// Termination: a tool-call-free assistant message, the turn budget, or
/// cancellation.  The result always carries whatever output and tool records
/// accumulated before the exit.
pub async fn react_loop(
    token: &CancellationToken,
    config: &ReactConfig,
    agent_type: &str,
    task: &str,
    deps: &WorkerDeps,
) -> AgentResult {
    let max_turns = config.effective_max_turns();

    let mut history = vec![
        ChatMessage::system(&config.system_prompt),
        ChatMessage::user(task),
    ];
    let mut result = AgentResult {
        agent: agent_type.to_owned(),
        task: task.to_owned(),
        ..Default::default()
    };
    let mut final_output = String::new();

    tracing::info!(agent = %agent_type, max_turns, "worker loop starting");

    for turn in 0..max_turns {
        if token.is_cancelled() {
            result.error = Some(AgentError::Cancelled.to_string());
            break;
        }

        // -- 1. LLM turn ----------------------------------------------------
        let response = tokio::select! {
            _ = token.cancelled() => {
                result.error = Some(AgentError::Cancelled.to_string());
                break;
            }
            res = deps.llm.send_prompt("", &history, 0) => match res {
                Ok(text) => text,
                Err(e) => {
                    result.error = Some(
                        AgentError::LlmTurnFailed { turn, reason: e.to_string() }.to_string(),
                    );
                    break;
                }
            }
        };
        history.push(ChatMessage::assistant(&response));

        // -- 2. Parse -------------------------------------------------------
        let tags = parse_tool_calls(&response);
        if tags.is_empty() {
            tracing::debug!(turn, "no tool calls, worker done");
            push_block(&mut final_output, &response);
            break;
        }
        tracing::debug!(turn, tool_calls = tags.len(), "tool calls requested");

        // -- 3. Validate ----------------------------------------------------
        let validated: Vec<ValidatedCall> = tags
            .iter()
            .map(|t| validate(config, &t.name, &t.args))
            .collect();

        let runnable_count = validated
            .iter()
            .filter(|v| matches!(v.verdict, Verdict::Runnable { .. }))
            .count();
        let all_read_only = validated.iter().all(|v| match &v.verdict {
            Verdict::Runnable { subcommand, .. } => !is_write_command(subcommand),
            _ => true,
        });

        // -- 4. Execute -----------------------------------------------------
        // Outcomes are indexed by position in `validated` so feedback can be
        // rebuilt in the LLM's emission order regardless of completion order.
        let mut outcomes: Vec<Option<ExecOutcome>> = Vec::new();
        outcomes.resize_with(validated.len(), || None);

        if all_read_only && runnable_count > 1 {
            result.parallel_calls = result.parallel_calls.max(runnable_count);
            tracing::debug!(turn, parallel = runnable_count, "running read-only batch in parallel");

            let mut handles = Vec::with_capacity(runnable_count);
            for (idx, call) in validated.iter().enumerate() {
                if let Verdict::Runnable {
                    subcommand,
                    cli_args,
                } = &call.verdict
                {
                    handles.push((
                        idx,
                        tokio::spawn(execute_tool(
                            token.clone(),
                            Arc::clone(&deps.engine),
                            Arc::clone(&deps.locks),
                            deps.policy.clone(),
                            call.name.clone(),
                            call.raw_args.clone(),
                            subcommand.clone(),
                            cli_args.clone(),
                        )),
                    ));
                }
            }
            for (idx, handle) in handles {
                outcomes[idx] = Some(match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => ExecOutcome::failed(
                        &validated[idx],
                        format!("tool task panicked: {e}"),
                    ),
                });
            }
        } else {
            for (idx, call) in validated.iter().enumerate() {
                let Verdict::Runnable {
                    subcommand,
                    cli_args,
                } = &call.verdict
                else {
                    continue;
                };

                // Mid-batch cancellation check, matching the parallel path.
                if token.is_cancelled() {
                    outcomes[idx] =
                        Some(ExecOutcome::failed(call, AgentError::Cancelled.to_string()));
                    continue;
                }

                outcomes[idx] = Some(
                    execute_tool(
                        token.clone(),
                        Arc::clone(&deps.engine),
                        Arc::clone(&deps.locks),
                        deps.policy.clone(),
                        call.name.clone(),
                        call.raw_args.clone(),
                        subcommand.clone(),
                        cli_args.clone(),
                    )
                    .await,
                );
            }
        }

        // -- 5. Feedback in original call order -----------------------------
        let mut feedback = String::new();
        for (idx, call) in validated.iter().enumerate() {
            let entry = match &call.verdict {
                Verdict::ParseError(msg) => format!("[ERROR] {}: {msg}", call.name),
                Verdict::Blocked(msg) => format!("[BLOCKED] {msg}"),
                Verdict::Runnable { .. } => match outcomes[idx].take() {
                    Some(outcome) => {
                        result.tool_calls.push(outcome.record);
                        outcome.feedback
                    }
                    None => format!("[ERROR] {}: no execution outcome", call.name),
                },
            };
            feedback.push_str(&entry);
            feedback.push('\n');
        }

        let feedback = truncate_with_marker(&feedback, MAX_WORKER_OUTPUT_BYTES);
        history.push(ChatMessage::user(&feedback));
        push_block(&mut final_output, &feedback);
    }

    result.output = truncate_with_marker(&final_output, MAX_WORKER_OUTPUT_BYTES);
    tracing::info!(
        agent = %agent_type,
        tool_calls = result.tool_calls.len(),
        parallel = result.parallel_calls,
        error = result.error.as_deref().unwrap_or("none"),
        "worker loop finished"
    );
    result
}

// ---------------------------------------------------------------------------
// Tool execution
// ---------------------------------------------------------------------------

struct ExecOutcome {
    record: ToolCallRecord,
    feedback: String,
}

impl ExecOutcome {
    fn failed(call: &ValidatedCall, error: String) -> Self {
        Self {
            record: ToolCallRecord {
                name: call.name.clone(),
                args: call.raw_args.clone(),
                output: String::new(),
                error: Some(error.clone()),
            },
            feedback: format!("[ERROR] {}: {error}", call.name),
        }
    }
}

/// Run one validated tool call: policy check, write lock, fresh engine
/// session with line-buffered capture, truncation, record.
#[allow(clippy::too_many_arguments)]
async fn execute_tool(
    token: CancellationToken,
    engine: Arc<dyn EngineFactory>,
    locks: Arc<FileLockManager>,
    policy: Option<Arc<dyn PolicyChecker>>,
    name: String,
    raw_args: String,
    subcommand: String,
    cli_args: Vec<String>,
) -> ExecOutcome {
    // Policy gate.  The checker serializes any interactive prompt itself.
    if let Some(checker) = &policy {
        if let PolicyDecision::Deny(reason) = checker.check_and_prompt(&name, &raw_args).await {
            tracing::warn!(tool = %subcommand, reason = %reason, "tool denied by policy");
            let error = AgentError::PolicyDenied { reason }.to_string();
            return ExecOutcome {
                record: ToolCallRecord {
                    name,
                    args: raw_args,
                    output: String::new(),
                    error: Some(error.clone()),
                },
                feedback: format!("[BLOCKED BY POLICY] {subcommand}: {error}"),
            };
        }
    }

    // Writes to the same path are serialized process-wide.
    let _write_guard = if is_write_command(&subcommand) {
        match extract_file_path(&raw_args) {
            Some(path) => Some(locks.lock(&path).await),
            None => None,
        }
    } else {
        None
    };

    // Fresh session with its own capture buffers.
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
    tracing::debug!(tool = %subcommand, args = ?cli_args, "executing tool");

    let exec_result = tokio::select! {
        _ = token.cancelled() => Err(tandem_engine::EngineError::Cancelled),
        res = session.execute(&subcommand, &cli_args) => res,
    };
    drop(session); // flushes both writers

    let mut output = stdout_buf.lock().unwrap().clone();
    output.push_str(&stderr_buf.lock().unwrap());
    let output = truncate_with_marker(&output, MAX_WORKER_OUTPUT_BYTES);

    let error = exec_result.err().map(|e| e.to_string());
    let feedback = match &error {
        None => format!("[{subcommand}] output:\n{output}"),
        Some(e) => format!("[{subcommand}] [ERROR] {e}\n{output}"),
    };

    ExecOutcome {
        record: ToolCallRecord {
            name,
            args: raw_args,
            output,
            error,
        },
        feedback,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Cut `s` at the largest char boundary within `limit` bytes and append the
/// truncation marker.  Strings within the limit pass through unchanged.
pub fn truncate_with_marker(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_owned();
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + TRUNCATION_MARKER.len());
    out.push_str(&s[..end]);
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Append a block to the accumulated output with a blank-line separator.
fn push_block(acc: &mut String, block: &str) {
    if block.is_empty() {
        return;
    }
    if !acc.is_empty() {
        acc.push('\n');
    }
    acc.push_str(block);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
