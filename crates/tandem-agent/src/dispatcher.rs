//! Fan-out executor for agent calls.
//!
//! Takes a batch of parsed [`AgentCall`]s and runs them against the registry
//! under a bounded-concurrency semaphore.  Every call gets a freshly
//! manufactured LLM client, a child cancellation token with its own deadline,
//! and shared access to the process-wide file lock manager.  Results come
//! back indexed by input position regardless of completion order, and the
//! dispatcher never returns while a worker is still running.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use tandem_engine::EngineFactory;

use crate::dispatch::AgentCall;
use crate::error::AgentError;
use crate::llm::LlmManager;
use crate::lockmgr::FileLockManager;
use crate::react::AgentResult;
use crate::registry::AgentRegistry;
use crate::worker::{PolicyChecker, WorkerDeps};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum concurrent workers (minimum 1).
    pub max_workers: usize,
    /// When false, calls run strictly sequentially.
    pub parallel: bool,
    /// Provider key handed to the LLM manager per call.
    pub provider: String,
    /// Model key handed to the LLM manager per call.
    pub model: String,
    /// Per-worker execution deadline.
    pub worker_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            parallel: true,
            provider: String::new(),
            model: String::new(),
            worker_timeout: Duration::from_secs(300),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Bounded fan-out executor.  Cheaply cloneable (`Arc`-backed).
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    registry: AgentRegistry,
    llm: Arc<dyn LlmManager>,
    engine: Arc<dyn EngineFactory>,
    locks: Arc<FileLockManager>,
    policy: Option<Arc<dyn PolicyChecker>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Create a dispatcher.  The file lock manager it creates is shared by
    /// every worker it ever runs.
    pub fn new(
        registry: AgentRegistry,
        llm: Arc<dyn LlmManager>,
        engine: Arc<dyn EngineFactory>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry,
                llm,
                engine,
                locks: Arc::new(FileLockManager::new()),
                policy: None,
                config,
            }),
        }
    }

    /// Attach a policy checker consulted before every tool execution.
    pub fn with_policy(self, policy: Arc<dyn PolicyChecker>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry: self.inner.registry.clone(),
                llm: Arc::clone(&self.inner.llm),
                engine: Arc::clone(&self.inner.engine),
                locks: Arc::clone(&self.inner.locks),
                policy: Some(policy),
                config: self.inner.config.clone(),
            }),
        }
    }

    /// The shared per-path lock manager.
    pub fn lock_manager(&self) -> Arc<FileLockManager> {
        Arc::clone(&self.inner.locks)
    }

    /// Run a batch of agent calls, returning one result per call in input
    /// order.
    ///
    /// Cancelling `token` cascades into every running worker; calls still
    /// waiting for admission record a cancellation result without executing.
    pub async fn dispatch(
        &self,
        token: &CancellationToken,
        calls: &[AgentCall],
    ) -> Vec<AgentResult> {
        if calls.is_empty() {
            return Vec::new();
        }

        let batch_id = Uuid::now_v7();
        tracing::info!(
            batch_id = %batch_id,
            batch = calls.len(),
            parallel = self.inner.config.parallel,
            max_workers = self.inner.config.max_workers,
            "dispatching agent calls"
        );

        if !self.inner.config.parallel || calls.len() == 1 {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                if token.is_cancelled() {
                    results.push(cancellation_result(call, Duration::ZERO));
                    continue;
                }
                results.push(run_call(&self.inner, token, call).await);
            }
            return results;
        }

        let semaphore = Arc::new(Semaphore::new(self.inner.config.max_workers.max(1)));
        let mut handles = Vec::with_capacity(calls.len());

        for call in calls {
            let inner = Arc::clone(&self.inner);
            let semaphore = Arc::clone(&semaphore);
            let token = token.clone();
            let call = call.clone();

            handles.push(tokio::spawn(async move {
                // FIFO admission; a task that cannot get a slot before the
                // supervisor gives up records a cancellation result.
                let permit = tokio::select! {
                    _ = token.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                match permit {
                    Some(_permit) => run_call(&inner, &token, &call).await,
                    None => cancellation_result(&call, Duration::ZERO),
                }
            }));
        }

        // Barrier: the dispatcher never returns while a worker is running.
        // Results land by input position regardless of completion order.
        let joined = futures::future::join_all(handles).await;
        let mut results = Vec::with_capacity(calls.len());
        for (joined_result, call) in joined.into_iter().zip(calls) {
            match joined_result {
                Ok(result) => results.push(result),
                Err(e) => {
                    let mut result = cancellation_result(call, Duration::ZERO);
                    result.error =
                        Some(AgentError::Internal(format!("worker task panicked: {e}")).to_string());
                    results.push(result);
                }
            }
        }
        results
    }
}

// ---------------------------------------------------------------------------
// Per-call execution
// ---------------------------------------------------------------------------

async fn run_call(
    inner: &DispatcherInner,
    supervisor: &CancellationToken,
    call: &AgentCall,
) -> AgentResult {
    let start = Instant::now();

    let Some(agent) = inner.registry.get(&call.agent) else {
        tracing::warn!(agent = %call.agent, call_id = %call.id, "unknown agent type");
        return finish(
            call,
            AgentResult {
                error: Some(
                    AgentError::UnknownAgent {
                        agent: call.agent.clone(),
                    }
                    .to_string(),
                ),
                ..Default::default()
            },
            start,
        );
    };

    // Fresh client per worker; the factory is thread-safe.
    let client = match inner
        .llm
        .get_client(&inner.config.provider, &inner.config.model)
    {
        Ok(client) => client,
        Err(e) => {
            return finish(
                call,
                AgentResult {
                    error: Some(
                        AgentError::ClientCreationFailed {
                            provider: inner.config.provider.clone(),
                            model: inner.config.model.clone(),
                            reason: e.to_string(),
                        }
                        .to_string(),
                    ),
                    ..Default::default()
                },
                start,
            );
        }
    };

    // Child token with the worker deadline; the watchdog cancels it so the
    // worker unwinds through its normal cancellation path and keeps its
    // partial output.
    let worker_token = supervisor.child_token();
    let deadline_token = worker_token.clone();
    let timeout = inner.config.worker_timeout;
    let watchdog = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        deadline_token.cancel();
    });

    let deps = WorkerDeps {
        llm: client,
        locks: Arc::clone(&inner.locks),
        engine: Arc::clone(&inner.engine),
        policy: inner.policy.clone(),
    };

    let span = tracing::info_span!("worker", agent = %call.agent, call_id = %call.id);
    let result = agent
        .execute(&worker_token, &call.task, &deps)
        .instrument(span)
        .await;

    watchdog.abort();
    finish(call, result, start)
}

/// Normalize a result: identity fields always set, duration measured here.
fn finish(call: &AgentCall, mut result: AgentResult, start: Instant) -> AgentResult {
    result.call_id = call.id.clone();
    result.agent = call.agent.clone();
    result.task = call.task.clone();
    result.duration = start.elapsed();
    result
}

fn cancellation_result(call: &AgentCall, duration: Duration) -> AgentResult {
    AgentResult {
        call_id: call.id.clone(),
        agent: call.agent.clone(),
        task: call.task.clone(),
        error: Some(AgentError::Cancelled.to_string()),
        duration,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Result formatting
// ---------------------------------------------------------------------------

/// Render a batch of results as the feedback string the supervisor LLM reads
/// on its next turn.
pub fn format_results(results: &[AgentResult]) -> String {
    let mut out = String::from("--- Agent Results ---\n\n");

    let blocks: Vec<String> = results
        .iter()
        .map(|r| {
            let status = match &r.error {
                None => "Status: OK".to_owned(),
                Some(e) => format!("Status: FAILED - {e}"),
            };
            format!(
                "[{}] ({}, {:.2?})\nTask: {}\n{}\nOutput:\n{}",
                r.agent, r.call_id, r.duration, r.task, status, r.output
            )
        })
        .collect();

    out.push_str(&blocks.join("\n---\n\n"));
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn result(agent: &str, id: &str, error: Option<&str>) -> AgentResult {
        AgentResult {
            call_id: id.to_owned(),
            agent: agent.to_owned(),
            task: format!("task for {agent}"),
            output: format!("output from {agent}"),
            error: error.map(str::to_owned),
            duration: Duration::from_millis(12),
            ..Default::default()
        }
    }

    #[test]
    fn format_reports_ok_and_failed() {
        let text = format_results(&[
            result("file", "ac-1", None),
            result("coder", "ac-2", Some("boom")),
        ]);

        assert!(text.starts_with("--- Agent Results ---"));
        assert!(text.contains("[file] (ac-1,"));
        assert!(text.contains("Status: OK"));
        assert!(text.contains("Status: FAILED - boom"));
        assert!(text.contains("Task: task for coder"));
        assert!(text.contains("output from file"));
        assert!(text.contains("\n---\n\n"));
    }

    #[test]
    fn format_empty_batch() {
        let text = format_results(&[]);
        assert!(text.starts_with("--- Agent Results ---"));
    }
}
