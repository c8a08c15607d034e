//! Sequential per-session command execution.
//!
//! One logical session (one tab) owns one [`ShellSession`]: its execution
//! context, its history, and an execution lock that rejects new input
//! while a prior run is unresolved. The lock is released in `Drop`, so a
//! panicking handler cannot leave the session stuck. The registry handle
//! is shared read-only with every other session.

use std::panic::AssertUnwindSafe;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use chainterm_registry::{RegistryHandle, ResolutionPreferences, ResolutionRequest, ScoredCommand};
use chainterm_types::{ClientIntent, CommandFailure, ExecutionContext, WalletState};
use chainterm_util::parse_line;

use crate::context::update_execution_context;

/// Maximum history entries retained per session.
pub const HISTORY_LIMIT: usize = 500;

/// Why an input line was rejected before resolution ran.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Plugin loading for this session has not settled yet.
    #[error("plugins are still loading; try again shortly")]
    PluginsLoading,
    /// A previous command is still in flight; input is rejected, not
    /// queued.
    #[error("a command is already running in this session")]
    Busy,
}

/// One line of session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The raw input line as typed.
    pub line: String,
    /// When the line was submitted.
    pub at: DateTime<Utc>,
    /// Whether the invocation reported success.
    pub ok: bool,
}

/// What the UI renders after one submission.
#[derive(Debug, Clone)]
pub struct SessionReply {
    /// Whether the command (if any resolved) reported success.
    pub ok: bool,
    /// Intent for the UI layer; failures arrive as rendered text.
    pub intent: ClientIntent,
    /// Snapshot of the context after the invocation, for prompt display.
    pub context: ExecutionContext,
}

/// Compare-and-swap execution lock. Releasing lives in `Drop` so every
/// exit path, including a panicking handler, frees the session.
struct ExecutionGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ExecutionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
            .then_some(Self { flag })
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One interactive session over the shared registry.
pub struct ShellSession {
    registry: RegistryHandle,
    preferences: ResolutionPreferences,
    context: Mutex<ExecutionContext>,
    history: Mutex<Vec<HistoryEntry>>,
    busy: AtomicBool,
    plugins_ready: AtomicBool,
}

impl ShellSession {
    /// New session at the global scope. Input is rejected with
    /// [`SessionError::PluginsLoading`] until [`mark_plugins_ready`]
    /// is called once loading settles.
    ///
    /// [`mark_plugins_ready`]: ShellSession::mark_plugins_ready
    pub fn new(registry: RegistryHandle, preferences: ResolutionPreferences) -> Self {
        Self {
            registry,
            preferences,
            context: Mutex::new(ExecutionContext::new()),
            history: Mutex::new(Vec::new()),
            busy: AtomicBool::new(false),
            plugins_ready: AtomicBool::new(false),
        }
    }

    /// Opens the session for input once plugin loading has settled.
    pub fn mark_plugins_ready(&self) {
        self.plugins_ready.store(true, Ordering::Release);
    }

    /// Current context snapshot.
    pub fn context(&self) -> ExecutionContext {
        self.context.lock().expect("context lock poisoned").clone()
    }

    /// Replaces the wallet snapshot, e.g. after a connect/disconnect
    /// reported by the UI between commands. Fiber and preferences are
    /// untouched.
    pub fn set_wallet(&self, wallet: WalletState) {
        let mut guard = self.context.lock().expect("context lock poisoned");
        *guard = guard.wallet_updated(wallet);
    }

    /// Session history, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().expect("history lock poisoned").clone()
    }

    /// Resolves and runs one input line.
    ///
    /// At most one command is in flight per session: a second submission
    /// while one is unresolved is rejected with [`SessionError::Busy`].
    /// A resolution miss and a failed command are ordinary replies, not
    /// errors; a panicking handler is caught here and rendered as
    /// "Error executing command: …" with the session left usable.
    pub async fn submit(&self, line: &str) -> Result<SessionReply, SessionError> {
        if !self.plugins_ready.load(Ordering::Acquire) {
            return Err(SessionError::PluginsLoading);
        }
        let _guard = ExecutionGuard::acquire(&self.busy).ok_or(SessionError::Busy)?;

        let ctx = self.context();
        let Some(parsed) = parse_line(line) else {
            return Ok(SessionReply {
                ok: true,
                intent: ClientIntent::text(String::new()),
                context: ctx,
            });
        };

        // Resolve under the read lock, then drop it before running so a
        // handler may take its own registry lock.
        let resolved = {
            let registry = self.registry.read().await;
            registry.resolve(&ResolutionRequest {
                token: &parsed.token,
                explicit_protocol: parsed.explicit_protocol.as_deref(),
                preferences: &self.preferences,
                context: &ctx,
            })
        };

        let Some(resolved) = resolved else {
            debug!(token = %parsed.token, "command not found");
            self.push_history(line, false);
            return Ok(SessionReply {
                ok: false,
                intent: ClientIntent::text(format!("Command not found: {}", parsed.token)),
                context: ctx,
            });
        };

        // Protocol-entry matches run with the protocol id as a sentinel
        // argument, never the literal user text.
        let args = resolved
            .protocol_name_as_command
            .clone()
            .unwrap_or(parsed.args);

        let outcome = match AssertUnwindSafe(resolved.command.handler.run(&args, &ctx))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => {
                error!(command = %resolved.command.id, "command handler panicked");
                Err(CommandFailure::new(format!(
                    "Error executing command: {}",
                    panic_message(payload.as_ref())
                )))
            }
        };

        let next = update_execution_context(&ctx, &resolved, &args, &outcome);
        *self.context.lock().expect("context lock poisoned") = next.clone();
        self.push_history(line, outcome.is_ok());

        let (ok, intent) = match outcome {
            Ok(output) => (true, output.intent),
            Err(failure) => (false, ClientIntent::text(failure.message)),
        };
        Ok(SessionReply {
            ok,
            intent,
            context: next,
        })
    }

    /// Ranked completion candidates for a partial input line, under the
    /// session's current namespace visibility. Completion is gated the
    /// same way as submission: until plugin loading settles the registry
    /// is half-populated, so the list is empty.
    pub async fn suggestions(&self, partial: &str, threshold: f64) -> Vec<ScoredCommand> {
        if !self.plugins_ready.load(Ordering::Acquire) {
            return Vec::new();
        }
        let Some(parsed) = parse_line(partial) else {
            return Vec::new();
        };
        let ctx = self.context();
        let registry = self.registry.read().await;
        registry.resolve_fuzzy(
            &ResolutionRequest {
                token: &parsed.token,
                explicit_protocol: parsed.explicit_protocol.as_deref(),
                preferences: &self.preferences,
                context: &ctx,
            },
            threshold,
        )
    }

    fn push_history(&self, line: &str, ok: bool) {
        let mut history = self.history.lock().expect("history lock poisoned");
        if history.len() >= HISTORY_LIMIT {
            history.remove(0);
        }
        history.push(HistoryEntry {
            line: line.to_string(),
            at: Utc::now(),
            ok,
        });
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unexpected panic"
    }
}
