//! Per-session execution context and the fiber state it carries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::wallet::WalletState;

/// Which namespace exact resolution runs against.
///
/// `Fiber(p)` is the shell equivalent of a working directory: while inside
/// protocol `p`, only `p`'s commands and the core set are visible. A
/// `Fiber` naming a protocol that is no longer loaded is tolerated by the
/// resolver (the namespace is skipped), so the variant never has to be
/// proven valid at construction time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "protocol", rename_all = "snake_case")]
pub enum FiberState {
    /// Root scope: core commands and protocol-entry names are visible.
    #[default]
    Global,
    /// Inside one protocol's namespace.
    Fiber(String),
}

impl FiberState {
    pub fn is_global(&self) -> bool {
        matches!(self, FiberState::Global)
    }

    /// Active protocol id, when inside a fiber.
    pub fn protocol_id(&self) -> Option<&str> {
        match self {
            FiberState::Global => None,
            FiberState::Fiber(id) => Some(id),
        }
    }
}

impl std::fmt::Display for FiberState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FiberState::Global => write!(f, "global"),
            FiberState::Fiber(id) => write!(f, "{id}"),
        }
    }
}

/// Condensed record of the previous command's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// Whether the command reported success.
    pub ok: bool,
    /// Short human-readable detail (rendered text or failure message).
    pub detail: String,
}

/// Session state threaded through every resolution and invocation.
///
/// Value semantics: the engine produces a fresh instance after each
/// command; nothing mutates a context in place once it has been handed to
/// a handler. One context exists per session (tab) and dies with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Wallet snapshot supplied by the UI layer.
    pub wallet: WalletState,
    /// Active namespace; new sessions always begin `Global`.
    pub fiber: FiberState,
    /// Session-scoped preferred protocol per command id, used to break
    /// cross-protocol id collisions during global resolution.
    pub protocol_preferences: IndexMap<String, String>,
    /// Id of the last resolved command, if any.
    pub last_command: Option<String>,
    /// Outcome of the last invocation, if any.
    pub last_outcome: Option<OutcomeSummary>,
}

impl ExecutionContext {
    /// Fresh context for a new session: global namespace, no wallet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh context carrying an initial wallet snapshot.
    pub fn with_wallet(wallet: WalletState) -> Self {
        Self {
            wallet,
            ..Self::default()
        }
    }

    /// Copy of this context with an updated wallet snapshot, leaving the
    /// fiber and preferences untouched. Used when the UI reports a
    /// connect/disconnect between commands.
    pub fn wallet_updated(&self, wallet: WalletState) -> Self {
        Self {
            wallet,
            ..self.clone()
        }
    }

    /// Preferred protocol for a command id, if the user has picked one
    /// this session.
    pub fn preferred_protocol(&self, command_id: &str) -> Option<&str> {
        self.protocol_preferences.get(command_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::ChainId;

    #[test]
    fn new_sessions_begin_global() {
        let ctx = ExecutionContext::new();
        assert!(ctx.fiber.is_global());
        assert!(ctx.last_command.is_none());
        assert!(ctx.protocol_preferences.is_empty());
    }

    #[test]
    fn fiber_state_exposes_protocol_id() {
        let fiber = FiberState::Fiber("demoswap".into());
        assert_eq!(fiber.protocol_id(), Some("demoswap"));
        assert_eq!(FiberState::Global.protocol_id(), None);
    }

    #[test]
    fn wallet_updated_preserves_fiber_and_preferences() {
        let mut ctx = ExecutionContext::new();
        ctx.fiber = FiberState::Fiber("demoswap".into());
        ctx.protocol_preferences.insert("swap".into(), "demoswap".into());

        let next = ctx.wallet_updated(WalletState::connected("0xabc", ChainId(1)));
        assert_eq!(next.fiber, ctx.fiber);
        assert_eq!(next.preferred_protocol("swap"), Some("demoswap"));
        assert!(next.wallet.is_connected);
        // The original value is untouched.
        assert!(!ctx.wallet.is_connected);
    }
}
