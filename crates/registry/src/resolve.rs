//! Exact command resolution.
//!
//! The exact resolver is the single-match lookup used for execution. It is
//! a pure read over the registry: namespace visibility follows the fiber
//! state, an explicit protocol override pins the search to one namespace,
//! and preferences break cross-protocol id collisions at global scope.

use indexmap::IndexMap;
use tracing::debug;

use chainterm_types::{ExecutionContext, FiberState};

use crate::models::{CommandDescriptor, CommandRegistry};

/// Id of the hidden core command that protocol-entry tokens resolve to.
pub const ENTER_COMMAND_ID: &str = "enter";

/// Host- or user-level resolution preferences, supplied per request.
#[derive(Debug, Clone, Default)]
pub struct ResolutionPreferences {
    /// Forced protocol pick per command id when the id collides across
    /// protocols at global scope.
    pub defaults: IndexMap<String, String>,
    /// Protocol search order at global scope; unlisted protocols keep
    /// their load order after the listed ones.
    pub priority: Vec<String>,
}

/// One resolution attempt. Transient; borrows everything.
#[derive(Debug)]
pub struct ResolutionRequest<'a> {
    /// The command token (first word of the line, override stripped).
    pub token: &'a str,
    /// Per-call protocol override; pins the search to that namespace.
    pub explicit_protocol: Option<&'a str>,
    /// Resolution preferences for this caller.
    pub preferences: &'a ResolutionPreferences,
    /// Session context; its fiber decides namespace visibility.
    pub context: &'a ExecutionContext,
}

/// Result of exact resolution.
#[derive(Debug, Clone)]
pub struct ResolvedCommand {
    /// The matched descriptor (cloned out of the registry; the handler is
    /// shared behind an `Arc`).
    pub command: CommandDescriptor,
    /// Namespace the match came from; `None` for core commands.
    pub protocol: Option<String>,
    /// Set when the token was a loaded protocol's id at global scope. The
    /// caller substitutes this value as the argument (a sentinel), never
    /// the literal user text.
    pub protocol_name_as_command: Option<String>,
}

impl ResolvedCommand {
    fn core(command: &CommandDescriptor) -> Self {
        Self {
            command: command.clone(),
            protocol: None,
            protocol_name_as_command: None,
        }
    }

    fn in_protocol(command: &CommandDescriptor, protocol: &str) -> Self {
        Self {
            command: command.clone(),
            protocol: Some(protocol.to_string()),
            protocol_name_as_command: None,
        }
    }

    fn protocol_entry(command: &CommandDescriptor, protocol: &str) -> Self {
        Self {
            command: command.clone(),
            protocol: None,
            protocol_name_as_command: Some(protocol.to_string()),
        }
    }
}

impl CommandRegistry {
    /// Deterministic single-match lookup. Returns `None` when nothing in
    /// the visible namespaces matches; never falls back past an explicit
    /// override.
    pub fn resolve(&self, request: &ResolutionRequest<'_>) -> Option<ResolvedCommand> {
        // Explicit override: exactly one namespace, no fallback.
        if let Some(protocol_id) = request.explicit_protocol {
            let plugin = self.protocol(protocol_id)?;
            return plugin
                .find(request.token)
                .map(|command| ResolvedCommand::in_protocol(command, protocol_id));
        }

        match &request.context.fiber {
            FiberState::Fiber(protocol_id) => {
                // Inside a fiber the search order is [fiber, core]; other
                // protocols are invisible.
                match self.protocol(protocol_id) {
                    Some(plugin) => {
                        if let Some(command) = plugin.find(request.token) {
                            return Some(ResolvedCommand::in_protocol(command, protocol_id));
                        }
                    }
                    None => {
                        debug!(protocol = %protocol_id, "fiber names an unloaded protocol; searching core only");
                    }
                }
                self.find_core(request.token).map(ResolvedCommand::core)
            }
            FiberState::Global => self.resolve_global(request),
        }
    }

    /// Global order: core, then protocol-entry names, then protocol tables
    /// ordered by preference priority (unlisted keep load order).
    fn resolve_global(&self, request: &ResolutionRequest<'_>) -> Option<ResolvedCommand> {
        if let Some(command) = self.find_core(request.token) {
            return Some(ResolvedCommand::core(command));
        }

        // A token equal to a loaded protocol's id enters that fiber via
        // the hidden core entry command.
        if self.protocols.contains_key(request.token) {
            if let Some(entry) = self.find_core_by_id(ENTER_COMMAND_ID) {
                return Some(ResolvedCommand::protocol_entry(entry, request.token));
            }
            debug!(protocol = %request.token, "protocol-entry token matched but no entry command is registered");
        }

        // A preferred protocol (request defaults first, then the
        // session-learned preference) is tried before the general order.
        let preferred = request
            .preferences
            .defaults
            .get(request.token)
            .map(String::as_str)
            .or_else(|| request.context.preferred_protocol(request.token));
        if let Some(protocol_id) = preferred {
            if let Some(command) = self.protocol(protocol_id).and_then(|plugin| plugin.find(request.token)) {
                return Some(ResolvedCommand::in_protocol(command, protocol_id));
            }
        }

        for protocol_id in self.global_search_order(request.preferences) {
            let Some(plugin) = self.protocol(protocol_id) else { continue };
            if let Some(command) = plugin.find(request.token) {
                return Some(ResolvedCommand::in_protocol(command, protocol_id));
            }
        }

        None
    }

    /// Protocol ids in global search order: priority-listed first, then the
    /// remaining protocols in load order.
    pub(crate) fn global_search_order<'a>(&'a self, preferences: &'a ResolutionPreferences) -> Vec<&'a str> {
        let mut order: Vec<&str> = Vec::with_capacity(self.protocols.len());
        for protocol_id in &preferences.priority {
            if self.protocols.contains_key(protocol_id) && !order.contains(&protocol_id.as_str()) {
                order.push(protocol_id);
            }
        }
        for protocol_id in self.protocol_ids() {
            if !order.contains(&protocol_id) {
                order.push(protocol_id);
            }
        }
        order
    }
}
