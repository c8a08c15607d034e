//! Ranked, threshold-filtered approximate lookup for autocomplete.
//!
//! The fuzzy resolver sees exactly the namespaces the exact resolver
//! would search, scores every visible id and alias, and returns a ranked
//! list. It is used only for completion, never for execution, and is
//! stateless: identical arguments produce identical ordered results.

use chainterm_types::FiberState;
use chainterm_util::similarity;

use crate::models::CommandRegistry;
use crate::resolve::{ENTER_COMMAND_ID, ResolutionRequest, ResolvedCommand};

/// Default similarity cutoff for completion suggestions.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.3;

/// One ranked completion candidate.
#[derive(Debug, Clone)]
pub struct ScoredCommand {
    /// The candidate, shaped exactly like an exact-resolution result so
    /// the caller can show its namespace.
    pub resolved: ResolvedCommand,
    /// Normalized similarity in `[0, 1]`, at or above the threshold.
    pub score: f64,
}

/// Candidate accumulator preserving registration order for tie-breaks.
struct Ranking {
    entries: Vec<(usize, ScoredCommand)>,
    next_index: usize,
    threshold: f64,
}

impl Ranking {
    fn new(threshold: f64) -> Self {
        Self {
            entries: Vec::new(),
            next_index: 0,
            threshold,
        }
    }

    /// Scores the candidate's id and aliases against the token, keeping
    /// the best, and records it when it clears the threshold.
    fn consider(&mut self, token: &str, names: &[&str], resolved: ResolvedCommand) {
        let index = self.next_index;
        self.next_index += 1;

        let score = names
            .iter()
            .map(|name| similarity(name, token))
            .fold(0.0_f64, f64::max);
        if score >= self.threshold {
            self.entries.push((index, ScoredCommand { resolved, score }));
        }
    }

    /// Sort descending by score, ties by shorter id then registration
    /// order; deduplicate by (namespace, command id) keeping the winner.
    /// Entry candidates all share the hidden entry command's id, so the
    /// key also carries the entry target to keep one suggestion per
    /// protocol.
    fn finish(mut self) -> Vec<ScoredCommand> {
        self.entries.sort_by(|(index_a, a), (index_b, b)| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.resolved.command.id.len().cmp(&b.resolved.command.id.len()))
                .then_with(|| index_a.cmp(index_b))
        });

        let mut seen: Vec<(Option<String>, Option<String>, String)> = Vec::new();
        self.entries
            .into_iter()
            .map(|(_, scored)| scored)
            .filter(|scored| {
                let key = (
                    scored.resolved.protocol.clone(),
                    scored.resolved.protocol_name_as_command.clone(),
                    scored.resolved.command.id.clone(),
                );
                if seen.contains(&key) {
                    false
                } else {
                    seen.push(key);
                    true
                }
            })
            .collect()
    }
}

impl CommandRegistry {
    /// Ranked approximate lookup under the same visibility rules as
    /// [`CommandRegistry::resolve`]. `threshold` is a normalized cutoff in
    /// `[0, 1]`; candidates scoring below it are dropped.
    pub fn resolve_fuzzy(&self, request: &ResolutionRequest<'_>, threshold: f64) -> Vec<ScoredCommand> {
        let mut ranking = Ranking::new(threshold);
        let token = request.token;

        if let Some(protocol_id) = request.explicit_protocol {
            self.consider_plugin(&mut ranking, token, protocol_id);
            return ranking.finish();
        }

        match &request.context.fiber {
            FiberState::Fiber(protocol_id) => {
                self.consider_plugin(&mut ranking, token, protocol_id);
                self.consider_core(&mut ranking, token);
            }
            FiberState::Global => {
                self.consider_core(&mut ranking, token);
                self.consider_entries(&mut ranking, token);
                for protocol_id in self.global_search_order(request.preferences) {
                    self.consider_plugin(&mut ranking, token, protocol_id);
                }
            }
        }

        ranking.finish()
    }

    fn consider_core(&self, ranking: &mut Ranking, token: &str) {
        for command in &self.core {
            if command.hidden {
                continue;
            }
            let mut names: Vec<&str> = vec![command.id.as_str()];
            names.extend(command.aliases.iter().map(String::as_str));
            ranking.consider(
                token,
                &names,
                ResolvedCommand {
                    command: command.clone(),
                    protocol: None,
                    protocol_name_as_command: None,
                },
            );
        }
    }

    /// Protocol ids themselves complete to the entry command at global
    /// scope, so typing a prefix of a protocol name suggests entering it.
    fn consider_entries(&self, ranking: &mut Ranking, token: &str) {
        let Some(entry) = self.find_core_by_id(ENTER_COMMAND_ID).cloned() else {
            return;
        };
        for protocol_id in self.protocol_ids() {
            ranking.consider(
                token,
                &[protocol_id],
                ResolvedCommand {
                    command: entry.clone(),
                    protocol: None,
                    protocol_name_as_command: Some(protocol_id.to_string()),
                },
            );
        }
    }

    fn consider_plugin(&self, ranking: &mut Ranking, token: &str, protocol_id: &str) {
        let Some(plugin) = self.protocol(protocol_id) else {
            return;
        };
        for command in &plugin.commands {
            let mut names: Vec<&str> = vec![command.id.as_str()];
            names.extend(command.aliases.iter().map(String::as_str));
            ranking.consider(
                token,
                &names,
                ResolvedCommand {
                    command: command.clone(),
                    protocol: Some(protocol_id.to_string()),
                    protocol_name_as_command: None,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommandDescriptor, CommandRegistry, ProtocolPlugin, handler_fn};
    use crate::resolve::ResolutionPreferences;
    use chainterm_types::{CommandOutput, ExecutionContext, FiberState};
    use std::sync::Arc;

    fn noop_command(id: &str) -> CommandDescriptor {
        CommandDescriptor::new(id, format!("{id} command"), handler_fn(|_, _| Ok(CommandOutput::text("ok"))))
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register_core(noop_command("help").with_aliases(["h"]));
        registry.register_core(noop_command("history"));
        registry.register_core(noop_command(ENTER_COMMAND_ID).hidden());

        let swap = ProtocolPlugin::new("demoswap", "Demo Swap")
            .command(noop_command("swap"))
            .command(noop_command("price").with_aliases(["p"]));
        let bridge = ProtocolPlugin::new("demobridge", "Demo Bridge").command(noop_command("bridge"));
        registry.protocols.insert("demoswap".into(), Arc::new(swap));
        registry.protocols.insert("demobridge".into(), Arc::new(bridge));
        registry
    }

    fn request<'a>(token: &'a str, preferences: &'a ResolutionPreferences, context: &'a ExecutionContext) -> ResolutionRequest<'a> {
        ResolutionRequest {
            token,
            explicit_protocol: None,
            preferences,
            context,
        }
    }

    #[test]
    fn identical_calls_return_identical_ordered_results() {
        let registry = registry();
        let prefs = ResolutionPreferences::default();
        let ctx = ExecutionContext::new();

        let first: Vec<(String, String)> = registry
            .resolve_fuzzy(&request("h", &prefs, &ctx), DEFAULT_FUZZY_THRESHOLD)
            .into_iter()
            .map(|s| (s.resolved.command.id.clone(), format!("{:.4}", s.score)))
            .collect();
        let second: Vec<(String, String)> = registry
            .resolve_fuzzy(&request("h", &prefs, &ctx), DEFAULT_FUZZY_THRESHOLD)
            .into_iter()
            .map(|s| (s.resolved.command.id.clone(), format!("{:.4}", s.score)))
            .collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn threshold_filters_low_scores() {
        let registry = registry();
        let prefs = ResolutionPreferences::default();
        let ctx = ExecutionContext::new();

        let loose = registry.resolve_fuzzy(&request("p", &prefs, &ctx), 0.0);
        let strict = registry.resolve_fuzzy(&request("p", &prefs, &ctx), 0.99);
        assert!(strict.len() < loose.len());
        for scored in &strict {
            assert!(scored.score >= 0.99);
        }
    }

    #[test]
    fn results_are_sorted_descending() {
        let registry = registry();
        let prefs = ResolutionPreferences::default();
        let ctx = ExecutionContext::new();

        let results = registry.resolve_fuzzy(&request("br", &prefs, &ctx), 0.0);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn fiber_visibility_matches_exact_resolution() {
        let registry = registry();
        let prefs = ResolutionPreferences::default();
        let mut ctx = ExecutionContext::new();
        ctx.fiber = FiberState::Fiber("demoswap".into());

        let results = registry.resolve_fuzzy(&request("b", &prefs, &ctx), 0.0);
        // demobridge's commands are invisible inside the demoswap fiber.
        assert!(
            results
                .iter()
                .all(|s| s.resolved.protocol.as_deref() != Some("demobridge"))
        );
    }

    #[test]
    fn protocol_names_complete_to_entry_at_global() {
        let registry = registry();
        let prefs = ResolutionPreferences::default();
        let ctx = ExecutionContext::new();

        let results = registry.resolve_fuzzy(&request("demos", &prefs, &ctx), DEFAULT_FUZZY_THRESHOLD);
        assert!(
            results
                .iter()
                .any(|s| s.resolved.protocol_name_as_command.as_deref() == Some("demoswap"))
        );
    }

    #[test]
    fn each_matching_protocol_keeps_its_own_entry_suggestion() {
        let registry = registry();
        let prefs = ResolutionPreferences::default();
        let ctx = ExecutionContext::new();

        // Both protocol ids start with "demo"; both entries must survive
        // deduplication even though they share the entry command's id.
        let results = registry.resolve_fuzzy(&request("demo", &prefs, &ctx), DEFAULT_FUZZY_THRESHOLD);
        let targets: Vec<&str> = results
            .iter()
            .filter_map(|s| s.resolved.protocol_name_as_command.as_deref())
            .collect();
        assert!(targets.contains(&"demoswap"));
        assert!(targets.contains(&"demobridge"));
    }

    #[test]
    fn alias_reaches_the_same_command_once() {
        let registry = registry();
        let prefs = ResolutionPreferences::default();
        let ctx = ExecutionContext::new();

        // "p" matches both the id "price" and its alias "p"; the command
        // must appear once with the max of the two scores.
        let results = registry.resolve_fuzzy(&request("p", &prefs, &ctx), 0.0);
        let price_hits = results
            .iter()
            .filter(|s| s.resolved.command.id == "price")
            .count();
        assert_eq!(price_hits, 1);
    }
}
