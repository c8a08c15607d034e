//! Pure execution-context update.

use chainterm_registry::ResolvedCommand;
use chainterm_types::{ClientIntent, CommandOutcome, ExecutionContext, OutcomeSummary};

use crate::fiber::apply_transition;

const SUMMARY_LIMIT: usize = 80;

/// Produces the next context after one invocation. Pure: no side effects,
/// no registry access; the inputs fully determine the output.
///
/// Successful outputs may move the fiber and, when they ask for it,
/// record the resolved protocol as the session's preference for the
/// command id. Failed outcomes update the last-command bookkeeping only;
/// the fiber never moves on failure.
pub fn update_execution_context(
    ctx: &ExecutionContext,
    resolved: &ResolvedCommand,
    args: &str,
    outcome: &CommandOutcome,
) -> ExecutionContext {
    let mut next = ctx.clone();

    let invocation = if args.is_empty() {
        resolved.command.id.clone()
    } else {
        format!("{} {}", resolved.command.id, args)
    };
    next.last_command = Some(invocation);

    match outcome {
        Ok(output) => {
            next.last_outcome = Some(OutcomeSummary {
                ok: true,
                detail: summarize_intent(&output.intent),
            });
            if let Some(transition) = &output.transition {
                next.fiber = apply_transition(&next.fiber, transition);
            }
            if output.remember_protocol {
                if let Some(protocol) = &resolved.protocol {
                    next.protocol_preferences
                        .insert(resolved.command.id.clone(), protocol.clone());
                }
            }
        }
        Err(failure) => {
            next.last_outcome = Some(OutcomeSummary {
                ok: false,
                detail: failure.message.clone(),
            });
        }
    }

    next
}

/// Short display form of an intent for the last-outcome record.
fn summarize_intent(intent: &ClientIntent) -> String {
    match intent {
        ClientIntent::RenderText { text } => {
            let first_line = text.lines().next().unwrap_or_default();
            if first_line.chars().count() > SUMMARY_LIMIT {
                let truncated: String = first_line.chars().take(SUMMARY_LIMIT).collect();
                format!("{truncated}…")
            } else {
                first_line.to_string()
            }
        }
        ClientIntent::ClearScreen => "[clear]".to_string(),
        ClientIntent::ShowHistory => "[history]".to_string(),
        ClientIntent::RenderChart { pair, interval } => format!("[chart {pair} {interval}]"),
        ClientIntent::FetchBalance { address, chain } => format!("[balance {address} on chain {chain}]"),
        ClientIntent::ConnectWallet => "[connect wallet]".to_string(),
        ClientIntent::DisconnectWallet => "[disconnect wallet]".to_string(),
        ClientIntent::SignRequest { .. } => "[sign request]".to_string(),
    }
}
