//! The namespace-independent core command set.
//!
//! Core commands are registered once per registry and are always appended
//! to the search order, whatever the fiber state. `help` and the hidden
//! `enter` command introspect the registry, so their handlers hold the
//! shared handle; everything else works off the context alone.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;

use chainterm_types::{
    ClientIntent, CommandFailure, CommandOutcome, CommandOutput, ExecutionContext, FiberState, FiberTransition,
};

use crate::models::{CommandDescriptor, CommandHandler, RegistryHandle, handler_fn};
use crate::resolve::ENTER_COMMAND_ID;

/// Core command ids surfaced in fiber-scoped help, in display order.
const FIBER_CORE_SUBSET: &[&str] = &["help", "clear", "history", "exit"];

/// Registers the fixed core set: help, clear, whoami, exit, history, and
/// the hidden protocol-entry target. Safe to call more than once; the
/// registry ignores duplicate core ids.
pub async fn register_core_commands(registry: &RegistryHandle) {
    let mut guard = registry.write().await;

    guard.register_core(
        CommandDescriptor::new(
            "help",
            "List available commands",
            Arc::new(HelpCommand {
                registry: Arc::clone(registry),
            }),
        )
        .with_aliases(["h", "?"]),
    );
    guard.register_core(
        CommandDescriptor::new(
            "clear",
            "Clear the terminal",
            handler_fn(|_, _| Ok(CommandOutput::intent(ClientIntent::ClearScreen))),
        )
        .with_aliases(["cls"]),
    );
    guard.register_core(CommandDescriptor::new(
        "whoami",
        "Show the connected wallet",
        handler_fn(|_, ctx| Ok(CommandOutput::text(whoami_text(ctx)))),
    ));
    guard.register_core(
        CommandDescriptor::new(
            "exit",
            "Leave the active protocol",
            handler_fn(|_, ctx| {
                let text = match &ctx.fiber {
                    FiberState::Global => "Already at the global scope.".to_string(),
                    FiberState::Fiber(id) => format!("Left {id}."),
                };
                Ok(CommandOutput::text(text).with_transition(FiberTransition::Exit))
            }),
        )
        .with_aliases(["back", "quit"]),
    );
    guard.register_core(CommandDescriptor::new(
        "history",
        "Show this session's command history",
        handler_fn(|_, _| Ok(CommandOutput::intent(ClientIntent::ShowHistory))),
    ));
    guard.register_core(
        CommandDescriptor::new(
            ENTER_COMMAND_ID,
            "Enter a protocol's namespace",
            Arc::new(EnterCommand {
                registry: Arc::clone(registry),
            }),
        )
        .hidden(),
    );
}

fn whoami_text(ctx: &ExecutionContext) -> String {
    if ctx.wallet.is_connected {
        let chain = ctx
            .wallet
            .chain_id
            .map(|id| format!(" (chain {id})"))
            .unwrap_or_default();
        format!("{}{chain}", ctx.wallet.short_address())
    } else if ctx.wallet.is_connecting {
        "Wallet connection in progress…".to_string()
    } else {
        "No wallet connected.".to_string()
    }
}

/// `help`: global help lists core commands and every protocol's table;
/// fiber-scoped help lists the active protocol plus a curated core subset.
struct HelpCommand {
    registry: RegistryHandle,
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn run(&self, _args: &str, ctx: &ExecutionContext) -> CommandOutcome {
        let registry = self.registry.read().await;
        let mut out = String::new();

        match &ctx.fiber {
            FiberState::Global => {
                out.push_str("Core commands:\n");
                for command in registry.core.iter().filter(|c| !c.hidden) {
                    push_command_line(&mut out, command);
                }
                for plugin in registry.protocols.values() {
                    let _ = writeln!(out, "\n{} ('{}'):", plugin.name, plugin.id);
                    for command in &plugin.commands {
                        push_command_line(&mut out, command);
                    }
                }
            }
            FiberState::Fiber(protocol_id) => match registry.protocol(protocol_id) {
                Some(plugin) => {
                    let _ = writeln!(out, "{} commands:", plugin.name);
                    for command in &plugin.commands {
                        push_command_line(&mut out, command);
                    }
                    out.push_str("\nAlso available:\n");
                    for id in FIBER_CORE_SUBSET {
                        if let Some(command) = registry.find_core_by_id(id) {
                            push_command_line(&mut out, command);
                        }
                    }
                }
                None => {
                    return Err(CommandFailure::new(format!("Protocol '{protocol_id}' is no longer loaded")));
                }
            },
        }

        Ok(CommandOutput::text(out.trim_end().to_string()))
    }
}

fn push_command_line(out: &mut String, command: &CommandDescriptor) {
    let aliases = if command.aliases.is_empty() {
        String::new()
    } else {
        format!(" ({})", command.aliases.join(", "))
    };
    let _ = writeln!(out, "  {:<12}{}  {}", command.id, aliases, command.summary);
}

/// Hidden target of protocol-entry resolution. Its argument is the
/// protocol id substituted by the caller, never literal user text.
struct EnterCommand {
    registry: RegistryHandle,
}

#[async_trait]
impl CommandHandler for EnterCommand {
    async fn run(&self, args: &str, _ctx: &ExecutionContext) -> CommandOutcome {
        let protocol_id = args.trim();
        let registry = self.registry.read().await;
        match registry.protocol(protocol_id) {
            Some(plugin) => {
                let text = format!(
                    "Entered {}: {} commands available; 'help' lists them, 'exit' leaves.",
                    plugin.name,
                    plugin.commands.len()
                );
                Ok(CommandOutput::text(text).with_transition(FiberTransition::Enter(plugin.id.clone())))
            }
            None => Err(CommandFailure::new(format!("Unknown protocol: '{protocol_id}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommandRegistry, ProtocolPlugin};
    use crate::resolve::{ResolutionPreferences, ResolutionRequest};
    use chainterm_types::{ChainId, WalletState};

    fn sample_plugin() -> ProtocolPlugin {
        ProtocolPlugin::new("demoswap", "Demo Swap")
            .command(CommandDescriptor::new(
                "swap",
                "Swap tokens",
                handler_fn(|_, _| Ok(CommandOutput::text("ok"))),
            ))
            .command(
                CommandDescriptor::new("price", "Token price", handler_fn(|_, _| Ok(CommandOutput::text("ok"))))
                    .with_aliases(["p"]),
            )
    }

    async fn registry_with_plugin() -> RegistryHandle {
        let handle = CommandRegistry::shared();
        register_core_commands(&handle).await;
        handle
            .write()
            .await
            .protocols
            .insert("demoswap".into(), Arc::new(sample_plugin()));
        handle
    }

    #[tokio::test]
    async fn all_core_commands_resolve_at_global() {
        let handle = registry_with_plugin().await;
        let registry = handle.read().await;
        let prefs = ResolutionPreferences::default();
        let ctx = ExecutionContext::new();

        for id in ["help", "clear", "whoami", "exit", "history"] {
            let resolved = registry
                .resolve(&ResolutionRequest {
                    token: id,
                    explicit_protocol: None,
                    preferences: &prefs,
                    context: &ctx,
                })
                .unwrap_or_else(|| panic!("core command '{id}' must resolve"));
            assert_eq!(resolved.command.id, id);
            assert_eq!(resolved.protocol, None);
        }
    }

    #[tokio::test]
    async fn global_help_lists_core_and_protocols() {
        let handle = registry_with_plugin().await;
        let help = HelpCommand {
            registry: Arc::clone(&handle),
        };
        let output = help.run("", &ExecutionContext::new()).await.expect("help succeeds");

        let ClientIntent::RenderText { text } = output.intent else {
            panic!("help renders text");
        };
        assert!(text.contains("Core commands:"));
        assert!(text.contains("Demo Swap"));
        assert!(text.contains("price"));
        assert!(text.contains("(p)"));
        // The hidden entry command stays out of the listing.
        assert!(!text.contains("Enter a protocol's namespace"));
    }

    #[tokio::test]
    async fn fiber_help_is_scoped_to_the_active_protocol() {
        let handle = registry_with_plugin().await;
        let help = HelpCommand {
            registry: Arc::clone(&handle),
        };
        let mut ctx = ExecutionContext::new();
        ctx.fiber = FiberState::Fiber("demoswap".into());

        let output = help.run("", &ctx).await.expect("help succeeds");
        let ClientIntent::RenderText { text } = output.intent else {
            panic!("help renders text");
        };
        assert!(text.starts_with("Demo Swap commands:"));
        assert!(text.contains("Also available:"));
        assert!(text.contains("exit"));
        assert!(!text.contains("whoami"));
    }

    #[tokio::test]
    async fn enter_validates_the_sentinel_argument() {
        let handle = registry_with_plugin().await;
        let enter = EnterCommand {
            registry: Arc::clone(&handle),
        };
        let ctx = ExecutionContext::new();

        let output = enter.run("demoswap", &ctx).await.expect("known protocol enters");
        assert_eq!(output.transition, Some(FiberTransition::Enter("demoswap".into())));

        let failure = enter.run("vanished", &ctx).await.unwrap_err();
        assert!(failure.message.contains("Unknown protocol"));
    }

    #[tokio::test]
    async fn exit_always_carries_the_exit_transition() {
        let handle = registry_with_plugin().await;
        let registry = handle.read().await;
        let exit = registry.find_core_by_id("exit").expect("exit registered").clone();
        drop(registry);

        let mut ctx = ExecutionContext::new();
        ctx.fiber = FiberState::Fiber("demoswap".into());
        let output = exit.handler.run("", &ctx).await.expect("exit succeeds");
        assert_eq!(output.transition, Some(FiberTransition::Exit));
    }

    #[tokio::test]
    async fn whoami_reports_wallet_state() {
        let connected = ExecutionContext::with_wallet(WalletState::connected(
            "0x1234567890abcdef1234567890abcdef12345678",
            ChainId(1),
        ));
        assert!(whoami_text(&connected).contains("0x1234…5678"));
        assert!(whoami_text(&connected).contains("chain 1"));
        assert_eq!(whoami_text(&ExecutionContext::new()), "No wallet connected.");
    }
}
