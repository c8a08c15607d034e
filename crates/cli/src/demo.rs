//! Bundled demo protocol plugins.
//!
//! Two small integrations exercising the plugin authoring surface: a swap
//! venue with a chart intent and an async init hook, and a bridge with a
//! declared chain set. Real protocol plugins are built the same way.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use chainterm_registry::{CommandDescriptor, PluginConfig, PluginInit, ProtocolPlugin, handler_fn};
use chainterm_types::{ChainId, ChartInterval, ClientIntent, CommandFailure, CommandOutput, ExecutionContext};

/// Fetches the configured token list before `demoswap` registers. The demo
/// only logs the URL; a real plugin would cache the list for symbol
/// validation in its handlers.
struct TokenListInit;

#[async_trait]
impl PluginInit for TokenListInit {
    async fn init(&self, config: &PluginConfig, _ctx: &ExecutionContext) -> anyhow::Result<()> {
        if let Some(url) = &config.token_list_url {
            info!(%url, "demoswap token list configured");
        }
        Ok(())
    }
}

/// Demo swap venue: `swap`, `price` (alias `p`), and `chart`.
pub fn demoswap() -> ProtocolPlugin {
    ProtocolPlugin::new("demoswap", "Demo Swap")
        .with_init(Arc::new(TokenListInit))
        .command(CommandDescriptor::new(
            "swap",
            "Swap one token for another at the demo rate",
            handler_fn(|args, _ctx| {
                let mut parts = args.split_whitespace();
                let (Some(amount), Some(from), Some(to)) = (parts.next(), parts.next(), parts.next()) else {
                    return Err(CommandFailure::new("usage: swap <amount> <from> <to>"));
                };
                Ok(CommandOutput::text(format!("Swapped {amount} {from} for {to} at the demo rate."))
                    .remembering_protocol())
            }),
        ))
        .command(
            CommandDescriptor::new(
                "price",
                "Quote a token price from the demo feed",
                handler_fn(|args, _ctx| {
                    let token = args.split_whitespace().next().unwrap_or("ETH");
                    Ok(CommandOutput::text(format!("{}: 2431.55 USD (demo feed)", token.to_uppercase())))
                }),
            )
            .with_aliases(["p"]),
        )
        .command(CommandDescriptor::new(
            "balance",
            "Show the connected wallet's balance",
            handler_fn(|_args, ctx| {
                match (&ctx.wallet.address, ctx.wallet.chain_id) {
                    (Some(address), Some(chain)) if ctx.wallet.is_connected => {
                        Ok(CommandOutput::intent(ClientIntent::FetchBalance {
                            address: address.clone(),
                            chain,
                        }))
                    }
                    _ => Ok(CommandOutput::intent(ClientIntent::ConnectWallet)),
                }
            }),
        ))
        .command(CommandDescriptor::new(
            "chart",
            "Draw a candlestick chart for a pair",
            handler_fn(|args, _ctx| {
                let mut parts = args.split_whitespace();
                let Some(pair) = parts.next() else {
                    return Err(CommandFailure::new("usage: chart <pair> [1m|5m|1h|1d]"));
                };
                let interval = match parts.next() {
                    Some(raw) => raw.parse::<ChartInterval>().map_err(CommandFailure::new)?,
                    None => ChartInterval::OneHour,
                };
                Ok(CommandOutput::intent(ClientIntent::RenderChart {
                    pair: pair.to_uppercase(),
                    interval,
                }))
            }),
        ))
}

/// Demo bridge: `bridge` and `routes`, with a declared chain set.
pub fn demobridge() -> ProtocolPlugin {
    ProtocolPlugin::new("demobridge", "Demo Bridge")
        .supported_chains([ChainId(1), ChainId(10), ChainId(42161)])
        .command(CommandDescriptor::new(
            "bridge",
            "Bridge a token amount to another chain",
            handler_fn(|args, ctx| {
                let mut parts = args.split_whitespace();
                let (Some(amount), Some(token), Some(dest)) = (parts.next(), parts.next(), parts.next()) else {
                    return Err(CommandFailure::new("usage: bridge <amount> <token> <dest-chain>"));
                };
                if !ctx.wallet.is_connected {
                    return Err(CommandFailure::new("Connect a wallet before bridging."));
                }
                Ok(CommandOutput::intent(ClientIntent::SignRequest {
                    payload: serde_json::json!({
                        "action": "bridge",
                        "amount": amount,
                        "token": token,
                        "dest_chain": dest,
                    }),
                }))
            }),
        ))
        .command(CommandDescriptor::new(
            "routes",
            "List supported bridge routes",
            handler_fn(|_args, _ctx| {
                Ok(CommandOutput::text(
                    "Routes: mainnet (1) <-> optimism (10), mainnet (1) <-> arbitrum (42161)",
                ))
            }),
        ))
}
