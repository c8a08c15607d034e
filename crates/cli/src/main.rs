use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use chainterm_engine::{SessionError, ShellSession};
use chainterm_registry::{
    CommandRegistry, DEFAULT_FUZZY_THRESHOLD, PluginConfig, PluginLoader, ResolutionPreferences,
    register_core_commands,
};
use chainterm_types::{ChainId, ClientIntent, ExecutionContext, WalletState};

mod demo;

/// Stand-in account used when a command opens the connect flow.
const DEMO_WALLET: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

#[derive(Parser)]
#[command(name = "chainterm", version, about = "Interactive shell for DeFi protocol plugins")]
struct Args {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Minimum similarity for completion suggestions, between 0 and 1.
    #[arg(long, default_value_t = DEFAULT_FUZZY_THRESHOLD)]
    threshold: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let registry = CommandRegistry::shared();
    register_core_commands(&registry).await;

    let loader = PluginLoader::new(Arc::clone(&registry));
    let boot_ctx = ExecutionContext::new();
    let swap_config = PluginConfig {
        token_list_url: Some("https://tokens.example.com/demo.json".into()),
        ..PluginConfig::default()
    };
    loader.load_plugin(demo::demoswap(), &swap_config, &boot_ctx).await?;
    loader
        .load_plugin(demo::demobridge(), &PluginConfig::default(), &boot_ctx)
        .await?;

    let session = ShellSession::new(registry, ResolutionPreferences::default());
    session.mark_plugins_ready();
    info!("plugins loaded; session open");

    run_repl(&session, args.threshold).await
}

fn init_tracing(fallback: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| fallback.to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Line loop over stdin. A trailing `?` asks for completion suggestions
/// instead of executing; everything else is submitted to the session.
/// Ends on EOF.
async fn run_repl(session: &ShellSession, threshold: f64) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(prompt(session).as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            stdout.write_all(b"\n").await?;
            return Ok(());
        };

        let rendered = if let Some(partial) = completion_query(&line) {
            render_suggestions(session, partial, threshold).await
        } else {
            match session.submit(&line).await {
                Ok(reply) => render_intent(session, reply.intent),
                Err(SessionError::PluginsLoading) => "Plugins are still loading.".to_string(),
                Err(SessionError::Busy) => "A command is already running.".to_string(),
            }
        };
        if !rendered.is_empty() {
            stdout.write_all(rendered.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
    }
}

/// A line ending in `?` asks for completion on the text before it. A
/// bare `?` is not a query; it stays a command line, where it aliases
/// `help`.
fn completion_query(line: &str) -> Option<&str> {
    line.trim_end()
        .strip_suffix('?')
        .filter(|partial| !partial.trim().is_empty())
}

fn prompt(session: &ShellSession) -> String {
    match session.context().fiber.protocol_id() {
        Some(protocol) => format!("chainterm:{protocol}> "),
        None => "chainterm> ".to_string(),
    }
}

async fn render_suggestions(session: &ShellSession, partial: &str, threshold: f64) -> String {
    let scored = session.suggestions(partial, threshold).await;
    if scored.is_empty() {
        return format!("No suggestions for '{}'.", partial.trim());
    }
    let mut out = String::from("Suggestions:");
    for suggestion in scored {
        let scope = suggestion.resolved.protocol.as_deref().unwrap_or("core");
        // Entry candidates surface as the protocol name, not the hidden
        // command id behind them.
        let (name, summary) = match suggestion.resolved.protocol_name_as_command.as_deref() {
            Some(protocol) => (protocol, "Enter this protocol"),
            None => (
                suggestion.resolved.command.id.as_str(),
                suggestion.resolved.command.summary.as_str(),
            ),
        };
        out.push_str(&format!("\n  {name:<16} [{scope}] {:.2}  {summary}", suggestion.score));
    }
    out
}

/// Plain-text stand-in for the web client's intent handling.
fn render_intent(session: &ShellSession, intent: ClientIntent) -> String {
    match intent {
        ClientIntent::RenderText { text } => text,
        ClientIntent::ClearScreen => "\x1b[2J\x1b[H".to_string(),
        ClientIntent::ShowHistory => {
            let history = session.history();
            if history.is_empty() {
                return "No history yet.".to_string();
            }
            history
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    let mark = if entry.ok { ' ' } else { '!' };
                    format!("{:>4}{mark} {}", index + 1, entry.line)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        ClientIntent::RenderChart { pair, interval } => {
            format!("[chart] {pair} @ {interval} (rendered by the web client)")
        }
        ClientIntent::FetchBalance { address, chain } => {
            format!("[balance] {address} on chain {chain} (fetched by the web client)")
        }
        // The real host runs the wallet flows in the web client; here the
        // REPL plays that role and reports back into the session.
        ClientIntent::ConnectWallet => {
            session.set_wallet(WalletState::connected(DEMO_WALLET, ChainId(1)));
            format!("[wallet] connected {} (demo)", session.context().wallet.short_address())
        }
        ClientIntent::DisconnectWallet => {
            session.set_wallet(WalletState::default());
            "[wallet] disconnected".to_string()
        }
        ClientIntent::SignRequest { payload } => {
            format!("[sign] payload handed to the signer: {payload}")
        }
    }
}
