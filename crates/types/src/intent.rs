//! Command results and the tagged client-intent union.
//!
//! Commands never inspect or mutate the UI; they return a [`ClientIntent`]
//! describing what the client should do next (render text, draw a chart,
//! open the wallet-connect flow, …). The UI layer matches the union
//! exhaustively, which replaces the earlier pattern of sniffing optional
//! fields on an untyped result value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wallet::ChainId;

/// Candlestick interval for chart rendering intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartInterval {
    OneMinute,
    FiveMinutes,
    OneHour,
    OneDay,
}

impl std::fmt::Display for ChartInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ChartInterval::OneMinute => "1m",
            ChartInterval::FiveMinutes => "5m",
            ChartInterval::OneHour => "1h",
            ChartInterval::OneDay => "1d",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for ChartInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(ChartInterval::OneMinute),
            "5m" => Ok(ChartInterval::FiveMinutes),
            "1h" => Ok(ChartInterval::OneHour),
            "1d" => Ok(ChartInterval::OneDay),
            other => Err(format!("unknown interval '{other}' (expected 1m, 5m, 1h, or 1d)")),
        }
    }
}

/// What the client should do with a successful command result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientIntent {
    /// Render plain text in the terminal view.
    RenderText { text: String },
    /// Clear the terminal view.
    ClearScreen,
    /// Render the session's command history.
    ShowHistory,
    /// Draw a candlestick chart widget for a trading pair.
    RenderChart { pair: String, interval: ChartInterval },
    /// Fetch and display a token balance for an address.
    FetchBalance { address: String, chain: ChainId },
    /// Open the wallet-connect flow.
    ConnectWallet,
    /// Tear down the wallet session.
    DisconnectWallet,
    /// Hand a prepared transaction payload to the signing layer.
    SignRequest { payload: serde_json::Value },
}

impl ClientIntent {
    /// Convenience constructor for the common text case.
    pub fn text(text: impl Into<String>) -> Self {
        ClientIntent::RenderText { text: text.into() }
    }
}

/// Fiber transition requested by a successful command.
///
/// Only the engine's context update consumes this; a command cannot
/// mutate the fiber directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "protocol", rename_all = "snake_case")]
pub enum FiberTransition {
    /// Enter the named protocol's namespace.
    Enter(String),
    /// Leave the active namespace and return to Global.
    Exit,
}

/// Successful command result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// What the client should do with the result.
    pub intent: ClientIntent,
    /// Optional fiber transition applied by the context update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<FiberTransition>,
    /// When true and the command resolved against a protocol, the context
    /// update records that protocol as the user's default for this command
    /// id. Set by plugins on results that signal a deliberate choice.
    #[serde(default)]
    pub remember_protocol: bool,
}

impl CommandOutput {
    /// Plain-text output with no transition.
    pub fn text(text: impl Into<String>) -> Self {
        Self::intent(ClientIntent::text(text))
    }

    /// Output carrying an arbitrary intent.
    pub fn intent(intent: ClientIntent) -> Self {
        Self {
            intent,
            transition: None,
            remember_protocol: false,
        }
    }

    /// Attach a fiber transition.
    pub fn with_transition(mut self, transition: FiberTransition) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Mark the resolved protocol as the user's preference for this command.
    pub fn remembering_protocol(mut self) -> Self {
        self.remember_protocol = true;
        self
    }
}

/// Expected business failure of a command (bad args, upstream error,
/// not-found). Travels as an `Err` value; panics are reserved for
/// programmer error and caught once at the session boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct CommandFailure {
    /// Human-readable failure description, rendered verbatim.
    pub message: String,
}

impl CommandFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Result of one command invocation.
pub type CommandOutcome = Result<CommandOutput, CommandFailure>;
