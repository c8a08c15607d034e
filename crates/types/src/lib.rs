//! Shared type definitions for the chainterm shell.
//!
//! This crate holds the data model threaded through every layer: wallet
//! identity, the fiber (active protocol namespace) state, the per-session
//! execution context, and the tagged client-intent union that commands
//! return instead of ad hoc result fields.

pub mod context;
pub mod intent;
pub mod wallet;

pub use context::{ExecutionContext, FiberState, OutcomeSummary};
pub use intent::{ChartInterval, ClientIntent, CommandFailure, CommandOutcome, CommandOutput, FiberTransition};
pub use wallet::{ChainId, WalletState};
