//! Command registry, resolvers, and plugin loading for the chainterm shell.
//!
//! The registry owns every loaded command table: the core set plus one
//! table per protocol plugin. It exposes the two resolvers (exact for
//! execution, fuzzy for completion); the [`PluginLoader`] is its only
//! writer.

pub mod core;
pub mod fuzzy;
pub mod loader;
pub mod models;
pub mod resolve;

pub use core::register_core_commands;
pub use fuzzy::{DEFAULT_FUZZY_THRESHOLD, ScoredCommand};
pub use loader::{PluginLoader, PluginLoadError};
pub use models::{
    ClientHandler, CommandDescriptor, CommandHandler, CommandRegistry, PluginConfig, PluginInit, ProtocolPlugin,
    RegistryHandle, handler_fn,
};
pub use resolve::{ENTER_COMMAND_ID, ResolutionPreferences, ResolutionRequest, ResolvedCommand};
