//! Plugin validation and registration.
//!
//! The loader is the only writer of the registry's protocol map. It
//! validates a plugin's own table, awaits the plugin's optional async
//! init, and registers the table append-only. Failures are reported as
//! values; a failed plugin is simply absent from the registry and never
//! takes the session down with it.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use chainterm_types::ExecutionContext;

use crate::models::{PluginConfig, ProtocolPlugin, RegistryHandle};

/// Why a plugin failed to load. Reported, never thrown.
#[derive(Debug, Error)]
pub enum PluginLoadError {
    #[error("plugin id must not be empty")]
    EmptyPluginId,
    #[error("plugin '{0}' declares no commands")]
    NoCommands(String),
    #[error("plugin '{plugin}' declares command id '{command}' more than once")]
    DuplicateCommandId { plugin: String, command: String },
    #[error("plugin '{plugin}' alias '{alias}' on '{command}' collides with another id or alias")]
    AliasCollision {
        plugin: String,
        command: String,
        alias: String,
    },
    #[error("plugin id '{0}' is already registered with a different command table")]
    ConflictingRedefinition(String),
    #[error("plugin '{plugin}' failed to initialize: {message}")]
    InitFailed { plugin: String, message: String },
}

/// Validates and registers protocol plugins into a shared registry.
#[derive(Clone)]
pub struct PluginLoader {
    registry: RegistryHandle,
}

impl PluginLoader {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    /// Validates `plugin`, awaits its init hook, and registers it under
    /// its id. Re-loading an identical plugin is idempotent; re-loading a
    /// different table under the same id is an error. The registry is
    /// only written after init succeeds.
    pub async fn load_plugin(
        &self,
        plugin: ProtocolPlugin,
        config: &PluginConfig,
        ctx: &ExecutionContext,
    ) -> Result<(), PluginLoadError> {
        validate_table(&plugin)?;

        // Cheap path: an identical table is already present.
        {
            let registry = self.registry.read().await;
            if let Some(existing) = registry.protocol(&plugin.id) {
                return reload_outcome(existing, &plugin);
            }
        }

        if let Some(init) = plugin.init.clone() {
            if let Err(error) = init.init(config, ctx).await {
                warn!(protocol = %plugin.id, error = %error, "plugin init failed; plugin not registered");
                return Err(PluginLoadError::InitFailed {
                    plugin: plugin.id,
                    message: error.to_string(),
                });
            }
        }

        let mut registry = self.registry.write().await;
        // Another session may have loaded the same id while init ran.
        if let Some(existing) = registry.protocol(&plugin.id) {
            return reload_outcome(existing, &plugin);
        }

        info!(protocol = %plugin.id, commands = plugin.commands.len(), "loaded protocol plugin");
        registry.protocols.insert(plugin.id.clone(), Arc::new(plugin));
        Ok(())
    }

    /// Looks up a loaded plugin by protocol id.
    pub async fn get_plugin(&self, protocol_id: &str) -> Option<Arc<ProtocolPlugin>> {
        self.registry.read().await.protocol(protocol_id).cloned()
    }

    /// Handle to the registry this loader writes into.
    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }
}

fn reload_outcome(existing: &Arc<ProtocolPlugin>, incoming: &ProtocolPlugin) -> Result<(), PluginLoadError> {
    if existing.table_signature() == incoming.table_signature() {
        Ok(())
    } else {
        Err(PluginLoadError::ConflictingRedefinition(incoming.id.clone()))
    }
}

/// A plugin's own ids and aliases must be non-colliding; a collision here
/// is a load-time error, never a resolution-time concern.
fn validate_table(plugin: &ProtocolPlugin) -> Result<(), PluginLoadError> {
    if plugin.id.trim().is_empty() {
        return Err(PluginLoadError::EmptyPluginId);
    }
    if plugin.commands.is_empty() {
        return Err(PluginLoadError::NoCommands(plugin.id.clone()));
    }

    let mut names: HashSet<&str> = HashSet::new();
    for command in &plugin.commands {
        if !names.insert(command.id.as_str()) {
            return Err(PluginLoadError::DuplicateCommandId {
                plugin: plugin.id.clone(),
                command: command.id.clone(),
            });
        }
    }
    for command in &plugin.commands {
        for alias in &command.aliases {
            if !names.insert(alias.as_str()) {
                return Err(PluginLoadError::AliasCollision {
                    plugin: plugin.id.clone(),
                    command: command.id.clone(),
                    alias: alias.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommandDescriptor, CommandRegistry, PluginInit, handler_fn};
    use async_trait::async_trait;
    use chainterm_types::CommandOutput;

    fn noop_command(id: &str) -> CommandDescriptor {
        CommandDescriptor::new(id, format!("{id} command"), handler_fn(|_, _| Ok(CommandOutput::text("ok"))))
    }

    fn swap_plugin() -> ProtocolPlugin {
        ProtocolPlugin::new("demoswap", "Demo Swap")
            .command(noop_command("swap"))
            .command(noop_command("price").with_aliases(["p"]))
    }

    struct FailingInit;

    #[async_trait]
    impl PluginInit for FailingInit {
        async fn init(&self, _config: &PluginConfig, _ctx: &ExecutionContext) -> anyhow::Result<()> {
            anyhow::bail!("token list fetch timed out")
        }
    }

    #[tokio::test]
    async fn load_registers_the_plugin() {
        let loader = PluginLoader::new(CommandRegistry::shared());
        let ctx = ExecutionContext::new();

        loader
            .load_plugin(swap_plugin(), &PluginConfig::default(), &ctx)
            .await
            .expect("load plugin");
        let plugin = loader.get_plugin("demoswap").await.expect("plugin registered");
        assert_eq!(plugin.commands.len(), 2);
    }

    #[tokio::test]
    async fn reloading_identical_plugin_is_idempotent() {
        let loader = PluginLoader::new(CommandRegistry::shared());
        let ctx = ExecutionContext::new();
        let config = PluginConfig::default();

        loader.load_plugin(swap_plugin(), &config, &ctx).await.expect("first load");
        loader.load_plugin(swap_plugin(), &config, &ctx).await.expect("second load");

        let registry = loader.registry().read().await;
        assert_eq!(registry.protocols.len(), 1);
        assert_eq!(registry.protocol("demoswap").unwrap().commands.len(), 2);
    }

    #[tokio::test]
    async fn reloading_a_different_table_is_rejected() {
        let loader = PluginLoader::new(CommandRegistry::shared());
        let ctx = ExecutionContext::new();
        let config = PluginConfig::default();

        loader.load_plugin(swap_plugin(), &config, &ctx).await.expect("first load");
        let changed = ProtocolPlugin::new("demoswap", "Demo Swap").command(noop_command("quote"));
        let error = loader.load_plugin(changed, &config, &ctx).await.unwrap_err();
        assert!(matches!(error, PluginLoadError::ConflictingRedefinition(_)));
    }

    #[tokio::test]
    async fn duplicate_ids_fail_validation() {
        let loader = PluginLoader::new(CommandRegistry::shared());
        let ctx = ExecutionContext::new();

        let bad = ProtocolPlugin::new("bad", "Bad")
            .command(noop_command("swap"))
            .command(noop_command("swap"));
        let error = loader.load_plugin(bad, &PluginConfig::default(), &ctx).await.unwrap_err();
        assert!(matches!(error, PluginLoadError::DuplicateCommandId { .. }));
    }

    #[tokio::test]
    async fn alias_colliding_with_an_id_fails_validation() {
        let loader = PluginLoader::new(CommandRegistry::shared());
        let ctx = ExecutionContext::new();

        let bad = ProtocolPlugin::new("bad", "Bad")
            .command(noop_command("swap"))
            .command(noop_command("send").with_aliases(["swap"]));
        let error = loader.load_plugin(bad, &PluginConfig::default(), &ctx).await.unwrap_err();
        assert!(matches!(error, PluginLoadError::AliasCollision { .. }));
    }

    #[tokio::test]
    async fn failed_init_leaves_the_plugin_absent() {
        let loader = PluginLoader::new(CommandRegistry::shared());
        let ctx = ExecutionContext::new();

        let plugin = swap_plugin().with_init(Arc::new(FailingInit));
        let error = loader.load_plugin(plugin, &PluginConfig::default(), &ctx).await.unwrap_err();
        assert!(matches!(error, PluginLoadError::InitFailed { .. }));
        assert!(loader.get_plugin("demoswap").await.is_none());
    }

    #[tokio::test]
    async fn empty_id_and_empty_table_fail_validation() {
        let loader = PluginLoader::new(CommandRegistry::shared());
        let ctx = ExecutionContext::new();
        let config = PluginConfig::default();

        let no_id = ProtocolPlugin::new("  ", "Anon").command(noop_command("swap"));
        assert!(matches!(
            loader.load_plugin(no_id, &config, &ctx).await.unwrap_err(),
            PluginLoadError::EmptyPluginId
        ));

        let no_commands = ProtocolPlugin::new("empty", "Empty");
        assert!(matches!(
            loader.load_plugin(no_commands, &config, &ctx).await.unwrap_err(),
            PluginLoadError::NoCommands(_)
        ));
    }
}
