//! Command tables, the protocol plugin model, and registry storage.

use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use chainterm_types::{ChainId, ClientIntent, CommandOutcome, ExecutionContext};

/// Executable behavior behind a command descriptor.
///
/// `run` receives the raw argument string and a read-only snapshot of the
/// session context. Business failures travel as `Err(CommandFailure)`;
/// panics are reserved for programmer error and are caught once, at the
/// session boundary.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, args: &str, ctx: &ExecutionContext) -> CommandOutcome;
}

/// Adapter letting plain synchronous closures act as command handlers,
/// which covers most built-in and test commands.
struct SyncHandler<F>(F);

#[async_trait]
impl<F> CommandHandler for SyncHandler<F>
where
    F: Fn(&str, &ExecutionContext) -> CommandOutcome + Send + Sync,
{
    async fn run(&self, args: &str, ctx: &ExecutionContext) -> CommandOutcome {
        (self.0)(args, ctx)
    }
}

/// Wraps a synchronous closure into a boxed [`CommandHandler`].
pub fn handler_fn<F>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(&str, &ExecutionContext) -> CommandOutcome + Send + Sync + 'static,
{
    Arc::new(SyncHandler(f))
}

/// Client-side side-effect hook consulted by the UI layer for commands
/// whose result needs further interaction (signing flows, wallet modals)
/// rather than plain text rendering. The shell itself never invokes these.
pub trait ClientHandler: Send + Sync {
    fn handle(&self, intent: &ClientIntent, ctx: &ExecutionContext);
}

/// Optional asynchronous plugin initialization, awaited by the loader
/// before registration (remote token-list fetches and the like).
#[async_trait]
pub trait PluginInit: Send + Sync {
    async fn init(&self, config: &PluginConfig, ctx: &ExecutionContext) -> anyhow::Result<()>;
}

/// Host-supplied configuration passed to a plugin's init hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    /// URL of a token list the plugin may fetch during init.
    pub token_list_url: Option<String>,
    /// Free-form plugin settings.
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

/// One command as registered in a namespace. Immutable once registered.
#[derive(Clone)]
pub struct CommandDescriptor {
    /// Unique within its namespace; the same id may repeat across
    /// different protocol namespaces.
    pub id: String,
    /// Alternate names matched by exact resolution.
    pub aliases: Vec<String>,
    /// One-line description shown by `help`.
    pub summary: String,
    /// Excluded from help listings (used by the internal entry command).
    pub hidden: bool,
    /// The executable behavior.
    pub handler: Arc<dyn CommandHandler>,
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("id", &self.id)
            .field("aliases", &self.aliases)
            .field("summary", &self.summary)
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}

impl CommandDescriptor {
    pub fn new(id: impl Into<String>, summary: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            id: id.into(),
            aliases: Vec::new(),
            summary: summary.into(),
            hidden: false,
            handler,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Exact-match test against the id or any alias.
    pub fn matches(&self, token: &str) -> bool {
        self.id == token || self.aliases.iter().any(|alias| alias == token)
    }

    /// Comparable shape of the descriptor, ignoring the handler. Used by
    /// the loader's idempotent-reload check.
    pub(crate) fn signature(&self) -> (String, Vec<String>, String) {
        (self.id.clone(), self.aliases.clone(), self.summary.clone())
    }
}

/// An independently authored protocol integration: a namespace key, its
/// command table, optional client-side handlers, and an optional async
/// init hook. Loaded once by the [`PluginLoader`](crate::PluginLoader),
/// never mutated afterwards.
#[derive(Clone)]
pub struct ProtocolPlugin {
    /// Namespace key (`uniswap-v4`, `stargate`, …).
    pub id: String,
    /// Human-readable protocol name.
    pub name: String,
    /// Ordered command table; order is the within-namespace tie-break.
    pub commands: Vec<CommandDescriptor>,
    /// Optional command id → client-side hook mapping for the UI layer.
    pub handlers: IndexMap<String, Arc<dyn ClientHandler>>,
    /// Chains the protocol operates on, when it cares to declare them.
    pub supported_chains: Option<IndexSet<ChainId>>,
    /// Optional async initialization awaited before registration.
    pub init: Option<Arc<dyn PluginInit>>,
}

impl std::fmt::Debug for ProtocolPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolPlugin")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("commands", &self.commands)
            .field("supported_chains", &self.supported_chains)
            .field("has_init", &self.init.is_some())
            .finish_non_exhaustive()
    }
}

impl ProtocolPlugin {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            commands: Vec::new(),
            handlers: IndexMap::new(),
            supported_chains: None,
            init: None,
        }
    }

    pub fn command(mut self, descriptor: CommandDescriptor) -> Self {
        self.commands.push(descriptor);
        self
    }

    pub fn client_handler(mut self, command_id: impl Into<String>, handler: Arc<dyn ClientHandler>) -> Self {
        self.handlers.insert(command_id.into(), handler);
        self
    }

    pub fn supported_chains<I: IntoIterator<Item = ChainId>>(mut self, chains: I) -> Self {
        self.supported_chains = Some(chains.into_iter().collect());
        self
    }

    pub fn with_init(mut self, init: Arc<dyn PluginInit>) -> Self {
        self.init = Some(init);
        self
    }

    /// Find a command in this plugin's table by exact id or alias.
    pub fn find(&self, token: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|command| command.matches(token))
    }

    /// Comparable shape of the whole table, used to decide whether a
    /// re-load under the same id is identical (idempotent) or conflicting.
    pub(crate) fn table_signature(&self) -> (String, Vec<(String, Vec<String>, String)>) {
        (
            self.name.clone(),
            self.commands.iter().map(CommandDescriptor::signature).collect(),
        )
    }
}

/// Owns every loaded command table: the core set plus one table per
/// protocol. Append-only; there is no unregistration. Constructed by the
/// host at startup and shared read-only across sessions behind
/// [`RegistryHandle`].
#[derive(Debug, Default)]
pub struct CommandRegistry {
    /// Namespace-independent commands, always searched.
    pub core: Vec<CommandDescriptor>,
    /// Loaded protocol tables keyed by protocol id, in load order.
    pub protocols: IndexMap<String, Arc<ProtocolPlugin>>,
}

/// Shared handle through which sessions read the registry and the loader
/// appends to it.
pub type RegistryHandle = Arc<tokio::sync::RwLock<CommandRegistry>>;

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a fresh registry in the shared handle the rest of the system
    /// passes around.
    pub fn shared() -> RegistryHandle {
        Arc::new(tokio::sync::RwLock::new(Self::new()))
    }

    /// Appends a core command. A duplicate id is ignored so that calling
    /// core registration twice cannot double up the table.
    pub fn register_core(&mut self, descriptor: CommandDescriptor) {
        if self.core.iter().any(|existing| existing.id == descriptor.id) {
            tracing::debug!(command = %descriptor.id, "core command already registered; skipping");
            return;
        }
        self.core.push(descriptor);
    }

    /// Exact lookup in the core table, registration order.
    pub fn find_core(&self, token: &str) -> Option<&CommandDescriptor> {
        self.core.iter().find(|command| command.matches(token))
    }

    /// Core lookup by id only, ignoring aliases.
    pub fn find_core_by_id(&self, id: &str) -> Option<&CommandDescriptor> {
        self.core.iter().find(|command| command.id == id)
    }

    pub fn protocol(&self, id: &str) -> Option<&Arc<ProtocolPlugin>> {
        self.protocols.get(id)
    }

    /// Protocol ids in load order.
    pub fn protocol_ids(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }
}
