//! Session engine for the chainterm shell: the fiber transition function,
//! the pure execution-context update, and the sequential session executor
//! that ties resolution and invocation together.

pub mod context;
pub mod fiber;
pub mod session;

pub use context::update_execution_context;
pub use fiber::apply_transition;
pub use session::{HISTORY_LIMIT, HistoryEntry, SessionError, SessionReply, ShellSession};
