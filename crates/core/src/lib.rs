//! Z-Wave console core.
//!
//! Interprets operator line commands against a single Z-Wave controller:
//! tokenizing, resolving command classes and commands by key or name, binding
//! positional parameters, and owning the one serial connection. Controller
//! events arrive over a bounded channel and are handled on a dedicated
//! bridge thread. The entry point is [`run_console`].

#![warn(missing_docs)]

/// Positional parameter binding.
pub mod binder;
/// Serial connection ownership.
pub mod connection;
/// The controller trait and its errors.
pub mod controller;
/// Handler errors.
pub mod error;
/// Controller event delivery.
pub mod events;
/// The line-command interpreter.
pub mod interpreter;
/// Integer literal parsing.
pub mod literal;
/// Nodes, modes, commands, and events.
pub mod model;
/// Text rendering of console output.
pub mod render;
/// Class/command token resolution.
pub mod resolver;
/// Session state, shutdown signal, and the run loop.
pub mod session;

use std::path::PathBuf;

// ── Convenience re-exports ───────────────────────────────────────────────

pub use connection::{ActivityGuard, ConnectionManager, ConnectionStatus};
pub use controller::{Controller, ControllerError};
pub use error::ConsoleError;
pub use events::{EVENT_CHANNEL_CAPACITY, EventBridge, event_channel, handle_event};
pub use interpreter::Interpreter;
pub use literal::{LiteralError, parse_int};
pub use model::{ControllerEvent, ControllerMode, LinkId, Node, NodeCommand};
pub use resolver::{DEFAULT_VERSION, ResolvedCommand, resolve};
pub use session::{Session, ShutdownSignal, run_console};

/// Console version, shown by `print version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file used by bare `save` and `load`:
/// `<cwd>/cnf/nodes.xml`.
pub fn default_config_path() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    cwd.join("cnf").join("nodes.xml")
}
