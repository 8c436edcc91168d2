//! Errors raised by console command handlers.
//!
//! Every variant is caught at the handler boundary and printed; none of them
//! stops the console.

use std::io;
use std::path::PathBuf;

use zwave_console_serial_link::LinkError;

use crate::controller::ControllerError;

/// A console command that could not be carried out.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Required tokens are missing.
    #[error("invalid {command} command ==> use: {usage}")]
    Usage {
        /// The command word as typed.
        command: &'static str,
        /// The expected form.
        usage: &'static str,
    },

    /// The node id token is not an integer literal.
    #[error("invalid node id ({token})")]
    InvalidNodeId {
        /// The raw token.
        token: String,
    },

    /// No node with this id is known to the controller.
    #[error("there exists no node with id {id}")]
    UnknownNode {
        /// The requested id.
        id: u32,
    },

    /// No command class matches the token at the requested version.
    #[error("unable to find Z-Wave command class {class} of version {version}")]
    CommandClassNotFound {
        /// The class token as typed.
        class: String,
        /// The requested version.
        version: u8,
    },

    /// The command class exists but has no such command.
    #[error("unable to find Z-Wave command {command} in command class {class} of version {version}")]
    CommandNotFound {
        /// The class name.
        class: String,
        /// The command token as typed.
        command: String,
        /// The requested version.
        version: u8,
    },

    /// A parameter token is not an integer literal.
    #[error("unable to set param value ({index} {token})")]
    InvalidParam {
        /// Zero-based parameter index.
        index: usize,
        /// The raw token.
        token: String,
    },

    /// More values were given than the command declares.
    #[error("command {command} takes at most {slots} parameter(s), got {given}")]
    TooManyParams {
        /// The command name.
        command: String,
        /// Declared slot count.
        slots: usize,
        /// Number of values given.
        given: usize,
    },

    /// A value does not fit its slot width.
    #[error("param value {value} at index {index} exceeds maximum {max}")]
    ParamOutOfRange {
        /// Zero-based parameter index.
        index: usize,
        /// The parsed value.
        value: u32,
        /// Largest value the slot accepts.
        max: u32,
    },

    /// The command needs a connected controller.
    #[error("Controller is not connected. Connect the controller first ('connect <serial port>')")]
    NotConnected,

    /// Unknown `set` target.
    #[error("Unknown set command ({0})")]
    UnknownSetCommand(String),

    /// Unknown `print` target.
    #[error("Unknown print command ({0})")]
    UnknownPrintCommand(String),

    /// The configuration file to load does not exist.
    #[error("file '{}' does not exist", path.display())]
    ConfigFileMissing {
        /// The requested path.
        path: PathBuf,
    },

    /// A transport failure while connecting.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The controller rejected or failed an operation.
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Writing to the console output failed.
    #[error("console output failed: {0}")]
    Output(#[from] io::Error),
}
