//! Typed error types for the serial link.

use std::io;

/// Serial link error conditions.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No port with this name exists on the system.
    #[error("there exists no port with the name '{port}'")]
    PortNotFound {
        /// The requested port name.
        port: String,
    },

    /// The port exists but is owned by someone else (or by us).
    #[error("Port '{port}' is currently in use")]
    PortBusy {
        /// The requested port name.
        port: String,
    },

    /// Opening the port failed for another reason.
    #[error("failed to open port '{port}': {reason}")]
    OpenFailed {
        /// The requested port name.
        port: String,
        /// Driver-level description of the failure.
        reason: String,
    },

    /// The port opened but line settings or timeouts could not be applied.
    #[error("failed to configure port '{port}': {reason}")]
    ConfigureFailed {
        /// The port name.
        port: String,
        /// Driver-level description of the failure.
        reason: String,
    },

    /// The operation needs an open port but it has been closed.
    #[error("port '{port}' is closed")]
    Closed {
        /// The port name.
        port: String,
    },

    /// An I/O error on an open port.
    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),
}
