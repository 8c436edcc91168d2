//! Serial transport for Z-Wave controllers.
//!
//! The console talks to exactly one controller over a serial port. This crate
//! defines the transport seam ([`PortProvider`] opens ports, [`SerialLink`] is
//! an opened port) and a system implementation over the `serialport` crate
//! behind the default `serial` feature.
mod config;
mod error;
#[cfg(feature = "serial")]
mod serial;

pub use config::{LinkTimeouts, SerialDataBits, SerialParity, SerialSettings, SerialStopBits};
pub use error::LinkError;
#[cfg(feature = "serial")]
pub use serial::{SystemLink, SystemPorts};

use std::io::{Read, Write};
use std::time::Duration;

// ── Traits ───────────────────────────────────────────────────────────────

/// Discovers and opens serial ports.
pub trait PortProvider: Send + Sync {
    /// Names of the ports currently present on the system.
    fn list_ports(&self) -> Vec<String>;

    /// Open the named port, giving up after `timeout`.
    ///
    /// Returns [`LinkError::PortNotFound`] when no such port exists and
    /// [`LinkError::PortBusy`] when it is owned elsewhere.
    fn open(&self, name: &str, timeout: Duration) -> Result<Box<dyn SerialLink>, LinkError>;
}

/// An opened serial port.
pub trait SerialLink: Send {
    /// The port name this link was opened with.
    fn name(&self) -> &str;

    /// Apply line framing.
    fn configure(&mut self, settings: &SerialSettings) -> Result<(), LinkError>;

    /// Bound how long a single read on the split reader may block.
    fn set_receive_timeout(&mut self, timeout: Duration) -> Result<(), LinkError>;

    /// Produce an independent reader/writer pair over this port.
    fn split(&mut self) -> Result<LinkStreams, LinkError>;

    /// Close the port. Closing twice is a no-op.
    fn close(&mut self);

    /// Whether the port is still open.
    fn is_open(&self) -> bool;
}

/// Reader/writer halves handed to the controller.
pub struct LinkStreams {
    /// Inbound byte stream.
    pub reader: Box<dyn Read + Send>,
    /// Outbound byte stream.
    pub writer: Box<dyn Write + Send>,
}

impl std::fmt::Debug for LinkStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStreams").finish_non_exhaustive()
    }
}
