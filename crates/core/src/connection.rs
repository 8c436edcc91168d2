//! Ownership of the single serial connection.
//!
//! [`ConnectionManager`] holds at most one open [`SerialLink`]. The connect
//! sequence and every close run under one lock, so an asynchronous teardown
//! can never interleave with a manual `connect`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use zwave_console_serial_link::{
    LinkError, LinkTimeouts, PortProvider, SerialLink, SerialSettings,
};

use crate::controller::Controller;
use crate::error::ConsoleError;
use crate::model::LinkId;

/// Connection state as seen by command handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No port is bound to the controller.
    NotConnected,
    /// Bound, no command in flight.
    ConnectedIdle,
    /// Bound, a command is being dispatched.
    ConnectedActive,
}

struct Current {
    id: LinkId,
    link: Box<dyn SerialLink>,
    /// The controller was initialized on this link's streams.
    bound: bool,
}

#[derive(Default)]
struct State {
    current: Option<Current>,
    next_id: u64,
}

/// Owns the at-most-one open serial port and binds it to the controller.
pub struct ConnectionManager {
    ports: Arc<dyn PortProvider>,
    controller: Arc<dyn Controller>,
    settings: SerialSettings,
    timeouts: LinkTimeouts,
    state: Mutex<State>,
    in_flight: AtomicUsize,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("current_port", &self.current_port())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// A manager with the fixed Z-Wave framing and timeouts.
    pub fn new(ports: Arc<dyn PortProvider>, controller: Arc<dyn Controller>) -> Self {
        Self {
            ports,
            controller,
            settings: SerialSettings::zwave(),
            timeouts: LinkTimeouts::default(),
            state: Mutex::new(State::default()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// The line framing applied on connect.
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Open `port`, configure it, and bind the controller to it.
    ///
    /// Connecting to the port that is already held fails with
    /// [`LinkError::PortBusy`]. Connecting to a different port opens the new
    /// one first and only then releases the old one, so a failed open leaves
    /// the existing connection untouched.
    ///
    /// When the port opens but configuration or binding fails, the error is
    /// returned and the port stays held until the next successful connect,
    /// an I/O error event, or shutdown.
    pub fn connect(&self, port: &str) -> Result<LinkId, ConsoleError> {
        let mut state = self.state.lock();

        if state.current.as_ref().is_some_and(|c| c.link.name() == port) {
            return Err(LinkError::PortBusy {
                port: port.to_string(),
            }
            .into());
        }

        let link = self.ports.open(port, self.timeouts.open)?;
        debug!(port, "port opened");

        if let Some(previous) = state.current.take() {
            self.release(previous);
        }

        state.next_id += 1;
        let id = LinkId(state.next_id);
        let current = state.current.insert(Current {
            id,
            link,
            bound: false,
        });

        self.bind(id, current.link.as_mut())?;
        current.bound = true;
        info!(port, link = %id, settings = %self.settings, "controller connected");
        Ok(id)
    }

    fn bind(&self, id: LinkId, link: &mut dyn SerialLink) -> Result<(), ConsoleError> {
        link.configure(&self.settings)?;
        link.set_receive_timeout(self.timeouts.receive)?;
        let streams = link.split()?;
        self.controller.init(id, streams)?;
        Ok(())
    }

    fn release(&self, mut current: Current) {
        // A failed init may have left the controller holding the streams.
        self.controller.detach();
        current.link.close();
        info!(port = current.link.name(), link = %current.id, "serial connection closed");
    }

    /// Close whatever port is held. Returns its name, if any.
    pub fn close(&self) -> Option<String> {
        let mut state = self.state.lock();
        let current = state.current.take()?;
        let name = current.link.name().to_string();
        self.release(current);
        Some(name)
    }

    /// Close the held port only if it is `link`. Returns whether it closed.
    pub fn close_link(&self, link: LinkId) -> bool {
        let mut state = self.state.lock();
        match &state.current {
            Some(current) if current.id == link => {}
            Some(current) => {
                warn!(stale = %link, current = %current.id, "ignoring close for stale link");
                return false;
            }
            None => return false,
        }
        if let Some(current) = state.current.take() {
            self.release(current);
        }
        true
    }

    /// Name of the held port, if any.
    pub fn current_port(&self) -> Option<String> {
        let state = self.state.lock();
        state.current.as_ref().map(|c| c.link.name().to_string())
    }

    /// Id of the held link, if any.
    pub fn current_link(&self) -> Option<LinkId> {
        self.state.lock().current.as_ref().map(|c| c.id)
    }

    /// Current connection state.
    pub fn status(&self) -> ConnectionStatus {
        let bound = self
            .state
            .lock()
            .current
            .as_ref()
            .is_some_and(|c| c.bound && c.link.is_open());
        match (bound, self.in_flight.load(Ordering::Acquire)) {
            (false, _) => ConnectionStatus::NotConnected,
            (true, 0) => ConnectionStatus::ConnectedIdle,
            (true, _) => ConnectionStatus::ConnectedActive,
        }
    }

    /// Whether the controller is bound to an open port.
    pub fn is_connected(&self) -> bool {
        self.status() != ConnectionStatus::NotConnected
    }

    /// Mark a command as in flight until the guard drops.
    pub fn activity(&self) -> ActivityGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        ActivityGuard { manager: self }
    }

    /// Names of the ports present on the system.
    pub fn list_ports(&self) -> Vec<String> {
        self.ports.list_ports()
    }
}

/// Keeps [`ConnectionStatus::ConnectedActive`] while alive.
#[must_use = "the connection reads as idle once the guard is dropped"]
#[derive(Debug)]
pub struct ActivityGuard<'a> {
    manager: &'a ConnectionManager,
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.manager.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
