//! The console session: shared state, the shutdown signal, and the run loop.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};
use zwave_console_serial_link::PortProvider;
use zwave_console_spec_tables::CommandClassSpecification;

use crate::connection::ConnectionManager;
use crate::controller::Controller;
use crate::events::{EventBridge, event_channel};
use crate::interpreter::Interpreter;

// ── Shutdown signal ──────────────────────────────────────────────────────

/// One-shot, cloneable shutdown flag with blocking wait.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    /// A signal that has not been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake every waiter. Raising twice is a no-op.
    pub fn raise(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock() = true;
        cvar.notify_all();
    }

    /// Whether the signal has been raised.
    pub fn is_raised(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Block until the signal is raised.
    pub fn wait(&self) {
        let (flag, cvar) = &*self.inner;
        let mut raised = flag.lock();
        while !*raised {
            cvar.wait(&mut raised);
        }
    }

    /// Block until the signal is raised or `timeout` elapses. Returns whether
    /// it was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let mut raised = flag.lock();
        if !*raised {
            cvar.wait_while_for(&mut raised, |raised| !*raised, timeout);
        }
        *raised
    }
}

// ── Session ──────────────────────────────────────────────────────────────

/// Everything a console session shares between its threads.
pub struct Session {
    controller: Arc<dyn Controller>,
    spec: Arc<CommandClassSpecification>,
    connection: Arc<ConnectionManager>,
    shutdown: ShutdownSignal,
    config_path: PathBuf,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection)
            .field("shutdown", &self.shutdown)
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Assemble a session around a controller and a port provider.
    ///
    /// `config_path` is used by bare `save` and `load`.
    pub fn new(
        controller: Arc<dyn Controller>,
        spec: Arc<CommandClassSpecification>,
        ports: Arc<dyn PortProvider>,
        config_path: PathBuf,
    ) -> Self {
        let connection = Arc::new(ConnectionManager::new(ports, Arc::clone(&controller)));
        Self {
            controller,
            spec,
            connection,
            shutdown: ShutdownSignal::new(),
            config_path,
        }
    }

    /// The controller being driven.
    pub fn controller(&self) -> &dyn Controller {
        self.controller.as_ref()
    }

    /// Command class tables.
    pub fn spec(&self) -> &CommandClassSpecification {
        &self.spec
    }

    /// The connection manager.
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// The session's shutdown signal.
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Default path for `save`/`load`.
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

// ── Run loop ─────────────────────────────────────────────────────────────

/// Run the console until `exit`, end of input, or an external shutdown.
///
/// Lines from `input` are dispatched one at a time; output goes to `out`.
/// On return the controller has been disposed and the port closed.
pub fn run_console<R, W>(session: &Session, mut input: R, out: W) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    let (events_tx, events_rx) = event_channel();
    session.controller.subscribe(events_tx);
    let bridge = EventBridge::spawn(events_rx, Arc::clone(&session.connection))?;

    let teardown = {
        let shutdown = session.shutdown.clone();
        let controller = Arc::clone(&session.controller);
        let connection = Arc::clone(&session.connection);
        thread::Builder::new()
            .name("teardown".into())
            .spawn(move || {
                shutdown.wait();
                info!("shutting down");
                controller.dispose();
                if let Some(port) = connection.close() {
                    debug!(port, "port closed at shutdown");
                }
            })?
    };

    let mut interpreter = Interpreter::new(session, out);
    let mut line = String::new();
    let mut result = Ok(());
    while !session.shutdown.is_raised() {
        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => {
                debug!("end of input");
                session.shutdown.raise();
            }
            Ok(_) => interpreter.execute(&line),
            Err(e) => {
                error!(error = %e, "failed to read console input");
                session.shutdown.raise();
                result = Err(e);
            }
        }
    }

    if teardown.join().is_err() {
        error!("teardown thread panicked");
    }
    bridge.shutdown();
    result
}
