//! Delivery of controller events to the connection manager.
//!
//! Controllers publish [`ControllerEvent`]s into a bounded channel from their
//! own reader threads. A dedicated bridge thread drains the channel and tears
//! the connection down on I/O failures, so no handler ever runs on the
//! controller's thread.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, select};
use tracing::{debug, error, warn};

use crate::connection::ConnectionManager;
use crate::model::ControllerEvent;

/// Capacity of the controller → bridge channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Create the bounded channel controllers publish into.
pub fn event_channel() -> (Sender<ControllerEvent>, Receiver<ControllerEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}

/// React to a single controller event.
pub fn handle_event(connection: &ConnectionManager, event: ControllerEvent) {
    match event {
        ControllerEvent::IoConnectionError {
            link,
            message,
            source,
        } => {
            match &source {
                Some(source) => error!(%link, %source, "IO-ERROR - {message}"),
                None => error!(%link, "IO-ERROR - {message}"),
            }
            if connection.close_link(link) {
                warn!(%link, "serial connection closed after I/O error");
            } else {
                debug!(%link, "I/O error for a link that is no longer current");
            }
        }
        other => debug!(event = ?other, "controller event"),
    }
}

/// Handle to the running bridge thread.
#[derive(Debug)]
pub struct EventBridge {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl EventBridge {
    /// Start draining `events` into `connection`.
    pub fn spawn(
        events: Receiver<ControllerEvent>,
        connection: Arc<ConnectionManager>,
    ) -> io::Result<Self> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let thread = thread::Builder::new()
            .name("event-bridge".into())
            .spawn(move || bridge_main(&events, &stop_rx, &connection))?;
        Ok(Self {
            stop_tx,
            thread: Some(thread),
        })
    }

    /// Stop the bridge and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.stop_tx.try_send(());
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.join().is_err() {
            error!("event bridge thread panicked");
        }
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

fn bridge_main(
    events: &Receiver<ControllerEvent>,
    stop_rx: &Receiver<()>,
    connection: &ConnectionManager,
) {
    loop {
        select! {
            recv(events) -> event => match event {
                Ok(event) => handle_event(connection, event),
                // Every publisher is gone.
                Err(_) => break,
            },
            recv(stop_rx) -> _ => break,
        }
    }
    debug!("event bridge stopped");
}
