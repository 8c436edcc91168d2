//! [`Controller`] over the Z-Wave Serial API.
//!
//! `init` takes over a link's streams: a reader thread decodes frames,
//! acknowledges them, and folds responses and callbacks into the node table,
//! while requests are written from the calling thread. Only the reader
//! belonging to the current link may update state or report errors; readers
//! of detached links exit after their next read returns.

use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};
use zwave_console_core::{
    Controller, ControllerError, ControllerEvent, ControllerMode, LinkId, Node, NodeCommand,
};
use zwave_console_serial_link::LinkStreams;

use crate::config::{ConfigFile, NodeEntry};
use crate::frame::{ACK, Frame, FrameDecoder, FrameType, NAK, Received, encode_request};
use crate::function::{self as func, Progress};

/// Largest application payload a SendData frame carries.
pub const MAX_PAYLOAD: usize = 46;

// ── State ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct State {
    link: Option<LinkId>,
    mode: Option<ControllerMode>,
    nodes: BTreeMap<u8, Node>,
    own_node_id: Option<u8>,
    home_id: Option<u32>,
    version: Option<String>,
    chip: Option<String>,
    /// Nodes awaiting `GetNodeProtocolInfo`; the head is in flight.
    protocol_queue: VecDeque<u8>,
    disposed: bool,
}

impl State {
    fn node_mut(&mut self, id: u8) -> &mut Node {
        self.nodes.entry(id).or_insert_with(|| Node::new(id))
    }
}

/// Requests and events produced while handling one inbound frame. They are
/// sent after the state lock is released.
#[derive(Default)]
struct Effects {
    requests: Vec<(u8, Vec<u8>)>,
    events: Vec<ControllerEvent>,
}

struct Shared {
    state: Mutex<State>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    events: Mutex<Option<Sender<ControllerEvent>>>,
    callback_id: AtomicU8,
}

/// A Z-Wave controller attached over a serial link.
pub struct SerialController {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SerialController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SerialController")
            .field("link", &state.link)
            .field("nodes", &state.nodes.len())
            .finish_non_exhaustive()
    }
}

impl Default for SerialController {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialController {
    /// A controller with no link and no known nodes.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                writer: Mutex::new(None),
                events: Mutex::new(None),
                callback_id: AtomicU8::new(0),
            }),
        }
    }
}

// ── Outbound ─────────────────────────────────────────────────────────────

impl Shared {
    fn next_callback_id(&self) -> u8 {
        // Zero means "no callback".
        loop {
            let id = self.callback_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if id != 0 {
                return id;
            }
        }
    }

    fn publish(&self, event: ControllerEvent) {
        let events = self.events.lock();
        let Some(tx) = events.as_ref() else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!(?event, "event channel full, dropping event"),
            Err(TrySendError::Disconnected(_)) => debug!("no event subscriber"),
        }
    }

    fn publish_io_error(&self, link: LinkId, message: &str, error: &io::Error) {
        self.publish(ControllerEvent::IoConnectionError {
            link,
            message: format!("{message}: {error}"),
            source: Some(Arc::new(io::Error::new(error.kind(), error.to_string()))),
        });
    }

    fn write_raw(&self, bytes: &[u8]) -> Result<(), ControllerError> {
        let link = self.state.lock().link.ok_or(ControllerError::NotInitialized)?;
        let mut writer = self.writer.lock();
        let Some(out) = writer.as_mut() else {
            return Err(ControllerError::NotInitialized);
        };
        trace!(bytes = ?bytes, "tx");
        if let Err(e) = out.write_all(bytes).and_then(|()| out.flush()) {
            drop(writer);
            self.publish_io_error(link, "write to controller failed", &e);
            return Err(ControllerError::Write(e));
        }
        Ok(())
    }

    fn request(&self, function: u8, payload: &[u8]) -> Result<(), ControllerError> {
        let frame = encode_request(function, payload)
            .ok_or(ControllerError::PayloadTooLarge(payload.len()))?;
        debug!(function = format_args!("0x{function:02x}"), len = payload.len(), "request");
        self.write_raw(&frame)
    }

    fn apply(&self, effects: Effects) {
        for (function, payload) in effects.requests {
            if let Err(e) = self.request(function, &payload) {
                warn!(error = %e, function = format_args!("0x{function:02x}"), "follow-up request failed");
            }
        }
        for event in effects.events {
            self.publish(event);
        }
    }
}

// ── Inbound ──────────────────────────────────────────────────────────────

fn reader_main(shared: &Shared, link: LinkId, mut reader: Box<dyn Read + Send>) {
    let mut decoder = FrameDecoder::default();
    let mut buf = [0u8; 256];
    loop {
        let read = reader.read(&mut buf);
        if shared.state.lock().link != Some(link) {
            debug!(%link, "reader for detached link exiting");
            return;
        }
        let n = match read {
            Ok(0) => {
                let e = io::Error::from(io::ErrorKind::UnexpectedEof);
                shared.publish_io_error(link, "serial connection closed", &e);
                return;
            }
            Ok(n) => n,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => {
                shared.publish_io_error(link, "read from controller failed", &e);
                return;
            }
        };
        trace!(bytes = ?&buf[..n], "rx");

        for unit in decoder.push(&buf[..n]) {
            match unit {
                Received::Frame(frame) => {
                    if shared.write_raw(&[ACK]).is_err() {
                        return;
                    }
                    let effects = handle_frame(shared, link, &frame);
                    shared.apply(effects);
                }
                Received::Corrupt => {
                    debug!("corrupt frame, sending NAK");
                    if shared.write_raw(&[NAK]).is_err() {
                        return;
                    }
                }
                Received::Ack => trace!("ack"),
                other @ (Received::Nak | Received::Can) => {
                    debug!(?other, "controller rejected frame");
                }
            }
        }
    }
}

fn handle_frame(shared: &Shared, link: LinkId, frame: &Frame) -> Effects {
    let mut effects = Effects::default();
    let mut state = shared.state.lock();
    if state.link != Some(link) {
        return effects;
    }
    let payload = frame.payload.as_slice();

    match (frame.kind, frame.function) {
        (FrameType::Response, func::GET_VERSION) => {
            state.version = func::version(payload);
            info!(version = ?state.version, "controller version");
        }
        (FrameType::Response, func::MEMORY_GET_ID) => {
            if let Some((home_id, node_id)) = func::memory_id(payload) {
                state.home_id = Some(home_id);
                state.own_node_id = Some(node_id);
                state.node_mut(node_id);
                info!(home_id = format_args!("0x{home_id:08x}"), node_id, "network identity");
            }
        }
        (FrameType::Response, func::GET_INIT_DATA) => {
            if let Some(data) = func::init_data(payload) {
                state.chip = data.chip;
                let idle = state.protocol_queue.is_empty();
                for id in data.node_ids {
                    state.node_mut(id);
                    state.protocol_queue.push_back(id);
                }
                if let (true, Some(&id)) = (idle, state.protocol_queue.front()) {
                    effects.requests.push((func::GET_NODE_PROTOCOL_INFO, vec![id]));
                }
            }
        }
        (FrameType::Response, func::GET_NODE_PROTOCOL_INFO) => {
            if let Some(id) = state.protocol_queue.pop_front() {
                if let Some(generic) = func::protocol_info(payload) {
                    state.node_mut(id).device_type = generic;
                }
                if Some(id) != state.own_node_id {
                    effects.requests.push((func::REQUEST_NODE_INFO, vec![id]));
                }
            }
            if let Some(&next) = state.protocol_queue.front() {
                effects.requests.push((func::GET_NODE_PROTOCOL_INFO, vec![next]));
            }
        }
        (FrameType::Request, func::APPLICATION_UPDATE) => {
            if let Some(update) = func::application_update(payload) {
                let node = state.node_mut(update.node_id);
                node.device_type = update.generic;
                node.command_classes = update.command_classes;
                debug!(node = update.node_id, "node info received");
            }
        }
        (FrameType::Request, func::APPLICATION_COMMAND_HANDLER) => {
            if let Some((source, command)) = func::application_command(payload) {
                match func::manufacturer_report(source, command) {
                    Some(report) => {
                        let node = state.node_mut(report.node_id);
                        node.manufacturer_id = report.manufacturer_id;
                        node.product_type_id = report.product_type_id;
                        node.product_id = report.product_id;
                        debug!(node = source, "manufacturer report");
                    }
                    None => debug!(node = source, command = ?command, "application command"),
                }
            }
        }
        (FrameType::Request, func::ADD_NODE_TO_NETWORK) => {
            if let Some(m) = func::membership(payload) {
                match (m.progress, m.info) {
                    (Progress::Node, Some(added)) => {
                        let node = state.node_mut(added.node_id);
                        node.device_type = added.generic;
                        node.command_classes = added.command_classes;
                        info!(node = added.node_id, "node added");
                        effects.events.push(ControllerEvent::NodeAdded {
                            node_id: added.node_id,
                        });
                    }
                    (Progress::ProtocolDone, _) => {
                        effects
                            .requests
                            .push((func::ADD_NODE_TO_NETWORK, vec![func::MODE_STOP]));
                    }
                    (Progress::Done | Progress::Failed, _) => {
                        finish_membership(&mut state, &mut effects, m.progress);
                    }
                    (Progress::Unknown(status), _) => debug!(status, "add node status"),
                    (progress, _) => debug!(?progress, "add node progress"),
                }
            }
        }
        (FrameType::Request, func::REMOVE_NODE_FROM_NETWORK) => {
            if let Some(m) = func::membership(payload) {
                match (m.progress, m.info) {
                    (Progress::Node, Some(removed)) => {
                        state.nodes.remove(&removed.node_id);
                        info!(node = removed.node_id, "node removed");
                        effects.events.push(ControllerEvent::NodeRemoved {
                            node_id: removed.node_id,
                        });
                    }
                    (Progress::Done | Progress::Failed, _) => {
                        effects
                            .requests
                            .push((func::REMOVE_NODE_FROM_NETWORK, vec![func::MODE_STOP]));
                        finish_membership(&mut state, &mut effects, m.progress);
                    }
                    (Progress::Unknown(status), _) => debug!(status, "remove node status"),
                    (progress, _) => debug!(?progress, "remove node progress"),
                }
            }
        }
        (kind, function) => {
            debug!(?kind, function = format_args!("0x{function:02x}"), "unhandled frame");
        }
    }
    effects
}

fn finish_membership(state: &mut State, effects: &mut Effects, progress: Progress) {
    if progress == Progress::Failed {
        warn!("add/remove node failed");
    }
    state.mode = Some(ControllerMode::Normal);
    effects.events.push(ControllerEvent::ModeChanged {
        mode: ControllerMode::Normal,
    });
}

// ── Controller ───────────────────────────────────────────────────────────

impl SerialController {
    fn set_mode(&self, mode: ControllerMode, function: u8, payload: &[u8]) -> Result<(), ControllerError> {
        self.shared.request(function, payload)?;
        self.shared.state.lock().mode = Some(mode);
        self.shared.publish(ControllerEvent::ModeChanged { mode });
        Ok(())
    }

    fn snapshot(&self) -> ConfigFile {
        let state = self.shared.state.lock();
        ConfigFile {
            home_id: state.home_id,
            own_node_id: state.own_node_id,
            version: state.version.clone(),
            chip: state.chip.clone(),
            nodes: state.nodes.values().map(NodeEntry::from).collect(),
        }
    }
}

impl Controller for SerialController {
    fn init(&self, link: LinkId, streams: LinkStreams) -> Result<(), ControllerError> {
        {
            let mut state = self.shared.state.lock();
            if state.disposed {
                return Err(ControllerError::NotInitialized);
            }
            state.link = Some(link);
            state.mode = Some(ControllerMode::Normal);
            state.protocol_queue.clear();
        }
        *self.shared.writer.lock() = Some(streams.writer);

        let shared = Arc::clone(&self.shared);
        let reader = streams.reader;
        let spawned = thread::Builder::new()
            .name(format!("zwave-reader-{}", link.0))
            .spawn(move || reader_main(&shared, link, reader));
        if let Err(e) = spawned {
            self.detach();
            return Err(ControllerError::Spawn(e));
        }
        info!(%link, "controller initialized");

        let queried = self
            .shared
            .request(func::GET_VERSION, &[])
            .and_then(|()| self.shared.request(func::MEMORY_GET_ID, &[]))
            .and_then(|()| self.shared.request(func::GET_INIT_DATA, &[]));
        if let Err(e) = queried {
            self.detach();
            return Err(e);
        }
        Ok(())
    }

    fn detach(&self) {
        let link = {
            let mut state = self.shared.state.lock();
            state.mode = None;
            state.protocol_queue.clear();
            state.link.take()
        };
        self.shared.writer.lock().take();
        if let Some(link) = link {
            debug!(%link, "controller detached");
        }
    }

    fn nodes(&self) -> Vec<Node> {
        self.shared.state.lock().nodes.values().cloned().collect()
    }

    fn node(&self, id: u8) -> Option<Node> {
        self.shared.state.lock().nodes.get(&id).cloned()
    }

    fn own_node_id(&self) -> Option<u8> {
        self.shared.state.lock().own_node_id
    }

    fn home_id(&self) -> Option<u32> {
        self.shared.state.lock().home_id
    }

    fn controller_version(&self) -> Option<String> {
        self.shared.state.lock().version.clone()
    }

    fn chip_version(&self) -> Option<String> {
        self.shared.state.lock().chip.clone()
    }

    fn mode(&self) -> ControllerMode {
        let state = self.shared.state.lock();
        match (state.link, state.mode) {
            (Some(_), Some(mode)) => mode,
            _ => ControllerMode::NotConnected,
        }
    }

    fn set_inclusion_mode(&self) -> Result<(), ControllerError> {
        let callback = self.shared.next_callback_id();
        self.set_mode(
            ControllerMode::Inclusion,
            func::ADD_NODE_TO_NETWORK,
            &[func::MODE_ANY, callback],
        )
    }

    fn set_exclusion_mode(&self) -> Result<(), ControllerError> {
        let callback = self.shared.next_callback_id();
        self.set_mode(
            ControllerMode::Exclusion,
            func::REMOVE_NODE_FROM_NETWORK,
            &[func::MODE_ANY, callback],
        )
    }

    fn set_normal_mode(&self) -> Result<(), ControllerError> {
        match self.mode() {
            ControllerMode::Inclusion => self.set_mode(
                ControllerMode::Normal,
                func::ADD_NODE_TO_NETWORK,
                &[func::MODE_STOP],
            ),
            ControllerMode::Exclusion => self.set_mode(
                ControllerMode::Normal,
                func::REMOVE_NODE_FROM_NETWORK,
                &[func::MODE_STOP],
            ),
            ControllerMode::Normal => Ok(()),
            ControllerMode::NotConnected => Err(ControllerError::NotInitialized),
        }
    }

    fn reset(&self) -> Result<(), ControllerError> {
        let callback = self.shared.next_callback_id();
        self.shared.request(func::SET_DEFAULT, &[callback])?;
        {
            let mut state = self.shared.state.lock();
            state.nodes.clear();
            state.home_id = None;
            state.own_node_id = None;
            state.protocol_queue.clear();
            state.mode = Some(ControllerMode::Normal);
        }
        info!("controller reset to factory defaults");
        self.shared.request(func::MEMORY_GET_ID, &[])?;
        self.shared.request(func::GET_INIT_DATA, &[])
    }

    fn save_configuration(&self, path: &Path) -> Result<(), ControllerError> {
        self.snapshot().save(path)?;
        info!(path = %path.display(), "configuration saved");
        Ok(())
    }

    fn load_configuration(&self, path: &Path) -> Result<(), ControllerError> {
        let file = ConfigFile::load(path)?;
        let mut state = self.shared.state.lock();
        state.home_id = state.home_id.or(file.home_id);
        state.own_node_id = state.own_node_id.or(file.own_node_id);
        state.version = state.version.take().or_else(|| file.version.clone());
        state.chip = state.chip.take().or_else(|| file.chip.clone());
        state.nodes = file.nodes().map(|n| (n.id, n)).collect();
        info!(path = %path.display(), nodes = state.nodes.len(), "configuration loaded");
        Ok(())
    }

    fn transmit(&self, node_id: u8, command: NodeCommand) -> Result<(), ControllerError> {
        if !self.shared.state.lock().nodes.contains_key(&node_id) {
            return Err(ControllerError::UnknownNode(node_id));
        }
        let data = command.payload();
        let len = u8::try_from(data.len())
            .ok()
            .filter(|&len| usize::from(len) <= MAX_PAYLOAD)
            .ok_or(ControllerError::PayloadTooLarge(data.len()))?;
        let mut frame = Vec::with_capacity(data.len() + 4);
        frame.push(node_id);
        frame.push(len);
        frame.extend_from_slice(&data);
        frame.push(func::TX_OPTIONS);
        frame.push(self.shared.next_callback_id());
        debug!(node = node_id, command = command.name(), "send data");
        self.shared.request(func::SEND_DATA, &frame)
    }

    fn dispose(&self) {
        self.detach();
        self.shared.state.lock().disposed = true;
        self.shared.events.lock().take();
        debug!("controller disposed");
    }

    fn subscribe(&self, events: Sender<ControllerEvent>) {
        *self.shared.events.lock() = Some(events);
    }
}
