//! Shared fakes for `zwave_console_core` integration tests.

#![allow(unreachable_pub, dead_code)]

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use zwave_console_core::{
    Controller, ControllerError, ControllerEvent, ControllerMode, Interpreter, LinkId, Node,
    NodeCommand, Session,
};
use zwave_console_serial_link::{
    LinkError, LinkStreams, PortProvider, SerialLink, SerialSettings,
};
use zwave_console_spec_tables::{
    CommandClassEntry, CommandClassSpecification, CommandEntry, ParamSlot, ParamWidth,
};

// ── Ports ────────────────────────────────────────────────────────────────

/// Port provider over a fixed set of names.
#[derive(Default)]
pub struct FakePorts {
    pub present: Vec<String>,
    /// Ports owned by another process.
    pub busy: HashSet<String>,
    /// Ports whose line settings cannot be applied.
    pub broken: HashSet<String>,
    /// Open flag of every link handed out, in order.
    pub opened: Mutex<Vec<(String, Arc<AtomicBool>)>>,
}

impl FakePorts {
    pub fn with(names: &[&str]) -> Self {
        Self {
            present: names.iter().map(|n| (*n).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn busy(mut self, name: &str) -> Self {
        self.busy.insert(name.to_string());
        self
    }

    pub fn broken(mut self, name: &str) -> Self {
        self.broken.insert(name.to_string());
        self
    }

    /// Whether the most recent link opened on `name` is still open.
    pub fn is_open(&self, name: &str) -> bool {
        self.opened
            .lock()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .is_some_and(|(_, open)| open.load(Ordering::SeqCst))
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }
}

impl PortProvider for FakePorts {
    fn list_ports(&self) -> Vec<String> {
        self.present.clone()
    }

    fn open(&self, name: &str, _timeout: Duration) -> Result<Box<dyn SerialLink>, LinkError> {
        if !self.present.iter().any(|p| p == name) {
            return Err(LinkError::PortNotFound {
                port: name.to_string(),
            });
        }
        if self.busy.contains(name) {
            return Err(LinkError::PortBusy {
                port: name.to_string(),
            });
        }
        let open = Arc::new(AtomicBool::new(true));
        self.opened
            .lock()
            .push((name.to_string(), Arc::clone(&open)));
        Ok(Box::new(FakeLink {
            name: name.to_string(),
            open,
            broken: self.broken.contains(name),
        }))
    }
}

struct FakeLink {
    name: String,
    open: Arc<AtomicBool>,
    broken: bool,
}

impl SerialLink for FakeLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, _settings: &SerialSettings) -> Result<(), LinkError> {
        if self.broken {
            return Err(LinkError::ConfigureFailed {
                port: self.name.clone(),
                reason: "unsupported baud rate".into(),
            });
        }
        Ok(())
    }

    fn set_receive_timeout(&mut self, _timeout: Duration) -> Result<(), LinkError> {
        Ok(())
    }

    fn split(&mut self) -> Result<LinkStreams, LinkError> {
        Ok(LinkStreams {
            reader: Box::new(io::empty()),
            writer: Box::new(io::sink()),
        })
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

// ── Controller ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeState {
    pub link: Option<LinkId>,
    pub nodes: Vec<Node>,
    pub own_id: Option<u8>,
    pub mode_calls: Vec<ControllerMode>,
    pub transmitted: Vec<(u8, NodeCommand)>,
    pub resets: usize,
    pub detached: usize,
    pub disposed: bool,
    pub events: Option<Sender<ControllerEvent>>,
}

/// In-memory controller recording every call.
#[derive(Default)]
pub struct FakeController {
    pub state: Mutex<FakeState>,
}

impl FakeController {
    /// A controller that owns node 1 and knows `peers`.
    pub fn with_nodes(peers: &[u8]) -> Self {
        let ctl = Self::default();
        {
            let mut state = ctl.state.lock();
            state.own_id = Some(1);
            state.nodes.push(Node::new(1));
            for &id in peers {
                state.nodes.push(Node {
                    id,
                    device_type: 0x10,
                    manufacturer_id: 0x010f,
                    product_type_id: 0x0600,
                    product_id: 0x1000,
                    command_classes: vec![0x20, 0x25, 0x72],
                });
            }
        }
        ctl
    }

    pub fn transmitted(&self) -> Vec<(u8, NodeCommand)> {
        self.state.lock().transmitted.clone()
    }

    pub fn bound_link(&self) -> Option<LinkId> {
        self.state.lock().link
    }

    /// Publish an event the way a reader thread would.
    pub fn emit(&self, event: ControllerEvent) {
        let sender = self.state.lock().events.clone();
        if let Some(sender) = sender {
            sender.send(event).unwrap();
        }
    }
}

impl Controller for FakeController {
    fn init(&self, link: LinkId, _streams: LinkStreams) -> Result<(), ControllerError> {
        self.state.lock().link = Some(link);
        Ok(())
    }

    fn detach(&self) {
        let mut state = self.state.lock();
        state.link = None;
        state.detached += 1;
    }

    fn nodes(&self) -> Vec<Node> {
        self.state.lock().nodes.clone()
    }

    fn node(&self, id: u8) -> Option<Node> {
        self.state.lock().nodes.iter().find(|n| n.id == id).cloned()
    }

    fn own_node_id(&self) -> Option<u8> {
        self.state.lock().own_id
    }

    fn home_id(&self) -> Option<u32> {
        Some(0xc0ff_ee01)
    }

    fn controller_version(&self) -> Option<String> {
        Some("Z-Wave 4.05".into())
    }

    fn chip_version(&self) -> Option<String> {
        None
    }

    fn mode(&self) -> ControllerMode {
        let state = self.state.lock();
        match (state.link, state.mode_calls.last()) {
            (None, _) => ControllerMode::NotConnected,
            (Some(_), Some(mode)) => *mode,
            (Some(_), None) => ControllerMode::Normal,
        }
    }

    fn set_inclusion_mode(&self) -> Result<(), ControllerError> {
        self.state.lock().mode_calls.push(ControllerMode::Inclusion);
        Ok(())
    }

    fn set_exclusion_mode(&self) -> Result<(), ControllerError> {
        self.state.lock().mode_calls.push(ControllerMode::Exclusion);
        Ok(())
    }

    fn set_normal_mode(&self) -> Result<(), ControllerError> {
        self.state.lock().mode_calls.push(ControllerMode::Normal);
        Ok(())
    }

    fn reset(&self) -> Result<(), ControllerError> {
        let mut state = self.state.lock();
        state.resets += 1;
        let own = state.own_id;
        state.nodes.retain(|n| Some(n.id) == own);
        Ok(())
    }

    /// One node id per line.
    fn save_configuration(&self, path: &Path) -> Result<(), ControllerError> {
        let ids: Vec<String> = self
            .nodes()
            .iter()
            .map(|n| n.id.to_string())
            .collect();
        std::fs::write(path, ids.join("\n")).map_err(|e| ControllerError::SaveFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn load_configuration(&self, path: &Path) -> Result<(), ControllerError> {
        let failed = |reason: String| ControllerError::LoadFailed {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
        let mut nodes = Vec::new();
        for line in text.lines() {
            let id = line.trim().parse().map_err(|_| failed(format!("bad node id '{line}'")))?;
            nodes.push(Node::new(id));
        }
        self.state.lock().nodes = nodes;
        Ok(())
    }

    fn transmit(&self, node_id: u8, command: NodeCommand) -> Result<(), ControllerError> {
        let mut state = self.state.lock();
        if state.link.is_none() {
            return Err(ControllerError::NotInitialized);
        }
        state.transmitted.push((node_id, command));
        Ok(())
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        state.disposed = true;
        state.events = None;
    }

    fn subscribe(&self, events: Sender<ControllerEvent>) {
        self.state.lock().events = Some(events);
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

/// Bundled tables plus a two-parameter test command (class 0x20 v2, 0x01).
pub fn spec() -> CommandClassSpecification {
    let mut base = CommandClassSpecification::bundled().unwrap();
    let mut classes = std::mem::take(&mut base.command_classes);
    classes.push(CommandClassEntry {
        key: 0x20,
        name: "COMMAND_CLASS_BASIC".into(),
        version: 2,
        commands: vec![CommandEntry {
            key: 0x01,
            name: "BASIC_SET".into(),
            params: vec![
                ParamSlot {
                    name: "value".into(),
                    width: ParamWidth::Byte,
                },
                ParamSlot {
                    name: "duration".into(),
                    width: ParamWidth::Byte,
                },
            ],
        }],
    });
    CommandClassSpecification::new(base.schema_version, base.device_types, classes)
}

pub struct Harness {
    pub controller: Arc<FakeController>,
    pub ports: Arc<FakePorts>,
    pub session: Session,
}

impl Harness {
    pub fn new(controller: FakeController, ports: FakePorts) -> Self {
        Self::with_config(controller, ports, PathBuf::from("cnf/nodes.xml"))
    }

    pub fn with_config(controller: FakeController, ports: FakePorts, config: PathBuf) -> Self {
        let controller = Arc::new(controller);
        let ports = Arc::new(ports);
        let session = Session::new(
            Arc::clone(&controller) as Arc<dyn Controller>,
            Arc::new(spec()),
            Arc::clone(&ports) as Arc<dyn PortProvider>,
            config,
        );
        Self {
            controller,
            ports,
            session,
        }
    }

    /// Execute `lines` in order and return everything printed.
    pub fn run(&self, lines: &[&str]) -> String {
        let mut interpreter = Interpreter::new(&self.session, Vec::new());
        for line in lines {
            interpreter.execute(line);
        }
        String::from_utf8(interpreter.into_output()).unwrap()
    }
}
