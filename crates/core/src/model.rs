//! Shared data model: nodes, controller modes, bound commands, and the
//! events a controller publishes.

use std::io;
use std::sync::Arc;

use zwave_console_spec_tables::{CommandClassEntry, CommandEntry, ParamSlot};

/// Identity of one successful `connect`.
///
/// Every bind of the controller to a port gets a fresh id, so an error
/// reported by a reader belonging to an older link can be told apart from one
/// on the current link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// A peripheral device known to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    /// Network-local node id.
    pub id: u8,
    /// Generic device class key.
    pub device_type: u8,
    /// Manufacturer id from MANUFACTURER_SPECIFIC.
    pub manufacturer_id: u16,
    /// Product type id from MANUFACTURER_SPECIFIC.
    pub product_type_id: u16,
    /// Product id from MANUFACTURER_SPECIFIC.
    pub product_id: u16,
    /// Keys of the command classes the node reported.
    pub command_classes: Vec<u8>,
}

impl Node {
    /// A node with only its id known.
    pub fn new(id: u8) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Operating mode of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    /// No transport is bound.
    NotConnected,
    /// Normal operation.
    Normal,
    /// Admitting new nodes.
    Inclusion,
    /// Removing nodes.
    Exclusion,
}

impl std::fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerMode::NotConnected => write!(f, "not connected"),
            ControllerMode::Normal => write!(f, "normal"),
            ControllerMode::Inclusion => write!(f, "inclusion"),
            ControllerMode::Exclusion => write!(f, "exclusion"),
        }
    }
}

/// A command bound to concrete parameter values, ready to hand to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCommand {
    class_key: u8,
    class_version: u8,
    command_key: u8,
    name: String,
    slots: Vec<ParamSlot>,
    values: Vec<u32>,
}

impl NodeCommand {
    /// Start a binding for `command` of `class` with no values set.
    pub fn new(class: &CommandClassEntry, command: &CommandEntry) -> Self {
        Self {
            class_key: class.key,
            class_version: class.version,
            command_key: command.key,
            name: command.name.clone(),
            slots: command.params.clone(),
            values: Vec::with_capacity(command.params.len()),
        }
    }

    /// Command class key.
    pub fn class_key(&self) -> u8 {
        self.class_key
    }

    /// Command class version the descriptor came from.
    pub fn class_version(&self) -> u8 {
        self.class_version
    }

    /// Command key within the class.
    pub fn command_key(&self) -> u8 {
        self.command_key
    }

    /// Symbolic command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter slots.
    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    /// Bound values, in slot order.
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Replace the bound values. The binder validates them first.
    pub(crate) fn set_values(&mut self, values: Vec<u32>) {
        self.values = values;
    }

    /// Application payload: class key, command key, then each bound value in
    /// its slot width. Unbound trailing slots are omitted.
    pub fn payload(&self) -> Vec<u8> {
        let mut out = vec![self.class_key, self.command_key];
        for (slot, &value) in self.slots.iter().zip(&self.values) {
            slot.width.encode(value, &mut out);
        }
        out
    }
}

/// Events published asynchronously by a controller.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// The serial connection failed; the link is no longer usable.
    IoConnectionError {
        /// The link the failure belongs to.
        link: LinkId,
        /// Human-readable description.
        message: String,
        /// The underlying fault, if any.
        source: Option<Arc<io::Error>>,
    },
    /// A node joined the network.
    NodeAdded {
        /// The new node's id.
        node_id: u8,
    },
    /// A node left the network.
    NodeRemoved {
        /// The removed node's id.
        node_id: u8,
    },
    /// The controller changed operating mode.
    ModeChanged {
        /// The new mode.
        mode: ControllerMode,
    },
}
