//! The controller seam.
//!
//! The console never speaks the controller's wire protocol itself; it drives
//! an implementation of [`Controller`] and listens to the events it publishes.

use std::io;
use std::path::Path;

use crossbeam_channel::Sender;
use zwave_console_serial_link::LinkStreams;

use crate::model::{ControllerEvent, ControllerMode, LinkId, Node, NodeCommand};

/// Failures reported by a controller implementation.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// An operation needs a bound transport but none is bound.
    #[error("controller transport is not initialized")]
    NotInitialized,

    /// Writing a frame to the transport failed.
    #[error("write to controller failed: {0}")]
    Write(#[source] io::Error),

    /// The controller's reader thread could not be started.
    #[error("failed to start controller reader: {0}")]
    Spawn(#[source] io::Error),

    /// The target node is not known to the controller.
    #[error("there exists no node with id {0}")]
    UnknownNode(u8),

    /// The payload does not fit in a single frame.
    #[error("payload of {0} bytes is too large for one frame")]
    PayloadTooLarge(usize),

    /// Writing the configuration file failed.
    #[error("failed to save configuration to '{path}': {reason}")]
    SaveFailed {
        /// Target path.
        path: String,
        /// Description of the failure.
        reason: String,
    },

    /// Reading or decoding the configuration file failed.
    #[error("failed to load configuration from '{path}': {reason}")]
    LoadFailed {
        /// Source path.
        path: String,
        /// Description of the failure.
        reason: String,
    },
}

/// A Z-Wave controller as seen by the console.
///
/// Methods take `&self`: implementations are shared between the console
/// thread, the teardown thread, and their own reader threads.
pub trait Controller: Send + Sync {
    /// Bind the controller to an opened link's streams.
    fn init(&self, link: LinkId, streams: LinkStreams) -> Result<(), ControllerError>;

    /// Drop the bound streams. Subsequent [`mode`](Self::mode) is
    /// [`ControllerMode::NotConnected`].
    fn detach(&self);

    /// Every known node, including the controller's own entry.
    fn nodes(&self) -> Vec<Node>;

    /// A single node by id.
    fn node(&self, id: u8) -> Option<Node>;

    /// The controller's own node id, once reported.
    fn own_node_id(&self) -> Option<u8>;

    /// Network home id, once reported.
    fn home_id(&self) -> Option<u32>;

    /// Controller firmware/library version string, once reported.
    fn controller_version(&self) -> Option<String>;

    /// Chip type and revision, once reported.
    fn chip_version(&self) -> Option<String>;

    /// Current operating mode.
    fn mode(&self) -> ControllerMode;

    /// Start admitting nodes.
    fn set_inclusion_mode(&self) -> Result<(), ControllerError>;

    /// Start removing nodes.
    fn set_exclusion_mode(&self) -> Result<(), ControllerError>;

    /// Stop inclusion/exclusion.
    fn set_normal_mode(&self) -> Result<(), ControllerError>;

    /// Factory-reset the controller.
    fn reset(&self) -> Result<(), ControllerError>;

    /// Persist node and controller configuration.
    fn save_configuration(&self, path: &Path) -> Result<(), ControllerError>;

    /// Replace node configuration from a file written by
    /// [`save_configuration`](Self::save_configuration).
    fn load_configuration(&self, path: &Path) -> Result<(), ControllerError>;

    /// Queue `command` for `node_id`. Returns once the frame is written; does
    /// not wait for the node to acknowledge.
    fn transmit(&self, node_id: u8, command: NodeCommand) -> Result<(), ControllerError>;

    /// Release every resource. The controller is unusable afterwards.
    fn dispose(&self);

    /// Register a receiver of [`ControllerEvent`]s.
    fn subscribe(&self, events: Sender<ControllerEvent>);
}
