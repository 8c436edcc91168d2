//! Node configuration files.
//!
//! The file records the controller identity and every known node:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <controller homeId="3237998081" nodeId="1" version="Z-Wave 4.05" chip="ZW0500">
//!   <node id="5" deviceType="16" manufacturerId="271" productTypeId="1536" productId="4096">
//!     <commandClass key="37"/>
//!   </node>
//! </controller>
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use zwave_console_core::{ControllerError, Node};

const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Root element of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "controller")]
pub(crate) struct ConfigFile {
    #[serde(rename = "@homeId", default, skip_serializing_if = "Option::is_none")]
    pub(crate) home_id: Option<u32>,
    #[serde(rename = "@nodeId", default, skip_serializing_if = "Option::is_none")]
    pub(crate) own_node_id: Option<u8>,
    #[serde(rename = "@version", default, skip_serializing_if = "Option::is_none")]
    pub(crate) version: Option<String>,
    #[serde(rename = "@chip", default, skip_serializing_if = "Option::is_none")]
    pub(crate) chip: Option<String>,
    #[serde(rename = "node", default)]
    pub(crate) nodes: Vec<NodeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct NodeEntry {
    #[serde(rename = "@id")]
    id: u8,
    #[serde(rename = "@deviceType", default)]
    device_type: u8,
    #[serde(rename = "@manufacturerId", default)]
    manufacturer_id: u16,
    #[serde(rename = "@productTypeId", default)]
    product_type_id: u16,
    #[serde(rename = "@productId", default)]
    product_id: u16,
    #[serde(rename = "commandClass", default)]
    command_classes: Vec<ClassRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct ClassRef {
    #[serde(rename = "@key")]
    key: u8,
}

impl From<&Node> for NodeEntry {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            device_type: node.device_type,
            manufacturer_id: node.manufacturer_id,
            product_type_id: node.product_type_id,
            product_id: node.product_id,
            command_classes: node
                .command_classes
                .iter()
                .map(|&key| ClassRef { key })
                .collect(),
        }
    }
}

impl From<NodeEntry> for Node {
    fn from(entry: NodeEntry) -> Self {
        Self {
            id: entry.id,
            device_type: entry.device_type,
            manufacturer_id: entry.manufacturer_id,
            product_type_id: entry.product_type_id,
            product_id: entry.product_id,
            command_classes: entry.command_classes.into_iter().map(|c| c.key).collect(),
        }
    }
}

impl ConfigFile {
    /// Write the file, creating missing parent directories.
    pub(crate) fn save(&self, path: &Path) -> Result<(), ControllerError> {
        let failed = |reason: String| ControllerError::SaveFailed {
            path: path.display().to_string(),
            reason,
        };
        let mut xml = String::from(DECLARATION);
        let mut ser = quick_xml::se::Serializer::new(&mut xml);
        ser.indent(' ', 2);
        self.serialize(ser).map_err(|e| failed(e.to_string()))?;
        xml.push('\n');

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| failed(e.to_string()))?;
        }
        std::fs::write(path, xml).map_err(|e| failed(e.to_string()))
    }

    /// Read and decode a file written by [`save`](Self::save).
    pub(crate) fn load(path: &Path) -> Result<Self, ControllerError> {
        let failed = |reason: String| ControllerError::LoadFailed {
            path: path.display().to_string(),
            reason,
        };
        let xml = std::fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
        quick_xml::de::from_str(&xml).map_err(|e| failed(e.to_string()))
    }

    pub(crate) fn nodes(self) -> impl Iterator<Item = Node> {
        self.nodes.into_iter().map(Node::from)
    }
}
