//! Serial API function ids and payload decoding.

// ── Function ids ─────────────────────────────────────────────────────────

pub(crate) const GET_INIT_DATA: u8 = 0x02;
pub(crate) const APPLICATION_COMMAND_HANDLER: u8 = 0x04;
pub(crate) const SEND_DATA: u8 = 0x13;
pub(crate) const GET_VERSION: u8 = 0x15;
pub(crate) const MEMORY_GET_ID: u8 = 0x20;
pub(crate) const GET_NODE_PROTOCOL_INFO: u8 = 0x41;
pub(crate) const SET_DEFAULT: u8 = 0x42;
pub(crate) const APPLICATION_UPDATE: u8 = 0x49;
pub(crate) const ADD_NODE_TO_NETWORK: u8 = 0x4A;
pub(crate) const REMOVE_NODE_FROM_NETWORK: u8 = 0x4B;
pub(crate) const REQUEST_NODE_INFO: u8 = 0x60;

// ── Options ──────────────────────────────────────────────────────────────

/// ACK | AUTO_ROUTE | EXPLORE.
pub(crate) const TX_OPTIONS: u8 = 0x25;
/// Add/remove any node type, at normal power.
pub(crate) const MODE_ANY: u8 = 0x81;
pub(crate) const MODE_STOP: u8 = 0x05;

const UPDATE_NODE_INFO_RECEIVED: u8 = 0x84;
/// Separates supported from controlled classes in node info frames.
const COMMAND_CLASS_MARK: u8 = 0xEF;
const NODE_BITMASK_LEN: usize = 29;

const MANUFACTURER_SPECIFIC: u8 = 0x72;
const MANUFACTURER_SPECIFIC_REPORT: u8 = 0x05;

/// Progress of an add/remove operation reported in callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    Ready,
    Found,
    /// A node is joining/leaving; the callback carries its id and info.
    Node,
    ProtocolDone,
    Done,
    Failed,
    Unknown(u8),
}

impl Progress {
    fn from_status(status: u8) -> Self {
        match status {
            0x01 => Progress::Ready,
            0x02 => Progress::Found,
            0x03 | 0x04 => Progress::Node,
            0x05 => Progress::ProtocolDone,
            0x06 => Progress::Done,
            0x07 => Progress::Failed,
            other => Progress::Unknown(other),
        }
    }
}

// ── Decoded payloads ─────────────────────────────────────────────────────

/// Device class and supported command classes from a node information frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeInfo {
    pub(crate) node_id: u8,
    pub(crate) generic: u8,
    pub(crate) command_classes: Vec<u8>,
}

impl NodeInfo {
    /// A node whose device class is not yet known.
    fn bare(node_id: u8) -> Self {
        Self {
            node_id,
            generic: 0,
            command_classes: Vec::new(),
        }
    }
}

/// `GetInitData` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InitData {
    pub(crate) node_ids: Vec<u8>,
    pub(crate) chip: Option<String>,
}

/// An add/remove callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Membership {
    pub(crate) progress: Progress,
    /// Present for [`Progress::Node`] with a non-zero source.
    pub(crate) info: Option<NodeInfo>,
}

/// `MANUFACTURER_SPECIFIC_REPORT` ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ManufacturerReport {
    pub(crate) node_id: u8,
    pub(crate) manufacturer_id: u16,
    pub(crate) product_type_id: u16,
    pub(crate) product_id: u16,
}

/// Library version string, up to the first NUL.
pub(crate) fn version(payload: &[u8]) -> Option<String> {
    let end = payload.iter().position(|&b| b == 0)?;
    let text = std::str::from_utf8(&payload[..end]).ok()?;
    Some(text.trim().to_string())
}

/// Home id and the controller's own node id.
pub(crate) fn memory_id(payload: &[u8]) -> Option<(u32, u8)> {
    let [a, b, c, d, node, ..] = *payload else {
        return None;
    };
    Some((u32::from_be_bytes([a, b, c, d]), node))
}

/// Node ids from the init-data bitmask, plus the chip type and revision.
pub(crate) fn init_data(payload: &[u8]) -> Option<InitData> {
    let [_version, _capabilities, len, rest @ ..] = payload else {
        return None;
    };
    let len = usize::from(*len);
    if len > NODE_BITMASK_LEN || rest.len() < len {
        return None;
    }
    let (mask, tail) = rest.split_at(len);
    let node_ids = mask
        .iter()
        .enumerate()
        .flat_map(|(i, byte)| {
            (0..8u8)
                .filter(move |&bit| byte & (1 << bit) != 0)
                .filter_map(move |bit| u8::try_from(i * 8 + usize::from(bit) + 1).ok())
        })
        .collect();
    let chip = match tail {
        [chip_type, chip_version, ..] => {
            Some(format!("ZW{chip_type:02x}{chip_version:02x}"))
        }
        _ => None,
    };
    Some(InitData { node_ids, chip })
}

/// Generic device class from a `GetNodeProtocolInfo` response.
pub(crate) fn protocol_info(payload: &[u8]) -> Option<u8> {
    // capability, security, reserved, basic, generic, specific
    payload.get(4).copied().filter(|&generic| generic != 0)
}

/// `basic generic specific cc..` as carried by node information frames.
fn node_info(node_id: u8, info: &[u8]) -> Option<NodeInfo> {
    let [_basic, generic, _specific, classes @ ..] = info else {
        return None;
    };
    let command_classes = classes
        .iter()
        .copied()
        .take_while(|&cc| cc != COMMAND_CLASS_MARK)
        .collect();
    Some(NodeInfo {
        node_id,
        generic: *generic,
        command_classes,
    })
}

/// Slice `len` bytes after a `node len` header, tolerating short frames.
fn sized(rest: &[u8], len: u8) -> &[u8] {
    &rest[..usize::from(len).min(rest.len())]
}

/// Node information from an `ApplicationUpdate` request.
pub(crate) fn application_update(payload: &[u8]) -> Option<NodeInfo> {
    let [status, node_id, len, rest @ ..] = payload else {
        return None;
    };
    if *status != UPDATE_NODE_INFO_RECEIVED {
        return None;
    }
    node_info(*node_id, sized(rest, *len))
}

/// Add/remove progress callback. The first byte is the callback id.
pub(crate) fn membership(payload: &[u8]) -> Option<Membership> {
    let [_callback, status, source, rest @ ..] = payload else {
        return None;
    };
    let progress = Progress::from_status(*status);
    let info = match (progress, rest) {
        (Progress::Node, _) if *source == 0 => None,
        (Progress::Node, [len, info @ ..]) => {
            node_info(*source, sized(info, *len)).or_else(|| Some(NodeInfo::bare(*source)))
        }
        (Progress::Node, []) => Some(NodeInfo::bare(*source)),
        _ => None,
    };
    Some(Membership { progress, info })
}

/// `(source node, command bytes)` from an `ApplicationCommandHandler` request.
pub(crate) fn application_command(payload: &[u8]) -> Option<(u8, &[u8])> {
    let [_rx_status, source, len, rest @ ..] = payload else {
        return None;
    };
    Some((*source, sized(rest, *len)))
}

/// Decode a `MANUFACTURER_SPECIFIC_REPORT` addressed from `node_id`.
pub(crate) fn manufacturer_report(node_id: u8, command: &[u8]) -> Option<ManufacturerReport> {
    let [
        MANUFACTURER_SPECIFIC,
        MANUFACTURER_SPECIFIC_REPORT,
        m1,
        m2,
        t1,
        t2,
        p1,
        p2,
        ..,
    ] = *command
    else {
        return None;
    };
    Some(ManufacturerReport {
        node_id,
        manufacturer_id: u16::from_be_bytes([m1, m2]),
        product_type_id: u16::from_be_bytes([t1, t2]),
        product_id: u16::from_be_bytes([p1, p2]),
    })
}
