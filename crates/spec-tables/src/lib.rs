//! Z-Wave command class specification tables.
//!
//! Defines the data structures for command class metadata: command class
//! entries (keyed by class key and version), the commands they contain with
//! their parameter slots, and the generic device type names used when
//! describing nodes.  Tables are deserialized from JSON; a default table set
//! is embedded in the crate and available through
//! [`CommandClassSpecification::bundled`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Current format version for the specification JSON schema.
pub const TABLE_FORMAT_VERSION: &str = "0.1.0";

/// Default tables shipped with the crate.
const BUNDLED_JSON: &str = include_str!("../data/command_classes.json");

// ── Errors ───────────────────────────────────────────────────────────────

/// Failure to obtain a usable specification.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    /// The specification file could not be read.
    #[error("failed to read specification '{path}'")]
    Read {
        /// Path that was attempted.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The specification text is not valid JSON for this schema.
    #[error("failed to parse specification '{origin}'")]
    Parse {
        /// Where the text came from (a path, or `"<bundled>"`).
        origin: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The same (key, version) pair is declared twice.
    #[error("command class 0x{key:02x} version {version} is declared more than once")]
    DuplicateClass {
        /// Class key.
        key: u8,
        /// Class version.
        version: u8,
    },
}

// ── Identifiers ──────────────────────────────────────────────────────────

/// Reference to a command class or command, either by numeric key or by
/// symbolic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ident<'a> {
    /// Numeric key (e.g. `0x20`).
    Key(u8),
    /// Symbolic name (e.g. `COMMAND_CLASS_BASIC`), matched case-insensitively.
    Name(&'a str),
}

// ── Parameter slots ──────────────────────────────────────────────────────

/// Encoded width of a command parameter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamWidth {
    /// One byte.
    #[default]
    Byte,
    /// Two bytes, big-endian.
    Word,
    /// Four bytes, big-endian.
    Dword,
}

impl ParamWidth {
    /// Number of bytes this width occupies on the wire.
    pub fn size(self) -> usize {
        match self {
            ParamWidth::Byte => 1,
            ParamWidth::Word => 2,
            ParamWidth::Dword => 4,
        }
    }

    /// Largest value representable in this width.
    pub fn max_value(self) -> u32 {
        match self {
            ParamWidth::Byte => u8::MAX as u32,
            ParamWidth::Word => u16::MAX as u32,
            ParamWidth::Dword => u32::MAX,
        }
    }

    /// Append `value` to `out` in big-endian order, truncated to this width.
    pub fn encode(self, value: u32, out: &mut Vec<u8>) {
        let bytes = value.to_be_bytes();
        out.extend_from_slice(&bytes[4 - self.size()..]);
    }
}

/// A declared parameter of a command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParamSlot {
    /// Parameter name, as shown in help output.
    pub name: String,
    /// Encoded width.
    #[serde(default)]
    pub width: ParamWidth,
}

// ── Commands and classes ─────────────────────────────────────────────────

/// A single command within a command class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandEntry {
    /// Command key within its class.
    pub key: u8,
    /// Symbolic name (e.g. `BASIC_SET`).
    pub name: String,
    /// Ordered parameter slots.
    #[serde(default)]
    pub params: Vec<ParamSlot>,
}

/// A versioned command class and the commands it defines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandClassEntry {
    /// Class key (e.g. `0x20` for BASIC).
    pub key: u8,
    /// Symbolic name (e.g. `COMMAND_CLASS_BASIC`).
    pub name: String,
    /// Class version this entry describes.
    #[serde(default = "default_class_version")]
    pub version: u8,
    /// Commands defined by this version of the class.
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
}

fn default_class_version() -> u8 {
    1
}

impl CommandClassEntry {
    /// Look up a command in this class by key or by case-insensitive name.
    pub fn resolve_command(&self, ident: Ident<'_>) -> Option<&CommandEntry> {
        match ident {
            Ident::Key(key) => self.commands.iter().find(|c| c.key == key),
            Ident::Name(name) => self
                .commands
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name)),
        }
    }
}

/// Generic device type (e.g. `GENERIC_TYPE_SWITCH_BINARY`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTypeEntry {
    /// Generic device class key.
    pub key: u8,
    /// Symbolic name.
    pub name: String,
}

// ── Specification ────────────────────────────────────────────────────────

/// Top-level container for all command class tables.
///
/// Lookup maps are built lazily on first use and reused thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandClassSpecification {
    /// Version of the specification content (e.g. `"1.0.0"`).
    pub schema_version: String,
    /// Table format version for compatibility checks.
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// Known generic device types.
    #[serde(default)]
    pub device_types: Vec<DeviceTypeEntry>,
    /// All command class entries, one per (key, version).
    pub command_classes: Vec<CommandClassEntry>,

    /// Cached map from (key, version) → index into `command_classes`.
    #[serde(skip)]
    key_map: OnceLock<HashMap<(u8, u8), usize>>,
    /// Cached map from (lowercase name, version) → index into `command_classes`.
    #[serde(skip)]
    name_map: OnceLock<HashMap<(String, u8), usize>>,
}

fn default_format_version() -> String {
    TABLE_FORMAT_VERSION.to_string()
}

impl CommandClassSpecification {
    /// Create a specification from already-built entries.
    pub fn new(
        schema_version: String,
        device_types: Vec<DeviceTypeEntry>,
        command_classes: Vec<CommandClassEntry>,
    ) -> Self {
        Self {
            schema_version,
            format_version: default_format_version(),
            device_types,
            command_classes,
            key_map: OnceLock::new(),
            name_map: OnceLock::new(),
        }
    }

    /// Parse a specification from JSON text.
    ///
    /// `origin` names the source in error messages.
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self, SpecError> {
        let spec: Self = serde_json::from_str(json).map_err(|source| SpecError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        spec.check_duplicates()?;
        Ok(spec)
    }

    /// Read and parse a specification file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SpecError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json, &path.display().to_string())
    }

    /// The specification embedded in this crate.
    pub fn bundled() -> Result<Self, SpecError> {
        Self::from_json_str(BUNDLED_JSON, "<bundled>")
    }

    fn check_duplicates(&self) -> Result<(), SpecError> {
        let mut seen = std::collections::HashSet::new();
        for cc in &self.command_classes {
            if !seen.insert((cc.key, cc.version)) {
                return Err(SpecError::DuplicateClass {
                    key: cc.key,
                    version: cc.version,
                });
            }
        }
        Ok(())
    }

    fn key_map(&self) -> &HashMap<(u8, u8), usize> {
        self.key_map.get_or_init(|| {
            self.command_classes
                .iter()
                .enumerate()
                .map(|(i, cc)| ((cc.key, cc.version), i))
                .collect()
        })
    }

    fn name_map(&self) -> &HashMap<(String, u8), usize> {
        self.name_map.get_or_init(|| {
            self.command_classes
                .iter()
                .enumerate()
                .map(|(i, cc)| ((cc.name.to_ascii_lowercase(), cc.version), i))
                .collect()
        })
    }

    /// Resolve a command class by key or name at an exact version.
    pub fn resolve_command_class(&self, ident: Ident<'_>, version: u8) -> Option<&CommandClassEntry> {
        let idx = match ident {
            Ident::Key(key) => self.key_map().get(&(key, version)),
            Ident::Name(name) => self.name_map().get(&(name.to_ascii_lowercase(), version)),
        };
        idx.map(|&i| &self.command_classes[i])
    }

    /// Name of a command class regardless of version, if any version is known.
    pub fn command_class_name(&self, key: u8) -> Option<&str> {
        self.command_classes
            .iter()
            .filter(|cc| cc.key == key)
            .min_by_key(|cc| cc.version)
            .map(|cc| cc.name.as_str())
    }

    /// Look up a generic device type by key.
    pub fn device_type(&self, key: u8) -> Option<&DeviceTypeEntry> {
        self.device_types.iter().find(|d| d.key == key)
    }
}
