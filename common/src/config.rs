//! # Configuration
//!
//! Runtime switches set from the command line ([`Config`]) and the JSON
//! configuration file read at startup ([`ServerConfig`]).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

pub struct Config {
    /// Print every received frame as a JSON line on standard output.
    pub json_frames: bool,

    /// 0 = normal, 1 = warnings and errors only.
    pub quiet: u8,
}

/// Contents of the configuration file.
///
/// ```json
/// { "extensions": { "qualisys": { "enabled": true, "connection": "tcp://qtm:22223" } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub extensions: BTreeMap<String, ExtensionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionEntry {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    /// Everything except `enabled`; handed to the extension as-is.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for ExtensionEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: Map::new(),
        }
    }
}

impl ExtensionEntry {
    /// Deserializes the settings into the extension's own config type.
    pub fn parse<T: DeserializeOwned>(&self, extension: &str) -> Result<T, ConfigError> {
        serde_json::from_value(Value::Object(self.settings.clone())).map_err(|source| {
            ConfigError::Extension {
                extension: extension.to_string(),
                source,
            }
        })
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text: String = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Names of the extensions that are switched on.
    pub fn enabled_extensions(&self) -> impl Iterator<Item = (&str, &ExtensionEntry)> {
        self.extensions
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, entry)| (name.as_str(), entry))
    }

    /// Overrides a single setting of an extension, creating the entry if needed.
    pub fn set_extension_setting(&mut self, extension: &str, key: &str, value: Value) {
        self.extensions
            .entry(extension.to_string())
            .or_default()
            .settings
            .insert(key.to_string(), value);
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
