//! Session tuning loaded from an optional TOML file

use serde::{Deserialize, Serialize};
use std::path::Path;

use presslink_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const CONFIG_DIR: &str = "presslink";

/// Tunables for one session manager
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Depth of the driver event channel. A burst beyond this applies
    /// backpressure to the driver's emitting task, never to host commands.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { event_capacity: 64 }
    }
}

impl SessionConfig {
    /// Parse from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("invalid session config: {e}")))
    }

    /// Load from a file, falling back to defaults when the file is missing
    /// or malformed
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("no config file at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(config) => {
                    debug!("loaded session config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("failed to parse {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("failed to read {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Load from `<user config dir>/presslink/config.toml` if present
    pub fn load_default() -> Self {
        match dirs::config_dir() {
            Some(base) => Self::load(&base.join(CONFIG_DIR).join(CONFIG_FILENAME)),
            None => Self::default(),
        }
    }

    /// Channel depth with the unusable zero clamped away
    pub fn effective_capacity(&self) -> usize {
        if self.event_capacity == 0 {
            warn!("event_capacity 0 is not usable, clamping to 1");
            1
        } else {
            self.event_capacity
        }
    }
}
