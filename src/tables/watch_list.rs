//! Watched global variables and critical registers.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! [addresses]
//! "2001ec00" = "ADDRESS_Glb_LogCounter"
//! "0x40240a5c" = "REGISTER_Waypoint"
//!
//! [registers]
//! r13 = "SP"
//! MSP = "MainStack"
//! ```

use crate::parser::parse_hex;
use crate::utils::error::LoadError;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// On-disk watch list layout
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WatchListFile {
    /// Hex address -> label
    #[serde(default)]
    pub addresses: BTreeMap<String, String>,

    /// Register name or alias -> label
    #[serde(default)]
    pub registers: BTreeMap<String, String>,
}

/// Read-only watch dictionary
#[derive(Debug, Clone, Default)]
pub struct WatchList {
    addresses: HashMap<u64, String>,
    registers: HashMap<String, String>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: u64, label: impl Into<String>) -> Self {
        self.addresses.insert(address, label.into());
        self
    }

    pub fn with_register(mut self, register: &str, label: impl Into<String>) -> Self {
        self.registers
            .insert(register.to_ascii_lowercase(), label.into());
        self
    }

    /// Label for a memory address
    pub fn address_label(&self, address: u64) -> Option<&str> {
        self.addresses.get(&address).map(String::as_str)
    }

    /// Label for a register name (case-insensitive)
    pub fn register_label(&self, register: &str) -> Option<&str> {
        self.registers
            .get(&register.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.addresses.len() + self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.registers.is_empty()
    }
}

impl TryFrom<WatchListFile> for WatchList {
    type Error = LoadError;

    fn try_from(file: WatchListFile) -> Result<Self, Self::Error> {
        let mut list = WatchList::new();

        for (key, label) in file.addresses {
            let address = parse_hex("address", key.trim()).map_err(|e| {
                LoadError::InvalidWatchEntry {
                    key: key.clone(),
                    reason: e.to_string(),
                }
            })?;
            if let Some(existing) = list.address_label(address.value) {
                return Err(LoadError::InvalidWatchEntry {
                    reason: format!("address {:08x} is already watched as {}", address.value, existing),
                    key,
                });
            }
            list = list.with_address(address.value, label);
        }

        for (register, label) in file.registers {
            if register.trim().is_empty() {
                return Err(LoadError::InvalidWatchEntry {
                    key: register,
                    reason: "empty register name".to_string(),
                });
            }
            if let Some(existing) = list.register_label(register.trim()) {
                return Err(LoadError::InvalidWatchEntry {
                    reason: format!("register is already watched as {}", existing),
                    key: register,
                });
            }
            list = list.with_register(register.trim(), label);
        }

        Ok(list)
    }
}

/// Load a watch list from a TOML file
///
/// **Public** - main entry point for watch list loading
///
/// # Errors
/// * `LoadError::IoError` - File cannot be read
/// * `LoadError::WatchListParseFailed` - TOML is invalid
/// * `LoadError::InvalidWatchEntry` - Address key is not hex, or an address or register is listed twice
pub fn load_watch_list(path: impl AsRef<Path>) -> Result<WatchList, LoadError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let list = parse_watch_list(&contents)?;
    info!(
        "Watch list loaded from {}: {} entries",
        path.display(),
        list.len()
    );
    Ok(list)
}

/// Parse watch list TOML text
pub fn parse_watch_list(contents: &str) -> Result<WatchList, LoadError> {
    let file: WatchListFile = toml::from_str(contents)?;
    WatchList::try_from(file)
}
