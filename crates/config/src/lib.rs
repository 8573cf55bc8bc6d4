// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Id nibble value that never names a peripheral.
pub const RESERVED_ID: u8 = 0xF;

/// Largest slot table a 4-bit id field can address once the reserved id is excluded.
pub const MAX_PERIPHERALS: u8 = 15;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_pkt_size() -> usize {
    16
}

fn default_symbol_width() -> u8 {
    4
}

fn default_num_periphs() -> u8 {
    MAX_PERIPHERALS
}

fn default_sync_stages() -> u8 {
    2
}

/// Engine parameters fixed at build time.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct LinkParams {
    /// Packet size in bytes.
    #[serde(default = "default_pkt_size")]
    pub pkt_size: usize,
    /// Bits transferred per clock edge.
    #[serde(default = "default_symbol_width")]
    pub symbol_width: u8,
    /// Capacity of the peripheral slot table.
    #[serde(default = "default_num_periphs")]
    pub num_periphs: u8,
    /// Depth of the control line synchronizer.
    #[serde(default = "default_sync_stages")]
    pub sync_stages: u8,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            pkt_size: default_pkt_size(),
            symbol_width: default_symbol_width(),
            num_periphs: default_num_periphs(),
            sync_stages: default_sync_stages(),
        }
    }
}

impl LinkParams {
    /// Number of symbols a full packet spans.
    pub fn symbols_per_packet(&self) -> usize {
        self.pkt_size * 8 / self.symbol_width as usize
    }

    pub fn validate(&self) -> Result<()> {
        // Trailer byte, length byte and at least one payload byte.
        if !(3..=255).contains(&self.pkt_size) {
            anyhow::bail!(
                "Parameter 'pkt_size' must be between 3 and 255 bytes, got {}",
                self.pkt_size
            );
        }
        if !matches!(self.symbol_width, 1 | 2 | 4 | 8) {
            anyhow::bail!(
                "Parameter 'symbol_width' must be 1, 2, 4 or 8 bits, got {}",
                self.symbol_width
            );
        }
        if self.num_periphs == 0 || self.num_periphs > MAX_PERIPHERALS {
            anyhow::bail!(
                "Parameter 'num_periphs' must be between 1 and {}, got {}",
                MAX_PERIPHERALS,
                self.num_periphs
            );
        }
        if self.sync_stages == 0 {
            anyhow::bail!("Parameter 'sync_stages' must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SlotConfig {
    pub id: u8,
    pub r#type: String, // "latch", "beacon", "echo"
    #[serde(default = "default_true")]
    pub receive: bool,
    #[serde(default)]
    pub send: bool,
    #[serde(default)]
    pub config: HashMap<String, serde_yaml::Value>,
}

impl SlotConfig {
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }

    pub fn config_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(|v| v.as_u64())
    }
}

/// Top-level link description: engine parameters plus the slot table.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LinkManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub link: LinkParams,
    #[serde(default)]
    pub peripherals: Vec<SlotConfig>,
}

impl LinkManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read link manifest {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid link manifest {:?}", path))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Link Manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        self.link.validate()?;

        for slot in &self.peripherals {
            if slot.id == RESERVED_ID {
                anyhow::bail!(
                    "Peripheral id {:#x} is reserved and cannot be assigned",
                    RESERVED_ID
                );
            }
            if slot.id >= self.link.num_periphs {
                anyhow::bail!(
                    "Peripheral id {} is outside the slot table (num_periphs = {})",
                    slot.id,
                    self.link.num_periphs
                );
            }
            if !slot.receive && !slot.send {
                tracing::warn!(
                    "Peripheral {} ('{}') is neither receive- nor send-capable",
                    slot.id,
                    slot.r#type
                );
            }
        }

        Ok(())
    }
}
