// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::LinkState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time view of the engine, for tooling and test assertions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LinkSnapshot {
    pub state: LinkState,
    pub header: u8,
    pub direction: bool,
    pub output_enable: bool,
    pub selected: Option<u8>,
    pub byte_count: u8,
    pub flags: u8,
    pub rx_valid: bool,
    pub rx_symbols: usize,
    pub tx_symbols: usize,
    pub ticks: u64,
    /// Per-slot device state keyed by peripheral id.
    pub peripherals: BTreeMap<u8, serde_json::Value>,
}
