// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::{beacon, Beacon, Echo, Latch};
use crate::registry::{Capabilities, PeripheralHandle, SlotTable};
use crate::Link;
use anyhow::Context;
use qlink_config::{LinkManifest, SlotConfig};
use std::path::Path;

/// Instantiates every slot in the manifest and freezes them into a link.
/// Unknown peripheral types are skipped with a warning.
pub fn build_link(manifest: &LinkManifest) -> anyhow::Result<Link> {
    manifest.validate()?;
    let params = manifest.link;
    let mut table = SlotTable::with_capacity(params.num_periphs)?;

    for slot in &manifest.peripherals {
        let Some(handle) = make_handle(slot, params.pkt_size) else {
            continue;
        };

        let mut caps = Capabilities::empty();
        if slot.receive {
            caps |= Capabilities::RECEIVE;
        }
        if slot.send {
            caps |= Capabilities::SEND;
        }
        if !handle.supported().contains(caps) {
            tracing::warn!(
                "Peripheral {} ('{}') cannot serve {:?}; narrowed to {:?}",
                slot.id,
                slot.r#type,
                caps,
                caps & handle.supported()
            );
        }

        table
            .register(slot.id, handle, caps)
            .with_context(|| format!("Failed to register peripheral {}", slot.id))?;
    }

    let link = Link::new(params, table.freeze())?;
    tracing::info!(
        "Link '{}' ready: {} byte packets, {}-bit symbols",
        manifest.name,
        params.pkt_size,
        params.symbol_width
    );
    Ok(link)
}

pub fn build_link_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Link> {
    let manifest = LinkManifest::from_file(path)?;
    build_link(&manifest)
}

fn make_handle(slot: &SlotConfig, pkt_size: usize) -> Option<PeripheralHandle> {
    let name = slot
        .config_str("name")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}{}", slot.r#type, slot.id));

    let handle = match slot.r#type.as_str() {
        "latch" => PeripheralHandle::Inbound(Box::new(Latch::new(name))),
        "beacon" => {
            let message = slot
                .config_str("message")
                .map(str::as_bytes)
                .unwrap_or(beacon::DEFAULT_MESSAGE);
            let period = slot.config_u64("period").unwrap_or(0);
            PeripheralHandle::Outbound(Box::new(Beacon::new(name, pkt_size, message, period)))
        }
        "echo" => PeripheralHandle::Both(Box::new(Echo::new(name, pkt_size))),
        other => {
            tracing::warn!(
                "Unsupported peripheral type '{}' for id {}; skipping",
                other,
                slot.id
            );
            return None;
        }
    };
    Some(handle)
}
