// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::registry::{Device, Inbound, InboundFrame, Outbound, Outgoing};
use tracing::trace;

/// Duplex loopback: a delivered payload comes back as an outbound event.
///
/// Holds one packet at a time. A write that lands before the host has
/// collected the previous echo replaces it.
#[derive(Debug, serde::Serialize)]
pub struct Echo {
    name: String,
    pending: Vec<u8>,
    byte_count: u8,
    valid: bool,
    echoed: u64,
}

impl Echo {
    pub fn new(name: impl Into<String>, pkt_size: usize) -> Self {
        Self {
            name: name.into(),
            pending: vec![0u8; pkt_size],
            byte_count: 0,
            valid: false,
            echoed: 0,
        }
    }

    pub fn echoed(&self) -> u64 {
        self.echoed
    }
}

impl Device for Echo {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Inbound for Echo {
    fn consume(&mut self, frame: &InboundFrame<'_>) -> bool {
        if self.valid {
            trace!("{}: overwriting uncollected echo", self.name);
        }
        let payload = frame.payload();
        let n = payload.len().min(self.pending.len());
        self.pending[..n].copy_from_slice(&payload[..n]);
        self.pending[n..].fill(0);
        self.byte_count = n as u8;
        self.valid = true;
        trace!("{}: holding {} bytes for echo", self.name, n);
        true
    }
}

impl Outbound for Echo {
    fn produce(&self) -> Outgoing<'_> {
        Outgoing {
            packet: &self.pending,
            byte_count: self.byte_count,
            valid: self.valid,
        }
    }

    fn ack(&mut self) {
        self.valid = false;
        self.echoed += 1;
    }
}
