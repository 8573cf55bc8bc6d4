// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::registry::{Device, Inbound, InboundFrame};

/// Inbound sink that keeps the last delivered payload, like an indicator
/// register driving a row of LEDs.
#[derive(Debug, Default, serde::Serialize)]
pub struct Latch {
    name: String,
    value: Vec<u8>,
    flags: u8,
    byte_count: u8,
    deliveries: u64,
}

impl Latch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// First payload byte, what an 8-bit indicator would show.
    pub fn level(&self) -> u8 {
        self.value.first().copied().unwrap_or(0)
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }
}

impl Device for Latch {
    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Inbound for Latch {
    fn consume(&mut self, frame: &InboundFrame<'_>) -> bool {
        self.value.clear();
        self.value.extend_from_slice(frame.payload());
        self.flags = frame.flags;
        self.byte_count = frame.byte_count;
        self.deliveries += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{encode_inbound, Packet};
    use crate::PeripheralId;

    #[test]
    fn test_latch_keeps_last_payload() {
        let dest = PeripheralId::new(2).unwrap();
        let mut pkt = Packet::new(16);
        pkt.load(&encode_inbound(16, dest, 0x3, &[0x5A, 0x01]).unwrap());

        let mut latch = Latch::new("led");
        let frame = InboundFrame {
            dest,
            packet: &pkt,
            byte_count: 2,
            flags: 0x3,
        };
        assert!(latch.consume(&frame));
        assert_eq!(latch.value(), &[0x5A, 0x01]);
        assert_eq!(latch.level(), 0x5A);
        assert_eq!(latch.flags(), 0x3);
        assert_eq!(latch.deliveries(), 1);

        let snap = latch.snapshot();
        assert_eq!(snap["deliveries"], 1);
        assert_eq!(snap["name"], "led");
    }
}
