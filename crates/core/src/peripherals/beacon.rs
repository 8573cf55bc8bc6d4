// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::registry::{Device, Outbound, Outgoing};

/// Sixteen-byte greeting used when no message is configured.
pub const DEFAULT_MESSAGE: &[u8] = b"  Hello World!  ";

/// Outbound source that offers a fixed message every `period` ticks.
#[derive(Debug, serde::Serialize)]
pub struct Beacon {
    name: String,
    packet: Vec<u8>,
    byte_count: u8,
    period: u64,
    counter: u64,
    valid: bool,
    acks: u64,
}

impl Beacon {
    /// `period` of zero disables the timer; use [`Beacon::fire`] instead.
    pub fn new(name: impl Into<String>, pkt_size: usize, message: &[u8], period: u64) -> Self {
        let mut packet = vec![0u8; pkt_size];
        let n = message.len().min(pkt_size);
        packet[..n].copy_from_slice(&message[..n]);
        Self {
            name: name.into(),
            packet,
            byte_count: n as u8,
            period,
            counter: 0,
            valid: false,
            acks: 0,
        }
    }

    pub fn fire(&mut self) {
        self.valid = true;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn acks(&self) -> u64 {
        self.acks
    }
}

impl Device for Beacon {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self) {
        if self.period == 0 {
            return;
        }
        self.counter += 1;
        if self.counter >= self.period {
            self.counter = 0;
            self.valid = true;
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Outbound for Beacon {
    fn produce(&self) -> Outgoing<'_> {
        Outgoing {
            packet: &self.packet,
            byte_count: self.byte_count,
            valid: self.valid,
        }
    }

    fn ack(&mut self) {
        self.valid = false;
        self.acks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periodic_valid() {
        let mut beacon = Beacon::new("hello", 16, DEFAULT_MESSAGE, 3);
        beacon.tick();
        beacon.tick();
        assert!(!beacon.produce().valid);
        beacon.tick();
        let offer = beacon.produce();
        assert!(offer.valid);
        assert_eq!(offer.byte_count, 16);
        assert_eq!(offer.packet, DEFAULT_MESSAGE);

        beacon.ack();
        assert!(!beacon.is_valid());
        assert_eq!(beacon.acks(), 1);
    }

    #[test]
    fn test_manual_fire_and_short_message() {
        let mut beacon = Beacon::new("ping", 8, b"ping", 0);
        for _ in 0..100 {
            beacon.tick();
        }
        assert!(!beacon.is_valid());
        beacon.fire();
        let offer = beacon.produce();
        assert!(offer.valid);
        assert_eq!(offer.byte_count, 4);
        assert_eq!(offer.packet, b"ping\0\0\0\0");
    }
}
