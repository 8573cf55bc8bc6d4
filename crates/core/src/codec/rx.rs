// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::packet::Packet;
use tracing::debug;

/// Deserializes symbols sampled on rising clock edges into a packet buffer.
#[derive(Debug, Clone)]
pub struct RxCodec {
    shift: Packet,
    count: usize,
    full: usize,
    width: u8,
}

impl RxCodec {
    pub fn new(pkt_size: usize, width: u8) -> Self {
        Self {
            shift: Packet::new(pkt_size),
            count: 0,
            full: pkt_size * 8 / width as usize,
            width,
        }
    }

    pub fn tick(&mut self, selected: bool, sample_edge: bool, symbol: u8) {
        if !selected {
            if self.count != 0 {
                self.shift.clear();
                self.count = 0;
            }
            return;
        }

        if sample_edge {
            self.shift.shift_in_top(symbol, self.width);
            self.count = self.count.saturating_add(1);
            if self.count == self.full {
                debug!("rx: packet complete after {} symbols", self.count);
            }
        }
    }

    /// True exactly while one full packet has been shifted in.
    pub fn ready(&self) -> bool {
        self.count == self.full
    }

    pub fn packet(&self) -> &Packet {
        &self.shift
    }

    pub fn symbol_count(&self) -> usize {
        self.count
    }

    pub fn symbols_per_packet(&self) -> usize {
        self.full
    }
}
