// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::packet::Packet;
use tracing::debug;

/// Serializes a packet snapshot onto the bus, advancing on falling clock
/// edges so the next symbol is settled before the host samples on the rise.
#[derive(Debug, Clone)]
pub struct TxCodec {
    shift: Packet,
    shifted: usize,
    loaded: bool,
    width: u8,
}

impl TxCodec {
    pub fn new(pkt_size: usize, width: u8) -> Self {
        Self {
            shift: Packet::new(pkt_size),
            shifted: 0,
            loaded: false,
            width,
        }
    }

    /// `load` is the tick `chip_select` asserts; `source` is copied then, so
    /// later changes to it do not reach the wire.
    pub fn tick(&mut self, selected: bool, load: bool, shift_edge: bool, source: &Packet) {
        if load {
            self.shift.copy_from(source);
            self.shifted = 0;
            self.loaded = true;
            debug!("tx: loaded snapshot, top byte {:#04x}", source.top_symbol(8));
            return;
        }

        if !selected {
            if self.loaded {
                self.shift.clear();
                self.shifted = 0;
                self.loaded = false;
            }
            return;
        }

        if shift_edge {
            self.shift.shift_out_top(self.width);
            self.shifted += 1;
        }
    }

    /// Symbol currently presented on the data lines.
    pub fn symbol(&self) -> u8 {
        self.shift.top_symbol(self.width)
    }

    pub fn shifted(&self) -> usize {
        self.shifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(bytes: &[u8]) -> Packet {
        let mut pkt = Packet::new(bytes.len());
        pkt.load(bytes);
        pkt
    }

    #[test]
    fn test_streams_msb_first() {
        let src = source(&[0x12, 0x34]);
        let mut tx = TxCodec::new(2, 4);
        tx.tick(true, true, false, &src);

        let mut seen = vec![tx.symbol()];
        for _ in 0..3 {
            tx.tick(true, false, true, &src);
            seen.push(tx.symbol());
        }
        assert_eq!(seen, vec![0x1, 0x2, 0x3, 0x4]);
        assert_eq!(tx.shifted(), 3);
    }

    #[test]
    fn test_snapshot_isolated_from_source() {
        let mut src = source(&[0xA5, 0x5A]);
        let mut tx = TxCodec::new(2, 8);
        tx.tick(true, true, false, &src);
        src.load(&[0xFF, 0xFF]);

        assert_eq!(tx.symbol(), 0xA5);
        tx.tick(true, false, true, &src);
        assert_eq!(tx.symbol(), 0x5A);
    }

    #[test]
    fn test_release_without_edges_clears_snapshot() {
        let src = source(&[0xF0, 0x00]);
        let mut tx = TxCodec::new(2, 4);
        tx.tick(true, true, false, &src);
        assert_eq!(tx.symbol(), 0xF);

        tx.tick(false, false, false, &src);
        assert_eq!(tx.symbol(), 0);
        assert_eq!(tx.shifted(), 0);
    }

    #[test]
    fn test_release_resets_counter() {
        let src = source(&[0xF0]);
        let mut tx = TxCodec::new(1, 4);
        tx.tick(true, true, false, &src);
        tx.tick(true, false, true, &src);
        tx.tick(false, false, false, &src);
        assert_eq!(tx.shifted(), 0);
        assert_eq!(tx.symbol(), 0);
    }
}
