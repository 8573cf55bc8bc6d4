// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Packet buffer and wire framing.
//!
//! Bytes are held most-significant first: `bytes[0]` is the top of the
//! packet, the byte the Tx codec emits first and the byte the Rx codec fills
//! last.
//!
//! Inbound frame, from the top: `[dest id:4][flags:4][byte count:8][payload]`.
//! Outbound event header: `[byte count:4][source id:4]`.

use crate::{LinkError, LinkResult, PeripheralId};

/// Status header: idle, the host may send.
pub const OK_TO_SEND: u8 = 0xF0;
/// Status header: busy, retry.
pub const NOT_READY: u8 = 0xFF;

/// Bytes at the top of an inbound frame that are not payload.
pub const INBOUND_OVERHEAD: usize = 2;

/// Fixed-size packet buffer, allocated once and rewritten in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: Box<[u8]>,
}

impl Packet {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Copies `src` from the top down; missing bytes are zeroed, excess ignored.
    pub fn load(&mut self, src: &[u8]) {
        let n = src.len().min(self.bytes.len());
        self.bytes[..n].copy_from_slice(&src[..n]);
        self.bytes[n..].fill(0);
    }

    pub fn copy_from(&mut self, other: &Packet) {
        self.load(other.as_bytes());
    }

    /// Symbol currently at the top of the packet.
    pub fn top_symbol(&self, width: u8) -> u8 {
        match self.bytes.first() {
            Some(&b) => ((b as u16) >> (8 - width as u16)) as u8,
            None => 0,
        }
    }

    /// Shifts the whole packet down by `width` bits and inserts `symbol` at
    /// the top. The lowest `width` bits fall off.
    pub fn shift_in_top(&mut self, symbol: u8, width: u8) {
        let w = width as u16;
        let mask = crate::signals::symbol_mask(width) as u16;
        for i in (0..self.bytes.len()).rev() {
            let carry = if i == 0 {
                (symbol as u16) & mask
            } else {
                self.bytes[i - 1] as u16
            };
            let combined = (carry << 8) | self.bytes[i] as u16;
            self.bytes[i] = (combined >> w) as u8;
        }
    }

    /// Removes and returns the top symbol, shifting the packet up and
    /// zero-filling the vacated low bits.
    pub fn shift_out_top(&mut self, width: u8) -> u8 {
        let top = self.top_symbol(width);
        let w = width as u32;
        let n = self.bytes.len();
        for i in 0..n {
            let next = if i + 1 < n { self.bytes[i + 1] } else { 0 };
            let combined = ((self.bytes[i] as u32) << 8) | next as u32;
            self.bytes[i] = ((combined << w) >> 8) as u8;
        }
        top
    }
}

/// Event header announcing `byte_count` bytes from `source`.
pub fn event_header(byte_count: u8, source: PeripheralId) -> u8 {
    ((byte_count & 0xF) << 4) | (source.raw() & 0xF)
}

/// Fields decoded from the top of an inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundHeader {
    /// Raw destination nibble; may name the reserved id.
    pub dest: u8,
    pub flags: u8,
    /// Payload length, clamped to what the packet can hold.
    pub byte_count: u8,
}

impl InboundHeader {
    pub fn parse(packet: &Packet) -> Self {
        let bytes = packet.as_bytes();
        let trailer = bytes.first().copied().unwrap_or(0);
        let len = bytes.get(1).copied().unwrap_or(0) as usize;
        let room = packet.len().saturating_sub(INBOUND_OVERHEAD);
        Self {
            dest: trailer >> 4,
            flags: trailer & 0xF,
            byte_count: len.min(room) as u8,
        }
    }
}

/// Builds a full inbound frame for `dest`, padding with zeros.
pub fn encode_inbound(
    pkt_size: usize,
    dest: PeripheralId,
    flags: u8,
    payload: &[u8],
) -> LinkResult<Vec<u8>> {
    let room = pkt_size.saturating_sub(INBOUND_OVERHEAD);
    if payload.len() > room {
        return Err(LinkError::PacketLength {
            expected: room,
            actual: payload.len(),
        });
    }
    let mut frame = vec![0u8; pkt_size];
    frame[0] = (dest.raw() << 4) | (flags & 0xF);
    frame[1] = payload.len() as u8;
    frame[INBOUND_OVERHEAD..INBOUND_OVERHEAD + payload.len()].copy_from_slice(payload);
    Ok(frame)
}

/// How a host should read the first byte of a read transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderView {
    OkToSend,
    NotReady,
    Event { source: u8, byte_count: u8 },
    Unknown(u8),
}

/// Classifies a header byte using the direction flag that accompanied it.
///
/// Status headers are only presented with the direction flag low and live
/// event headers only with it high, so `0xF0` is never mistaken for fifteen
/// bytes from id 0. The reserved id keeps `0xFF` out of the event space.
pub fn classify_header(byte: u8, direction: bool) -> HeaderView {
    if !direction {
        return match byte {
            OK_TO_SEND => HeaderView::OkToSend,
            NOT_READY => HeaderView::NotReady,
            other => HeaderView::Unknown(other),
        };
    }
    let source = byte & 0xF;
    if source == PeripheralId::RESERVED {
        return HeaderView::Unknown(byte);
    }
    HeaderView::Event {
        source,
        byte_count: byte >> 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u8) -> PeripheralId {
        PeripheralId::new(raw).unwrap()
    }

    #[test]
    fn test_shift_in_top_nibbles() {
        let mut pkt = Packet::new(2);
        for sym in [0x1, 0x2, 0x3, 0x4] {
            pkt.shift_in_top(sym, 4);
        }
        // Last symbol in sits at the top.
        assert_eq!(pkt.as_bytes(), &[0x43, 0x21]);
    }

    #[test]
    fn test_shift_in_top_full_byte_width() {
        let mut pkt = Packet::new(3);
        pkt.shift_in_top(0xAA, 8);
        pkt.shift_in_top(0xBB, 8);
        assert_eq!(pkt.as_bytes(), &[0xBB, 0xAA, 0x00]);
    }

    #[test]
    fn test_shift_out_top_single_bits() {
        let mut pkt = Packet::new(1);
        pkt.load(&[0b1010_0000]);
        let bits: Vec<u8> = (0..4).map(|_| pkt.shift_out_top(1)).collect();
        assert_eq!(bits, vec![1, 0, 1, 0]);
        assert_eq!(pkt.as_bytes(), &[0]);
    }

    #[test]
    fn test_shift_out_zero_fills() {
        let mut pkt = Packet::new(2);
        pkt.load(&[0xAB, 0xCD]);
        assert_eq!(pkt.shift_out_top(4), 0xA);
        assert_eq!(pkt.as_bytes(), &[0xBC, 0xD0]);
        assert_eq!(pkt.top_symbol(4), 0xB);
    }

    #[test]
    fn test_load_pads_and_truncates() {
        let mut pkt = Packet::new(4);
        pkt.load(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(pkt.as_bytes(), &[1, 2, 3, 4]);
        pkt.load(&[9]);
        assert_eq!(pkt.as_bytes(), &[9, 0, 0, 0]);
    }

    #[test]
    fn test_event_header_layout() {
        assert_eq!(event_header(16, id(1)), 0x01);
        assert_eq!(event_header(5, id(3)), 0x53);
        assert_eq!(event_header(15, id(14)), 0xFE);
    }

    #[test]
    fn test_no_live_header_collides_with_not_ready() {
        for raw in 0..=PeripheralId::MAX {
            for nb in 0..=16u8 {
                let header = event_header(nb, id(raw));
                assert_ne!(header, NOT_READY);
                assert!(matches!(
                    classify_header(header, true),
                    HeaderView::Event { source, .. } if source == raw
                ));
            }
        }
    }

    #[test]
    fn test_status_headers_need_direction_low() {
        assert_eq!(classify_header(OK_TO_SEND, false), HeaderView::OkToSend);
        assert_eq!(classify_header(NOT_READY, false), HeaderView::NotReady);
        // Same bit pattern presented during an event is a live header.
        assert_eq!(
            classify_header(OK_TO_SEND, true),
            HeaderView::Event {
                source: 0,
                byte_count: 15
            }
        );
        assert_eq!(classify_header(NOT_READY, true), HeaderView::Unknown(0xFF));
    }

    #[test]
    fn test_inbound_round_trip_through_header() {
        let frame = encode_inbound(16, id(4), 0x2, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(frame.len(), 16);
        assert_eq!(frame[0], 0x42);
        assert_eq!(frame[1], 5);
        assert_eq!(&frame[2..7], &[1, 2, 3, 4, 5]);

        let mut pkt = Packet::new(16);
        pkt.load(&frame);
        let header = InboundHeader::parse(&pkt);
        assert_eq!(header.dest, 4);
        assert_eq!(header.flags, 2);
        assert_eq!(header.byte_count, 5);
    }

    #[test]
    fn test_inbound_byte_count_clamped() {
        let mut pkt = Packet::new(8);
        pkt.load(&[0x10, 200]);
        assert_eq!(InboundHeader::parse(&pkt).byte_count, 6);
    }

    #[test]
    fn test_encode_inbound_rejects_oversized_payload() {
        let err = encode_inbound(4, id(0), 0, &[0; 3]).unwrap_err();
        assert_eq!(
            err,
            LinkError::PacketLength {
                expected: 2,
                actual: 3
            }
        );
    }
}
