// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Bit-level model of the host controller.
//!
//! The host only touches the raw pins: it never peeks at the dispatcher.
//! Every clock phase is held for `half_period` ticks, which must cover the
//! input conditioner's latency so each edge is seen before the next one.

use crate::packet::{classify_header, encode_inbound, HeaderView};
use crate::signals::symbol_mask;
use crate::{BusInputs, BusOutputs, DigitalLevel, Link, LinkResult, PeripheralId};
use tracing::{debug, trace};

/// An outbound event collected by the host: the header as classified and
/// the full packet that followed it.
pub type ServicedEvent = (HeaderView, Vec<u8>);

#[derive(Debug)]
pub struct Host {
    link: Link,
    pins: BusInputs,
    outputs: BusOutputs,
    half_period: u64,
    read_direction: bool,
    events: Vec<ServicedEvent>,
}

impl Host {
    pub fn new(link: Link) -> Self {
        let half_period = Self::min_half_period(&link);
        let outputs = link.outputs();
        Self {
            link,
            pins: BusInputs::default(),
            outputs,
            half_period,
            read_direction: false,
            events: Vec::new(),
        }
    }

    /// Slower clocking; values below the conditioner minimum are raised.
    pub fn with_half_period(mut self, half_period: u64) -> Self {
        self.half_period = half_period.max(Self::min_half_period(&self.link));
        self
    }

    fn min_half_period(link: &Link) -> u64 {
        link.params().sync_stages as u64 + 2
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn half_period(&self) -> u64 {
        self.half_period
    }

    /// Direction flag as sampled with the last symbol of the last read.
    pub fn read_direction(&self) -> bool {
        self.read_direction
    }

    /// Events collected while `send` was waiting for the bus.
    pub fn take_events(&mut self) -> Vec<ServicedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Holds the pins for `ticks` ticks.
    pub fn idle(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.outputs = self.link.tick(self.pins);
        }
    }

    fn select(&mut self) {
        self.pins.chip_select = DigitalLevel::Low;
        self.pins.clock = DigitalLevel::Low;
        self.idle(self.half_period);
    }

    fn deselect(&mut self) {
        self.pins.chip_select = DigitalLevel::High;
        self.pins.clock = DigitalLevel::Low;
        self.pins.data = 0;
        self.idle(self.half_period);
    }

    /// One read transaction of `n_bytes`, most-significant symbol first.
    pub fn read(&mut self, n_bytes: usize) -> Vec<u8> {
        let width = self.link.params().symbol_width;
        let per_byte = (8 / width) as usize;
        let mut bytes = vec![0u8; n_bytes];

        self.select();
        for i in 0..n_bytes * per_byte {
            self.pins.clock = DigitalLevel::High;
            self.idle(self.half_period);
            let symbol = self.outputs.data.unwrap_or(0) & symbol_mask(width);
            self.read_direction = self.outputs.direction;
            let byte = &mut bytes[i / per_byte];
            *byte = if width >= 8 {
                symbol
            } else {
                (*byte << width) | symbol
            };
            self.pins.clock = DigitalLevel::Low;
            self.idle(self.half_period);
        }
        self.deselect();

        trace!("host: read {:02x?}", bytes);
        bytes
    }

    /// Reads the status header. Use [`Host::read_direction`] or
    /// [`Host::probe_view`] to interpret it.
    pub fn probe(&mut self) -> u8 {
        self.read(1).first().copied().unwrap_or(0)
    }

    pub fn probe_view(&mut self) -> HeaderView {
        let header = self.probe();
        classify_header(header, self.read_direction)
    }

    /// Shifts out raw symbols in one transaction, first symbol first.
    pub fn write_symbols(&mut self, symbols: &[u8]) {
        self.select();
        for &symbol in symbols {
            self.pins.data = symbol;
            self.idle(self.half_period);
            self.pins.clock = DigitalLevel::High;
            self.idle(self.half_period);
            self.pins.clock = DigitalLevel::Low;
        }
        self.idle(self.half_period);
        self.deselect();
    }

    /// Writes a packet given most-significant byte first. The lowest symbol
    /// goes out first so the top byte is the last one to arrive.
    pub fn write_packet(&mut self, bytes: &[u8]) {
        let symbols = Self::packet_symbols(bytes, self.link.params().symbol_width);
        self.write_symbols(&symbols);
    }

    /// Writes only the first `symbols` symbols of `bytes`.
    pub fn write_truncated(&mut self, bytes: &[u8], symbols: usize) {
        let all = Self::packet_symbols(bytes, self.link.params().symbol_width);
        self.write_symbols(&all[..symbols.min(all.len())]);
    }

    fn packet_symbols(bytes: &[u8], width: u8) -> Vec<u8> {
        let mask = symbol_mask(width);
        let per_byte = 8 / width;
        bytes
            .iter()
            .rev()
            .flat_map(|&b| (0..per_byte).map(move |k| (((b as u16) >> (k * width)) as u8) & mask))
            .collect()
    }

    pub fn write_frame(&mut self, dest: PeripheralId, flags: u8, payload: &[u8]) -> LinkResult<()> {
        let frame = encode_inbound(self.link.params().pkt_size, dest, flags, payload)?;
        self.write_packet(&frame);
        Ok(())
    }

    /// Idles until the direction flag goes high.
    pub fn wait_interrupt(&mut self, max_ticks: u64) -> bool {
        for _ in 0..max_ticks {
            if self.outputs.direction {
                return true;
            }
            self.idle(1);
        }
        self.outputs.direction
    }

    /// Answers an interrupt: the dummy read fetches the header, the second
    /// read fetches the packet.
    pub fn service_event(&mut self) -> Option<ServicedEvent> {
        match self.probe_view() {
            view @ HeaderView::Event { .. } => {
                let data = self.read(self.link.params().pkt_size);
                debug!("host: serviced {:?}", view);
                Some((view, data))
            }
            HeaderView::OkToSend => {
                self.abandon_write();
                None
            }
            _ => None,
        }
    }

    /// Backs out of a probe that granted the bus: an empty transaction is
    /// dropped by the engine, the next probe returns it to idle.
    fn abandon_write(&mut self) {
        self.write_symbols(&[]);
        self.probe();
    }

    /// Full host write: probe until the bus is granted, write, then drain.
    /// Events that win the bus in the meantime are collected for
    /// [`Host::take_events`]. Returns false after `max_probes` failed probes.
    pub fn send(
        &mut self,
        dest: PeripheralId,
        flags: u8,
        payload: &[u8],
        max_probes: usize,
    ) -> LinkResult<bool> {
        for _ in 0..max_probes {
            match self.probe_view() {
                HeaderView::OkToSend => {
                    self.write_frame(dest, flags, payload)?;
                    self.probe();
                    return Ok(true);
                }
                view @ HeaderView::Event { .. } => {
                    let data = self.read(self.link.params().pkt_size);
                    debug!("host: write preempted by {:?}", view);
                    self.events.push((view, data));
                }
                HeaderView::NotReady | HeaderView::Unknown(_) => self.idle(self.half_period),
            }
        }
        Ok(false)
    }
}
