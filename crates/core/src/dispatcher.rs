// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::codec::RxCodec;
use crate::packet::{event_header, InboundHeader, Packet, NOT_READY, OK_TO_SEND};
use crate::registry::{InboundFrame, Registry};
use crate::signals::Edge;
use crate::{DropReason, LinkObserver, PeripheralId};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Arbitration states. A host write walks `OkToSend` through `WaitForTxn`;
/// a peripheral event walks `SendEvent` through `Sending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Start,
    Idle,
    /// Host is probing ahead of a write.
    OkToSend,
    /// Output-enable dropped; waiting for the write to begin.
    WaitHostData,
    Receiving,
    ReceiveHandshake,
    /// Draining the host's follow-up probe.
    WaitForTxn,
    /// Direction flag raised; waiting for the host's dummy read.
    SendEvent,
    SendingEvent,
    PeriphEvent,
    SendData,
    Sending,
}

/// The link-layer state machine. Owns the packet buffer, the status header,
/// the direction flag and the output-enable gate; nothing else writes them.
#[derive(Debug)]
pub struct Dispatcher {
    state: LinkState,
    pkt: Packet,
    header_frame: Packet,
    direction: bool,
    output_enable: bool,
    selected: Option<PeripheralId>,
    byte_count: u8,
    flags: u8,
    rx_valid: bool,
}

impl Dispatcher {
    pub fn new(pkt_size: usize) -> Self {
        Self {
            state: LinkState::Start,
            pkt: Packet::new(pkt_size),
            header_frame: Packet::new(pkt_size),
            direction: false,
            output_enable: true,
            selected: None,
            byte_count: 0,
            flags: 0,
            rx_valid: false,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn header(&self) -> u8 {
        self.header_frame.as_bytes().first().copied().unwrap_or(0)
    }

    pub fn direction(&self) -> bool {
        self.direction
    }

    pub fn output_enable(&self) -> bool {
        self.output_enable
    }

    pub fn selected(&self) -> Option<PeripheralId> {
        self.selected
    }

    pub fn byte_count(&self) -> u8 {
        self.byte_count
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn rx_valid(&self) -> bool {
        self.rx_valid
    }

    /// The active packet fanned out to peripherals.
    pub fn packet(&self) -> &Packet {
        &self.pkt
    }

    /// What the Tx codec snapshots when `chip_select` next asserts: the
    /// peripheral's packet for the real read, the header frame otherwise.
    pub fn tx_source(&self) -> &Packet {
        match self.state {
            LinkState::SendData | LinkState::Sending => &self.pkt,
            _ => &self.header_frame,
        }
    }

    fn set_header(&mut self, header: u8) {
        if let Some(top) = self.header_frame.as_bytes_mut().first_mut() {
            *top = header;
        }
    }

    /// Evaluates one tick. `rx` and the registry are read as they stood at
    /// the end of the previous tick.
    pub fn step(
        &mut self,
        cs: Edge,
        rx: &RxCodec,
        registry: &mut Registry,
        observers: &[Arc<dyn LinkObserver>],
    ) {
        let next = match self.state {
            LinkState::Start => {
                self.header_frame.clear();
                self.set_header(OK_TO_SEND);
                LinkState::Idle
            }
            LinkState::Idle => self.idle(cs, registry),
            LinkState::OkToSend => match cs {
                Edge::Rising => {
                    self.output_enable = false;
                    LinkState::WaitHostData
                }
                _ => LinkState::OkToSend,
            },
            LinkState::WaitHostData => match cs {
                Edge::Falling => LinkState::Receiving,
                _ => LinkState::WaitHostData,
            },
            LinkState::Receiving => match cs {
                Edge::Rising => self.finish_receive(rx, registry, observers),
                _ => LinkState::Receiving,
            },
            LinkState::ReceiveHandshake => self.handshake(registry, observers),
            LinkState::WaitForTxn => match cs {
                Edge::Rising => {
                    self.set_header(OK_TO_SEND);
                    self.selected = None;
                    LinkState::Idle
                }
                _ => LinkState::WaitForTxn,
            },
            LinkState::SendEvent => match cs {
                Edge::Falling => LinkState::SendingEvent,
                _ => LinkState::SendEvent,
            },
            LinkState::SendingEvent => match cs {
                Edge::Rising => LinkState::PeriphEvent,
                _ => LinkState::SendingEvent,
            },
            LinkState::PeriphEvent => self.periph_event(registry, observers),
            LinkState::SendData => match cs {
                Edge::Falling => LinkState::Sending,
                _ => LinkState::SendData,
            },
            LinkState::Sending => match cs {
                Edge::Rising => {
                    self.set_header(OK_TO_SEND);
                    self.direction = false;
                    self.selected = None;
                    LinkState::Idle
                }
                _ => LinkState::Sending,
            },
        };

        if next != self.state {
            debug!("dispatcher: {:?} -> {:?}", self.state, next);
            for observer in observers {
                observer.on_transition(self.state, next);
            }
            self.state = next;
        }
    }

    fn idle(&mut self, cs: Edge, registry: &Registry) -> LinkState {
        // A host write beginning this tick always beats a pending event.
        if cs == Edge::Falling {
            return LinkState::OkToSend;
        }

        let Some((id, byte_count)) = registry.poll_outbound() else {
            return LinkState::Idle;
        };
        self.selected = Some(id);
        self.byte_count = byte_count;
        self.set_header(event_header(byte_count, id));
        self.direction = true;
        debug!(
            "dispatcher: event from peripheral {} ({} bytes), header {:#04x}",
            id,
            byte_count,
            self.header()
        );
        LinkState::SendEvent
    }

    fn finish_receive(
        &mut self,
        rx: &RxCodec,
        registry: &Registry,
        observers: &[Arc<dyn LinkObserver>],
    ) -> LinkState {
        self.output_enable = true;
        self.set_header(NOT_READY);

        if !rx.ready() {
            let reason = DropReason::Undersized {
                symbols: rx.symbol_count(),
            };
            warn!(
                "dispatcher: dropping write of {} symbols (expected {})",
                rx.symbol_count(),
                rx.symbols_per_packet()
            );
            notify_dropped(observers, reason);
            return LinkState::WaitForTxn;
        }

        self.pkt.copy_from(rx.packet());
        let header = InboundHeader::parse(&self.pkt);
        self.flags = header.flags;
        self.byte_count = header.byte_count;

        match registry.route_inbound(header.dest) {
            Some(id) => {
                self.selected = Some(id);
                self.rx_valid = true;
                debug!(
                    "dispatcher: packet for peripheral {} ({} bytes, flags {:#x})",
                    id, header.byte_count, header.flags
                );
                LinkState::ReceiveHandshake
            }
            None => {
                warn!(
                    "dispatcher: no inbound peripheral at id {}, dropping packet",
                    header.dest
                );
                notify_dropped(observers, DropReason::Unroutable { dest: header.dest });
                LinkState::WaitForTxn
            }
        }
    }

    // No timeout: a peripheral that never raises ready holds the bus here.
    fn handshake(
        &mut self,
        registry: &mut Registry,
        observers: &[Arc<dyn LinkObserver>],
    ) -> LinkState {
        let Some(id) = self.selected else {
            self.rx_valid = false;
            return LinkState::WaitForTxn;
        };
        let Some(periph) = registry.inbound_mut(id) else {
            self.rx_valid = false;
            return LinkState::WaitForTxn;
        };

        let frame = InboundFrame {
            dest: id,
            packet: &self.pkt,
            byte_count: self.byte_count,
            flags: self.flags,
        };
        if !periph.consume(&frame) {
            trace!("dispatcher: peripheral {} not ready", id);
            return LinkState::ReceiveHandshake;
        }

        self.rx_valid = false;
        for observer in observers {
            observer.on_delivered(id, self.byte_count);
        }
        LinkState::WaitForTxn
    }

    fn periph_event(
        &mut self,
        registry: &mut Registry,
        observers: &[Arc<dyn LinkObserver>],
    ) -> LinkState {
        let Some(id) = self.selected else {
            return LinkState::SendData;
        };
        if let Some(periph) = registry.outbound(id) {
            self.pkt.load(periph.produce().packet);
        }
        registry.ack_pulse(id);
        for observer in observers {
            observer.on_event_sent(id, self.byte_count);
        }
        LinkState::SendData
    }
}

fn notify_dropped(observers: &[Arc<dyn LinkObserver>], reason: DropReason) {
    for observer in observers {
        observer.on_dropped(reason);
    }
}
