// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::packet::{Packet, INBOUND_OVERHEAD};
use crate::{LinkError, LinkResult, PeripheralId};
use bitflags::bitflags;
use std::collections::BTreeMap;
use tracing::{debug, info};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u8 {
        /// Eligible for inbound dispatch.
        const RECEIVE = 0b01;
        /// Polled for outbound events.
        const SEND = 0b10;
    }
}

/// Behaviour shared by every peripheral regardless of direction.
pub trait Device: std::fmt::Debug + Send {
    fn name(&self) -> &str;
    /// Free-running update, called once per tick after the dispatcher.
    fn tick(&mut self) {}
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// A packet presented to an inbound peripheral with valid asserted.
#[derive(Debug, Clone, Copy)]
pub struct InboundFrame<'a> {
    pub dest: PeripheralId,
    pub packet: &'a Packet,
    pub byte_count: u8,
    pub flags: u8,
}

impl<'a> InboundFrame<'a> {
    /// The `byte_count` bytes below the trailer and length byte.
    pub fn payload(&self) -> &'a [u8] {
        let bytes = self.packet.as_bytes();
        let end = (INBOUND_OVERHEAD + self.byte_count as usize).min(bytes.len());
        &bytes[INBOUND_OVERHEAD.min(end)..end]
    }
}

pub trait Inbound: Device {
    /// Invoked only while valid is asserted for this peripheral. Returning
    /// `true` is `ready`: the frame is taken on this tick.
    fn consume(&mut self, frame: &InboundFrame<'_>) -> bool;
}

/// What an outbound peripheral currently offers.
#[derive(Debug, Clone, Copy)]
pub struct Outgoing<'a> {
    pub packet: &'a [u8],
    pub byte_count: u8,
    pub valid: bool,
}

pub trait Outbound: Device {
    fn produce(&self) -> Outgoing<'_>;
    /// One-tick acknowledge strobe; the offered packet has been copied.
    fn ack(&mut self);
}

/// A peripheral implementing both directions.
pub trait Duplex: Inbound + Outbound {
    fn as_inbound_mut(&mut self) -> &mut dyn Inbound;
    fn as_outbound(&self) -> &dyn Outbound;
    fn as_outbound_mut(&mut self) -> &mut dyn Outbound;
}

impl<T: Inbound + Outbound> Duplex for T {
    fn as_inbound_mut(&mut self) -> &mut dyn Inbound {
        self
    }

    fn as_outbound(&self) -> &dyn Outbound {
        self
    }

    fn as_outbound_mut(&mut self) -> &mut dyn Outbound {
        self
    }
}

#[derive(Debug)]
pub enum PeripheralHandle {
    Inbound(Box<dyn Inbound>),
    Outbound(Box<dyn Outbound>),
    Both(Box<dyn Duplex>),
}

impl PeripheralHandle {
    /// Capabilities the handle can actually serve.
    pub fn supported(&self) -> Capabilities {
        match self {
            Self::Inbound(_) => Capabilities::RECEIVE,
            Self::Outbound(_) => Capabilities::SEND,
            Self::Both(_) => Capabilities::RECEIVE | Capabilities::SEND,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Inbound(p) => p.name(),
            Self::Outbound(p) => p.name(),
            Self::Both(p) => p.name(),
        }
    }

    fn tick(&mut self) {
        match self {
            Self::Inbound(p) => p.tick(),
            Self::Outbound(p) => p.tick(),
            Self::Both(p) => p.tick(),
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        match self {
            Self::Inbound(p) => p.snapshot(),
            Self::Outbound(p) => p.snapshot(),
            Self::Both(p) => p.snapshot(),
        }
    }

    fn inbound_mut(&mut self) -> Option<&mut dyn Inbound> {
        match self {
            Self::Inbound(p) => Some(p.as_mut()),
            Self::Outbound(_) => None,
            Self::Both(p) => Some(p.as_inbound_mut()),
        }
    }

    fn outbound(&self) -> Option<&dyn Outbound> {
        match self {
            Self::Inbound(_) => None,
            Self::Outbound(p) => Some(p.as_ref()),
            Self::Both(p) => Some(p.as_outbound()),
        }
    }

    fn outbound_mut(&mut self) -> Option<&mut dyn Outbound> {
        match self {
            Self::Inbound(_) => None,
            Self::Outbound(p) => Some(p.as_mut()),
            Self::Both(p) => Some(p.as_outbound_mut()),
        }
    }
}

#[derive(Debug)]
pub struct Slot {
    pub handle: PeripheralHandle,
    pub caps: Capabilities,
}

/// Mutable slot table populated before the engine starts.
#[derive(Debug)]
pub struct SlotTable {
    slots: Vec<Option<Slot>>,
}

impl SlotTable {
    pub fn with_capacity(capacity: u8) -> LinkResult<Self> {
        if capacity > qlink_config::MAX_PERIPHERALS {
            return Err(LinkError::TooManyPeripherals(capacity));
        }
        let mut slots = Vec::with_capacity(capacity as usize);
        slots.resize_with(capacity as usize, || None);
        Ok(Self { slots })
    }

    pub fn capacity(&self) -> u8 {
        self.slots.len() as u8
    }

    /// Stores `handle` at `id`. The requested capabilities are narrowed to
    /// what the handle implements. Re-registering an id replaces the old
    /// slot.
    pub fn register(
        &mut self,
        id: u8,
        handle: PeripheralHandle,
        caps: Capabilities,
    ) -> LinkResult<()> {
        let capacity = self.capacity();
        let slot = self
            .slots
            .get_mut(id as usize)
            .ok_or(LinkError::SlotOutOfRange { id, capacity })?;
        let caps = caps & handle.supported();
        info!(
            "Registered peripheral '{}' at id {} ({:?})",
            handle.name(),
            id,
            caps
        );
        *slot = Some(Slot { handle, caps });
        Ok(())
    }

    /// Freezes the table; the two ordered id lists are built here once.
    pub fn freeze(self) -> Registry {
        let mut inbound = Vec::new();
        let mut outbound = Vec::new();
        for (idx, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            // Capacity never exceeds 15 entries, so every index is a valid id.
            let id = PeripheralId(idx as u8);
            if slot.caps.contains(Capabilities::RECEIVE) {
                inbound.push(id);
            }
            if slot.caps.contains(Capabilities::SEND) {
                outbound.push(id);
            }
        }
        debug!(
            "Registry frozen: inbound {:?}, outbound {:?}",
            inbound, outbound
        );
        Registry {
            slots: self.slots,
            inbound,
            outbound,
        }
    }
}

/// Immutable peripheral registry owned by the running link.
#[derive(Debug)]
pub struct Registry {
    slots: Vec<Option<Slot>>,
    inbound: Vec<PeripheralId>,
    outbound: Vec<PeripheralId>,
}

impl Registry {
    /// Slot table size fixed at freeze time.
    pub fn capacity(&self) -> u8 {
        self.slots.len() as u8
    }

    pub fn inbound_ids(&self) -> &[PeripheralId] {
        &self.inbound
    }

    pub fn outbound_ids(&self) -> &[PeripheralId] {
        &self.outbound
    }

    pub fn capabilities(&self, id: u8) -> Capabilities {
        self.slot(id).map(|s| s.caps).unwrap_or_default()
    }

    fn slot(&self, id: u8) -> Option<&Slot> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: PeripheralId) -> Option<&mut Slot> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Resolves a raw destination nibble to an inbound-capable slot.
    pub fn route_inbound(&self, dest: u8) -> Option<PeripheralId> {
        self.inbound.iter().copied().find(|id| id.raw() == dest)
    }

    /// Ordered scan of the outbound slots; the lowest valid id wins.
    pub fn poll_outbound(&self) -> Option<(PeripheralId, u8)> {
        self.outbound.iter().copied().find_map(|id| {
            let offer = self.slot(id.raw())?.handle.outbound()?.produce();
            offer.valid.then_some((id, offer.byte_count))
        })
    }

    pub fn inbound_mut(&mut self, id: PeripheralId) -> Option<&mut dyn Inbound> {
        let slot = self.slot_mut(id)?;
        if !slot.caps.contains(Capabilities::RECEIVE) {
            return None;
        }
        slot.handle.inbound_mut()
    }

    pub fn outbound(&self, id: PeripheralId) -> Option<&dyn Outbound> {
        let slot = self.slot(id.raw())?;
        if !slot.caps.contains(Capabilities::SEND) {
            return None;
        }
        slot.handle.outbound()
    }

    /// Strobes `ack` on exactly one outbound peripheral.
    pub fn ack_pulse(&mut self, id: PeripheralId) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        if !slot.caps.contains(Capabilities::SEND) {
            return;
        }
        if let Some(p) = slot.handle.outbound_mut() {
            p.ack();
        }
    }

    pub fn tick_all(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.handle.tick();
        }
    }

    pub fn snapshot_all(&self) -> BTreeMap<u8, serde_json::Value> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| Some((idx as u8, slot.as_ref()?.handle.snapshot())))
            .collect()
    }

    pub fn snapshot_of(&self, id: u8) -> Option<serde_json::Value> {
        self.slot(id).map(|s| s.handle.snapshot())
    }
}
