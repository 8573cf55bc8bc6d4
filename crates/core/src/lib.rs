// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod builder;
pub mod codec;
pub mod dispatcher;
pub mod host;
pub mod metrics;
pub mod packet;
pub mod peripherals;
pub mod registry;
pub mod signals;
pub mod snapshot;

use std::sync::Arc;

pub use dispatcher::{Dispatcher, LinkState};
pub use packet::{HeaderView, Packet, NOT_READY, OK_TO_SEND};
pub use qlink_config::LinkParams;
pub use registry::{
    Capabilities, Device, Duplex, Inbound, InboundFrame, Outbound, Outgoing, PeripheralHandle,
    Registry, SlotTable,
};
pub use signals::{BusInputs, BusOutputs, DigitalLevel};

use codec::{RxCodec, TxCodec};
use signals::{Edge, EdgeDetector, Synchronizer};


#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Peripheral id {id} is outside the slot table (capacity {capacity})")]
    SlotOutOfRange { id: u8, capacity: u8 },
    #[error("Peripheral id {0:#x} is reserved")]
    ReservedId(u8),
    #[error("Packet size {0} is unsupported (3..=255 bytes)")]
    InvalidPacketSize(usize),
    #[error("Symbol width {0} must be 1, 2, 4 or 8 bits")]
    InvalidSymbolWidth(u8),
    #[error("Slot table capacity {0} exceeds the 15 addressable ids")]
    TooManyPeripherals(u8),
    #[error("Registry holds {capacity} slots but the link is configured for {num_periphs}")]
    RegistryCapacity { capacity: u8, num_periphs: u8 },
    #[error("Synchronizer needs at least one stage")]
    InvalidSyncStages,
    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    PacketLength { expected: usize, actual: usize },
}

pub type LinkResult<T> = Result<T, LinkError>;

/// Numeric peripheral address carried in a 4-bit field.
///
/// The all-ones nibble is reserved as the "no event" sentinel, leaving ids
/// 0 through 14 usable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PeripheralId(u8);

impl PeripheralId {
    pub const RESERVED: u8 = qlink_config::RESERVED_ID;
    pub const MAX: u8 = Self::RESERVED - 1;

    pub fn new(raw: u8) -> LinkResult<Self> {
        if raw == Self::RESERVED {
            return Err(LinkError::ReservedId(raw));
        }
        if raw > Self::RESERVED {
            return Err(LinkError::SlotOutOfRange {
                id: raw,
                capacity: qlink_config::MAX_PERIPHERALS,
            });
        }
        Ok(Self(raw))
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checks engine parameters before anything is allocated from them.
pub fn check_params(params: &LinkParams) -> LinkResult<()> {
    if !(3..=255).contains(&params.pkt_size) {
        return Err(LinkError::InvalidPacketSize(params.pkt_size));
    }
    if !matches!(params.symbol_width, 1 | 2 | 4 | 8) {
        return Err(LinkError::InvalidSymbolWidth(params.symbol_width));
    }
    if params.num_periphs > qlink_config::MAX_PERIPHERALS {
        return Err(LinkError::TooManyPeripherals(params.num_periphs));
    }
    if params.sync_stages == 0 {
        return Err(LinkError::InvalidSyncStages);
    }
    Ok(())
}

/// Trait for observing link activity in a modular way.
pub trait LinkObserver: std::fmt::Debug + Send + Sync {
    fn on_transition(&self, _from: LinkState, _to: LinkState) {}
    fn on_delivered(&self, _dest: PeripheralId, _byte_count: u8) {}
    fn on_event_sent(&self, _source: PeripheralId, _byte_count: u8) {}
    fn on_dropped(&self, _reason: DropReason) {}
}

/// Why an inbound write never reached a peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// `chip_select` rose before a full packet was shifted in.
    Undersized { symbols: usize },
    /// The trailer named an id with no inbound-capable slot.
    Unroutable { dest: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ConditionMet,
    MaxTicksReached,
}

/// The complete engine: input conditioner, codec pair, dispatcher and the
/// frozen peripheral registry, advanced together one tick at a time.
pub struct Link {
    params: LinkParams,
    cs_sync: Synchronizer<DigitalLevel>,
    clk_sync: Synchronizer<DigitalLevel>,
    data_sync: Synchronizer<u8>,
    cs_edge: EdgeDetector,
    clk_edge: EdgeDetector,
    rx: RxCodec,
    tx: TxCodec,
    dispatcher: Dispatcher,
    registry: Registry,
    pub observers: Vec<Arc<dyn LinkObserver>>,
    ticks: u64,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("state", &self.dispatcher.state())
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl Link {
    pub fn new(params: LinkParams, registry: Registry) -> LinkResult<Self> {
        check_params(&params)?;
        if registry.capacity() != params.num_periphs {
            return Err(LinkError::RegistryCapacity {
                capacity: registry.capacity(),
                num_periphs: params.num_periphs,
            });
        }
        let stages = params.sync_stages as usize;
        Ok(Self {
            params,
            // Idle bus: chip-select released, clock low.
            cs_sync: Synchronizer::new(stages, DigitalLevel::High),
            clk_sync: Synchronizer::new(stages, DigitalLevel::Low),
            data_sync: Synchronizer::new(stages, 0),
            cs_edge: EdgeDetector::new(DigitalLevel::High),
            clk_edge: EdgeDetector::new(DigitalLevel::Low),
            rx: RxCodec::new(params.pkt_size, params.symbol_width),
            tx: TxCodec::new(params.pkt_size, params.symbol_width),
            dispatcher: Dispatcher::new(params.pkt_size),
            registry,
            observers: Vec::new(),
            ticks: 0,
        })
    }

    pub fn add_observer(&mut self, observer: Arc<dyn LinkObserver>) {
        self.observers.push(observer);
    }

    /// Advances the whole engine by one tick.
    ///
    /// Every component reads the state left by the previous tick: the Tx
    /// codec loads its snapshot before the dispatcher can touch the header,
    /// and the dispatcher sees the Rx buffer before a rising `chip_select`
    /// clears it.
    pub fn tick(&mut self, inputs: BusInputs) -> BusOutputs {
        self.ticks += 1;

        let cs = self.cs_sync.sample(inputs.chip_select);
        let clk = self.clk_sync.sample(inputs.clock);
        let data = self
            .data_sync
            .sample(inputs.data & signals::symbol_mask(self.params.symbol_width));
        let cs_edge = self.cs_edge.update(cs);
        let clk_edge = self.clk_edge.update(clk);
        let selected = cs == DigitalLevel::Low;

        self.tx.tick(
            selected,
            cs_edge == Edge::Falling,
            clk_edge == Edge::Falling,
            self.dispatcher.tx_source(),
        );
        self.dispatcher
            .step(cs_edge, &self.rx, &mut self.registry, &self.observers);
        self.rx.tick(selected, clk_edge == Edge::Rising, data);
        self.registry.tick_all();

        self.outputs()
    }

    /// Holds `inputs` for up to `max_ticks` ticks, stopping early once
    /// `until` reports true.
    pub fn run_until<F>(&mut self, inputs: BusInputs, max_ticks: u64, mut until: F) -> StopReason
    where
        F: FnMut(&Link) -> bool,
    {
        for _ in 0..max_ticks {
            self.tick(inputs);
            if until(self) {
                return StopReason::ConditionMet;
            }
        }
        StopReason::MaxTicksReached
    }

    pub fn outputs(&self) -> BusOutputs {
        let output_enable = self.dispatcher.output_enable();
        BusOutputs {
            data: output_enable.then(|| self.tx.symbol()),
            direction: self.dispatcher.direction(),
            output_enable,
        }
    }

    pub fn params(&self) -> &LinkParams {
        &self.params
    }

    pub fn state(&self) -> LinkState {
        self.dispatcher.state()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn rx(&self) -> &RxCodec {
        &self.rx
    }

    pub fn tx(&self) -> &TxCodec {
        &self.tx
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn snapshot(&self) -> snapshot::LinkSnapshot {
        snapshot::LinkSnapshot {
            state: self.dispatcher.state(),
            header: self.dispatcher.header(),
            direction: self.dispatcher.direction(),
            output_enable: self.dispatcher.output_enable(),
            selected: self.dispatcher.selected().map(PeripheralId::raw),
            byte_count: self.dispatcher.byte_count(),
            flags: self.dispatcher.flags(),
            rx_valid: self.dispatcher.rx_valid(),
            rx_symbols: self.rx.symbol_count(),
            tx_symbols: self.tx.shifted(),
            ticks: self.ticks,
            peripherals: self.registry.snapshot_all(),
        }
    }

    /// Looks up a peripheral's serialized state by id.
    pub fn peek_peripheral(&self, id: u8) -> Option<serde_json::Value> {
        self.registry.snapshot_of(id)
    }
}
