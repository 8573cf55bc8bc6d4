// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{DropReason, LinkObserver, LinkState, PeripheralId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Transaction counters collected through the observer hooks.
#[derive(Debug, Default)]
pub struct LinkMetrics {
    transitions: AtomicU64,
    delivered: AtomicU64,
    delivered_bytes: AtomicU64,
    events_sent: AtomicU64,
    event_bytes: AtomicU64,
    dropped_undersized: AtomicU64,
    dropped_unroutable: AtomicU64,
    delivered_by_id: Mutex<HashMap<u8, u64>>,
    events_by_id: Mutex<HashMap<u8, u64>>,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.transitions.store(0, Ordering::SeqCst);
        self.delivered.store(0, Ordering::SeqCst);
        self.delivered_bytes.store(0, Ordering::SeqCst);
        self.events_sent.store(0, Ordering::SeqCst);
        self.event_bytes.store(0, Ordering::SeqCst);
        self.dropped_undersized.store(0, Ordering::SeqCst);
        self.dropped_unroutable.store(0, Ordering::SeqCst);
        if let Ok(mut m) = self.delivered_by_id.lock() {
            m.clear();
        }
        if let Ok(mut m) = self.events_by_id.lock() {
            m.clear();
        }
    }

    pub fn get_transitions(&self) -> u64 {
        self.transitions.load(Ordering::SeqCst)
    }

    pub fn get_delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn get_delivered_bytes(&self) -> u64 {
        self.delivered_bytes.load(Ordering::SeqCst)
    }

    pub fn get_events_sent(&self) -> u64 {
        self.events_sent.load(Ordering::SeqCst)
    }

    pub fn get_event_bytes(&self) -> u64 {
        self.event_bytes.load(Ordering::SeqCst)
    }

    pub fn get_dropped(&self) -> u64 {
        self.dropped_undersized.load(Ordering::SeqCst)
            + self.dropped_unroutable.load(Ordering::SeqCst)
    }

    pub fn get_dropped_undersized(&self) -> u64 {
        self.dropped_undersized.load(Ordering::SeqCst)
    }

    pub fn get_dropped_unroutable(&self) -> u64 {
        self.dropped_unroutable.load(Ordering::SeqCst)
    }

    pub fn get_delivered_to(&self, id: u8) -> u64 {
        self.delivered_by_id
            .lock()
            .ok()
            .and_then(|m| m.get(&id).copied())
            .unwrap_or(0)
    }

    pub fn get_events_from(&self, id: u8) -> u64 {
        self.events_by_id
            .lock()
            .ok()
            .and_then(|m| m.get(&id).copied())
            .unwrap_or(0)
    }
}

impl LinkObserver for LinkMetrics {
    fn on_transition(&self, _from: LinkState, _to: LinkState) {
        self.transitions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_delivered(&self, dest: PeripheralId, byte_count: u8) {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        self.delivered_bytes
            .fetch_add(byte_count as u64, Ordering::SeqCst);
        if let Ok(mut m) = self.delivered_by_id.lock() {
            *m.entry(dest.raw()).or_insert(0) += 1;
        }
    }

    fn on_event_sent(&self, source: PeripheralId, byte_count: u8) {
        self.events_sent.fetch_add(1, Ordering::SeqCst);
        self.event_bytes
            .fetch_add(byte_count as u64, Ordering::SeqCst);
        if let Ok(mut m) = self.events_by_id.lock() {
            *m.entry(source.raw()).or_insert(0) += 1;
        }
    }

    fn on_dropped(&self, reason: DropReason) {
        match reason {
            DropReason::Undersized { .. } => {
                self.dropped_undersized.fetch_add(1, Ordering::SeqCst);
            }
            DropReason::Unroutable { .. } => {
                self.dropped_unroutable.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
