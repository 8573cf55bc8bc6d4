// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Represents a digital signal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DigitalLevel {
    #[default]
    Low,
    High,
}

impl From<bool> for DigitalLevel {
    fn from(b: bool) -> Self {
        if b {
            DigitalLevel::High
        } else {
            DigitalLevel::Low
        }
    }
}

impl From<DigitalLevel> for bool {
    fn from(level: DigitalLevel) -> Self {
        match level {
            DigitalLevel::High => true,
            DigitalLevel::Low => false,
        }
    }
}

/// Raw pin levels driven by the host for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusInputs {
    /// Active low; low means a transaction is in progress.
    pub chip_select: DigitalLevel,
    pub clock: DigitalLevel,
    /// Data lines, only the low `symbol_width` bits are used.
    pub data: u8,
}

impl Default for BusInputs {
    fn default() -> Self {
        Self {
            chip_select: DigitalLevel::High,
            clock: DigitalLevel::Low,
            data: 0,
        }
    }
}

/// Pin levels driven by the engine after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusOutputs {
    /// `None` while the output-enable gate leaves the data lines to the host.
    pub data: Option<u8>,
    /// Low: host drives. High: engine drives and requests service.
    pub direction: bool,
    pub output_enable: bool,
}

pub fn symbol_mask(width: u8) -> u8 {
    if width >= 8 {
        0xFF
    } else {
        (1u8 << width) - 1
    }
}

/// Shift-through synchronizer resampling an externally timed line into the
/// tick domain. The output lags the input by exactly `stages` ticks.
#[derive(Debug, Clone)]
pub struct Synchronizer<T> {
    stages: Box<[T]>,
}

impl<T: Copy> Synchronizer<T> {
    pub fn new(stages: usize, reset: T) -> Self {
        Self {
            stages: vec![reset; stages.max(1)].into_boxed_slice(),
        }
    }

    /// Settled value as of the last tick.
    pub fn output(&self) -> T {
        self.stages[self.stages.len() - 1]
    }

    /// Pushes this tick's raw level and returns the settled one.
    pub fn sample(&mut self, input: T) -> T {
        let settled = self.output();
        self.stages.copy_within(..self.stages.len() - 1, 1);
        self.stages[0] = input;
        settled
    }

    pub fn depth(&self) -> usize {
        self.stages.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Rising,
    Falling,
}

/// Compares a level with the one seen on the previous tick.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    prev: DigitalLevel,
}

impl EdgeDetector {
    pub fn new(initial: DigitalLevel) -> Self {
        Self { prev: initial }
    }

    pub fn update(&mut self, level: DigitalLevel) -> Edge {
        let edge = match (self.prev, level) {
            (DigitalLevel::Low, DigitalLevel::High) => Edge::Rising,
            (DigitalLevel::High, DigitalLevel::Low) => Edge::Falling,
            _ => Edge::None,
        };
        self.prev = level;
        edge
    }

    pub fn level(&self) -> DigitalLevel {
        self.prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digital_level_conversions() {
        assert_eq!(DigitalLevel::default(), DigitalLevel::Low);
        assert_eq!(DigitalLevel::from(true), DigitalLevel::High);
        let b: bool = DigitalLevel::High.into();
        assert!(b);
    }

    #[test]
    fn test_synchronizer_two_tick_latency() {
        let mut sync = Synchronizer::new(2, DigitalLevel::High);
        assert_eq!(sync.sample(DigitalLevel::Low), DigitalLevel::High);
        assert_eq!(sync.sample(DigitalLevel::Low), DigitalLevel::High);
        assert_eq!(sync.sample(DigitalLevel::Low), DigitalLevel::Low);
    }

    #[test]
    fn test_synchronizer_keeps_single_tick_glitch_in_order() {
        let mut sync = Synchronizer::new(2, 0u8);
        let seen: Vec<u8> = [5, 0, 0, 0]
            .into_iter()
            .map(|v| sync.sample(v))
            .collect();
        assert_eq!(seen, vec![0, 0, 5, 0]);
    }

    #[test]
    fn test_zero_stages_clamped_to_one() {
        let mut sync = Synchronizer::new(0, 1u8);
        assert_eq!(sync.depth(), 1);
        assert_eq!(sync.sample(7), 1);
        assert_eq!(sync.sample(7), 7);
    }

    #[test]
    fn test_edge_detector() {
        let mut edges = EdgeDetector::new(DigitalLevel::High);
        assert_eq!(edges.update(DigitalLevel::High), Edge::None);
        assert_eq!(edges.update(DigitalLevel::Low), Edge::Falling);
        assert_eq!(edges.update(DigitalLevel::Low), Edge::None);
        assert_eq!(edges.update(DigitalLevel::High), Edge::Rising);
        assert_eq!(edges.level(), DigitalLevel::High);
    }

    #[test]
    fn test_symbol_mask() {
        assert_eq!(symbol_mask(1), 0x01);
        assert_eq!(symbol_mask(4), 0x0F);
        assert_eq!(symbol_mask(8), 0xFF);
    }
}
