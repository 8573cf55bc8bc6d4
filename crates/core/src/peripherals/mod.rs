// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod beacon;
pub mod echo;
pub mod latch;

pub use beacon::Beacon;
pub use echo::Echo;
pub use latch::Latch;
