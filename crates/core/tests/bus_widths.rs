// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use proptest::prelude::*;
use qlink_core::codec::RxCodec;
use qlink_core::host::Host;
use qlink_core::packet::HeaderView;
use qlink_core::peripherals::{Echo, Latch};
use qlink_core::{Capabilities, Link, LinkParams, PeripheralHandle, PeripheralId, SlotTable};

fn params(pkt_size: usize, symbol_width: u8, sync_stages: u8) -> LinkParams {
    LinkParams {
        pkt_size,
        symbol_width,
        num_periphs: 15,
        sync_stages,
    }
}

fn link(params: LinkParams, dest: u8) -> Link {
    let mut table = SlotTable::with_capacity(params.num_periphs).unwrap();
    table
        .register(
            dest,
            PeripheralHandle::Inbound(Box::new(Latch::new("latch"))),
            Capabilities::RECEIVE,
        )
        .unwrap();
    table
        .register(
            14,
            PeripheralHandle::Both(Box::new(Echo::new("echo", params.pkt_size))),
            Capabilities::all(),
        )
        .unwrap();
    Link::new(params, table.freeze()).unwrap()
}

fn frame_strategy() -> impl Strategy<Value = (usize, Vec<u8>)> {
    (3usize..24).prop_flat_map(|n| (Just(n), prop::collection::vec(any::<u8>(), 0..=n - 2)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_payload_reaches_latch_at_any_width(
        width in prop::sample::select(vec![1u8, 2, 4, 8]),
        stages in 1u8..4,
        dest in 0u8..14,
        flags in 0u8..16,
        (pkt_size, payload) in frame_strategy(),
    ) {
        let mut host = Host::new(link(params(pkt_size, width, stages), dest));
        let id = PeripheralId::new(dest).unwrap();

        prop_assert!(host.send(id, flags, &payload, 4).unwrap());
        let snap = host.link().peek_peripheral(dest).unwrap();
        prop_assert_eq!(&snap["value"], &serde_json::json!(payload));
        prop_assert_eq!(&snap["flags"], &serde_json::json!(flags));
        prop_assert_eq!(&snap["deliveries"], &serde_json::json!(1));
    }

    #[test]
    fn test_echo_returns_payload_at_any_width(
        width in prop::sample::select(vec![1u8, 2, 4, 8]),
        (pkt_size, payload) in frame_strategy(),
    ) {
        let mut host = Host::new(link(params(pkt_size, width, 2), 0));
        let echo = PeripheralId::new(14).unwrap();

        prop_assert!(host.send(echo, 0, &payload, 4).unwrap());
        prop_assert!(host.wait_interrupt(50));
        let (view, data) = host.service_event().unwrap();
        prop_assert_eq!(
            view,
            HeaderView::Event { source: 14, byte_count: (payload.len() & 0xF) as u8 }
        );
        prop_assert_eq!(&data[..payload.len()], &payload[..]);
        prop_assert_eq!(data.len(), pkt_size);
    }

    #[test]
    fn test_rx_ready_exactly_at_final_symbol(
        width in prop::sample::select(vec![1u8, 2, 4, 8]),
        pkt_size in 3usize..32,
        extra in 0usize..8,
    ) {
        let mut rx = RxCodec::new(pkt_size, width);
        let full = rx.symbols_per_packet();
        let mut ready_at = Vec::new();
        for i in 0..full + extra {
            rx.tick(true, true, (i as u8) & 1);
            if rx.ready() {
                ready_at.push(i + 1);
            }
        }
        prop_assert_eq!(ready_at, vec![full]);
    }
}
