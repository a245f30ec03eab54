#[cfg(test)]
mod reinjection_system_tests {
    use reinjector_rs::command::CommandMessage;
    use reinjector_rs::config::{PKT_PLD_MASK, PKT_ROUTE_SHFT, PKT_TYPE_SHFT};
    use reinjector_rs::engine::HandlerOutcome;
    use reinjector_rs::capture::CaptureOutcome;
    use reinjector_rs::sim::{SimPlatform, SimTransport};
    use reinjector_rs::{DumpedPacket, Engine, EngineConfig, PacketType, ResultCode};

    fn packet(ty: PacketType, key: u32, payload: Option<u32>, route: u32) -> DumpedPacket {
        let mut header = ((ty as u32) << PKT_TYPE_SHFT) | ((route & 7) << PKT_ROUTE_SHFT);
        if payload.is_some() {
            header |= PKT_PLD_MASK;
        }
        DumpedPacket::new(header, key, payload.unwrap_or(0))
    }

    fn node() -> Engine<SimPlatform> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("reinjector_rs=debug")
            .with_test_writer()
            .try_init();
        let engine = Engine::new(
            SimPlatform::new().with_source_address(0x0000_0102),
            EngineConfig::default(),
        );
        engine.start();
        engine
    }

    /// Router dumps a packet and the fast interrupt fires straight away.
    fn dump(engine: &Engine<SimPlatform>, p: DumpedPacket) -> Vec<HandlerOutcome> {
        assert!(engine.platform().inject_dump(p));
        engine.service_pending()
    }

    #[test]
    fn packets_dropped_while_blocked_are_reinjected_in_order_after_unblock() {
        let engine = node();
        let sim = engine.platform();
        sim.set_blocked(true);

        let sent = [
            packet(PacketType::Multicast, 0x100, None, 1),
            packet(PacketType::Multicast, 0x200, Some(0xfeed), 2),
            packet(PacketType::Multicast, 0x300, None, 4),
        ];
        for p in sent {
            let out = dump(&engine, p);
            assert_eq!(out, vec![HandlerOutcome::Captured(CaptureOutcome::Queued)]);
        }

        // ticks while blocked never arm the transmitter
        for _ in 0..5 {
            engine.tick();
        }
        assert!(sim.transmitted().is_empty());
        assert_eq!(engine.queue().len(), 3);

        sim.set_blocked(false);
        engine.tick();

        let got: Vec<_> = sim.transmitted().iter().map(|t| t.as_dumped()).collect();
        assert_eq!(got, sent.to_vec());
        assert!(sim.transmitted().iter().all(|t| t.source_address & 0xffff == 0x0102));
        assert!(engine.queue().is_empty());
        assert!(!sim.tx_ready_enabled());

        let mut transport = SimTransport::new();
        transport.push(CommandMessage::get_status());
        engine.poll_commands(&mut transport);
        let status = transport.replies()[0].status().unwrap();
        assert_eq!(status.dropped, 3);
        assert_eq!(status.reinjected, 3);
        assert_eq!(status.missed_dropped, 0);
        assert_eq!(status.queue_overflows, 0);
    }

    #[test]
    fn blocking_mid_drain_pauses_until_next_tick() {
        let engine = node();
        let sim = engine.platform();
        sim.set_blocked(true);
        for k in 0..4 {
            dump(&engine, packet(PacketType::Multicast, k, None, 0));
        }
        sim.set_blocked(false);

        // arm, send one, then the router blocks again
        engine.on_timer_tick();
        engine.on_transmitter_ready();
        sim.set_blocked(true);
        engine.service_pending();

        assert_eq!(sim.transmitted().len(), 1);
        assert!(!sim.tx_ready_enabled());
        assert_eq!(engine.queue().len(), 3);

        sim.set_blocked(false);
        engine.tick();
        let keys: Vec<_> = sim.transmitted().iter().map(|t| t.key).collect();
        assert_eq!(keys, vec![0, 1, 2, 3]);
    }

    #[test]
    fn packet_type_filter_applies_from_the_next_dump() {
        let engine = node();
        let sim = engine.platform();
        let mut transport = SimTransport::new();

        dump(&engine, packet(PacketType::PointToPoint, 1, None, 0));
        dump(&engine, packet(PacketType::Multicast, 2, None, 0));

        transport.push(CommandMessage::set_packet_types(
            PacketType::PointToPoint.mask_bit() | PacketType::FixedRoute.mask_bit(),
        ));
        engine.poll_commands(&mut transport);
        assert_eq!(transport.replies()[0].result_code(), Some(ResultCode::Ok));

        dump(&engine, packet(PacketType::PointToPoint, 3, None, 0));
        dump(&engine, packet(PacketType::Multicast, 4, None, 0));
        dump(&engine, packet(PacketType::FixedRoute, 5, Some(9), 0));
        engine.tick();

        let keys: Vec<_> = sim.transmitted().iter().map(|t| t.key).collect();
        assert_eq!(keys, vec![2, 3, 5]);
        assert_eq!(engine.stats().dropped, 3);
    }

    #[test]
    fn exit_abandons_queued_packets() {
        let engine = node();
        let sim = engine.platform();
        sim.set_blocked(true);
        dump(&engine, packet(PacketType::Multicast, 1, None, 0));

        let mut transport = SimTransport::new();
        transport.push(CommandMessage::exit());
        engine.poll_commands(&mut transport);
        assert!(!engine.is_running());

        sim.set_blocked(false);
        // no interrupt is enabled any more, so nothing is delivered
        assert!(engine.service_pending().is_empty());
        assert!(sim.transmitted().is_empty());

        // run() returns immediately once stopped
        engine.run();
        assert_eq!(sim.idle_waits(), 0);
    }
}
