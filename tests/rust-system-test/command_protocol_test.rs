#[cfg(test)]
mod command_protocol_tests {
    use reinjector_rs::command::{
        CommandFrame, CommandMessage, SdpHeader, MAX_FRAME_LEN, SCP_HEADER_LEN,
    };
    use reinjector_rs::monitor::RouterTimeout;
    use reinjector_rs::sim::{SimPlatform, SimTransport};
    use reinjector_rs::{Engine, EngineConfig, PacketType, ReinjectError, ResultCode, SubCommand};

    fn node() -> Engine<SimPlatform> {
        let engine = Engine::new(SimPlatform::new(), EngineConfig::default());
        engine.start();
        engine
    }

    #[test]
    fn wire_layout_is_little_endian_scp() {
        let msg = CommandMessage::set_router_emergency_timeout(RouterTimeout::new(0xa, 0x3).unwrap())
            .with_header(SdpHeader::to_core(1, 2, 3))
            .with_seq(0x1234);
        let frame = msg.encode();
        let b = frame.as_bytes();

        assert_eq!(b.len(), 24);
        assert_eq!(b[0], 0x87);
        assert_eq!(b[2], 3, "port 0, cpu 3");
        assert_eq!(&b[4..6], &[0x02, 0x01], "destination (x=1, y=2)");
        assert_eq!(&b[8..10], &[30, 0], "re-injection command");
        assert_eq!(&b[10..12], &[0x34, 0x12]);
        assert_eq!(&b[12..16], &[1, 0, 0, 0], "emergency timeout sub-command");
        assert_eq!(&b[16..20], &[0x3a, 0, 0, 0]);

        assert_eq!(CommandMessage::decode(b).unwrap(), msg);
    }

    #[test]
    fn decode_classifies_bad_frames() {
        let frame = CommandMessage::get_status().encode();
        let b = frame.as_bytes();

        assert_eq!(
            CommandMessage::decode(&b[..7]),
            Err(ReinjectError::Truncated { got: 7 })
        );
        assert_eq!(
            CommandMessage::decode(&b[..8]),
            Err(ReinjectError::LengthError { expected: 24, got: 8 })
        );
        assert_eq!(
            CommandMessage::decode(&b[..16]),
            Err(ReinjectError::LengthError { expected: 24, got: 16 })
        );
        assert_eq!(
            ReinjectError::LengthError { expected: 24, got: 16 }.to_result_code(),
            ResultCode::Len
        );
        assert!(CommandFrame::from_bytes(&vec![0u8; MAX_FRAME_LEN + 1]).is_err());
    }

    #[test]
    fn longer_frames_with_trailing_data_are_accepted() {
        let engine = node();
        let frame = CommandMessage::get_status().encode();
        let mut bytes = frame.as_bytes().to_vec();
        bytes.extend_from_slice(&[0xee; 32]);

        let mut transport = SimTransport::new();
        transport.push_frame(CommandFrame::from_bytes(&bytes).unwrap());
        assert_eq!(engine.poll_commands(&mut transport), 1);
        assert_eq!(transport.replies()[0].result_code(), Some(ResultCode::Ok));
    }

    #[test]
    fn every_sub_command_round_trips_through_the_engine() {
        let engine = node();
        let mut transport = SimTransport::new();

        let msgs = [
            CommandMessage::set_router_timeout(RouterTimeout::new(0x1, 0x2).unwrap()),
            CommandMessage::set_router_emergency_timeout(RouterTimeout::new(0x3, 0x4).unwrap()),
            CommandMessage::set_packet_types(PacketType::NearestNeighbour.mask_bit()),
            CommandMessage::reset_counters(),
            CommandMessage::get_status(),
        ];
        for (seq, m) in msgs.into_iter().enumerate() {
            transport.push(m.with_seq(seq as u16));
        }

        assert_eq!(engine.poll_commands(&mut transport), 5);
        let replies = transport.take_replies();
        assert_eq!(replies.len(), 5);
        for (seq, r) in replies.iter().enumerate() {
            assert_eq!(r.seq() as usize, seq);
            assert_eq!(r.result_code(), Some(ResultCode::Ok));
        }
        for r in &replies[..4] {
            assert_eq!(r.len(), SCP_HEADER_LEN);
        }

        let status = replies[4].status().unwrap();
        assert_eq!(status.timeout(), RouterTimeout::new(0x1, 0x2).unwrap());
        assert_eq!(status.emergency_timeout(), RouterTimeout::new(0x3, 0x4).unwrap());
        assert_eq!(status.packet_types, 0b0100);
    }

    #[test]
    fn rejected_commands_leave_state_untouched() {
        let engine = node();
        let mut transport = SimTransport::new();
        let control = engine.platform().router_control();

        transport.push(CommandMessage::new(SubCommand::SetRouterTimeout, 0x1_00));
        transport.push(CommandMessage::new(SubCommand::SetRouterEmergencyTimeout, u32::MAX));
        transport.push(CommandMessage::get_status().with_command(1));
        let mut unknown = CommandMessage::get_status();
        unknown.arg1 = SubCommand::MAX + 1;
        transport.push(unknown);

        engine.poll_commands(&mut transport);
        let codes: Vec<_> = transport.replies().iter().map(|r| r.result_code()).collect();
        assert_eq!(
            codes,
            vec![
                Some(ResultCode::Arg),
                Some(ResultCode::Arg),
                Some(ResultCode::Cmd),
                Some(ResultCode::Arg),
            ]
        );
        assert_eq!(engine.platform().router_control(), control);
        assert!(engine.is_running());
    }

    #[test]
    fn frames_for_other_ports_get_no_reply() {
        let engine = node();
        let mut transport = SimTransport::new();

        let mut header = SdpHeader::to_core(0, 0, 1);
        header.dest_port_cpu |= 3 << 5;
        transport.push(CommandMessage::exit().with_header(header));
        transport.push_frame(CommandFrame::from_bytes(&[0x87, 0xff, 0x01]).unwrap());

        assert_eq!(engine.poll_commands(&mut transport), 2);
        assert!(transport.replies().is_empty());
        assert!(engine.is_running(), "exit on a non-SCP port is ignored");
    }
}
