use reinjector_rs::command::{CommandMessage, SdpHeader};
use reinjector_rs::monitor::RouterTimeout;
use reinjector_rs::sim::{SimPlatform, SimTransport};
use reinjector_rs::{Engine, EngineConfig, PacketType, ReinjectResult};

/// Host-side view: build the control messages a monitoring tool would
/// send, push them through the engine and decode the replies.
fn main() -> ReinjectResult<()> {
    tracing_subscriber::fmt().with_env_filter("reinjector_rs=info").init();

    let engine = Engine::new(SimPlatform::new(), EngineConfig::default());
    engine.start();

    let core = SdpHeader::to_core(0, 0, 1);
    let mut transport = SimTransport::new();

    let commands = [
        CommandMessage::set_router_timeout(RouterTimeout::new(0xf, 0x2)?),
        CommandMessage::set_router_emergency_timeout(RouterTimeout::new(0x1, 0x0)?),
        CommandMessage::set_packet_types(
            PacketType::Multicast.mask_bit() | PacketType::PointToPoint.mask_bit(),
        ),
        CommandMessage::get_status(),
    ];
    for (seq, cmd) in commands.into_iter().enumerate() {
        transport.push(cmd.with_header(core).with_seq(seq as u16));
    }
    engine.poll_commands(&mut transport);

    for reply in transport.replies() {
        let rc = reply.result_code().map_or("{Unknown}", |rc| rc.as_str());
        println!("seq {} -> {rc}", reply.seq());
    }

    let status = transport.replies()[3].status()?;
    let t = status.timeout();
    let e = status.emergency_timeout();
    println!("timeout:   mantissa {} exponent {}", t.mantissa, t.exponent);
    println!("emergency: mantissa {} exponent {}", e.mantissa, e.exponent);
    println!("packet types: {:#06b}", status.packet_types);
    Ok(())
}
