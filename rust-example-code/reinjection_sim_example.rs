use reinjector_rs::command::CommandMessage;
use reinjector_rs::config::{PKT_PLD_MASK, PKT_TYPE_SHFT};
use reinjector_rs::sim::{SimPlatform, SimTransport};
use reinjector_rs::{DumpedPacket, Engine, EngineConfig, PacketType, ReinjectResult};

fn main() -> ReinjectResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reinjector_rs=debug".into()),
        )
        .init();

    let engine = Engine::new(
        SimPlatform::new().with_source_address(0x0000_0201),
        EngineConfig::default(),
    );
    engine.start();
    let sim = engine.platform();

    // Congested router: everything it dumps gets captured and parked.
    sim.set_blocked(true);
    for key in 0..8u32 {
        let header = ((PacketType::Multicast as u32) << PKT_TYPE_SHFT)
            | if key % 2 == 0 { PKT_PLD_MASK } else { 0 };
        sim.inject_dump(DumpedPacket::new(header, 0x1000 + key, key * 10));
        engine.service_pending();
        engine.tick();
    }
    println!("queued while blocked: {}", engine.queue().len());

    sim.set_blocked(false);
    engine.tick();
    for t in sim.transmitted() {
        println!("[TX] {}", t.as_dumped());
    }

    let mut transport = SimTransport::new();
    transport.push(CommandMessage::get_status());
    transport.push(CommandMessage::exit());
    engine.poll_commands(&mut transport);

    let status = transport.replies()[0].status()?;
    println!("{status:#?}");
    println!("running after exit: {}", engine.is_running());
    Ok(())
}
