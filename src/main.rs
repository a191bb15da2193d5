use switchboard::signaling::{DEFAULT_SIGNALING_PORT, SignalingServer};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let bind_addr = format!("0.0.0.0:{}", DEFAULT_SIGNALING_PORT);

    println!("   Switchboard Signaling Relay");
    println!("   Binding to {}", bind_addr);
    println!("   Press Ctrl+C to stop\n");

    let server = SignalingServer::new();
    server.run(&bind_addr).await
}
