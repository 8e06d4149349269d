//! Query a Connect hub once and print its state as JSON.
//!
//! ```text
//! RUST_LOG=debug cargo run --example probe -- 192.168.1.50 [port] [zone]
//! ```

use dynaudio_connect::{DeviceConfig, DynaudioDevice, Zone, DEFAULT_PORT};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().ok_or("usage: probe <host> [port] [zone]")?;
    let port = match args.next() {
        Some(port) => port.parse()?,
        None => DEFAULT_PORT,
    };
    let mut config = DeviceConfig::new(host).with_port(port);
    if let Some(zone) = args.next() {
        config = config.with_zone(Zone::new(zone)?);
    }

    let device = DynaudioDevice::connect(&config).await;
    println!("{}", serde_json::to_string_pretty(&device.state_snapshot())?);

    if !device.responding() {
        eprintln!("{} did not answer; it is either off or unreachable", device.name());
    }
    Ok(())
}
