//! Host-mode gate: open a relay when an authorised face is shown
//!
//! Commands arrive from the control board on the relay port (see
//! `faceid::relay`). The camera is simulated and pre-loaded with the
//! administrator plus a scripted sequence of authentications.
//!
//! ```text
//! RUST_LOG=debug FACEID_RELAY__PORT=/dev/ttymxc1 cargo run --example relay_gate
//! ```

use anyhow::Context;
use faceid::{
    CommandReader, FaceAuthenticator, Gpio, HostModeConfig, RelayController, SerialTransport,
    SimulatedDevice, Status, Transport,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = HostModeConfig::load().context("loading configuration")?;

    let mut camera = SimulatedDevice::new().with_user(config.admin_id.clone());
    camera.push_authenticated(config.admin_id.clone());
    camera.push_authenticated("alice");

    let status = camera.connect(&config.camera).await;
    if status != Status::Ok {
        anyhow::bail!("Failed connecting with status {}", status);
    }

    let mut board = SerialTransport::new(config.relay.port.clone())
        .with_baud_rate(config.relay.baud_rate)
        .with_framing(config.relay.framing);
    board
        .connect()
        .await
        .with_context(|| format!("opening relay board on {}", config.relay.port))?;

    let relay = Gpio::open(config.gpio.chip, config.gpio.index).context("exporting relay GPIO")?;

    let mut reader = CommandReader::new(board).with_poll_window(config.relay.poll_window());
    let mut controller = RelayController::new(camera, relay, config.admin_id.clone())?;

    controller
        .run(&mut reader, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("CTRL-C detected");
        })
        .await?;

    if let Some(record) = controller.last_authenticated() {
        info!("Last authenticated: {}", record);
    }

    let (mut camera, _relay) = controller.into_parts();
    camera.disconnect().await;
    reader.into_transport().disconnect().await?;

    Ok(())
}
