//! Host-side faceprint storage: enroll once, then match a second scan
//!
//! ```text
//! RUST_LOG=debug cargo run --example faceprints
//! ```

use anyhow::Context;
use faceid::simulator::{jittered, synthetic_descriptor};
use faceid::{
    authenticate_faceprints, enroll_faceprints, FaceAuthenticator, FaceprintDb, FaceprintsConfig,
    SimulatedDevice, Status,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = FaceprintsConfig::load().context("loading configuration")?;

    let mut device = SimulatedDevice::new();
    let status = device.connect(&config.camera).await;
    if status != Status::Ok {
        anyhow::bail!("Failed connecting with status {}", status);
    }
    info!("Connected to device");

    let mut db = FaceprintDb::new();

    device.push_scan(synthetic_descriptor(&config.user_id));
    enroll_faceprints(&mut device, &mut db, &config.user_id).await?;

    device.push_scan(jittered(&synthetic_descriptor(&config.user_id), 12));
    match authenticate_faceprints(&mut device, &mut db).await? {
        Some(found) => info!(user_id = %found.user_id, updated = found.updated, "Match success"),
        None => info!("Forbidden"),
    }

    device.disconnect().await;
    Ok(())
}
