//! Show what the backend reports about this device.

use anyhow::{Context, Result};
use chat_client::{Backend, DeviceIdentity, EngineConfig, HttpBackend};
use chat_core::DeviceDescriptor;

/// Run the device command.
pub async fn run(config: EngineConfig) -> Result<()> {
    let backend = HttpBackend::new(config.backend)?;
    let response = backend
        .device_info()
        .await
        .with_context(|| format!("Failed to fetch device info from {}", backend.base_url()))?;
    let identity =
        DeviceIdentity::from_response(response).context("Backend could not identify device")?;

    println!("Device:");
    println!("  Address: {}", identity.local_address);
    println!("  Name:    {}", identity.display_name());
    if let DeviceDescriptor::Raw(_) = identity.descriptor() {
        println!("  (plain descriptor)");
    }
    match &identity.gateway {
        Some(gateway) => println!("  Gateway: {}", gateway),
        None => println!("  Gateway: unknown"),
    }
    Ok(())
}
