//! Send a single message.

use anyhow::{Context, Result};
use chat_client::{ChatEngine, Draft, EngineConfig};

/// Run the send command.
pub async fn run(config: EngineConfig, name: &str, text: &str) -> Result<()> {
    let engine = ChatEngine::from_config(config)?;

    let start = engine.set_session_identity(name).await?;
    let device = start.device.context("Failed to look up device info")?;
    engine.stop_polling();
    println!("Sending as {} from {}...", start.identity, device.local_address);

    let mut draft = Draft::from(text);
    let receipt = engine
        .send_message(&mut draft)
        .await
        .context("Failed to send message")?;

    match receipt.id {
        Some(id) => println!("Message sent (id {}).", id),
        None => println!("Message sent."),
    }
    println!("{} message(s) on the board.", engine.messages().await.len());

    engine.shutdown();
    Ok(())
}
