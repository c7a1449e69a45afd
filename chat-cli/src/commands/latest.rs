//! Print the most recent message.

use anyhow::{Context, Result};
use chat_client::{Backend, EngineConfig, HttpBackend};

use super::format_message;

/// Run the latest command.
pub async fn run(config: EngineConfig) -> Result<()> {
    let backend = HttpBackend::new(config.backend)?;
    let response = backend
        .latest_message()
        .await
        .with_context(|| format!("Failed to fetch latest message from {}", backend.base_url()))?;

    match response.into_latest() {
        Some(message) => println!("{}", format_message(&message)),
        None => println!("No messages available."),
    }
    Ok(())
}
