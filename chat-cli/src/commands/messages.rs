//! Print the message list once.

use anyhow::{Context, Result};
use chat_client::{Backend, EngineConfig, HttpBackend};

use super::format_message;

/// Run the messages command.
pub async fn run(config: EngineConfig) -> Result<()> {
    let backend = HttpBackend::new(config.backend)?;
    let response = backend
        .messages()
        .await
        .with_context(|| format!("Failed to fetch messages from {}", backend.base_url()))?;

    let status = response.status.clone();
    let Some(messages) = response.into_messages() else {
        println!("Backend reported status {:?}; nothing to show.", status);
        return Ok(());
    };

    if messages.is_empty() {
        println!("No messages yet.");
        return Ok(());
    }

    println!("{} message(s):", messages.len());
    for message in &messages {
        println!("  {}", format_message(message));
    }
    Ok(())
}
