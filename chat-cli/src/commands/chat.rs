//! Interactive chat session.
//!
//! Reads drafts from stdin, one per line, and prints new messages as the
//! engine picks them up. Lines starting with `/` are commands.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chat_client::{Backend, ChatEngine, Draft, EngineConfig, EngineEvent, FetchMode};
use chat_types::MessageId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use super::format_message;

/// Run the chat command.
pub async fn run(config: EngineConfig, name: &str) -> Result<()> {
    let engine = ChatEngine::from_config(config)?;
    let mut events = engine.subscribe();

    let start = engine.set_session_identity(name).await?;
    match &start.device {
        Ok(device) => println!(
            "Connected as {} from {} ({}).",
            start.identity,
            device.local_address,
            device.display_name()
        ),
        Err(e) => {
            eprintln!("Could not look up device info: {}", e);
            eprintln!("Sending is disabled until it succeeds; try /device.");
        }
    }
    println!("Type a message and press enter. /refresh, /latest, /device, /quit.");

    let mut seen = HashSet::new();
    print_new_messages(&engine, &mut seen).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut draft = Draft::new();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match line.trim() {
                    "/quit" => break,
                    "/refresh" => {
                        // Network failures are silent; the board just does not change.
                        if let Err(failure) = engine.fetch_messages(FetchMode::Manual).await {
                            if let Some(e) = failure.visible() {
                                eprintln!("Refresh failed: {}", e);
                            }
                        }
                    }
                    "/latest" => match engine.latest_message().await {
                        Ok(Some(message)) => println!("latest: {}", format_message(&message)),
                        Ok(None) => println!("latest: no messages"),
                        Err(e) => eprintln!("Failed to fetch latest message: {}", e),
                    },
                    "/device" => match engine.fetch_device_info().await {
                        Ok(device) => println!("device: {} ({})", device.local_address, device.display_name()),
                        Err(e) => eprintln!("Failed to look up device info: {}", e),
                    },
                    _ => {
                        draft.set(line.as_str());
                        if draft.is_blank() {
                            continue;
                        }
                        if let Err(e) = engine.send_message(&mut draft).await {
                            eprintln!("Not sent: {}", e);
                        }
                    }
                }
            }
            event = events.recv() => match event {
                Ok(EngineEvent::MessagesReplaced { .. }) => {
                    print_new_messages(&engine, &mut seen).await;
                }
                Ok(EngineEvent::FetchFailed { mode, error }) => {
                    tracing::debug!(%mode, "Fetch failed: {}", error);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} engine events", skipped);
                    print_new_messages(&engine, &mut seen).await;
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    engine.shutdown();
    println!("Bye.");
    Ok(())
}

/// Print messages not printed before, in board order.
async fn print_new_messages<B: Backend + 'static>(
    engine: &ChatEngine<B>,
    seen: &mut HashSet<MessageId>,
) {
    for message in engine.messages().await {
        if seen.insert(message.id) {
            println!("{}", format_message(&message));
        }
    }
}
