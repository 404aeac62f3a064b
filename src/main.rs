use std::io::Write;

use anyhow::Context;
use chat_api::{ChatApiClient, ChatApiConfig, Role};
use stream_chat::{logging, ChatSession, Interrupt, Outcome, Snapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

const HELP: &str = "Type a message and press enter. /clear resets the conversation, /quit exits.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("warn")?;

    let config = ChatApiConfig::from_env()
        .context("set CHAT_API_KEY and CHAT_MODEL (CHAT_API_BASE_URL is optional)")?;
    tracing::info!(model = %config.model, base_url = %config.base_url, "starting chat");
    let client = ChatApiClient::new(config)?;
    let mut session = ChatSession::new(client);

    let interrupts = session.interrupt_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupts.interrupt() == Interrupt::Idle {
                // Stdin reads block runtime shutdown, so leave directly.
                println!();
                std::process::exit(130);
            }
        }
    });

    let renderer = tokio::spawn(render(session.subscribe()));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/clear" => {
                session.clear();
                println!("(conversation cleared)");
            }
            input => match session.send_user_message(input).await {
                Outcome::Cancelled => println!("\n(cancelled)"),
                Outcome::Completed { deltas: 0, .. } => println!("(empty reply)"),
                _ => {}
            },
        }
    }

    drop(session);
    let _ = renderer.await;
    Ok(())
}

/// Print assistant text as it grows.
async fn render(mut updates: watch::Receiver<Snapshot>) {
    let mut generation = 0;
    let mut finished = 0;
    let mut printed = 0;

    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        if snapshot.generation != generation {
            generation = snapshot.generation;
            finished = 0;
            printed = 0;
        }

        let mut stdout = std::io::stdout().lock();
        let last = snapshot.messages.len().saturating_sub(1);
        for (index, message) in snapshot.messages.iter().enumerate().skip(finished) {
            if message.role == Role::Assistant {
                let _ = write!(stdout, "{}", &message.content[printed..]);
                printed = message.content.len();
            }
            if index < last || !snapshot.sending {
                if message.role == Role::Assistant {
                    let _ = writeln!(stdout);
                }
                finished = index + 1;
                printed = 0;
            }
        }
        let _ = stdout.flush();
    }
}
