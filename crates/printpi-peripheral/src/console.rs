//! Stdin front end for bench work without a BLE client.
//!
//! Each line is one command. `A` and `B` are written to the action selector
//! exactly like a command-characteristic write; `subscribe` and `unsubscribe`
//! stand in for the notification subscription. Every notification is printed
//! as text, or as hex when it is a binary template chunk.

use printpi_capture::{CaptureError, ChannelSink, ControllerHandle};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: A (enroll) | B (identify) | subscribe | unsubscribe | status | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Select(Vec<u8>),
    Subscribe,
    Unsubscribe,
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    let command = match line.to_ascii_lowercase().as_str() {
        "" => return None,
        "subscribe" | "sub" => ConsoleCommand::Subscribe,
        "unsubscribe" | "unsub" => ConsoleCommand::Unsubscribe,
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => ConsoleCommand::Select(line.as_bytes().to_vec()),
    };
    Some(command)
}

/// Printable form of one notification payload.
fn render_payload(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => {
            let mut hex = String::with_capacity(bytes.len() * 3);
            for (i, byte) in bytes.iter().enumerate() {
                if i > 0 {
                    hex.push(' ');
                }
                let _ = write!(hex, "{byte:02x}");
            }
            format!("[{} bytes] {hex}", bytes.len())
        }
    }
}

pub async fn run(controller: ControllerHandle) -> anyhow::Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            continue;
        };

        match command {
            ConsoleCommand::Select(value) => match controller.select_action(&value).await {
                Ok(mode) => println!("action: {mode}"),
                Err(CaptureError::Core(e)) => println!("rejected: {e}"),
                Err(e) => return Err(e.into()),
            },
            ConsoleCommand::Subscribe => subscribe(&controller).await?,
            ConsoleCommand::Unsubscribe => {
                if controller.unsubscribe().await? {
                    println!("session cancelled");
                } else {
                    println!("no session running");
                }
            }
            ConsoleCommand::Status => {
                println!("action: {}", controller.current_action().await?);
            }
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => break,
        }
    }

    controller.shutdown().await?;
    Ok(())
}

async fn subscribe(controller: &ControllerHandle) -> anyhow::Result<()> {
    let (sink, mut notifications) = ChannelSink::new();
    let ticket = controller.subscribe(Arc::new(sink)).await?;
    println!("{} session started", ticket.mode());

    tokio::spawn(async move {
        while let Some(payload) = notifications.recv().await {
            println!("<< {}", render_payload(&payload));
        }
        if let Ok(report) = ticket.report().await {
            println!(
                "{} session {} after {} step(s)",
                report.mode,
                report.final_state(),
                report.steps_invoked
            );
        }
    });

    Ok(())
}
