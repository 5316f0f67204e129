//! Terminal front-end: rendering helpers and the interactive shell.

use crate::chat::{Speaker, Turn};
use crate::document::Document;
use crate::session::{AppError, Assistant, Status};
use crate::summary::{SummaryLength, SummaryResult};
use chrono::Local;
use colored::Colorize;
use dialoguer::{Input, Select};
use std::future::Future;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub fn print_extracted(text: &str) {
    println!("\n{}\n", "=== Extracted text ===".bold());
    println!("{}", text);
    println!(
        "\n{}",
        format!("--- Extracted {} characters ---", text.chars().count()).dimmed()
    );
}

pub fn print_summary(summary: &SummaryResult) {
    println!("\n{}", "💡 Summary:".bold());
    println!("  {}\n", summary.summary);

    println!("{}", "📌 Key Points:".bold());
    for point in &summary.key_points {
        println!("  • {}", point);
    }

    if !summary.main_ideas.is_empty() {
        println!("\n{}", "🧭 Main Ideas:".bold());
        for idea in &summary.main_ideas {
            println!("  • {}", idea);
        }
    }
    println!();
}

pub fn print_turn(turn: &Turn) {
    let at = turn.at.with_timezone(&Local).format("%H:%M").to_string();
    match turn.speaker {
        Speaker::User => println!("{} {} {}", at.dimmed(), "you ›".cyan().bold(), turn.text),
        Speaker::Assistant if turn.is_failed() => {
            println!("{} {} {}", at.dimmed(), "bot ›".red().bold(), turn.text.red())
        }
        Speaker::Assistant => {
            println!("{} {} {}", at.dimmed(), "bot ›".green().bold(), turn.text)
        }
    }
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✖".red().bold(), message.red());
}

/// Run `call`, cancelling it through `token` if Ctrl-C arrives first.
pub async fn cancel_on_ctrl_c<F: Future>(token: CancellationToken, call: F) -> F::Output {
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    let output = call.await;
    listener.abort();
    output
}

/// Print loading messages as the assistant publishes them.
fn spawn_progress(assistant: &Assistant) {
    let mut status = assistant.subscribe();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            if let Status::Loading(stage) = &*status.borrow_and_update() {
                eprintln!("{} {}", "⏳".dimmed(), stage.message().dimmed());
            }
        }
    });
}

/// The error shown under a failed exchange, alongside the apology turn.
fn chat_error_banner(assistant: &Assistant, error: &AppError) -> String {
    assistant
        .chat()
        .and_then(|session| session.last_error())
        .map(str::to_owned)
        .unwrap_or_else(|| error.to_string())
}

/// Interactive chat until the user enters an empty line or `/exit`.
pub async fn chat_loop(assistant: &mut Assistant) -> anyhow::Result<()> {
    if !assistant.is_chat_open() {
        assistant.toggle_chat();
    }
    if let Some(session) = assistant.chat() {
        session.transcript().iter().for_each(print_turn);
    }
    println!("{}", "(empty line or /exit closes the chat)".dimmed());

    loop {
        let message: String = Input::new()
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()?;
        let message = message.trim();
        if message.is_empty() || message == "/exit" {
            break;
        }

        let token = assistant.cancellation_token();
        let sent = cancel_on_ctrl_c(token, assistant.send_chat(message)).await;
        if let Some(turn) = assistant.chat().and_then(|s| s.transcript().last()) {
            print_turn(turn);
        }
        if let Err(e) = sent {
            print_error(&chat_error_banner(assistant, &e));
        }
    }

    assistant.toggle_chat();
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Upload,
    Summarise(SummaryLength),
    ShowText,
    ShowSummary,
    Chat,
    Quit,
}

fn menu(assistant: &Assistant) -> Vec<(String, Action)> {
    let mut items = vec![("Upload a document".to_string(), Action::Upload)];
    if assistant.can_summarize() {
        for length in SummaryLength::ALL {
            let range = assistant.config().tiers.range(length);
            items.push((
                format!("Summarise: {} (~{} words)", length, range),
                Action::Summarise(length),
            ));
        }
        items.push(("Show extracted text".to_string(), Action::ShowText));
    }
    if assistant.summary().is_some() {
        items.push(("Show summary".to_string(), Action::ShowSummary));
    }
    items.push(("Chat with the assistant".to_string(), Action::Chat));
    items.push(("Quit".to_string(), Action::Quit));
    items
}

/// The interactive shell launched when no subcommand is given.
pub async fn run(assistant: &mut Assistant) -> anyhow::Result<()> {
    println!("{}", "Document Summary Assistant".bold());
    println!("Upload a PDF or image and get a structured summary.\n");
    spawn_progress(assistant);

    loop {
        if let Some(doc) = assistant.document() {
            println!(
                "{}",
                format!("Current document: {} ({}, {} bytes)", doc.name, doc.mime_type, doc.size)
                    .dimmed()
            );
        }

        let items = menu(assistant);
        let labels: Vec<&str> = items.iter().map(|(label, _)| label.as_str()).collect();
        let choice = Select::new()
            .with_prompt("What next?")
            .items(&labels)
            .default(0)
            .interact()?;

        match items[choice].1 {
            Action::Upload => {
                let path: String = Input::new()
                    .with_prompt("Path to a PDF, JPG or PNG")
                    .interact_text()?;
                let document = match Document::load(&PathBuf::from(path.trim())).await {
                    Ok(document) => document,
                    Err(e) => {
                        print_error(&e.to_string());
                        continue;
                    }
                };
                let token = assistant.cancellation_token();
                match cancel_on_ctrl_c(token, assistant.select_file(document)).await {
                    Ok(text) => print_extracted(text),
                    Err(e) => print_error(&e.to_string()),
                }
            }
            Action::Summarise(length) => {
                let token = assistant.cancellation_token();
                match cancel_on_ctrl_c(token, assistant.generate_summary(length)).await {
                    Ok(summary) => print_summary(summary),
                    Err(e) => print_error(&e.to_string()),
                }
            }
            Action::ShowText => {
                if let Some(text) = assistant.extracted_text() {
                    print_extracted(text);
                }
            }
            Action::ShowSummary => {
                if let Some(summary) = assistant.summary() {
                    print_summary(summary);
                }
            }
            Action::Chat => chat_loop(assistant).await?,
            Action::Quit => break,
        }
    }

    Ok(())
}
