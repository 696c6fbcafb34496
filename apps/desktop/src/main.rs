use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    markup::{render, Segment},
    search::shape_search_results,
    ChatClient, ClientEvent, TranscriptEntry,
};
use shared::{domain::Origin, protocol::SearchResults};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::warn;

mod config;

#[derive(Parser, Debug)]
struct Args {
    /// Chat server base URL, e.g. http://127.0.0.1:8000
    #[arg(long)]
    server_url: Option<String>,
    /// User identifier sent with every request
    #[arg(long)]
    user: Option<String>,
    /// Ask the assistant to consult web/news/video search
    #[arg(long)]
    search: bool,
}

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let settings = config::load_settings();

    let server_url = args.server_url.unwrap_or(settings.server_url);
    let user_id = args.user.unwrap_or(settings.user_id);

    client_core::check_health(&server_url)
        .await
        .with_context(|| format!("chat server health check failed: {server_url}"))?;

    let client = ChatClient::new(user_id);
    client.connect(&server_url).await?;
    let mut events = client.subscribe_events();

    println!("Connected to {server_url}. Type a message and press Enter; Ctrl-D quits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ClientEvent::TranscriptUpdated(entries)) => print_transcript(&entries),
                Ok(ClientEvent::ConnectionClosed) => {
                    println!("connection closed by server; restart to reconnect");
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "dropped transcript updates");
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Err(err) = client.submit(&line, args.search).await {
                        warn!("failed to send message: {err}");
                    }
                }
                None => break,
            },
        }
    }

    Ok(())
}

fn print_transcript(entries: &[TranscriptEntry]) {
    println!("{DIM}----------------------------------------{RESET}");
    for entry in entries {
        print_entry(entry);
    }
}

fn print_entry(entry: &TranscriptEntry) {
    match entry.origin {
        Origin::User => {
            println!("you> {}", entry.text.as_deref().unwrap_or_default());
        }
        Origin::Assistant if entry.is_reasoning => {
            let note = entry.reasoning_note.as_deref().unwrap_or("working");
            println!("{DIM}assistant [{note}...]{RESET}");
        }
        Origin::Assistant => {
            if let Some(text) = entry.text.as_deref() {
                for row in render(text) {
                    println!("assistant> {}", render_row(&row));
                }
            }
            if let Some(results) = &entry.search_results {
                print_search_results(results);
            }
        }
    }
}

fn render_row(row: &[Segment]) -> String {
    let mut out = String::new();
    for segment in row {
        match segment {
            Segment::Plain(text) => out.push_str(text),
            Segment::Emphasis(text) => {
                out.push_str(BOLD);
                out.push_str(text);
                out.push_str(RESET);
            }
        }
    }
    out
}

fn print_search_results(results: &SearchResults) {
    for category in shape_search_results(results) {
        println!("  [{}]", category.name);
        for card in category.cards {
            if let Some(title) = &card.title {
                println!("    {BOLD}{title}{RESET}");
            }
            if let Some(date) = &card.date {
                println!("    {date}");
            }
            if let Some(body) = &card.body {
                println!("    {body}");
            }
            if let Some(link) = &card.link {
                println!("    {}: {link}", card.action_label);
            }
        }
    }
}
