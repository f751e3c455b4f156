/// Terminal chat front end: renders the view and sends typed lines
use crate::attention::ScrollRequest;
use crate::color::Avatar;
use crate::config::Config;
use crate::events::ViewEvent;
use crate::identity::{Credential, SelfIdentity};
use crate::message::{DeliveryStatus, Message};
use crate::session::{ChatSession, SessionOptions};
use crate::store::HttpMessageStore;
use crate::transport::LineTransport;
use colored::*;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(HttpMessageStore::new(&config.api_url));
    let mut session = ChatSession::new(store, SessionOptions::from(&config));
    let name = config.display_name().to_string();

    let mut events = session.view_events().await;
    let mut scroll = session.scroll_requests().await;

    session.set_self(Some(SelfIdentity::new(config.self_id.clone())));
    if config.token.is_none() {
        eprintln!(
            "{} No token set; history and sending are disabled (use --token or CHATSYNC_TOKEN)",
            "!".yellow().bold()
        );
    }
    session.set_credential(config.token.clone().map(Credential::new));

    if let Some(addr) = &config.transport_addr {
        match LineTransport::connect(
            addr,
            &config.self_id,
            config.connect_timeout,
            config.event_capacity,
        )
        .await
        {
            Ok(transport) => session.attach_transport(Arc::new(transport)),
            Err(e) => eprintln!(
                "{} Live messages unavailable ({}): {}",
                "✗".red().bold(),
                addr,
                e.to_string().red()
            ),
        }
    }

    session
        .select_conversation(name.clone(), Some(config.counterpart_id.clone()))
        .await;
    print_header(&session.avatar(), &name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim() == "/quit" => break,
                Some(line) if line.trim() == "/reload" => {
                    session.reload();
                }
                Some(line) => {
                    session.set_input(line);
                    session.send().await;
                }
                None => break,
            },
            event = events.recv() => match event {
                Ok(ViewEvent::StatusChanged { message_id, status: DeliveryStatus::Failed }) => {
                    let messages = session.messages().await;
                    let failed = messages.iter().find(|m| m.id == message_id);
                    println!("{} {}", "✗".red().bold(), failure_notice(failed, message_id).red());
                }
                Ok(event) => render(&event, &name),
                Err(RecvError::Lagged(n)) => warn!("Renderer lagged {} view events", n),
                Err(RecvError::Closed) => break,
            },
            request = scroll.recv() => {
                if let Ok(ScrollRequest { index, behavior }) = request {
                    debug!("Scroll {:?} to {:?}", behavior, index);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("{}", "Bye".dimmed());
    Ok(())
}

fn print_header(avatar: &Avatar, name: &str) {
    let initial = avatar.initial.map(String::from).unwrap_or_default();
    let badge = format!(" {} ", initial)
        .bold()
        .on_truecolor(avatar.color.r, avatar.color.g, avatar.color.b);
    println!("{} {}", badge, name.bright_white().bold());
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "{}",
        "Type a message and press Enter. /reload refetches history, /quit exits.".dimmed()
    );
}

fn render(event: &ViewEvent, name: &str) {
    match event {
        ViewEvent::Reset { .. } => {}
        ViewEvent::Replaced { messages, .. } => {
            if messages.is_empty() {
                println!("{}", "No messages yet".dimmed());
            }
            for message in messages {
                print_message(message, name);
            }
        }
        ViewEvent::Appended { message } => print_message(message, name),
        ViewEvent::StatusChanged { .. } => {}
    }
}

/// Names the message whose persistence failed; the id stands in once it has
/// left the view
fn failure_notice(message: Option<&Message>, id: Uuid) -> String {
    match message {
        Some(message) => format!("not saved: \"{}\"", message.text),
        None => format!("message {} was not saved", id),
    }
}

fn print_message(message: &Message, name: &str) {
    let time = message.accepted_at.format("%H:%M").to_string();
    if message.from_self {
        println!("{} {} {}", time.dimmed(), "you ›".green().bold(), message.text);
    } else {
        println!(
            "{} {} {}",
            time.dimmed(),
            format!("{} ›", name).cyan().bold(),
            message.text
        );
    }
}
