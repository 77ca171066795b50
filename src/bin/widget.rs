//! Terminal stand-in for the embedded chat widget. Talks to a running
//! `chatdesk` server the way the browser widget does.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use chatdesk::application::services::{
    ChatSession, IgnoreReason, SendOutcome, SessionEvent, parse_directives,
};
use chatdesk::domain::{ConversationTurn, ParsedReply, TurnRole};
use chatdesk::infrastructure::observability::{TracingConfig, init_tracing};
use chatdesk::infrastructure::storage::ObjectTurnStore;
use chatdesk::infrastructure::transport::HttpChatTransport;
use chatdesk::presentation::{Environment, Settings};

const HELP: &str = "Type a message, a number to pick an option, /reset to start over, /quit to leave.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load configuration")?;

    init_tracing(
        &TracingConfig::new(environment.as_str())
            .with_filter("warn,chatdesk=info")
            .with_json(settings.logging.enable_json)
            .on_stderr(),
    );

    let transport = HttpChatTransport::new(&settings.widget.server_url, &settings.widget.page_url)
        .context("widget.server_url is not a valid URL")?;
    let store = ObjectTurnStore::local(PathBuf::from(&settings.widget.storage_dir))
        .context("Failed to open widget storage")?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut session = ChatSession::new(
        settings.session_config(),
        Arc::new(transport),
        Arc::new(store),
        settings.content_validator(),
    )
    .with_events(events_tx);

    let closed = session.close_handle();
    let close_on_signal = closed.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            close_on_signal.cancel();
        }
    });
    let printer = tokio::spawn(print_events(events_rx));

    println!("== {} ==", settings.chatbot.window_title);
    println!("{}", HELP);
    for turn in session.mount().await {
        print_turn(turn);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if let Some(banner) = session.banner() {
            println!("! {}", banner.message);
        }
        print!("{} > ", settings.chatbot.input_placeholder);
        std::io::stdout().flush().ok();

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = closed.cancelled() => None,
        };
        let Some(line) = line else { break };
        let input = line.trim();

        match input {
            "/quit" => break,
            "/reset" => {
                session.reset().await;
                session.turns().iter().for_each(print_turn);
                continue;
            }
            _ => {}
        }

        let outcome = match pick_choice(input, session.turns()) {
            Some(label) => session.choose(&label).await,
            None => session.send(input).await,
        };
        report(outcome, &session);
    }

    session.close();
    drop(session);
    printer.await.ok();
    Ok(())
}

/// A bare number selects that choice button of the latest assistant turn.
fn pick_choice(input: &str, turns: &[ConversationTurn]) -> Option<String> {
    let index: usize = input.parse().ok()?;
    let last = turns.last().filter(|t| t.role == TurnRole::Assistant)?;
    parse_directives(&last.text())
        .choices
        .into_iter()
        .nth(index.checked_sub(1)?)
}

fn report(outcome: SendOutcome, session: &ChatSession) {
    match outcome {
        SendOutcome::Ignored(IgnoreReason::Throttled) => {
            println!("! You're sending messages too quickly.")
        }
        SendOutcome::Ignored(IgnoreReason::TooLong) => println!("! That message is too long."),
        SendOutcome::Ignored(IgnoreReason::RateLimited) => {
            if let Some(banner) = session.banner() {
                println!("! {}", banner.message);
            }
        }
        _ => {}
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    let mut shown = String::new();

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::PartialReply(reply) => {
                if shown.is_empty() {
                    print!("assistant: ");
                }
                // Prose only ever grows, except when a hidden token resolves.
                if let Some(tail) = reply.clean_text.strip_prefix(shown.as_str()) {
                    print!("{}", tail);
                    std::io::stdout().flush().ok();
                    shown = reply.clean_text;
                }
            }
            SessionEvent::TurnAppended(turn) if turn.role == TurnRole::Assistant => {
                println!();
                print_buttons(&parse_directives(&turn.text()));
                shown.clear();
            }
            SessionEvent::BannerRaised(banner) => {
                if !shown.is_empty() {
                    println!();
                    shown.clear();
                }
                println!("! {}", banner.message);
            }
            SessionEvent::RateLimited { seconds } => {
                let plural = if seconds == 1 { "" } else { "s" };
                println!("! Rate limit exceeded. Please wait {} second{}...", seconds, plural);
            }
            SessionEvent::Reset => println!("-- conversation cleared --"),
            _ => {}
        }
    }
}

fn print_turn(turn: &ConversationTurn) {
    match turn.role {
        TurnRole::User => println!("you: {}", turn.text()),
        TurnRole::Assistant => {
            let reply = parse_directives(&turn.text());
            println!("assistant: {}", reply.clean_text);
            print_buttons(&reply);
        }
    }
}

fn print_buttons(reply: &ParsedReply) {
    for (i, choice) in reply.choices.iter().enumerate() {
        println!("  [{}] {}", i + 1, choice);
    }
    for link in &reply.links {
        println!("  -> {} ({})", link.label, link.url);
    }
}
