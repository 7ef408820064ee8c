//! Interactive console loop.
//!
//! Reads one line at a time from stdin. Questions run as spawned tasks so
//! commands stay responsive while a query is in flight.

use tokio::io::{AsyncBufReadExt, BufReader};

use pubquery_chat::{follow_ups, ConversationOrchestrator, IgnoreReason, Submission};

use crate::view;

const HELP: &str = "\
Type a question about the publication database and press Enter.

Commands:
  /N        ask follow-up N of the latest answer
  /history  show the conversation so far
  /clear    start a new conversation
  /state    print the conversation state as JSON
  /help     show this help
  /quit     exit";

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    /// One-based follow-up number, as displayed.
    FollowUp(usize),
    Clear,
    History,
    State,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(name) = line.strip_prefix('/') else {
            return Some(Command::Ask(line.to_string()));
        };
        let command = match name.to_ascii_lowercase().as_str() {
            "clear" => Command::Clear,
            "history" => Command::History,
            "state" => Command::State,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => Command::FollowUp(n),
                _ => Command::Unknown(line.to_string()),
            },
        };
        Some(command)
    }
}

/// Run the console until `/quit` or end of input.
pub async fn run(
    orchestrator: ConversationOrchestrator,
    backend: &str,
    max_message_length: usize,
) -> std::io::Result<()> {
    println!("pubquery - connected to {}", backend);
    println!("Type /help for commands.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = Command::parse(&line) else {
            continue;
        };

        match command {
            Command::Quit => break,
            Command::Ask(text) => {
                if text.chars().count() > max_message_length {
                    println!(
                        "Question is longer than {} characters and was not sent.",
                        max_message_length
                    );
                    continue;
                }
                spawn_query(&orchestrator, text, false);
            }
            Command::FollowUp(n) => {
                let question = orchestrator.with_store(|store| {
                    store
                        .last_assistant_message()
                        .and_then(|message| follow_ups(message).into_iter().nth(n - 1))
                });
                match question {
                    Some(follow_up) => {
                        println!("> {}", follow_up.question);
                        spawn_query(&orchestrator, follow_up.question, true);
                    }
                    None => println!("No follow-up #{} on the latest answer.", n),
                }
            }
            Command::Clear => {
                orchestrator.clear();
                println!("Conversation cleared.");
            }
            Command::History => {
                let history = orchestrator.with_store(|store| {
                    store
                        .messages()
                        .iter()
                        .map(view::render_message)
                        .collect::<Vec<_>>()
                });
                if history.is_empty() {
                    println!("No messages yet.");
                }
                for entry in history {
                    println!("{}", entry);
                }
            }
            Command::State => match serde_json::to_string_pretty(&orchestrator.snapshot()) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize conversation state"),
            },
            Command::Help => println!("{}", HELP),
            Command::Unknown(input) => {
                println!("Unknown command {}. Type /help for commands.", input)
            }
        }
    }

    Ok(())
}

/// Submit `text` on a background task and print the outcome when it settles.
fn spawn_query(orchestrator: &ConversationOrchestrator, text: String, follow_up: bool) {
    if orchestrator.is_loading() {
        println!("{}", busy_notice());
        return;
    }
    println!("Querying...");

    let orchestrator = orchestrator.clone();
    tokio::spawn(async move {
        let outcome = if follow_up {
            orchestrator.submit_follow_up(&text).await
        } else {
            orchestrator.submit_query(&text).await
        };
        report(&orchestrator, outcome);
    });
}

fn report(orchestrator: &ConversationOrchestrator, outcome: Submission) {
    match outcome {
        Submission::Answered { message_id } => {
            let rendered = orchestrator.with_store(|store| {
                store.message(message_id).map(view::render_message)
            });
            if let Some(rendered) = rendered {
                println!("{}", rendered);
            }
        }
        Submission::Failed { error } => println!("Error: {}", error),
        Submission::Discarded => println!("The conversation was cleared; answer discarded."),
        Submission::Ignored(IgnoreReason::Busy) => println!("{}", busy_notice()),
        Submission::Ignored(IgnoreReason::Empty) => {}
    }
}

fn busy_notice() -> &'static str {
    "A query is already running. Wait for it to finish."
}
