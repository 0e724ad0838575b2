//! Terminal conversation loop.
//!
//! Reads one line at a time from stdin. Every action runs on its own task,
//! so the prompt stays responsive while a reply or a listen is pending.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use healthbot_chat::{
    HttpBackend, ResetOutcome, SessionController, SpeakOutcome, StatusLine, SubmitOutcome,
    VoiceOutcome,
};
use healthbot_core::HistoryTurn;

const HELP: &str = "\
Type a message and press Enter to send it.
  /mic      speak your message
  /speak    read the last reply aloud
  /reset    clear the conversation
  /history  show the backend's recorded history
  /help     show this help
  /quit     leave";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Mic,
    Speak,
    Reset,
    History,
    Help,
    Quit,
    Blank,
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Blank;
    }
    if !trimmed.starts_with('/') {
        return Input::Text(trimmed.to_string());
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "/mic" => Input::Mic,
        "/speak" => Input::Speak,
        "/reset" => Input::Reset,
        "/history" => Input::History,
        "/help" | "/?" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        _ => Input::Unknown(trimmed.to_string()),
    }
}

/// First line of a turn's reply, for compact listings.
fn summarize(turn: &HistoryTurn) -> String {
    let bot = turn.bot.lines().next().unwrap_or_default();
    format!(
        "[{}] you: {}\n    bot: {}",
        turn.ts.format("%Y-%m-%d %H:%M:%S"),
        turn.user,
        bot
    )
}

/// Run the conversation until `/quit` or end of input.
pub async fn run(
    controller: Arc<SessionController>,
    status: Arc<dyn StatusLine>,
    backend: HttpBackend,
) -> std::io::Result<()> {
    controller.open();
    println!("{}", HELP);

    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        while tasks.try_join_next().is_some() {}

        match parse_input(&line) {
            Input::Blank => {}
            Input::Quit => break,
            Input::Help => println!("{}", HELP),
            Input::Unknown(cmd) => status.notify(&format!("Unknown command {}. Try /help.", cmd)),
            Input::Text(text) => {
                let controller = controller.clone();
                let status = status.clone();
                tasks.spawn(async move {
                    if controller.submit_text(&text).await == SubmitOutcome::Busy {
                        status.notify("Still working on the previous message.");
                    }
                });
            }
            Input::Mic => {
                let controller = controller.clone();
                let status = status.clone();
                tasks.spawn(async move {
                    if controller.start_voice_input().await == VoiceOutcome::Busy {
                        status.notify("Still working on the previous message.");
                    }
                });
            }
            Input::Speak => {
                let controller = controller.clone();
                let status = status.clone();
                tasks.spawn(async move {
                    if controller.speak_last_bot_message().await == SpeakOutcome::Failed {
                        status.notify("Could not read the reply aloud.");
                    }
                });
            }
            Input::Reset => {
                let controller = controller.clone();
                let status = status.clone();
                tasks.spawn(async move {
                    if controller.reset_session().await == ResetOutcome::Busy {
                        status.notify("Wait for the current reply before resetting.");
                    }
                });
            }
            Input::History => {
                let backend = backend.clone();
                let status = status.clone();
                tasks.spawn(async move {
                    match backend.history().await {
                        Ok(turns) if turns.is_empty() => println!("(no history)"),
                        Ok(turns) => {
                            for turn in &turns {
                                println!("{}", summarize(turn));
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "History request failed");
                            status.notify("Could not load history.");
                        }
                    }
                });
            }
        }
    }

    tracing::debug!(pending = tasks.len(), "Leaving chat");
    tasks.shutdown().await;
    Ok(())
}
