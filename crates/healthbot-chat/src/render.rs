//! Transcript rendering and the ephemeral status line.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use healthbot_core::{Message, Sender};

/// Visible projection of the transcript.
///
/// Implementations hold nothing beyond what is currently displayed.
pub trait TranscriptRenderer: Send + Sync {
    /// Show `message` as the newest entry.
    fn append(&self, message: &Message);

    /// Remove every displayed entry.
    fn clear(&self);
}

/// Short-lived progress indicator shown next to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Analyzing,
    Listening,
    MicError,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Analyzing => write!(f, "Analyzing…"),
            Status::Listening => write!(f, "Listening…"),
            Status::MicError => write!(f, "Mic error."),
        }
    }
}

/// Where status indicators and capability notices are shown.
pub trait StatusLine: Send + Sync {
    fn set(&self, status: Status);

    fn clear(&self);

    /// One-off notice for the user, e.g. a missing host capability.
    fn notify(&self, notice: &str);
}

/// Plain-text form of a transcript entry.
///
/// The sender prefix keeps identical texts from different senders apart;
/// continuation lines are indented under the first.
pub fn format_message(message: &Message) -> String {
    let prefix = match message.sender {
        Sender::User => "you>".to_string(),
        Sender::Bot => match message.badge() {
            Some(badge) => format!("bot> [{}]", badge),
            None => "bot>".to_string(),
        },
    };
    let mut lines = message.text.lines();
    let mut out = format!("{} {}", prefix, lines.next().unwrap_or_default());
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str("     ");
            out.push_str(line);
        }
    }
    out
}

// =============================================================================
// Terminal implementation
// =============================================================================

/// Renders the transcript to a writer, newest entry last.
///
/// A terminal cannot take lines back, so `clear` prints a separator.
pub struct TerminalRenderer<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn write_block(&self, block: &str) {
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = writeln!(out, "{}", block).and_then(|_| out.flush()) {
            tracing::debug!(error = %e, "Failed to write transcript entry");
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

impl<W: Write + Send> TranscriptRenderer for TerminalRenderer<W> {
    fn append(&self, message: &Message) {
        self.write_block(&format_message(message));
    }

    fn clear(&self) {
        self.write_block("----------------------------------------");
    }
}

/// Printed when a shown status goes away.
pub const STATUS_CLEARED: &str = "  Ready.";

/// Status line written to a separate stream (stderr in the terminal app).
///
/// Each change is a new line: setting prints the status, clearing prints
/// [`STATUS_CLEARED`] unless nothing was shown.
pub struct TerminalStatusLine<W: Write + Send> {
    out: Mutex<W>,
    current: Mutex<Option<Status>>,
}

impl<W: Write + Send> TerminalStatusLine<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            current: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Option<Status> {
        *self.current.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            tracing::debug!(error = %e, "Failed to write status line");
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

impl<W: Write + Send> StatusLine for TerminalStatusLine<W> {
    fn set(&self, status: Status) {
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = Some(status);
        self.write_line(&format!("  {}", status));
    }

    fn clear(&self) {
        let shown = self
            .current
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if shown.is_some() {
            self.write_line(STATUS_CLEARED);
        }
    }

    fn notify(&self, notice: &str) {
        self.write_line(&format!("! {}", notice));
    }
}

// =============================================================================
// Recording implementations
// =============================================================================

/// Renderer that keeps the displayed entries in memory.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    entries: Mutex<Vec<Message>>,
    clears: Mutex<usize>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently on display.
    pub fn entries(&self) -> Vec<Message> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Display lines, formatted as the terminal would show them.
    pub fn lines(&self) -> Vec<String> {
        self.entries().iter().map(format_message).collect()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.lock().map(|c| *c).unwrap_or_default()
    }
}

impl TranscriptRenderer for RecordingRenderer {
    fn append(&self, message: &Message) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(message.clone());
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
        if let Ok(mut clears) = self.clears.lock() {
            *clears += 1;
        }
    }
}

/// Everything a [`RecordingStatusLine`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Set(Status),
    Cleared,
    Notice(String),
}

/// Status line that records every update.
#[derive(Debug, Default)]
pub struct RecordingStatusLine {
    events: Mutex<Vec<StatusEvent>>,
    current: Mutex<Option<Status>>,
}

impl RecordingStatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn current(&self) -> Option<Status> {
        self.current.lock().map(|c| *c).unwrap_or_default()
    }

    pub fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: StatusEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl StatusLine for RecordingStatusLine {
    fn set(&self, status: Status) {
        if let Ok(mut current) = self.current.lock() {
            *current = Some(status);
        }
        self.record(StatusEvent::Set(status));
    }

    fn clear(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
        self.record(StatusEvent::Cleared);
    }

    fn notify(&self, notice: &str) {
        self.record(StatusEvent::Notice(notice.to_string()));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use healthbot_core::Severity;

    #[test]
    fn test_status_text() {
        assert_eq!(Status::Analyzing.to_string(), "Analyzing…");
        assert_eq!(Status::Listening.to_string(), "Listening…");
        assert_eq!(Status::MicError.to_string(), "Mic error.");
    }

    #[test]
    fn test_format_badged_reply() {
        let m = Message::bot_with_severity("Monitor and rest.", Severity::Low);
        assert_eq!(format_message(&m), "bot> [LOW] Monitor and rest.");

        let m = Message::bot_with_severity("Go now.", Severity::Urgent);
        assert_eq!(format_message(&m), "bot> [URGENT] Go now.");
    }

    #[test]
    fn test_format_unbadged() {
        let m = Message::bot_with_severity("Tell me more.", Severity::Unknown);
        assert_eq!(format_message(&m), "bot> Tell me more.");
        assert_eq!(format_message(&Message::bot("Hi")), "bot> Hi");
        assert_eq!(format_message(&Message::user("fever")), "you> fever");
    }

    #[test]
    fn test_same_text_different_sender_is_distinct() {
        let user = format_message(&Message::user("same"));
        let bot = format_message(&Message::bot("same"));
        assert_ne!(user, bot);
    }

    #[test]
    fn test_format_multiline() {
        let m = Message::bot("Got it.\n\n**Do now:**\n- Rest");
        assert_eq!(
            format_message(&m),
            "bot> Got it.\n\n     **Do now:**\n     - Rest"
        );
    }

    #[test]
    fn test_terminal_renderer_writes_lines() {
        let renderer = TerminalRenderer::new(Vec::new());
        renderer.append(&Message::user("cough"));
        renderer.append(&Message::bot_with_severity("Rest.", Severity::Moderate));
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "you> cough\nbot> [MODERATE] Rest.\n");
    }

    #[test]
    fn test_terminal_status_line() {
        let status = TerminalStatusLine::new(Vec::new());
        status.set(Status::Analyzing);
        assert_eq!(status.current(), Some(Status::Analyzing));
        status.clear();
        assert_eq!(status.current(), None);
        status.notify("Speech input is not available.");
        let out = String::from_utf8(status.into_inner()).unwrap();
        assert_eq!(
            out,
            "  Analyzing…\n  Ready.\n! Speech input is not available.\n"
        );
    }

    #[test]
    fn test_terminal_status_line_clear_is_visible_once() {
        let status = TerminalStatusLine::new(Vec::new());
        // Nothing shown yet, so nothing to clear.
        status.clear();
        status.set(Status::Listening);
        status.set(Status::MicError);
        status.clear();
        status.clear();
        let out = String::from_utf8(status.into_inner()).unwrap();
        assert_eq!(out, "  Listening…\n  Mic error.\n  Ready.\n");
    }

    #[test]
    fn test_recording_renderer() {
        let renderer = RecordingRenderer::new();
        renderer.append(&Message::user("a"));
        renderer.append(&Message::bot("b"));
        assert_eq!(renderer.lines(), vec!["you> a", "bot> b"]);
        renderer.clear();
        assert!(renderer.entries().is_empty());
        assert_eq!(renderer.clear_count(), 1);
    }

    #[test]
    fn test_recording_status_line() {
        let status = RecordingStatusLine::new();
        status.set(Status::Listening);
        status.notify("nope");
        status.clear();
        assert_eq!(
            status.events(),
            vec![
                StatusEvent::Set(Status::Listening),
                StatusEvent::Notice("nope".to_string()),
                StatusEvent::Cleared,
            ]
        );
        assert_eq!(status.current(), None);
        assert_eq!(status.notices(), vec!["nope"]);
    }
}
