use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who produced a message in the transcript.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Typed or dictated by the person using the assistant.
    User,
    /// Produced by the assistant (replies, greetings, apologies).
    Bot,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Bot => write!(f, "bot"),
        }
    }
}

/// Backend-assigned urgency of a bot reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    Urgent,
    /// The backend could not classify the message.
    Unknown,
}

impl Severity {
    /// Every severity that carries a visible badge, in ascending urgency.
    pub const BADGED: [Severity; 3] = [Severity::Low, Severity::Moderate, Severity::Urgent];

    /// Badge label shown next to a bot message, if any.
    ///
    /// `Unknown` has no badge.
    pub fn badge(&self) -> Option<&'static str> {
        match self {
            Severity::Low => Some("LOW"),
            Severity::Moderate => Some("MODERATE"),
            Severity::Urgent => Some("URGENT"),
            Severity::Unknown => None,
        }
    }

    /// Lenient parse used for wire values: anything unrecognized is `Unknown`.
    pub fn from_wire(value: &str) -> Self {
        value.parse().unwrap_or(Severity::Unknown)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::Urgent => write!(f, "urgent"),
            Severity::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "moderate" => Ok(Severity::Moderate),
            "urgent" => Ok(Severity::Urgent),
            "unknown" => Ok(Severity::Unknown),
            other => Err(format!("Unknown severity: {}", other)),
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// A single entry in the conversation transcript.
///
/// Messages are immutable once appended; two messages with the same text are
/// still distinct entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    /// Only ever set on bot messages.
    pub severity: Option<Severity>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A message typed or dictated by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::User,
            severity: None,
            created_at: Utc::now(),
        }
    }

    /// A bot message without a classification (greetings, apologies).
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::Bot,
            severity: None,
            created_at: Utc::now(),
        }
    }

    /// A classified bot reply.
    pub fn bot_with_severity(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            severity: Some(severity),
            ..Self::bot(text)
        }
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }

    /// The badge to render for this message.
    ///
    /// Only bot messages with a low, moderate or urgent severity get one.
    pub fn badge(&self) -> Option<&'static str> {
        match self.sender {
            Sender::Bot => self.severity.and_then(|s| s.badge()),
            Sender::User => None,
        }
    }
}

// =============================================================================
// History
// =============================================================================

/// One exchange recorded by the analysis backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub ts: DateTime<Utc>,
    pub user: String,
    pub bot: String,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl HistoryTurn {
    pub fn new(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            user: user.into(),
            bot: bot.into(),
            meta: serde_json::Map::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
