//! Normalized conversation model shared by both export parsers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Export format a conversation was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Line-based text export (`<date>, <sender> : <text>`).
    Kakao,
    /// JSON export with `participants` and `messages`.
    Instagram,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Kakao => "kakao",
            Platform::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message. Who "I" am is not part of the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub content: String,
}

impl Message {
    pub fn new(timestamp: DateTime<Utc>, sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            timestamp,
            sender: sender.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Result of parsing one uploaded export.
///
/// `messages` is sorted ascending by timestamp and `date_range` spans the
/// first and last message (or collapses to the parse time when empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConversation {
    pub messages: Vec<Message>,
    pub participants: Vec<String>,
    pub platform: Platform,
    pub date_range: DateRange,
    /// Self-name supplied at parse time, if any. Used as the default perspective.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_name: Option<String>,
}

impl ParsedConversation {
    /// Build a conversation from already filtered, sorted messages.
    pub fn new(
        messages: Vec<Message>,
        participants: Vec<String>,
        platform: Platform,
        self_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let date_range = DateRange {
            start: messages.first().map_or(now, |m| m.timestamp),
            end: messages.last().map_or(now, |m| m.timestamp),
        };

        Self {
            messages,
            participants,
            platform,
            date_range,
            self_name: self_name.map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_participant(&self, name: &str) -> bool {
        self.participants.iter().any(|p| p == name)
    }

    /// Tag every message with `is_me` relative to `self_name`.
    pub fn with_perspective<'a>(&'a self, self_name: &str) -> Vec<TaggedMessage<'a>> {
        with_perspective(&self.messages, self_name)
    }

    /// Perspective of the self-name recorded at parse time, if one was given.
    pub fn default_perspective(&self) -> Option<Vec<TaggedMessage<'_>>> {
        self.self_name
            .as_deref()
            .map(|name| self.with_perspective(name))
    }
}

/// Borrowed view of a message seen from one participant's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedMessage<'a> {
    pub message: &'a Message,
    pub is_me: bool,
}

impl<'a> TaggedMessage<'a> {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.message.timestamp
    }

    pub fn content(&self) -> &'a str {
        &self.message.content
    }

    pub fn sender(&self) -> &'a str {
        &self.message.sender
    }
}

pub fn with_perspective<'a>(messages: &'a [Message], self_name: &str) -> Vec<TaggedMessage<'a>> {
    messages
        .iter()
        .map(|message| TaggedMessage {
            message,
            is_me: message.sender == self_name,
        })
        .collect()
}
