//! Instagram JSON export parser.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::decode::decode_export_string;
use super::window::apply_window;
use super::ParseOptions;
use crate::conversation::{Message, ParsedConversation, Platform};
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct InstagramExport {
    participants: Vec<InstagramParticipant>,
    messages: Vec<InstagramMessage>,
}

#[derive(Debug, Deserialize)]
struct InstagramParticipant {
    name: String,
}

/// Attachment fields (`photos`, `videos`, `share`, ...) are ignored.
#[derive(Debug, Deserialize)]
struct InstagramMessage {
    sender_name: String,
    #[serde(default)]
    timestamp_ms: Option<i64>,
    #[serde(default)]
    content: Option<String>,
}

/// Parse an Instagram JSON export.
///
/// The format has already been detected at this point, so JSON that does not
/// match the export structure is reported as [`Error::MalformedExport`].
pub fn parse_instagram(
    json: &str,
    self_name: Option<&str>,
    options: &ParseOptions,
) -> Result<ParsedConversation> {
    let export: InstagramExport =
        serde_json::from_str(json).map_err(|e| Error::MalformedExport(e.to_string()))?;

    let participants: Vec<String> = export
        .participants
        .iter()
        .map(|p| decode_export_string(&p.name))
        .collect();

    let total = export.messages.len();
    let messages: Vec<Message> = export
        .messages
        .into_iter()
        .filter_map(|msg| {
            let content = msg.content.filter(|c| !c.is_empty())?;
            let timestamp = msg
                .timestamp_ms
                .and_then(DateTime::<Utc>::from_timestamp_millis)?;
            Some(Message::new(
                timestamp,
                decode_export_string(&msg.sender_name),
                decode_export_string(&content),
            ))
        })
        .collect();

    debug!(
        total,
        text_messages = messages.len(),
        participants = participants.len(),
        "Parsed Instagram export"
    );

    let messages = apply_window(messages, options.now, options.window);
    Ok(ParsedConversation::new(
        messages,
        participants,
        Platform::Instagram,
        self_name,
        options.now,
    ))
}
