//! `detect` and `participants` commands.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::conversation::{ParsedConversation, Platform};
use crate::parser::{detect_platform, parse_conversation_with, ParseOptions, BYTE_ORDER_MARK};
use crate::{Error, Result};

/// Read an export file, dropping a UTF-8 byte order mark.
pub fn read_export(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::InvalidArgument(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Ok(match content.strip_prefix(BYTE_ORDER_MARK) {
        Some(stripped) => stripped.to_string(),
        None => content,
    })
}

/// Parse an export, turning "unrecognized" into [`Error::UnsupportedFormat`].
pub fn parse_export(
    content: &str,
    self_name: Option<&str>,
    options: &ParseOptions,
) -> Result<ParsedConversation> {
    parse_conversation_with(content, self_name, options)?.ok_or(Error::UnsupportedFormat)
}

pub fn detect(path: &Path) -> Result<Platform> {
    let content = read_export(path)?;
    let platform = detect_platform(&content).ok_or(Error::UnsupportedFormat)?;
    info!(file = %path.display(), %platform, "Detected export format");
    println!("{}", platform);
    Ok(platform)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSummary {
    pub name: String,
    /// Messages inside the analysis window.
    pub messages: usize,
}

/// Participants in first-seen order with their in-window message counts.
pub fn summarize_participants(conversation: &ParsedConversation) -> Vec<ParticipantSummary> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for message in &conversation.messages {
        *counts.entry(message.sender.as_str()).or_default() += 1;
    }

    conversation
        .participants
        .iter()
        .map(|name| ParticipantSummary {
            name: name.clone(),
            messages: counts.get(name.as_str()).copied().unwrap_or(0),
        })
        .collect()
}

pub fn participants(path: &Path, options: &ParseOptions) -> Result<Vec<ParticipantSummary>> {
    let content = read_export(path)?;
    let conversation = parse_export(&content, None, options)?;
    let summary = summarize_participants(&conversation);

    println!(
        "📂 {} ({}, {} messages in window)",
        path.display(),
        conversation.platform,
        conversation.messages.len()
    );
    for participant in &summary {
        println!("  - {} ({})", participant.name, participant.messages);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};
    use tempfile::tempdir;

    fn options() -> ParseOptions {
        ParseOptions::default()
            .with_now(Utc.with_ymd_and_hms(2024, 4, 14, 12, 0, 0).unwrap())
            .with_utc_offset(FixedOffset::east_opt(9 * 3600).unwrap())
    }

    const KAKAO: &str = "\u{feff}민지 님과 카카오톡 대화\n\
2024. 4. 13. 오후 3:10, 상대 : 안녕 뭐해?\n\
2024. 4. 13. 오후 3:12, 민지 : 그냥 있어\n\
2024. 4. 13. 오후 3:15, 상대 : 밥 먹었어?\n";

    #[test]
    fn read_export_strips_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        std::fs::write(&path, KAKAO).unwrap();

        let content = read_export(&path).unwrap();
        assert!(content.starts_with("민지 님과"));
    }

    #[test]
    fn detect_reports_platform_and_rejects_unknown() {
        let dir = tempdir().unwrap();
        let kakao = dir.path().join("kakao.txt");
        let other = dir.path().join("notes.txt");
        std::fs::write(&kakao, KAKAO).unwrap();
        std::fs::write(&other, "just some notes").unwrap();

        assert_eq!(detect(&kakao).unwrap(), Platform::Kakao);
        assert!(matches!(detect(&other), Err(Error::UnsupportedFormat)));
        assert!(detect(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn participants_are_counted_in_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kakao.txt");
        std::fs::write(&path, KAKAO).unwrap();

        let summary = participants(&path, &options()).unwrap();
        assert_eq!(
            summary,
            vec![
                ParticipantSummary {
                    name: "상대".into(),
                    messages: 2
                },
                ParticipantSummary {
                    name: "민지".into(),
                    messages: 1
                },
            ]
        );
    }
}
