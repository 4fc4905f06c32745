//! KakaoTalk text export parser.
//!
//! Message lines look like `2024. 4. 12. 오후 3:10, 민지 : 안녕` or
//! `2024년 4월 12일 오후 3:10 - 민지: 안녕`. Anything else is skipped.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use super::window::apply_window;
use super::{ParseOptions, BYTE_ORDER_MARK};
use crate::conversation::{Message, ParsedConversation, Platform};

static MESSAGE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s*[-,]\s*(.+?):\s*(.+)$").expect("invalid message line pattern")
});

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^([0-9]{4})\.\s*([0-9]{1,2})\.\s*([0-9]{1,2})\.\s*(오전|오후)\s*([0-9]{1,2}):([0-9]{2})",
        r"^([0-9]{4})년\s*([0-9]{1,2})월\s*([0-9]{1,2})일\s*(오전|오후)\s*([0-9]{1,2}):([0-9]{2})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid date pattern"))
    .collect()
});

/// Join/leave notifications that carry no conversational content.
const SYSTEM_MESSAGES: &[&str] = &["님이 들어왔습니다", "님이 나갔습니다", "채팅방을 나갔습니다"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "오전" => Some(Meridiem::Am),
            "오후" => Some(Meridiem::Pm),
            _ => None,
        }
    }

    /// Convert a 12-hour clock hour to 24-hour.
    pub fn to_24_hour(self, hour: u32) -> u32 {
        match (self, hour) {
            (Meridiem::Pm, h) if h != 12 => h + 12,
            (Meridiem::Am, 12) => 0,
            (_, h) => h,
        }
    }
}

/// True if the line starts with a KakaoTalk date header.
pub fn is_date_line(line: &str) -> bool {
    let line = line.trim_start_matches(|c: char| c.is_whitespace() || c == BYTE_ORDER_MARK);
    DATE_PATTERNS.iter().any(|p| p.is_match(line))
}

/// Parse a date header in either grammar, interpreting it in `offset`.
pub fn parse_kakao_date(header: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    DATE_PATTERNS
        .iter()
        .find_map(|p| p.captures(header))
        .and_then(|caps| build_timestamp(&caps, offset))
}

fn build_timestamp(caps: &Captures<'_>, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    let meridiem = Meridiem::from_marker(&caps[4])?;
    let hour = meridiem.to_24_hour(caps[5].parse().ok()?);
    let minute: u32 = caps[6].parse().ok()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    offset
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn is_system_message(content: &str) -> bool {
    SYSTEM_MESSAGES.iter().any(|phrase| content.contains(phrase))
}

/// Parse a KakaoTalk text export. Never fails: unmatched lines are skipped.
pub fn parse_kakao(content: &str, self_name: Option<&str>, options: &ParseOptions) -> ParsedConversation {
    let mut messages = Vec::new();
    let mut participants: Vec<String> = Vec::new();
    let mut skipped = 0usize;

    for line in content.lines() {
        let trimmed = line.trim_matches(|c: char| c.is_whitespace() || c == BYTE_ORDER_MARK);
        if trimmed.is_empty() {
            continue;
        }

        let Some(caps) = MESSAGE_LINE.captures(trimmed) else {
            skipped += 1;
            continue;
        };

        let Some(timestamp) = parse_kakao_date(&caps[1], &options.utc_offset) else {
            skipped += 1;
            continue;
        };

        let sender = caps[2].trim();
        let body = caps[3].trim();
        if sender.is_empty() || body.is_empty() {
            skipped += 1;
            continue;
        }

        if !participants.iter().any(|p| p == sender) {
            participants.push(sender.to_string());
        }

        if is_system_message(body) {
            continue;
        }

        messages.push(Message::new(timestamp, sender, body));
    }

    debug!(
        parsed = messages.len(),
        skipped,
        participants = participants.len(),
        "Parsed KakaoTalk export"
    );

    let messages = apply_window(messages, options.now, options.window);
    ParsedConversation::new(messages, participants, Platform::Kakao, self_name, options.now)
}
