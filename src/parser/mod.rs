//! Chat export parsing.
//!
//! Two export formats are understood:
//! - KakaoTalk text exports, one message per line (see [`kakao`])
//! - Instagram JSON exports with `participants` and `messages` (see [`instagram`])
//!
//! Both parsers emit a [`ParsedConversation`] restricted to the trailing
//! analysis window and sorted by timestamp.

pub mod decode;
pub mod instagram;
pub mod kakao;
pub mod window;

use chrono::{DateTime, Duration, FixedOffset, Local, Utc};
use serde_json::Value;
use tracing::debug;

use crate::conversation::{ParsedConversation, Platform};
use crate::Result;

pub use instagram::parse_instagram;
pub use kakao::parse_kakao;

/// Default trailing window, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Substrings found in KakaoTalk export headers.
const KAKAO_HEADER_MARKERS: &[&str] = &["님과 카카오톡 대화", "저장한 날짜"];

/// Options shared by both parsers.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Reference "now" for the trailing window.
    pub now: DateTime<Utc>,
    /// Length of the trailing window.
    pub window: Duration,
    /// Offset used to interpret wall-clock times in text exports.
    pub utc_offset: FixedOffset,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            now: Utc::now(),
            window: Duration::days(DEFAULT_WINDOW_DAYS),
            utc_offset: *Local::now().offset(),
        }
    }
}

impl ParseOptions {
    /// Out-of-range day counts saturate; use [`window::window_from_days`]
    /// to reject them instead.
    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window = Duration::try_days(days).unwrap_or(if days < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        });
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

/// UTF-8 byte order mark some exporters put in front of the file.
pub const BYTE_ORDER_MARK: char = '\u{feff}';

/// `content` without a leading byte order mark.
pub fn strip_bom(content: &str) -> &str {
    content.strip_prefix(BYTE_ORDER_MARK).unwrap_or(content)
}

/// Classify raw export content. `None` means the format is not supported.
pub fn detect_platform(content: &str) -> Option<Platform> {
    let content = strip_bom(content);
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(content) {
        if is_truthy(map.get("messages")) && is_truthy(map.get("participants")) {
            debug!("Detected JSON export with messages and participants");
            return Some(Platform::Instagram);
        }
    }

    if content.lines().any(kakao::is_date_line) {
        debug!("Detected KakaoTalk date line");
        return Some(Platform::Kakao);
    }

    if KAKAO_HEADER_MARKERS
        .iter()
        .any(|marker| content.contains(marker))
    {
        debug!("Detected KakaoTalk export header");
        return Some(Platform::Kakao);
    }

    None
}

/// Detect the format and parse with default options.
///
/// Returns `Ok(None)` when the format is not recognized. A JSON export that
/// was detected but does not match the expected structure is an error.
pub fn parse_conversation(
    content: &str,
    self_name: Option<&str>,
) -> Result<Option<ParsedConversation>> {
    parse_conversation_with(content, self_name, &ParseOptions::default())
}

pub fn parse_conversation_with(
    content: &str,
    self_name: Option<&str>,
    options: &ParseOptions,
) -> Result<Option<ParsedConversation>> {
    let content = strip_bom(content);
    match detect_platform(content) {
        Some(Platform::Kakao) => Ok(Some(parse_kakao(content, self_name, options))),
        Some(Platform::Instagram) => parse_instagram(content, self_name, options).map(Some),
        None => Ok(None),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn options() -> ParseOptions {
        ParseOptions::default()
            .with_now(Utc.with_ymd_and_hms(2024, 4, 14, 12, 0, 0).unwrap())
            .with_utc_offset(FixedOffset::east_opt(9 * 3600).unwrap())
    }

    #[test]
    fn detects_instagram_json() {
        let content = r#"{"participants":[{"name":"a"}],"messages":[]}"#;
        assert_eq!(detect_platform(content), Some(Platform::Instagram));
    }

    #[test]
    fn json_without_participants_is_not_instagram() {
        assert_eq!(detect_platform(r#"{"messages":[]}"#), None);
        assert_eq!(
            detect_platform(r#"{"messages":[],"participants":null}"#),
            None
        );
    }

    #[test]
    fn detects_kakao_date_line_anywhere() {
        let content = "대화 내보내기\n2024. 4. 12. 오후 3:10, 민지 : 안녕";
        assert_eq!(detect_platform(content), Some(Platform::Kakao));
    }

    #[test]
    fn detects_date_line_after_leading_prose() {
        // every line is checked, not only the start of the content
        let content = "내보낸 대화 기록입니다\n\n2024. 4. 12. 오후 3:10, 민지 : 안녕";
        assert_eq!(detect_platform(content), Some(Platform::Kakao));

        let mid_line = "메모: 2024. 4. 12. 오후 3:10, 민지 : 안녕";
        assert_eq!(detect_platform(mid_line), None);
    }

    #[test]
    fn detects_formats_behind_byte_order_mark() {
        let kakao = "\u{feff}2024. 4. 12. 오후 3:10, 민지 : 안녕";
        assert_eq!(detect_platform(kakao), Some(Platform::Kakao));

        let json = "\u{feff}{\"participants\":[{\"name\":\"a\"}],\"messages\":[]}";
        assert_eq!(detect_platform(json), Some(Platform::Instagram));
    }

    #[test]
    fn byte_order_mark_does_not_cost_the_first_message() {
        let content = "\u{feff}2024. 4. 13. 오전 9:00, 민지 : 첫째\n2024. 4. 13. 오전 9:01, 상대 : 둘째";
        let parsed = parse_conversation_with(content, None, &options())
            .unwrap()
            .unwrap();

        let contents: Vec<&str> = parsed.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["첫째", "둘째"]);
    }

    #[test]
    fn huge_window_parses_without_overflow() {
        let content = "2024. 4. 13. 오전 9:00, 민지 : 첫째\n1999. 1. 1. 오전 9:00, 상대 : 옛날";
        let parsed = parse_conversation_with(content, None, &options().with_window_days(1_000_000_000))
            .unwrap()
            .unwrap();

        assert_eq!(parsed.messages.len(), 2);
        assert_eq!(parsed.messages[0].content, "옛날");
    }

    #[test]
    fn detects_kakao_header_without_date_lines() {
        let content = "민지 님과 카카오톡 대화\n(truncated)";
        assert_eq!(detect_platform(content), Some(Platform::Kakao));
    }

    #[test]
    fn unknown_content_is_none() {
        assert_eq!(detect_platform("hello world"), None);
        assert_eq!(detect_platform(""), None);
    }

    #[test]
    fn parse_conversation_returns_none_for_unknown() {
        let parsed = parse_conversation_with("plain text", None, &options()).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_conversation_dispatches_by_format() {
        let kakao = "2024. 4. 13. 오전 9:00, 민지 : 좋은 아침";
        let parsed = parse_conversation_with(kakao, Some("민지"), &options())
            .unwrap()
            .unwrap();
        assert_eq!(parsed.platform, Platform::Kakao);
        assert_eq!(parsed.messages.len(), 1);
        assert_eq!(parsed.self_name.as_deref(), Some("민지"));
    }

    #[test]
    fn malformed_instagram_export_is_fatal() {
        let content = r#"{"participants":"nope","messages":[1,2]}"#;
        let err = parse_conversation_with(content, None, &options()).unwrap_err();
        assert!(matches!(err, crate::Error::MalformedExport(_)));
    }
}
