//! Error types for the chat temperature analyzer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported file format")]
    UnsupportedFormat,

    #[error("Malformed export: {0}")]
    MalformedExport(String),

    #[error("No messages to analyze")]
    EmptyConversation,

    #[error("Participant not found in conversation: {0}")]
    UnknownParticipant(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("OpenAI API error: {0}")]
    OpenAiError(String),

    #[error("Narrative analysis error: {0}")]
    NarrativeError(String),

    #[error("History store error: {0}")]
    HistoryError(String),

    #[error("Failed to acquire history lock: {0}")]
    LockError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unsupported_format() {
        let err = Error::UnsupportedFormat;
        assert!(err.to_string().contains("Unsupported file format"));
    }

    #[test]
    fn test_error_display_malformed_export() {
        let err = Error::MalformedExport("missing field `messages`".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Malformed export"));
        assert!(msg.contains("messages"));
    }

    #[test]
    fn test_error_display_unknown_participant() {
        let err = Error::UnknownParticipant("민지".to_string());
        assert!(err.to_string().contains("Participant not found"));
        assert!(err.to_string().contains("민지"));
    }

    #[test]
    fn test_error_display_openai_error() {
        let err = Error::OpenAiError("rate limit exceeded".to_string());
        assert!(err.to_string().contains("OpenAI"));
        assert!(err.to_string().contains("rate limit"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();

        assert!(matches!(err, Error::SerializationError(_)));
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_error_display_lock_error() {
        let err = Error::LockError("timeout".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Failed to acquire history lock"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn test_error_all_variants_debug() {
        let variants: Vec<Error> = vec![
            Error::UnsupportedFormat,
            Error::MalformedExport("json".to_string()),
            Error::EmptyConversation,
            Error::UnknownParticipant("name".to_string()),
            Error::SerializationError("serial".to_string()),
            Error::OpenAiError("openai".to_string()),
            Error::NarrativeError("narrative".to_string()),
            Error::HistoryError("history".to_string()),
            Error::LockError("lock".to_string()),
            Error::ConfigError("config".to_string()),
            Error::InvalidArgument("arg".to_string()),
        ];

        for err in variants {
            let debug_str = format!("{:?}", err);
            assert!(!debug_str.is_empty());
        }
    }

    #[test]
    fn test_result_unwrap_or_else() {
        let result: Result<i32> = Err(Error::EmptyConversation);
        let value = result.unwrap_or_else(|_| 42);
        assert_eq!(value, 42);
    }
}
