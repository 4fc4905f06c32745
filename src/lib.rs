//! Relationship temperature analysis for chat exports
//!
//! This library provides tools to:
//! - Detect and parse KakaoTalk text exports and Instagram JSON exports
//! - Derive per-participant conversation metrics from one participant's side
//! - Score the conversation as a 0..=100 "relationship temperature"
//! - Ask a language model for a situation-specific narrative (OpenAI)
//! - Keep a short history of past analyses and write JSON/Markdown reports

pub mod analysis;
pub mod config;
pub mod conversation;
pub mod error;
pub mod history;
pub mod integrations;
pub mod metrics;
pub mod narrative;
pub mod parser;
pub mod prompts;
pub mod report;
pub mod situation;

// Re-export common types
pub use analysis::{analyze_basic, analyze_basic_with, AnalysisParams, BasicAnalysis};
pub use config::Config;
pub use conversation::{Message, ParsedConversation, Platform};
pub use error::{Error, Result};
pub use integrations::OpenAIClient;
pub use narrative::{NarrativeAnalyzer, NarrativeModel, NarrativeRequest, OpenAINarrator};
pub use parser::{detect_platform, parse_conversation, parse_conversation_with, ParseOptions};
pub use prompts::Prompt;
pub use report::{AnalysisReport, OutputFormat};
pub use situation::{DetailedAnalysis, SituationAnalysis, SituationType};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
