//! Narrative prompt templates.
//!
//! One Markdown template per situation lives in `prompts/`. The templates are
//! compiled in as a fallback, so a missing or unreadable directory never stops
//! the narrative step.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::analysis::BasicAnalysis;
use crate::situation::SituationType;
use crate::{Error, Result};

/// System message sent with every narrative request.
pub const SYSTEM_PROMPT: &str = "You are a conversation analyst. Always respond in valid JSON format only. Use Korean language for all text values.";

/// Marker replaced by the transcript and metric summary.
pub const BASE_INFO_PLACEHOLDER: &str = "{{BASE_INFO}}";

/// Available prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Romance,
    Conflict,
    Counseling,
    General,
}

impl Prompt {
    pub fn for_situation(situation: SituationType) -> Self {
        match situation {
            SituationType::Romance => Prompt::Romance,
            SituationType::Conflict => Prompt::Conflict,
            SituationType::Counseling => Prompt::Counseling,
            SituationType::General => Prompt::General,
        }
    }

    /// Prompt file name (Markdown).
    pub fn filename(&self) -> &'static str {
        match self {
            Prompt::Romance => "romance.md",
            Prompt::Conflict => "conflict.md",
            Prompt::Counseling => "counseling.md",
            Prompt::General => "general.md",
        }
    }

    /// Template shipped with the binary.
    pub fn builtin(&self) -> &'static str {
        match self {
            Prompt::Romance => include_str!("../prompts/romance.md"),
            Prompt::Conflict => include_str!("../prompts/conflict.md"),
            Prompt::Counseling => include_str!("../prompts/counseling.md"),
            Prompt::General => include_str!("../prompts/general.md"),
        }
    }

    /// Load the prompt from the default prompts directory.
    pub fn load(&self) -> Result<String> {
        self.load_from(&prompts_dir())
    }

    pub fn load_from(&self, dir: &Path) -> Result<String> {
        load_prompt(dir, self.filename())
    }

    /// Template from `dir` (or the default directory), else the built-in one.
    pub fn template(&self, dir: Option<&Path>) -> String {
        let loaded = match dir {
            Some(dir) => self.load_from(dir),
            None => self.load(),
        };

        match loaded {
            Ok(template) if template.contains(BASE_INFO_PLACEHOLDER) => template,
            Ok(_) => {
                warn!(
                    prompt = self.filename(),
                    "Prompt override has no {} marker, using built-in template",
                    BASE_INFO_PLACEHOLDER
                );
                self.builtin().to_string()
            }
            Err(e) => {
                debug!(prompt = self.filename(), error = %e, "Using built-in prompt");
                self.builtin().to_string()
            }
        }
    }
}

/// Load a prompt by file name.
pub fn load_prompt(dir: &Path, filename: &str) -> Result<String> {
    let path = dir.join(filename);
    std::fs::read_to_string(&path)
        .map_err(|e| Error::ConfigError(format!("Failed to load prompt {}: {}", path.display(), e)))
}

/// Path to the prompts directory.
pub fn prompts_dir() -> PathBuf {
    let candidates = [
        PathBuf::from("prompts"),
        PathBuf::from("../prompts"),
        PathBuf::from("../../prompts"),
    ];

    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    PathBuf::from("prompts")
}

pub fn list_prompts() -> Vec<Prompt> {
    vec![
        Prompt::Romance,
        Prompt::Conflict,
        Prompt::Counseling,
        Prompt::General,
    ]
}

/// Transcript plus the headline metrics, in the layout the templates expect.
pub fn base_info(transcript: &str, basic: &BasicAnalysis) -> String {
    format!(
        "대화 내용:\n{}\n\n기본 분석 결과:\n\
         - 관계 온도: {}°C\n\
         - 내 메시지 수: {}개\n\
         - 상대 메시지 수: {}개\n\
         - 내 평균 응답 속도: {}분\n\
         - 상대 평균 응답 속도: {}분",
        transcript,
        basic.temperature,
        basic.message_count.me,
        basic.message_count.other,
        basic.response_speed.me,
        basic.response_speed.other,
    )
}

pub fn render(template: &str, base_info: &str) -> String {
    template.replace(BASE_INFO_PLACEHOLDER, base_info)
}
