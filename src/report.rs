//! Analysis reports written to disk as JSON and/or Markdown.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::BasicAnalysis;
use crate::conversation::{DateRange, ParsedConversation, Platform};
use crate::situation::{DetailedAnalysis, SituationAnalysis};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    Markdown,
    #[default]
    Both,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "both" => Ok(OutputFormat::Both),
            other => Err(Error::InvalidArgument(format!(
                "Unknown output format '{}' (expected json | markdown | both)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Both => "both",
        })
    }
}

/// Metrics only, or metrics plus a situation narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisBody {
    Detailed(DetailedAnalysis),
    Basic(BasicAnalysis),
}

impl AnalysisBody {
    pub fn basic(&self) -> &BasicAnalysis {
        match self {
            AnalysisBody::Detailed(detailed) => &detailed.basic,
            AnalysisBody::Basic(basic) => basic,
        }
    }

    pub fn narrative(&self) -> Option<&SituationAnalysis> {
        match self {
            AnalysisBody::Detailed(detailed) => Some(&detailed.situation),
            AnalysisBody::Basic(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Name of the analyzed export file.
    pub source: String,
    pub platform: Platform,
    pub participants: Vec<String>,
    pub self_name: String,
    pub date_range: DateRange,
    pub analyzed_at: DateTime<Utc>,
    /// Change against the previous saved analysis, in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_change: Option<i16>,
    pub analysis: AnalysisBody,
}

impl AnalysisReport {
    pub fn new(
        source: impl Into<String>,
        conversation: &ParsedConversation,
        self_name: &str,
        analysis: AnalysisBody,
        analyzed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            platform: conversation.platform,
            participants: conversation.participants.clone(),
            self_name: self_name.to_string(),
            date_range: conversation.date_range,
            analyzed_at,
            temperature_change: None,
            analysis,
        }
    }

    pub fn with_temperature_change(mut self, change: Option<i16>) -> Self {
        self.temperature_change = change;
        self
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn save_markdown(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        std::fs::write(path, self.to_markdown())?;
        Ok(())
    }

    pub fn to_markdown(&self) -> String {
        let basic = self.analysis.basic();
        let mut lines = Vec::new();

        lines.push("# 🌡️ 대화 온도 리포트".to_string());
        lines.push(String::new());
        lines.push(format!("**파일:** {}", self.source));
        lines.push(format!("**플랫폼:** {}", self.platform));
        lines.push(format!("**참여자:** {}", self.participants.join(", ")));
        lines.push(format!("**기준 참여자:** {}", self.self_name));
        lines.push(format!(
            "**기간:** {} → {}",
            self.date_range.start.format("%Y-%m-%d %H:%M"),
            self.date_range.end.format("%Y-%m-%d %H:%M")
        ));
        lines.push(format!(
            "**분석 시각:** {}",
            self.analyzed_at.format("%Y-%m-%d %H:%M:%S")
        ));
        lines.push(String::new());

        lines.push("## 🌡️ 관계 온도".to_string());
        lines.push(String::new());
        lines.push(format!(
            "- **온도:** {}°C ({})",
            basic.temperature, basic.temperature_label
        ));
        if let Some(change) = self.temperature_change {
            lines.push(format!("- **지난 분석 대비:** {:+}°C", change));
        }
        lines.push(String::new());

        lines.push("## 📊 대화 지표".to_string());
        lines.push(String::new());
        lines.push("| 지표 | 나 | 상대 |".to_string());
        lines.push("|---|---|---|".to_string());
        let rows: [(&str, String, String); 9] = [
            (
                "메시지 수",
                basic.message_count.me.to_string(),
                basic.message_count.other.to_string(),
            ),
            (
                "대화 비중 (%)",
                basic.initiative_ratio.me.to_string(),
                basic.initiative_ratio.other.to_string(),
            ),
            (
                "평균 응답 속도 (분)",
                basic.response_speed.me.to_string(),
                basic.response_speed.other.to_string(),
            ),
            (
                "평균 길이 (자)",
                basic.average_length.me.to_string(),
                basic.average_length.other.to_string(),
            ),
            (
                "이모지",
                basic.emoji_count.me.to_string(),
                basic.emoji_count.other.to_string(),
            ),
            (
                "질문 비율 (%)",
                basic.question_ratio.me.to_string(),
                basic.question_ratio.other.to_string(),
            ),
            (
                "자기 개방 (%)",
                basic.self_disclosure.me.to_string(),
                basic.self_disclosure.other.to_string(),
            ),
            (
                "감정 점수",
                basic.sentiment_score.me.to_string(),
                basic.sentiment_score.other.to_string(),
            ),
            (
                "대화 시작",
                basic.conversation_initiation.me.to_string(),
                basic.conversation_initiation.other.to_string(),
            ),
        ];
        for (name, me, other) in rows {
            lines.push(format!("| {} | {} | {} |", name, me, other));
        }
        lines.push(String::new());
        lines.push(format!("- **언어 미러링:** {}", basic.linguistic_mirroring));
        lines.push(format!("- **전체 메시지:** {}", basic.message_count.total));
        lines.push(String::new());

        if let Some(narrative) = self.analysis.narrative() {
            narrative_markdown(narrative, &mut lines);
        }

        lines.join("\n")
    }
}

fn bullet_list(title: &str, items: &[String], lines: &mut Vec<String>) {
    lines.push(format!("### {}", title));
    lines.push(String::new());
    if items.is_empty() {
        lines.push("- (없음)".to_string());
    } else {
        lines.extend(items.iter().map(|item| format!("- {}", item)));
    }
    lines.push(String::new());
}

fn narrative_markdown(narrative: &SituationAnalysis, lines: &mut Vec<String>) {
    let situation = narrative.situation_type();
    lines.push(format!("## {} {} 분석", situation.emoji(), situation.label()));
    lines.push(String::new());

    match narrative {
        SituationAnalysis::Romance { analysis } => {
            lines.push(format!("- **관심도:** {}/100", analysis.interest_level));
            lines.push(format!("- **다음 단계:** {}", analysis.next_step_advice));
            lines.push(String::new());
            bullet_list("💗 호감 신호", &analysis.attraction_signals, lines);
            bullet_list("🚩 주의 신호", &analysis.red_flags, lines);
        }
        SituationAnalysis::Conflict { analysis } => {
            let fault = &analysis.fault_analysis;
            lines.push(format!(
                "- **책임 비율:** 나 {}% / 상대 {}%",
                fault.my_responsibility, fault.other_responsibility
            ));
            lines.push(format!("- **근거:** {}", fault.reasoning));
            lines.push(format!(
                "- **상대의 감정:** {}",
                analysis.other_mind_analysis.emotional_state
            ));
            lines.push(format!(
                "- **상대의 진심:** {}",
                analysis.other_mind_analysis.real_intention
            ));
            lines.push(String::new());
            bullet_list(
                "🫧 상대가 원하는 것",
                &analysis.other_mind_analysis.hidden_needs,
                lines,
            );
            bullet_list(
                "✅ 추천 답변",
                &analysis.response_guide.recommended_responses,
                lines,
            );
            bullet_list("⛔ 피해야 할 말", &analysis.response_guide.avoid_phrases, lines);
            if !analysis.response_guide.reconciliation_starter.is_empty() {
                lines.push(format!(
                    "**화해의 첫 마디:** {}",
                    analysis.response_guide.reconciliation_starter
                ));
                lines.push(String::new());
            }
        }
        SituationAnalysis::Counseling { analysis } => {
            lines.push(format!("- **상대가 원하는 것:** {}", analysis.what_they_want));
            lines.push(String::new());
            bullet_list("🤝 공감 포인트", &analysis.empathy_points, lines);
            bullet_list("✅ 추천 답변", &analysis.recommended_responses, lines);
            bullet_list("⛔ 피해야 할 실수", &analysis.mistakes_to_avoid, lines);
        }
        SituationAnalysis::General { analysis } => {
            lines.push(format!(
                "- **관계 건강도:** {}/100",
                analysis.relationship_health
            ));
            lines.push(format!(
                "- **소통 패턴:** {}",
                analysis.communication_pattern
            ));
            lines.push(String::new());
            bullet_list("💪 강점", &analysis.strengths, lines);
            bullet_list("🌱 개선점", &analysis.improvements, lines);
        }
    }

    lines.push("### 📋 요약".to_string());
    lines.push(String::new());
    lines.push(narrative.summary().to_string());
    lines.push(String::new());
}

/// Write the report in `format` under `output_dir`. Returns written paths.
pub fn write_outputs(
    report: &AnalysisReport,
    output_dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    ensure_dir(output_dir)?;
    let stem = Path::new(&report.source)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("chat");
    let base = format!(
        "{}_{}",
        sanitize_filename(stem),
        report.analyzed_at.format("%Y%m%d_%H%M%S")
    );

    let mut written = Vec::new();
    if matches!(format, OutputFormat::Json | OutputFormat::Both) {
        let path = output_dir.join(format!("{base}.json"));
        report.save_json(&path)?;
        info!("Saved JSON: {}", path.display());
        written.push(path);
    }
    if matches!(format, OutputFormat::Markdown | OutputFormat::Both) {
        let path = output_dir.join(format!("{base}.md"));
        report.save_markdown(&path)?;
        info!("Saved Markdown: {}", path.display());
        written.push(path);
    }

    Ok(written)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| {
        Error::InvalidArgument(format!("Failed to create dir {}: {}", path.display(), e))
    })
}

/// Keep letters (any script), digits, `-` and `_`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "chat".to_string()
    } else {
        cleaned
    }
}
