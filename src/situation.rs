//! Situation lenses and the narrative payload each one produces.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::analysis::BasicAnalysis;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SituationType {
    Romance,
    Conflict,
    Counseling,
    General,
}

impl SituationType {
    pub const ALL: [SituationType; 4] = [
        SituationType::Romance,
        SituationType::Conflict,
        SituationType::Counseling,
        SituationType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SituationType::Romance => "romance",
            SituationType::Conflict => "conflict",
            SituationType::Counseling => "counseling",
            SituationType::General => "general",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SituationType::Romance => "썸/연애",
            SituationType::Conflict => "갈등/다툼",
            SituationType::Counseling => "고민 상담",
            SituationType::General => "일반 대화",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            SituationType::Romance => "💕",
            SituationType::Conflict => "😤",
            SituationType::Counseling => "🤔",
            SituationType::General => "💬",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SituationType::Romance => "관심도와 호감 신호를 분석해요",
            SituationType::Conflict => "과실 분석과 화해 방법을 알려드려요",
            SituationType::Counseling => "상대가 원하는 반응을 분석해요",
            SituationType::General => "전반적인 관계와 대화 패턴을 분석해요",
        }
    }
}

impl fmt::Display for SituationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SituationType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "romance" => Ok(SituationType::Romance),
            "conflict" => Ok(SituationType::Conflict),
            "counseling" => Ok(SituationType::Counseling),
            "general" => Ok(SituationType::General),
            other => Err(Error::InvalidArgument(format!(
                "Unknown situation type '{}' (expected romance | conflict | counseling | general)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomanceAnalysis {
    /// 0..=100
    pub interest_level: u8,
    pub attraction_signals: Vec<String>,
    pub next_step_advice: String,
    pub red_flags: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultAnalysis {
    pub my_responsibility: u8,
    pub other_responsibility: u8,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherMindAnalysis {
    pub emotional_state: String,
    pub hidden_needs: Vec<String>,
    pub real_intention: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseGuide {
    pub recommended_responses: Vec<String>,
    pub avoid_phrases: Vec<String>,
    pub reconciliation_starter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictAnalysis {
    pub fault_analysis: FaultAnalysis,
    pub other_mind_analysis: OtherMindAnalysis,
    pub response_guide: ResponseGuide,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounselingAnalysis {
    pub what_they_want: String,
    pub empathy_points: Vec<String>,
    pub recommended_responses: Vec<String>,
    pub mistakes_to_avoid: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralAnalysis {
    /// 0..=100
    pub relationship_health: u8,
    pub communication_pattern: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub summary: String,
}

/// Exactly one situation-specific payload, tagged by `situationType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "situationType", rename_all = "lowercase")]
pub enum SituationAnalysis {
    Romance {
        #[serde(rename = "romanceAnalysis")]
        analysis: RomanceAnalysis,
    },
    Conflict {
        #[serde(rename = "conflictAnalysis")]
        analysis: ConflictAnalysis,
    },
    Counseling {
        #[serde(rename = "counselingAnalysis")]
        analysis: CounselingAnalysis,
    },
    General {
        #[serde(rename = "generalAnalysis")]
        analysis: GeneralAnalysis,
    },
}

const FAILED_SUMMARY: &str = "분석을 완료하지 못했습니다.";
const FAILED_NOTICE: &str = "분석 중 오류가 발생했습니다.";
const RETRY_NOTICE: &str = "다시 시도해 주세요.";

impl SituationAnalysis {
    pub fn situation_type(&self) -> SituationType {
        match self {
            SituationAnalysis::Romance { .. } => SituationType::Romance,
            SituationAnalysis::Conflict { .. } => SituationType::Conflict,
            SituationAnalysis::Counseling { .. } => SituationType::Counseling,
            SituationAnalysis::General { .. } => SituationType::General,
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            SituationAnalysis::Romance { analysis } => &analysis.summary,
            SituationAnalysis::Conflict { analysis } => &analysis.summary,
            SituationAnalysis::Counseling { analysis } => &analysis.summary,
            SituationAnalysis::General { analysis } => &analysis.summary,
        }
    }

    /// Payload shown when the narrative step fails.
    pub fn fallback(situation: SituationType) -> Self {
        match situation {
            SituationType::Romance => SituationAnalysis::Romance {
                analysis: RomanceAnalysis {
                    interest_level: 50,
                    attraction_signals: vec![FAILED_NOTICE.to_string()],
                    next_step_advice: RETRY_NOTICE.to_string(),
                    red_flags: Vec::new(),
                    summary: FAILED_SUMMARY.to_string(),
                },
            },
            SituationType::Conflict => SituationAnalysis::Conflict {
                analysis: ConflictAnalysis {
                    fault_analysis: FaultAnalysis {
                        my_responsibility: 50,
                        other_responsibility: 50,
                        reasoning: FAILED_NOTICE.to_string(),
                    },
                    other_mind_analysis: OtherMindAnalysis {
                        emotional_state: "알 수 없음".to_string(),
                        hidden_needs: vec!["분석 실패".to_string()],
                        real_intention: RETRY_NOTICE.to_string(),
                    },
                    response_guide: ResponseGuide {
                        recommended_responses: vec![RETRY_NOTICE.to_string()],
                        avoid_phrases: Vec::new(),
                        reconciliation_starter: String::new(),
                    },
                    summary: FAILED_SUMMARY.to_string(),
                },
            },
            SituationType::Counseling => SituationAnalysis::Counseling {
                analysis: CounselingAnalysis {
                    what_they_want: FAILED_NOTICE.to_string(),
                    empathy_points: vec![RETRY_NOTICE.to_string()],
                    recommended_responses: vec![RETRY_NOTICE.to_string()],
                    mistakes_to_avoid: Vec::new(),
                    summary: FAILED_SUMMARY.to_string(),
                },
            },
            SituationType::General => SituationAnalysis::General {
                analysis: GeneralAnalysis {
                    relationship_health: 50,
                    communication_pattern: FAILED_NOTICE.to_string(),
                    strengths: vec![RETRY_NOTICE.to_string()],
                    improvements: Vec::new(),
                    summary: FAILED_SUMMARY.to_string(),
                },
            },
        }
    }

    /// Parse a model response into the schema of `situation`.
    ///
    /// Accepts surrounding prose or code fences; the outermost `{ ... }` span
    /// must deserialize into the situation's payload.
    pub fn from_response(situation: SituationType, raw: &str) -> Result<Self> {
        let json = extract_json_object(raw)
            .ok_or_else(|| Error::NarrativeError("No JSON found in response".to_string()))?;

        let parsed = match situation {
            SituationType::Romance => SituationAnalysis::Romance {
                analysis: parse_payload(json)?,
            },
            SituationType::Conflict => SituationAnalysis::Conflict {
                analysis: parse_payload(json)?,
            },
            SituationType::Counseling => SituationAnalysis::Counseling {
                analysis: parse_payload(json)?,
            },
            SituationType::General => SituationAnalysis::General {
                analysis: parse_payload(json)?,
            },
        };
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        let out_of_range = |name: &str, value: u8| -> Result<()> {
            if value > 100 {
                return Err(Error::NarrativeError(format!(
                    "{} out of range: {}",
                    name, value
                )));
            }
            Ok(())
        };

        match self {
            SituationAnalysis::Romance { analysis } => {
                out_of_range("interestLevel", analysis.interest_level)
            }
            SituationAnalysis::Conflict { analysis } => {
                out_of_range("myResponsibility", analysis.fault_analysis.my_responsibility)?;
                out_of_range(
                    "otherResponsibility",
                    analysis.fault_analysis.other_responsibility,
                )
            }
            SituationAnalysis::Counseling { .. } => Ok(()),
            SituationAnalysis::General { analysis } => {
                out_of_range("relationshipHealth", analysis.relationship_health)
            }
        }
    }
}

fn parse_payload<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| Error::NarrativeError(format!("Response does not match schema: {}", e)))
}

/// Outermost `{ ... }` span of a model response.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Basic metrics plus one situation-specific narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    #[serde(flatten)]
    pub basic: BasicAnalysis,
    #[serde(flatten)]
    pub situation: SituationAnalysis,
}

impl DetailedAnalysis {
    pub fn new(basic: BasicAnalysis, situation: SituationAnalysis) -> Self {
        Self { basic, situation }
    }

    pub fn situation_type(&self) -> SituationType {
        self.situation.situation_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_situation_type_names() {
        assert_eq!("romance".parse::<SituationType>().unwrap(), SituationType::Romance);
        assert_eq!(" General ".parse::<SituationType>().unwrap(), SituationType::General);
        assert!("business".parse::<SituationType>().is_err());
    }

    #[test]
    fn fallback_matches_requested_situation() {
        for situation in SituationType::ALL {
            let payload = SituationAnalysis::fallback(situation);
            assert_eq!(payload.situation_type(), situation);
            assert_eq!(payload.summary(), "분석을 완료하지 못했습니다.");
        }
    }

    #[test]
    fn parses_romance_response_inside_code_fence() {
        let raw = r#"```json
{
  "interestLevel": 82,
  "attractionSignals": ["먼저 연락함", "질문이 많음"],
  "nextStepAdvice": "주말 약속을 제안해 보세요",
  "redFlags": [],
  "summary": "호감이 보여요"
}
```"#;
        let parsed = SituationAnalysis::from_response(SituationType::Romance, raw).unwrap();
        match parsed {
            SituationAnalysis::Romance { analysis } => {
                assert_eq!(analysis.interest_level, 82);
                assert_eq!(analysis.attraction_signals.len(), 2);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn rejects_response_without_json() {
        let err = SituationAnalysis::from_response(SituationType::General, "죄송합니다").unwrap_err();
        assert!(err.to_string().contains("No JSON"));
    }

    #[test]
    fn rejects_response_with_wrong_schema() {
        let raw = json!({"relationshipHealth": 70}).to_string();
        assert!(SituationAnalysis::from_response(SituationType::General, &raw).is_err());

        // a valid romance document is not a counseling document
        let romance = json!({
            "interestLevel": 10,
            "attractionSignals": [],
            "nextStepAdvice": "",
            "redFlags": [],
            "summary": ""
        })
        .to_string();
        assert!(SituationAnalysis::from_response(SituationType::Counseling, &romance).is_err());
    }

    #[test]
    fn rejects_out_of_range_levels() {
        let raw = json!({
            "relationshipHealth": 180,
            "communicationPattern": "",
            "strengths": [],
            "improvements": [],
            "summary": ""
        })
        .to_string();
        let err = SituationAnalysis::from_response(SituationType::General, &raw).unwrap_err();
        assert!(err.to_string().contains("relationshipHealth"));
    }

    #[test]
    fn extract_json_object_takes_outermost_braces() {
        assert_eq!(
            extract_json_object("결과: {\"a\": {\"b\": 1}} 끝"),
            Some("{\"a\": {\"b\": 1}}")
        );
        assert_eq!(extract_json_object("} {"), None);
        assert_eq!(extract_json_object("none"), None);
    }

    #[test]
    fn situation_payload_serializes_with_tag_and_single_field() {
        let value = serde_json::to_value(SituationAnalysis::fallback(SituationType::Conflict)).unwrap();

        assert_eq!(value["situationType"], "conflict");
        assert_eq!(value["conflictAnalysis"]["faultAnalysis"]["myResponsibility"], 50);
        assert!(value.get("romanceAnalysis").is_none());
    }

    #[test]
    fn situation_options_have_korean_labels() {
        assert_eq!(SituationType::Romance.label(), "썸/연애");
        assert_eq!(SituationType::General.emoji(), "💬");
        assert!(SituationType::ALL.iter().all(|s| !s.description().is_empty()));
    }
}
