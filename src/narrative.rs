//! Situation-specific narrative analysis through a language model.
//!
//! The model only ever sees the tail of the conversation plus the headline
//! metrics. Whatever goes wrong on the model side (transport, status, empty
//! or unparsable output) ends in the situation's fallback payload; the only
//! hard error is an empty request.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::lexicon::{ME_LABEL, OTHER_LABEL};
use crate::analysis::BasicAnalysis;
use crate::config::OpenAISettings;
use crate::conversation::ParsedConversation;
use crate::integrations::OpenAIClient;
use crate::metrics;
use crate::prompts::{self, Prompt, SYSTEM_PROMPT};
use crate::situation::{DetailedAnalysis, SituationAnalysis, SituationType};
use crate::{Error, Result};

/// Text completion backend.
#[async_trait]
pub trait NarrativeModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// [`NarrativeModel`] backed by OpenAI chat completions.
#[derive(Debug, Clone)]
pub struct OpenAINarrator {
    client: OpenAIClient,
}

impl OpenAINarrator {
    pub fn new(client: OpenAIClient) -> Self {
        Self { client }
    }

    /// Build the client from settings, falling back to `OPENAI_API_KEY`.
    pub fn from_settings(settings: &OpenAISettings) -> Result<Self> {
        OpenAIClient::from_settings(settings).map(Self::new)
    }
}

#[async_trait]
impl NarrativeModel for OpenAINarrator {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        self.client.narrate(system, prompt).await
    }
}

/// One message as the model sees it: side and text only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptLine {
    pub is_me: bool,
    pub content: String,
}

impl TranscriptLine {
    pub fn label(&self) -> &'static str {
        if self.is_me {
            ME_LABEL
        } else {
            OTHER_LABEL
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeRequest {
    pub messages: Vec<TranscriptLine>,
    pub basic: BasicAnalysis,
    pub self_name: String,
    pub situation: SituationType,
}

impl NarrativeRequest {
    /// Keep the last `limit` messages of `conversation`, tagged for `self_name`.
    pub fn from_conversation(
        conversation: &ParsedConversation,
        basic: BasicAnalysis,
        self_name: &str,
        situation: SituationType,
        limit: usize,
    ) -> Self {
        let tagged = conversation.with_perspective(self_name);
        let skip = tagged.len().saturating_sub(limit);
        let messages = tagged
            .into_iter()
            .skip(skip)
            .map(|m| TranscriptLine {
                is_me: m.is_me,
                content: m.content().to_string(),
            })
            .collect();

        Self {
            messages,
            basic,
            self_name: self_name.to_string(),
            situation,
        }
    }

    /// `[나]: ...` / `[상대]: ...`, one line per message.
    pub fn transcript(&self) -> String {
        format_transcript(&self.messages)
    }

    pub fn render_prompt(&self, template: &str) -> String {
        let base_info = prompts::base_info(&self.transcript(), &self.basic);
        prompts::render(template, &base_info)
    }
}

pub fn format_transcript(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|line| format!("[{}]: {}", line.label(), line.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs the narrative step with a pluggable model.
pub struct NarrativeAnalyzer<M> {
    model: M,
    prompts_dir: Option<PathBuf>,
}

impl<M: NarrativeModel> NarrativeAnalyzer<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            prompts_dir: None,
        }
    }

    pub fn with_prompts_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.prompts_dir = dir;
        self
    }

    pub async fn analyze(&self, request: &NarrativeRequest) -> Result<DetailedAnalysis> {
        if request.messages.is_empty() {
            return Err(Error::EmptyConversation);
        }

        let template = Prompt::for_situation(request.situation).template(self.prompts_dir.as_deref());
        let prompt = request.render_prompt(&template);
        debug!(
            situation = %request.situation,
            messages = request.messages.len(),
            prompt_chars = prompt.chars().count(),
            "Requesting narrative analysis"
        );

        let outcome = self
            .model
            .complete(SYSTEM_PROMPT, &prompt)
            .await
            .and_then(|raw| SituationAnalysis::from_response(request.situation, &raw));

        let situation = match outcome {
            Ok(analysis) => {
                info!(situation = %request.situation, "Narrative analysis completed");
                metrics::record_narrative(request.situation.as_str(), false);
                analysis
            }
            Err(e) => {
                warn!(situation = %request.situation, error = %e, "Narrative analysis failed, using fallback");
                metrics::record_narrative(request.situation.as_str(), true);
                SituationAnalysis::fallback(request.situation)
            }
        };

        Ok(DetailedAnalysis::new(request.basic.clone(), situation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_basic;
    use crate::config::Config;
    use crate::conversation::{Message, Platform};
    use chrono::{Duration, TimeZone, Utc};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a canned reply and remembers the prompts it was given.
    struct ScriptedModel {
        reply: Result<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(Error::OpenAiError("status 500".to_string())),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NarrativeModel for ScriptedModel {
        async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
            assert_eq!(system, SYSTEM_PROMPT);
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::OpenAiError(e.to_string())),
            }
        }
    }

    fn conversation(count: usize) -> ParsedConversation {
        let start = Utc.with_ymd_and_hms(2024, 4, 12, 9, 0, 0).unwrap();
        let messages = (0..count)
            .map(|i| {
                let sender = if i % 2 == 0 { "민지" } else { "준호" };
                Message::new(start + Duration::minutes(i as i64), sender, format!("메시지 {}", i))
            })
            .collect();
        ParsedConversation::new(
            messages,
            vec!["민지".into(), "준호".into()],
            Platform::Kakao,
            None,
            start,
        )
    }

    fn request(count: usize, situation: SituationType) -> NarrativeRequest {
        let conv = conversation(count);
        let basic = analyze_basic(&conv, "민지");
        NarrativeRequest::from_conversation(&conv, basic, "민지", situation, 50)
    }

    const GENERAL_REPLY: &str = r#"분석 결과입니다.
{"relationshipHealth": 77, "communicationPattern": "주고받음이 고르다", "strengths": ["빠른 답장"], "improvements": [], "summary": "건강한 관계"}"#;

    #[test]
    fn request_keeps_only_the_tail() {
        let req = request(120, SituationType::General);

        assert_eq!(req.messages.len(), 50);
        assert_eq!(req.messages[0].content, "메시지 70");
        assert_eq!(req.messages[49].content, "메시지 119");
        // 70 is even, so it was sent by 민지
        assert!(req.messages[0].is_me);
    }

    #[test]
    fn transcript_uses_side_labels() {
        let req = request(2, SituationType::General);
        assert_eq!(req.transcript(), "[나]: 메시지 0\n[상대]: 메시지 1");
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let analyzer = NarrativeAnalyzer::new(ScriptedModel::replying(GENERAL_REPLY));
        let err = analyzer
            .analyze(&request(0, SituationType::General))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EmptyConversation));
        assert!(analyzer.model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn parses_model_output_into_payload() {
        let analyzer = NarrativeAnalyzer::new(ScriptedModel::replying(GENERAL_REPLY));
        let req = request(6, SituationType::General);

        let detailed = analyzer.analyze(&req).await.unwrap();

        assert_eq!(detailed.basic, req.basic);
        match detailed.situation {
            SituationAnalysis::General { analysis } => {
                assert_eq!(analysis.relationship_health, 77);
                assert_eq!(analysis.summary, "건강한 관계");
            }
            other => panic!("unexpected payload: {:?}", other),
        }

        let prompts = analyzer.model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("[나]: 메시지 0"));
        assert!(prompts[0].contains("관계 건강도"));
    }

    #[tokio::test]
    async fn model_failure_falls_back() {
        let analyzer = NarrativeAnalyzer::new(ScriptedModel::failing());
        let detailed = analyzer
            .analyze(&request(4, SituationType::Conflict))
            .await
            .unwrap();

        assert_eq!(
            detailed.situation,
            SituationAnalysis::fallback(SituationType::Conflict)
        );
    }

    #[tokio::test]
    async fn schema_mismatch_falls_back() {
        // a general-shaped reply for a romance request
        let analyzer = NarrativeAnalyzer::new(ScriptedModel::replying(GENERAL_REPLY));
        let detailed = analyzer
            .analyze(&request(4, SituationType::Romance))
            .await
            .unwrap();

        assert_eq!(detailed.situation_type(), SituationType::Romance);
        assert_eq!(
            detailed.situation,
            SituationAnalysis::fallback(SituationType::Romance)
        );
    }

    #[tokio::test]
    async fn openai_narrator_round_trip() {
        let server = MockServer::start_async().await;
        let reply = json!({
            "whatTheyWant": "공감",
            "empathyPoints": ["힘든 하루"],
            "recommendedResponses": ["많이 힘들었겠다"],
            "mistakesToAvoid": ["섣부른 조언"],
            "summary": "위로가 필요해요"
        })
        .to_string();

        let mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                body.contains("conversation analyst") && body.contains("공감 대화 전문가")
            });
            then.status(200).json_body(json!({
                "choices": [ { "message": { "role": "assistant", "content": reply } } ]
            }));
        });

        let mut settings = Config::defaults().openai;
        settings.api_key = Some("test_key".to_string());
        settings.base_url = Some(server.base_url());
        let narrator = OpenAINarrator::from_settings(&settings).unwrap();

        let detailed = NarrativeAnalyzer::new(narrator)
            .analyze(&request(3, SituationType::Counseling))
            .await
            .unwrap();

        mock.assert_calls(1);
        match detailed.situation {
            SituationAnalysis::Counseling { analysis } => {
                assert_eq!(analysis.what_they_want, "공감");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn openai_error_status_falls_back() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500).body("boom");
        });

        let mut settings = Config::defaults().openai;
        settings.api_key = Some("test_key".to_string());
        settings.base_url = Some(server.base_url());
        let narrator = OpenAINarrator::from_settings(&settings).unwrap();

        let detailed = NarrativeAnalyzer::new(narrator)
            .analyze(&request(3, SituationType::General))
            .await
            .unwrap();

        assert_eq!(
            detailed.situation,
            SituationAnalysis::fallback(SituationType::General)
        );
    }
}
