//! Heuristic conversation analysis
//!
//! Provides:
//! - Linguistic and behavioral feature extraction per participant
//! - The relationship temperature model
//! - [`analyze_basic`], which bundles both into a [`BasicAnalysis`]

pub mod features;
pub mod lexicon;
pub mod scoring;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::conversation::ParsedConversation;
use features::Party;
use lexicon::MINUTES_UNIT;

pub use scoring::{temperature_label, ScoreInputs, TemperatureBand};

/// Default silence that makes the next message an initiation.
pub const DEFAULT_INITIATION_GAP_MINUTES: i64 = 30;
/// Replies slower than this are treated as outliers.
pub const DEFAULT_MAX_RESPONSE_GAP_HOURS: i64 = 24;

/// Round half up, the way the score bands were calibrated.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// A metric measured separately for "me" and "the other party".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paired<T> {
    pub me: T,
    pub other: T,
}

impl<T> Paired<T> {
    pub fn new(me: T, other: T) -> Self {
        Self { me, other }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCount {
    pub me: usize,
    pub other: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSpeed {
    pub me: i64,
    pub other: i64,
    pub unit: String,
}

/// Tunable thresholds of the feature extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisParams {
    pub initiation_gap: Duration,
    pub max_response_gap: Duration,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            initiation_gap: Duration::minutes(DEFAULT_INITIATION_GAP_MINUTES),
            max_response_gap: Duration::hours(DEFAULT_MAX_RESPONSE_GAP_HOURS),
        }
    }
}

/// Derived metrics for one conversation seen from one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicAnalysis {
    pub temperature: u8,
    pub temperature_label: String,
    pub response_speed: ResponseSpeed,
    pub message_count: MessageCount,
    /// Share of all messages, in percent.
    pub initiative_ratio: Paired<i64>,
    pub average_length: Paired<i64>,
    pub emoji_count: Paired<usize>,
    /// Reuse of the other party's expressions, 0..=100.
    pub linguistic_mirroring: i64,
    pub question_ratio: Paired<i64>,
    pub self_disclosure: Paired<i64>,
    /// -100..=100
    pub sentiment_score: Paired<i64>,
    pub conversation_initiation: Paired<usize>,
}

impl BasicAnalysis {
    pub fn band(&self) -> TemperatureBand {
        TemperatureBand::from_temperature(self.temperature)
    }

    /// The subset of metrics the scoring model consumes.
    pub fn score_inputs(&self) -> ScoreInputs {
        ScoreInputs {
            message_count: Paired::new(self.message_count.me, self.message_count.other),
            response_speed: Paired::new(self.response_speed.me, self.response_speed.other),
            question_ratio: self.question_ratio,
            self_disclosure: self.self_disclosure,
            sentiment: self.sentiment_score,
            mirroring: self.linguistic_mirroring,
            initiation: self.conversation_initiation,
            emoji_count: self.emoji_count,
        }
    }
}

/// Analyze `conversation` from the point of view of `self_name`.
pub fn analyze_basic(conversation: &ParsedConversation, self_name: &str) -> BasicAnalysis {
    analyze_basic_with(conversation, self_name, &AnalysisParams::default())
}

pub fn analyze_basic_with(
    conversation: &ParsedConversation,
    self_name: &str,
    params: &AnalysisParams,
) -> BasicAnalysis {
    let tagged = conversation.with_perspective(self_name);
    let (mine, theirs) = features::split_by_party(&tagged);

    let message_count = MessageCount {
        me: mine.len(),
        other: theirs.len(),
        total: tagged.len(),
    };

    let initiative_ratio = if message_count.total > 0 {
        let share = |n: usize| round_half_up(n as f64 / message_count.total as f64 * 100.0);
        Paired::new(share(message_count.me), share(message_count.other))
    } else {
        Paired::new(50, 50)
    };

    let response_speed = ResponseSpeed {
        me: round_half_up(features::average_response_minutes(
            &tagged,
            Party::Me,
            params.max_response_gap,
        )),
        other: round_half_up(features::average_response_minutes(
            &tagged,
            Party::Other,
            params.max_response_gap,
        )),
        unit: MINUTES_UNIT.to_string(),
    };

    let mut analysis = BasicAnalysis {
        temperature: 0,
        temperature_label: String::new(),
        response_speed,
        message_count,
        initiative_ratio,
        average_length: Paired::new(
            features::average_length(&mine),
            features::average_length(&theirs),
        ),
        emoji_count: Paired::new(features::emoji_count(&mine), features::emoji_count(&theirs)),
        linguistic_mirroring: features::linguistic_mirroring(&mine, &theirs),
        question_ratio: Paired::new(
            features::question_ratio(&mine),
            features::question_ratio(&theirs),
        ),
        self_disclosure: Paired::new(
            features::self_disclosure_ratio(&mine),
            features::self_disclosure_ratio(&theirs),
        ),
        sentiment_score: Paired::new(
            features::sentiment_score(&mine),
            features::sentiment_score(&theirs),
        ),
        conversation_initiation: Paired::new(
            features::initiation_count(&tagged, Party::Me, params.initiation_gap),
            features::initiation_count(&tagged, Party::Other, params.initiation_gap),
        ),
    };

    analysis.temperature = scoring::temperature(&analysis.score_inputs());
    analysis.temperature_label = temperature_label(analysis.temperature).to_string();
    analysis
}
