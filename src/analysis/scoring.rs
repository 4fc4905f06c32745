//! Relationship temperature scoring.
//!
//! Starts from a neutral 50 and applies eight bounded adjustments in a fixed
//! order. Only the final value is clamped to 0..=100.

use serde::{Deserialize, Serialize};

use super::{round_half_up, Paired};

pub const BASELINE: f64 = 50.0;

/// Everything the scoring model looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    pub message_count: Paired<usize>,
    /// Rounded average response time in minutes.
    pub response_speed: Paired<i64>,
    pub question_ratio: Paired<i64>,
    pub self_disclosure: Paired<i64>,
    pub sentiment: Paired<i64>,
    pub mirroring: i64,
    pub initiation: Paired<usize>,
    pub emoji_count: Paired<usize>,
}

/// Unclamped score after all adjustments.
pub fn raw_score(inputs: &ScoreInputs) -> f64 {
    let mut score = BASELINE;

    // 1. who talks more
    let (mine, other) = (
        inputs.message_count.me as f64,
        inputs.message_count.other as f64,
    );
    if other > mine {
        score += ((other - mine) / 3.0).min(10.0);
    } else {
        score -= ((mine - other) / 4.0).min(8.0);
    }

    // 2. who answers faster
    let (my_speed, other_speed) = (
        inputs.response_speed.me as f64,
        inputs.response_speed.other as f64,
    );
    if other_speed > 0.0 && other_speed < my_speed {
        score += ((my_speed - other_speed) / 3.0).min(10.0);
    } else if my_speed > 0.0 && other_speed > my_speed {
        score -= ((other_speed - my_speed) / 4.0).min(8.0);
    }

    // 3. who asks questions
    let (my_q, other_q) = (
        inputs.question_ratio.me as f64,
        inputs.question_ratio.other as f64,
    );
    if other_q > my_q {
        score += ((other_q - my_q) / 5.0).min(10.0);
    } else if my_q > other_q + 20.0 {
        score -= 5.0;
    }

    // 4. self-disclosure, both bonuses may apply
    let other_disclosure = inputs.self_disclosure.other as f64;
    if other_disclosure > 20.0 {
        score += (other_disclosure / 5.0).min(10.0);
    }
    if inputs.self_disclosure.other > inputs.self_disclosure.me {
        score += 5.0;
    }

    // 5. tone
    let other_sentiment = inputs.sentiment.other as f64;
    if other_sentiment > 30.0 {
        score += (other_sentiment / 10.0).min(10.0);
    } else if other_sentiment < -30.0 {
        score -= (other_sentiment.abs() / 10.0).min(10.0);
    }

    // 6. mirroring
    if inputs.mirroring > 50 {
        score += ((inputs.mirroring - 50) as f64 / 10.0).min(5.0);
    }

    // 7. who starts conversations
    let total_initiation = inputs.initiation.me + inputs.initiation.other;
    if total_initiation > 0 {
        let share = inputs.initiation.other as f64 / total_initiation as f64;
        if share > 0.5 {
            score += ((share - 0.5) * 20.0).min(8.0);
        } else if share < 0.3 {
            score -= 5.0;
        }
    }

    // 8. emoji per message
    let emoji_rate = if inputs.message_count.other > 0 {
        inputs.emoji_count.other as f64 / inputs.message_count.other as f64
    } else {
        0.0
    };
    if emoji_rate > 0.3 {
        score += 5.0;
    } else if emoji_rate > 0.1 {
        score += 2.0;
    }

    score
}

/// Final temperature, rounded and clamped to 0..=100.
pub fn temperature(inputs: &ScoreInputs) -> u8 {
    round_half_up(raw_score(inputs)).clamp(0, 100) as u8
}

/// Five fixed description bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureBand {
    Boiling,
    Warm,
    Lukewarm,
    Cool,
    Frozen,
}

impl TemperatureBand {
    pub fn from_temperature(temperature: u8) -> Self {
        match temperature {
            90..=u8::MAX => TemperatureBand::Boiling,
            70..=89 => TemperatureBand::Warm,
            50..=69 => TemperatureBand::Lukewarm,
            30..=49 => TemperatureBand::Cool,
            _ => TemperatureBand::Frozen,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TemperatureBand::Boiling => "지금 고백해도 됩니다",
            TemperatureBand::Warm => "썸 타는 중, 조금만 더!",
            TemperatureBand::Lukewarm => "아직 판단하기 이른 온도",
            TemperatureBand::Cool => "살짝 쿨한 관계",
            TemperatureBand::Frozen => "해동이 필요합니다",
        }
    }
}

pub fn temperature_label(temperature: u8) -> &'static str {
    TemperatureBand::from_temperature(temperature).description()
}
