//! Per-party conversational signals.
//!
//! Every extractor is a pure function over a slice of tagged messages, so
//! they can run in any order.

use std::collections::BTreeSet;

use chrono::Duration;
use once_cell::sync::Lazy;
use regex::Regex;

use super::lexicon::{NEGATIVE_WORDS, POSITIVE_WORDS, QUESTION_PATTERNS, SELF_DISCLOSURE_WORDS};
use super::round_half_up;
use crate::conversation::TaggedMessage;

static QUESTION_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    QUESTION_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("invalid question pattern"))
        .collect()
});

static LAUGHTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ㅋㅎ]+").expect("invalid laughter pattern"));

static WORD_ENDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[가-힣]{2,3}$").expect("invalid ending pattern"));

/// Emoji blocks counted by [`count_emojis`].
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F300, 0x1F9FF),
    (0x2600, 0x26FF),
    (0x2700, 0x27BF),
    (0x1F600, 0x1F64F),
    (0x1F680, 0x1F6FF),
    (0x1F1E0, 0x1F1FF),
];

/// Which side of the conversation an extractor looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Me,
    Other,
}

impl Party {
    fn owns(self, message: &TaggedMessage<'_>) -> bool {
        message.is_me == (self == Party::Me)
    }
}

/// Split a tagged conversation into (mine, theirs), preserving order.
pub fn split_by_party<'a>(
    messages: &[TaggedMessage<'a>],
) -> (Vec<TaggedMessage<'a>>, Vec<TaggedMessage<'a>>) {
    messages.iter().copied().partition(|m| m.is_me)
}

pub fn is_emoji(c: char) -> bool {
    let code = u32::from(c);
    EMOJI_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&code))
}

pub fn count_emojis(text: &str) -> usize {
    text.chars().filter(|&c| is_emoji(c)).count()
}

pub fn emoji_count(messages: &[TaggedMessage<'_>]) -> usize {
    messages.iter().map(|m| count_emojis(m.content())).sum()
}

/// Mean content length in characters, rounded. Zero for no messages.
pub fn average_length(messages: &[TaggedMessage<'_>]) -> i64 {
    if messages.is_empty() {
        return 0;
    }
    let total: usize = messages.iter().map(|m| m.content().chars().count()).sum();
    round_half_up(total as f64 / messages.len() as f64)
}

/// Average minutes `party` takes to answer the other side.
///
/// Only gaps strictly between zero and `max_gap` count; multi-day silences
/// are not replies. Returns 0.0 when nothing qualifies.
pub fn average_response_minutes(
    messages: &[TaggedMessage<'_>],
    party: Party,
    max_gap: Duration,
) -> f64 {
    let max_minutes = max_gap.num_milliseconds() as f64 / 60_000.0;

    let gaps: Vec<f64> = messages
        .windows(2)
        .filter(|pair| !party.owns(&pair[0]) && party.owns(&pair[1]))
        .map(|pair| (pair[1].timestamp() - pair[0].timestamp()).num_milliseconds() as f64 / 60_000.0)
        .filter(|&minutes| minutes > 0.0 && minutes < max_minutes)
        .collect();

    if gaps.is_empty() {
        return 0.0;
    }
    gaps.iter().sum::<f64>() / gaps.len() as f64
}

fn percent_matching<F>(messages: &[TaggedMessage<'_>], predicate: F) -> i64
where
    F: Fn(&str) -> bool,
{
    if messages.is_empty() {
        return 0;
    }
    let matching = messages.iter().filter(|m| predicate(m.content())).count();
    round_half_up(matching as f64 / messages.len() as f64 * 100.0)
}

pub fn is_question(text: &str) -> bool {
    QUESTION_REGEXES.iter().any(|re| re.is_match(text))
}

/// Share of messages containing an interrogative marker, in percent.
pub fn question_ratio(messages: &[TaggedMessage<'_>]) -> i64 {
    percent_matching(messages, is_question)
}

pub fn is_self_disclosure(text: &str) -> bool {
    SELF_DISCLOSURE_WORDS.iter().any(|w| text.contains(w))
}

/// Share of messages containing a self-disclosure phrase, in percent.
pub fn self_disclosure_ratio(messages: &[TaggedMessage<'_>]) -> i64 {
    percent_matching(messages, is_self_disclosure)
}

/// Lexicon sentiment in -100..=100.
///
/// Each lexicon entry found in a message counts once for that message; the
/// counts are summed over all messages before normalizing.
pub fn sentiment_score(messages: &[TaggedMessage<'_>]) -> i64 {
    let mut positive = 0usize;
    let mut negative = 0usize;

    for message in messages {
        let lowered = message.content().to_lowercase();
        positive += POSITIVE_WORDS.iter().filter(|w| lowered.contains(*w)).count();
        negative += NEGATIVE_WORDS.iter().filter(|w| lowered.contains(*w)).count();
    }

    let total = positive + negative;
    if total == 0 {
        return 0;
    }
    round_half_up((positive as f64 - negative as f64) / total as f64 * 100.0)
}

/// Distinctive tokens of a speaker: laughter runs, emoji, 2-3 syllable endings.
pub fn expression_vocabulary(messages: &[TaggedMessage<'_>]) -> BTreeSet<String> {
    let mut vocabulary = BTreeSet::new();

    for message in messages {
        let content = message.content();
        for run in LAUGHTER.find_iter(content) {
            vocabulary.insert(run.as_str().to_string());
        }
        for c in content.chars().filter(|&c| is_emoji(c)) {
            vocabulary.insert(c.to_string());
        }
        if let Some(ending) = WORD_ENDING.find(content) {
            vocabulary.insert(ending.as_str().to_string());
        }
    }

    vocabulary
}

/// How much "mine" reuses the other party's expressions, 0..=100.
///
/// Either side being empty gives 0. An empty vocabulary gives the neutral 50.
pub fn linguistic_mirroring(mine: &[TaggedMessage<'_>], theirs: &[TaggedMessage<'_>]) -> i64 {
    if mine.is_empty() || theirs.is_empty() {
        return 0;
    }

    let vocabulary = expression_vocabulary(theirs);
    if vocabulary.is_empty() {
        return 50;
    }

    let matches: usize = mine
        .iter()
        .map(|m| {
            vocabulary
                .iter()
                .filter(|expr| m.content().contains(expr.as_str()))
                .count()
        })
        .sum();

    let rate = matches as f64 / (mine.len() * vocabulary.len()) as f64;
    round_half_up(rate * 500.0).min(100)
}

/// Messages by `party` that open the conversation or follow a silence of at least `gap`.
pub fn initiation_count(messages: &[TaggedMessage<'_>], party: Party, gap: Duration) -> usize {
    messages
        .iter()
        .enumerate()
        .filter(|(i, m)| {
            party.owns(m) && (*i == 0 || m.timestamp() - messages[*i - 1].timestamp() >= gap)
        })
        .count()
}
