//! Trailing time window applied after parsing.

use chrono::{DateTime, Duration, Utc};

use crate::conversation::Message;
use crate::{Error, Result};

/// Longest accepted window, in days (100 years).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Check a window length coming from the CLI or config.
pub fn window_from_days(days: i64) -> Result<Duration> {
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(Error::InvalidArgument(format!(
            "window must be between 1 and {} days, got {}",
            MAX_WINDOW_DAYS, days
        )));
    }
    Ok(Duration::days(days))
}

/// Keep messages at or after `now - window`, sorted ascending by timestamp.
///
/// The sort is stable, so messages sharing a timestamp keep export order.
/// A window reaching past the earliest representable time keeps everything.
pub fn apply_window(mut messages: Vec<Message>, now: DateTime<Utc>, window: Duration) -> Vec<Message> {
    let cutoff = now
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    messages.retain(|m| m.timestamp >= cutoff);
    messages.sort_by_key(|m| m.timestamp);
    messages
}
