//! `history` command: list, show the latest entry, or clear.

use crate::history::{temperature_change, HistoryEntry, HistoryStore};
use crate::Result;

pub fn format_entry(entry: &HistoryEntry) -> String {
    let situation = entry
        .situation
        .map(|s| format!(" {} {}", s.emoji(), s.label()))
        .unwrap_or_default();
    format!(
        "{}  {:>3}°C  {}  ({}, {} messages){}",
        entry.date.format("%Y-%m-%d %H:%M"),
        entry.temperature,
        entry.temperature_label,
        entry.platform,
        entry.message_count,
        situation
    )
}

pub fn list(store: &dyn HistoryStore) -> Result<Vec<HistoryEntry>> {
    let entries = store.list()?;
    if entries.is_empty() {
        println!("No saved analyses yet");
        return Ok(entries);
    }

    println!("📜 Last {} analyses (newest first):", entries.len());
    for entry in &entries {
        println!("  {}", format_entry(entry));
    }
    if let Some(change) = temperature_change(&entries) {
        println!("Change since previous: {:+}°C", change);
    }
    Ok(entries)
}

pub fn last(store: &dyn HistoryStore) -> Result<Option<HistoryEntry>> {
    let entry = store.last_entry()?;
    match &entry {
        Some(entry) => println!("{}", format_entry(entry)),
        None => println!("No saved analyses yet"),
    }
    Ok(entry)
}

pub fn clear(store: &dyn HistoryStore) -> Result<()> {
    store.clear()?;
    println!("History cleared");
    Ok(())
}
