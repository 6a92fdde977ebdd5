// Prompt history kept most-recent-first

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub prompt: String,
    pub timestamp: String,
}

impl HistoryEntry {
    pub fn new(prompt: &str, at: DateTime<Utc>) -> Self {
        Self {
            prompt: prompt.to_string(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Puts `entry` at the front, dropping any older entry with the same prompt
/// and anything past [`HISTORY_LIMIT`].
pub fn promote(mut entries: Vec<HistoryEntry>, entry: HistoryEntry) -> Vec<HistoryEntry> {
    entries.retain(|e| e.prompt != entry.prompt);
    entries.insert(0, entry);
    entries.truncate(HISTORY_LIMIT);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn timestamp_is_iso_8601() {
        let entry = HistoryEntry::new("cats", Utc.timestamp_opt(0, 0).unwrap());
        assert_eq!(entry.timestamp, "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn caps_at_ten_most_recent_first() {
        let mut entries = Vec::new();
        for i in 0..15 {
            entries = promote(entries, HistoryEntry::new(&format!("prompt {i}"), at(i)));
        }

        assert_eq!(entries.len(), HISTORY_LIMIT);
        assert_eq!(entries[0].prompt, "prompt 14");
        assert_eq!(entries[9].prompt, "prompt 5");
    }

    #[test]
    fn repeated_prompt_moves_to_front() {
        let mut entries = Vec::new();
        for p in ["a", "b", "c"] {
            entries = promote(entries, HistoryEntry::new(p, at(0)));
        }
        entries = promote(entries, HistoryEntry::new("a", at(60)));

        let prompts: Vec<_> = entries.iter().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, ["a", "c", "b"]);
        assert_eq!(entries[0], HistoryEntry::new("a", at(60)));
    }
}
