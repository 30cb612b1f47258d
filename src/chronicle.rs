use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Side;

/// What a narrative entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// A combatant entering the round
    Summon,
    /// The clash between the two combatants
    Battle,
    /// Short announcement of a round's result and the running score
    Verdict,
    /// Closing scene once the match is over
    Epilogue,
}

/// A single piece of narration, fixed once appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: EntryKind,
    pub round: u32,
    pub side: Option<Side>,
    pub character: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(kind: EntryKind, round: u32, text: impl Into<String>) -> Self {
        Self {
            kind,
            round,
            side: None,
            character: None,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a summon entry for `character` fighting on `side`
    pub fn summon(
        round: u32,
        side: Side,
        character: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(EntryKind::Summon, round, text)
            .with_side(side)
            .with_character(character)
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn with_character(mut self, character: impl Into<String>) -> Self {
        self.character = Some(character.into());
        self
    }
}

/// Append-only record of everything narrated in a playthrough
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeLog {
    entries: Vec<LogEntry>,
}

impl NarrativeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries appended after the first `seen` ones, for incremental rendering
    pub fn since(&self, seen: usize) -> &[LogEntry] {
        self.entries.get(seen..).unwrap_or(&[])
    }

    /// The most recent entry of `kind` written during `round`
    pub fn latest(&self, kind: EntryKind, round: u32) -> Option<&LogEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.kind == kind && entry.round == round)
    }

    /// Characters summoned for `side`, in order of appearance
    pub fn summoned_by(&self, side: Side) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == EntryKind::Summon && entry.side == Some(side))
            .filter_map(|entry| entry.character.as_deref())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> NarrativeLog {
        let mut log = NarrativeLog::new();
        log.push(LogEntry::summon(1, Side::Crab, "Bee", "A bee buzzed in."));
        log.push(LogEntry::summon(1, Side::Monkey, "Demon", "A demon rose."));
        log.push(LogEntry::new(EntryKind::Battle, 1, "They fought. Bee won."));
        log.push(LogEntry::summon(2, Side::Crab, "Chestnut", "A chestnut rolled in."));
        log
    }

    #[test]
    fn since_returns_only_new_entries() {
        let log = sample_log();
        assert_eq!(log.since(3).len(), 1);
        assert_eq!(log.since(3)[0].character.as_deref(), Some("Chestnut"));
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn latest_is_scoped_to_round() {
        let log = sample_log();
        let battle = log.latest(EntryKind::Battle, 1).map(|e| e.text.as_str());
        assert_eq!(battle, Some("They fought. Bee won."));
        assert!(log.latest(EntryKind::Battle, 2).is_none());
    }

    #[test]
    fn summoned_by_keeps_order_per_side() {
        let log = sample_log();
        assert_eq!(log.summoned_by(Side::Crab), vec!["Bee", "Chestnut"]);
        assert_eq!(log.summoned_by(Side::Monkey), vec!["Demon"]);
    }
}
