//! The combat log: deduplicated entries and post-battle export.

use serde::{Deserialize, Serialize};

/// Roll detail attached to a log entry, for narration and debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollDetail {
    /// The natural d20 value.
    pub natural: u32,
    /// Tier name the roll landed in.
    pub tier: String,
    /// Whether the blow was critical.
    pub crit: bool,
    /// Where the blow landed.
    pub location: String,
}

/// One line of the combat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Round the action happened in.
    pub round: u32,
    /// Name of the acting combatant.
    pub actor: String,
    /// Short action label ("attack", "Firebolt", "flee").
    pub action: String,
    /// Name of the target, empty when there is none.
    pub target: String,
    /// Roll detail, when a die was involved.
    pub roll: Option<RollDetail>,
    /// Human-readable narration.
    pub text: String,
    /// How many consecutive identical actions this line stands for.
    pub repeats: u32,
}

impl LogEntry {
    /// Create an entry with no roll detail.
    pub fn new(
        round: u32,
        actor: impl Into<String>,
        action: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            round,
            actor: actor.into(),
            action: action.into(),
            target: target.into(),
            roll: None,
            text: text.into(),
            repeats: 1,
        }
    }

    /// Attach roll detail.
    pub fn with_roll(mut self, roll: RollDetail) -> Self {
        self.roll = Some(roll);
        self
    }

    /// Returns true when another entry describes the same action by the
    /// same actor on the same target in the same round.
    pub fn same_action(&self, other: &LogEntry) -> bool {
        self.round == other.round
            && self.actor == other.actor
            && self.action == other.action
            && self.target == other.target
    }
}

/// A chronological, deduplicated log of everything that happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatLog {
    entries: Vec<LogEntry>,
}

impl CombatLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, merging it into the previous one when it repeats
    /// the same action. The newer narration and roll replace the older
    /// ones; the repeat counter is bumped.
    pub fn push(&mut self, entry: LogEntry) {
        match self.entries.last_mut() {
            Some(last) if last.same_action(&entry) => {
                last.repeats += 1;
                last.text = entry.text;
                last.roll = entry.roll;
            }
            _ => self.entries.push(entry),
        }
    }

    /// All entries.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Number of entries after deduplication.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Export the log as markdown, grouped by round.
    pub fn export_markdown(&self) -> String {
        let mut out = String::from("# Combat Log\n");
        let mut round = 0;
        for entry in &self.entries {
            if entry.round != round {
                round = entry.round;
                out.push_str(&format!("\n## Round {round}\n\n"));
            }
            out.push_str(&format!("- **{}**: {}", entry.actor, entry.text));
            if let Some(roll) = &entry.roll {
                out.push_str(&format!(
                    " (rolled {}, {}{})",
                    roll.natural,
                    roll.tier,
                    if roll.crit { ", critical" } else { "" }
                ));
            }
            if entry.repeats > 1 {
                out.push_str(&format!(" ×{}", entry.repeats));
            }
            out.push('\n');
        }
        out
    }

    /// Export the log as plain text, one line per entry.
    pub fn export_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!("[round {}] {}", entry.round, entry.text));
            if entry.repeats > 1 {
                out.push_str(&format!(" (x{})", entry.repeats));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_appends_distinct_entries() {
        let mut log = CombatLog::new();
        log.push(LogEntry::new(1, "You", "attack", "Wolf", "You slash the Wolf."));
        log.push(LogEntry::new(1, "Wolf", "bite", "You", "The Wolf bites you."));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn push_merges_repeated_actions() {
        let mut log = CombatLog::new();
        log.push(LogEntry::new(2, "You", "attack", "Wolf", "You slash the Wolf for 8."));
        log.push(LogEntry::new(2, "You", "attack", "Wolf", "You slash the Wolf for 11."));
        assert_eq!(log.len(), 1);
        let entry = log.last().unwrap();
        assert_eq!(entry.repeats, 2);
        assert_eq!(entry.text, "You slash the Wolf for 11.");
    }

    #[test]
    fn push_does_not_merge_across_rounds() {
        let mut log = CombatLog::new();
        log.push(LogEntry::new(1, "You", "attack", "Wolf", "You slash the Wolf."));
        log.push(LogEntry::new(2, "You", "attack", "Wolf", "You slash the Wolf."));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn markdown_export_groups_by_round() {
        let mut log = CombatLog::new();
        log.push(LogEntry::new(1, "You", "attack", "Wolf", "You slash the Wolf."));
        log.push(LogEntry::new(2, "Wolf", "bite", "You", "The Wolf bites you."));
        let md = log.export_markdown();
        assert!(md.starts_with("# Combat Log\n"));
        assert!(md.contains("## Round 1"));
        assert!(md.contains("## Round 2"));
        assert!(md.contains("- **You**: You slash the Wolf."));
    }

    #[test]
    fn text_export_marks_repeats() {
        let mut log = CombatLog::new();
        log.push(LogEntry::new(1, "You", "attack", "Wolf", "You slash the Wolf."));
        log.push(LogEntry::new(1, "You", "attack", "Wolf", "You slash the Wolf."));
        let text = log.export_text();
        assert!(text.contains("[round 1]"));
        assert!(text.contains("(x2)"));
    }
}
