//! End-of-day world log retention.
//!
//! When the log grows past `max_logs`, it is rebuilt from the union of
//! every protected (high or critical) entry and the most recent
//! `recent_fraction_percent` of `max_logs` entries. The union is
//! deduplicated by sequence number, kept in chronological order, and
//! finally cut down to the newest `max_logs` entries.
//!
//! The result never exceeds `max_logs`. A protected entry is lost only when
//! more than `max_logs` entries of the union are newer than it.

use std::collections::BTreeMap;

use chronicle_types::LogEntry;

use crate::config::RetentionConfig;

/// Trim `logs` in place. Returns the number of entries removed.
pub fn trim_logs(logs: &mut Vec<LogEntry>, config: &RetentionConfig) -> usize {
    let before = logs.len();
    if before <= config.max_logs {
        return 0;
    }

    let keep_recent = config
        .max_logs
        .saturating_mul(usize::try_from(config.recent_fraction_percent).unwrap_or(100))
        / 100;
    let recent_start = before.saturating_sub(keep_recent);

    let mut kept: BTreeMap<u64, LogEntry> = BTreeMap::new();
    for (index, entry) in std::mem::take(logs).into_iter().enumerate() {
        if index >= recent_start || entry.importance.is_protected() {
            kept.insert(entry.sequence, entry);
        }
    }

    let excess = kept.len().saturating_sub(config.max_logs);
    logs.extend(kept.into_values().skip(excess));
    before.saturating_sub(logs.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chronicle_types::{Importance, LogDraft, LogKind, WorldState};

    use super::*;

    fn world_with(entries: &[Importance]) -> WorldState {
        let mut world = WorldState::default();
        for (i, &importance) in entries.iter().enumerate() {
            world.push_log(LogDraft::new(LogKind::Action, importance, format!("entry {i}")));
        }
        world
    }

    fn config(max_logs: usize) -> RetentionConfig {
        RetentionConfig {
            max_logs,
            recent_fraction_percent: 70,
        }
    }

    #[test]
    fn short_logs_are_untouched() {
        let mut world = world_with(&[Importance::Low; 5]);
        assert_eq!(trim_logs(&mut world.logs, &config(10)), 0);
        assert_eq!(world.logs.len(), 5);
    }

    #[test]
    fn keeps_protected_entries_and_recent_tail() {
        let mut importances = vec![Importance::Low; 30];
        importances[2] = Importance::High;
        importances[5] = Importance::Critical;
        let mut world = world_with(&importances);

        let removed = trim_logs(&mut world.logs, &config(10));
        // 7 recent entries plus 2 protected ones.
        assert_eq!(world.logs.len(), 9);
        assert_eq!(removed, 21);
        let sequences: Vec<u64> = world.logs.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![2, 5, 23, 24, 25, 26, 27, 28, 29]);
    }

    #[test]
    fn never_exceeds_cap_even_when_everything_is_protected() {
        let mut world = world_with(&[Importance::High; 25]);
        trim_logs(&mut world.logs, &config(10));
        assert_eq!(world.logs.len(), 10);
        assert_eq!(world.logs.first().unwrap().sequence, 15);
        assert!(world.logs.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[test]
    fn protected_entries_survive_when_they_fit() {
        let mut importances = vec![Importance::Medium; 200];
        for i in (0..200).step_by(50) {
            importances[i] = Importance::Critical;
        }
        let mut world = world_with(&importances);
        let protected: Vec<u64> = world
            .logs
            .iter()
            .filter(|e| e.importance.is_protected())
            .map(|e| e.sequence)
            .collect();

        trim_logs(&mut world.logs, &config(100));
        assert!(world.logs.len() <= 100);
        for sequence in protected {
            assert!(world.logs.iter().any(|e| e.sequence == sequence));
        }
    }
}
