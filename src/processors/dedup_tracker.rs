use std::collections::HashSet;
use std::hash::Hash;
use tracing::debug;

/// Rows that survived deduplication plus what was removed and why.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome<T> {
    pub rows: Vec<T>,
    /// Repeats of a key earlier in the same batch.
    pub in_batch_duplicates: usize,
    /// Keys already admitted by an earlier batch or already in storage.
    pub previously_seen: usize,
}

impl<T> DedupOutcome<T> {
    pub fn dropped(&self) -> usize {
        self.in_batch_duplicates + self.previously_seen
    }
}

/// Remembers every key admitted so far across the batches of one stage.
///
/// Keys only ever enter the set; once admitted, a key is never admitted again
/// for the lifetime of the tracker.
#[derive(Debug)]
pub struct DedupTracker<K> {
    label: &'static str,
    seen: HashSet<K>,
}

impl<K: Eq + Hash + Clone> DedupTracker<K> {
    pub fn new(label: &'static str) -> Self {
        Self::seeded(label, HashSet::new())
    }

    /// Start from keys that are already persisted, so reruns append nothing
    /// that storage already holds.
    pub fn seeded(label: &'static str, existing: HashSet<K>) -> Self {
        debug!(tracker = label, seeded = existing.len(), "Dedup tracker initialised");
        Self {
            label,
            seen: existing,
        }
    }

    /// Keep the first row of each unseen key, in input order.
    pub fn filter<T>(&mut self, rows: Vec<T>, key: impl Fn(&T) -> K) -> DedupOutcome<T> {
        let mut batch_keys = HashSet::new();
        let mut in_batch_duplicates = 0;
        let mut previously_seen = 0;

        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            let k = key(&row);
            if !batch_keys.insert(k.clone()) {
                in_batch_duplicates += 1;
            } else if self.seen.contains(&k) {
                previously_seen += 1;
            } else {
                kept.push(row);
            }
        }
        self.seen.extend(batch_keys);

        if in_batch_duplicates + previously_seen > 0 {
            debug!(
                tracker = self.label,
                in_batch_duplicates,
                previously_seen,
                kept = kept.len(),
                "Dropped duplicate keys"
            );
        }

        DedupOutcome {
            rows: kept,
            in_batch_duplicates,
            previously_seen,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// One-shot deduplication with no memory of other batches.
/// Returns the kept rows and the number dropped.
pub fn dedup_within_batch<T, K: Eq + Hash>(rows: Vec<T>, key: impl Fn(&T) -> K) -> (Vec<T>, usize) {
    let mut seen = HashSet::new();
    let before = rows.len();
    let kept: Vec<T> = rows.into_iter().filter(|row| seen.insert(key(row))).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_occurrence_wins_within_batch() {
        let mut tracker = DedupTracker::new("operator");
        let rows = vec![("80", "DB"), ("11", "SBB"), ("80", "DB Regio")];

        let outcome = tracker.filter(rows, |r| r.0.to_string());

        assert_eq!(outcome.rows, vec![("80", "DB"), ("11", "SBB")]);
        assert_eq!(outcome.in_batch_duplicates, 1);
        assert_eq!(outcome.previously_seen, 0);
    }

    #[test]
    fn test_key_seen_in_earlier_batch_is_dropped() {
        let mut tracker = DedupTracker::new("operator");
        tracker.filter(vec!["80", "11"], |r| r.to_string());

        let outcome = tracker.filter(vec!["80", "33", "33"], |r| r.to_string());

        assert_eq!(outcome.rows, vec!["33"]);
        assert_eq!(outcome.previously_seen, 1);
        assert_eq!(outcome.in_batch_duplicates, 1);
        assert_eq!(outcome.dropped(), 2);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_seeded_tracker_skips_persisted_keys() {
        let existing: HashSet<String> = ["80".to_string()].into_iter().collect();
        let mut tracker = DedupTracker::seeded("operator", existing);

        let outcome = tracker.filter(vec!["80", "85"], |r| r.to_string());

        assert_eq!(outcome.rows, vec!["85"]);
        assert!(tracker.contains(&"85".to_string()));
    }

    #[test]
    fn test_empty_batch_changes_nothing() {
        let mut tracker: DedupTracker<String> = DedupTracker::new("journey");
        let outcome = tracker.filter(Vec::<&str>::new(), |r| r.to_string());

        assert!(outcome.rows.is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_dedup_within_batch() {
        let (kept, dropped) = dedup_within_batch(vec![1, 2, 1, 3, 2], |v| *v);

        assert_eq!(kept, vec![1, 2, 3]);
        assert_eq!(dropped, 2);
    }
}
