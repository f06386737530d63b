use std::collections::HashSet;
use std::hash::Hash;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome<T> {
    pub rows: Vec<T>,
    /// Rows whose key had no parent and were discarded.
    pub orphans: usize,
}

/// Keeps only child rows whose foreign key exists in the parent relation.
///
/// The parent key set is loaded once per stage; filtering never fails, it only
/// drops and counts.
#[derive(Debug)]
pub struct ReferentialFilter<K> {
    relation: &'static str,
    parents: HashSet<K>,
}

impl<K: Eq + Hash> ReferentialFilter<K> {
    pub fn new(relation: &'static str, parents: HashSet<K>) -> Self {
        Self { relation, parents }
    }

    pub fn retain<T>(&self, rows: Vec<T>, key: impl Fn(&T) -> K) -> FilterOutcome<T> {
        let before = rows.len();
        let rows: Vec<T> = rows
            .into_iter()
            .filter(|row| self.parents.contains(&key(row)))
            .collect();
        let orphans = before - rows.len();

        if orphans > 0 {
            warn!(
                relation = self.relation,
                orphans,
                kept = rows.len(),
                "Dropped rows without a matching parent key"
            );
        }

        FilterOutcome { rows, orphans }
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orphans_are_dropped_and_counted() {
        let filter = ReferentialFilter::new("transportstation", [8503000_i64, 8507000].into_iter().collect());
        let rows = vec![(8503000_i64, "a"), (9999999, "b"), (8507000, "c"), (9999999, "d")];

        let outcome = filter.retain(rows, |r| r.0);

        assert_eq!(outcome.rows, vec![(8503000, "a"), (8507000, "c")]);
        assert_eq!(outcome.orphans, 2);
    }

    #[test]
    fn test_empty_parent_set_drops_everything() {
        let filter: ReferentialFilter<i64> = ReferentialFilter::new("transportstation", HashSet::new());

        let outcome = filter.retain(vec![1_i64, 2, 3], |r| *r);

        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.orphans, 3);
        assert_eq!(filter.parent_count(), 0);
    }
}
