use std::collections::HashMap;
use std::hash::Hash;

use crate::model::db::candidate::Candidate;

/// Vote counts grouped by some key.
#[derive(Debug, Clone)]
pub struct Tally<K> {
    /// Keys without votes may be absent.
    pub counts: HashMap<K, u64>,
    /// Total number of votes.
    pub total: u64,
}

impl<K> Tally<K>
where
    K: Eq + Hash,
{
    pub fn new(counts: HashMap<K, u64>) -> Self {
        let total = counts.values().sum();
        Self { counts, total }
    }

    /// Number of votes for the given key.
    pub fn count(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }
}

/// One candidate's share of the vote.
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub candidate: Candidate,
    pub votes: u64,
    pub percentage: f64,
}

/// `count` as a percentage of `total`, rounded to one decimal place.
/// Zero if there are no votes at all.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let exact = count as f64 / total as f64 * 100.0;
    (exact * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(3, 12), 25.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(7, 7), 100.0);
    }

    #[test]
    fn total_is_sum_of_counts() {
        let tally = Tally::new(HashMap::from([("Nepal", 4), ("India", 3)]));
        assert_eq!(tally.total, 7);
        assert_eq!(tally.count(&"Nepal"), 4);
        assert_eq!(tally.count(&"Bhutan"), 0);
    }
}
