use crate::models::Neighbor;

/// Default neighborhood size
pub const DEFAULT_NEIGHBOR_COUNT: usize = 20;

/// Score every slot starts with before any candidate is admitted
const BASELINE_SCORE: f64 = 0.0;

/// Comparison rule used when filling the neighbor set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// Higher raw score wins (cosine)
    Raw,
    /// Stronger correlation wins regardless of sign (Pearson family)
    Magnitude,
}

impl Ranking {
    pub fn key(&self, score: f64) -> f64 {
        match self {
            Ranking::Raw => score,
            Ranking::Magnitude => score.abs(),
        }
    }

    /// Strict improvement; equal keys keep the incumbent
    pub fn beats(&self, candidate: f64, incumbent: f64) -> bool {
        self.key(candidate) > self.key(incumbent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    neighbor: Option<usize>,
    score: f64,
}

/// Fixed-capacity neighbor set filled by a single linear scan.
///
/// Every slot starts at a zero baseline. A candidate replaces the weakest
/// slot only when it strictly beats it, then the weakest slot is found again
/// with a full O(K) re-scan. Under `Ranking::Raw` a negative score can never
/// displace the baseline, so such candidates are never admitted.
///
/// Candidates must be offered once each, in ascending id order; the scan
/// itself guarantees no neighbor appears twice.
#[derive(Debug, Clone)]
pub struct TopKSelector {
    slots: Vec<Slot>,
    weakest: usize,
    ranking: Ranking,
}

impl TopKSelector {
    pub fn new(capacity: usize, ranking: Ranking) -> Self {
        Self {
            slots: vec![
                Slot {
                    neighbor: None,
                    score: BASELINE_SCORE,
                };
                capacity
            ],
            weakest: 0,
            ranking,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Offer a candidate; returns whether it took a slot
    pub fn offer(&mut self, candidate: usize, score: f64) -> bool {
        let Some(weakest) = self.slots.get_mut(self.weakest) else {
            return false;
        };
        if !self.ranking.beats(score, weakest.score) {
            return false;
        }

        *weakest = Slot {
            neighbor: Some(candidate),
            score,
        };
        self.weakest = self.find_weakest();
        true
    }

    fn find_weakest(&self) -> usize {
        let mut weakest = 0;
        for (idx, slot) in self.slots.iter().enumerate().skip(1) {
            if self.ranking.key(slot.score) < self.ranking.key(self.slots[weakest].score) {
                weakest = idx;
            }
        }
        weakest
    }

    /// All K slots as `(neighbor, score)`, baseline slots included
    pub fn slots(&self) -> Vec<(Option<usize>, f64)> {
        self.slots.iter().map(|s| (s.neighbor, s.score)).collect()
    }

    /// Admitted neighbors in slot order
    pub fn neighbors(&self) -> impl Iterator<Item = Neighbor> + '_ {
        self.slots.iter().filter_map(|slot| {
            slot.neighbor.map(|entity| Neighbor {
                entity,
                score: slot.score,
            })
        })
    }

    pub fn into_neighbors(self) -> Vec<Neighbor> {
        self.neighbors().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    /// Reference answer: sort every admissible candidate by key, keep K
    fn brute_force(scores: &[f64], k: usize, ranking: Ranking) -> Vec<f64> {
        let mut keys: Vec<f64> = scores
            .iter()
            .map(|s| ranking.key(*s))
            .filter(|key| *key > BASELINE_SCORE)
            .collect();
        keys.sort_by(|a, b| b.partial_cmp(a).unwrap());
        keys.truncate(k);
        keys
    }

    fn selected_keys(selector: &TopKSelector, ranking: Ranking) -> Vec<f64> {
        let mut keys: Vec<f64> = selector.neighbors().map(|n| ranking.key(n.score)).collect();
        keys.sort_by(|a, b| b.partial_cmp(a).unwrap());
        keys
    }

    #[test]
    fn test_matches_brute_force_on_random_input() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for ranking in [Ranking::Raw, Ranking::Magnitude] {
            for _ in 0..200 {
                let n = rng.gen_range(0..60);
                let k = rng.gen_range(1..40); // covers both K <= N and K > N
                let scores: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();

                let mut selector = TopKSelector::new(k, ranking);
                for (id, score) in scores.iter().enumerate() {
                    selector.offer(id, *score);
                }

                assert_eq!(selector.slots().len(), k);
                assert_eq!(
                    selected_keys(&selector, ranking),
                    brute_force(&scores, k, ranking),
                    "ranking={:?} n={} k={}",
                    ranking,
                    n,
                    k
                );
            }
        }
    }

    #[test]
    fn test_no_duplicate_neighbors() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut selector = TopKSelector::new(5, Ranking::Magnitude);
        for id in 0..100 {
            selector.offer(id, rng.gen_range(-1.0..1.0));
        }

        let ids: HashSet<usize> = selector.neighbors().map(|n| n.entity).collect();
        assert_eq!(ids.len(), selector.neighbors().count());
    }

    #[test]
    fn test_negative_scores_never_displace_baseline_under_raw() {
        let mut selector = TopKSelector::new(3, Ranking::Raw);
        assert!(!selector.offer(0, -0.9));
        assert!(selector.offer(1, 0.2));
        assert!(!selector.offer(2, -0.1));

        assert_eq!(selector.into_neighbors().len(), 1);
    }

    #[test]
    fn test_magnitude_admits_strong_negative_correlation() {
        let mut selector = TopKSelector::new(2, Ranking::Magnitude);
        selector.offer(0, 0.3);
        selector.offer(1, -0.9);
        selector.offer(2, 0.5);

        let mut ids: Vec<usize> = selector.neighbors().map(|n| n.entity).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let mut selector = TopKSelector::new(1, Ranking::Raw);
        assert!(selector.offer(4, 0.5));
        assert!(!selector.offer(9, 0.5));

        let neighbors = selector.into_neighbors();
        assert_eq!(neighbors[0].entity, 4);
    }

    #[test]
    fn test_zero_capacity_admits_nothing() {
        let mut selector = TopKSelector::new(0, Ranking::Raw);
        assert!(!selector.offer(0, 1.0));
        assert_eq!(selector.capacity(), 0);
        assert!(selector.slots().is_empty());
    }
}
