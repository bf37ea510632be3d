use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::coarsening::{uncoarsen_history, Coarsener, Rater};
use crate::hypergraph::{ContractionMemento, EdgeWeight, Hypergraph, HypernodeId};
use crate::priority_queue::PriorityQueue;
use crate::refinement::Refiner;

/// How cached ratings are kept in sync with the shrinking hypergraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RatingUpdate {
    /// Re-rate the representative and all its neighbors after every
    /// contraction.
    Full,
    /// Re-rate only the representative; entries whose cached partner died
    /// are repaired when they surface at the top of the queue.
    OnDemand,
    /// Touch nothing; mark the whole neighborhood stale and re-rate stale
    /// entries lazily on pop.
    Lazy,
}

/// Pair-contraction coarsener driven by the heavy-edge rating.
///
/// All three variants walk the hypernodes in a randomly permuted order to
/// seed an addressable queue of best-partner ratings and then contract the
/// globally best eligible pair until the contraction limit is reached. They
/// differ only in the rating-update discipline after each contraction.
pub struct HeavyEdgeCoarsener {
    rater: Rater,
    update: RatingUpdate,
    history: Vec<ContractionMemento>,
}

impl HeavyEdgeCoarsener {
    pub fn full(rater: Rater) -> Self {
        Self::with_update(rater, RatingUpdate::Full)
    }

    pub fn heuristic(rater: Rater) -> Self {
        Self::with_update(rater, RatingUpdate::OnDemand)
    }

    pub fn lazy(rater: Rater) -> Self {
        Self::with_update(rater, RatingUpdate::Lazy)
    }

    fn with_update(rater: Rater, update: RatingUpdate) -> Self {
        HeavyEdgeCoarsener {
            rater,
            update,
            history: Vec::new(),
        }
    }

    fn rate_and_queue(
        &self,
        hg: &Hypergraph,
        u: HypernodeId,
        pq: &mut PriorityQueue<f64>,
        targets: &mut [HypernodeId],
        rng: &mut SmallRng,
    ) {
        match self.rater.rate(hg, u, rng) {
            Some(rating) => {
                targets[u] = rating.target;
                if pq.contains(u) {
                    pq.update_key(u, rating.value);
                } else {
                    pq.insert(u, rating.value);
                }
            }
            None => {
                if pq.contains(u) {
                    pq.remove(u);
                }
            }
        }
    }
}

impl Coarsener for HeavyEdgeCoarsener {
    fn coarsen(&mut self, hg: &mut Hypergraph, limit: usize, rng: &mut SmallRng) {
        let n = hg.initial_num_nodes();
        let mut pq = PriorityQueue::new(n);
        let mut targets: Vec<HypernodeId> = vec![0; n];
        let mut stale = vec![false; n];

        let mut order: Vec<HypernodeId> = hg.nodes().collect();
        order.shuffle(rng);
        for &u in &order {
            self.rate_and_queue(hg, u, &mut pq, &mut targets, rng);
        }

        let contractions_before = self.history.len();
        while hg.num_nodes() > limit {
            let Some((u, key)) = pq.pop_max() else {
                break;
            };
            if stale[u] {
                stale[u] = false;
                self.rate_and_queue(hg, u, &mut pq, &mut targets, rng);
                continue;
            }
            let v = targets[u];
            if !self.rater.pair_is_eligible(hg, u, v) {
                // The cached partner died or grew too heavy; repair on demand.
                self.rate_and_queue(hg, u, &mut pq, &mut targets, rng);
                continue;
            }

            self.history.push(hg.contract(u, v));
            if pq.contains(v) {
                pq.remove(v);
            }

            match self.update {
                RatingUpdate::Full => {
                    self.rate_and_queue(hg, u, &mut pq, &mut targets, rng);
                    let neighbors: Vec<HypernodeId> = hg
                        .incident_edges(u)
                        .iter()
                        .flat_map(|&he| hg.pins(he).iter().copied())
                        .filter(|&w| w != u)
                        .collect();
                    for w in neighbors {
                        self.rate_and_queue(hg, w, &mut pq, &mut targets, rng);
                    }
                }
                RatingUpdate::OnDemand => {
                    self.rate_and_queue(hg, u, &mut pq, &mut targets, rng);
                }
                RatingUpdate::Lazy => {
                    // Requeue u under its stale key; the next pop repairs it.
                    pq.insert(u, key);
                    stale[u] = true;
                    for &he in hg.incident_edges(u) {
                        for &w in hg.pins(he) {
                            if w != u {
                                stale[w] = true;
                            }
                        }
                    }
                }
            }
        }
        debug!(
            "heavy-edge coarsening performed {} contractions, {} nodes left",
            self.history.len() - contractions_before,
            hg.num_nodes()
        );
    }

    fn uncoarsen(
        &mut self,
        hg: &mut Hypergraph,
        refiner: &mut dyn Refiner,
        rng: &mut SmallRng,
    ) -> (EdgeWeight, f64) {
        uncoarsen_history(hg, &mut self.history, refiner, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::hypergraph::testing;
    use crate::refinement::DoNothingRefiner;
    use rand::SeedableRng;

    fn chain_hypergraph(n: usize) -> Hypergraph {
        let mut index = vec![0];
        let mut pins = Vec::new();
        for u in 0..n - 1 {
            pins.extend_from_slice(&[u, u + 1]);
            index.push(pins.len());
        }
        Hypergraph::new(n, n - 1, &index, &pins, 2, None, None)
    }

    fn rater_with_cap(cap: i64) -> Rater {
        let mut config = Configuration::default();
        config.coarsening.max_allowed_node_weight = cap;
        Rater::new(&config)
    }

    fn coarsen_variants() -> Vec<HeavyEdgeCoarsener> {
        vec![
            HeavyEdgeCoarsener::full(rater_with_cap(100)),
            HeavyEdgeCoarsener::heuristic(rater_with_cap(100)),
            HeavyEdgeCoarsener::lazy(rater_with_cap(100)),
        ]
    }

    #[test]
    fn test_coarsens_to_limit() {
        for mut coarsener in coarsen_variants() {
            let mut hg = chain_hypergraph(16);
            let mut rng = SmallRng::seed_from_u64(7);

            coarsener.coarsen(&mut hg, 4, &mut rng);

            assert_eq!(hg.num_nodes(), 4);
            assert_eq!(coarsener.history.len(), 12);
            // Total node weight is conserved by contraction.
            let weight: i64 = hg.nodes().map(|u| hg.node_weight(u)).sum();
            assert_eq!(weight, 16);
        }
    }

    #[test]
    fn test_weight_cap_stops_contraction() {
        // Cap 2 allows each node to absorb exactly one unit partner.
        for mut coarsener in [
            HeavyEdgeCoarsener::full(rater_with_cap(2)),
            HeavyEdgeCoarsener::lazy(rater_with_cap(2)),
        ] {
            let mut hg = chain_hypergraph(8);
            let mut rng = SmallRng::seed_from_u64(3);

            coarsener.coarsen(&mut hg, 1, &mut rng);

            assert!(hg.num_nodes() >= 4);
            for u in hg.nodes().collect::<Vec<_>>() {
                assert!(hg.node_weight(u) <= 2);
            }
        }
    }

    #[test]
    fn test_full_history_roundtrip() {
        // Coarsening all the way down and popping the whole stack restores
        // the hypergraph exactly.
        let mut hg = chain_hypergraph(10);
        let before = testing::snapshot(&hg);
        let mut coarsener = HeavyEdgeCoarsener::full(rater_with_cap(100));
        let mut rng = SmallRng::seed_from_u64(11);

        coarsener.coarsen(&mut hg, 2, &mut rng);
        assert_eq!(hg.num_nodes(), 2);
        while let Some(memento) = coarsener.history.pop() {
            hg.uncontract(&memento);
        }

        assert_eq!(testing::snapshot(&hg), before);
    }

    #[test]
    fn test_uncoarsen_projects_partition() {
        let mut hg = chain_hypergraph(8);
        let mut coarsener = HeavyEdgeCoarsener::heuristic(rater_with_cap(100));
        let mut rng = SmallRng::seed_from_u64(5);
        coarsener.coarsen(&mut hg, 2, &mut rng);
        let coarse: Vec<_> = hg.nodes().collect();
        hg.set_node_part(coarse[0], 0);
        hg.set_node_part(coarse[1], 1);

        let mut refiner = DoNothingRefiner;
        let (cut, _) = coarsener.uncoarsen(&mut hg, &mut refiner, &mut rng);

        assert!(coarsener.history.is_empty());
        // Every node inherited a block from its representative.
        for u in 0..8 {
            assert!(hg.part_id(u) >= 0);
        }
        assert_eq!(cut, crate::metrics::hyperedge_cut(&hg));
    }
}
