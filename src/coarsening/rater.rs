use rand::rngs::SmallRng;
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::config::Configuration;
use crate::hypergraph::{Hypergraph, HypernodeId, NodeWeight};

/// Best contraction partner of a hypernode together with its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub target: HypernodeId,
    pub value: f64,
}

/// Scores candidate contraction pairs by the heavy-edge measure
/// rate(u, v) = Σ_{e ∋ u,v} ω(e)/(|pins(e)|−1) / (c(u)·c(v)).
///
/// A partner is eligible only if the combined weight stays below the
/// coarsening cap and, once blocks are assigned, both endpoints share a
/// block. Equal-rated candidates win uniformly at random.
pub struct Rater {
    max_allowed_node_weight: NodeWeight,
    hyperedge_size_threshold: usize,
}

impl Rater {
    pub fn new(config: &Configuration) -> Self {
        Rater {
            max_allowed_node_weight: config.coarsening.max_allowed_node_weight,
            hyperedge_size_threshold: config.partition.hyperedge_size_threshold,
        }
    }

    /// Rate all partners of `u`, returning the best one or `None` when no
    /// neighbor is eligible.
    pub fn rate(&self, hg: &Hypergraph, u: HypernodeId, rng: &mut SmallRng) -> Option<Rating> {
        let mut edge_scores: FxHashMap<HypernodeId, f64> = FxHashMap::default();
        for &he in hg.incident_edges(u) {
            let size = hg.edge_size(he);
            if size < 2 || size > self.hyperedge_size_threshold {
                continue;
            }
            let score = hg.edge_weight(he) as f64 / (size - 1) as f64;
            for &pin in hg.pins(he) {
                if pin != u {
                    *edge_scores.entry(pin).or_insert(0.0) += score;
                }
            }
        }

        let u_weight = hg.node_weight(u);
        let u_part = hg.part_id(u);
        let mut best: Option<Rating> = None;
        let mut num_ties = 0usize;
        for (&v, &score_sum) in &edge_scores {
            if u_weight + hg.node_weight(v) > self.max_allowed_node_weight {
                continue;
            }
            if hg.part_id(v) != u_part {
                continue;
            }
            let value = score_sum / (u_weight * hg.node_weight(v)) as f64;
            match best {
                Some(current) if value < current.value => {}
                Some(current) if value == current.value => {
                    // Reservoir tie-break: every tied candidate wins with
                    // equal probability.
                    num_ties += 1;
                    if rng.gen_range(0..=num_ties) == 0 {
                        best = Some(Rating { target: v, value });
                    }
                }
                _ => {
                    num_ties = 0;
                    best = Some(Rating { target: v, value });
                }
            }
        }
        best
    }

    /// Whether contracting (u, v) still respects the coarsening weight cap.
    pub fn pair_is_eligible(&self, hg: &Hypergraph, u: HypernodeId, v: HypernodeId) -> bool {
        hg.is_node_enabled(v)
            && hg.node_weight(u) + hg.node_weight(v) <= self.max_allowed_node_weight
            && hg.part_id(u) == hg.part_id(v)
    }

    pub fn max_allowed_node_weight(&self) -> NodeWeight {
        self.max_allowed_node_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn config_with_cap(cap: NodeWeight) -> Configuration {
        let mut config = Configuration::default();
        config.coarsening.max_allowed_node_weight = cap;
        config
    }

    #[test]
    fn test_heavy_edge_score() {
        // Edges {0,1} (weight 4) and {0,1,2} (weight 2).
        let hg = Hypergraph::new(
            3,
            2,
            &[0, 2, 5],
            &[0, 1, 0, 1, 2],
            2,
            Some(&[4, 2]),
            None,
        );
        let rater = Rater::new(&config_with_cap(10));
        let mut rng = SmallRng::seed_from_u64(1);

        let rating = rater.rate(&hg, 0, &mut rng).unwrap();

        // rate(0,1) = 4/1 + 2/2 = 5, rate(0,2) = 2/2 = 1; unit weights.
        assert_eq!(rating.target, 1);
        assert_eq!(rating.value, 5.0);
    }

    #[test]
    fn test_weight_cap_excludes_partner() {
        let hg = Hypergraph::new(
            3,
            2,
            &[0, 2, 5],
            &[0, 1, 0, 1, 2],
            2,
            None,
            Some(&[1, 9, 1]),
        );
        let rater = Rater::new(&config_with_cap(5));
        let mut rng = SmallRng::seed_from_u64(1);

        let rating = rater.rate(&hg, 0, &mut rng).unwrap();

        // Node 1 is too heavy to merge with, so node 2 wins by default.
        assert_eq!(rating.target, 2);
    }

    #[test]
    fn test_no_eligible_partner() {
        let hg = Hypergraph::new(2, 1, &[0, 2], &[0, 1], 2, None, Some(&[3, 3]));
        let rater = Rater::new(&config_with_cap(4));
        let mut rng = SmallRng::seed_from_u64(1);

        assert!(rater.rate(&hg, 0, &mut rng).is_none());
    }

    #[test]
    fn test_respects_block_boundaries() {
        let mut hg = Hypergraph::new(3, 2, &[0, 2, 5], &[0, 1, 0, 1, 2], 2, None, None);
        hg.set_node_part(0, 0);
        hg.set_node_part(1, 1);
        hg.set_node_part(2, 0);
        let rater = Rater::new(&config_with_cap(10));
        let mut rng = SmallRng::seed_from_u64(1);

        let rating = rater.rate(&hg, 0, &mut rng).unwrap();

        // Node 1 sits in the other block; only node 2 may be contracted.
        assert_eq!(rating.target, 2);
    }
}
