use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::coarsening::{uncoarsen_history, Coarsener};
use crate::config::Configuration;
use crate::hypergraph::{
    ContractionMemento, EdgeWeight, HyperedgeId, Hypergraph, NodeWeight,
};
use crate::priority_queue::PriorityQueue;
use crate::refinement::Refiner;

/// Coarsener that contracts whole hyperedges: all pins of the chosen edge
/// coalesce into its first pin, one memento per pairwise contraction.
///
/// Edges are processed in descending order of
/// ω(e) / (Σ_pin c(pin) · (|pins(e)| − 1)); scores that went stale through
/// earlier contractions are repaired when the edge surfaces.
pub struct HyperedgeCoarsener {
    max_allowed_node_weight: NodeWeight,
    hyperedge_size_threshold: usize,
    history: Vec<ContractionMemento>,
}

impl HyperedgeCoarsener {
    pub fn new(config: &Configuration) -> Self {
        HyperedgeCoarsener {
            max_allowed_node_weight: config.coarsening.max_allowed_node_weight,
            hyperedge_size_threshold: config.partition.hyperedge_size_threshold,
            history: Vec::new(),
        }
    }

    /// Score of contracting `e` in one step, or `None` when the edge is
    /// degenerate, oversized, too heavy to merge, or spans blocks.
    fn rate_edge(&self, hg: &Hypergraph, e: HyperedgeId) -> Option<f64> {
        let size = hg.edge_size(e);
        if size < 2 || size > self.hyperedge_size_threshold {
            return None;
        }
        let pins = hg.pins(e);
        let combined_weight: NodeWeight = pins.iter().map(|&p| hg.node_weight(p)).sum();
        if combined_weight > self.max_allowed_node_weight {
            return None;
        }
        let part = hg.part_id(pins[0]);
        if pins.iter().any(|&p| hg.part_id(p) != part) {
            return None;
        }
        Some(hg.edge_weight(e) as f64 / (combined_weight * (size as NodeWeight - 1)) as f64)
    }
}

impl Coarsener for HyperedgeCoarsener {
    fn coarsen(&mut self, hg: &mut Hypergraph, limit: usize, rng: &mut SmallRng) {
        let mut pq = PriorityQueue::new(hg.initial_num_edges());
        let mut order: Vec<HyperedgeId> = hg.edges().collect();
        order.shuffle(rng);
        for &e in &order {
            if let Some(score) = self.rate_edge(hg, e) {
                pq.insert(e, score);
            }
        }

        let contractions_before = self.history.len();
        while hg.num_nodes() > limit {
            let Some((e, key)) = pq.pop_max() else {
                break;
            };
            match self.rate_edge(hg, e) {
                Some(score) if score == key => {
                    let pins: Vec<_> = hg.pins(e).to_vec();
                    let representative = pins[0];
                    for &pin in &pins[1..] {
                        self.history.push(hg.contract(representative, pin));
                        if hg.num_nodes() <= limit {
                            break;
                        }
                    }
                }
                Some(score) => {
                    // Earlier contractions changed the pin set; requeue with
                    // the repaired score.
                    pq.insert(e, score);
                }
                None => {}
            }
        }
        debug!(
            "hyperedge coarsening performed {} contractions, {} nodes left",
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
