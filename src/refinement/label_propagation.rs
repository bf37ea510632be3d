use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::config::Configuration;
use crate::hypergraph::{Gain, Hypergraph, HypernodeId, PartitionId};
use crate::metrics;
use crate::refinement::{improvement_found, Refiner};

/// Size-constrained label propagation: every iteration visits the nodes in a
/// fresh random order and applies the best strictly improving move that
/// keeps the target block under its cap. Stops early on a moveless
/// iteration; with zero configured iterations the refiner is a no-op.
pub struct LabelPropagationRefiner {
    config: Configuration,
    order: Vec<HypernodeId>,
}

impl LabelPropagationRefiner {
    pub fn new(num_nodes: usize, config: &Configuration) -> Self {
        LabelPropagationRefiner {
            config: config.clone(),
            order: Vec::with_capacity(num_nodes),
        }
    }

    fn compute_gain(&self, hg: &Hypergraph, node: HypernodeId, target: PartitionId) -> Gain {
        let from = hg.part_id(node);
        let mut gain = 0;
        for &he in hg.incident_edges(node) {
            let size = hg.edge_size(he);
            if size < 2 {
                continue;
            }
            if hg.pin_count_in_part(he, target) == size - 1 {
                gain += hg.edge_weight(he);
            }
            if hg.pin_count_in_part(he, from) == size {
                gain -= hg.edge_weight(he);
            }
        }
        gain
    }

    /// Best strictly-positive move for `node`, honoring the weight cap.
    fn best_move(&self, hg: &Hypergraph, node: HypernodeId) -> Option<(PartitionId, Gain)> {
        let own = hg.part_id(node);
        let weight = hg.node_weight(node);
        let mut adjacent = vec![false; self.config.partition.k];
        for &he in hg.incident_edges(node) {
            for b in 0..self.config.partition.k {
                if hg.pin_count_in_part(he, b as PartitionId) > 0 {
                    adjacent[b] = true;
                }
            }
        }
        let mut best: Option<(PartitionId, Gain)> = None;
        for (b, &is_adjacent) in adjacent.iter().enumerate() {
            let b = b as PartitionId;
            if !is_adjacent || b == own {
                continue;
            }
            if hg.part_weight(b) + weight > self.config.partition.max_part_weight {
                continue;
            }
            let gain = self.compute_gain(hg, node, b);
            if gain > 0 && best.map_or(true, |(_, bg)| gain > bg) {
                best = Some((b, gain));
            }
        }
        best
    }
}

impl Refiner for LabelPropagationRefiner {
    fn initialize(&mut self, hg: &Hypergraph) {
        debug_assert!(hg.nodes().all(|u| hg.part_id(u) >= 0));
    }

    fn refine(
        &mut self,
        hg: &mut Hypergraph,
        _refinement_nodes: &[HypernodeId],
        best_cut: &mut Gain,
        best_imbalance: &mut f64,
        rng: &mut SmallRng,
    ) -> bool {
        debug_assert_eq!(*best_cut, metrics::hyperedge_cut(hg));
        let initial_cut = *best_cut;
        let initial_imbalance = *best_imbalance;
        let mut cut = *best_cut;

        for _ in 0..self.config.lp.max_number_iterations {
            self.order.clear();
            self.order.extend(hg.nodes());
            self.order.shuffle(rng);
            let mut moves = 0usize;
            for i in 0..self.order.len() {
                let node = self.order[i];
                if let Some((target, gain)) = self.best_move(hg, node) {
                    let from = hg.part_id(node);
                    hg.change_node_part(node, from, target);
                    cut -= gain;
                    moves += 1;
                }
            }
            debug!("label propagation iteration moved {} nodes", moves);
            if moves == 0 {
                break;
            }
        }

        debug_assert_eq!(cut, metrics::hyperedge_cut(hg));
        // Moves only ever decrease the cut, so the final state is the best.
        *best_cut = cut;
        *best_imbalance = metrics::imbalance(hg);

        improvement_found(
            *best_cut,
            initial_cut,
            *best_imbalance,
            initial_imbalance,
            self.config.partition.epsilon,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn path_hypergraph() -> Hypergraph {
        Hypergraph::new(4, 3, &[0, 2, 4, 6], &[0, 1, 1, 2, 2, 3], 2, None, None)
    }

    fn config_for(hg: &Hypergraph, epsilon: f64, iterations: usize) -> Configuration {
        let mut config = Configuration::default();
        config.partition.k = 2;
        config.partition.epsilon = epsilon;
        config.lp.max_number_iterations = iterations;
        config.finalize(hg.total_weight(), hg.initial_num_nodes());
        config
    }

    #[test]
    fn test_zero_iterations_is_a_no_op() {
        let mut hg = path_hypergraph();
        for (u, &p) in [0, 1, 0, 1].iter().enumerate() {
            hg.set_node_part(u, p);
        }
        let config = config_for(&hg, 0.5, 0);
        let mut refiner = LabelPropagationRefiner::new(4, &config);
        refiner.initialize(&hg);
        let mut best_cut = metrics::hyperedge_cut(&hg);
        let mut best_imbalance = metrics::imbalance(&hg);
        let parts_before: Vec<_> = (0..4).map(|u| hg.part_id(u)).collect();
        let mut rng = SmallRng::seed_from_u64(1);

        let improved = refiner.refine(&mut hg, &[], &mut best_cut, &mut best_imbalance, &mut rng);

        assert!(!improved);
        assert_eq!(best_cut, 3);
        assert_eq!((0..4).map(|u| hg.part_id(u)).collect::<Vec<_>>(), parts_before);
    }

    #[test]
    fn test_propagation_reduces_cut() {
        let mut hg = path_hypergraph();
        for (u, &p) in [0, 1, 0, 1].iter().enumerate() {
            hg.set_node_part(u, p);
        }
        let config = config_for(&hg, 0.5, 3);
        let mut refiner = LabelPropagationRefiner::new(4, &config);
        refiner.initialize(&hg);
        let mut best_cut = metrics::hyperedge_cut(&hg);
        let mut best_imbalance = metrics::imbalance(&hg);
        let mut rng = SmallRng::seed_from_u64(4);

        let improved = refiner.refine(&mut hg, &[], &mut best_cut, &mut best_imbalance, &mut rng);

        assert!(improved);
        assert!(best_cut < 3);
        assert_eq!(best_cut, metrics::hyperedge_cut(&hg));
        for b in 0..2 {
            assert!(hg.part_weight(b) <= config.partition.max_part_weight);
        }
    }
}
