use log::debug;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::{CloggingPolicy, Configuration, FmConfig};
use crate::hypergraph::{Gain, HyperedgeId, Hypergraph, HypernodeId, NodeWeight, PartitionId};
use crate::metrics;
use crate::priority_queue::PriorityQueue;
use crate::refinement::{improvement_found, Refiner, StoppingPolicy};

/// Hyperedge-granular FM for bipartitions: the queues hold cut hyperedges,
/// keyed by the cut change of pulling every pin of the edge into one block.
///
/// Queue heads whose batch move would overrun the block cap are handled by
/// the configured clogging policy.
pub struct HyperedgeFmRefiner<S> {
    config: Configuration,
    /// The hyperedge-FM tunables viewed through the stopping-policy lens.
    stopping_config: FmConfig,
    pq: [PriorityQueue<Gain>; 2],
    marked_edges: Vec<bool>,
    moved_scratch: Vec<bool>,
    seen_edges: Vec<bool>,
    performed_moves: Vec<(HypernodeId, PartitionId, PartitionId)>,
    stopping: S,
}

impl<S: StoppingPolicy> HyperedgeFmRefiner<S> {
    pub fn new(num_nodes: usize, num_edges: usize, config: &Configuration) -> Self {
        debug_assert_eq!(config.partition.k, 2);
        let stopping_config = FmConfig {
            stopping_rule: config.her_fm.stopping_rule,
            num_repetitions: config.her_fm.num_repetitions,
            max_number_of_fruitless_moves: config.her_fm.max_number_of_fruitless_moves,
            alpha: config.fm.alpha,
            beta: config.fm.beta,
        };
        HyperedgeFmRefiner {
            config: config.clone(),
            stopping_config,
            pq: [
                PriorityQueue::new(num_edges),
                PriorityQueue::new(num_edges),
            ],
            marked_edges: vec![false; num_edges],
            moved_scratch: vec![false; num_nodes],
            seen_edges: vec![false; num_edges],
            performed_moves: Vec::new(),
            stopping: S::default(),
        }
    }

    /// Pins of `e` that would move when the edge is pulled into `to`.
    fn moved_pins(&self, hg: &Hypergraph, e: HyperedgeId, to: PartitionId) -> Vec<HypernodeId> {
        hg.pins(e)
            .iter()
            .copied()
            .filter(|&p| hg.part_id(p) != to)
            .collect()
    }

    /// Exact cut change of pulling every pin of `e` into `to`, summed over
    /// all hyperedges touched by the moving pins.
    fn compute_gain(&mut self, hg: &Hypergraph, e: HyperedgeId, to: PartitionId) -> Gain {
        let moved = self.moved_pins(hg, e, to);
        let from = to ^ 1;
        for &p in &moved {
            self.moved_scratch[p] = true;
        }
        let mut affected: Vec<HyperedgeId> = Vec::new();
        for &p in &moved {
            for &f in hg.incident_edges(p) {
                if !self.seen_edges[f] {
                    self.seen_edges[f] = true;
                    affected.push(f);
                }
            }
        }
        let mut gain = 0;
        for &f in &affected {
            let migrating = hg.pins(f).iter().filter(|&&p| self.moved_scratch[p]).count();
            let n_from = hg.pin_count_in_part(f, from);
            let n_to = hg.pin_count_in_part(f, to);
            let cut_before = n_from > 0 && n_to > 0;
            let cut_after = n_from - migrating > 0 && n_to + migrating > 0;
            gain += hg.edge_weight(f) * (cut_before as Gain - cut_after as Gain);
        }
        for &p in &moved {
            self.moved_scratch[p] = false;
        }
        for f in affected {
            self.seen_edges[f] = false;
        }
        gain
    }

    /// Queue a cut hyperedge in both directions.
    fn activate(&mut self, hg: &Hypergraph, e: HyperedgeId) {
        if self.marked_edges[e] || hg.connectivity(e) < 2 {
            return;
        }
        for to in 0..2 {
            let gain = self.compute_gain(hg, e, to as PartitionId);
            if self.pq[to].contains(e) {
                self.pq[to].update_key(e, gain);
            } else {
                self.pq[to].insert(e, gain);
            }
        }
    }

    fn deactivate(&mut self, e: HyperedgeId) {
        for pq in &mut self.pq {
            if pq.contains(e) {
                pq.remove(e);
            }
        }
    }

    fn batch_weight(&self, hg: &Hypergraph, e: HyperedgeId, to: PartitionId) -> NodeWeight {
        self.moved_pins(hg, e, to)
            .iter()
            .map(|&p| hg.node_weight(p))
            .sum()
    }

    fn head_is_eligible(&self, hg: &Hypergraph, to: usize) -> bool {
        self.pq[to].max().map_or(false, |e| {
            hg.part_weight(to as PartitionId) + self.batch_weight(hg, e, to as PartitionId)
                <= self.config.partition.max_part_weight
        })
    }

    /// Apply the clogging policy to infeasible queue heads. `Some(true)`
    /// asks the caller to re-evaluate, `Some(false)` ends the pass, `None`
    /// lets the selection proceed.
    fn handle_clogging(&mut self, eligible0: bool, eligible1: bool) -> Option<bool> {
        match self.config.her_fm.clogging_policy {
            CloggingPolicy::OnlyRemoveIfBothQueuesClogged => {
                if eligible0 || eligible1 {
                    return None;
                }
                let mut removed = false;
                for pq in &mut self.pq {
                    if pq.pop_max().is_some() {
                        removed = true;
                    }
                }
                Some(removed)
            }
            CloggingPolicy::RemoveOnlyTheCloggingEntry => {
                let mut removed = false;
                if !eligible0 && self.pq[0].pop_max().is_some() {
                    removed = true;
                }
                if !eligible1 && self.pq[1].pop_max().is_some() {
                    removed = true;
                }
                if removed {
                    Some(true)
                } else if eligible0 || eligible1 {
                    None
                } else {
                    Some(false)
                }
            }
            CloggingPolicy::DoNotRemoveAndResetEligibility => {
                if eligible0 || eligible1 {
                    None
                } else {
                    Some(false)
                }
            }
        }
    }

    fn rollback(&mut self, hg: &mut Hypergraph, last_index: i64, min_cut_index: i64) {
        let mut index = last_index;
        while index > min_cut_index {
            let (node, from, to) = self.performed_moves[index as usize];
            hg.change_node_part(node, to, from);
            index -= 1;
        }
    }
}

impl<S: StoppingPolicy> Refiner for HyperedgeFmRefiner<S> {
    fn initialize(&mut self, hg: &Hypergraph) {
        debug_assert!(hg.nodes().all(|u| hg.part_id(u) >= 0));
    }

    fn refine(
        &mut self,
        hg: &mut Hypergraph,
        refinement_nodes: &[HypernodeId],
        best_cut: &mut Gain,
        best_imbalance: &mut f64,
        rng: &mut SmallRng,
    ) -> bool {
        debug_assert_eq!(*best_cut, metrics::hyperedge_cut(hg));

        self.pq[0].clear();
        self.pq[1].clear();
        self.marked_edges.fill(false);
        self.performed_moves.clear();
        self.stopping.reset();

        let seed_edges: Vec<HyperedgeId> = refinement_nodes
            .iter()
            .flat_map(|&node| hg.incident_edges(node).iter().copied())
            .collect();
        for e in seed_edges {
            self.activate(hg, e);
        }

        let max_imbalance = self.config.partition.epsilon;
        let initial_cut = *best_cut;
        let initial_imbalance = *best_imbalance;
        let mut cut = *best_cut;
        let mut min_cut_index: i64 = -1;
        let mut num_edge_moves: usize = 0;
        let mut last_improving_edge_move: i64 = -1;
        let max_moves = hg.num_edges();

        while num_edge_moves < max_moves {
            if self.pq[0].is_empty() && self.pq[1].is_empty() {
                break;
            }
            let fruitless =
                (num_edge_moves as i64 - 1 - last_improving_edge_move).max(0) as usize;
            if self.stopping.should_stop(fruitless, &self.stopping_config) {
                break;
            }

            let eligible0 = self.head_is_eligible(hg, 0);
            let eligible1 = self.head_is_eligible(hg, 1);
            match self.handle_clogging(eligible0, eligible1) {
                Some(true) => continue,
                Some(false) => break,
                None => {}
            }

            let to = if eligible0 && eligible1 {
                let key0 = self.pq[0].max_key().unwrap();
                let key1 = self.pq[1].max_key().unwrap();
                if key0 > key1 {
                    0
                } else if key1 > key0 {
                    1
                } else {
                    rng.gen_range(0..2)
                }
            } else if eligible0 {
                0
            } else {
                1
            };
            let (e, gain) = self.pq[to].pop_max().unwrap();
            self.deactivate(e);
            let moved = self.moved_pins(hg, e, to as PartitionId);
            if moved.is_empty() {
                continue;
            }
            self.marked_edges[e] = true;

            let from = (to ^ 1) as PartitionId;
            for &pin in &moved {
                hg.change_node_part(pin, from, to as PartitionId);
                self.performed_moves.push((pin, from, to as PartitionId));
            }
            cut -= gain;
            self.stopping.update_statistics(gain);
            let imbalance = metrics::imbalance(hg);
            debug_assert_eq!(cut, metrics::hyperedge_cut(hg));

            // The batch changed the pin counts of every edge it touches, and
            // through shared pins the gains of their neighbors too: re-key
            // the two-hop edge neighborhood.
            let mut affected: Vec<HyperedgeId> = Vec::new();
            for &pin in &moved {
                for &f in hg.incident_edges(pin) {
                    if !self.seen_edges[f] {
                        self.seen_edges[f] = true;
                        affected.push(f);
                    }
                }
            }
            let mut boundary_pins: Vec<HypernodeId> = Vec::new();
            for &f in &affected {
                for &pin in hg.pins(f) {
                    if !self.moved_scratch[pin] {
                        self.moved_scratch[pin] = true;
                        boundary_pins.push(pin);
                    }
                }
            }
            for &f in &affected {
                self.seen_edges[f] = false;
            }
            let mut rekey: Vec<HyperedgeId> = Vec::new();
            for &pin in &boundary_pins {
                for &f in hg.incident_edges(pin) {
                    if !self.seen_edges[f] {
                        self.seen_edges[f] = true;
                        rekey.push(f);
                    }
                }
            }
            for pin in boundary_pins {
                self.moved_scratch[pin] = false;
            }
            for &f in &rekey {
                self.seen_edges[f] = false;
            }
            for f in rekey {
                if self.marked_edges[f] {
                    continue;
                }
                if hg.connectivity(f) < 2 {
                    self.deactivate(f);
                } else {
                    self.activate(hg, f);
                }
            }

            let improved_cut_within_balance = cut < *best_cut && imbalance <= max_imbalance;
            let improved_balance_less_equal_cut = imbalance < *best_imbalance && cut <= *best_cut;
            if improved_cut_within_balance || improved_balance_less_equal_cut {
                if cut < *best_cut {
                    debug!("hyperedge FM improved cut from {} to {}", *best_cut, cut);
                }
                *best_cut = cut;
                *best_imbalance = imbalance;
                min_cut_index = self.performed_moves.len() as i64 - 1;
                last_improving_edge_move = num_edge_moves as i64;
                self.stopping.reset();
            }
            num_edge_moves += 1;
        }

        let last = self.performed_moves.len() as i64 - 1;
        self.rollback(hg, last, min_cut_index);
        debug_assert_eq!(*best_cut, metrics::hyperedge_cut(hg));

        improvement_found(
            *best_cut,
            initial_cut,
            *best_imbalance,
            initial_imbalance,
            max_imbalance,
        )
    }

    fn num_repetitions(&self) -> usize {
        self.config.her_fm.num_repetitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refinement::NumberOfFruitlessMovesStopsSearch;
    use rand::SeedableRng;

    type SimpleHerFm = HyperedgeFmRefiner<NumberOfFruitlessMovesStopsSearch>;

    fn path_hypergraph() -> Hypergraph {
        Hypergraph::new(4, 3, &[0, 2, 4, 6], &[0, 1, 1, 2, 2, 3], 2, None, None)
    }

    fn config_for(hg: &Hypergraph, epsilon: f64) -> Configuration {
        let mut config = Configuration::default();
        config.partition.k = 2;
        config.partition.epsilon = epsilon;
        config.finalize(hg.total_weight(), hg.initial_num_nodes());
        config
    }

    #[test]
    fn test_gain_counts_side_effects() {
        let mut hg = path_hypergraph();
        for (u, &p) in [0, 1, 0, 1].iter().enumerate() {
            hg.set_node_part(u, p);
        }
        let config = config_for(&hg, 0.5);
        let mut refiner = SimpleHerFm::new(4, 3, &config);

        // Pulling {1,2} into block 0 moves pin 1: closes {0,1} and {1,2}.
        assert_eq!(refiner.compute_gain(&hg, 1, 0), 2);
        // Pulling {1,2} into block 1 moves pin 2: closes {1,2} and {2,3}.
        assert_eq!(refiner.compute_gain(&hg, 1, 1), 2);
        // Pulling {0,1} into block 1 closes it but cuts nothing new.
        assert_eq!(refiner.compute_gain(&hg, 0, 1), 1);
    }

    #[test]
    fn test_refine_pulls_edges_together() {
        let mut hg = path_hypergraph();
        for (u, &p) in [0, 1, 0, 1].iter().enumerate() {
            hg.set_node_part(u, p);
        }
        let config = config_for(&hg, 0.5);
        let mut refiner = SimpleHerFm::new(4, 3, &config);
        refiner.initialize(&hg);
        let mut best_cut = metrics::hyperedge_cut(&hg);
        let mut best_imbalance = metrics::imbalance(&hg);
        assert_eq!(best_cut, 3);
        let mut rng = SmallRng::seed_from_u64(8);

        let improved = refiner.refine(
            &mut hg,
            &[0, 1, 2, 3],
            &mut best_cut,
            &mut best_imbalance,
            &mut rng,
        );

        assert!(improved);
        assert_eq!(best_cut, 1);
        assert_eq!(metrics::hyperedge_cut(&hg), 1);
    }

    #[test]
    fn test_clogged_queues_discard_heads() {
        let mut hg = path_hypergraph();
        for (u, &p) in [0, 1, 0, 1].iter().enumerate() {
            hg.set_node_part(u, p);
        }
        // ε = 0.03 caps blocks at 2: every batch move is infeasible.
        let config = config_for(&hg, 0.03);
        let mut refiner = SimpleHerFm::new(4, 3, &config);
        refiner.initialize(&hg);
        let mut best_cut = metrics::hyperedge_cut(&hg);
        let mut best_imbalance = metrics::imbalance(&hg);
        let mut rng = SmallRng::seed_from_u64(8);

        let improved = refiner.refine(
            &mut hg,
            &[0, 1, 2, 3],
            &mut best_cut,
            &mut best_imbalance,
            &mut rng,
        );

        // Heads get discarded pair by pair until the queues drain.
        assert!(!improved);
        assert_eq!(best_cut, 3);
        assert_eq!(metrics::hyperedge_cut(&hg), 3);
    }
}
