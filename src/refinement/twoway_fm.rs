use log::debug;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::Configuration;
use crate::hypergraph::{Gain, HyperedgeId, Hypergraph, HypernodeId, PartitionId};
use crate::metrics;
use crate::priority_queue::PriorityQueue;
use crate::refinement::{improvement_found, Refiner, StoppingPolicy};

/// Fiduccia–Mattheyses local search for bipartitions.
///
/// One addressable queue per block holds the gain of moving each border node
/// across. A pass greedily applies the best balance-preserving move, streams
/// gain deltas to the neighborhood after each move, and finally rolls back to
/// the best prefix observed.
pub struct TwoWayFmRefiner<S> {
    config: Configuration,
    pq: [PriorityQueue<Gain>; 2],
    marked: Vec<bool>,
    just_activated: Vec<bool>,
    performed_moves: Vec<HypernodeId>,
    stopping: S,
}

impl<S: StoppingPolicy> TwoWayFmRefiner<S> {
    pub fn new(num_nodes: usize, config: &Configuration) -> Self {
        debug_assert_eq!(config.partition.k, 2);
        TwoWayFmRefiner {
            config: config.clone(),
            pq: [
                PriorityQueue::new(num_nodes),
                PriorityQueue::new(num_nodes),
            ],
            marked: vec![false; num_nodes],
            just_activated: vec![false; num_nodes],
            performed_moves: Vec::with_capacity(num_nodes),
            stopping: S::default(),
        }
    }

    fn activate(&mut self, hg: &Hypergraph, node: HypernodeId) {
        debug_assert!(!self.marked[node]);
        if hg.is_border_node(node) {
            let part = hg.part_id(node) as usize;
            if !self.pq[part].contains(node) {
                let gain = self.compute_gain(hg, node);
                self.pq[part].insert(node, gain);
            }
        }
    }

    /// gain = ω({e : n(e, from) = 1}) − ω({e : n(e, to) = 0}).
    fn compute_gain(&self, hg: &Hypergraph, node: HypernodeId) -> Gain {
        let from = hg.part_id(node);
        let to = from ^ 1;
        let mut gain = 0;
        for &he in hg.incident_edges(node) {
            if hg.edge_size(he) < 2 {
                continue;
            }
            if hg.pin_count_in_part(he, to) == 0 {
                gain -= hg.edge_weight(he);
            } else if hg.pin_count_in_part(he, from) == 1 {
                gain += hg.edge_weight(he);
            }
        }
        gain
    }

    fn move_preserves_balance(&self, hg: &Hypergraph, node: HypernodeId, to: PartitionId) -> bool {
        hg.part_weight(to) + hg.node_weight(node) <= self.config.partition.max_part_weight
    }

    fn select_queue(&self, eligible0: bool, eligible1: bool, rng: &mut SmallRng) -> usize {
        debug_assert!(eligible0 || eligible1);
        if eligible0 && eligible1 {
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
        }
    }

    /// Stream the gain deltas caused by moving `moved` from `from` to `to`
    /// to every unmarked pin of its hyperedges.
    fn update_neighbours(
        &mut self,
        hg: &Hypergraph,
        moved: HypernodeId,
        from: PartitionId,
        to: PartitionId,
    ) {
        self.just_activated.fill(false);
        let incident: Vec<HyperedgeId> = hg.incident_edges(moved).to_vec();
        for he in incident {
            if hg.edge_size(he) < 2 {
                continue;
            }
            let weight = hg.edge_weight(he);
            let n_to = hg.pin_count_in_part(he, to);
            let n_from = hg.pin_count_in_part(he, from);

            if hg.edge_size(he) == 2 {
                // The edge flipped between internal and cut: the other pin's
                // gain changes by 2ω.
                let delta = if n_to == 1 { 2 * weight } else { -2 * weight };
                self.update_pins_uniform(hg, he, delta);
            } else if n_to == 1 {
                // First pin in `to`: every remaining pin loses ω of incentive
                // to stay put.
                self.update_pins_uniform(hg, he, weight);
            } else if n_from == 0 {
                self.update_pins_uniform(hg, he, -weight);
            } else if n_from == 1 {
                // The last-but-one pin left `from`: its lone holdout gains ω;
                // with three pins the pin in `to` also loses ω.
                let other = if hg.edge_size(he) == 3 { -weight } else { 0 };
                self.update_pins_split(hg, he, weight, other, from);
            } else if n_to == 2 {
                self.update_pins_split(hg, he, -weight, 0, to);
            }
        }
    }

    fn update_pins_uniform(&mut self, hg: &Hypergraph, he: HyperedgeId, delta: Gain) {
        for &pin in hg.pins(he) {
            self.update_pin(hg, pin, delta);
        }
    }

    /// `matching` applies to pins in `compare`, `other` to the rest.
    fn update_pins_split(
        &mut self,
        hg: &Hypergraph,
        he: HyperedgeId,
        matching: Gain,
        other: Gain,
        compare: PartitionId,
    ) {
        for &pin in hg.pins(he) {
            let delta = if hg.part_id(pin) == compare {
                matching
            } else {
                other
            };
            self.update_pin(hg, pin, delta);
        }
    }

    fn update_pin(&mut self, hg: &Hypergraph, pin: HypernodeId, delta: Gain) {
        let part = hg.part_id(pin) as usize;
        if self.pq[part].contains(pin) {
            debug_assert!(!self.marked[pin]);
            if hg.is_border_node(pin) {
                if !self.just_activated[pin] {
                    let key = self.pq[part].key(pin);
                    self.pq[part].update_key(pin, key + delta);
                }
            } else {
                self.pq[part].remove(pin);
            }
        } else if !self.marked[pin] {
            self.activate(hg, pin);
            self.just_activated[pin] = true;
        }
    }

    fn rollback(&mut self, hg: &mut Hypergraph, last_index: i64, min_cut_index: i64) {
        let mut index = last_index;
        while index > min_cut_index {
            let node = self.performed_moves[index as usize];
            let part = hg.part_id(node);
            hg.change_node_part(node, part, part ^ 1);
            index -= 1;
        }
    }
}

impl<S: StoppingPolicy> Refiner for TwoWayFmRefiner<S> {
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
        self.marked.fill(false);
        self.performed_moves.clear();
        self.stopping.reset();

        for &node in refinement_nodes {
            if !self.marked[node] {
                self.activate(hg, node);
            }
        }

        let max_imbalance = self.config.partition.epsilon;
        let initial_cut = *best_cut;
        let initial_imbalance = *best_imbalance;
        let mut cut = *best_cut;
        let mut min_cut_index: i64 = -1;
        let mut num_moves: usize = 0;
        let max_moves = hg.num_nodes();

        while num_moves < max_moves {
            if self.pq[0].is_empty() && self.pq[1].is_empty() {
                break;
            }
            let fruitless = (num_moves as i64 - 1 - min_cut_index).max(0) as usize;
            if self.stopping.should_stop(fruitless, &self.config.fm) {
                break;
            }

            let eligible0 = self.pq[0]
                .max()
                .map_or(false, |node| self.move_preserves_balance(hg, node, 1));
            let eligible1 = self.pq[1]
                .max()
                .map_or(false, |node| self.move_preserves_balance(hg, node, 0));
            if !eligible0 && !eligible1 {
                // Both queue heads would violate balance; nothing to discard.
                break;
            }

            let from = self.select_queue(eligible0, eligible1, rng);
            let (node, gain) = self.pq[from].pop_max().unwrap();
            let to = from ^ 1;
            debug_assert!(!self.marked[node]);

            hg.change_node_part(node, from as PartitionId, to as PartitionId);
            self.marked[node] = true;
            cut -= gain;
            self.stopping.update_statistics(gain);
            let imbalance = metrics::imbalance(hg);
            debug_assert_eq!(cut, metrics::hyperedge_cut(hg));

            self.update_neighbours(hg, node, from as PartitionId, to as PartitionId);

            let improved_cut_within_balance = cut < *best_cut && imbalance <= max_imbalance;
            let improved_balance_less_equal_cut = imbalance < *best_imbalance && cut <= *best_cut;
            if improved_cut_within_balance || improved_balance_less_equal_cut {
                if cut < *best_cut {
                    debug!("two-way FM improved cut from {} to {}", *best_cut, cut);
                }
                *best_cut = cut;
                *best_imbalance = imbalance;
                min_cut_index = num_moves as i64;
                self.stopping.reset();
            }
            self.performed_moves.push(node);
            num_moves += 1;
        }

        self.rollback(hg, num_moves as i64 - 1, min_cut_index);
        debug_assert_eq!(*best_cut, metrics::hyperedge_cut(hg));
        debug_assert!(*best_cut <= initial_cut);

        improvement_found(
            *best_cut,
            initial_cut,
            *best_imbalance,
            initial_imbalance,
            max_imbalance,
        )
    }

    fn num_repetitions(&self) -> usize {
        self.config.fm.num_repetitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refinement::NumberOfFruitlessMovesStopsSearch;
    use rand::SeedableRng;

    type SimpleTwoWayFm = TwoWayFmRefiner<NumberOfFruitlessMovesStopsSearch>;

    fn path_hypergraph() -> Hypergraph {
        // 0 - 1 - 2 - 3 as three size-2 hyperedges.
        Hypergraph::new(4, 3, &[0, 2, 4, 6], &[0, 1, 1, 2, 2, 3], 2, None, None)
    }

    fn config_for(hg: &Hypergraph, epsilon: f64) -> Configuration {
        let mut config = Configuration::default();
        config.partition.k = 2;
        config.partition.epsilon = epsilon;
        config.finalize(hg.total_weight(), hg.initial_num_nodes());
        config
    }

    fn assign(hg: &mut Hypergraph, parts: &[PartitionId]) {
        for (u, &p) in parts.iter().enumerate() {
            hg.set_node_part(u, p);
        }
    }

    #[test]
    fn test_compute_gain() {
        let mut hg = path_hypergraph();
        assign(&mut hg, &[0, 0, 1, 1]);
        let config = config_for(&hg, 0.5);
        let refiner = SimpleTwoWayFm::new(4, &config);

        // Moving 1 across closes {1,2} but opens {0,1}.
        assert_eq!(refiner.compute_gain(&hg, 1), 0);
        // Moving 0 across opens {0,1} and closes nothing.
        assert_eq!(refiner.compute_gain(&hg, 0), -1);
    }

    #[test]
    fn test_activate_inserts_only_border_nodes() {
        let mut hg = path_hypergraph();
        assign(&mut hg, &[0, 0, 1, 1]);
        let config = config_for(&hg, 0.5);
        let mut refiner = SimpleTwoWayFm::new(4, &config);

        refiner.activate(&hg, 1);
        refiner.activate(&hg, 3);

        assert!(refiner.pq[0].contains(1));
        // Node 3 has no cut edge and stays out.
        assert!(!refiner.pq[1].contains(3));
    }

    // Star of size-2 edges around the edge under test so its pins stay
    // border nodes through the move: {1,2} under test, {0,1} and {2,3} as
    // anchors.
    fn anchored_pair_hypergraph() -> Hypergraph {
        Hypergraph::new(4, 3, &[0, 2, 4, 6], &[1, 2, 0, 1, 2, 3], 2, None, None)
    }

    #[test]
    fn test_size_two_edge_turning_internal_costs_2w() {
        let mut hg = anchored_pair_hypergraph();
        assign(&mut hg, &[1, 0, 1, 0]);
        let config = config_for(&hg, 1.0);
        let mut refiner = SimpleTwoWayFm::new(4, &config);
        refiner.activate(&hg, 1);
        refiner.activate(&hg, 2);
        assert_eq!(refiner.pq[0].key(1), 2);
        assert_eq!(refiner.pq[1].key(2), 2);

        // Move 2 next to 1: {1,2} turns internal, pin 1 loses 2ω.
        hg.change_node_part(2, 1, 0);
        refiner.pq[1].remove(2);
        refiner.marked[2] = true;
        refiner.update_neighbours(&hg, 2, 1, 0);

        assert_eq!(refiner.pq[0].key(1), 0);
    }

    #[test]
    fn test_size_two_edge_turning_cut_pays_2w() {
        let mut hg = anchored_pair_hypergraph();
        assign(&mut hg, &[1, 0, 0, 1]);
        let config = config_for(&hg, 1.0);
        let mut refiner = SimpleTwoWayFm::new(4, &config);
        refiner.activate(&hg, 1);
        refiner.activate(&hg, 2);
        assert_eq!(refiner.pq[0].key(1), 0);

        // Move 2 away from 1: {1,2} turns cut, pin 1 gains 2ω.
        hg.change_node_part(2, 0, 1);
        refiner.pq[0].remove(2);
        refiner.marked[2] = true;
        refiner.update_neighbours(&hg, 2, 0, 1);

        assert_eq!(refiner.pq[0].key(1), 2);
    }

    #[test]
    fn test_gain_update_first_pin_in_part() {
        // One size-3 edge, all pins in block 0 plus a helper edge keeping
        // node 3 in block 1.
        let mut hg = Hypergraph::new(4, 2, &[0, 3, 5], &[0, 1, 2, 2, 3], 2, None, None);
        assign(&mut hg, &[0, 0, 0, 1]);
        let config = config_for(&hg, 1.0);
        let mut refiner = SimpleTwoWayFm::new(4, &config);
        refiner.activate(&hg, 2);
        // Closing {2,3} earns ω, opening {0,1,2} costs ω.
        assert_eq!(refiner.pq[0].key(2), 0);

        // Move 2 across: n({0,1,2}, block 1) goes 0 -> 1. Pins 0 and 1 turn
        // into border nodes and enter the queue through activation.
        hg.change_node_part(2, 0, 1);
        refiner.pq[0].remove(2);
        refiner.marked[2] = true;
        refiner.update_neighbours(&hg, 2, 0, 1);

        assert!(refiner.pq[0].contains(0));
        assert!(refiner.pq[0].contains(1));
        assert_eq!(refiner.pq[0].key(0), 0);
        assert_eq!(refiner.pq[0].key(1), 0);
    }

    #[test]
    fn test_gain_update_two_to_one_with_three_pins() {
        // Size-3 edge {0,1,2} with pins 0,1 in block 0 and 2 in block 1,
        // plus anchors so every node stays a border node.
        let mut hg = Hypergraph::new(
            5,
            3,
            &[0, 3, 5, 7],
            &[0, 1, 2, 0, 3, 1, 4],
            2,
            None,
            None,
        );
        assign(&mut hg, &[0, 0, 1, 1, 1]);
        let config = config_for(&hg, 1.0);
        let mut refiner = SimpleTwoWayFm::new(5, &config);
        refiner.activate(&hg, 0);
        refiner.activate(&hg, 1);
        refiner.activate(&hg, 2);
        let gain0_before = refiner.pq[0].key(0);
        let gain2_before = refiner.pq[1].key(2);

        // Move 1 out of block 0: n(e, 0) goes 2 -> 1. The holdout pin 0
        // gains ω; the lone pin 2 in the target block loses ω.
        hg.change_node_part(1, 0, 1);
        refiner.pq[0].remove(1);
        refiner.marked[1] = true;
        refiner.update_neighbours(&hg, 1, 0, 1);

        assert_eq!(refiner.pq[0].key(0), gain0_before + 1);
        assert_eq!(refiner.pq[1].key(2), gain2_before - 1);
    }

    #[test]
    fn test_refine_reaches_optimal_bisection() {
        let mut hg = path_hypergraph();
        assign(&mut hg, &[0, 1, 0, 1]);
        let config = config_for(&hg, 0.5);
        let mut refiner = SimpleTwoWayFm::new(4, &config);
        refiner.initialize(&hg);
        let mut best_cut = metrics::hyperedge_cut(&hg);
        let mut best_imbalance = metrics::imbalance(&hg);
        assert_eq!(best_cut, 3);
        let mut rng = SmallRng::seed_from_u64(42);

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
        // The two halves of the path end up together.
        assert_eq!(hg.part_id(0), hg.part_id(1));
        assert_eq!(hg.part_id(2), hg.part_id(3));
    }

    #[test]
    fn test_refine_rolls_back_fruitless_moves() {
        let mut hg = path_hypergraph();
        assign(&mut hg, &[0, 0, 1, 1]);
        let mut config = config_for(&hg, 0.5);
        config.fm.max_number_of_fruitless_moves = 3;
        let mut refiner = SimpleTwoWayFm::new(4, &config);
        refiner.initialize(&hg);
        let mut best_cut = metrics::hyperedge_cut(&hg);
        let mut best_imbalance = metrics::imbalance(&hg);
        let parts_before: Vec<_> = (0..4).map(|u| hg.part_id(u)).collect();
        let mut rng = SmallRng::seed_from_u64(7);

        let improved = refiner.refine(
            &mut hg,
            &[1, 2],
            &mut best_cut,
            &mut best_imbalance,
            &mut rng,
        );

        // The bisection was already optimal: every prefix is rolled back.
        assert!(!improved);
        assert_eq!(best_cut, 1);
        assert_eq!((0..4).map(|u| hg.part_id(u)).collect::<Vec<_>>(), parts_before);
    }

    #[test]
    fn test_refine_respects_balance_cap() {
        let mut hg = path_hypergraph();
        assign(&mut hg, &[0, 1, 0, 1]);
        // ε = 0.03 caps blocks at weight 2: no single move is feasible.
        let config = config_for(&hg, 0.03);
        let mut refiner = SimpleTwoWayFm::new(4, &config);
        refiner.initialize(&hg);
        let mut best_cut = metrics::hyperedge_cut(&hg);
        let mut best_imbalance = metrics::imbalance(&hg);
        let mut rng = SmallRng::seed_from_u64(3);

        let improved = refiner.refine(
            &mut hg,
            &[0, 1, 2, 3],
            &mut best_cut,
            &mut best_imbalance,
            &mut rng,
        );

        assert!(!improved);
        assert_eq!(best_cut, 3);
        for b in 0..2 {
            assert!(hg.part_weight(b) <= config.partition.max_part_weight);
        }
    }
}
