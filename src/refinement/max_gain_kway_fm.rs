use log::debug;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::Configuration;
use crate::hypergraph::{Gain, Hypergraph, HypernodeId, PartitionId};
use crate::metrics;
use crate::priority_queue::PriorityQueue;
use crate::refinement::{improvement_found, Refiner, StoppingPolicy};

/// k-way FM with a single queue keyed by each node's best gain over all
/// target blocks. The concrete target is resolved only when the node is
/// popped: infeasible targets are skipped, ties are broken at random, and a
/// stale key is repaired in place before the node is considered again.
pub struct MaxGainNodeKWayFmRefiner<S> {
    config: Configuration,
    pq: PriorityQueue<Gain>,
    marked: Vec<bool>,
    seen: Vec<bool>,
    performed_moves: Vec<(HypernodeId, PartitionId, PartitionId)>,
    stopping: S,
}

impl<S: StoppingPolicy> MaxGainNodeKWayFmRefiner<S> {
    pub fn new(num_nodes: usize, config: &Configuration) -> Self {
        MaxGainNodeKWayFmRefiner {
            config: config.clone(),
            pq: PriorityQueue::new(num_nodes),
            marked: vec![false; num_nodes],
            seen: vec![false; num_nodes],
            performed_moves: Vec::with_capacity(num_nodes),
            stopping: S::default(),
        }
    }

    fn compute_gain(&self, hg: &Hypergraph, node: HypernodeId, target: PartitionId) -> Gain {
        let from = hg.part_id(node);
        debug_assert_ne!(from, target);
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

    fn adjacent_blocks(&self, hg: &Hypergraph, node: HypernodeId) -> Vec<PartitionId> {
        let own = hg.part_id(node);
        let mut adjacent = vec![false; self.config.partition.k];
        for &he in hg.incident_edges(node) {
            for b in 0..self.config.partition.k {
                if hg.pin_count_in_part(he, b as PartitionId) > 0 {
                    adjacent[b] = true;
                }
            }
        }
        adjacent
            .iter()
            .enumerate()
            .filter(|&(b, &a)| a && b as PartitionId != own)
            .map(|(b, _)| b as PartitionId)
            .collect()
    }

    /// Best gain over all adjacent blocks, irrespective of balance. This is
    /// the queue key; feasibility is re-checked at pop time.
    fn max_gain(&self, hg: &Hypergraph, node: HypernodeId) -> Option<Gain> {
        self.adjacent_blocks(hg, node)
            .into_iter()
            .map(|b| self.compute_gain(hg, node, b))
            .max()
    }

    /// Resolve the target block at pop time: the best-gain block among those
    /// with room for the node, ties broken uniformly at random.
    fn resolve_target(
        &self,
        hg: &Hypergraph,
        node: HypernodeId,
        rng: &mut SmallRng,
    ) -> Option<(PartitionId, Gain)> {
        let weight = hg.node_weight(node);
        let mut best: Option<(PartitionId, Gain)> = None;
        let mut num_ties = 0usize;
        for b in self.adjacent_blocks(hg, node) {
            if hg.part_weight(b) + weight > self.config.partition.max_part_weight {
                continue;
            }
            let gain = self.compute_gain(hg, node, b);
            match best {
                Some((_, best_gain)) if gain < best_gain => {}
                Some((_, best_gain)) if gain == best_gain => {
                    num_ties += 1;
                    if rng.gen_range(0..=num_ties) == 0 {
                        best = Some((b, gain));
                    }
                }
                _ => {
                    num_ties = 0;
                    best = Some((b, gain));
                }
            }
        }
        best
    }

    fn activate(&mut self, hg: &Hypergraph, node: HypernodeId) {
        debug_assert!(!self.marked[node]);
        if hg.is_border_node(node) && !self.pq.contains(node) {
            if let Some(gain) = self.max_gain(hg, node) {
                self.pq.insert(node, gain);
            }
        }
    }

    fn update_neighbours(&mut self, hg: &Hypergraph, moved: HypernodeId) {
        let mut touched = Vec::new();
        for &he in hg.incident_edges(moved) {
            for &pin in hg.pins(he) {
                if pin != moved && !self.seen[pin] && !self.marked[pin] {
                    self.seen[pin] = true;
                    touched.push(pin);
                }
            }
        }
        for &pin in &touched {
            if self.pq.contains(pin) {
                self.pq.remove(pin);
            }
            self.activate(hg, pin);
        }
        for pin in touched {
            self.seen[pin] = false;
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

impl<S: StoppingPolicy> Refiner for MaxGainNodeKWayFmRefiner<S> {
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

        self.pq.clear();
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
            if self.pq.is_empty() {
                break;
            }
            let fruitless = (num_moves as i64 - 1 - min_cut_index).max(0) as usize;
            if self.stopping.should_stop(fruitless, &self.config.fm) {
                break;
            }

            let (node, key) = self.pq.pop_max().unwrap();
            let Some((to, gain)) = self.resolve_target(hg, node, rng) else {
                // Every adjacent block is full; drop the node for this pass.
                continue;
            };
            if gain != key {
                // The cached key went stale; requeue with the exact gain.
                self.pq.insert(node, gain);
                continue;
            }
            let from = hg.part_id(node);
            debug_assert!(!self.marked[node]);

            hg.change_node_part(node, from, to);
            self.marked[node] = true;
            cut -= gain;
            self.stopping.update_statistics(gain);
            let imbalance = metrics::imbalance(hg);
            debug_assert_eq!(cut, metrics::hyperedge_cut(hg));

            self.update_neighbours(hg, node);

            let improved_cut_within_balance = cut < *best_cut && imbalance <= max_imbalance;
            let improved_balance_less_equal_cut = imbalance < *best_imbalance && cut <= *best_cut;
            if improved_cut_within_balance || improved_balance_less_equal_cut {
                if cut < *best_cut {
                    debug!("max-gain k-way FM improved cut from {} to {}", *best_cut, cut);
                }
                *best_cut = cut;
                *best_imbalance = imbalance;
                min_cut_index = num_moves as i64;
                self.stopping.reset();
            }
            self.performed_moves.push((node, from, to));
            num_moves += 1;
        }

        self.rollback(hg, num_moves as i64 - 1, min_cut_index);
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
        self.config.fm.num_repetitions
    }
}
