use log::debug;
use rand::rngs::SmallRng;

use crate::config::Configuration;
use crate::hypergraph::{Gain, Hypergraph, HypernodeId, PartitionId};
use crate::metrics;
use crate::priority_queue::KWayPriorityQueue;
use crate::refinement::{improvement_found, Refiner, StoppingPolicy};

/// Direct k-way FM: one queue per target block, keyed by the gain of moving
/// a node there, with a global maximum over all enabled target queues.
///
/// A target queue is disabled as soon as a popped move would overrun the
/// block's weight cap and re-enabled once a move frees weight again. After
/// each move the gains of the moved node's neighborhood are recomputed from
/// the pin-count tables.
pub struct KWayFmRefiner<S> {
    config: Configuration,
    pq: KWayPriorityQueue<Gain>,
    marked: Vec<bool>,
    seen: Vec<bool>,
    performed_moves: Vec<(HypernodeId, PartitionId, PartitionId)>,
    stopping: S,
}

impl<S: StoppingPolicy> KWayFmRefiner<S> {
    pub fn new(num_nodes: usize, config: &Configuration) -> Self {
        KWayFmRefiner {
            config: config.clone(),
            pq: KWayPriorityQueue::new(config.partition.k, num_nodes),
            marked: vec![false; num_nodes],
            seen: vec![false; num_nodes],
            performed_moves: Vec::with_capacity(num_nodes),
            stopping: S::default(),
        }
    }

    /// Cut gain of moving `node` into `target`: edges whose other pins all
    /// sit in `target` become internal, fully internal edges become cut.
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

    /// Insert `node` into the queue of every adjacent block.
    fn activate(&mut self, hg: &Hypergraph, node: HypernodeId) {
        debug_assert!(!self.marked[node]);
        if !hg.is_border_node(node) {
            return;
        }
        let own = hg.part_id(node);
        let mut adjacent = vec![false; self.config.partition.k];
        for &he in hg.incident_edges(node) {
            for b in 0..self.config.partition.k {
                if hg.pin_count_in_part(he, b as PartitionId) > 0 {
                    adjacent[b] = true;
                }
            }
        }
        for (b, &is_adjacent) in adjacent.iter().enumerate() {
            if is_adjacent && b as PartitionId != own && !self.pq.contains(node, b) {
                let gain = self.compute_gain(hg, node, b as PartitionId);
                self.pq.insert(node, b, gain);
            }
        }
    }

    /// Recompute the queue entries of every pin sharing a hyperedge with the
    /// moved node.
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
            self.pq.remove_everywhere(pin);
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

impl<S: StoppingPolicy> Refiner for KWayFmRefiner<S> {
    fn initialize(&mut self, hg: &Hypergraph) {
        debug_assert!(hg.nodes().all(|u| hg.part_id(u) >= 0));
    }

    fn refine(
        &mut self,
        hg: &mut Hypergraph,
        refinement_nodes: &[HypernodeId],
        best_cut: &mut Gain,
        best_imbalance: &mut f64,
        _rng: &mut SmallRng,
    ) -> bool {
        debug_assert_eq!(*best_cut, metrics::hyperedge_cut(hg));

        self.pq.clear();
        self.marked.fill(false);
        self.performed_moves.clear();
        self.stopping.reset();

        for &node in refinement_nodes {
            if !self.marked[node] && !self.pq.contains_anywhere(node) {
                self.activate(hg, node);
            }
        }

        let max_imbalance = self.config.partition.epsilon;
        let max_part_weight = self.config.partition.max_part_weight;
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

            let Some((node, to, gain)) = self.pq.pop_max() else {
                break;
            };
            if hg.part_weight(to as PartitionId) + hg.node_weight(node) > max_part_weight {
                // The block is full for this move; park the entry and skip
                // the whole target queue until weight frees up.
                self.pq.insert(node, to, gain);
                self.pq.disable_part(to);
                continue;
            }
            let from = hg.part_id(node);
            debug_assert!(!self.marked[node]);

            hg.change_node_part(node, from, to as PartitionId);
            self.marked[node] = true;
            self.pq.remove_everywhere(node);
            self.pq.enable_part(from as usize);
            cut -= gain;
            self.stopping.update_statistics(gain);
            let imbalance = metrics::imbalance(hg);
            debug_assert_eq!(cut, metrics::hyperedge_cut(hg));

            self.update_neighbours(hg, node);

            let improved_cut_within_balance = cut < *best_cut && imbalance <= max_imbalance;
            let improved_balance_less_equal_cut = imbalance < *best_imbalance && cut <= *best_cut;
            if improved_cut_within_balance || improved_balance_less_equal_cut {
                if cut < *best_cut {
                    debug!("k-way FM improved cut from {} to {}", *best_cut, cut);
                }
                *best_cut = cut;
                *best_imbalance = imbalance;
                min_cut_index = num_moves as i64;
                self.stopping.reset();
            }
            self.performed_moves.push((node, from, to as PartitionId));
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
