use log::debug;
use rand::rngs::SmallRng;

mod heavy_edge;
mod hyperedge;
mod rater;

pub use heavy_edge::HeavyEdgeCoarsener;
pub use hyperedge::HyperedgeCoarsener;
pub use rater::{Rater, Rating};

use crate::config::{CoarseningAlgorithm, Configuration};
use crate::hypergraph::{ContractionMemento, EdgeWeight, Hypergraph};
use crate::metrics;
use crate::refinement::Refiner;

/// A multilevel coarsener: contracts pin pairs down to the contraction limit
/// and later drains its contraction history, invoking the refiner after each
/// uncontraction.
pub trait Coarsener {
    /// Contract until at most `limit` hypernodes are live or no eligible
    /// pair remains. Respects block boundaries during v-cycles.
    fn coarsen(&mut self, hg: &mut Hypergraph, limit: usize, rng: &mut SmallRng);

    /// Pop the entire contraction history, projecting the partition and
    /// refining after every uncontraction. Returns (best cut, imbalance).
    fn uncoarsen(
        &mut self,
        hg: &mut Hypergraph,
        refiner: &mut dyn Refiner,
        rng: &mut SmallRng,
    ) -> (EdgeWeight, f64);
}

pub fn create_coarsener(config: &Configuration) -> Box<dyn Coarsener> {
    let rater = Rater::new(config);
    match config.partition.coarsening_algorithm {
        CoarseningAlgorithm::HeavyFull => Box::new(HeavyEdgeCoarsener::full(rater)),
        CoarseningAlgorithm::HeavyPartial => Box::new(HeavyEdgeCoarsener::heuristic(rater)),
        CoarseningAlgorithm::HeavyLazy => Box::new(HeavyEdgeCoarsener::lazy(rater)),
        CoarseningAlgorithm::Hyperedge => Box::new(HyperedgeCoarsener::new(config)),
    }
}

/// Shared uncoarsening loop: one uncontraction per pop, then local search
/// seeded with the two endpoints, repeated while it keeps improving.
fn uncoarsen_history(
    hg: &mut Hypergraph,
    history: &mut Vec<ContractionMemento>,
    refiner: &mut dyn Refiner,
    rng: &mut SmallRng,
) -> (EdgeWeight, f64) {
    let mut best_cut = metrics::hyperedge_cut(hg);
    let mut best_imbalance = metrics::imbalance(hg);
    debug!(
        "uncoarsening {} contractions starting from cut {}",
        history.len(),
        best_cut
    );
    refiner.initialize(hg);
    while let Some(memento) = history.pop() {
        hg.uncontract(&memento);
        let seeds = [memento.u, memento.v];
        let mut repetitions = 0;
        loop {
            let improved = refiner.refine(hg, &seeds, &mut best_cut, &mut best_imbalance, rng);
            repetitions += 1;
            if !improved || repetitions >= refiner.num_repetitions() {
                break;
            }
        }
    }
    debug_assert_eq!(best_cut, metrics::hyperedge_cut(hg));
    (best_cut, best_imbalance)
}
