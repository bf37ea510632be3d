use rand::rngs::SmallRng;

mod hyperedge_fm;
mod kway_fm;
mod label_propagation;
mod max_gain_kway_fm;
mod stopping;
mod twoway_fm;

pub use hyperedge_fm::HyperedgeFmRefiner;
pub use kway_fm::KWayFmRefiner;
pub use label_propagation::LabelPropagationRefiner;
pub use max_gain_kway_fm::MaxGainNodeKWayFmRefiner;
pub use stopping::{
    NumberOfFruitlessMovesStopsSearch, RandomWalkModelStopsSearch, StoppingPolicy,
    NGpRandomWalkStopsSearch,
};
pub use twoway_fm::TwoWayFmRefiner;

use crate::config::{Configuration, RefinementAlgorithm, StoppingRule};
use crate::hypergraph::{EdgeWeight, Hypergraph, HypernodeId};

/// Move-based local search applied after every uncontraction.
///
/// `refine` runs one pass seeded from the given nodes. `best_cut` and
/// `best_imbalance` must describe the current hypergraph state on entry and
/// are updated to the best state found; the hypergraph is left exactly in
/// that state (rollback included). Returns whether the pass improved on the
/// incoming solution.
pub trait Refiner {
    fn initialize(&mut self, hg: &Hypergraph);

    fn refine(
        &mut self,
        hg: &mut Hypergraph,
        refinement_nodes: &[HypernodeId],
        best_cut: &mut EdgeWeight,
        best_imbalance: &mut f64,
        rng: &mut SmallRng,
    ) -> bool;

    /// Maximum local-search repetitions per level.
    fn num_repetitions(&self) -> usize {
        1
    }
}

/// Refiner that leaves the projected partition untouched.
pub struct DoNothingRefiner;

impl Refiner for DoNothingRefiner {
    fn initialize(&mut self, _hg: &Hypergraph) {}

    fn refine(
        &mut self,
        _hg: &mut Hypergraph,
        _refinement_nodes: &[HypernodeId],
        _best_cut: &mut EdgeWeight,
        _best_imbalance: &mut f64,
        _rng: &mut SmallRng,
    ) -> bool {
        false
    }
}

/// Accepting a pass: the cut dropped, or an infeasible imbalance improved
/// without hurting the cut.
pub(crate) fn improvement_found(
    best_cut: EdgeWeight,
    initial_cut: EdgeWeight,
    best_imbalance: f64,
    initial_imbalance: f64,
    max_imbalance: f64,
) -> bool {
    best_cut < initial_cut
        || (initial_imbalance > max_imbalance && best_imbalance < initial_imbalance)
}

/// Build the refiner selected by the configuration. The stopping rule is a
/// type parameter of the FM refiners, so each combination dispatches once
/// here and the per-move hot path stays monomorphic.
pub fn create_refiner(hg: &Hypergraph, config: &Configuration) -> Box<dyn Refiner> {
    let n = hg.initial_num_nodes();
    match (
        config.partition.refinement_algorithm,
        config.fm.stopping_rule,
    ) {
        (RefinementAlgorithm::TwoWayFm, StoppingRule::Simple) => Box::new(TwoWayFmRefiner::<
            NumberOfFruitlessMovesStopsSearch,
        >::new(n, config)),
        (RefinementAlgorithm::TwoWayFm, StoppingRule::Adaptive1) => {
            Box::new(TwoWayFmRefiner::<RandomWalkModelStopsSearch>::new(n, config))
        }
        (RefinementAlgorithm::TwoWayFm, StoppingRule::Adaptive2) => {
            Box::new(TwoWayFmRefiner::<NGpRandomWalkStopsSearch>::new(n, config))
        }
        (RefinementAlgorithm::KWayFm, StoppingRule::Simple) => Box::new(KWayFmRefiner::<
            NumberOfFruitlessMovesStopsSearch,
        >::new(n, config)),
        (RefinementAlgorithm::KWayFm, StoppingRule::Adaptive1) => {
            Box::new(KWayFmRefiner::<RandomWalkModelStopsSearch>::new(n, config))
        }
        (RefinementAlgorithm::KWayFm, StoppingRule::Adaptive2) => {
            Box::new(KWayFmRefiner::<NGpRandomWalkStopsSearch>::new(n, config))
        }
        (RefinementAlgorithm::KWayFmMaxGain, StoppingRule::Simple) => {
            Box::new(MaxGainNodeKWayFmRefiner::<NumberOfFruitlessMovesStopsSearch>::new(n, config))
        }
        (RefinementAlgorithm::KWayFmMaxGain, StoppingRule::Adaptive1) => {
            Box::new(MaxGainNodeKWayFmRefiner::<RandomWalkModelStopsSearch>::new(n, config))
        }
        (RefinementAlgorithm::KWayFmMaxGain, StoppingRule::Adaptive2) => {
            Box::new(MaxGainNodeKWayFmRefiner::<NGpRandomWalkStopsSearch>::new(n, config))
        }
        (RefinementAlgorithm::HyperedgeFm, _) => {
            let m = hg.initial_num_edges();
            match config.her_fm.stopping_rule {
                StoppingRule::Simple => {
                    Box::new(HyperedgeFmRefiner::<NumberOfFruitlessMovesStopsSearch>::new(
                        n, m, config,
                    ))
                }
                StoppingRule::Adaptive1 => {
                    Box::new(HyperedgeFmRefiner::<RandomWalkModelStopsSearch>::new(n, m, config))
                }
                StoppingRule::Adaptive2 => {
                    Box::new(HyperedgeFmRefiner::<NGpRandomWalkStopsSearch>::new(n, m, config))
                }
            }
        }
        (RefinementAlgorithm::LabelPropagation, _) => {
            Box::new(LabelPropagationRefiner::new(n, config))
        }
    }
}
