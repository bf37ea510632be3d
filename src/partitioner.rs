use log::{debug, info};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::coarsening::{self, Coarsener};
use crate::config::Configuration;
use crate::hypergraph::{EdgeWeight, Hypergraph, HypernodeId};
use crate::initial;
use crate::metrics;
use crate::refinement::{self, Refiner};
use crate::PartitionerError;

/// Outcome of a full partitioning run.
#[derive(Debug, Clone)]
pub struct PartitionResults {
    pub cut: EdgeWeight,
    pub imbalance: f64,
}

/// Drives the three multilevel stages: coarsen, initial partition of the
/// coarsest hypergraph, uncoarsen with refinement, followed by the
/// configured number of v-cycles over the partitioned hypergraph.
pub struct Partitioner {
    config: Configuration,
}

impl Partitioner {
    pub fn new(config: Configuration) -> Self {
        Partitioner { config }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Partition `hg` into k blocks. The configuration must already be
    /// finalized against this hypergraph.
    pub fn partition(&self, hg: &mut Hypergraph) -> Result<PartitionResults, PartitionerError> {
        let mut rng = SmallRng::seed_from_u64(self.config.partition.seed);
        let mut coarsener = coarsening::create_coarsener(&self.config);
        let mut refiner = refinement::create_refiner(hg, &self.config);
        let limit = self.config.coarsening.contraction_limit;

        if self.config.partition.initial_parallel_he_removal {
            let removed = hg.remove_parallel_hyperedges();
            info!("removed {removed} parallel hyperedges");
        }

        info!(
            "coarsening {} hypernodes towards limit {}",
            hg.num_nodes(),
            limit
        );
        coarsener.coarsen(hg, limit, &mut rng);
        initial::partition(hg, &self.config, &mut rng)?;
        let (mut cut, mut imbalance) = coarsener.uncoarsen(hg, refiner.as_mut(), &mut rng);
        (cut, imbalance) =
            self.global_refinement(hg, refiner.as_mut(), cut, imbalance, &mut rng);
        info!("initial cycle done, cut {cut}");

        for vcycle in 1..=self.config.partition.global_search_iterations {
            coarsener.coarsen(hg, limit, &mut rng);
            let (vcut, vimbalance) = coarsener.uncoarsen(hg, refiner.as_mut(), &mut rng);
            (cut, imbalance) =
                self.global_refinement(hg, refiner.as_mut(), vcut, vimbalance, &mut rng);
            debug!("v-cycle {vcycle} done, cut {cut}");
        }

        debug_assert_eq!(cut, metrics::hyperedge_cut(hg));
        Ok(PartitionResults { cut, imbalance })
    }

    /// Whole-boundary refinement: repeat passes seeded with every border
    /// node until one fails to improve. This is the only refinement a
    /// hypergraph smaller than the contraction limit receives.
    fn global_refinement(
        &self,
        hg: &mut Hypergraph,
        refiner: &mut dyn Refiner,
        mut cut: EdgeWeight,
        mut imbalance: f64,
        rng: &mut SmallRng,
    ) -> (EdgeWeight, f64) {
        refiner.initialize(hg);
        let mut repetitions = 0;
        loop {
            let border_nodes: Vec<HypernodeId> =
                hg.nodes().filter(|&u| hg.is_border_node(u)).collect();
            if border_nodes.is_empty() {
                break;
            }
            let improved = refiner.refine(hg, &border_nodes, &mut cut, &mut imbalance, rng);
            repetitions += 1;
            if !improved || repetitions >= refiner.num_repetitions() {
                break;
            }
        }
        (cut, imbalance)
    }
}
