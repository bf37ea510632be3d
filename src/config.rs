use std::path::PathBuf;

use crate::hypergraph::NodeWeight;
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoarseningAlgorithm {
    /// Re-rate all affected neighbors after every contraction.
    HeavyFull,
    /// Cache ratings; re-rate invalidated entries only when they surface.
    HeavyPartial,
    /// Mark neighbors stale and re-rate lazily on pop.
    HeavyLazy,
    /// Contract whole hyperedges in descending score order.
    Hyperedge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementAlgorithm {
    TwoWayFm,
    KWayFm,
    KWayFmMaxGain,
    HyperedgeFm,
    LabelPropagation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoppingRule {
    /// Threshold on the number of fruitless moves.
    Simple,
    /// Random-walk model with Welford statistics.
    Adaptive1,
    /// Random-walk model with the original constants.
    Adaptive2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialPartitionerKind {
    HMetis,
    PaToH,
    /// Native greedy hypergraph growing; needs no external binary.
    Greedy,
}

/// How the hyperedge FM refiner treats queue heads whose move would violate
/// the balance constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloggingPolicy {
    /// Discard both heads, but only once neither queue has a feasible head.
    OnlyRemoveIfBothQueuesClogged,
    /// Discard exactly the infeasible head(s) and retry.
    RemoveOnlyTheCloggingEntry,
    /// Keep all entries; stop the pass when no head is feasible.
    DoNotRemoveAndResetEligibility,
}

#[derive(Debug, Clone)]
pub struct PartitionConfig {
    pub graph_filename: PathBuf,
    pub k: usize,
    pub epsilon: f64,
    pub seed: u64,
    /// Initial-partitioning trials; the best cut wins.
    pub initial_partitioning_attempts: usize,
    /// Number of v-cycle iterations after the first multilevel cycle.
    pub global_search_iterations: usize,
    /// Hyperedges larger than this are ignored during coarsening.
    /// `usize::MAX` disables the threshold.
    pub hyperedge_size_threshold: usize,
    pub coarsening_algorithm: CoarseningAlgorithm,
    pub refinement_algorithm: RefinementAlgorithm,
    pub initial_partitioner: InitialPartitionerKind,
    pub initial_partitioner_path: Option<PathBuf>,
    pub initial_parallel_he_removal: bool,
    /// Derived: total hypernode weight of the input.
    pub total_graph_weight: NodeWeight,
    /// Derived: L_max = (1+ε)·⌈c(V)/k⌉.
    pub max_part_weight: NodeWeight,
    /// Derived: balance parameter handed to hMetis-style partitioners.
    pub hmetis_ub_factor: f64,
}

#[derive(Debug, Clone)]
pub struct CoarseningConfig {
    /// s in W_max = ⌈s·c(V)/(t·k)⌉.
    pub max_allowed_weight_multiplier: f64,
    /// t: coarsening stops at t·k live hypernodes.
    pub contraction_limit_multiplier: usize,
    /// Derived: t·k.
    pub contraction_limit: usize,
    /// Derived: W_max.
    pub max_allowed_node_weight: NodeWeight,
}

#[derive(Debug, Clone)]
pub struct FmConfig {
    pub stopping_rule: StoppingRule,
    /// Local-search repetitions per level; `usize::MAX` means unlimited.
    pub num_repetitions: usize,
    pub max_number_of_fruitless_moves: usize,
    pub alpha: f64,
    /// Derived: β = ln |V|.
    pub beta: f64,
}

#[derive(Debug, Clone)]
pub struct HerFmConfig {
    pub stopping_rule: StoppingRule,
    pub num_repetitions: usize,
    pub max_number_of_fruitless_moves: usize,
    pub clogging_policy: CloggingPolicy,
}

#[derive(Debug, Clone)]
pub struct LpConfig {
    pub max_number_iterations: usize,
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub partition: PartitionConfig,
    pub coarsening: CoarseningConfig,
    pub fm: FmConfig,
    pub her_fm: HerFmConfig,
    pub lp: LpConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            partition: PartitionConfig {
                graph_filename: PathBuf::new(),
                k: 2,
                epsilon: 0.05,
                seed: 0,
                initial_partitioning_attempts: 10,
                global_search_iterations: 10,
                hyperedge_size_threshold: usize::MAX,
                coarsening_algorithm: CoarseningAlgorithm::HeavyFull,
                refinement_algorithm: RefinementAlgorithm::KWayFm,
                initial_partitioner: InitialPartitionerKind::HMetis,
                initial_partitioner_path: None,
                initial_parallel_he_removal: false,
                total_graph_weight: 0,
                max_part_weight: 0,
                hmetis_ub_factor: 0.0,
            },
            coarsening: CoarseningConfig {
                max_allowed_weight_multiplier: 3.5,
                contraction_limit_multiplier: 160,
                contraction_limit: 0,
                max_allowed_node_weight: 0,
            },
            fm: FmConfig {
                stopping_rule: StoppingRule::Simple,
                num_repetitions: usize::MAX,
                max_number_of_fruitless_moves: 150,
                alpha: 8.0,
                beta: 0.0,
            },
            her_fm: HerFmConfig {
                stopping_rule: StoppingRule::Simple,
                num_repetitions: 1,
                max_number_of_fruitless_moves: 10,
                clogging_policy: CloggingPolicy::OnlyRemoveIfBothQueuesClogged,
            },
            lp: LpConfig {
                max_number_iterations: 3,
            },
        }
    }
}

impl Configuration {
    /// Fill in every value derived from the input hypergraph: weight caps,
    /// contraction limit, the stopping-rule β, and the ub_factor forwarded to
    /// hMetis-style initial partitioners.
    pub fn finalize(&mut self, total_weight: NodeWeight, num_nodes: usize) {
        let k = self.partition.k;
        self.partition.total_graph_weight = total_weight;
        self.partition.max_part_weight =
            metrics::max_part_weight(total_weight, k, self.partition.epsilon);

        self.coarsening.contraction_limit = self.coarsening.contraction_limit_multiplier * k;
        self.coarsening.max_allowed_node_weight = ((self.coarsening.max_allowed_weight_multiplier
            * total_weight as f64)
            / self.coarsening.contraction_limit as f64)
            .ceil() as NodeWeight;

        self.fm.beta = (num_nodes.max(1) as f64).ln();

        // hMetis-RB with UBfactor b allows blocks of (0.5 + b/100)^log2(k) · n;
        // solve for the b that matches L_max = (1+ε)·⌈c(V)/k⌉.
        let exp = 1.0 / (k as f64).log2();
        let ceil_avg = (total_weight as f64 / k as f64).ceil();
        self.partition.hmetis_ub_factor = 50.0
            * (2.0
                * (1.0 + self.partition.epsilon).powf(exp)
                * (ceil_avg / total_weight as f64).powf(exp)
                - 1.0);
    }
}
