use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use hypercut::config::{
    CoarseningAlgorithm, Configuration, InitialPartitionerKind, RefinementAlgorithm, StoppingRule,
};
use hypercut::io;
use hypercut::metrics;
use hypercut::partitioner::Partitioner;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CoarseningArg {
    #[value(name = "heavy_full")]
    HeavyFull,
    #[value(name = "heavy_partial")]
    HeavyPartial,
    #[value(name = "heavy_lazy")]
    HeavyLazy,
    Hyperedge,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RefinementArg {
    #[value(name = "twoway_fm")]
    TwowayFm,
    #[value(name = "kway_fm")]
    KwayFm,
    #[value(name = "kway_fm_maxgain")]
    KwayFmMaxgain,
    Hyperedge,
    #[value(name = "label_propagation")]
    LabelPropagation,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoppingArg {
    Simple,
    Adaptive1,
    Adaptive2,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PartitionerArg {
    #[value(name = "hMetis")]
    HMetis,
    #[value(name = "PaToH")]
    PaToH,
    Greedy,
}

/// Multilevel hypergraph partitioner minimizing hyperedge cut.
#[derive(Parser, Debug)]
#[command(name = "hypercut", version)]
struct Cli {
    /// Filename of the hypergraph to be partitioned (.hgr)
    #[arg(long)]
    hgr: PathBuf,

    /// Number of blocks
    #[arg(long)]
    k: usize,

    /// Imbalance parameter epsilon
    #[arg(long = "e")]
    epsilon: f64,

    /// Seed for the random number generator
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Initial partition trials; the result with the smallest cut is kept
    #[arg(long, default_value_t = 10)]
    nruns: usize,

    /// Initial partitioner
    #[arg(long, value_enum, default_value = "hMetis")]
    part: PartitionerArg,

    /// Path to the initial partitioner binary
    #[arg(long = "part-path")]
    part_path: Option<PathBuf>,

    /// Number of v-cycle iterations
    #[arg(long, default_value_t = 10)]
    vcycles: usize,

    /// Hyperedges larger than this are ignored during coarsening (-1 = none)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    cmaxnet: i64,

    /// Coarsening scheme
    #[arg(long, value_enum, default_value = "heavy_full")]
    ctype: CoarseningArg,

    /// Refinement scheme
    #[arg(long, value_enum, default_value = "kway_fm")]
    rtype: RefinementArg,

    /// FM stopping rule
    #[arg(long = "stopFM", value_enum, default_value = "simple")]
    stop_fm: StoppingArg,

    /// Max local search repetitions per level (-1 = no limit)
    #[arg(long = "FMreps", allow_hyphen_values = true)]
    fm_reps: Option<i64>,

    /// Max fruitless moves before stopping the local search (simple rule;
    /// defaults: 150 for node FM, 10 for hyperedge FM)
    #[arg(long = "i")]
    max_fruitless_moves: Option<usize>,

    /// Random walk stopping alpha (adaptive rules, -1 = infinity)
    #[arg(long, default_value_t = 8.0, allow_hyphen_values = true)]
    alpha: f64,

    /// Coarsening: max hypernode weight is (s * w(H)) / (t * k)
    #[arg(long = "s", default_value_t = 3.5)]
    max_weight_multiplier: f64,

    /// Coarsening stops at t * k hypernodes
    #[arg(long = "t", default_value_t = 160)]
    contraction_limit_multiplier: usize,

    /// Remove parallel hyperedges before partitioning
    #[arg(long = "init-remove-hes", default_value_t = false)]
    init_remove_hes: bool,

    /// Max iterations of the label propagation refiner
    #[arg(long = "lp_refiner_max_iterations", default_value_t = 3)]
    lp_refiner_max_iterations: usize,

    /// Write a RESULT line with the final metrics to this file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Verbose partitioner output
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn build_configuration(cli: &Cli) -> Result<Configuration> {
    if cli.k < 2 {
        bail!("k must be at least 2, got {}", cli.k);
    }
    if cli.epsilon < 0.0 {
        bail!("epsilon must be non-negative, got {}", cli.epsilon);
    }

    let mut config = Configuration::default();
    config.partition.graph_filename = cli.hgr.clone();
    config.partition.k = cli.k;
    config.partition.epsilon = cli.epsilon;
    config.partition.seed = cli.seed;
    config.partition.initial_partitioning_attempts = cli.nruns;
    config.partition.global_search_iterations = cli.vcycles;
    config.partition.hyperedge_size_threshold = if cli.cmaxnet < 0 {
        usize::MAX
    } else {
        cli.cmaxnet as usize
    };
    config.partition.coarsening_algorithm = match cli.ctype {
        CoarseningArg::HeavyFull => CoarseningAlgorithm::HeavyFull,
        CoarseningArg::HeavyPartial => CoarseningAlgorithm::HeavyPartial,
        CoarseningArg::HeavyLazy => CoarseningAlgorithm::HeavyLazy,
        CoarseningArg::Hyperedge => CoarseningAlgorithm::Hyperedge,
    };
    config.partition.refinement_algorithm = match cli.rtype {
        RefinementArg::TwowayFm => RefinementAlgorithm::TwoWayFm,
        RefinementArg::KwayFm => RefinementAlgorithm::KWayFm,
        RefinementArg::KwayFmMaxgain => RefinementAlgorithm::KWayFmMaxGain,
        RefinementArg::Hyperedge => RefinementAlgorithm::HyperedgeFm,
        RefinementArg::LabelPropagation => RefinementAlgorithm::LabelPropagation,
    };
    if config.partition.refinement_algorithm == RefinementAlgorithm::TwoWayFm && cli.k != 2 {
        bail!("twoway_fm refinement requires k = 2");
    }
    if config.partition.refinement_algorithm == RefinementAlgorithm::HyperedgeFm && cli.k != 2 {
        bail!("hyperedge refinement requires k = 2");
    }
    config.partition.initial_partitioner = match cli.part {
        PartitionerArg::HMetis => InitialPartitionerKind::HMetis,
        PartitionerArg::PaToH => InitialPartitionerKind::PaToH,
        PartitionerArg::Greedy => InitialPartitionerKind::Greedy,
    };
    config.partition.initial_partitioner_path = cli.part_path.clone();
    config.partition.initial_parallel_he_removal = cli.init_remove_hes;

    config.coarsening.max_allowed_weight_multiplier = cli.max_weight_multiplier;
    config.coarsening.contraction_limit_multiplier = cli.contraction_limit_multiplier;

    let stopping_rule = match cli.stop_fm {
        StoppingArg::Simple => StoppingRule::Simple,
        StoppingArg::Adaptive1 => StoppingRule::Adaptive1,
        StoppingArg::Adaptive2 => StoppingRule::Adaptive2,
    };
    config.fm.stopping_rule = stopping_rule;
    config.her_fm.stopping_rule = stopping_rule;
    if let Some(reps) = cli.fm_reps {
        let reps = if reps < 0 { usize::MAX } else { reps as usize };
        config.fm.num_repetitions = reps;
        config.her_fm.num_repetitions = reps;
    }
    if let Some(fruitless) = cli.max_fruitless_moves {
        config.fm.max_number_of_fruitless_moves = fruitless;
        config.her_fm.max_number_of_fruitless_moves = fruitless;
    }
    config.fm.alpha = if cli.alpha < 0.0 { f64::MAX } else { cli.alpha };
    config.lp.max_number_iterations = cli.lp_refiner_max_iterations;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let mut config = build_configuration(&cli)?;
    let mut hypergraph = io::read_hypergraph_file(&cli.hgr, cli.k)
        .with_context(|| format!("reading {}", cli.hgr.display()))?;
    if hypergraph.num_nodes() < cli.k {
        bail!(
            "cannot split {} hypernodes into {} blocks",
            hypergraph.num_nodes(),
            cli.k
        );
    }
    config.finalize(hypergraph.total_weight(), hypergraph.initial_num_nodes());

    info!(
        "partitioning {} ({} hypernodes, {} hyperedges) into {} blocks, epsilon {}",
        cli.hgr.display(),
        hypergraph.num_nodes(),
        hypergraph.num_edges(),
        cli.k,
        cli.epsilon
    );

    let partitioner = Partitioner::new(config);
    let start = Instant::now();
    let results = partitioner.partition(&mut hypergraph)?;
    let elapsed = start.elapsed();

    info!(
        "final cut {} | imbalance {:.4} | time {:.3}s",
        results.cut,
        results.imbalance,
        elapsed.as_secs_f64()
    );
    for (block, weight) in metrics::part_weights(&hypergraph).iter().enumerate() {
        info!("block {block}: weight {weight}");
    }

    let partition_filename = format!(
        "{}.part.{}.hypercut",
        cli.hgr.display(),
        cli.k
    );
    io::write_partition_file(&hypergraph, &PathBuf::from(&partition_filename))?;
    info!("partition written to {partition_filename}");

    if let Some(result_file) = &cli.file {
        let mut file = File::create(result_file)
            .with_context(|| format!("creating {}", result_file.display()))?;
        writeln!(
            file,
            "RESULT graph={} k={} epsilon={} seed={} cut={} imbalance={:.6} time={:.6}",
            cli.hgr.display(),
            cli.k,
            cli.epsilon,
            cli.seed,
            results.cut,
            results.imbalance,
            elapsed.as_secs_f64()
        )?;
    }
    Ok(())
}
