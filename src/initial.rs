use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::config::{Configuration, InitialPartitionerKind};
use crate::hypergraph::{
    EdgeWeight, Gain, Hypergraph, HypernodeId, PartitionId, INVALID_PARTITION,
};
use crate::io;
use crate::metrics;
use crate::priority_queue::KWayPriorityQueue;
use crate::PartitionerError;

/// Compute an initial assignment of the coarsest hypergraph. Runs the
/// configured number of trials and keeps the one with the smallest cut.
pub fn partition(
    hg: &mut Hypergraph,
    config: &Configuration,
    rng: &mut SmallRng,
) -> Result<EdgeWeight, PartitionerError> {
    let attempts = config.partition.initial_partitioning_attempts.max(1);
    let mut best: Option<(Vec<(HypernodeId, PartitionId)>, EdgeWeight)> = None;

    // The coarse hypergraph and temp directory are shared by all external
    // trials; files are removed as soon as the last result is read back.
    let external = match config.partition.initial_partitioner {
        InitialPartitionerKind::Greedy => None,
        kind => Some(ExternalPartitioner::prepare(hg, config, kind)?),
    };

    for trial in 0..attempts {
        hg.reset_partitioning();
        match &external {
            None => greedy_growing(hg, config, rng),
            Some(tool) => tool.run(hg, config)?,
        }
        let cut = metrics::hyperedge_cut(hg);
        debug!("initial partitioning trial {trial} cut {cut}");
        if best.as_ref().map_or(true, |&(_, best_cut)| cut < best_cut) {
            let assignment = hg.nodes().map(|u| (u, hg.part_id(u))).collect();
            best = Some((assignment, cut));
        }
    }
    if let Some(tool) = external {
        tool.cleanup()?;
    }

    let (assignment, cut) = best.expect("at least one trial ran");
    hg.reset_partitioning();
    for (node, part) in assignment {
        hg.set_node_part(node, part);
    }
    info!("initial partitioning done, cut {cut}");
    Ok(cut)
}

/// External hMetis/PaToH invocation over the temp-file protocol: the coarse
/// hypergraph is written once, the binary runs per trial, and the assignment
/// is read back from `<file>.part.<k>`.
struct ExternalPartitioner {
    binary: PathBuf,
    kind: InitialPartitionerKind,
    _dir: tempfile::TempDir,
    coarse_file: PathBuf,
    partition_file: PathBuf,
    mapping: Vec<HypernodeId>,
}

impl ExternalPartitioner {
    fn prepare(
        hg: &Hypergraph,
        config: &Configuration,
        kind: InitialPartitionerKind,
    ) -> Result<Self, PartitionerError> {
        let binary = config
            .partition
            .initial_partitioner_path
            .clone()
            .unwrap_or_else(|| default_binary_path(kind));
        let dir = tempfile::TempDir::new()?;
        let coarse_file = dir.path().join("coarse.hgr");
        let partition_file =
            dir.path().join(format!("coarse.hgr.part.{}", config.partition.k));
        let mapping = io::write_hypergraph_file(hg, &coarse_file)?;
        Ok(ExternalPartitioner {
            binary,
            kind,
            _dir: dir,
            coarse_file,
            partition_file,
            mapping,
        })
    }

    fn run(&self, hg: &mut Hypergraph, config: &Configuration) -> Result<(), PartitionerError> {
        let k = config.partition.k;
        let mut command = Command::new(&self.binary);
        command.arg(&self.coarse_file).arg(k.to_string());
        if self.kind == InitialPartitionerKind::HMetis {
            command.arg(format!("{:.0}", config.partition.hmetis_ub_factor.max(1.0)));
        }
        debug!("invoking initial partitioner: {:?}", command);
        let status = command
            .stdout(Stdio::null())
            .status()
            .map_err(PartitionerError::Io)?;
        if !status.success() {
            return Err(PartitionerError::InitialPartitionerFailed {
                path: self.binary.clone(),
                status,
            });
        }

        let assignment = io::read_partition_file(&self.partition_file, k)?;
        if assignment.len() != self.mapping.len() {
            return Err(PartitionerError::InvalidFormat {
                line: assignment.len(),
                reason: format!(
                    "partition file has {} entries for {} hypernodes",
                    assignment.len(),
                    self.mapping.len()
                ),
            });
        }
        for (dense, &node) in self.mapping.iter().enumerate() {
            hg.set_node_part(node, assignment[dense]);
        }
        Ok(())
    }

    fn cleanup(self) -> Result<(), PartitionerError> {
        // Unlink eagerly; dropping the temp dir would catch these at exit
        // anyway.
        if self.coarse_file.exists() {
            std::fs::remove_file(&self.coarse_file)?;
        }
        if self.partition_file.exists() {
            std::fs::remove_file(&self.partition_file)?;
        }
        Ok(())
    }
}

fn default_binary_path(kind: InitialPartitionerKind) -> PathBuf {
    match kind {
        InitialPartitionerKind::HMetis => {
            PathBuf::from("/software/hmetis-2.0pre1/Linux-x86_64/hmetis2.0pre1")
        }
        InitialPartitionerKind::PaToH => {
            PathBuf::from("/software/patoh-Linux-x86_64/Linux-x86_64/patoh")
        }
        InitialPartitionerKind::Greedy => unreachable!("greedy needs no binary"),
    }
}

/// Greedy hypergraph growing: k start nodes spread by breadth-first
/// distance, then the blocks grow round-robin, each absorbing its most
/// attractive unassigned node. Round-robin keeps an early block from
/// stealing a later block's seed region. Blocks are first bounded by the
/// perfect balance weight; once every queue stalls the bound is released to
/// L_max. Leftover isolated nodes fall back to the better of the 0/1 gains
/// (the bipartition rule, kept as-is for higher k).
fn greedy_growing(hg: &mut Hypergraph, config: &Configuration, rng: &mut SmallRng) {
    let k = config.partition.k;
    let total = hg.total_weight();
    let perfect_bound = (total + k as i64 - 1) / k as i64;
    let mut bound = perfect_bound;
    let mut released = false;

    let mut pq: KWayPriorityQueue<Gain> = KWayPriorityQueue::new(k, hg.initial_num_nodes());
    for (block, &start) in select_start_nodes(hg, k, rng).iter().enumerate() {
        pq.insert(start, block, attraction_gain(hg, start, block as PartitionId));
    }

    let mut current = 0usize;
    loop {
        // Next enabled block with work, round-robin from `current`.
        let part = (0..k)
            .map(|i| (current + i) % k)
            .find(|&b| pq.is_enabled(b) && pq.size(b) > 0);
        let Some(part) = part else {
            if !released {
                released = true;
                bound = config.partition.max_part_weight;
                for b in 0..k {
                    pq.enable_part(b);
                }
                refill_empty_queues(hg, &mut pq, k);
                continue;
            }
            if !refill_empty_queues(hg, &mut pq, k) {
                break;
            }
            continue;
        };
        current = (part + 1) % k;

        let (node, gain) = pq.pop_max_from(part).expect("queue has work");
        debug_assert_eq!(hg.part_id(node), INVALID_PARTITION);

        if hg.part_weight(part as PartitionId) + hg.node_weight(node) > bound {
            pq.insert(node, part, gain);
            pq.disable_part(part);
            continue;
        }

        hg.set_node_part(node, part as PartitionId);
        pq.remove_everywhere(node);

        // Pull the unassigned neighborhood into this block's queue.
        let incident: Vec<_> = hg.incident_edges(node).to_vec();
        for he in incident {
            for &pin in hg.pins(he) {
                if hg.part_id(pin) != INVALID_PARTITION {
                    continue;
                }
                let gain = attraction_gain(hg, pin, part as PartitionId);
                if pq.contains(pin, part) {
                    pq.update_key(pin, part, gain);
                } else {
                    pq.insert(pin, part, gain);
                }
            }
        }
    }

    for node in hg.nodes().collect::<Vec<_>>() {
        if hg.part_id(node) == INVALID_PARTITION {
            let gain0 = attraction_gain(hg, node, 0);
            let gain1 = attraction_gain(hg, node, 1);
            hg.set_node_part(node, if gain0 >= gain1 { 0 } else { 1 });
        }
    }
}

/// Seed every enabled empty queue with some unassigned node. Returns whether
/// any queue received one.
fn refill_empty_queues(
    hg: &Hypergraph,
    pq: &mut KWayPriorityQueue<Gain>,
    k: usize,
) -> bool {
    let mut refilled = false;
    for b in 0..k {
        if pq.is_enabled(b) && pq.size(b) == 0 {
            refilled |= insert_any_unassigned(hg, pq, b as PartitionId);
        }
    }
    refilled
}

/// Attraction of an unassigned node towards a block: hyperedges already
/// reaching into the block pull with ω, touched hyperedges with no pin there
/// push back with ω.
fn attraction_gain(hg: &Hypergraph, node: HypernodeId, target: PartitionId) -> Gain {
    let mut gain = 0;
    for &he in hg.incident_edges(node) {
        let assigned: usize = (0..hg.k() as PartitionId)
            .map(|b| hg.pin_count_in_part(he, b))
            .sum();
        if assigned == 0 {
            continue;
        }
        if hg.pin_count_in_part(he, target) > 0 {
            gain += hg.edge_weight(he);
        } else {
            gain -= hg.edge_weight(he);
        }
    }
    gain
}

fn insert_any_unassigned(
    hg: &Hypergraph,
    pq: &mut KWayPriorityQueue<Gain>,
    part: PartitionId,
) -> bool {
    match hg
        .nodes()
        .find(|&u| hg.part_id(u) == INVALID_PARTITION && !pq.contains(u, part as usize))
    {
        Some(node) => {
            pq.insert(node, part as usize, attraction_gain(hg, node, part));
            true
        }
        None => false,
    }
}

/// One random start node, then repeatedly the node farthest (by
/// breadth-first distance over shared hyperedges) from all chosen so far.
fn select_start_nodes(hg: &Hypergraph, k: usize, rng: &mut SmallRng) -> Vec<HypernodeId> {
    let live: Vec<HypernodeId> = hg.nodes().collect();
    debug_assert!(live.len() >= k);
    let mut starts = vec![*live.choose(rng).expect("hypergraph is empty")];

    while starts.len() < k {
        let mut visited = vec![false; hg.initial_num_nodes()];
        let mut queue: VecDeque<HypernodeId> = VecDeque::new();
        for &s in &starts {
            visited[s] = true;
            queue.push_back(s);
        }
        let mut farthest = None;
        while let Some(u) = queue.pop_front() {
            for &he in hg.incident_edges(u) {
                for &pin in hg.pins(he) {
                    if !visited[pin] {
                        visited[pin] = true;
                        queue.push_back(pin);
                        farthest = Some(pin);
                    }
                }
            }
        }
        let next = farthest.unwrap_or_else(|| {
            // Disconnected leftovers: any live node not yet chosen.
            live.iter()
                .copied()
                .find(|u| !visited[*u])
                .expect("fewer live nodes than blocks")
        });
        starts.push(next);
    }
    starts
}
