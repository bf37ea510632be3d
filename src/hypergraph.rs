use itertools::Itertools;
use rustc_hash::FxHashMap;

pub type HypernodeId = usize;
pub type HyperedgeId = usize;
pub type PartitionId = i32;
pub type NodeWeight = i64;
pub type EdgeWeight = i64;
pub type Gain = i64;

/// Block id of a hypernode that has not been assigned yet.
pub const INVALID_PARTITION: PartitionId = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Hypernode {
    /// First entry of this node's slice of the incidence arena.
    begin: usize,
    /// Number of live incident hyperedges.
    size: usize,
    weight: NodeWeight,
    enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Hyperedge {
    /// First entry of this edge's slice of the pin arena.
    begin: usize,
    /// Number of live pins.
    size: usize,
    weight: EdgeWeight,
    enabled: bool,
}

/// One reversible pin-array modification performed by a contraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinOp {
    /// u and v were both pins of `he`; v (at `slot`) was parked one past the
    /// live range of the pin slice.
    CollapsedPin { he: HyperedgeId, slot: usize },
    /// Only v was a pin of `he`; the entry at `slot` was rewritten to u.
    RelinkedPin { he: HyperedgeId, slot: usize },
}

/// Snapshot of a single contraction, sufficient to undo it bit-exactly.
///
/// Uncontractions must be applied in reverse order of the contractions that
/// produced them; the slots recorded here are only meaningful in that order.
#[derive(Debug, Clone)]
pub struct ContractionMemento {
    pub u: HypernodeId,
    pub v: HypernodeId,
    u_first_entry: usize,
    u_size: usize,
    pin_ops: Vec<PinOp>,
}

/// A weighted hypergraph with reversible pin-pair contraction.
///
/// Nodes and hyperedges live in two arenas of index slices (CSR-like). Each
/// node maps to a slice of incident hyperedge ids, each hyperedge to a slice
/// of pin ids. Slices carry an explicit live length, so disabling a node or
/// shrinking an edge never reindexes anything; contraction only appends to
/// the incidence arena, which keeps every earlier slice intact for restore.
///
/// Once blocks are assigned, the structure maintains per-block weights and
/// the per-hyperedge pin-count table n(e, b) incrementally through every
/// mutation.
pub struct Hypergraph {
    hypernodes: Vec<Hypernode>,
    hyperedges: Vec<Hyperedge>,
    /// Node -> incident hyperedges arena. Grows during contraction.
    incidence_array: Vec<HyperedgeId>,
    /// Hyperedge -> pins arena. Fixed size; pins are parked, never removed.
    pin_array: Vec<HypernodeId>,
    part_ids: Vec<PartitionId>,
    part_weights: Vec<NodeWeight>,
    /// Flat |E| x k table of n(e, b).
    pins_in_part: Vec<usize>,
    k: usize,
    num_enabled_nodes: usize,
    num_enabled_edges: usize,
    total_weight: NodeWeight,
}

impl Hypergraph {
    /// Build a hypergraph from an hMetis-style index/edge vector pair.
    ///
    /// `index_vector` has one entry per hyperedge plus a final sentinel;
    /// `edge_vector[index_vector[e]..index_vector[e + 1]]` are the pins of e.
    pub fn new(
        num_nodes: usize,
        num_edges: usize,
        index_vector: &[usize],
        edge_vector: &[HypernodeId],
        k: usize,
        edge_weights: Option<&[EdgeWeight]>,
        node_weights: Option<&[NodeWeight]>,
    ) -> Self {
        debug_assert_eq!(index_vector.len(), num_edges + 1);
        debug_assert_eq!(*index_vector.last().unwrap_or(&0), edge_vector.len());

        let mut hyperedges = Vec::with_capacity(num_edges);
        for e in 0..num_edges {
            hyperedges.push(Hyperedge {
                begin: index_vector[e],
                size: index_vector[e + 1] - index_vector[e],
                weight: edge_weights.map_or(1, |w| w[e]),
                enabled: true,
            });
        }

        // Node degrees, then prefix sums for the incidence slices.
        let mut degree = vec![0usize; num_nodes];
        for &pin in edge_vector {
            degree[pin] += 1;
        }
        let mut hypernodes = Vec::with_capacity(num_nodes);
        let mut offset = 0;
        for (u, &deg) in degree.iter().enumerate() {
            hypernodes.push(Hypernode {
                begin: offset,
                size: deg,
                weight: node_weights.map_or(1, |w| w[u]),
                enabled: true,
            });
            offset += deg;
        }

        let mut incidence_array = vec![0; edge_vector.len()];
        let mut fill = vec![0usize; num_nodes];
        for (e, edge) in hyperedges.iter().enumerate() {
            for &pin in &edge_vector[edge.begin..edge.begin + edge.size] {
                incidence_array[hypernodes[pin].begin + fill[pin]] = e;
                fill[pin] += 1;
            }
        }

        let total_weight = hypernodes.iter().map(|hn| hn.weight).sum();
        Hypergraph {
            hypernodes,
            hyperedges,
            incidence_array,
            pin_array: edge_vector.to_vec(),
            part_ids: vec![INVALID_PARTITION; num_nodes],
            part_weights: vec![0; k],
            pins_in_part: vec![0; num_edges * k],
            k,
            num_enabled_nodes: num_nodes,
            num_enabled_edges: num_edges,
            total_weight,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of hypernodes the hypergraph was created with.
    pub fn initial_num_nodes(&self) -> usize {
        self.hypernodes.len()
    }

    pub fn initial_num_edges(&self) -> usize {
        self.hyperedges.len()
    }

    /// Number of currently live hypernodes.
    pub fn num_nodes(&self) -> usize {
        self.num_enabled_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.num_enabled_edges
    }

    pub fn total_weight(&self) -> NodeWeight {
        self.total_weight
    }

    pub fn is_node_enabled(&self, u: HypernodeId) -> bool {
        self.hypernodes[u].enabled
    }

    pub fn is_edge_enabled(&self, e: HyperedgeId) -> bool {
        self.hyperedges[e].enabled
    }

    /// Iterator over live hypernode ids, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = HypernodeId> + '_ {
        self.hypernodes
            .iter()
            .enumerate()
            .filter(|(_, hn)| hn.enabled)
            .map(|(u, _)| u)
    }

    /// Iterator over live hyperedge ids, in id order.
    pub fn edges(&self) -> impl Iterator<Item = HyperedgeId> + '_ {
        self.hyperedges
            .iter()
            .enumerate()
            .filter(|(_, he)| he.enabled)
            .map(|(e, _)| e)
    }

    pub fn incident_edges(&self, u: HypernodeId) -> &[HyperedgeId] {
        let hn = &self.hypernodes[u];
        &self.incidence_array[hn.begin..hn.begin + hn.size]
    }

    pub fn pins(&self, e: HyperedgeId) -> &[HypernodeId] {
        let he = &self.hyperedges[e];
        &self.pin_array[he.begin..he.begin + he.size]
    }

    pub fn node_degree(&self, u: HypernodeId) -> usize {
        self.hypernodes[u].size
    }

    pub fn edge_size(&self, e: HyperedgeId) -> usize {
        self.hyperedges[e].size
    }

    pub fn node_weight(&self, u: HypernodeId) -> NodeWeight {
        self.hypernodes[u].weight
    }

    pub fn edge_weight(&self, e: HyperedgeId) -> EdgeWeight {
        self.hyperedges[e].weight
    }

    pub fn part_id(&self, u: HypernodeId) -> PartitionId {
        self.part_ids[u]
    }

    pub fn part_weight(&self, part: PartitionId) -> NodeWeight {
        self.part_weights[part as usize]
    }

    pub fn pin_count_in_part(&self, e: HyperedgeId, part: PartitionId) -> usize {
        self.pins_in_part[e * self.k + part as usize]
    }

    /// Number of blocks the pins of `e` currently touch.
    pub fn connectivity(&self, e: HyperedgeId) -> usize {
        (0..self.k)
            .filter(|&b| self.pins_in_part[e * self.k + b] > 0)
            .count()
    }

    /// A border node has at least one incident hyperedge spanning two blocks.
    pub fn is_border_node(&self, u: HypernodeId) -> bool {
        let part = self.part_ids[u];
        debug_assert!(part != INVALID_PARTITION);
        self.incident_edges(u)
            .iter()
            .any(|&e| self.pin_count_in_part(e, part) < self.edge_size(e))
    }

    /// Assign an unassigned node to a block.
    pub fn set_node_part(&mut self, u: HypernodeId, part: PartitionId) {
        debug_assert!(self.hypernodes[u].enabled);
        debug_assert_eq!(self.part_ids[u], INVALID_PARTITION);
        debug_assert!((part as usize) < self.k);
        self.part_ids[u] = part;
        self.part_weights[part as usize] += self.hypernodes[u].weight;
        let (begin, size) = (self.hypernodes[u].begin, self.hypernodes[u].size);
        for idx in begin..begin + size {
            let e = self.incidence_array[idx];
            self.pins_in_part[e * self.k + part as usize] += 1;
        }
    }

    /// Move an assigned node between blocks, maintaining block weights and
    /// pin counts in O(|I(u)|).
    pub fn change_node_part(&mut self, u: HypernodeId, from: PartitionId, to: PartitionId) {
        debug_assert!(self.hypernodes[u].enabled);
        debug_assert_eq!(self.part_ids[u], from);
        debug_assert_ne!(from, to);
        self.part_ids[u] = to;
        self.part_weights[from as usize] -= self.hypernodes[u].weight;
        self.part_weights[to as usize] += self.hypernodes[u].weight;
        let (begin, size) = (self.hypernodes[u].begin, self.hypernodes[u].size);
        for idx in begin..begin + size {
            let e = self.incidence_array[idx];
            debug_assert!(self.pins_in_part[e * self.k + from as usize] > 0);
            self.pins_in_part[e * self.k + from as usize] -= 1;
            self.pins_in_part[e * self.k + to as usize] += 1;
        }
    }

    /// Drop all block assignments, block weights, and pin-count tables.
    pub fn reset_partitioning(&mut self) {
        self.part_ids.fill(INVALID_PARTITION);
        self.part_weights.fill(0);
        self.pins_in_part.fill(0);
    }

    /// Contract v into u. Both must be live and distinct; if blocks are
    /// assigned, both must be in the same block.
    ///
    /// For every hyperedge of v: if u is also a pin the duplicate pin is
    /// collapsed (the edge shrinks by one), otherwise v's slot is relinked to
    /// u and the edge joins u's incidence slice. u's slice is relocated to
    /// the end of the arena the first time it has to grow.
    pub fn contract(&mut self, u: HypernodeId, v: HypernodeId) -> ContractionMemento {
        debug_assert_ne!(u, v);
        debug_assert!(self.hypernodes[u].enabled);
        debug_assert!(self.hypernodes[v].enabled);
        debug_assert_eq!(self.part_ids[u], self.part_ids[v]);

        let u_first_entry = self.hypernodes[u].begin;
        let u_size = self.hypernodes[u].size;
        let mut pin_ops = Vec::with_capacity(self.hypernodes[v].size);

        let v_part = self.part_ids[v];
        self.hypernodes[u].weight += self.hypernodes[v].weight;

        let v_begin = self.hypernodes[v].begin;
        let v_size = self.hypernodes[v].size;
        let mut u_relocated = false;
        for idx in v_begin..v_begin + v_size {
            let he = self.incidence_array[idx];
            let (e_begin, e_size) = {
                let e = &self.hyperedges[he];
                (e.begin, e.size)
            };
            let pins = &self.pin_array[e_begin..e_begin + e_size];
            let slot = pins.iter().position(|&p| p == v).expect("v is a pin");
            if pins.contains(&u) {
                // Parallel-pin collapse: park v one past the live range.
                self.pin_array.swap(e_begin + slot, e_begin + e_size - 1);
                self.hyperedges[he].size -= 1;
                if v_part != INVALID_PARTITION {
                    debug_assert!(self.pins_in_part[he * self.k + v_part as usize] > 0);
                    self.pins_in_part[he * self.k + v_part as usize] -= 1;
                }
                pin_ops.push(PinOp::CollapsedPin { he, slot });
            } else {
                self.pin_array[e_begin + slot] = u;
                if !u_relocated {
                    // u's slice must grow; move it to the arena's end once.
                    let (u_begin, u_size) = {
                        let hn = &self.hypernodes[u];
                        (hn.begin, hn.size)
                    };
                    let new_begin = self.incidence_array.len();
                    for i in 0..u_size {
                        let entry = self.incidence_array[u_begin + i];
                        self.incidence_array.push(entry);
                    }
                    self.hypernodes[u].begin = new_begin;
                    u_relocated = true;
                }
                self.incidence_array.push(he);
                self.hypernodes[u].size += 1;
                pin_ops.push(PinOp::RelinkedPin { he, slot });
            }
        }

        self.hypernodes[v].enabled = false;
        self.num_enabled_nodes -= 1;
        ContractionMemento {
            u,
            v,
            u_first_entry,
            u_size,
            pin_ops,
        }
    }

    /// Undo the matching `contract` call. Must be applied in reverse
    /// contraction order; restores pin lists, incidence slices, weights, and
    /// pin-count tables bit-exactly.
    pub fn uncontract(&mut self, memento: &ContractionMemento) {
        let u = memento.u;
        let v = memento.v;
        debug_assert!(self.hypernodes[u].enabled);
        debug_assert!(!self.hypernodes[v].enabled);

        self.hypernodes[v].enabled = true;
        self.num_enabled_nodes += 1;
        self.hypernodes[u].weight -= self.hypernodes[v].weight;

        // The projected partition: v rejoins u's block.
        let part = self.part_ids[u];
        self.part_ids[v] = part;

        for op in memento.pin_ops.iter().rev() {
            match *op {
                PinOp::CollapsedPin { he, slot } => {
                    let (e_begin, e_size) = {
                        let e = &self.hyperedges[he];
                        (e.begin, e.size)
                    };
                    debug_assert_eq!(self.pin_array[e_begin + e_size], v);
                    self.hyperedges[he].size += 1;
                    self.pin_array.swap(e_begin + e_size, e_begin + slot);
                    if part != INVALID_PARTITION {
                        self.pins_in_part[he * self.k + part as usize] += 1;
                    }
                }
                PinOp::RelinkedPin { he, slot } => {
                    let e_begin = self.hyperedges[he].begin;
                    debug_assert_eq!(self.pin_array[e_begin + slot], u);
                    self.pin_array[e_begin + slot] = v;
                    // Same block on both sides, so n(e, .) is unchanged.
                }
            }
        }

        self.hypernodes[u].begin = memento.u_first_entry;
        self.hypernodes[u].size = memento.u_size;
    }

    /// Remove a hyperedge for good: unlink it from every pin's incidence
    /// slice and disable it. Used by the parallel-hyperedge pass; there is no
    /// inverse.
    fn remove_edge(&mut self, e: HyperedgeId) {
        debug_assert!(self.hyperedges[e].enabled);
        let (e_begin, e_size) = {
            let he = &self.hyperedges[e];
            (he.begin, he.size)
        };
        for idx in e_begin..e_begin + e_size {
            let pin = self.pin_array[idx];
            let (h_begin, h_size) = (self.hypernodes[pin].begin, self.hypernodes[pin].size);
            let slot = self.incidence_array[h_begin..h_begin + h_size]
                .iter()
                .position(|&he| he == e)
                .expect("edge is incident");
            self.incidence_array.swap(h_begin + slot, h_begin + h_size - 1);
            self.hypernodes[pin].size -= 1;
        }
        self.hyperedges[e].enabled = false;
        self.num_enabled_edges -= 1;
    }

    /// Fold hyperedges with identical pin sets into a single edge carrying
    /// the summed weight. Returns the number of edges removed.
    pub fn remove_parallel_hyperedges(&mut self) -> usize {
        let mut representative: FxHashMap<Vec<HypernodeId>, HyperedgeId> = FxHashMap::default();
        let mut duplicates = Vec::new();
        for e in self.edges() {
            let fingerprint: Vec<HypernodeId> = self.pins(e).iter().copied().sorted().collect();
            match representative.get(&fingerprint) {
                Some(&rep) => duplicates.push((rep, e)),
                None => {
                    representative.insert(fingerprint, e);
                }
            }
        }
        for &(rep, e) in &duplicates {
            self.hyperedges[rep].weight += self.hyperedges[e].weight;
            self.remove_edge(e);
        }
        duplicates.len()
    }

    /// Dense renumbering of live nodes, for writing the coarse hypergraph.
    /// Returns (dense -> node id) so a partition read back by dense index can
    /// be mapped onto the live nodes.
    pub fn dense_node_mapping(&self) -> Vec<HypernodeId> {
        self.nodes().collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Logical state of a hypergraph, for bit-exactness checks. Captures
    /// everything observable through the public accessors.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Snapshot {
        nodes: Vec<(HypernodeId, NodeWeight, PartitionId, Vec<HyperedgeId>)>,
        edges: Vec<(HyperedgeId, EdgeWeight, Vec<HypernodeId>)>,
        part_weights: Vec<NodeWeight>,
        pins_in_part: Vec<usize>,
    }

    pub fn snapshot(hg: &Hypergraph) -> Snapshot {
        Snapshot {
            nodes: hg
                .nodes()
                .map(|u| {
                    (
                        u,
                        hg.node_weight(u),
                        hg.part_id(u),
                        hg.incident_edges(u).to_vec(),
                    )
                })
                .collect(),
            edges: hg
                .edges()
                .map(|e| (e, hg.edge_weight(e), hg.pins(e).to_vec()))
                .collect(),
            part_weights: hg.part_weights.clone(),
            pins_in_part: hg.pins_in_part.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two triangles sharing node 2: edges {0,1,2}, {2,3,4}, {0,1}, {3,4}.
    fn example_hypergraph(k: usize) -> Hypergraph {
        Hypergraph::new(
            5,
            4,
            &[0, 3, 6, 8, 10],
            &[0, 1, 2, 2, 3, 4, 0, 1, 3, 4],
            k,
            None,
            None,
        )
    }

    #[test]
    fn test_construction() {
        let hg = example_hypergraph(2);

        assert_eq!(hg.num_nodes(), 5);
        assert_eq!(hg.num_edges(), 4);
        assert_eq!(hg.total_weight(), 5);
        assert_eq!(hg.pins(0), &[0, 1, 2]);
        assert_eq!(hg.pins(3), &[3, 4]);
        assert_eq!(hg.node_degree(2), 2);
        assert_eq!(hg.incident_edges(2), &[0, 1]);
        assert_eq!(hg.edge_size(1), 3);
    }

    #[test]
    fn test_pin_counts_track_assignments() {
        let mut hg = example_hypergraph(2);
        for u in 0..5 {
            hg.set_node_part(u, if u < 2 { 0 } else { 1 });
        }

        // Every live edge accounts for all of its pins.
        for e in hg.edges().collect::<Vec<_>>() {
            assert_eq!(
                hg.pin_count_in_part(e, 0) + hg.pin_count_in_part(e, 1),
                hg.edge_size(e)
            );
        }
        assert_eq!(hg.pin_count_in_part(0, 0), 2);
        assert_eq!(hg.pin_count_in_part(0, 1), 1);
        assert_eq!(hg.part_weight(0), 2);
        assert_eq!(hg.part_weight(1), 3);
    }

    #[test]
    fn test_change_node_part() {
        let mut hg = example_hypergraph(2);
        for u in 0..5 {
            hg.set_node_part(u, if u < 2 { 0 } else { 1 });
        }

        hg.change_node_part(2, 1, 0);

        assert_eq!(hg.part_id(2), 0);
        assert_eq!(hg.part_weight(0), 3);
        assert_eq!(hg.part_weight(1), 2);
        assert_eq!(hg.pin_count_in_part(0, 0), 3);
        assert_eq!(hg.pin_count_in_part(0, 1), 0);
        assert_eq!(hg.pin_count_in_part(1, 0), 1);
    }

    #[test]
    fn test_border_nodes() {
        let mut hg = example_hypergraph(2);
        for u in 0..5 {
            hg.set_node_part(u, if u < 2 { 0 } else { 1 });
        }

        // Edge {0,1,2} spans both blocks, so all of its pins are border nodes.
        assert!(hg.is_border_node(0));
        assert!(hg.is_border_node(2));
        // Nodes 3, 4 only touch edges fully inside block 1.
        assert!(!hg.is_border_node(3));
        assert!(!hg.is_border_node(4));
    }

    #[test]
    fn test_contract_with_shared_pin() {
        // Nodes 0 and 1 share edges 0 ({0,1,2}) and 2 ({0,1}): both collapse.
        let mut hg = example_hypergraph(2);

        let memento = hg.contract(0, 1);

        assert!(!hg.is_node_enabled(1));
        assert_eq!(hg.num_nodes(), 4);
        assert_eq!(hg.node_weight(0), 2);
        assert_eq!(hg.edge_size(0), 2);
        // Edge {0,1} degenerated to a single pin.
        assert_eq!(hg.edge_size(2), 1);
        assert_eq!(memento.u, 0);
        assert_eq!(memento.v, 1);
    }

    #[test]
    fn test_contract_relinks_pins() {
        // Nodes 2 and 3 share edge 1; node 3's other edge {3,4} gets relinked.
        let mut hg = example_hypergraph(2);

        hg.contract(2, 3);

        assert_eq!(hg.edge_size(1), 2);
        assert!(hg.pins(3).contains(&2));
        assert!(!hg.pins(3).contains(&3));
        assert!(hg.incident_edges(2).contains(&3));
        assert_eq!(hg.node_degree(2), 3);
    }

    #[test]
    fn test_contract_uncontract_roundtrip() {
        let mut hg = example_hypergraph(2);
        let before = testing::snapshot(&hg);

        let memento = hg.contract(2, 3);
        hg.uncontract(&memento);

        assert_eq!(testing::snapshot(&hg), before);
    }

    #[test]
    fn test_nested_contractions_unwind_in_reverse() {
        let mut hg = example_hypergraph(2);
        let before = testing::snapshot(&hg);

        let m1 = hg.contract(0, 1);
        let m2 = hg.contract(0, 2);
        let m3 = hg.contract(3, 4);
        assert_eq!(hg.num_nodes(), 2);

        hg.uncontract(&m3);
        hg.uncontract(&m2);
        hg.uncontract(&m1);

        assert_eq!(testing::snapshot(&hg), before);
    }

    #[test]
    fn test_uncontract_projects_partition() {
        let mut hg = example_hypergraph(2);
        let memento = hg.contract(2, 3);
        for u in [0, 1, 2, 4] {
            hg.set_node_part(u, if u <= 1 { 0 } else { 1 });
        }

        hg.uncontract(&memento);

        assert_eq!(hg.part_id(3), 1);
        // Block weights are untouched: v's weight moved out of u in place.
        assert_eq!(hg.part_weight(1), 3);
        assert_eq!(hg.pin_count_in_part(1, 1), 3);
        assert_eq!(hg.pin_count_in_part(3, 1), 2);
    }

    #[test]
    fn test_contraction_during_vcycle_keeps_counts() {
        let mut hg = example_hypergraph(2);
        for u in 0..5 {
            hg.set_node_part(u, if u < 2 { 0 } else { 1 });
        }
        let before = testing::snapshot(&hg);

        let memento = hg.contract(3, 4);
        assert_eq!(hg.pin_count_in_part(3, 1), 1);
        assert_eq!(hg.pin_count_in_part(1, 1), 2);
        assert_eq!(hg.part_weight(1), 3);

        hg.uncontract(&memento);
        assert_eq!(testing::snapshot(&hg), before);
    }

    #[test]
    fn test_remove_parallel_hyperedges() {
        // Edges 1 and 2 have the same pins {1,2} and fold into one.
        let mut hg = Hypergraph::new(
            3,
            3,
            &[0, 3, 5, 7],
            &[0, 1, 2, 1, 2, 2, 1],
            2,
            Some(&[1, 2, 3]),
            None,
        );

        let removed = hg.remove_parallel_hyperedges();

        assert_eq!(removed, 1);
        assert_eq!(hg.num_edges(), 2);
        assert_eq!(hg.edge_weight(1), 5);
        assert_eq!(hg.node_degree(2), 2);
        assert_eq!(hg.node_degree(1), 2);
    }

    #[test]
    fn test_connectivity() {
        let mut hg = example_hypergraph(3);
        hg.set_node_part(0, 0);
        hg.set_node_part(1, 1);
        hg.set_node_part(2, 2);
        hg.set_node_part(3, 2);
        hg.set_node_part(4, 2);

        assert_eq!(hg.connectivity(0), 3);
        assert_eq!(hg.connectivity(1), 1);
        assert_eq!(hg.connectivity(2), 2);
    }
}
