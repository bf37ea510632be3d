use crate::hypergraph::{EdgeWeight, Hypergraph, NodeWeight, PartitionId};

/// Total weight of hyperedges whose pins span more than one block.
pub fn hyperedge_cut(hg: &Hypergraph) -> EdgeWeight {
    hg.edges()
        .filter(|&e| hg.connectivity(e) > 1)
        .map(|e| hg.edge_weight(e))
        .sum()
}

/// The weight of every block of the current partition.
pub fn part_weights(hg: &Hypergraph) -> Vec<NodeWeight> {
    (0..hg.k())
        .map(|b| hg.part_weight(b as PartitionId))
        .collect()
}

/// Compute the imbalance of the current partition.
///
/// This is the relative overshoot of the heaviest block against the ideal
/// block weight c(V)/k; 0.0 means perfectly balanced. A partition satisfies
/// the balance constraint when every block weight stays at or below
/// (1+ε)·⌈c(V)/k⌉, checked against absolute weights, not this ratio.
pub fn imbalance(hg: &Hypergraph) -> f64 {
    let max_weight = part_weights(hg).into_iter().max().unwrap_or(0);
    let ideal = hg.total_weight() as f64 / hg.k() as f64;
    if ideal == 0.0 {
        return 0.0;
    }
    max_weight as f64 / ideal - 1.0
}

/// The per-block weight cap L_max = (1+ε)·⌈c(V)/k⌉.
pub fn max_part_weight(total_weight: NodeWeight, k: usize, epsilon: f64) -> NodeWeight {
    let ceil_avg = (total_weight + k as NodeWeight - 1) / k as NodeWeight;
    ((1.0 + epsilon) * ceil_avg as f64).floor() as NodeWeight
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    fn partitioned_example() -> Hypergraph {
        // Edges {0,1,2}, {2,3,4}, {0,1}, {3,4}; blocks {0,1} and {2,3,4}.
        let mut hg = Hypergraph::new(
            5,
            4,
            &[0, 3, 6, 8, 10],
            &[0, 1, 2, 2, 3, 4, 0, 1, 3, 4],
            2,
            None,
            None,
        );
        for u in 0..5 {
            hg.set_node_part(u, if u < 2 { 0 } else { 1 });
        }
        hg
    }

    #[test]
    fn test_hyperedge_cut() {
        let hg = partitioned_example();
        // Only edge {0,1,2} spans both blocks.
        assert_eq!(hyperedge_cut(&hg), 1);
    }

    #[test]
    fn test_part_weights() {
        let hg = partitioned_example();
        assert_eq!(part_weights(&hg), vec![2, 3]);
    }

    #[test]
    fn test_imbalance() {
        let hg = partitioned_example();
        // Heaviest block has weight 3, ideal is 2.5.
        assert_ulps_eq!(imbalance(&hg), 0.2);
    }

    #[test]
    fn test_max_part_weight() {
        assert_eq!(max_part_weight(4, 2, 0.03), 2);
        assert_eq!(max_part_weight(5, 2, 0.03), 3);
        assert_eq!(max_part_weight(10, 3, 0.5), 6);
    }
}
