use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;

use crate::hypergraph::{EdgeWeight, Hypergraph, HypernodeId, NodeWeight, PartitionId};
use crate::PartitionerError;

/// Read a hypergraph in hMetis .hgr format.
///
/// Line 1 is `|E| |V| [fmt]` with fmt ∈ {1, 10, 11} flagging edge weights
/// (bit 0) and node weights (bit 1). Each of the next |E| lines is an
/// optional weight followed by 1-based pin ids; if node weights are present,
/// |V| weight lines follow. Blank lines and `%` comments are skipped.
pub fn read_hypergraph_file(path: &Path, k: usize) -> Result<Hypergraph, PartitionerError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut lines = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        lines.push((number + 1, trimmed.to_string()));
    }

    let invalid = |line: usize, reason: &str| PartitionerError::InvalidFormat {
        line,
        reason: reason.to_string(),
    };

    let Some((header_line, header)) = lines.first() else {
        return Err(invalid(1, "empty file"));
    };
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() < 2 || fields.len() > 3 {
        return Err(invalid(*header_line, "header must be `|E| |V| [fmt]`"));
    }
    let parse_usize = |line: usize, s: &str| {
        s.parse::<usize>()
            .map_err(|_| invalid(line, &format!("expected an unsigned integer, got `{s}`")))
    };
    let num_edges = parse_usize(*header_line, fields[0])?;
    let num_nodes = parse_usize(*header_line, fields[1])?;
    let fmt = if fields.len() == 3 {
        parse_usize(*header_line, fields[2])?
    } else {
        0
    };
    let has_edge_weights = fmt == 1 || fmt == 11;
    let has_node_weights = fmt == 10 || fmt == 11;
    if !matches!(fmt, 0 | 1 | 10 | 11) {
        return Err(invalid(*header_line, "fmt must be one of 1, 10, 11"));
    }

    let expected_lines = 1 + num_edges + if has_node_weights { num_nodes } else { 0 };
    if lines.len() < expected_lines {
        return Err(invalid(
            lines.last().map_or(1, |(n, _)| *n),
            "file ends before all hyperedges and weights are read",
        ));
    }

    let mut index_vector = Vec::with_capacity(num_edges + 1);
    let mut edge_vector: Vec<HypernodeId> = Vec::new();
    let mut edge_weights: Vec<EdgeWeight> = Vec::with_capacity(num_edges);
    index_vector.push(0);
    for (line_number, line) in &lines[1..1 + num_edges] {
        let mut values = line.split_whitespace();
        let weight = if has_edge_weights {
            let field = values.next().ok_or_else(|| {
                invalid(*line_number, "hyperedge line is missing its weight")
            })?;
            field
                .parse::<EdgeWeight>()
                .map_err(|_| invalid(*line_number, "hyperedge weight is not an integer"))?
        } else {
            1
        };
        let mut pins = 0usize;
        for field in values {
            let pin = parse_usize(*line_number, field)?;
            if pin == 0 || pin > num_nodes {
                return Err(invalid(*line_number, "pin id out of range"));
            }
            edge_vector.push(pin - 1);
            pins += 1;
        }
        if pins < 2 {
            return Err(invalid(*line_number, "hyperedge has fewer than two pins"));
        }
        edge_weights.push(weight);
        index_vector.push(edge_vector.len());
    }

    let node_weights: Option<Vec<NodeWeight>> = if has_node_weights {
        let mut weights = Vec::with_capacity(num_nodes);
        for (line_number, line) in &lines[1 + num_edges..1 + num_edges + num_nodes] {
            let weight = line
                .trim()
                .parse::<NodeWeight>()
                .map_err(|_| invalid(*line_number, "hypernode weight is not an integer"))?;
            weights.push(weight);
        }
        Some(weights)
    } else {
        None
    };

    Ok(Hypergraph::new(
        num_nodes,
        num_edges,
        &index_vector,
        &edge_vector,
        k,
        has_edge_weights.then_some(edge_weights.as_slice()),
        node_weights.as_deref(),
    ))
}

/// Write the live part of a hypergraph in .hgr format (fmt = 11), densely
/// renumbering live nodes. Returns the dense-index -> node-id mapping so a
/// partition of the written file can be projected back.
pub fn write_hypergraph_file(
    hg: &Hypergraph,
    path: &Path,
) -> Result<Vec<HypernodeId>, PartitionerError> {
    let mapping = hg.dense_node_mapping();
    let mut dense = vec![0usize; hg.initial_num_nodes()];
    for (i, &u) in mapping.iter().enumerate() {
        dense[u] = i;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{} {} 11", hg.num_edges(), hg.num_nodes())?;
    for e in hg.edges() {
        let pins = hg.pins(e).iter().map(|&p| dense[p] + 1).join(" ");
        writeln!(writer, "{} {}", hg.edge_weight(e), pins)?;
    }
    for &u in &mapping {
        writeln!(writer, "{}", hg.node_weight(u))?;
    }
    writer.flush()?;
    Ok(mapping)
}

/// Write the final assignment, one block id per line in hypernode id order.
pub fn write_partition_file(hg: &Hypergraph, path: &Path) -> Result<(), PartitionerError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for u in 0..hg.initial_num_nodes() {
        writeln!(writer, "{}", hg.part_id(u))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a partition file produced by an external partitioner: one integer in
/// 0..k per line, indexed by the dense numbering of the written hypergraph.
pub fn read_partition_file(path: &Path, k: usize) -> Result<Vec<PartitionId>, PartitionerError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut assignment = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let part = trimmed
            .parse::<PartitionId>()
            .map_err(|_| PartitionerError::InvalidFormat {
                line: number + 1,
                reason: "block id is not an integer".to_string(),
            })?;
        if part < 0 || part as usize >= k {
            return Err(PartitionerError::InvalidFormat {
                line: number + 1,
                reason: format!("block id {part} out of range 0..{k}"),
            });
        }
        assignment.push(part);
    }
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_mock_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_unweighted() -> Result<(), PartitionerError> {
        let dir = tempdir()?;
        let content = "\
% two triangles
4 5
1 2 3
3 4 5
1 2
4 5
";
        let path = write_mock_file(dir.path(), "plain.hgr", content);

        let hg = read_hypergraph_file(&path, 2)?;

        assert_eq!(hg.num_nodes(), 5);
        assert_eq!(hg.num_edges(), 4);
        assert_eq!(hg.pins(0), &[0, 1, 2]);
        assert_eq!(hg.edge_weight(1), 1);
        assert_eq!(hg.node_weight(4), 1);
        Ok(())
    }

    #[test]
    fn test_read_fmt_1_edge_weights() -> Result<(), PartitionerError> {
        let dir = tempdir()?;
        let content = "2 3 1\n7 1 2\n9 2 3\n";
        let path = write_mock_file(dir.path(), "ew.hgr", content);

        let hg = read_hypergraph_file(&path, 2)?;

        assert_eq!(hg.edge_weight(0), 7);
        assert_eq!(hg.edge_weight(1), 9);
        assert_eq!(hg.node_weight(0), 1);
        Ok(())
    }

    #[test]
    fn test_read_fmt_11_both_weights() -> Result<(), PartitionerError> {
        let dir = tempdir()?;
        let content = "\
1 3 11
4 1 2 3
5
6
7
";
        let path = write_mock_file(dir.path(), "both.hgr", content);

        let hg = read_hypergraph_file(&path, 2)?;

        assert_eq!(hg.edge_weight(0), 4);
        assert_eq!(hg.node_weight(0), 5);
        assert_eq!(hg.node_weight(2), 7);
        assert_eq!(hg.total_weight(), 18);
        Ok(())
    }

    #[test]
    fn test_read_rejects_bad_pin() {
        let dir = tempdir().unwrap();
        let path = write_mock_file(dir.path(), "bad.hgr", "1 2\n1 3\n");

        let result = read_hypergraph_file(&path, 2);

        assert!(matches!(
            result,
            Err(PartitionerError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_hypergraph_roundtrip_through_file() -> Result<(), PartitionerError> {
        let dir = tempdir()?;
        let source = write_mock_file(dir.path(), "src.hgr", "2 4 1\n3 1 2\n4 2 3 4\n");
        let hg = read_hypergraph_file(&source, 2)?;

        let out = dir.path().join("copy.hgr");
        let mapping = write_hypergraph_file(&hg, &out)?;
        let reread = read_hypergraph_file(&out, 2)?;

        assert_eq!(mapping, vec![0, 1, 2, 3]);
        assert_eq!(reread.num_nodes(), hg.num_nodes());
        assert_eq!(reread.num_edges(), hg.num_edges());
        assert_eq!(reread.edge_weight(1), 4);
        assert_eq!(reread.pins(1), hg.pins(1));
        Ok(())
    }

    #[test]
    fn test_partition_file_roundtrip() -> Result<(), PartitionerError> {
        let dir = tempdir()?;
        let mut hg = read_hypergraph_file(
            &write_mock_file(dir.path(), "p.hgr", "1 4\n1 2 3 4\n"),
            2,
        )?;
        for u in 0..4 {
            hg.set_node_part(u, (u % 2) as PartitionId);
        }

        let path = dir.path().join("p.part.2");
        write_partition_file(&hg, &path)?;
        let assignment = read_partition_file(&path, 2)?;

        assert_eq!(assignment, vec![0, 1, 0, 1]);
        Ok(())
    }
}
