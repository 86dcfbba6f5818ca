//! Triangle-to-node connectivity queries used for topological repair.

use std::collections::HashMap;
use std::collections::HashSet;

/// Per-node incident-triangle counts.
pub fn valence(n_points: usize, triangles: &[[usize; 3]]) -> Vec<usize> {
    let mut counts = vec![0usize; n_points];
    for tri in triangles {
        for &v in tri {
            counts[v] += 1;
        }
    }
    counts
}

/// Unordered edges of the triangulation that belong to exactly one
/// triangle, i.e. the mesh boundary.
pub fn boundary_edges(triangles: &[[usize; 3]]) -> Vec<(usize, usize)> {
    let mut seen: HashMap<(usize, usize), usize> = HashMap::new();
    for tri in triangles {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let key = (a.min(b), a.max(b));
            *seen.entry(key).or_insert(0) += 1;
        }
    }
    seen.into_iter()
        .filter(|&(_, n)| n == 1)
        .map(|(e, _)| e)
        .collect()
}

/// Nodes on the mesh boundary.
pub fn boundary_nodes(triangles: &[[usize; 3]]) -> HashSet<usize> {
    let mut nodes = HashSet::new();
    for (a, b) in boundary_edges(triangles) {
        nodes.insert(a);
        nodes.insert(b);
    }
    nodes
}

/// Indices of nodes eligible for deletion: incident-triangle count at most
/// 4, excluding boundary nodes and the fixed prefix `0..n_fixed`.
pub fn prune_candidates(
    n_points: usize,
    triangles: &[[usize; 3]],
    n_fixed: usize,
) -> Vec<usize> {
    let counts = valence(n_points, triangles);
    let on_boundary = boundary_nodes(triangles);
    (n_fixed..n_points)
        .filter(|&i| counts[i] > 0 && counts[i] <= 4 && !on_boundary.contains(&i))
        .collect()
}

/// Deduplicated undirected edges of the triangulation, each unordered node
/// pair appearing exactly once.
pub fn unique_bars(triangles: &[[usize; 3]]) -> Vec<(usize, usize)> {
    let mut bars: Vec<(usize, usize)> = triangles
        .iter()
        .flat_map(|tri| {
            [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
                .into_iter()
                .map(|(a, b)| (a.min(b), a.max(b)))
        })
        .collect();
    bars.sort_unstable();
    bars.dedup();
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two triangles sharing the edge 1-2.
    fn quad() -> Vec<[usize; 3]> {
        vec![[0, 1, 2], [1, 3, 2]]
    }

    #[test]
    fn bars_are_unique() {
        let bars = unique_bars(&quad());
        assert_eq!(bars.len(), 5);
        let mut sorted = bars.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), bars.len());
        assert!(bars.contains(&(1, 2)));
    }

    #[test]
    fn boundary_excludes_shared_edge() {
        let edges = boundary_edges(&quad());
        assert_eq!(edges.len(), 4);
        assert!(!edges.contains(&(1, 2)));
    }

    #[test]
    fn prune_skips_boundary_and_fixed() {
        // In a 2-triangle strip every node is on the boundary.
        assert!(prune_candidates(4, &quad(), 0).is_empty());
    }

    #[test]
    fn interior_low_valence_node_flagged() {
        // Fan of 3 triangles around node 0; node 0 is interior with valence 3.
        let tris = vec![[0, 1, 2], [0, 2, 3], [0, 3, 1]];
        let flagged = prune_candidates(4, &tris, 0);
        assert_eq!(flagged, vec![0]);
        // ...unless it is fixed.
        assert!(prune_candidates(4, &tris, 1).is_empty());
    }
}
