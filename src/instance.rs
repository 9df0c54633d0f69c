//! Graph Input Model: validated problem instances for the two solvers.
//!
//! Construction is the only place input is validated; solver code downstream
//! assumes a well-formed instance. No algorithmic work happens here.
//!
//! Two construction paths exist for each variant: a typed builder (`new`)
//! and a flat-layout decoder (`from_flat`) consuming the adapter boundary's
//! fixed numeric encoding — edge-endpoint/weight arrays for matching, a
//! dense source-major cost table for arborescence.

use serde::{Deserialize, Serialize};

use crate::error::SolveError;

/// Sentinel cost marking an arc as forbidden in the flat arborescence
/// layout. Any slot holding a value greater than or equal to this is treated
/// as "no arc here"; it is distinct from every legitimate finite cost.
pub const FORBIDDEN_COST: i32 = i32::MAX;

/// Internal "no arc" marker for the widened cost table. Costs from the flat
/// layout are at most `i32::MAX - 1`, so this can never collide with a real
/// cost and differences of real costs can never overflow.
pub(crate) const INF: i64 = i64::MAX;

/// An undirected weighted edge of a matching instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingEdge {
    pub u: usize,
    pub v: usize,
    pub weight: i64,
}

/// A validated minimum-weight perfect matching instance.
///
/// Holds an even number of nodes `0..n` and a sparse list of weighted
/// undirected edges. Parallel edges between the same pair are kept as
/// independent candidates; the solver is free to select either copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingInstance {
    node_count: usize,
    edges: Vec<MatchingEdge>,
}

impl MatchingInstance {
    /// Builds an instance from `(u, v, weight)` triples.
    ///
    /// Fails with [`SolveError::InvalidInput`] if `node_count` is odd, any
    /// endpoint lies outside `[0, node_count)`, or an edge is a self-loop.
    pub fn new(
        node_count: usize,
        edges: impl IntoIterator<Item = (usize, usize, i64)>,
    ) -> Result<Self, SolveError> {
        if node_count % 2 != 0 {
            return Err(SolveError::invalid(format!(
                "node count must be even, got {node_count}"
            )));
        }
        let mut checked = Vec::new();
        for (u, v, weight) in edges {
            if u >= node_count || v >= node_count {
                return Err(SolveError::invalid(format!(
                    "edge ({u}, {v}) has an endpoint outside 0..{node_count}"
                )));
            }
            if u == v {
                return Err(SolveError::invalid(format!("self-loop at node {u}")));
            }
            checked.push(MatchingEdge { u, v, weight });
        }
        Ok(MatchingInstance {
            node_count,
            edges: checked,
        })
    }

    /// Decodes the fixed adapter layout: `endpoints[2e]` and
    /// `endpoints[2e + 1]` are the ends of edge `e`, `weights[e]` its weight.
    ///
    /// Fails with [`SolveError::InvalidInput`] on any length mismatch with
    /// `edge_count`, on negative endpoints, or on anything `new` rejects.
    pub fn from_flat(
        node_count: usize,
        edge_count: usize,
        endpoints: &[i32],
        weights: &[i32],
    ) -> Result<Self, SolveError> {
        if endpoints.len() != 2 * edge_count {
            return Err(SolveError::invalid(format!(
                "expected {} endpoint entries for {} edges, got {}",
                2 * edge_count,
                edge_count,
                endpoints.len()
            )));
        }
        if weights.len() != edge_count {
            return Err(SolveError::invalid(format!(
                "expected {} weight entries, got {}",
                edge_count,
                weights.len()
            )));
        }
        let mut triples = Vec::with_capacity(edge_count);
        for e in 0..edge_count {
            let (u, v) = (endpoints[2 * e], endpoints[2 * e + 1]);
            if u < 0 || v < 0 {
                return Err(SolveError::invalid(format!(
                    "edge {e} has a negative endpoint ({u}, {v})"
                )));
            }
            triples.push((u as usize, v as usize, i64::from(weights[e])));
        }
        Self::new(node_count, triples)
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[MatchingEdge] {
        &self.edges
    }
}

/// A validated minimum spanning arborescence instance.
///
/// A dense directed cost table over nodes `0..n` with node `n - 1`
/// distinguished as the root. Arcs into the root are structurally absent
/// and self-loops are always forbidden, whatever the supplied layout says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArborescenceInstance {
    node_count: usize,
    /// Source-major table, `cost[u * n + v]`; `INF` where no arc exists.
    cost: Vec<i64>,
}

impl ArborescenceInstance {
    /// Builds an instance from `(src, dst, cost)` triples; positions not
    /// supplied are forbidden. Supplying the same position twice keeps the
    /// last value.
    ///
    /// Fails with [`SolveError::InvalidInput`] if `node_count < 2`, an
    /// endpoint is out of range, an arc is a self-loop, or an arc targets
    /// the root.
    pub fn new(
        node_count: usize,
        arcs: impl IntoIterator<Item = (usize, usize, i64)>,
    ) -> Result<Self, SolveError> {
        if node_count < 2 {
            return Err(SolveError::invalid(format!(
                "arborescence needs at least 2 nodes, got {node_count}"
            )));
        }
        let root = node_count - 1;
        let mut cost = vec![INF; node_count * node_count];
        for (src, dst, c) in arcs {
            if src >= node_count || dst >= node_count {
                return Err(SolveError::invalid(format!(
                    "arc ({src}, {dst}) has an endpoint outside 0..{node_count}"
                )));
            }
            if src == dst {
                return Err(SolveError::invalid(format!("self-loop arc at node {src}")));
            }
            if dst == root {
                return Err(SolveError::invalid(format!(
                    "arc ({src}, {dst}) targets the root"
                )));
            }
            cost[src * node_count + dst] = c;
        }
        Ok(ArborescenceInstance { node_count, cost })
    }

    /// Decodes the fixed adapter layout: flattened position
    /// `(n - 1) * i + j` holds the cost of arc `i -> j` for destinations
    /// `j` in `[0, n - 1)`; the root `n - 1` never appears as a
    /// destination. Self-loop slots and any slot holding
    /// [`FORBIDDEN_COST`] or above decode to "no arc".
    pub fn from_flat(node_count: usize, costs: &[i32]) -> Result<Self, SolveError> {
        if node_count < 2 {
            return Err(SolveError::invalid(format!(
                "arborescence needs at least 2 nodes, got {node_count}"
            )));
        }
        let expected = node_count * (node_count - 1);
        if costs.len() != expected {
            return Err(SolveError::invalid(format!(
                "expected {} cost entries for {} nodes, got {}",
                expected,
                node_count,
                costs.len()
            )));
        }
        let n = node_count;
        let mut cost = vec![INF; n * n];
        for i in 0..n {
            for j in 0..n - 1 {
                if i == j {
                    continue;
                }
                let c = costs[(n - 1) * i + j];
                if c < FORBIDDEN_COST {
                    cost[i * n + j] = i64::from(c);
                }
            }
        }
        Ok(ArborescenceInstance {
            node_count: n,
            cost,
        })
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// The designated root, always the highest-numbered node.
    pub fn root(&self) -> usize {
        self.node_count - 1
    }

    /// The cost of arc `src -> dst`, or `None` where no arc exists.
    pub fn cost(&self, src: usize, dst: usize) -> Option<i64> {
        let c = self.cost[src * self.node_count + dst];
        (c != INF).then_some(c)
    }

    /// Raw widened table, `INF` where no arc exists.
    pub(crate) fn table(&self) -> &[i64] {
        &self.cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_node_count_is_rejected() {
        let err = MatchingInstance::new(5, vec![(0, 1, 1)]).unwrap_err();
        assert!(matches!(err, SolveError::InvalidInput { .. }));
    }

    #[test]
    fn out_of_range_endpoint_is_rejected() {
        let err = MatchingInstance::new(4, vec![(0, 4, 1)]).unwrap_err();
        assert!(matches!(err, SolveError::InvalidInput { .. }));
    }

    #[test]
    fn self_loop_edge_is_rejected() {
        let err = MatchingInstance::new(4, vec![(2, 2, 1)]).unwrap_err();
        assert!(matches!(err, SolveError::InvalidInput { .. }));
    }

    #[test]
    fn flat_matching_layout_decodes() {
        let inst = MatchingInstance::from_flat(4, 2, &[0, 1, 2, 3], &[7, 9]).unwrap();
        assert_eq!(inst.node_count(), 4);
        assert_eq!(inst.edge_count(), 2);
        assert_eq!(
            inst.edges()[1],
            MatchingEdge {
                u: 2,
                v: 3,
                weight: 9
            }
        );
    }

    #[test]
    fn flat_matching_length_mismatch_is_rejected() {
        assert!(MatchingInstance::from_flat(4, 2, &[0, 1, 2], &[7, 9]).is_err());
        assert!(MatchingInstance::from_flat(4, 2, &[0, 1, 2, 3], &[7]).is_err());
        assert!(MatchingInstance::from_flat(4, 1, &[0, -1], &[7]).is_err());
    }

    #[test]
    fn empty_even_instance_is_accepted() {
        let inst = MatchingInstance::new(0, vec![]).unwrap();
        assert_eq!(inst.node_count(), 0);
    }

    #[test]
    fn too_small_arborescence_is_rejected() {
        assert!(ArborescenceInstance::new(1, vec![]).is_err());
        assert!(ArborescenceInstance::from_flat(0, &[]).is_err());
    }

    #[test]
    fn arcs_into_root_are_rejected() {
        let err = ArborescenceInstance::new(3, vec![(0, 2, 1)]).unwrap_err();
        assert!(matches!(err, SolveError::InvalidInput { .. }));
    }

    #[test]
    fn flat_arborescence_layout_decodes() {
        // n = 3, root = 2; rows are sources, columns destinations 0 and 1.
        let costs = [
            FORBIDDEN_COST, 2, // from 0: self-loop slot, 0 -> 1
            3, FORBIDDEN_COST, // from 1: 1 -> 0, self-loop slot
            1, 4, // from 2 (root): 2 -> 0, 2 -> 1
        ];
        let inst = ArborescenceInstance::from_flat(3, &costs).unwrap();
        assert_eq!(inst.root(), 2);
        assert_eq!(inst.cost(0, 1), Some(2));
        assert_eq!(inst.cost(1, 0), Some(3));
        assert_eq!(inst.cost(2, 0), Some(1));
        assert_eq!(inst.cost(2, 1), Some(4));
        assert_eq!(inst.cost(0, 0), None);
        assert_eq!(inst.cost(1, 2), None);
    }

    #[test]
    fn self_loop_slot_value_is_ignored() {
        // A finite value in a self-loop slot must still decode to "no arc".
        let costs = [5, 2, 3, 5, 1, 4];
        let inst = ArborescenceInstance::from_flat(3, &costs).unwrap();
        assert_eq!(inst.cost(0, 0), None);
        assert_eq!(inst.cost(1, 1), None);
    }

    #[test]
    fn wrong_table_size_is_rejected() {
        assert!(ArborescenceInstance::from_flat(3, &[1, 2, 3]).is_err());
    }
}
