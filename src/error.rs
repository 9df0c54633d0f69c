//! Error types for the solver engine.
//!
//! Every failure is terminal for the call that produced it: the engine never
//! returns a partial matching or a best-effort arborescence alongside an
//! error. Malformed instances are rejected eagerly at construction, before
//! any solver state exists; infeasibility is reported only once the exact
//! algorithm has proven it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure modes of instance construction and the two solvers.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SolveError {
    /// The problem instance is malformed: inconsistent array lengths,
    /// out-of-range endpoints, an odd node count for matching, or fewer
    /// than two nodes for arborescence.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The supplied graph admits no perfect matching. Reported only after
    /// the blossom method has exhausted every augmenting possibility.
    #[error("graph admits no perfect matching")]
    InfeasibleMatching,

    /// Some non-root node has no finite-cost incoming arc at some
    /// contraction level. `node` is an original node id inside the
    /// component that cannot be reached.
    #[error("no spanning arborescence: node {node} has no usable incoming arc")]
    InfeasibleArborescence { node: usize },
}

impl SolveError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        SolveError::InvalidInput {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings_are_stable() {
        let e = SolveError::invalid("node count must be even, got 5");
        assert_eq!(
            e.to_string(),
            "invalid input: node count must be even, got 5"
        );
        assert_eq!(
            SolveError::InfeasibleArborescence { node: 3 }.to_string(),
            "no spanning arborescence: node 3 has no usable incoming arc"
        );
    }
}
