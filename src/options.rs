//! Per-call solver configuration.
//!
//! The engine takes an explicit, immutable options value at solve time
//! instead of consulting any process-wide default, so concurrent solves on
//! independent instances can never observe each other's configuration.

use serde::{Deserialize, Serialize};

/// Immutable configuration passed to a solver for the duration of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Re-check the structural invariants of the result before returning it
    /// (partner involution and completeness for matchings, acyclic in-tree
    /// shape for arborescences). A failed check panics: it proves a bug in
    /// the engine, not a property of the input.
    pub verify: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions { verify: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_verifies() {
        assert!(SolveOptions::default().verify);
    }
}
