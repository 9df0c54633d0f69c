//! Exact combinatorial optimization on graphs.
//!
//! Two solvers, both exact and both deterministic for a fixed instance:
//!
//! - [`solve_matching`]: minimum-weight perfect matching on a general
//!   undirected graph, by the primal-dual blossom method.
//! - [`solve_arborescence`]: minimum-cost spanning arborescence of a dense
//!   directed graph, by Chu-Liu/Edmonds cycle contraction.
//!
//! Instances are validated once at construction ([`MatchingInstance`],
//! [`ArborescenceInstance`]); each accepts either typed edge/arc lists or
//! the flat numeric layouts of the adapter boundary, and results can be
//! re-encoded flat the same way. Solvers run single-threaded on a single
//! instance and share no state between calls, so independent solves may
//! run concurrently from separate threads.
//!
//! ```
//! use edmonds::{MatchingInstance, SolveOptions, solve_matching};
//!
//! let inst = MatchingInstance::new(4, [(0, 1, 1), (0, 2, 5), (1, 3, 5), (2, 3, 1)])?;
//! let matching = solve_matching(&inst, SolveOptions::default())?;
//! assert_eq!(matching.total_weight(), 2);
//! assert_eq!(matching.partner(0), 1);
//! # Ok::<(), edmonds::SolveError>(())
//! ```

mod arborescence;
mod error;
mod instance;
mod matching;
mod options;

pub use arborescence::{solve_arborescence, Arborescence, ArborescenceStats};
pub use error::SolveError;
pub use instance::{ArborescenceInstance, MatchingEdge, MatchingInstance, FORBIDDEN_COST};
pub use matching::{solve_matching, Matching, MatchingStats};
pub use options::SolveOptions;
