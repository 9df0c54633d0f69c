//! Minimum-cost spanning arborescence rooted at the designated root node.
//!
//! Chu-Liu/Edmonds by explicit contraction levels: greedily pick the
//! cheapest incoming arc for every non-root node; if the picks are acyclic
//! they already form an optimal arborescence, otherwise one chosen cycle is
//! contracted into a pseudo-node and the procedure repeats on the smaller
//! graph. Arcs entering a contracted cycle carry reduced costs (original
//! cost minus the cost of the displaced in-cycle arc), so the greedy choice
//! at the contracted level prices the swap correctly. Expansion walks the
//! level stack backwards: every chosen arc is replaced by the concrete arc
//! that realized it one level down, and cycle nodes not reached by the
//! entering arc keep their in-cycle predecessors.
//!
//! Each level is a dense cost table over at most one fewer node than the
//! level below, so the level stack is O(n) deep and the whole solve is
//! O(n^3) time and O(n^2) peak memory for the dense input this engine
//! accepts.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::SolveError;
use crate::instance::{ArborescenceInstance, INF};
use crate::options::SolveOptions;

const NONE: usize = usize::MAX;

/// A minimum-cost spanning arborescence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arborescence {
    predecessors: Vec<usize>,
    total_cost: i64,
    stats: ArborescenceStats,
}

impl Arborescence {
    /// The predecessor of non-root `node` on its path from the root.
    pub fn predecessor(&self, node: usize) -> usize {
        self.predecessors[node]
    }

    /// Predecessor array over the non-root nodes `0..n - 1`.
    pub fn predecessors(&self) -> &[usize] {
        &self.predecessors
    }

    /// Sum of the costs of the selected arcs.
    pub fn total_cost(&self) -> i64 {
        self.total_cost
    }

    pub fn stats(&self) -> &ArborescenceStats {
        &self.stats
    }

    /// Fixed output layout for the adapter boundary: `n - 1` entries, entry
    /// `v` is the predecessor of node `v`. The root has no entry.
    pub fn to_flat(&self) -> Vec<i32> {
        self.predecessors.iter().map(|&p| p as i32).collect()
    }
}

/// Counters describing one solve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArborescenceStats {
    /// Cycles contracted before the greedy picks became acyclic.
    pub contractions: usize,
}

/// One graph in the contraction stack.
///
/// `cost` is source-major over `n` nodes with `INF` marking absent arcs.
/// `arc_from` / `arc_to` realize each arc one level down: slot `u * n + v`
/// names the previous-level arc whose (possibly reduced) cost this slot
/// carries. At the base level every arc realizes itself. `repr` maps each
/// node to an original node id it contains, for error reporting.
struct Level {
    n: usize,
    root: usize,
    cost: Vec<i64>,
    arc_from: Vec<usize>,
    arc_to: Vec<usize>,
    repr: Vec<usize>,
}

/// Cycle found among the greedy picks of one level, recorded for expansion.
struct CycleFrame {
    cycle: Vec<usize>,
    /// In-cycle predecessor of `cycle[i]` at the cycle's own level.
    cycle_pred: Vec<usize>,
}

/// Computes a minimum-cost spanning arborescence of `instance`, rooted at
/// its designated root.
///
/// Returns [`SolveError::InfeasibleArborescence`] when some node cannot be
/// reached from the root; the reported node id is an original node inside
/// the unreachable component. Among equal-cost optima the selected arc set
/// follows source order and is not canonical; only the total cost is part
/// of the contract.
pub fn solve_arborescence(
    instance: &ArborescenceInstance,
    options: SolveOptions,
) -> Result<Arborescence, SolveError> {
    let n = instance.node_count();
    let root = instance.root();

    let mut levels = vec![Level {
        n,
        root,
        cost: instance.table().to_vec(),
        arc_from: identity_realizers(n),
        arc_to: transposed_realizers(n),
        repr: (0..n).collect(),
    }];
    let mut frames: Vec<CycleFrame> = Vec::new();

    // Contraction phase: one cycle per level until the picks are acyclic.
    let mut pred = loop {
        let level = levels.last().expect("level stack never empties");
        let pred = cheapest_incoming(level)?;
        match find_cycle(&pred, level.root) {
            None => break pred,
            Some(cycle) => {
                trace!(
                    "level {}: contracting cycle of {} nodes",
                    levels.len() - 1,
                    cycle.len()
                );
                let cycle_pred = cycle.iter().map(|&c| pred[c]).collect();
                let next = contract(level, &cycle, &pred);
                frames.push(CycleFrame { cycle, cycle_pred });
                levels.push(next);
            }
        }
    };

    let contractions = frames.len();

    // Expansion phase: rewrite each chosen arc as its realizer one level
    // down, then close the cycle around the entering arc.
    while let Some(frame) = frames.pop() {
        let level = levels.pop().expect("one level per cycle frame");
        let below_n = levels.last().expect("level stack never empties").n;
        let mut pred_below = vec![NONE; below_n];
        for v in 0..level.n {
            if v == level.root {
                continue;
            }
            let slot = pred[v] * level.n + v;
            pred_below[level.arc_to[slot]] = level.arc_from[slot];
        }
        for (i, &c) in frame.cycle.iter().enumerate() {
            if pred_below[c] == NONE {
                pred_below[c] = frame.cycle_pred[i];
            }
        }
        pred = pred_below;
    }

    let table = instance.table();
    let mut total_cost = 0i64;
    let mut predecessors = vec![NONE; n - 1];
    for v in 0..n - 1 {
        let p = pred[v];
        debug_assert!(p != NONE && table[p * n + v] != INF);
        predecessors[v] = p;
        total_cost += table[p * n + v];
    }

    let stats = ArborescenceStats { contractions };
    debug!(
        "arborescence solved: n={} root={} cost={} contractions={}",
        n, root, total_cost, stats.contractions
    );

    if options.verify {
        for v in 0..n - 1 {
            let mut cur = v;
            let mut hops = 0;
            while cur != root {
                cur = predecessors[cur];
                hops += 1;
                assert!(hops < n, "predecessor chain from node {v} never reaches the root");
            }
        }
    }

    Ok(Arborescence {
        predecessors,
        total_cost,
        stats,
    })
}

fn identity_realizers(n: usize) -> Vec<usize> {
    (0..n * n).map(|slot| slot / n).collect()
}

fn transposed_realizers(n: usize) -> Vec<usize> {
    (0..n * n).map(|slot| slot % n).collect()
}

/// Greedy pick: the cheapest incoming arc for every non-root node, or the
/// infeasibility proof if some node has none.
fn cheapest_incoming(level: &Level) -> Result<Vec<usize>, SolveError> {
    let n = level.n;
    let mut pred = vec![NONE; n];
    for v in 0..n {
        if v == level.root {
            continue;
        }
        let mut best = NONE;
        for u in 0..n {
            if u == v || level.cost[u * n + v] == INF {
                continue;
            }
            if best == NONE || level.cost[u * n + v] < level.cost[best * n + v] {
                best = u;
            }
        }
        if best == NONE {
            return Err(SolveError::InfeasibleArborescence {
                node: level.repr[v],
            });
        }
        pred[v] = best;
    }
    Ok(pred)
}

/// Finds one cycle among the predecessor picks, in pred-chasing order, or
/// `None` when every chain reaches the root.
fn find_cycle(pred: &[usize], root: usize) -> Option<Vec<usize>> {
    const UNSEEN: u8 = 0;
    const ACTIVE: u8 = 1;
    const DONE: u8 = 2;
    let mut state = vec![UNSEEN; pred.len()];
    state[root] = DONE;
    for start in 0..pred.len() {
        if state[start] != UNSEEN {
            continue;
        }
        let mut path = Vec::new();
        let mut v = start;
        while state[v] == UNSEEN {
            state[v] = ACTIVE;
            path.push(v);
            v = pred[v];
        }
        if state[v] == ACTIVE {
            let pos = path
                .iter()
                .position(|&x| x == v)
                .expect("active node lies on the current chain");
            return Some(path[pos..].to_vec());
        }
        for p in path {
            state[p] = DONE;
        }
    }
    None
}

/// Contracts `cycle` into a single pseudo-node, producing the next level.
///
/// Surviving nodes keep their relative order; the pseudo-node is numbered
/// last. Arcs into the cycle are re-priced by the cost of the in-cycle arc
/// they would displace; arcs out of the cycle and arcs between survivors
/// keep their cost. Parallel candidates collapse to the cheapest, and the
/// realizer matrices remember which concrete arc won each slot.
fn contract(level: &Level, cycle: &[usize], pred: &[usize]) -> Level {
    let n = level.n;
    let mut in_cycle = vec![false; n];
    for &c in cycle {
        in_cycle[c] = true;
    }

    let mut map = vec![NONE; n];
    let mut next = 0;
    for v in 0..n {
        if !in_cycle[v] {
            map[v] = next;
            next += 1;
        }
    }
    let merged = next;
    let n_new = next + 1;
    for &c in cycle {
        map[c] = merged;
    }

    let mut cost = vec![INF; n_new * n_new];
    let mut arc_from = vec![NONE; n_new * n_new];
    let mut arc_to = vec![NONE; n_new * n_new];
    for u in 0..n {
        for v in 0..n {
            let c = level.cost[u * n + v];
            if c == INF || map[u] == map[v] {
                continue;
            }
            let priced = if map[v] == merged {
                c - level.cost[pred[v] * n + v]
            } else {
                c
            };
            let slot = map[u] * n_new + map[v];
            if priced < cost[slot] {
                cost[slot] = priced;
                arc_from[slot] = u;
                arc_to[slot] = v;
            }
        }
    }

    let mut repr = vec![0; n_new];
    for v in 0..n {
        if !in_cycle[v] {
            repr[map[v]] = level.repr[v];
        }
    }
    repr[merged] = level.repr[cycle[0]];

    Level {
        n: n_new,
        root: map[level.root],
        cost,
        arc_from,
        arc_to,
        repr,
    }
}
