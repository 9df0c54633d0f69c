//! Minimum-weight perfect matching on general graphs.
//!
//! Primal-dual blossom method: one dual variable per node and per contracted
//! blossom, kept feasible (`y_u + y_v <= w(u, v)` for every edge), with the
//! tight edges forming the admissible subgraph. Alternating trees are grown
//! from unmatched nodes over tight edges; a tight edge between two outer
//! nodes of the same tree contracts an odd cycle into a blossom, one between
//! different trees yields an augmenting path, and when neither exists the
//! duals are shifted by the largest feasible step. Infeasibility (no perfect
//! matching) is proven when a search stage ends without augmenting while
//! unmatched nodes remain.
//!
//! Internally this is the array-arena formulation: a slot arena of `2n`
//! blossom records addressed by index, a node-to-active-blossom map for O(1)
//! "current blossom of a node" lookups, and half-edge ("endpoint") encoding
//! where edge `k` owns endpoints `2k` and `2k + 1`. Minimization runs the
//! maximization machinery on negated weights under mandatory-cardinality
//! dual updates. Slacks are computed against doubled weights so every dual
//! step stays integral for integer inputs.
//!
//! Worst-case running time is O(n^3); memory is O(n + m) plus O(n) blossom
//! bookkeeping. Weights are expected to fit the adapter boundary's 32-bit
//! width; the internal doubling makes values beyond that range unspecified.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::SolveError;
use crate::instance::MatchingInstance;
use crate::options::SolveOptions;

const NONE: usize = usize::MAX;

/// Node / blossom labels during a search stage.
const FREE: u8 = 0;
/// Outer: reachable from a root by an even-length alternating path.
const OUTER: u8 = 1;
/// Inner: reachable by an odd-length alternating path.
const INNER: u8 = 2;
/// Temporary mark used while scanning for a blossom base (bit 2 set).
const BREADCRUMB: u8 = 5;

/// A perfect matching of minimum total weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matching {
    partner: Vec<usize>,
    total_weight: i64,
    stats: MatchingStats,
}

impl Matching {
    /// The matched partner of `node`.
    pub fn partner(&self, node: usize) -> usize {
        self.partner[node]
    }

    /// Partner array: entry `i` holds the partner of node `i`.
    pub fn partners(&self) -> &[usize] {
        &self.partner
    }

    /// Sum of the weights of the selected edges.
    pub fn total_weight(&self) -> i64 {
        self.total_weight
    }

    pub fn stats(&self) -> &MatchingStats {
        &self.stats
    }

    /// Fixed output layout for the adapter boundary: `n` entries, entry `i`
    /// is the partner of node `i`. Every entry is populated; a successful
    /// solve guarantees a perfect matching.
    pub fn to_flat(&self) -> Vec<i32> {
        self.partner.iter().map(|&p| p as i32).collect()
    }
}

/// Counters describing one solve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingStats {
    pub stages: usize,
    pub blossoms_formed: usize,
    pub blossoms_expanded: usize,
    pub dual_updates: usize,
}

/// Computes a minimum-weight perfect matching of `instance`.
///
/// Returns [`SolveError::InfeasibleMatching`] if the graph admits no perfect
/// matching. Among equal-weight optima the selected matching follows edge
/// insertion order and is not canonical; only the total weight is part of
/// the contract.
pub fn solve_matching(
    instance: &MatchingInstance,
    options: SolveOptions,
) -> Result<Matching, SolveError> {
    let n = instance.node_count();
    if n == 0 {
        return Ok(Matching {
            partner: Vec::new(),
            total_weight: 0,
            stats: MatchingStats::default(),
        });
    }

    // Maximizing the negated weights over perfect matchings is minimizing
    // the original weights.
    let edges: Vec<(usize, usize, i64)> = instance
        .edges()
        .iter()
        .map(|e| (e.u, e.v, -e.weight))
        .collect();

    let mut search = BlossomSearch::new(n, &edges);
    search.run();

    let mut partner = vec![NONE; n];
    let mut total_weight = 0i64;
    for v in 0..n {
        let p = search.mate[v];
        if p == NONE {
            debug!("matching infeasible: node {v} left unmatched at quiescence");
            return Err(SolveError::InfeasibleMatching);
        }
        let w = search.endpoint[p];
        partner[v] = w;
        if v < w {
            total_weight += instance.edges()[p / 2].weight;
        }
    }

    let stats = search.stats;
    debug!(
        "matching solved: n={} m={} weight={} stages={} blossoms={}/{} dual_updates={}",
        n,
        instance.edge_count(),
        total_weight,
        stats.stages,
        stats.blossoms_formed,
        stats.blossoms_expanded,
        stats.dual_updates
    );

    if options.verify {
        for v in 0..n {
            assert_ne!(partner[v], v, "node {v} matched to itself");
            assert_eq!(
                partner[partner[v]], v,
                "partner map is not an involution at node {v}"
            );
        }
    }

    Ok(Matching {
        partner,
        total_weight,
        stats,
    })
}

/// State of one blossom search over a fixed graph.
///
/// Slots `0..n` are original nodes, slots `n..2n` the blossom arena; a slot
/// is live while `base` is set. `mate` and the labels speak in endpoint
/// indices: endpoint `p` belongs to edge `p / 2` and points at node
/// `endpoint[p]`, and `p ^ 1` is the opposite endpoint of the same edge.
struct BlossomSearch<'a> {
    n: usize,
    edges: &'a [(usize, usize, i64)],
    endpoint: Vec<usize>,
    /// Half-edges leaving each node (`endpoint[p]` is the far end).
    neighbors: Vec<Vec<usize>>,
    mate: Vec<usize>,
    label: Vec<u8>,
    label_end: Vec<usize>,
    in_blossom: Vec<usize>,
    blossom_parent: Vec<usize>,
    blossom_children: Vec<Vec<usize>>,
    blossom_base: Vec<usize>,
    /// Endpoints of the cyclic edges connecting a blossom's children.
    blossom_endps: Vec<Vec<usize>>,
    best_edge: Vec<usize>,
    /// Least-slack edge cache per neighboring outer blossom (empty = none).
    blossom_best_edges: Vec<Vec<usize>>,
    unused_blossoms: Vec<usize>,
    dual: Vec<i64>,
    allowed: Vec<bool>,
    queue: Vec<usize>,
    stats: MatchingStats,
}

impl<'a> BlossomSearch<'a> {
    fn new(n: usize, edges: &'a [(usize, usize, i64)]) -> Self {
        let m = edges.len();
        let mut endpoint = Vec::with_capacity(2 * m);
        let mut neighbors = vec![Vec::new(); n];
        for (k, &(u, v, _)) in edges.iter().enumerate() {
            endpoint.push(u);
            endpoint.push(v);
            neighbors[u].push(2 * k + 1);
            neighbors[v].push(2 * k);
        }
        let max_weight = edges.iter().map(|e| e.2).max().unwrap_or(0).max(0);
        let mut dual = vec![max_weight; n];
        dual.resize(2 * n, 0);
        BlossomSearch {
            n,
            edges,
            endpoint,
            neighbors,
            mate: vec![NONE; n],
            label: vec![FREE; 2 * n],
            label_end: vec![NONE; 2 * n],
            in_blossom: (0..n).collect(),
            blossom_parent: vec![NONE; 2 * n],
            blossom_children: vec![Vec::new(); 2 * n],
            blossom_base: (0..n).chain(std::iter::repeat(NONE).take(n)).collect(),
            blossom_endps: vec![Vec::new(); 2 * n],
            best_edge: vec![NONE; 2 * n],
            blossom_best_edges: vec![Vec::new(); 2 * n],
            unused_blossoms: (n..2 * n).collect(),
            dual,
            allowed: vec![false; m],
            queue: Vec::new(),
            stats: MatchingStats::default(),
        }
    }

    /// Slack of edge `k` against the current duals; zero means tight.
    fn slack(&self, k: usize) -> i64 {
        let (u, v, w) = self.edges[k];
        self.dual[u] + self.dual[v] - 2 * w
    }

    /// Original nodes contained in (possibly nested) blossom `b`.
    fn leaves(&self, b: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![b];
        while let Some(t) = stack.pop() {
            if t < self.n {
                out.push(t);
            } else {
                stack.extend(self.blossom_children[t].iter().rev().copied());
            }
        }
        out
    }

    /// Labels node `w` (and its top-level blossom) outer or inner, with
    /// `p` the endpoint through which the label was reached. Labeling a
    /// node inner immediately labels its mate outer.
    fn assign_label(&mut self, w: usize, kind: u8, p: usize) {
        let b = self.in_blossom[w];
        debug_assert!(self.label[w] == FREE && self.label[b] == FREE);
        self.label[w] = kind;
        self.label[b] = kind;
        self.label_end[w] = p;
        self.label_end[b] = p;
        self.best_edge[w] = NONE;
        self.best_edge[b] = NONE;
        if kind == OUTER {
            let leaves = self.leaves(b);
            self.queue.extend(leaves);
        } else {
            let base = self.blossom_base[b];
            let mb = self.mate[base];
            debug_assert!(mb != NONE, "inner blossom with unmatched base");
            self.assign_label(self.endpoint[mb], OUTER, mb ^ 1);
        }
    }

    /// Traces the alternating paths from `v` and `w` back to their roots.
    /// Returns the first common blossom base (a new blossom closes there),
    /// or `NONE` when the roots differ (an augmenting path exists).
    fn scan_blossom(&mut self, v: usize, w: usize) -> usize {
        let mut path = Vec::new();
        let mut base = NONE;
        let (mut v, mut w) = (v, w);
        while v != NONE || w != NONE {
            let mut b = self.in_blossom[v];
            if self.label[b] & 4 != 0 {
                base = self.blossom_base[b];
                break;
            }
            debug_assert_eq!(self.label[b], OUTER);
            path.push(b);
            self.label[b] = BREADCRUMB;
            debug_assert_eq!(self.label_end[b], self.mate[self.blossom_base[b]]);
            if self.label_end[b] == NONE {
                // Reached a root (unmatched base); this path ends.
                v = NONE;
            } else {
                v = self.endpoint[self.label_end[b]];
                b = self.in_blossom[v];
                debug_assert_eq!(self.label[b], INNER);
                debug_assert!(self.label_end[b] != NONE);
                v = self.endpoint[self.label_end[b]];
            }
            if w != NONE {
                std::mem::swap(&mut v, &mut w);
            }
        }
        for b in path {
            self.label[b] = OUTER;
        }
        base
    }

    /// Contracts the odd cycle through edge `k` (whose ends lie in the same
    /// tree) and blossom base `base` into a fresh arena slot.
    fn add_blossom(&mut self, base: usize, k: usize) {
        let (mut v, mut w, _) = self.edges[k];
        let bb = self.in_blossom[base];
        let mut bv = self.in_blossom[v];
        let mut bw = self.in_blossom[w];
        let b = self.unused_blossoms.pop().expect("blossom arena exhausted");
        trace!("contracting blossom {b} with base {base} through edge {k}");
        self.stats.blossoms_formed += 1;

        self.blossom_base[b] = base;
        self.blossom_parent[b] = NONE;
        self.blossom_parent[bb] = b;

        // Collect the cycle: sub-blossoms and the endpoints joining them.
        let mut path = Vec::new();
        let mut endps = Vec::new();
        while bv != bb {
            self.blossom_parent[bv] = b;
            path.push(bv);
            endps.push(self.label_end[bv]);
            debug_assert!(self.label_end[bv] != NONE);
            v = self.endpoint[self.label_end[bv]];
            bv = self.in_blossom[v];
        }
        path.push(bb);
        path.reverse();
        endps.reverse();
        endps.push(2 * k);
        while bw != bb {
            self.blossom_parent[bw] = b;
            path.push(bw);
            endps.push(self.label_end[bw] ^ 1);
            w = self.endpoint[self.label_end[bw]];
            bw = self.in_blossom[w];
        }

        debug_assert_eq!(self.label[bb], OUTER);
        self.label[b] = OUTER;
        self.label_end[b] = self.label_end[bb];
        self.dual[b] = 0;
        self.blossom_children[b] = path;
        self.blossom_endps[b] = endps;

        for v in self.leaves(b) {
            if self.label[self.in_blossom[v]] == INNER {
                // Inner node swallowed by an outer blossom: it becomes
                // outer and joins the scan queue.
                self.queue.push(v);
            }
            self.in_blossom[v] = b;
        }

        // Rebuild the least-slack edge cache for the new blossom.
        let mut best_edge_to = vec![NONE; 2 * self.n];
        let children = self.blossom_children[b].clone();
        for &bv in &children {
            let candidate_lists: Vec<Vec<usize>> = if self.blossom_best_edges[bv].is_empty() {
                self.leaves(bv)
                    .into_iter()
                    .map(|v| self.neighbors[v].iter().map(|&p| p / 2).collect())
                    .collect()
            } else {
                vec![self.blossom_best_edges[bv].clone()]
            };
            for list in candidate_lists {
                for k2 in list {
                    let (mut i, mut j, _) = self.edges[k2];
                    if self.in_blossom[j] == b {
                        std::mem::swap(&mut i, &mut j);
                    }
                    let bj = self.in_blossom[j];
                    if bj != b
                        && self.label[bj] == OUTER
                        && (best_edge_to[bj] == NONE
                            || self.slack(k2) < self.slack(best_edge_to[bj]))
                    {
                        best_edge_to[bj] = k2;
                    }
                }
            }
            self.blossom_best_edges[bv] = Vec::new();
            self.best_edge[bv] = NONE;
        }
        let cache: Vec<usize> = best_edge_to.into_iter().filter(|&k2| k2 != NONE).collect();
        self.best_edge[b] = NONE;
        for &k2 in &cache {
            if self.best_edge[b] == NONE || self.slack(k2) < self.slack(self.best_edge[b]) {
                self.best_edge[b] = k2;
            }
        }
        self.blossom_best_edges[b] = cache;
    }

    /// Dissolves blossom `b`, restoring its children as top-level blossoms.
    /// During a stage (`end_stage == false`) an inner blossom additionally
    /// relabels the even-path half of its cycle so the alternating tree
    /// stays consistent; at stage end only zero-dual nesting is unwound.
    fn expand_blossom(&mut self, b: usize, end_stage: bool) {
        trace!("expanding blossom {b} (end_stage={end_stage})");
        self.stats.blossoms_expanded += 1;
        let children = std::mem::take(&mut self.blossom_children[b]);
        let endps = std::mem::take(&mut self.blossom_endps[b]);

        for &s in &children {
            self.blossom_parent[s] = NONE;
            if s < self.n {
                self.in_blossom[s] = s;
            } else if end_stage && self.dual[s] == 0 {
                self.expand_blossom(s, end_stage);
            } else {
                for v in self.leaves(s) {
                    self.in_blossom[v] = s;
                }
            }
        }

        if !end_stage && self.label[b] == INNER {
            // Walk the cycle from the entry child to the base, relabeling
            // alternately; the traversal direction with an even number of
            // hops is chosen via the parity trick below.
            let entry_child = self.in_blossom[self.endpoint[self.label_end[b] ^ 1]];
            let len = children.len() as isize;
            let idx = |j: isize| j.rem_euclid(len) as usize;
            let pos = children
                .iter()
                .position(|&c| c == entry_child)
                .expect("entry child missing from its own blossom");
            let mut j = pos as isize;
            let (jstep, endptrick): (isize, usize) = if pos % 2 == 1 {
                j -= len;
                (1, 0)
            } else {
                (-1, 1)
            };
            let mut p = self.label_end[b];
            while j != 0 {
                let q = endps[idx(j - endptrick as isize)];
                self.label[self.endpoint[p ^ 1]] = FREE;
                self.label[self.endpoint[q ^ endptrick ^ 1]] = FREE;
                self.assign_label(self.endpoint[p ^ 1], INNER, p);
                self.allowed[q / 2] = true;
                j += jstep;
                p = endps[idx(j - endptrick as isize)] ^ endptrick;
                self.allowed[p / 2] = true;
                j += jstep;
            }
            // The base child keeps the inner label with the entry endpoint.
            let bv = children[idx(j)];
            self.label[self.endpoint[p ^ 1]] = INNER;
            self.label[bv] = INNER;
            self.label_end[self.endpoint[p ^ 1]] = p;
            self.label_end[bv] = p;
            self.best_edge[bv] = NONE;
            // The remaining children leave the tree unless an outside edge
            // already reached one of their nodes.
            j += jstep;
            while children[idx(j)] != entry_child {
                let bv = children[idx(j)];
                if self.label[bv] == OUTER {
                    j += jstep;
                    continue;
                }
                let mut labeled = NONE;
                for v in self.leaves(bv) {
                    if self.label[v] != FREE {
                        labeled = v;
                        break;
                    }
                }
                if labeled != NONE {
                    let v = labeled;
                    debug_assert_eq!(self.label[v], INNER);
                    debug_assert_eq!(self.in_blossom[v], bv);
                    self.label[v] = FREE;
                    self.label[self.endpoint[self.mate[self.blossom_base[bv]]]] = FREE;
                    self.assign_label(v, INNER, self.label_end[v]);
                }
                j += jstep;
            }
        }

        self.label[b] = FREE;
        self.label_end[b] = NONE;
        self.blossom_base[b] = NONE;
        self.blossom_best_edges[b] = Vec::new();
        self.best_edge[b] = NONE;
        self.unused_blossoms.push(b);
    }

    /// Flips matched/unmatched status inside blossom `b` so that node `v`
    /// becomes its base, recursing into nested sub-blossoms.
    fn augment_blossom(&mut self, b: usize, v: usize) {
        let mut t = v;
        while self.blossom_parent[t] != b {
            t = self.blossom_parent[t];
        }
        if t >= self.n {
            self.augment_blossom(t, v);
        }
        let len = self.blossom_children[b].len() as isize;
        let idx = |j: isize| j.rem_euclid(len) as usize;
        let pos = self.blossom_children[b]
            .iter()
            .position(|&c| c == t)
            .expect("augmentation entry missing from its blossom");
        let mut j = pos as isize;
        let (jstep, endptrick): (isize, usize) = if pos % 2 == 1 {
            j -= len;
            (1, 0)
        } else {
            (-1, 1)
        };
        while j != 0 {
            j += jstep;
            let t = self.blossom_children[b][idx(j)];
            let p = self.blossom_endps[b][idx(j - endptrick as isize)] ^ endptrick;
            if t >= self.n {
                self.augment_blossom(t, self.endpoint[p]);
            }
            j += jstep;
            let t = self.blossom_children[b][idx(j)];
            if t >= self.n {
                self.augment_blossom(t, self.endpoint[p ^ 1]);
            }
            self.mate[self.endpoint[p]] = p ^ 1;
            self.mate[self.endpoint[p ^ 1]] = p;
        }
        self.blossom_children[b].rotate_left(pos);
        self.blossom_endps[b].rotate_left(pos);
        self.blossom_base[b] = self.blossom_base[self.blossom_children[b][0]];
    }

    /// Augments along the path through tight edge `k` between two trees,
    /// flipping matched status from each end back to its root.
    fn augment_matching(&mut self, k: usize) {
        let (v, w, _) = self.edges[k];
        trace!("augmenting through edge {k} = ({v}, {w})");
        for (mut s, mut p) in [(v, 2 * k + 1), (w, 2 * k)] {
            loop {
                let bs = self.in_blossom[s];
                debug_assert_eq!(self.label[bs], OUTER);
                debug_assert_eq!(self.label_end[bs], self.mate[self.blossom_base[bs]]);
                if bs >= self.n {
                    self.augment_blossom(bs, s);
                }
                self.mate[s] = p;
                if self.label_end[bs] == NONE {
                    // Reached an unmatched root.
                    break;
                }
                let t = self.endpoint[self.label_end[bs]];
                let bt = self.in_blossom[t];
                debug_assert_eq!(self.label[bt], INNER);
                debug_assert!(self.label_end[bt] != NONE);
                s = self.endpoint[self.label_end[bt]];
                let j = self.endpoint[self.label_end[bt] ^ 1];
                debug_assert_eq!(self.blossom_base[bt], t);
                if bt >= self.n {
                    self.augment_blossom(bt, j);
                }
                self.mate[j] = self.label_end[bt];
                p = self.label_end[bt] ^ 1;
            }
        }
    }

    /// Runs search stages until no augmenting path remains. Each stage
    /// either augments (two fewer unmatched nodes) or proves quiescence.
    fn run(&mut self) {
        if self.edges.is_empty() {
            return;
        }
        let n = self.n;
        for stage in 0..n {
            self.label.fill(FREE);
            self.best_edge.fill(NONE);
            for b in n..2 * n {
                self.blossom_best_edges[b] = Vec::new();
            }
            self.allowed.fill(false);
            self.queue.clear();
            for v in 0..n {
                if self.mate[v] == NONE && self.label[self.in_blossom[v]] == FREE {
                    self.assign_label(v, OUTER, NONE);
                }
            }
            self.stats.stages = stage + 1;

            let mut augmented = false;
            loop {
                'scan: while let Some(v) = self.queue.pop() {
                    debug_assert_eq!(self.label[self.in_blossom[v]], OUTER);
                    for t in 0..self.neighbors[v].len() {
                        let p = self.neighbors[v][t];
                        let k = p / 2;
                        let w = self.endpoint[p];
                        if self.in_blossom[v] == self.in_blossom[w] {
                            continue;
                        }
                        let mut kslack = 0;
                        if !self.allowed[k] {
                            kslack = self.slack(k);
                            if kslack <= 0 {
                                self.allowed[k] = true;
                            }
                        }
                        if self.allowed[k] {
                            let bw = self.in_blossom[w];
                            if self.label[bw] == FREE {
                                self.assign_label(w, INNER, p ^ 1);
                            } else if self.label[bw] == OUTER {
                                let base = self.scan_blossom(v, w);
                                if base != NONE {
                                    self.add_blossom(base, k);
                                } else {
                                    self.augment_matching(k);
                                    augmented = true;
                                    break 'scan;
                                }
                            } else if self.label[w] == FREE {
                                debug_assert_eq!(self.label[bw], INNER);
                                self.label[w] = INNER;
                                self.label_end[w] = p ^ 1;
                            }
                        } else if self.label[self.in_blossom[w]] == OUTER {
                            let b = self.in_blossom[v];
                            if self.best_edge[b] == NONE || kslack < self.slack(self.best_edge[b])
                            {
                                self.best_edge[b] = k;
                            }
                        } else if self.label[w] == FREE
                            && (self.best_edge[w] == NONE
                                || kslack < self.slack(self.best_edge[w]))
                        {
                            self.best_edge[w] = k;
                        }
                    }
                }
                if augmented {
                    break;
                }

                // Dual update: the largest step that keeps every constraint
                // feasible, classified by which constraint becomes binding.
                self.stats.dual_updates += 1;
                let mut delta_type = 0u8;
                let mut delta = 0i64;
                let mut delta_edge = NONE;
                let mut delta_blossom = NONE;
                for v in 0..n {
                    if self.label[self.in_blossom[v]] == FREE && self.best_edge[v] != NONE {
                        let d = self.slack(self.best_edge[v]);
                        if delta_type == 0 || d < delta {
                            delta = d;
                            delta_type = 2;
                            delta_edge = self.best_edge[v];
                        }
                    }
                }
                for b in 0..2 * n {
                    if self.blossom_parent[b] == NONE
                        && self.label[b] == OUTER
                        && self.best_edge[b] != NONE
                    {
                        let kslack = self.slack(self.best_edge[b]);
                        debug_assert_eq!(kslack % 2, 0);
                        let d = kslack / 2;
                        if delta_type == 0 || d < delta {
                            delta = d;
                            delta_type = 3;
                            delta_edge = self.best_edge[b];
                        }
                    }
                }
                for b in n..2 * n {
                    if self.blossom_base[b] != NONE
                        && self.blossom_parent[b] == NONE
                        && self.label[b] == INNER
                        && (delta_type == 0 || self.dual[b] < delta)
                    {
                        delta = self.dual[b];
                        delta_type = 4;
                        delta_blossom = b;
                    }
                }
                if delta_type == 0 {
                    // No constraint limits the step: the matching already
                    // has maximum cardinality. Close the stage.
                    delta_type = 1;
                    delta = self.dual[..n].iter().copied().min().unwrap_or(0).max(0);
                }

                for v in 0..n {
                    match self.label[self.in_blossom[v]] {
                        OUTER => self.dual[v] -= delta,
                        INNER => self.dual[v] += delta,
                        _ => {}
                    }
                }
                for b in n..2 * n {
                    if self.blossom_base[b] != NONE && self.blossom_parent[b] == NONE {
                        match self.label[b] {
                            OUTER => self.dual[b] += delta,
                            INNER => self.dual[b] -= delta,
                            _ => {}
                        }
                    }
                }
                trace!("dual update: delta={delta} type={delta_type}");

                match delta_type {
                    1 => break,
                    2 => {
                        self.allowed[delta_edge] = true;
                        let (i, j, _) = self.edges[delta_edge];
                        let i = if self.label[self.in_blossom[i]] == FREE {
                            j
                        } else {
                            i
                        };
                        debug_assert_eq!(self.label[self.in_blossom[i]], OUTER);
                        self.queue.push(i);
                    }
                    3 => {
                        self.allowed[delta_edge] = true;
                        let (i, _, _) = self.edges[delta_edge];
                        debug_assert_eq!(self.label[self.in_blossom[i]], OUTER);
                        self.queue.push(i);
                    }
                    _ => self.expand_blossom(delta_blossom, false),
                }
            }

            if !augmented {
                break;
            }

            // Stage cleanup: outer blossoms whose dual fell to zero carry
            // no constraint and are unwound before the next stage.
            for b in n..2 * n {
                if self.blossom_parent[b] == NONE
                    && self.blossom_base[b] != NONE
                    && self.label[b] == OUTER
                    && self.dual[b] == 0
                {
                    self.expand_blossom(b, true);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;

    /// Exhaustive minimum-weight perfect matching; `None` when none exists.
    /// Parallel edges collapse to their cheapest copy, which has the same
    /// optimal total as choosing freely among copies.
    fn brute_force(n: usize, edges: &[(usize, usize, i64)]) -> Option<i64> {
        let mut cheapest: HashMap<(usize, usize), i64> = HashMap::new();
        for &(u, v, w) in edges {
            let key = (u.min(v), u.max(v));
            cheapest
                .entry(key)
                .and_modify(|c| *c = (*c).min(w))
                .or_insert(w);
        }
        fn recurse(
            matched: &mut [bool],
            cheapest: &HashMap<(usize, usize), i64>,
        ) -> Option<i64> {
            let u = match matched.iter().position(|&m| !m) {
                Some(u) => u,
                None => return Some(0),
            };
            matched[u] = true;
            let mut best = None;
            for v in u + 1..matched.len() {
                if matched[v] {
                    continue;
                }
                if let Some(&w) = cheapest.get(&(u, v)) {
                    matched[v] = true;
                    if let Some(rest) = recurse(matched, cheapest) {
                        let total = w + rest;
                        best = Some(best.map_or(total, |b: i64| b.min(total)));
                    }
                    matched[v] = false;
                }
            }
            matched[u] = false;
            best
        }
        recurse(&mut vec![false; n], &cheapest)
    }

    fn solve(n: usize, edges: &[(usize, usize, i64)]) -> Result<Matching, SolveError> {
        let inst = MatchingInstance::new(n, edges.iter().copied()).unwrap();
        solve_matching(&inst, SolveOptions::default())
    }

    fn assert_valid(m: &Matching, n: usize) {
        assert_eq!(m.partners().len(), n);
        for v in 0..n {
            assert_ne!(m.partner(v), v);
            assert_eq!(m.partner(m.partner(v)), v);
        }
    }

    #[test]
    fn empty_graph_has_empty_matching() {
        let m = solve(0, &[]).unwrap();
        assert!(m.partners().is_empty());
        assert_eq!(m.total_weight(), 0);
    }

    #[test]
    fn single_edge() {
        let m = solve(2, &[(0, 1, 7)]).unwrap();
        assert_eq!(m.partners(), &[1, 0]);
        assert_eq!(m.total_weight(), 7);
    }

    #[test]
    fn square_prefers_cheap_pairing() {
        // n = 4 scenario: the 1-weight edges beat the 5-weight pairing.
        let m = solve(4, &[(0, 1, 1), (0, 2, 5), (1, 3, 5), (2, 3, 1)]).unwrap();
        assert_eq!(m.partners(), &[1, 0, 3, 2]);
        assert_eq!(m.total_weight(), 2);
    }

    #[test]
    fn duplicate_edges_keep_the_cheaper_copy_in_the_total() {
        let m = solve(2, &[(0, 1, 5), (0, 1, 2)]).unwrap();
        assert_eq!(m.total_weight(), 2);
    }

    #[test]
    fn negative_weights_are_supported() {
        let m = solve(4, &[(0, 1, -3), (2, 3, -4), (0, 2, 10), (1, 3, 10)]).unwrap();
        assert_eq!(m.total_weight(), -7);
    }

    #[test]
    fn isolated_node_is_infeasible() {
        // Triangle on {0, 1, 2} plus isolated node 3.
        let err = solve(4, &[(0, 1, 1), (1, 2, 1), (0, 2, 1)]).unwrap_err();
        assert_eq!(err, SolveError::InfeasibleMatching);
    }

    #[test]
    fn edgeless_graph_is_infeasible() {
        assert_eq!(solve(2, &[]).unwrap_err(), SolveError::InfeasibleMatching);
    }

    #[test]
    fn odd_cycle_forces_a_blossom() {
        // 5-cycle with a pendant: covering all six nodes requires entering
        // and leaving the odd cycle, which the search only finds through
        // blossom contraction.
        let edges = [
            (0, 1, 8),
            (1, 2, 9),
            (2, 3, 10),
            (3, 4, 7),
            (4, 0, 8),
            (2, 5, 3),
        ];
        let m = solve(6, &edges).unwrap();
        assert_valid(&m, 6);
        assert_eq!(Some(m.total_weight()), brute_force(6, &edges));
        assert!(m.stats().blossoms_formed > 0);
    }

    #[test]
    fn nested_blossoms_match_brute_force() {
        // Adapted nested-blossom stress graphs; totals checked against
        // exhaustive search.
        let cases: &[(usize, &[(usize, usize, i64)])] = &[
            (
                6,
                &[
                    (0, 1, 9),
                    (0, 2, 9),
                    (1, 2, 10),
                    (1, 3, 8),
                    (2, 4, 8),
                    (3, 4, 10),
                    (4, 5, 6),
                    (0, 5, 12),
                ],
            ),
            (
                8,
                &[
                    (0, 1, 8),
                    (0, 2, 8),
                    (1, 2, 10),
                    (1, 3, 12),
                    (2, 4, 12),
                    (3, 4, 14),
                    (3, 5, 12),
                    (4, 6, 12),
                    (5, 6, 14),
                    (6, 7, 12),
                    (0, 7, 11),
                ],
            ),
            (
                10,
                &[
                    (0, 1, 45),
                    (0, 4, 45),
                    (1, 2, 50),
                    (2, 3, 45),
                    (3, 4, 50),
                    (0, 5, 30),
                    (2, 8, 35),
                    (3, 7, 35),
                    (4, 6, 26),
                    (8, 9, 5),
                ],
            ),
        ];
        for &(n, edges) in cases {
            let expected = brute_force(n, edges).expect("test graph must be feasible");
            let m = solve(n, edges).unwrap();
            assert_valid(&m, n);
            assert_eq!(m.total_weight(), expected, "n={n} edges={edges:?}");
        }
    }

    #[test]
    fn flat_output_layout() {
        let m = solve(4, &[(0, 1, 1), (0, 2, 5), (1, 3, 5), (2, 3, 1)]).unwrap();
        assert_eq!(m.to_flat(), vec![1, 0, 3, 2]);
    }

    fn arb_instance() -> impl Strategy<Value = (usize, Vec<(usize, usize, i64)>)> {
        (1usize..=4).prop_flat_map(|half| {
            let n = 2 * half;
            let pairs: Vec<(usize, usize)> = (0..n)
                .flat_map(|u| (u + 1..n).map(move |v| (u, v)))
                .collect();
            let len = pairs.len();
            proptest::collection::vec(proptest::option::of(0i64..50), len).prop_map(
                move |weights| {
                    let edges = pairs
                        .iter()
                        .zip(weights)
                        .filter_map(|(&(u, v), w)| w.map(|w| (u, v, w)))
                        .collect();
                    (n, edges)
                },
            )
        })
    }

    proptest! {
        #[test]
        fn solver_agrees_with_exhaustive_search((n, edges) in arb_instance()) {
            let inst = MatchingInstance::new(n, edges.iter().copied()).unwrap();
            match solve_matching(&inst, SolveOptions::default()) {
                Ok(m) => {
                    prop_assert_eq!(m.partners().len(), n);
                    for v in 0..n {
                        prop_assert_eq!(m.partner(m.partner(v)), v);
                    }
                    let expected = brute_force(n, &edges);
                    prop_assert_eq!(Some(m.total_weight()), expected);
                }
                Err(SolveError::InfeasibleMatching) => {
                    prop_assert!(brute_force(n, &edges).is_none());
                }
                Err(e) => prop_assert!(false, "unexpected error: {e}"),
            }
        }
    }
}
