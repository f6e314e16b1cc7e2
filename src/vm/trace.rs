//! This module contains the provenance graph that explains how an input was
//! matched.
//!
//! Two representations are in play. During a run the scheduler builds nodes
//! in a [`TraceArena`]: one node per program counter a thread is enqueued
//! at, linked backwards through prefix edges, so unbranched execution
//! produces long chains of single-prefix nodes. When the run finishes, the
//! surviving tips are exported as [`Trace`]s: the chains are collapsed into
//! flat `head`/`records` sequences and only genuine joins (nodes with two or
//! more prefixes) survive as structure. The exported graph is immutable and
//! shared, so traces that converged during the run still share their common
//! history.

use std::{collections::HashMap, fmt::Formatter, rc::Rc};

use itertools::Itertools;

use crate::{
    program::Pc,
    vm::data::{Generation, VisitedGenerations},
};

/// An index identifying a node within a [`TraceArena`].
pub(crate) type TraceId = usize;

/// A single node of the in-flight provenance graph.
#[derive(Clone, Debug)]
pub(crate) struct TraceNode<R> {
    /// The program counter this node was created at.
    pc: Pc,

    /// The values recorded while this node was its thread's tip.
    records: Vec<R>,

    /// The nodes this one continues from. Empty for the root of a run;
    /// longer than one where threads converged.
    prefixes: Vec<TraceId>,

    /// The per-counter generation stamps for the history this node tips.
    visited: VisitedGenerations,
}

/// The arena holding every trace node created during a single run.
///
/// Nodes are only ever appended, and a node's chain prefix always exists
/// before the node itself. Join edges can point forwards in allocation
/// order, but the scheduler's same-generation loop guard ensures a node is
/// never joined into its own descendant, so the graph remains acyclic.
#[derive(Clone, Debug)]
pub(crate) struct TraceArena<R> {
    nodes: Vec<TraceNode<R>>,
}

impl<R> TraceArena<R> {
    /// Constructs an empty arena.
    pub(crate) fn new() -> Self {
        let nodes = Vec::new();
        Self { nodes }
    }

    /// Appends `node` to the arena, returning the id it can be found under.
    fn push(&mut self, node: TraceNode<R>) -> TraceId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    /// Creates the root node for a thread starting at `pc`, with a fresh
    /// visited container sized for `instructions_len` instructions.
    pub(crate) fn root(&mut self, pc: Pc, instructions_len: Pc, generation: Generation) -> TraceId {
        let mut visited = VisitedGenerations::new(instructions_len);
        visited.mark(pc, generation);
        self.push(TraceNode {
            pc,
            records: Vec::new(),
            prefixes: Vec::new(),
            visited,
        })
    }

    /// Creates a node at `pc` continuing from `prefix`, inheriting its
    /// visited stamps and stamping `pc` at `generation`.
    pub(crate) fn extend(&mut self, prefix: TraceId, pc: Pc, generation: Generation) -> TraceId {
        let mut visited = self.nodes[prefix].visited.clone();
        visited.mark(pc, generation);
        self.push(TraceNode {
            pc,
            records: Vec::new(),
            prefixes: vec![prefix],
            visited,
        })
    }

    /// Records an emitted `value` on the node at `id`.
    pub(crate) fn record(&mut self, id: TraceId, value: R) {
        self.nodes[id].records.push(value);
    }

    /// Joins `prefix` into the node at `id` as an alternate history,
    /// max-merging the visited stamps. When `preferred` is set the new
    /// prefix is ranked ahead of the existing ones, which is how a
    /// lower-badness interpretation takes precedence at a merge point.
    ///
    /// Joining a node into itself, or joining a prefix that is already
    /// present, is a no-op.
    pub(crate) fn join(&mut self, id: TraceId, prefix: TraceId, preferred: bool) {
        if id == prefix {
            return;
        }

        // The two nodes are distinct, so splitting the arena around the
        // larger index gives simultaneous access to both.
        let (node, prefix_node) = if id < prefix {
            let (left, right) = self.nodes.split_at_mut(prefix);
            (&mut left[id], &right[0])
        } else {
            let (left, right) = self.nodes.split_at_mut(id);
            (&mut right[0], &left[prefix])
        };

        if !node.prefixes.contains(&prefix) {
            if preferred {
                node.prefixes.insert(0, prefix);
            } else {
                node.prefixes.push(prefix);
            }
        }
        node.visited.merge_max(&prefix_node.visited);
    }

    /// Checks whether the history tipped by `id` visited `pc` in
    /// `generation`.
    pub(crate) fn visited_in(&self, id: TraceId, pc: Pc, generation: Generation) -> bool {
        self.nodes[id].visited.contains_in(pc, generation)
    }
}

impl<R> TraceArena<R>
where
    R: Clone,
{
    /// Exports the history tipped by `id` as a compacted [`Trace`].
    ///
    /// Export and compaction are a single pass: chains of single-prefix
    /// nodes collapse into one exported node, and only roots and joins
    /// survive as graph structure. Nodes reachable through more than one
    /// join are exported once and shared.
    pub(crate) fn export(&self, id: TraceId) -> Rc<Trace<R>> {
        let mut memo = HashMap::new();
        self.export_with(id, &mut memo)
    }

    fn export_with(&self, id: TraceId, memo: &mut HashMap<TraceId, Rc<Trace<R>>>) -> Rc<Trace<R>> {
        if let Some(existing) = memo.get(&id) {
            return existing.clone();
        }

        // Walk backwards while the walked-to node is the only way to have
        // arrived, gathering the chain tip-first.
        let mut chain = vec![id];
        let mut prefixes = &self.nodes[id].prefixes;
        while prefixes.len() == 1 {
            let prefix = prefixes[0];
            chain.push(prefix);
            prefixes = &self.nodes[prefix].prefixes;
        }

        let mut head = Vec::with_capacity(chain.len());
        let mut records = Vec::new();
        for node_id in chain.iter().rev() {
            let node = &self.nodes[*node_id];
            head.push(node.pc);
            records.extend(node.records.iter().cloned());
        }

        let join_prefixes = prefixes.clone();
        let prefixes = join_prefixes
            .into_iter()
            .map(|prefix| self.export_with(prefix, memo))
            .collect();

        let exported = Rc::new(Trace {
            head,
            records,
            prefixes,
        });
        memo.insert(id, exported.clone());
        exported
    }
}

/// A node of the compacted provenance graph returned to the caller.
///
/// Collectively the trace graph is the explanation of how (or why not) the
/// input matched: `head` is the chain of program counters the thread moved
/// through, `records` the values emitted along it, and `prefixes` the
/// alternate histories that converged into this node. A compacted trace has
/// either no prefixes (it is a root) or at least two (it is a genuine join);
/// single-prefix chains only exist transiently during a run.
///
/// Traces are immutable once returned. Alternate interpretations of a
/// matched input are enumerated with [`Trace::record_paths`], and the
/// preferred interpretation follows the first prefix at every join (see
/// [`Trace::preferred_records`]).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Trace<R> {
    /// The program counters visited, chain root first.
    pub head: Vec<Pc>,

    /// The values recorded along `head`, in emission order.
    pub records: Vec<R>,

    /// The histories that converged into this node, preferred first.
    pub prefixes: Vec<Rc<Trace<R>>>,
}

impl<R> Trace<R>
where
    R: Clone,
{
    /// Compacts this trace, collapsing any chains of single-prefix nodes
    /// into their successor.
    ///
    /// Traces returned from an execution are already compacted, so for them
    /// this is an (allocating) no-op. It is provided for consumers that
    /// assemble their own trace graphs.
    #[must_use]
    pub fn compact(&self) -> Rc<Trace<R>> {
        let mut memo = HashMap::new();
        self.compact_with(&mut memo)
    }

    fn compact_with(&self, memo: &mut HashMap<*const Trace<R>, Rc<Trace<R>>>) -> Rc<Trace<R>> {
        let mut head = Vec::new();
        let mut records = Vec::new();

        // Gather the single-prefix chain ending at this node, then flatten
        // it root-first into the accumulators.
        let mut chain: Vec<&Trace<R>> = vec![self];
        let mut prefixes = &self.prefixes;
        while prefixes.len() == 1 {
            let prefix = prefixes[0].as_ref();
            chain.push(prefix);
            prefixes = &prefix.prefixes;
        }
        for node in chain.iter().rev() {
            head.extend(node.head.iter().copied());
            records.extend(node.records.iter().cloned());
        }

        let prefixes = prefixes
            .iter()
            .map(|prefix| {
                let key = Rc::as_ptr(prefix);
                if let Some(existing) = memo.get(&key) {
                    existing.clone()
                } else {
                    let compacted = prefix.compact_with(memo);
                    memo.insert(key, compacted.clone());
                    compacted
                }
            })
            .collect();

        Rc::new(Trace {
            head,
            records,
            prefixes,
        })
    }

    /// Enumerates the recorded values along every root-to-tip path through
    /// this trace, in preference order.
    ///
    /// Paths vary the earliest join fastest: the records of the first
    /// prefix's first path come first, and the tip's own records close every
    /// path. For completion-style programs this is the list of candidate
    /// completions, best-ranked first within each join.
    ///
    /// The number of paths is the product of the prefix counts over all
    /// joins, so this is only suitable for the shallow graphs that matching
    /// runs produce.
    #[must_use]
    pub fn record_paths(&self) -> Vec<Vec<R>> {
        if self.prefixes.is_empty() {
            return vec![self.records.clone()];
        }

        let mut paths = Vec::new();
        for prefix in &self.prefixes {
            for mut path in prefix.record_paths() {
                path.extend(self.records.iter().cloned());
                paths.push(path);
            }
        }
        paths
    }

    /// Enumerates the program counters along every root-to-tip path through
    /// this trace, in the same order as [`Trace::record_paths`].
    #[must_use]
    pub fn head_paths(&self) -> Vec<Vec<Pc>> {
        if self.prefixes.is_empty() {
            return vec![self.head.clone()];
        }

        let mut paths = Vec::new();
        for prefix in &self.prefixes {
            for mut path in prefix.head_paths() {
                path.extend(self.head.iter().copied());
                paths.push(path);
            }
        }
        paths
    }

    /// Gets the recorded values along the preferred path: the one that
    /// follows the first prefix at every join.
    #[must_use]
    pub fn preferred_records(&self) -> Vec<R> {
        let mut records = match self.prefixes.first() {
            Some(prefix) => prefix.preferred_records(),
            None => Vec::new(),
        };
        records.extend(self.records.iter().cloned());
        records
    }
}

/// Displays the tip chain of the trace along with a summary of its
/// structure.
impl<R> std::fmt::Display for Trace<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "trace [{}] with {} records and {} prefixes",
            self.head.iter().join(" -> "),
            self.records.len(),
            self.prefixes.len()
        )
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::vm::trace::{Trace, TraceArena};

    #[test]
    fn collapses_chains_on_export() {
        let mut arena: TraceArena<&str> = TraceArena::new();
        let root = arena.root(0, 4, 0);
        let mid = arena.extend(root, 1, 0);
        arena.record(mid, "one");
        let tip = arena.extend(mid, 2, 0);
        arena.record(tip, "two");

        let trace = arena.export(tip);

        assert_eq!(trace.head, vec![0, 1, 2]);
        assert_eq!(trace.records, vec!["one", "two"]);
        assert!(trace.prefixes.is_empty());
    }

    #[test]
    fn keeps_joins_as_structure() {
        let mut arena: TraceArena<&str> = TraceArena::new();
        let root = arena.root(0, 8, 0);
        let left = arena.extend(root, 1, 0);
        arena.record(left, "left");
        let right = arena.extend(root, 2, 0);
        arena.record(right, "right");
        let merged = arena.extend(left, 3, 0);
        arena.join(merged, right, false);
        let tip = arena.extend(merged, 4, 0);

        let trace = arena.export(tip);

        // The chain below the join is flattened into the tip...
        assert_eq!(trace.head, vec![3, 4]);
        assert_eq!(trace.prefixes.len(), 2);

        // ...and the diverged histories duplicate their shared root.
        assert_eq!(trace.prefixes[0].head, vec![0, 1]);
        assert_eq!(trace.prefixes[0].records, vec!["left"]);
        assert_eq!(trace.prefixes[1].head, vec![0, 2]);
        assert_eq!(trace.prefixes[1].records, vec!["right"]);
    }

    #[test]
    fn preferred_joins_rank_first() {
        let mut arena: TraceArena<&str> = TraceArena::new();
        let root = arena.root(0, 8, 0);
        let costly = arena.extend(root, 1, 0);
        arena.record(costly, "costly");
        let cheap = arena.extend(root, 2, 0);
        arena.record(cheap, "cheap");
        let merged = arena.extend(costly, 3, 0);
        arena.join(merged, cheap, true);

        let trace = arena.export(merged);

        assert_eq!(trace.prefixes[0].records, vec!["cheap"]);
        assert_eq!(trace.prefixes[1].records, vec!["costly"]);
        assert_eq!(trace.preferred_records(), vec!["cheap"]);
    }

    #[test]
    fn joining_twice_adds_one_prefix() {
        let mut arena: TraceArena<&str> = TraceArena::new();
        let root = arena.root(0, 4, 0);
        let other = arena.extend(root, 1, 0);
        let merged = arena.extend(root, 2, 0);
        arena.join(merged, other, false);
        arena.join(merged, other, false);

        let trace = arena.export(merged);
        assert_eq!(trace.prefixes.len(), 2);
    }

    #[test]
    fn enumerates_paths_with_the_earliest_join_varying_fastest() {
        let mut arena: TraceArena<&str> = TraceArena::new();
        let root = arena.root(0, 16, 0);

        // First join: "a" vs "b".
        let a = arena.extend(root, 1, 0);
        arena.record(a, "a");
        let b = arena.extend(root, 2, 0);
        arena.record(b, "b");
        let first = arena.extend(a, 3, 0);
        arena.join(first, b, false);

        // Second join: "c" vs "d".
        let c = arena.extend(first, 4, 0);
        arena.record(c, "c");
        let d = arena.extend(first, 5, 0);
        arena.record(d, "d");
        let second = arena.extend(c, 6, 0);
        arena.join(second, d, false);

        let trace = arena.export(second);
        let paths = trace.record_paths();

        assert_eq!(
            paths,
            vec![
                vec!["a", "c"],
                vec!["b", "c"],
                vec!["a", "d"],
                vec!["b", "d"],
            ]
        );
    }

    #[test]
    fn compaction_is_idempotent_on_exported_traces() {
        let mut arena: TraceArena<&str> = TraceArena::new();
        let root = arena.root(0, 8, 0);
        let left = arena.extend(root, 1, 0);
        let right = arena.extend(root, 2, 0);
        let merged = arena.extend(left, 3, 0);
        arena.join(merged, right, false);

        let trace = arena.export(merged);
        let compacted = trace.compact();

        assert_eq!(compacted.as_ref(), trace.as_ref());
    }

    #[test]
    fn compacts_hand_built_chains() {
        let root = Rc::new(Trace {
            head: vec![0],
            records: vec!["r"],
            prefixes: vec![],
        });
        let mid = Rc::new(Trace {
            head: vec![1],
            records: vec!["m"],
            prefixes: vec![root],
        });
        let tip = Trace {
            head: vec![2],
            records: vec!["t"],
            prefixes: vec![mid],
        };

        let compacted = tip.compact();

        assert_eq!(compacted.head, vec![0, 1, 2]);
        assert_eq!(compacted.records, vec!["r", "m", "t"]);
        assert!(compacted.prefixes.is_empty());
    }

    #[test]
    fn shares_histories_reachable_through_multiple_joins() {
        let mut arena: TraceArena<&str> = TraceArena::new();
        let root = arena.root(0, 16, 0);
        let shared_a = arena.extend(root, 1, 0);
        let shared_b = arena.extend(root, 2, 0);
        let shared = arena.extend(shared_a, 3, 0);
        arena.join(shared, shared_b, false);

        let left = arena.extend(shared, 4, 0);
        let right = arena.extend(shared, 5, 0);
        let tip = arena.extend(left, 6, 0);
        arena.join(tip, right, false);

        let trace = arena.export(tip);

        // Both converging branches flattened the shared join into their
        // chains, and those chains end at the same shared structure.
        assert_eq!(trace.prefixes.len(), 2);
        assert_eq!(trace.prefixes[0].prefixes.len(), 2);
        assert!(Rc::ptr_eq(
            &trace.prefixes[0].prefixes[0],
            &trace.prefixes[1].prefixes[0]
        ));
    }
}
