//! This module contains miscellaneous small data-types that are used
//! throughout the virtual machine.

use crate::program::Pc;

/// The number of input items consumed by a thread of execution so far. Used
/// to stamp visited program counters so that revisits can be classified as
/// same-step loops or as legitimate progress.
pub type Generation = u32;

/// A container that tracks, per program counter, the most recent generation
/// in which a trace visited that instruction.
///
/// This is what bounds pure-epsilon cycles: a thread that would re-enter a
/// program counter it has already visited in the current generation is
/// making no progress and is dropped by the scheduler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VisitedGenerations {
    /// One stamp per instruction. A value of zero means "never visited";
    /// generation `g` is stored as `g + 1`.
    data: Vec<u32>,
}

impl VisitedGenerations {
    /// Constructs a new container for up to `instructions_len` instructions,
    /// with nothing marked as visited.
    #[must_use]
    pub fn new(instructions_len: Pc) -> Self {
        let data = vec![0; instructions_len as usize];
        Self { data }
    }

    /// Marks the instruction at `pc` as visited in `generation`.
    ///
    /// A `pc` that is out of bounds for the instruction sequence is ignored;
    /// the scheduler bounds-checks before creating work, so such a call
    /// never corresponds to a live thread.
    pub fn mark(&mut self, pc: Pc, generation: Generation) {
        if let Some(slot) = self.data.get_mut(pc as usize) {
            *slot = generation + 1;
        }
    }

    /// Checks if the instruction at `pc` has been visited in any generation.
    #[must_use]
    pub fn contains(&self, pc: Pc) -> bool {
        self.data.get(pc as usize).is_some_and(|slot| *slot != 0)
    }

    /// Checks if the instruction at `pc` was last visited in exactly
    /// `generation`.
    #[must_use]
    pub fn contains_in(&self, pc: Pc, generation: Generation) -> bool {
        self.data
            .get(pc as usize)
            .is_some_and(|slot| *slot == generation + 1)
    }

    /// Merges `other` into this container by taking the per-counter maximum
    /// of the two generation stamps.
    ///
    /// This is the visited-set half of a trace join: after two histories
    /// converge, the combined trace counts an instruction as visited in the
    /// latest generation either history reached it in.
    pub fn merge_max(&mut self, other: &Self) {
        for (slot, incoming) in self.data.iter_mut().zip(&other.data) {
            *slot = (*slot).max(*incoming);
        }
    }
}

#[cfg(test)]
mod test {
    use crate::vm::data::VisitedGenerations;

    #[test]
    fn can_mark_instructions_as_visited() {
        let mut visited = VisitedGenerations::new(20);
        visited.mark(17, 3);

        assert!(visited.contains(17));
        assert!(visited.contains_in(17, 3));
        assert!(!visited.contains_in(17, 2));
        assert!(!visited.contains(16));
    }

    #[test]
    fn remembers_only_the_latest_generation() {
        let mut visited = VisitedGenerations::new(4);
        visited.mark(2, 0);
        visited.mark(2, 5);

        assert!(visited.contains_in(2, 5));
        assert!(!visited.contains_in(2, 0));
    }

    #[test]
    fn ignores_out_of_bounds_marks() {
        let mut visited = VisitedGenerations::new(4);
        visited.mark(1000, 1);

        assert!(!visited.contains(1000));
        assert!(!visited.contains_in(1000, 1));
    }

    #[test]
    fn merges_by_taking_the_maximum_stamp() {
        let mut ours = VisitedGenerations::new(3);
        ours.mark(0, 4);
        ours.mark(1, 1);

        let mut theirs = VisitedGenerations::new(3);
        theirs.mark(1, 2);
        theirs.mark(2, 0);

        ours.merge_max(&theirs);

        assert!(ours.contains_in(0, 4));
        assert!(ours.contains_in(1, 2));
        assert!(ours.contains_in(2, 0));
    }
}
