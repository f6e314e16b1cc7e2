//! This module contains the scheduler, the engine that drives every live
//! thread through the program one input item at a time.

use std::collections::HashSet;

use crate::{
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    program::{Instruction, Pc, Program},
    vm::{
        thread::{Thread, ThreadList},
        trace::{TraceArena, TraceId},
        Config, MatchResult,
    },
    watchdog::DynWatchdog,
};

/// The transient state of a single execution.
///
/// Two thread lists are in play at any moment: the *current* generation,
/// being drained in FIFO order, and the *next* generation, seeded by the
/// threads whose [`Instruction::Test`] consumed the current input item.
/// Zero-input instructions re-enqueue their continuations into the current
/// generation, so the drain computes a full epsilon closure before the next
/// item is considered.
pub(crate) struct Scheduler<'a, T, R, C> {
    /// The program being executed.
    program: &'a Program<T, R, C>,

    /// The length of the program, cached for bounds checks.
    instructions_len: Pc,

    /// The configuration of the run.
    config: &'a Config,

    /// The watchdog polled to decide whether to abandon the run.
    watchdog: &'a DynWatchdog,

    /// The options value threaded through every callback.
    options: &'a C,

    /// The provenance graph under construction.
    arena: TraceArena<R>,

    /// Threads that reached [`Instruction::Accept`] in the generation being
    /// drained. Cleared whenever the generation advances with input still
    /// remaining, as such acceptances matched only a prefix of the input.
    accepted: Vec<Thread>,

    /// Threads that could not proceed, in the order they failed.
    failing: Vec<Thread>,

    /// Test instructions already executed this generation. A failure at an
    /// already-executed test is redundant: the outcome for that counter is
    /// accounted for by the earlier thread, whichever way it went.
    tested: HashSet<Pc>,

    /// The number of thread-steps taken, for watchdog polling.
    steps: usize,
}

impl<'a, T, R, C> Scheduler<'a, T, R, C>
where
    R: Clone,
{
    /// Constructs a scheduler for one execution of `program`.
    pub(crate) fn new(
        program: &'a Program<T, R, C>,
        config: &'a Config,
        watchdog: &'a DynWatchdog,
        options: &'a C,
    ) -> Self {
        Self {
            program,
            instructions_len: program.len(),
            config,
            watchdog,
            options,
            arena: TraceArena::new(),
            accepted: Vec::new(),
            failing: Vec::new(),
            tested: HashSet::new(),
            steps: 0,
        }
    }

    /// Runs the program over the items produced by `input` until the input
    /// is exhausted or no thread remains.
    ///
    /// The input adapter is called exactly once per generation advance; a
    /// [`None`] return marks the final generation, in which tests can no
    /// longer be satisfied and acceptances are terminal.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the watchdog stops the run. Match failure is not
    /// an error; it is reported through the returned [`MatchResult`].
    pub(crate) fn run(mut self, mut input: impl FnMut() -> Option<T>) -> Result<MatchResult<R>> {
        let program = self.program;
        let poll_interval = self.watchdog.poll_every().max(1);

        let mut current = ThreadList::new(0);
        if !program.is_empty() {
            let root = self.arena.root(0, self.instructions_len, 0);
            current.push(Thread {
                pc: 0,
                badness: 0,
                trace: root,
            });
        }

        loop {
            if current.is_empty() {
                break;
            }

            let item = input();
            let final_generation = item.is_none();
            let mut next = ThreadList::new(current.generation() + 1);
            self.tested.clear();

            while let Some(thread) = current.pop() {
                if self.steps % poll_interval == 0 && self.watchdog.should_stop() {
                    return Err(Error::StoppedByWatchdog).locate(thread.pc);
                }
                self.steps += 1;

                // Enqueueing is bounds-checked, so the lookup cannot miss;
                // being defensive here costs nothing.
                let Some(instruction) = program.instruction(thread.pc) else {
                    continue;
                };

                match instruction {
                    Instruction::Test(func) => {
                        let first_at_counter = self.tested.insert(thread.pc);
                        let survives = match &item {
                            Some(item) => func(item, self.options),
                            None => false,
                        };
                        if survives {
                            self.enqueue(&mut next, thread.pc + 1, thread.badness, thread.trace);
                        } else if first_at_counter {
                            self.fail(thread);
                        }
                    }
                    Instruction::Jump(targets) => {
                        for target in targets {
                            self.enqueue(&mut current, *target, thread.badness, thread.trace);
                        }
                    }
                    Instruction::Record { data, func } => {
                        let value = match func {
                            Some(func) => {
                                func(data, current.generation() as usize, self.options)
                            }
                            None => Some(data.clone()),
                        };
                        if let Some(value) = value {
                            self.arena.record(thread.trace, value);
                        }
                        self.enqueue(&mut current, thread.pc + 1, thread.badness, thread.trace);
                    }
                    Instruction::Bad { cost, func } => {
                        let applies = func.as_ref().map_or(true, |func| func(self.options));
                        let badness = if applies {
                            thread.badness.saturating_add(*cost)
                        } else {
                            thread.badness
                        };
                        if badness > self.config.badness_limit {
                            self.fail(thread);
                        } else {
                            self.enqueue(&mut current, thread.pc + 1, badness, thread.trace);
                        }
                    }
                    Instruction::Accept => {
                        self.accepted.push(thread);
                    }
                }
            }

            if final_generation {
                break;
            }

            // Any acceptance so far matched a strict prefix of the input,
            // which is not a match.
            self.accepted.clear();

            if next.is_empty() {
                break;
            }
            current = next;
        }

        Ok(self.into_result())
    }

    /// Enqueues a continuation of `parent` at `pc` into `list`, applying the
    /// checks that keep the trace graph finite and acyclic.
    ///
    /// In order: a counter outside the program drops the thread silently; a
    /// counter the parent history already visited in the destination
    /// generation drops it as a same-step loop; a counter with a pending
    /// entry merges into that entry, ranking the incoming history first when
    /// it is strictly less bad; and otherwise a fresh node and thread are
    /// created.
    ///
    /// The loop check runs before the merge check. A history that has
    /// visited the target counter this generation descends from the very
    /// node it would merge into, and joining it there would make the graph
    /// cyclic.
    fn enqueue(&mut self, list: &mut ThreadList, pc: Pc, badness: usize, parent: TraceId) {
        if pc >= self.instructions_len {
            return;
        }
        let generation = list.generation();
        if self.arena.visited_in(parent, pc, generation) {
            return;
        }
        if let Some(existing) = list.pending_at(pc) {
            let preferred = badness < existing.badness;
            self.arena.join(existing.trace, parent, preferred);
            if preferred {
                list.lower_badness(pc, badness);
            }
            return;
        }

        let trace = self.arena.extend(parent, pc, generation);
        list.push(Thread { pc, badness, trace });
    }

    /// Retires `thread` as a failing trace, subject to configuration.
    fn fail(&mut self, thread: Thread) {
        if self.config.record_failing {
            self.failing.push(thread);
        }
    }

    /// Exports the accepting and failing threads into the final result.
    fn into_result(self) -> MatchResult<R> {
        let accepting_traces: Vec<_> = self
            .accepted
            .iter()
            .map(|thread| self.arena.export(thread.trace))
            .collect();
        let failing_traces = self
            .failing
            .iter()
            .map(|thread| self.arena.export(thread.trace))
            .collect();

        MatchResult {
            success: !accepting_traces.is_empty(),
            accepting_traces,
            failing_traces,
        }
    }
}
