//! This module contains common testing utilities for testing this library.
#![cfg(test)]
#![allow(dead_code)] // Not every test target uses every helper.

use match_tracer::{compile, Assembler, MatchResult, Vm};

/// A miniature regex-like surface syntax used to exercise the machine the
/// way a real frontend would.
#[derive(Clone, Debug)]
pub enum Pattern {
    /// Matches exactly one input character.
    Lit(char),
    /// Matches the parts in order.
    Seq(Vec<Pattern>),
    /// Matches any one of the branches, preferring earlier ones.
    Alt(Vec<Pattern>),
}

pub fn lit(c: char) -> Pattern {
    Pattern::Lit(c)
}

pub fn seq(parts: impl Into<Vec<Pattern>>) -> Pattern {
    Pattern::Seq(parts.into())
}

pub fn alt(branches: impl Into<Vec<Pattern>>) -> Pattern {
    Pattern::Alt(branches.into())
}

/// Compiles `pattern` into a machine that matches it exactly, recording
/// every character it consumes.
pub fn matcher(pattern: &Pattern) -> Vm<char, String> {
    compile(|asm| {
        emit_matching(asm, pattern);
        asm.accept();
    })
}

fn emit_matching(asm: &mut Assembler<char, String, ()>, pattern: &Pattern) {
    match pattern {
        Pattern::Lit(c) => {
            let expected = *c;
            asm.test(move |item, _| *item == expected);
            asm.record(expected.to_string());
        }
        Pattern::Seq(parts) => {
            for part in parts {
                emit_matching(asm, part);
            }
        }
        Pattern::Alt(branches) => {
            let fork = asm.jump(vec![]);
            let mut exits = Vec::new();
            for branch in branches {
                let start = asm.here();
                asm.push_target(fork, start);
                emit_matching(asm, branch);
                exits.push(asm.jump(vec![]));
            }
            let join = asm.here();
            for exit in exits {
                asm.push_target(exit, join);
            }
        }
    }
}

/// Compiles `pattern` into a completing machine: every literal can either be
/// matched against the input or hypothesised at a badness cost of one, and
/// either way its character is recorded. The record paths of an accepting
/// trace therefore spell out the completed candidates.
pub fn completer(pattern: &Pattern) -> Vm<char, String> {
    compile(|asm| {
        emit_completing(asm, pattern);
        asm.accept();
    })
}

fn emit_completing(asm: &mut Assembler<char, String, ()>, pattern: &Pattern) {
    match pattern {
        Pattern::Lit(c) => {
            let expected = *c;
            let fork = asm.jump(vec![]);

            let matched = asm.here();
            asm.push_target(fork, matched);
            asm.test(move |item, _| *item == expected);
            asm.record(expected.to_string());
            let out = asm.jump(vec![]);

            let hypothesised = asm.here();
            asm.push_target(fork, hypothesised);
            asm.bad(1);
            asm.record(expected.to_string());

            let after = asm.here();
            asm.push_target(out, after);
        }
        Pattern::Seq(parts) => {
            for part in parts {
                emit_completing(asm, part);
            }
        }
        Pattern::Alt(branches) => {
            let fork = asm.jump(vec![]);
            let mut exits = Vec::new();
            for branch in branches {
                let start = asm.here();
                asm.push_target(fork, start);
                emit_completing(asm, branch);
                exits.push(asm.jump(vec![]));
            }
            let join = asm.here();
            for exit in exits {
                asm.push_target(exit, join);
            }
        }
    }
}

/// Compiles an exploring machine for `options*`: before every consumed
/// character and before accepting, the machine explores (at a badness cost)
/// which of the options *could* have gone there, recording explorations as
/// `[c]` and consumed characters bare.
pub fn explorer(options: &[char]) -> Vm<char, String> {
    let options = options.to_vec();
    compile(move |asm| {
        let head = asm.here();
        let explore = asm.jump(vec![]);
        let mut exits = Vec::new();
        for option in &options {
            let start = asm.here();
            asm.push_target(explore, start);
            asm.bad(1);
            asm.record(format!("[{option}]"));
            exits.push(asm.jump(vec![]));
        }

        let dispatch_at = asm.here();
        for exit in exits {
            asm.push_target(exit, dispatch_at);
        }
        let dispatch = asm.jump(vec![]);
        for option in &options {
            let start = asm.here();
            asm.push_target(dispatch, start);
            let expected = *option;
            asm.test(move |item, _| *item == expected);
            asm.record(expected.to_string());
            asm.jump(vec![head]);
        }

        let done = asm.here();
        asm.push_target(dispatch, done);
        asm.accept();
    })
}

/// Flattens the accepting traces of `result` into candidate strings, one
/// per root-to-tip record path, in preference order.
pub fn candidates(result: &MatchResult<String>) -> Vec<String> {
    result
        .accepting_traces
        .iter()
        .flat_map(|trace| trace.record_paths())
        .map(|path| path.concat())
        .collect()
}
