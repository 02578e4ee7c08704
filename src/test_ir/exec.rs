//! Straight-line interpreter for TCF functions.
//!
//! Used by tests to run a function before and after instrumentation: it walks
//! blocks from the entry, resolves `condbr` decisions from a scripted list of
//! branch choices, interprets the structural path-register instructions and
//! records every `emit_path` value. Splitter blocks are excluded from the
//! visited trace so instrumented and uninstrumented runs can be compared
//! block-for-block.

use super::{Function, Inst, Terminator};

const MAX_STEPS: usize = 10_000;

/// What one execution of a function did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExecOutcome {
    /// Path-register values passed to `emit_path`, in call order.
    pub emits: Vec<u64>,
    /// Non-synthetic blocks visited, in order.
    pub visited: Vec<u32>,
    /// Whether `flush_results` was reached.
    pub flushed: bool,
}

/// Execute `func` from its entry block, taking the `then` target of the n-th
/// `condbr` iff `branch_script[n]` is true.
pub fn execute_function(func: &Function, branch_script: &[bool]) -> Result<ExecOutcome, String> {
    let mut outcome = ExecOutcome::default();
    let mut register: u64 = 0;
    let mut script = branch_script.iter().copied();
    let mut curr: u32 = 0;

    for _ in 0..MAX_STEPS {
        let block = &func.blocks[curr as usize];
        if !block.synthetic {
            outcome.visited.push(curr);
        }
        let mut next = None;
        for inst in &block.insts {
            match inst {
                Inst::PathAlloc => register = 0,
                Inst::PathAdd(n) => register += n,
                Inst::PathEmit => outcome.emits.push(register),
                Inst::PathReset(n) => register = *n,
                Inst::FlushResults => outcome.flushed = true,
                Inst::Text(_) | Inst::Phi { .. } => {}
                Inst::Term(Terminator::Br { dest }) => next = Some(*dest),
                Inst::Term(Terminator::CondBr {
                    then_dest,
                    else_dest,
                    ..
                }) => {
                    let taken = script
                        .next()
                        .ok_or_else(|| "branch script exhausted".to_string())?;
                    next = Some(if taken { *then_dest } else { *else_dest });
                }
                Inst::Term(Terminator::Ret) => return Ok(outcome),
            }
        }
        curr = next.ok_or_else(|| format!("block b{curr} has no terminator"))?;
    }
    Err("execution exceeded the step limit".to_string())
}
