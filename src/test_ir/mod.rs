//! Test CFG (TCF) parser and data structures for exercising the profiler.
//!
//! This module provides a simple control-flow format for writing profiler
//! tests without depending on a full compiler IR. The format is designed to
//! be:
//! - Human-readable and writable
//! - Easy to parse
//! - Sufficient for testing numbering and instrumentation patterns
//!
//! # TCF Format
//!
//! ```text
//! ; Comments start with semicolon
//! func_name() {
//! entry:
//!     %n = input
//!     condbr %n, ^loop, ^done
//! loop:
//!     %i = phi [%n, ^entry], [%next, ^loop]
//!     %next = add %i, 1
//!     condbr %next, ^loop, ^done
//! done:
//!     ret
//! }
//! ```
//!
//! The first block of a function is its entry. Successors are derived from
//! the terminator (`br`, `condbr`, `ret`/`terminate`). Non-terminator lines
//! are kept as opaque instruction text, except `phi`, which is parsed so that
//! edge splitting can rewrite its incoming blocks.

pub mod adaptor;
pub mod exec;
pub mod parser;

pub use adaptor::{BlockRef, FuncRef, TestCfgBuilder};
pub use exec::{execute_function, ExecOutcome};

/// A parsed TCF module.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCfg {
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub blocks: Vec<Block>,
}

/// A basic block. `synthetic` marks splitter blocks inserted by
/// instrumentation, which the executor excludes from the visited-block trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub insts: Vec<Inst>,
    pub synthetic: bool,
}

/// One instruction. Ordinary instructions stay as opaque text; the
/// path-register operations are structural so the executor can interpret the
/// instrumented function.
#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    Text(String),
    Phi {
        result: String,
        incomings: Vec<(String, u32)>,
    },
    PathAlloc,
    PathAdd(u64),
    PathEmit,
    PathReset(u64),
    FlushResults,
    Term(Terminator),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Br { dest: u32 },
    CondBr { cond: String, then_dest: u32, else_dest: u32 },
    Ret,
}

impl TestCfg {
    pub fn parse(text: &str) -> Result<Self, String> {
        parser::parse_cfg(text)
    }
}

impl Function {
    /// The block's terminator, if it has one.
    pub fn terminator(&self, block_idx: u32) -> Option<&Terminator> {
        self.blocks[block_idx as usize]
            .insts
            .iter()
            .rev()
            .find_map(|inst| match inst {
                Inst::Term(t) => Some(t),
                _ => None,
            })
    }

    /// Successor block indices, in terminator order.
    pub fn succs(&self, block_idx: u32) -> Vec<u32> {
        match self.terminator(block_idx) {
            Some(Terminator::Br { dest }) => vec![*dest],
            Some(Terminator::CondBr {
                then_dest,
                else_dest,
                ..
            }) => vec![*then_dest, *else_dest],
            Some(Terminator::Ret) | None => Vec::new(),
        }
    }

    /// Rendered instruction lines of a block, as dumped into artifacts.
    pub fn block_inst_lines(&self, block_idx: u32) -> Vec<String> {
        let mut lines = Vec::new();
        for inst in &self.blocks[block_idx as usize].insts {
            match inst {
                Inst::Text(text) => lines.push(text.clone()),
                Inst::Phi { result, incomings } => {
                    let args: Vec<String> = incomings
                        .iter()
                        .map(|(val, block)| {
                            format!("[%{val}, ^{}]", self.blocks[*block as usize].name)
                        })
                        .collect();
                    lines.push(format!("%{result} = phi {}", args.join(", ")));
                }
                Inst::PathAlloc => {
                    lines.push("%path_register = alloca i64".to_string());
                    lines.push("store 0, %path_register".to_string());
                }
                Inst::PathAdd(n) => lines.push(format!("add %path_register, {n}")),
                Inst::PathEmit => lines.push("call emit_path(%path_register)".to_string()),
                Inst::PathReset(n) => lines.push(format!("store {n}, %path_register")),
                Inst::FlushResults => lines.push("call flush_results()".to_string()),
                Inst::Term(Terminator::Br { dest }) => {
                    lines.push(format!("br ^{}", self.blocks[*dest as usize].name));
                }
                Inst::Term(Terminator::CondBr {
                    cond,
                    then_dest,
                    else_dest,
                }) => lines.push(format!(
                    "condbr %{cond}, ^{}, ^{}",
                    self.blocks[*then_dest as usize].name, self.blocks[*else_dest as usize].name
                )),
                Inst::Term(Terminator::Ret) => lines.push("ret".to_string()),
            }
        }
        lines
    }
}
