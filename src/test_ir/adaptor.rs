//! Test CFG adaptor and edit-sink implementation.
//!
//! `TestCfgBuilder` lets the profiling pass run end-to-end against TCF input:
//! it implements [`CfgAdaptor`] for CFG discovery and [`EditSink`] by really
//! splitting edges, retargeting terminators and rewriting phi incomings, so
//! tests can execute the instrumented function afterwards.

use super::{Block, Function, Inst, Terminator, TestCfg};
use crate::core::CfgAdaptor;
use crate::instrument::EditSink;

/// Type aliases for TCF references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncRef(pub u32);

/// Adaptor that implements both sides of the pass interface for [`TestCfg`].
pub struct TestCfgBuilder {
    cfg: TestCfg,
    cur_func: u32,
}

impl TestCfgBuilder {
    pub fn new(cfg: TestCfg) -> Self {
        Self { cfg, cur_func: 0 }
    }

    pub fn cfg(&self) -> &TestCfg {
        &self.cfg
    }

    pub fn into_cfg(self) -> TestCfg {
        self.cfg
    }

    fn cur(&self) -> &Function {
        &self.cfg.functions[self.cur_func as usize]
    }

    fn cur_mut(&mut self) -> &mut Function {
        &mut self.cfg.functions[self.cur_func as usize]
    }

    /// Append a splitter block ending in a branch to `dest`.
    fn push_splitter(&mut self, name: &str, mut insts: Vec<Inst>, dest: u32) -> u32 {
        insts.push(Inst::Term(Terminator::Br { dest }));
        let func = self.cur_mut();
        func.blocks.push(Block {
            name: name.to_string(),
            insts,
            synthetic: true,
        });
        (func.blocks.len() - 1) as u32
    }

    /// Retarget every successor slot of `src` that points at `old` to `new`.
    fn retarget(&mut self, src: u32, old: u32, new: u32) {
        let func = self.cur_mut();
        for inst in &mut func.blocks[src as usize].insts {
            if let Inst::Term(term) = inst {
                match term {
                    Terminator::Br { dest } if *dest == old => *dest = new,
                    Terminator::CondBr {
                        then_dest,
                        else_dest,
                        ..
                    } => {
                        if *then_dest == old {
                            *then_dest = new;
                        }
                        if *else_dest == old {
                            *else_dest = new;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Rewrite phi incomings in `dest` that name `old_pred` to `new_pred`,
    /// keeping the incoming value.
    fn rewrite_phis(&mut self, dest: u32, old_pred: u32, new_pred: u32) {
        let func = self.cur_mut();
        for inst in &mut func.blocks[dest as usize].insts {
            if let Inst::Phi { incomings, .. } = inst {
                for (_, block) in incomings.iter_mut() {
                    if *block == old_pred {
                        *block = new_pred;
                    }
                }
            }
        }
    }

    /// Insert `inst` immediately before the block's terminator.
    fn insert_before_terminator(&mut self, block: u32, inst: Inst) {
        let insts = &mut self.cur_mut().blocks[block as usize].insts;
        let at = insts
            .iter()
            .position(|i| matches!(i, Inst::Term(_)))
            .unwrap_or(insts.len());
        insts.insert(at, inst);
    }
}

impl CfgAdaptor for TestCfgBuilder {
    type BlockRef = BlockRef;
    type FuncRef = FuncRef;

    const INVALID_BLOCK_REF: Self::BlockRef = BlockRef(!0);
    const INVALID_FUNC_REF: Self::FuncRef = FuncRef(!0);

    fn func_count(&self) -> u32 {
        self.cfg.functions.len() as u32
    }

    fn funcs(&self) -> Box<dyn Iterator<Item = Self::FuncRef> + '_> {
        Box::new((0..self.cfg.functions.len()).map(|i| FuncRef(i as u32)))
    }

    fn func_name(&self, func: Self::FuncRef) -> &str {
        &self.cfg.functions[func.0 as usize].name
    }

    fn switch_func(&mut self, func: Self::FuncRef) -> bool {
        if func.0 as usize >= self.cfg.functions.len() {
            return false;
        }
        self.cur_func = func.0;
        true
    }

    fn reset(&mut self) {
        self.cur_func = 0;
    }

    fn entry_block(&self) -> Self::BlockRef {
        // The first block of a function is its entry.
        BlockRef(0)
    }

    fn blocks(&self) -> Box<dyn Iterator<Item = Self::BlockRef> + '_> {
        Box::new((0..self.cur().blocks.len()).map(|i| BlockRef(i as u32)))
    }

    fn block_succs(&self, block: Self::BlockRef) -> Box<dyn Iterator<Item = Self::BlockRef> + '_> {
        Box::new(self.cur().succs(block.0).into_iter().map(BlockRef))
    }

    fn block_inst_lines(&self, block: Self::BlockRef) -> Vec<String> {
        self.cur().block_inst_lines(block.0)
    }
}

impl EditSink for TestCfgBuilder {
    type BlockRef = BlockRef;

    fn alloc_path_register(&mut self) {
        self.cur_mut().blocks[0].insts.insert(0, Inst::PathAlloc);
    }

    fn split_edge(&mut self, src: Self::BlockRef, dest: Self::BlockRef, inc: u64) {
        let new = self.push_splitter("increment", vec![Inst::PathAdd(inc)], dest.0);
        self.retarget(src.0, dest.0, new);
        self.rewrite_phis(dest.0, src.0, new);
    }

    fn split_back_edge(&mut self, src: Self::BlockRef, dest: Self::BlockRef, inc: u64, reset: u64) {
        let new = self.push_splitter(
            "increment_reset",
            vec![Inst::PathAdd(inc), Inst::PathEmit, Inst::PathReset(reset)],
            dest.0,
        );
        self.retarget(src.0, dest.0, new);
        self.rewrite_phis(dest.0, src.0, new);
    }

    fn emit_path_at_exit(&mut self, exit: Self::BlockRef) {
        self.insert_before_terminator(exit.0, Inst::PathEmit);
    }

    fn flush_at_exit(&mut self, exit: Self::BlockRef) {
        self.insert_before_terminator(exit.0, Inst::FlushResults);
    }
}
