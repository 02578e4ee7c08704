//! Instrumentation synthesis.
//!
//! Walks the annotated DAG produced by [`Graph::build`] and issues the edits
//! that make the compiled function report its executed paths: a per-function
//! path register, splitter blocks on counted edges, emit-and-reset handlers on
//! back-edges, and the exit-time emission. The edits are expressed against the
//! [`EditSink`] trait so the numbering logic stays independent of the host IR;
//! the host binding performs the actual block creation, terminator retargeting
//! and load/store/add/call insertion.

use crate::core::Graph;

/// Abstract IR builder the encoder issues its edits to.
///
/// Implementations must perform the structural edits on the underlying IR:
///
/// - `split_edge(src, dest, inc)` inserts a block `B` between `src` and
///   `dest`: retarget `src`'s terminator from `dest` to `B`, make `B` add
///   `inc` to the path register (load, add, store) and branch to `dest`.
///   Any value-merging metadata in `dest` that names `src` as a predecessor
///   must be rewritten to name `B`, keeping the incoming value.
/// - `split_back_edge` does the same but the inserted block additionally
///   calls `emit_path(function, path_register)` after the add and then stores
///   `reset` into the register.
/// - `emit_path_at_exit` loads the register and calls `emit_path` immediately
///   before the exit block's terminator.
/// - `flush_at_exit` calls `flush_results()` before the exit terminator; it is
///   only issued for the program entry function, after `emit_path_at_exit`.
pub trait EditSink {
    type BlockRef: Copy + Eq;

    /// Allocate the 64-bit `path_register` at the start of the entry block
    /// and initialize it to zero.
    fn alloc_path_register(&mut self);

    fn split_edge(&mut self, src: Self::BlockRef, dest: Self::BlockRef, inc: u64);

    fn split_back_edge(&mut self, src: Self::BlockRef, dest: Self::BlockRef, inc: u64, reset: u64);

    fn emit_path_at_exit(&mut self, exit: Self::BlockRef);

    fn flush_at_exit(&mut self, exit: Self::BlockRef);
}

/// Issue the instrumentation edits for one function.
///
/// Ordinary DAG edges are split only when they carry a non-zero increment;
/// synthetic stand-ins are skipped there because the corresponding real edge
/// is handled by its back-edge record. Back-edges are issued after all
/// ordinary splits: their retargeting assumes the loop tail's terminator
/// still points at the original header.
pub fn instrument_function<S: EditSink>(
    graph: &Graph<S::BlockRef>,
    sink: &mut S,
    is_entry_function: bool,
) {
    sink.alloc_path_register();

    for node in graph.nodes() {
        for to in &node.tos {
            if to.inc > 0 && to.back_edge.is_none() {
                let dest = graph.nodes()[to.dest as usize].block;
                sink.split_edge(node.block, dest, to.inc);
            }
        }
    }

    for be in graph.back_edges() {
        let src = graph.nodes()[be.src as usize].block;
        let dest = graph.nodes()[be.dest as usize].block;
        sink.split_back_edge(src, dest, be.inc, be.reset);
    }

    let exit = graph.nodes()[graph.exit() as usize].block;
    sink.emit_path_at_exit(exit);
    if is_entry_function {
        sink.flush_at_exit(exit);
    }
}
