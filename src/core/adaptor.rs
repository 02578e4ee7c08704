// This module defines the CfgAdaptor trait, which serves as the bridge between the
// profiling pass and the host compiler's IR. The trait provides a minimal interface
// for the encoder to query control-flow structure: functions, blocks and successor
// edges, plus the rendered instruction text needed for the artifact dump. It defines
// associated reference types for blocks and functions, methods to enumerate and
// switch between functions and to walk a function's blocks in discovery order. The
// design assumes single-entry functions whose blocks end in terminators. This
// abstraction keeps the numbering and instrumentation logic independent of any
// concrete IR; the host binding implements the trait over its own block handles.

/// Bridge between a host IR and the profiling pass.
///
/// The [`CfgAdaptor`] trait provides the hooks the encoder needs to discover a
/// function's control-flow graph. The adaptor is responsible for enumerating
/// functions and blocks, walking successor edges in a deterministic order and
/// rendering block bodies for the artifact dump. Block discovery order defines
/// the dense node indices used throughout the pass, so `blocks` must yield a
/// stable order for a given function.
pub trait CfgAdaptor {
    type BlockRef: Copy + Eq + core::hash::Hash;
    type FuncRef: Copy + Eq;

    const INVALID_BLOCK_REF: Self::BlockRef;
    const INVALID_FUNC_REF: Self::FuncRef;

    /// Number of functions contained in the module.
    fn func_count(&self) -> u32;

    /// Iterator over all functions in the module.
    fn funcs(&self) -> Box<dyn Iterator<Item = Self::FuncRef> + '_>;

    /// Linkage name of the function.
    fn func_name(&self, func: Self::FuncRef) -> &str;

    /// Switch to the given function before encoding. Returns `false` for
    /// functions the pass should skip (declarations without a body).
    fn switch_func(&mut self, func: Self::FuncRef) -> bool;

    /// Reset internal state between pass runs.
    fn reset(&mut self);

    /// Entry block of the currently selected function.
    fn entry_block(&self) -> Self::BlockRef;

    /// Iterator over blocks of the current function, in discovery order.
    fn blocks(&self) -> Box<dyn Iterator<Item = Self::BlockRef> + '_>;

    /// Successor blocks of a given block, in terminator order.
    fn block_succs(&self, block: Self::BlockRef) -> Box<dyn Iterator<Item = Self::BlockRef> + '_>;

    /// Rendered instruction lines of a block, for the artifact dump.
    fn block_inst_lines(&self, block: Self::BlockRef) -> Vec<String>;
}
