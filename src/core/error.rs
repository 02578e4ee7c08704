//! Error types for the path profiler.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Errors raised while building the path-numbering graph from a CFG.
///
/// Any of these means the function's CFG violates the encoder's invariants;
/// the pass reports the error and leaves the function uninstrumented.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("block b{block} has no predecessors but is not the designated entry")]
    MultipleEntries { block: u32 },

    #[error("no exit block found (every block has successors)")]
    NoExit,

    #[error("the designated entry block is not part of the function")]
    EntryNotFound,
}

/// Errors raised while reading a `<function>.txt` artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("line {line}: expected `{expected}`")]
    MissingField { line: usize, expected: &'static str },

    #[error("line {line}: malformed edge record `{text}`")]
    BadEdge { line: usize, text: String },

    #[error("line {line}: invalid number in `{text}`")]
    BadNumber { line: usize, text: String },

    #[error("artifact ended before the `{section}` section")]
    Truncated { section: &'static str },

    #[error("edge or header references block b{index} outside the Basic Blocks section")]
    BadIndex { index: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by the path regenerator.
#[derive(Error, Debug)]
pub enum RegenError {
    #[error("could not read {path}: {source}")]
    ProfileRead {
        path: String,
        source: std::io::Error,
    },

    #[error("artifact for function `{function}`: {source}")]
    Artifact {
        function: String,
        source: ArtifactError,
    },

    #[error("path {path_id} walks into block b{block} which has no outgoing edges")]
    DeadEnd { path_id: u64, block: u32 },

    #[error("path {path_id} does not terminate (malformed DAG)")]
    NonTerminating { path_id: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for graph construction.
pub type GraphResult<T> = Result<T, GraphError>;
