//! Core profiling infrastructure.
//!
//! This module provides the building blocks shared by the encoder and the
//! regenerator:
//!
//! - `adaptor` - the [`CfgAdaptor`] trait bridging the pass to a host IR
//! - `graph` - the CFG model, back-edge classification and path numbering
//! - `error` - the error taxonomy for graph construction, artifacts and
//!   regeneration

pub mod adaptor;
pub mod error;
pub mod graph;

pub use adaptor::CfgAdaptor;
pub use error::{ArtifactError, GraphError, GraphResult, RegenError};
pub use graph::{BackEdge, Graph, Node, To};
