//! Ball-Larus path profiling.
//!
//! Given a function's control-flow graph, the encoder assigns a unique
//! integer to every acyclic entry-to-exit path, instruments the program so
//! each executed path bumps a counter keyed by that integer, and the
//! companion regenerator later turns recorded identifiers back into block
//! sequences.
//!
//! # Primary Usage
//!
//! ```ignore
//! use ball_larus::{BallLarusPass, PassConfig};
//!
//! // host binding implements CfgAdaptor + EditSink over its IR
//! let mut adaptor = MyIrAdaptor::new(&module);
//! let pass = BallLarusPass::new(PassConfig::default());
//! pass.run(&mut adaptor);
//! ```
//!
//! At runtime the instrumented program calls [`runtime::emit_path`] and
//! [`runtime::flush_results`], producing `profile.txt`. The `regen` binary
//! then joins that profile with the per-function artifacts:
//!
//! ```text
//! regen <directory> [hot_path_threshold]
//! ```
//!
//! # Architecture
//!
//! - [`core`] - shared infrastructure (adaptor trait, graph, errors)
//! - [`pass`] - the per-function encoder pass
//! - [`instrument`] - instrumentation synthesis against the [`instrument::EditSink`] builder
//! - [`artifact`] - the serialized DAG format shared by both tools
//! - [`runtime`] - counter map and C ABI entry points
//! - [`regen`] - the path regenerator
//! - [`test_ir`] - textual test CFG format for exercising the pipeline

pub mod artifact;
pub mod core;
pub mod instrument;
pub mod pass;
pub mod regen;
pub mod runtime;
pub mod test_ir;

pub use crate::core::{ArtifactError, CfgAdaptor, GraphError, RegenError};
pub use crate::core::{BackEdge, Graph, Node, To};
pub use instrument::{instrument_function, EditSink};
pub use pass::{BallLarusPass, PassConfig, PASS_NAME};
pub use regen::{RegenConfig, RegenSummary};
