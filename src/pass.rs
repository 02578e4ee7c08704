//! The encoder pass.
//!
//! Runs the whole pipeline for every function the adaptor exposes: build the
//! annotated DAG, dump the artifact, then issue the instrumentation edits.
//! The pass preserves no analyses; the host registers it under
//! [`PASS_NAME`].

use crate::artifact::{artifact_filename, write_artifact};
use crate::core::{CfgAdaptor, Graph};
use crate::instrument::{instrument_function, EditSink};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Name the pass is registered under in the host pass pipeline.
pub const PASS_NAME: &str = "ball-larus";

/// Encoder configuration.
#[derive(Debug, Clone)]
pub struct PassConfig {
    /// Directory the per-function artifacts are written to.
    pub artifact_dir: PathBuf,
    /// Function that receives the program-end `flush_results` call.
    pub entry_function: String,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("."),
            entry_function: "main".to_string(),
        }
    }
}

/// Per-function path-profiling instrumentation pass.
pub struct BallLarusPass {
    config: PassConfig,
}

impl BallLarusPass {
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }

    /// Run the pass over every function in the module.
    pub fn run<A>(&self, adaptor: &mut A)
    where
        A: CfgAdaptor + EditSink<BlockRef = <A as CfgAdaptor>::BlockRef>,
    {
        let funcs: Vec<A::FuncRef> = adaptor.funcs().collect();
        for func in funcs {
            if !adaptor.switch_func(func) {
                continue;
            }
            let name = adaptor.func_name(func).to_string();
            self.run_function(adaptor, &name);
        }
        adaptor.reset();
    }

    /// Encode and instrument the adaptor's current function.
    ///
    /// A malformed CFG or a failed artifact write leaves the function
    /// unchanged; neither aborts the surrounding compilation.
    pub fn run_function<A>(&self, adaptor: &mut A, name: &str)
    where
        A: CfgAdaptor + EditSink<BlockRef = <A as CfgAdaptor>::BlockRef>,
    {
        let graph = match Graph::build(adaptor) {
            Ok(graph) => graph,
            Err(err) => {
                log::error!("{name}: {err}; leaving function uninstrumented");
                return;
            }
        };
        log::debug!(
            "{name}: {} blocks, {} back-edges, {} paths",
            graph.nodes().len(),
            graph.back_edges().len(),
            graph.num_paths()
        );

        let path = self.config.artifact_dir.join(artifact_filename(name));
        let written = File::create(&path).and_then(|file| {
            let mut w = BufWriter::new(file);
            write_artifact(&mut w, &graph, adaptor)
        });
        if let Err(err) = written {
            log::error!(
                "{name}: could not write artifact {}: {err}; skipping instrumentation",
                path.display()
            );
            return;
        }

        instrument_function(&graph, adaptor, name == self.config.entry_function);
    }
}
