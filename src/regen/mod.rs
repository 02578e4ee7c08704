//! The path regenerator.
//!
//! Batch decoder that joins a run's `profile.txt` with the per-function
//! artifacts the encoder wrote, reconstructs the block sequence behind every
//! observed path identifier (plus a sample of unobserved "cold" ones) and
//! emits one CSV file per function. Strictly sequential: one function's data
//! is in memory at a time.

pub mod paths;
pub mod profile;

pub use paths::PathRegen;
pub use profile::{ProfileReader, ProfileSection};

use crate::artifact::{artifact_filename, parse_artifact};
use crate::core::{ArtifactError, RegenError};
use crate::runtime::PROFILE_FILE;
use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// How many unobserved paths to sample per function by default.
pub const DEFAULT_COLD_PATH_SAMPLE: u64 = 2000;

/// Decoder configuration.
#[derive(Debug, Clone)]
pub struct RegenConfig {
    /// Paths with a count at or above this are hot; colder records consume
    /// the sampling budget.
    pub hot_path_threshold: u64,
    /// Budget of cold records per function.
    pub cold_path_sample: u64,
}

impl Default for RegenConfig {
    fn default() -> Self {
        Self {
            hot_path_threshold: 1,
            cold_path_sample: DEFAULT_COLD_PATH_SAMPLE,
        }
    }
}

/// What a decoder run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegenSummary {
    pub functions_processed: usize,
    pub functions_failed: usize,
}

/// Decode every function mentioned in `<dir>/profile.txt`, writing
/// `<dir>/<function>.csv` for each.
///
/// A function whose artifact is missing or malformed is skipped with a
/// diagnostic and counted in [`RegenSummary::functions_failed`]; only a
/// missing or unreadable profile is fatal.
pub fn run(dir: &Path, config: &RegenConfig) -> Result<RegenSummary, RegenError> {
    let profile_path = dir.join(PROFILE_FILE);
    let text = fs::read_to_string(&profile_path).map_err(|source| RegenError::ProfileRead {
        path: profile_path.display().to_string(),
        source,
    })?;

    let mut summary = RegenSummary::default();
    for section in ProfileReader::new(&text) {
        match process_function(dir, &section, config) {
            Ok(()) => summary.functions_processed += 1,
            Err(err) => {
                log::error!("skipping function `{}`: {err}", section.function);
                summary.functions_failed += 1;
            }
        }
    }
    Ok(summary)
}

fn process_function(
    dir: &Path,
    section: &ProfileSection,
    config: &RegenConfig,
) -> Result<(), RegenError> {
    let wrap = |source: ArtifactError| RegenError::Artifact {
        function: section.function.clone(),
        source,
    };
    let artifact_path = dir.join(artifact_filename(&section.function));
    let text = fs::read_to_string(&artifact_path).map_err(|err| wrap(ArtifactError::Io(err)))?;
    let artifact = parse_artifact(&text).map_err(wrap)?;
    log::debug!(
        "{}: {} observed of {} possible paths",
        section.function,
        section.counts.len(),
        artifact.num_paths
    );

    let csv_path = dir.join(format!("{}.csv", section.function));
    let file = File::create(&csv_path)?;
    let mut w = BufWriter::new(file);
    PathRegen::new(&artifact).write_records(&mut w, &section.counts, config)?;
    w.flush()?;
    Ok(())
}
