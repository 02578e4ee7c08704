//! Artifact serialization.
//!
//! The encoder writes one text file per function describing the annotated DAG
//! and the basic-block bodies; the regenerator parses it back. The layout is
//! fixed:
//!
//! ```text
//! Num of Possible Paths: <num_paths>
//! Entry Basic Block: <entry_index>
//! Exit Basic Block: <exit_index>
//! DAG Edges:
//! <src>, <dest>, <inc>, <true|false>
//! ...
//!
//! Basic Blocks:
//! b<index>:
//!   <instruction text>
//!
//! b<index>:
//! ...
//! ```
//!
//! The final edge column is `true` iff the edge is a synthetic stand-in for a
//! back-edge. Edges are grouped by source in source-index order; within one
//! source they keep the order the numbering sweep produced.

use crate::core::{ArtifactError, CfgAdaptor, Graph};
use std::io::Write;

/// Name of the artifact file for a function.
pub fn artifact_filename(function: &str) -> String {
    format!("{function}.txt")
}

/// Serialize the annotated DAG and block bodies of the adaptor's current
/// function.
pub fn write_artifact<W, A>(w: &mut W, graph: &Graph<A::BlockRef>, adaptor: &A) -> std::io::Result<()>
where
    W: Write,
    A: CfgAdaptor,
{
    writeln!(w, "Num of Possible Paths: {}", graph.num_paths())?;
    writeln!(w, "Entry Basic Block: {}", graph.entry())?;
    writeln!(w, "Exit Basic Block: {}", graph.exit())?;

    writeln!(w, "DAG Edges:")?;
    for (src, node) in graph.nodes().iter().enumerate() {
        for to in &node.tos {
            writeln!(
                w,
                "{}, {}, {}, {}",
                src,
                to.dest,
                to.inc,
                to.back_edge.is_some()
            )?;
        }
    }

    writeln!(w, "\nBasic Blocks:")?;
    for (idx, node) in graph.nodes().iter().enumerate() {
        writeln!(w, "b{idx}:")?;
        for line in adaptor.block_inst_lines(node.block) {
            writeln!(w, "  {line}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Decoder-side view of one DAG edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactEdge {
    pub dest: u32,
    pub inc: u64,
    pub from_back_edge: bool,
}

/// Parsed artifact of one function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArtifact {
    pub num_paths: u64,
    pub entry: u32,
    pub exit: u32,
    /// Outgoing edges indexed by source node.
    pub edges: Vec<Vec<ArtifactEdge>>,
    /// Newline-joined instruction text per block.
    pub blocks: Vec<String>,
}

/// Parse an artifact file's contents.
pub fn parse_artifact(text: &str) -> Result<FunctionArtifact, ArtifactError> {
    let mut lines = text.lines().enumerate();
    let mut next = |expected: &'static str| {
        lines
            .next()
            .map(|(no, line)| (no + 1, line))
            .ok_or(ArtifactError::Truncated { section: expected })
    };

    let num_paths = parse_header(next("Num of Possible Paths")?, "Num of Possible Paths")?;
    let entry = parse_header(next("Entry Basic Block")?, "Entry Basic Block")? as u32;
    let exit = parse_header(next("Exit Basic Block")?, "Exit Basic Block")? as u32;

    let (no, line) = next("DAG Edges")?;
    if line != "DAG Edges:" {
        return Err(ArtifactError::MissingField {
            line: no,
            expected: "DAG Edges:",
        });
    }

    let mut edges: Vec<Vec<ArtifactEdge>> = Vec::new();
    loop {
        let (no, line) = next("Basic Blocks")?;
        if line.is_empty() {
            break;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let &[src, dest, inc, from_be] = fields.as_slice() else {
            return Err(ArtifactError::BadEdge {
                line: no,
                text: line.to_string(),
            });
        };
        let src: usize = parse_number(no, src)?;
        let from_back_edge = match from_be {
            "true" => true,
            "false" => false,
            _ => {
                return Err(ArtifactError::BadEdge {
                    line: no,
                    text: line.to_string(),
                })
            }
        };
        if src >= edges.len() {
            edges.resize_with(src + 1, Vec::new);
        }
        edges[src].push(ArtifactEdge {
            dest: parse_number(no, dest)?,
            inc: parse_number(no, inc)?,
            from_back_edge,
        });
    }

    let (no, line) = next("Basic Blocks")?;
    if line != "Basic Blocks:" {
        return Err(ArtifactError::MissingField {
            line: no,
            expected: "Basic Blocks:",
        });
    }

    let mut blocks: Vec<String> = Vec::new();
    for (_, line) in lines {
        if line.starts_with('b') && line.ends_with(':') {
            blocks.push(String::new());
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let block = blocks.last_mut().ok_or(ArtifactError::Truncated {
            section: "Basic Blocks",
        })?;
        if !block.is_empty() {
            block.push('\n');
        }
        block.push_str(line);
    }

    let artifact = FunctionArtifact {
        num_paths,
        entry,
        exit,
        edges,
        blocks,
    };
    for &index in [artifact.entry, artifact.exit].iter().chain(
        artifact
            .edges
            .iter()
            .flatten()
            .map(|edge| &edge.dest),
    ) {
        if index as usize >= artifact.blocks.len() {
            return Err(ArtifactError::BadIndex { index });
        }
    }
    Ok(artifact)
}

fn parse_header((no, line): (usize, &str), prefix: &'static str) -> Result<u64, ArtifactError> {
    let value = line
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or(ArtifactError::MissingField {
            line: no,
            expected: prefix,
        })?;
    parse_number(no, value.trim())
}

fn parse_number<T: std::str::FromStr>(line: usize, text: &str) -> Result<T, ArtifactError> {
    text.parse().map_err(|_| ArtifactError::BadNumber {
        line,
        text: text.to_string(),
    })
}
