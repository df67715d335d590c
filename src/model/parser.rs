//! JSON interchange for diagrams.
//!
//! Loads LLM-extracted knowledge-graph JSON into a validated [`Diagram`]
//! and writes one back out in the same shape. Unknown node/edge keys are
//! captured in `extra_attrs` on load and re-inlined on save; optional
//! fields are omitted rather than written as null.

use super::{Diagram, ValidationError};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("could not read diagram file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed diagram JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Load and validate a diagram from a JSON file.
pub fn load_from_file(path: impl AsRef<Path>) -> ParseResult<Diagram> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading diagram");
    let contents = fs::read_to_string(path)?;
    parse_value(serde_json::from_str(&contents)?)
}

/// Parse and validate a diagram from an already-decoded JSON value.
pub fn parse_value(value: serde_json::Value) -> ParseResult<Diagram> {
    let diagram: Diagram = serde_json::from_value(value)?;
    diagram.validate()?;
    Ok(diagram)
}

/// Write a diagram back to a JSON file, pretty-printed.
pub fn save_to_file(path: impl AsRef<Path>, diagram: &Diagram) -> ParseResult<()> {
    let contents = serde_json::to_string_pretty(diagram)?;
    fs::write(path.as_ref(), contents)?;
    Ok(())
}

/// In-memory summary of a diagram, computed without any store access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSummary {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub node_counts: IndexMap<String, usize>,
    pub edge_counts: IndexMap<String, usize>,
    pub has_calculations: bool,
}

/// Count nodes and edges by type.
pub fn summarize(diagram: &Diagram) -> DiagramSummary {
    let mut node_counts: IndexMap<String, usize> = IndexMap::new();
    for node in &diagram.nodes {
        *node_counts.entry(node.node_type.clone()).or_insert(0) += 1;
    }
    let mut edge_counts: IndexMap<String, usize> = IndexMap::new();
    for edge in &diagram.edges {
        *edge_counts.entry(edge.edge_type.clone()).or_insert(0) += 1;
    }
    DiagramSummary {
        total_nodes: diagram.nodes.len(),
        total_edges: diagram.edges.len(),
        node_counts,
        edge_counts,
        has_calculations: diagram.calculations.is_some(),
    }
}
