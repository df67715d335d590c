//! Canonical in-memory representation of an extracted one-line diagram.
//!
//! A [`Diagram`] is built in full by the extraction side before ingestion
//! and validated on construction; nothing in this module touches the graph
//! store. The shapes mirror the JSON interchange format the LLM extraction
//! produces: known fields are typed, everything else lands in `extra_attrs`.

pub mod parser;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use parser::{load_from_file, parse_value, save_to_file, summarize, DiagramSummary, ParseError, ParseResult};

/// Malformed diagram, detected before any store write is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An edge references a node id absent from the diagram's node set.
    #[error("edge {edge_type} {from} -> {to} references unknown node {missing}")]
    DanglingEdge {
        edge_type: String,
        from: String,
        to: String,
        missing: String,
    },

    /// Two nodes share an id within one diagram.
    #[error("duplicate node id {0}")]
    DuplicateNodeId(String),

    /// A required metadata key is absent.
    #[error("missing required metadata key {0:?}")]
    MissingMetadata(&'static str),
}

/// Attribute list for one node or edge type in the extraction's ontology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    #[serde(default)]
    pub attrs: Vec<String>,
}

/// Descriptive schema the extraction claims to follow. Stored once per
/// diagram, never enforced against actual node/edge properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ontology {
    #[serde(default)]
    pub node_types: IndexMap<String, TypeSpec>,
    #[serde(default)]
    pub edge_types: IndexMap<String, TypeSpec>,
}

/// A component in the diagram. `id` is unique within one diagram but NOT
/// across diagrams; different extractions routinely reuse ids like "BUS1".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Everything the extraction reported beyond the known fields.
    #[serde(flatten)]
    pub extra_attrs: IndexMap<String, serde_json::Value>,
}

/// A connection between two components of the same diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramEdge {
    #[serde(rename = "from")]
    pub from: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra_attrs: IndexMap<String, serde_json::Value>,
}

/// Breaker specification attached to a diagram's calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerSpec {
    #[serde(rename = "type")]
    pub breaker_type: String,
    pub kv_class: f64,
    pub continuous_a: i64,
    pub interrupting_ka_range: String,
    pub k_factor: f64,
}

/// Optional calculation results (short-circuit study, breaker sizing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculations {
    pub short_circuit: IndexMap<String, serde_json::Value>,
    pub breaker_spec: BreakerSpec,
}

/// Complete electrical one-line diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub metadata: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub ontology: Ontology,
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculations: Option<Calculations>,
}

impl Diagram {
    /// Assemble and validate a diagram.
    pub fn new(
        metadata: IndexMap<String, serde_json::Value>,
        ontology: Ontology,
        nodes: Vec<DiagramNode>,
        edges: Vec<DiagramEdge>,
        calculations: Option<Calculations>,
    ) -> Result<Self, ValidationError> {
        let diagram = Diagram {
            metadata,
            ontology,
            nodes,
            edges,
            calculations,
        };
        diagram.validate()?;
        Ok(diagram)
    }

    /// Check the construction invariants: unique node ids, no dangling edge
    /// endpoints, required metadata present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.metadata.contains_key("title") {
            return Err(ValidationError::MissingMetadata("title"));
        }

        let mut ids = rustc_hash::FxHashSet::default();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(ValidationError::DuplicateNodeId(node.id.clone()));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(ValidationError::DanglingEdge {
                        edge_type: edge.edge_type.clone(),
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Diagram title, when metadata carries a string one.
    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(|v| v.as_str())
    }

    /// All nodes of a given type.
    pub fn nodes_by_type(&self, node_type: &str) -> Vec<&DiagramNode> {
        self.nodes
            .iter()
            .filter(|node| node.node_type == node_type)
            .collect()
    }

    /// All edges of a given type.
    pub fn edges_by_type(&self, edge_type: &str) -> Vec<&DiagramEdge> {
        self.edges
            .iter()
            .filter(|edge| edge.edge_type == edge_type)
            .collect()
    }

    /// Look up a node by id. Absence is an ordinary `None`, not an error.
    pub fn node_by_id(&self, node_id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|node| node.id == node_id)
    }

    /// All edges originating from a node.
    pub fn edges_from(&self, node_id: &str) -> Vec<&DiagramEdge> {
        self.edges.iter().filter(|edge| edge.from == node_id).collect()
    }

    /// All edges terminating at a node.
    pub fn edges_to(&self, node_id: &str) -> Vec<&DiagramEdge> {
        self.edges.iter().filter(|edge| edge.to == node_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> IndexMap<String, serde_json::Value> {
        let mut map = IndexMap::new();
        map.insert("title".to_string(), json!("Substation A"));
        map.insert("extracted_at".to_string(), json!("2024-01-15T09:30:00"));
        map
    }

    fn node(id: &str, node_type: &str) -> DiagramNode {
        DiagramNode {
            id: id.to_string(),
            node_type: node_type.to_string(),
            name: None,
            extra_attrs: IndexMap::new(),
        }
    }

    fn edge(from: &str, to: &str, edge_type: &str) -> DiagramEdge {
        DiagramEdge {
            from: from.to_string(),
            edge_type: edge_type.to_string(),
            to: to.to_string(),
            via: None,
            notes: None,
            extra_attrs: IndexMap::new(),
        }
    }

    #[test]
    fn test_valid_diagram() {
        let diagram = Diagram::new(
            metadata(),
            Ontology::default(),
            vec![node("GS_A", "GridSource"), node("TX1", "Transformer")],
            vec![edge("GS_A", "TX1", "CONNECTS_TO")],
            None,
        )
        .unwrap();
        assert_eq!(diagram.title(), Some("Substation A"));
        assert_eq!(diagram.nodes_by_type("Transformer").len(), 1);
        assert_eq!(diagram.edges_from("GS_A").len(), 1);
        assert_eq!(diagram.edges_to("TX1").len(), 1);
        assert!(diagram.node_by_id("NOPE").is_none());
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let err = Diagram::new(
            metadata(),
            Ontology::default(),
            vec![node("GS_A", "GridSource")],
            vec![edge("GS_A", "TX1", "CONNECTS_TO")],
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::DanglingEdge {
                edge_type: "CONNECTS_TO".to_string(),
                from: "GS_A".to_string(),
                to: "TX1".to_string(),
                missing: "TX1".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let err = Diagram::new(
            metadata(),
            Ontology::default(),
            vec![node("BUS1", "Busbar"), node("BUS1", "Busbar")],
            vec![],
            None,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateNodeId("BUS1".to_string()));
    }

    #[test]
    fn test_missing_title_rejected() {
        let err = Diagram::new(IndexMap::new(), Ontology::default(), vec![], vec![], None)
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingMetadata("title"));
    }
}
