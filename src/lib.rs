//! One-Line Graph
//!
//! A multi-tenant property-graph store and query layer for electrical
//! one-line diagrams. LLM-extracted node/edge graphs are validated, written
//! into a shared graph space partitioned by a per-diagram key, and queried
//! for summaries, protection schemes and electrical paths.
//!
//! # Architecture
//!
//! - [`model`]: canonical diagram representation and its invariants; never
//!   touches the store.
//! - [`graph`]: property-graph primitives (values, labels, relationship
//!   types) shared across the crate.
//! - [`port`]: the abstract [`port::PropertyGraphPort`] every backend
//!   implements, plus the in-memory adapter.
//! - [`partition`]: partition-key minting, listing and identifier
//!   resolution. The partition key is the sole mechanism isolating diagrams
//!   that share one store.
//! - [`ingest`]: the ordered, partition-tagged write sequence.
//! - [`query`]: read-side operations, scoped by partition key.
//! - [`store`]: the facade REST/CLI callers use.
//!
//! Every operation is a direct, blocking call against the port: no
//! application-level locking, no transactions across the multi-step ingest
//! and delete sequences. Concurrent writers are safe only because each
//! diagram gets its own partition key.
//!
//! # Example
//!
//! ```rust
//! use oneline_graph::model;
//! use oneline_graph::port::MemoryGraph;
//! use oneline_graph::store::DiagramStore;
//! use serde_json::json;
//!
//! let diagram = model::parse_value(json!({
//!     "metadata": {"title": "Substation A", "extracted_at": "2024-01-15T09:30:00"},
//!     "ontology": {"node_types": {}, "edge_types": {}},
//!     "nodes": [
//!         {"id": "GS_A", "type": "GridSource"},
//!         {"id": "BUS1", "type": "Busbar"}
//!     ],
//!     "edges": [
//!         {"from": "GS_A", "type": "CONNECTS_TO", "to": "BUS1"}
//!     ]
//! })).unwrap();
//!
//! let store = DiagramStore::new(MemoryGraph::new());
//! let report = store.ingest(&diagram, None).unwrap();
//! assert_eq!(report.nodes_created, 2);
//!
//! let paths = store
//!     .electrical_paths("GS_A", "BUS1", Some(report.partition_key.as_str()))
//!     .unwrap();
//! assert_eq!(paths, vec![vec!["GS_A".to_string(), "BUS1".to_string()]]);
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod graph;
pub mod ingest;
pub mod model;
pub mod partition;
pub mod port;
pub mod query;
pub mod store;

// Re-export main types for convenience
pub use config::{BackendKind, ConfigError, StoreConfig};
pub use graph::{Label, PropertyMap, PropertyValue, RelationshipType, TypeNameError};
pub use ingest::{IngestError, IngestReport, IngestionWriter, WriteStep};
pub use model::{
    Calculations, Diagram, DiagramEdge, DiagramNode, Ontology, ParseError, ValidationError,
};
pub use partition::{
    partition_key_for, Clock, FixedClock, PartitionError, PartitionSummary, SystemClock,
};
pub use port::{
    MemoryGraph, NodeRecord, NodeRef, NodeSelector, PortError, PropertyGraphPort,
    RelationshipRecord,
};
pub use query::{
    DeleteReport, EdgeFilter, EdgeSummary, NodeConnection, NodeFilter, ProtectionScheme,
    QueryEngine, QueryError, StoreSummary,
};
pub use store::DiagramStore;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
