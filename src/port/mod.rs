//! Property-graph port: the capability interface every graph backend
//! implements.
//!
//! The diagram layer never formats identifiers or extracted data into query
//! text; every port operation takes typed labels, relationship types and
//! exact-match property filters. One concrete adapter is selected at process
//! start via [`crate::config::StoreConfig`]; there is no backend registry.

pub mod memory;

use crate::graph::{Label, PropertyMap, RelationshipType};
use std::fmt;
use thiserror::Error;

pub use memory::MemoryGraph;

/// Errors surfaced by a graph backend. Never retried at this layer.
#[derive(Error, Debug)]
pub enum PortError {
    /// A relationship endpoint selector matched zero nodes.
    #[error("no node matches selector {0}")]
    EndpointNotFound(String),

    /// The backing store could not be reached or its session is unusable.
    #[error("graph store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any other backend-reported failure.
    #[error("graph backend error: {0}")]
    Backend(String),
}

pub type PortResult<T> = Result<T, PortError>;

/// Opaque backend-assigned node handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub u64);

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({})", self.0)
    }
}

/// Selects nodes by optional label plus exact-match properties.
#[derive(Debug, Clone, Default)]
pub struct NodeSelector {
    pub label: Option<Label>,
    pub filter: PropertyMap,
}

impl NodeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<crate::graph::PropertyValue>,
    ) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for NodeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "(:{} ", label)?,
            None => write!(f, "( ")?,
        }
        let mut keys: Vec<&String> = self.filter.keys().collect();
        keys.sort();
        for key in keys {
            write!(f, "{}={} ", key, self.filter[key])?;
        }
        write!(f, ")")
    }
}

/// A matched node: handle, label and a copy of its properties.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub reference: NodeRef,
    pub label: Label,
    pub properties: PropertyMap,
}

/// One endpoint of a matched relationship.
#[derive(Debug, Clone)]
pub struct EndpointRecord {
    pub label: Label,
    pub properties: PropertyMap,
}

/// A matched relationship with both endpoints resolved.
#[derive(Debug, Clone)]
pub struct RelationshipRecord {
    pub rel_type: RelationshipType,
    pub properties: PropertyMap,
    pub from: EndpointRecord,
    pub to: EndpointRecord,
}

/// Abstract property-graph store.
///
/// Adapters own their session/lock management: every call acquires whatever
/// it needs on entry and releases it on every exit path, success or error.
/// All methods are blocking; timeouts and cancellation belong to the
/// backend.
pub trait PropertyGraphPort {
    /// Create a node with the given label and properties.
    fn create_typed_node(&self, label: &Label, properties: PropertyMap) -> PortResult<NodeRef>;

    /// Return all nodes matching the optional label and every property in
    /// `filter`. An empty filter matches all nodes (of the label, if given).
    fn match_nodes(&self, label: Option<&Label>, filter: &PropertyMap)
        -> PortResult<Vec<NodeRecord>>;

    /// Create a typed relationship between the first node matching `from`
    /// and the first node matching `to`. Fails with
    /// [`PortError::EndpointNotFound`] if either selector matches nothing.
    fn create_typed_relationship(
        &self,
        from: &NodeSelector,
        to: &NodeSelector,
        rel_type: &RelationshipType,
        properties: PropertyMap,
    ) -> PortResult<()>;

    /// Return all relationships matching the optional type and every
    /// property in `filter`, with both endpoints resolved.
    fn match_relationships(
        &self,
        type_filter: Option<&RelationshipType>,
        filter: &PropertyMap,
    ) -> PortResult<Vec<RelationshipRecord>>;

    /// Detach-delete every node matching `filter` (incident relationships
    /// go with them). Returns the number of nodes deleted.
    fn delete_matching(&self, filter: &PropertyMap) -> PortResult<u64>;

    /// Find up to `max_results` simple paths between a node matching `from`
    /// and a node matching `to`. Traversal ignores relationship direction;
    /// every hop must have type `rel_type`, and every node and relationship
    /// on the path must match `path_filter`. Each path is returned as the
    /// sequence of the nodes' `id` property values, in store order and not
    /// necessarily shortest first.
    fn run_path_query(
        &self,
        from: &NodeSelector,
        to: &NodeSelector,
        rel_type: &RelationshipType,
        path_filter: &PropertyMap,
        max_results: usize,
    ) -> PortResult<Vec<Vec<String>>>;
}
