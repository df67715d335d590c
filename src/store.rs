//! Diagram store facade: the surface exposed to REST/CLI callers.
//!
//! Owns a port and wires the partitioning engine, the ingestion writer and
//! the query engine together behind one type. Updates are whole-diagram:
//! replace means delete then re-ingest, driven by the caller.

use crate::ingest::{IngestError, IngestReport, IngestionWriter};
use crate::model::Diagram;
use crate::partition::{self, Clock, PartitionResult, PartitionSummary, SystemClock};
use crate::port::PropertyGraphPort;
use crate::query::{
    DeleteReport, EdgeFilter, EdgeSummary, NodeConnection, NodeFilter, NodeSummary,
    ProtectionScheme, QueryEngine, QueryResult, StoreSummary,
};
use indexmap::IndexMap;

/// High-level store over any property-graph backend.
pub struct DiagramStore<P: PropertyGraphPort> {
    port: P,
    clock: Box<dyn Clock + Send + Sync>,
}

impl<P: PropertyGraphPort> DiagramStore<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            clock: Box::new(SystemClock),
        }
    }

    /// Use an explicit time source for partition-key minting.
    pub fn with_clock(port: P, clock: impl Clock + Send + Sync + 'static) -> Self {
        Self {
            port,
            clock: Box::new(clock),
        }
    }

    /// Access the underlying port, e.g. for backend-specific maintenance.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Persist a diagram; a fresh partition key is minted from the metadata
    /// title unless the caller supplies one.
    pub fn ingest(
        &self,
        diagram: &Diagram,
        partition_key: Option<&str>,
    ) -> Result<IngestReport, IngestError> {
        IngestionWriter::with_clock(&self.port, self.clock.as_ref()).ingest(diagram, partition_key)
    }

    /// All known partitions, most recently extracted first.
    pub fn list_partitions(&self) -> PartitionResult<Vec<PartitionSummary>> {
        partition::list_partitions(&self.port)
    }

    /// Resolve a 1-based listing index or a literal partition key.
    pub fn resolve(&self, identifier: &str) -> PartitionResult<String> {
        partition::resolve(&self.port, identifier)
    }

    pub fn summary(&self, partition_key: Option<&str>) -> QueryResult<StoreSummary> {
        QueryEngine::new(&self.port).summary(partition_key)
    }

    /// Store-wide protection schemes (legacy global scan; see
    /// [`QueryEngine::protection_schemes`]).
    pub fn protection_schemes(&self) -> QueryResult<Vec<ProtectionScheme>> {
        QueryEngine::new(&self.port).protection_schemes()
    }

    pub fn protection_schemes_in(
        &self,
        partition_key: &str,
    ) -> QueryResult<Vec<ProtectionScheme>> {
        QueryEngine::new(&self.port).protection_schemes_in(partition_key)
    }

    pub fn electrical_paths(
        &self,
        from_id: &str,
        to_id: &str,
        partition_key: Option<&str>,
    ) -> QueryResult<Vec<Vec<String>>> {
        QueryEngine::new(&self.port).electrical_paths(from_id, to_id, partition_key)
    }

    pub fn delete(&self, partition_key: &str) -> QueryResult<DeleteReport> {
        QueryEngine::new(&self.port).delete(partition_key)
    }

    pub fn list_node_types(&self) -> QueryResult<Vec<String>> {
        QueryEngine::new(&self.port).list_node_types()
    }

    pub fn list_edge_types_with_counts(&self) -> QueryResult<IndexMap<String, usize>> {
        QueryEngine::new(&self.port).list_edge_types_with_counts()
    }

    pub fn list_nodes(&self, filter: &NodeFilter) -> QueryResult<Vec<NodeSummary>> {
        QueryEngine::new(&self.port).list_nodes(filter)
    }

    pub fn list_edges(&self, filter: &EdgeFilter) -> QueryResult<Vec<EdgeSummary>> {
        QueryEngine::new(&self.port).list_edges(filter)
    }

    pub fn get_node(&self, node_id: &str) -> QueryResult<NodeSummary> {
        QueryEngine::new(&self.port).get_node(node_id)
    }

    pub fn node_connections(&self, node_id: &str) -> QueryResult<Vec<NodeConnection>> {
        QueryEngine::new(&self.port).node_connections(node_id)
    }

    /// Wipe every partition in the store.
    pub fn clear_store(&self) -> QueryResult<u64> {
        QueryEngine::new(&self.port).clear_store()
    }
}
