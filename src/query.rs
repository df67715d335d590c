//! Read-side operations over the shared diagram store.
//!
//! Every operation here is a direct, blocking read (or delete) through the
//! property-graph port, scoped by partition key where one is given. Node
//! results always exclude the three structural element kinds (metadata,
//! ontology, calculations); only domain content is counted or listed.

use crate::graph::{
    Label, PropertyMap, RelationshipType, CONNECTS_TO, LABEL_METADATA, PARTITION_KEY, PROTECTS,
    RELAY_FUNCTION,
};
use crate::port::{NodeSelector, PortError, PropertyGraphPort, RelationshipRecord};
use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Upper bound on electrical-path results, inherited from the original
/// query contract.
const MAX_PATHS: usize = 10;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error(transparent)]
    Port(#[from] PortError),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Store-level summary: per-type counts plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSummary {
    /// Domain node counts by label, largest first.
    pub node_counts: IndexMap<String, usize>,
    /// Relationship counts by type, largest first.
    pub relationship_counts: IndexMap<String, usize>,
    /// Metadata of the summarized partition, or of the most recently
    /// extracted diagram for the global summary.
    pub metadata: PropertyMap,
    pub total_nodes: usize,
    pub total_relationships: usize,
    /// Partition this summary was scoped to, if any.
    pub partition_key: Option<String>,
}

/// One `RelayFunction -PROTECTS-> equipment` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionScheme {
    pub relay_id: String,
    pub device_code: Option<String>,
    pub description: Option<String>,
    pub protected_id: String,
    pub protected_type: String,
    pub protected_name: Option<String>,
    pub notes: Option<String>,
}

/// Outcome of a partition delete. Counting and deleting are separate store
/// operations, so under concurrent mutation the counts are best-effort, not
/// a transactional guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub partition_key: String,
    pub nodes_deleted: u64,
    pub relationships_deleted: u64,
}

/// Filter for [`QueryEngine::list_nodes`].
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub partition_key: Option<String>,
    pub node_type: Option<String>,
}

/// A domain node as returned by listings.
#[derive(Debug, Clone)]
pub struct NodeSummary {
    pub id: String,
    pub node_type: String,
    pub name: Option<String>,
    pub properties: PropertyMap,
}

/// Filter for [`QueryEngine::list_edges`].
#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    pub partition_key: Option<String>,
    pub edge_type: Option<String>,
}

/// A relationship as returned by listings, endpoints resolved to node ids.
#[derive(Debug, Clone)]
pub struct EdgeSummary {
    pub from: String,
    pub to: String,
    pub edge_type: String,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Incoming => write!(f, "incoming"),
            Direction::Outgoing => write!(f, "outgoing"),
        }
    }
}

/// One neighbour of a node, with the relationship that reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConnection {
    pub node_id: String,
    pub node_type: String,
    pub node_name: Option<String>,
    pub relationship_type: String,
    pub direction: Direction,
}

fn partition_filter(partition_key: Option<&str>) -> PropertyMap {
    let mut filter = PropertyMap::new();
    if let Some(key) = partition_key {
        filter.insert(PARTITION_KEY.to_string(), key.into());
    }
    filter
}

fn get_string(properties: &PropertyMap, key: &str) -> Option<String> {
    properties.get(key).and_then(|v| v.as_string()).map(str::to_string)
}

/// Sort a count map largest-count first, ties by name for determinism.
fn sorted_counts(mut counts: IndexMap<String, usize>) -> IndexMap<String, usize> {
    counts.sort_by(|ka, va, kb, vb| vb.cmp(va).then_with(|| ka.cmp(kb)));
    counts
}

/// Ascending compare with absent values last, as the backing stores order
/// nulls in ascending sorts.
fn nulls_last(a: Option<&str>, b: Option<&str>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

/// Read-side query operations over a property-graph port.
pub struct QueryEngine<'a, P: PropertyGraphPort> {
    port: &'a P,
}

impl<'a, P: PropertyGraphPort> QueryEngine<'a, P> {
    pub fn new(port: &'a P) -> Self {
        Self { port }
    }

    /// Summarize one partition, or the whole store when `partition_key` is
    /// `None`. An unknown partition key yields an empty summary rather than
    /// an error, so deletion completeness reads as zero counts.
    pub fn summary(&self, partition_key: Option<&str>) -> QueryResult<StoreSummary> {
        let filter = partition_filter(partition_key);

        let mut node_counts: IndexMap<String, usize> = IndexMap::new();
        let mut total_nodes = 0usize;
        for record in self.port.match_nodes(None, &filter)? {
            if record.label.is_structural() {
                continue;
            }
            *node_counts.entry(record.label.as_str().to_string()).or_insert(0) += 1;
            total_nodes += 1;
        }

        let mut relationship_counts: IndexMap<String, usize> = IndexMap::new();
        let mut total_relationships = 0usize;
        for record in self.port.match_relationships(None, &filter)? {
            *relationship_counts
                .entry(record.rel_type.as_str().to_string())
                .or_insert(0) += 1;
            total_relationships += 1;
        }

        // Scoped: that partition's metadata. Global: the most recent one.
        let mut metadata_nodes = self
            .port
            .match_nodes(Some(&Label::new(LABEL_METADATA)), &filter)?;
        metadata_nodes.sort_by(|a, b| {
            get_string(&b.properties, "extracted_at").cmp(&get_string(&a.properties, "extracted_at"))
        });
        let metadata = metadata_nodes
            .into_iter()
            .next()
            .map(|record| record.properties)
            .unwrap_or_default();

        debug!(partition_key, total_nodes, total_relationships, "summarized store");
        Ok(StoreSummary {
            node_counts: sorted_counts(node_counts),
            relationship_counts: sorted_counts(relationship_counts),
            metadata,
            total_nodes,
            total_relationships,
            partition_key: partition_key.map(str::to_string),
        })
    }

    fn protection_schemes_filtered(
        &self,
        filter: &PropertyMap,
    ) -> QueryResult<Vec<ProtectionScheme>> {
        let records = self
            .port
            .match_relationships(Some(&RelationshipType::new(PROTECTS)), filter)?;

        let mut schemes: Vec<ProtectionScheme> = records
            .into_iter()
            .filter(|record| record.from.label.as_str() == RELAY_FUNCTION)
            .filter_map(|record: RelationshipRecord| {
                Some(ProtectionScheme {
                    relay_id: get_string(&record.from.properties, "id")?,
                    device_code: get_string(&record.from.properties, "device_code"),
                    description: get_string(&record.from.properties, "description"),
                    protected_id: get_string(&record.to.properties, "id")?,
                    protected_type: record.to.label.as_str().to_string(),
                    protected_name: get_string(&record.to.properties, "name"),
                    notes: get_string(&record.properties, "notes"),
                })
            })
            .collect();
        schemes.sort_by(|a, b| {
            nulls_last(a.device_code.as_deref(), b.device_code.as_deref())
                .then_with(|| nulls_last(a.protected_name.as_deref(), b.protected_name.as_deref()))
        });
        Ok(schemes)
    }

    /// All protection schemes in the store, ordered by device code then
    /// protected name.
    ///
    /// Legacy behavior: the scan is store-wide, crossing partition
    /// boundaries. Kept for compatibility pending product clarification;
    /// new callers should use [`QueryEngine::protection_schemes_in`].
    pub fn protection_schemes(&self) -> QueryResult<Vec<ProtectionScheme>> {
        self.protection_schemes_filtered(&PropertyMap::new())
    }

    /// Protection schemes of a single partition.
    pub fn protection_schemes_in(
        &self,
        partition_key: &str,
    ) -> QueryResult<Vec<ProtectionScheme>> {
        self.protection_schemes_filtered(&partition_filter(Some(partition_key)))
    }

    /// Simple electrical paths between two node ids, at most ten, where
    /// every hop is a `CONNECTS_TO` relationship. Paths come back in store
    /// order; callers must not assume shortest-first.
    pub fn electrical_paths(
        &self,
        from_id: &str,
        to_id: &str,
        partition_key: Option<&str>,
    ) -> QueryResult<Vec<Vec<String>>> {
        let mut from = NodeSelector::new().with_property("id", from_id);
        let mut to = NodeSelector::new().with_property("id", to_id);
        if let Some(key) = partition_key {
            from = from.with_property(PARTITION_KEY, key);
            to = to.with_property(PARTITION_KEY, key);
        }
        let path_filter = partition_filter(partition_key);
        let paths = self.port.run_path_query(
            &from,
            &to,
            &RelationshipType::new(CONNECTS_TO),
            &path_filter,
            MAX_PATHS,
        )?;
        debug!(from_id, to_id, partition_key, paths = paths.len(), "path search");
        Ok(paths)
    }

    /// Delete every element carrying the partition key: count nodes, count
    /// relationships, then one detach-delete of the nodes.
    pub fn delete(&self, partition_key: &str) -> QueryResult<DeleteReport> {
        let filter = partition_filter(Some(partition_key));
        let nodes_deleted = self.port.match_nodes(None, &filter)?.len() as u64;
        let relationships_deleted = self.port.match_relationships(None, &filter)?.len() as u64;
        self.port.delete_matching(&filter)?;
        info!(partition_key, nodes_deleted, relationships_deleted, "deleted partition");
        Ok(DeleteReport {
            partition_key: partition_key.to_string(),
            nodes_deleted,
            relationships_deleted,
        })
    }

    /// Distinct domain node types, sorted.
    pub fn list_node_types(&self) -> QueryResult<Vec<String>> {
        let mut types: Vec<String> = Vec::new();
        for record in self.port.match_nodes(None, &PropertyMap::new())? {
            if record.label.is_structural() {
                continue;
            }
            let name = record.label.as_str().to_string();
            if !types.contains(&name) {
                types.push(name);
            }
        }
        types.sort();
        Ok(types)
    }

    /// Relationship types with their counts, largest first.
    pub fn list_edge_types_with_counts(&self) -> QueryResult<IndexMap<String, usize>> {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for record in self.port.match_relationships(None, &PropertyMap::new())? {
            *counts.entry(record.rel_type.as_str().to_string()).or_insert(0) += 1;
        }
        Ok(sorted_counts(counts))
    }

    /// Domain nodes, optionally filtered by partition and/or type, ordered
    /// by name then id.
    pub fn list_nodes(&self, filter: &NodeFilter) -> QueryResult<Vec<NodeSummary>> {
        let property_filter = partition_filter(filter.partition_key.as_deref());
        let label = filter.node_type.as_deref().map(Label::new);

        let mut nodes: Vec<NodeSummary> = self
            .port
            .match_nodes(label.as_ref(), &property_filter)?
            .into_iter()
            .filter(|record| !record.label.is_structural())
            .filter_map(|record| {
                Some(NodeSummary {
                    id: get_string(&record.properties, "id")?,
                    node_type: record.label.as_str().to_string(),
                    name: get_string(&record.properties, "name"),
                    properties: record.properties,
                })
            })
            .collect();
        nodes.sort_by(|a, b| {
            nulls_last(a.name.as_deref(), b.name.as_deref()).then_with(|| a.id.cmp(&b.id))
        });
        Ok(nodes)
    }

    /// Relationships, optionally filtered by partition and/or type, ordered
    /// by type then endpoint ids.
    pub fn list_edges(&self, filter: &EdgeFilter) -> QueryResult<Vec<EdgeSummary>> {
        let property_filter = partition_filter(filter.partition_key.as_deref());
        let rel_type = filter.edge_type.as_deref().map(RelationshipType::new);

        let mut edges: Vec<EdgeSummary> = self
            .port
            .match_relationships(rel_type.as_ref(), &property_filter)?
            .into_iter()
            .filter_map(|record| {
                Some(EdgeSummary {
                    from: get_string(&record.from.properties, "id")?,
                    to: get_string(&record.to.properties, "id")?,
                    edge_type: record.rel_type.as_str().to_string(),
                    properties: record.properties,
                })
            })
            .collect();
        edges.sort_by(|a, b| {
            a.edge_type
                .cmp(&b.edge_type)
                .then_with(|| a.from.cmp(&b.from))
                .then_with(|| a.to.cmp(&b.to))
        });
        Ok(edges)
    }

    /// A single domain node by id. Node ids are unique within a partition
    /// but not across the store; the first match wins.
    pub fn get_node(&self, node_id: &str) -> QueryResult<NodeSummary> {
        let mut id_filter = PropertyMap::new();
        id_filter.insert("id".to_string(), node_id.into());
        self.port
            .match_nodes(None, &id_filter)?
            .into_iter()
            .filter(|record| !record.label.is_structural())
            .find_map(|record| {
                Some(NodeSummary {
                    id: get_string(&record.properties, "id")?,
                    node_type: record.label.as_str().to_string(),
                    name: get_string(&record.properties, "name"),
                    properties: record.properties,
                })
            })
            .ok_or_else(|| QueryError::NodeNotFound(node_id.to_string()))
    }

    /// All connections of a node, incoming and outgoing, excluding
    /// structural neighbours.
    pub fn node_connections(&self, node_id: &str) -> QueryResult<Vec<NodeConnection>> {
        let mut id_filter = PropertyMap::new();
        id_filter.insert("id".to_string(), node_id.into());
        let exists = self
            .port
            .match_nodes(None, &id_filter)?
            .iter()
            .any(|record| !record.label.is_structural());
        if !exists {
            return Err(QueryError::NodeNotFound(node_id.to_string()));
        }

        let mut connections = Vec::new();
        for record in self.port.match_relationships(None, &PropertyMap::new())? {
            let from_id = get_string(&record.from.properties, "id");
            let to_id = get_string(&record.to.properties, "id");
            if from_id.as_deref() == Some(node_id) && !record.to.label.is_structural() {
                if let Some(id) = to_id.clone() {
                    connections.push(NodeConnection {
                        node_id: id,
                        node_type: record.to.label.as_str().to_string(),
                        node_name: get_string(&record.to.properties, "name"),
                        relationship_type: record.rel_type.as_str().to_string(),
                        direction: Direction::Outgoing,
                    });
                }
            }
            if to_id.as_deref() == Some(node_id) && !record.from.label.is_structural() {
                if let Some(id) = from_id {
                    connections.push(NodeConnection {
                        node_id: id,
                        node_type: record.from.label.as_str().to_string(),
                        node_name: get_string(&record.from.properties, "name"),
                        relationship_type: record.rel_type.as_str().to_string(),
                        direction: Direction::Incoming,
                    });
                }
            }
        }
        Ok(connections)
    }

    /// Wipe the entire store, all partitions included. Returns the number
    /// of nodes removed.
    pub fn clear_store(&self) -> QueryResult<u64> {
        let removed = self.port.delete_matching(&PropertyMap::new())?;
        info!(removed, "cleared store");
        Ok(removed)
    }
}
