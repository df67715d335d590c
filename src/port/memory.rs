//! In-memory graph adapter.
//!
//! Arena storage with adjacency lists and label/relationship-type indices.
//! A single `RwLock` guards the whole graph; each port call acquires it on
//! entry and releases it on every exit path, which is the whole of this
//! adapter's session management.

use super::{
    NodeRecord, NodeRef, NodeSelector, PortError, PortResult, PropertyGraphPort,
    RelationshipRecord,
};
use crate::graph::{Label, PropertyMap, RelationshipType};
use crate::port::EndpointRecord;
use rustc_hash::FxHashSet;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredNode {
    label: Label,
    properties: PropertyMap,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    source: usize,
    target: usize,
    rel_type: RelationshipType,
    properties: PropertyMap,
}

#[derive(Debug, Default)]
struct GraphInner {
    /// Node arena; deleted slots become `None` and are not reused, so a
    /// `NodeRef` stays valid for the lifetime of the store.
    nodes: Vec<Option<StoredNode>>,
    /// Edge arena, same slot discipline as nodes.
    edges: Vec<Option<StoredEdge>>,
    /// Outgoing edge slots per node slot.
    outgoing: Vec<Vec<usize>>,
    /// Incoming edge slots per node slot.
    incoming: Vec<Vec<usize>>,
    /// Label index for fast label scans.
    label_index: HashMap<Label, FxHashSet<usize>>,
    /// Relationship-type index.
    rel_type_index: HashMap<RelationshipType, FxHashSet<usize>>,
}

fn matches_filter(properties: &PropertyMap, filter: &PropertyMap) -> bool {
    filter
        .iter()
        .all(|(key, value)| properties.get(key) == Some(value))
}

impl GraphInner {
    /// Live node slots matching a selector, in insertion order.
    fn select(&self, selector: &NodeSelector) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|node| (slot, node)))
            .filter(|(_, node)| match &selector.label {
                Some(label) => node.label == *label,
                None => true,
            })
            .filter(|(_, node)| matches_filter(&node.properties, &selector.filter))
            .map(|(slot, _)| slot)
            .collect()
    }

    /// Undirected neighbors of a node as `(edge_slot, neighbor_slot)`,
    /// outgoing first, matching live edges only.
    fn neighbors(&self, slot: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::new();
        for &edge_slot in &self.outgoing[slot] {
            if let Some(edge) = self.edges[edge_slot].as_ref() {
                result.push((edge_slot, edge.target));
            }
        }
        for &edge_slot in &self.incoming[slot] {
            if let Some(edge) = self.edges[edge_slot].as_ref() {
                result.push((edge_slot, edge.source));
            }
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_paths(
        &self,
        current: usize,
        targets: &FxHashSet<usize>,
        rel_type: &RelationshipType,
        path_filter: &PropertyMap,
        visited: &mut FxHashSet<usize>,
        path: &mut Vec<usize>,
        results: &mut Vec<Vec<usize>>,
        max_results: usize,
    ) {
        if results.len() >= max_results {
            return;
        }
        visited.insert(current);
        path.push(current);

        if path.len() > 1 && targets.contains(&current) {
            results.push(path.clone());
        } else {
            for (edge_slot, neighbor) in self.neighbors(current) {
                if visited.contains(&neighbor) {
                    continue;
                }
                let Some(edge) = self.edges[edge_slot].as_ref() else {
                    continue;
                };
                if edge.rel_type != *rel_type || !matches_filter(&edge.properties, path_filter) {
                    continue;
                }
                let Some(node) = self.nodes[neighbor].as_ref() else {
                    continue;
                };
                if !matches_filter(&node.properties, path_filter) {
                    continue;
                }
                self.collect_paths(
                    neighbor,
                    targets,
                    rel_type,
                    path_filter,
                    visited,
                    path,
                    results,
                    max_results,
                );
            }
        }

        path.pop();
        visited.remove(&current);
    }
}

/// In-memory [`PropertyGraphPort`] implementation.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    inner: RwLock<GraphInner>,
}

impl MemoryGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> PortResult<RwLockReadGuard<'_, GraphInner>> {
        self.inner
            .read()
            .map_err(|_| PortError::StoreUnavailable("graph lock poisoned".to_string()))
    }

    fn write(&self) -> PortResult<RwLockWriteGuard<'_, GraphInner>> {
        self.inner
            .write()
            .map_err(|_| PortError::StoreUnavailable("graph lock poisoned".to_string()))
    }
}

impl PropertyGraphPort for MemoryGraph {
    fn create_typed_node(&self, label: &Label, properties: PropertyMap) -> PortResult<NodeRef> {
        let mut inner = self.write()?;
        let slot = inner.nodes.len();
        inner.nodes.push(Some(StoredNode {
            label: label.clone(),
            properties,
        }));
        inner.outgoing.push(Vec::new());
        inner.incoming.push(Vec::new());
        inner
            .label_index
            .entry(label.clone())
            .or_default()
            .insert(slot);
        debug!(label = %label, slot, "created node");
        Ok(NodeRef(slot as u64))
    }

    fn match_nodes(
        &self,
        label: Option<&Label>,
        filter: &PropertyMap,
    ) -> PortResult<Vec<NodeRecord>> {
        let inner = self.read()?;
        let selector = NodeSelector {
            label: label.cloned(),
            filter: filter.clone(),
        };
        Ok(inner
            .select(&selector)
            .into_iter()
            .filter_map(|slot| {
                inner.nodes[slot].as_ref().map(|node| NodeRecord {
                    reference: NodeRef(slot as u64),
                    label: node.label.clone(),
                    properties: node.properties.clone(),
                })
            })
            .collect())
    }

    fn create_typed_relationship(
        &self,
        from: &NodeSelector,
        to: &NodeSelector,
        rel_type: &RelationshipType,
        properties: PropertyMap,
    ) -> PortResult<()> {
        let mut inner = self.write()?;
        let source = *inner
            .select(from)
            .first()
            .ok_or_else(|| PortError::EndpointNotFound(from.to_string()))?;
        let target = *inner
            .select(to)
            .first()
            .ok_or_else(|| PortError::EndpointNotFound(to.to_string()))?;

        let slot = inner.edges.len();
        inner.edges.push(Some(StoredEdge {
            source,
            target,
            rel_type: rel_type.clone(),
            properties,
        }));
        inner.outgoing[source].push(slot);
        inner.incoming[target].push(slot);
        inner
            .rel_type_index
            .entry(rel_type.clone())
            .or_default()
            .insert(slot);
        debug!(rel_type = %rel_type, source, target, "created relationship");
        Ok(())
    }

    fn match_relationships(
        &self,
        type_filter: Option<&RelationshipType>,
        filter: &PropertyMap,
    ) -> PortResult<Vec<RelationshipRecord>> {
        let inner = self.read()?;
        let mut records = Vec::new();
        for entry in inner.edges.iter() {
            let Some(edge) = entry.as_ref() else {
                continue;
            };
            if let Some(rel_type) = type_filter {
                if edge.rel_type != *rel_type {
                    continue;
                }
            }
            if !matches_filter(&edge.properties, filter) {
                continue;
            }
            let (Some(source), Some(target)) = (
                inner.nodes[edge.source].as_ref(),
                inner.nodes[edge.target].as_ref(),
            ) else {
                continue;
            };
            records.push(RelationshipRecord {
                rel_type: edge.rel_type.clone(),
                properties: edge.properties.clone(),
                from: EndpointRecord {
                    label: source.label.clone(),
                    properties: source.properties.clone(),
                },
                to: EndpointRecord {
                    label: target.label.clone(),
                    properties: target.properties.clone(),
                },
            });
        }
        Ok(records)
    }

    fn delete_matching(&self, filter: &PropertyMap) -> PortResult<u64> {
        let mut inner = self.write()?;
        let selector = NodeSelector {
            label: None,
            filter: filter.clone(),
        };
        let doomed: Vec<usize> = inner.select(&selector);
        let doomed_set: FxHashSet<usize> = doomed.iter().copied().collect();

        // Detach first: drop every edge incident to a doomed node.
        let incident: Vec<usize> = inner
            .edges
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|edge| (slot, edge)))
            .filter(|(_, edge)| {
                doomed_set.contains(&edge.source) || doomed_set.contains(&edge.target)
            })
            .map(|(slot, _)| slot)
            .collect();
        for edge_slot in incident {
            if let Some(edge) = inner.edges[edge_slot].take() {
                inner.outgoing[edge.source].retain(|&e| e != edge_slot);
                inner.incoming[edge.target].retain(|&e| e != edge_slot);
                if let Some(index) = inner.rel_type_index.get_mut(&edge.rel_type) {
                    index.remove(&edge_slot);
                }
            }
        }

        for slot in &doomed {
            if let Some(node) = inner.nodes[*slot].take() {
                if let Some(index) = inner.label_index.get_mut(&node.label) {
                    index.remove(slot);
                }
            }
        }
        debug!(nodes = doomed.len(), "detach-deleted nodes");
        Ok(doomed.len() as u64)
    }

    fn run_path_query(
        &self,
        from: &NodeSelector,
        to: &NodeSelector,
        rel_type: &RelationshipType,
        path_filter: &PropertyMap,
        max_results: usize,
    ) -> PortResult<Vec<Vec<String>>> {
        let inner = self.read()?;
        let starts = inner.select(from);
        let targets: FxHashSet<usize> = inner.select(to).into_iter().collect();
        if starts.is_empty() || targets.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for start in starts {
            if results.len() >= max_results {
                break;
            }
            let mut visited = FxHashSet::default();
            let mut path = Vec::new();
            inner.collect_paths(
                start,
                &targets,
                rel_type,
                path_filter,
                &mut visited,
                &mut path,
                &mut results,
                max_results,
            );
        }

        Ok(results
            .into_iter()
            .filter_map(|slots| {
                slots
                    .into_iter()
                    .map(|slot| {
                        inner.nodes[slot]
                            .as_ref()
                            .and_then(|node| node.properties.get("id"))
                            .and_then(|value| value.as_string())
                            .map(str::to_string)
                    })
                    .collect::<Option<Vec<String>>>()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyValue;

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), PropertyValue::from(*v)))
            .collect()
    }

    fn id_selector(id: &str, diagram: &str) -> NodeSelector {
        NodeSelector::new()
            .with_property("id", id)
            .with_property("diagram_id", diagram)
    }

    #[test]
    fn test_create_and_match_nodes() {
        let graph = MemoryGraph::new();
        let busbar = Label::new("Busbar");
        graph
            .create_typed_node(&busbar, props(&[("id", "BUS1"), ("diagram_id", "d1")]))
            .unwrap();
        graph
            .create_typed_node(&busbar, props(&[("id", "BUS2"), ("diagram_id", "d1")]))
            .unwrap();
        graph
            .create_typed_node(
                &Label::new("Transformer"),
                props(&[("id", "TX1"), ("diagram_id", "d1")]),
            )
            .unwrap();

        assert_eq!(
            graph.match_nodes(Some(&busbar), &PropertyMap::new()).unwrap().len(),
            2
        );
        let matched = graph
            .match_nodes(None, &props(&[("id", "TX1")]))
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].label.as_str(), "Transformer");
    }

    #[test]
    fn test_relationship_endpoint_not_found() {
        let graph = MemoryGraph::new();
        graph
            .create_typed_node(&Label::new("Busbar"), props(&[("id", "BUS1"), ("diagram_id", "d1")]))
            .unwrap();

        let err = graph
            .create_typed_relationship(
                &id_selector("BUS1", "d1"),
                &id_selector("MISSING", "d1"),
                &RelationshipType::new("CONNECTS_TO"),
                PropertyMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, PortError::EndpointNotFound(_)));
    }

    #[test]
    fn test_detach_delete() {
        let graph = MemoryGraph::new();
        let node = Label::new("Busbar");
        graph
            .create_typed_node(&node, props(&[("id", "A"), ("diagram_id", "d1")]))
            .unwrap();
        graph
            .create_typed_node(&node, props(&[("id", "B"), ("diagram_id", "d1")]))
            .unwrap();
        graph
            .create_typed_node(&node, props(&[("id", "A"), ("diagram_id", "d2")]))
            .unwrap();
        graph
            .create_typed_relationship(
                &id_selector("A", "d1"),
                &id_selector("B", "d1"),
                &RelationshipType::new("CONNECTS_TO"),
                props(&[("diagram_id", "d1")]),
            )
            .unwrap();

        let deleted = graph.delete_matching(&props(&[("diagram_id", "d1")])).unwrap();
        assert_eq!(deleted, 2);

        // Other partition untouched, relationships gone with their nodes.
        assert_eq!(graph.match_nodes(None, &PropertyMap::new()).unwrap().len(), 1);
        assert!(graph
            .match_relationships(None, &PropertyMap::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_path_query_respects_type_constraint() {
        let graph = MemoryGraph::new();
        let node = Label::new("Busbar");
        for id in ["A", "B", "C"] {
            graph
                .create_typed_node(&node, props(&[("id", id), ("diagram_id", "d1")]))
                .unwrap();
        }
        let connects = RelationshipType::new("CONNECTS_TO");
        // A -CONNECTS_TO-> B -CONNECTS_TO-> C, plus a direct A -PROTECTS-> C
        // shortcut that must never appear in a path.
        graph
            .create_typed_relationship(
                &id_selector("A", "d1"),
                &id_selector("B", "d1"),
                &connects,
                props(&[("diagram_id", "d1")]),
            )
            .unwrap();
        graph
            .create_typed_relationship(
                &id_selector("B", "d1"),
                &id_selector("C", "d1"),
                &connects,
                props(&[("diagram_id", "d1")]),
            )
            .unwrap();
        graph
            .create_typed_relationship(
                &id_selector("A", "d1"),
                &id_selector("C", "d1"),
                &RelationshipType::new("PROTECTS"),
                props(&[("diagram_id", "d1")]),
            )
            .unwrap();

        let paths = graph
            .run_path_query(
                &id_selector("A", "d1"),
                &id_selector("C", "d1"),
                &connects,
                &props(&[("diagram_id", "d1")]),
                10,
            )
            .unwrap();
        assert_eq!(paths, vec![vec!["A".to_string(), "B".to_string(), "C".to_string()]]);
    }

    #[test]
    fn test_path_query_traverses_against_direction() {
        let graph = MemoryGraph::new();
        let node = Label::new("Busbar");
        for id in ["A", "B"] {
            graph
                .create_typed_node(&node, props(&[("id", id), ("diagram_id", "d1")]))
                .unwrap();
        }
        let connects = RelationshipType::new("CONNECTS_TO");
        graph
            .create_typed_relationship(
                &id_selector("B", "d1"),
                &id_selector("A", "d1"),
                &connects,
                props(&[("diagram_id", "d1")]),
            )
            .unwrap();

        // Edge points B -> A but the search from A must still find it.
        let paths = graph
            .run_path_query(
                &id_selector("A", "d1"),
                &id_selector("B", "d1"),
                &connects,
                &PropertyMap::new(),
                10,
            )
            .unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0], vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_path_query_result_cap() {
        let graph = MemoryGraph::new();
        let node = Label::new("Busbar");
        // Diamond with parallel middles: many A->...->Z paths.
        for id in ["A", "M1", "M2", "M3", "Z"] {
            graph
                .create_typed_node(&node, props(&[("id", id), ("diagram_id", "d1")]))
                .unwrap();
        }
        let connects = RelationshipType::new("CONNECTS_TO");
        for mid in ["M1", "M2", "M3"] {
            graph
                .create_typed_relationship(
                    &id_selector("A", "d1"),
                    &id_selector(mid, "d1"),
                    &connects,
                    PropertyMap::new(),
                )
                .unwrap();
            graph
                .create_typed_relationship(
                    &id_selector(mid, "d1"),
                    &id_selector("Z", "d1"),
                    &connects,
                    PropertyMap::new(),
                )
                .unwrap();
        }

        let paths = graph
            .run_path_query(
                &id_selector("A", "d1"),
                &id_selector("Z", "d1"),
                &connects,
                &PropertyMap::new(),
                2,
            )
            .unwrap();
        assert_eq!(paths.len(), 2);
    }
}
