//! End-to-end tests over the diagram store facade with the in-memory
//! backend.

use oneline_graph::model::{self, Diagram};
use oneline_graph::port::MemoryGraph;
use oneline_graph::query::{EdgeFilter, NodeFilter};
use oneline_graph::store::DiagramStore;
use oneline_graph::{FixedClock, IngestError, PartitionError};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn fixed_clock(second: u32) -> FixedClock {
    FixedClock(
        chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, second)
            .unwrap(),
    )
}

/// Grid source feeding a bus through a transformer.
fn substation_a() -> Diagram {
    model::parse_value(json!({
        "metadata": {
            "title": "Substation A",
            "source_image": "substation-a.png",
            "extracted_at": "2024-01-15T09:30:00"
        },
        "ontology": {
            "node_types": {
                "GridSource": {"attrs": ["voltage_kv"]},
                "Transformer": {"attrs": ["mva_ratings"]},
                "Busbar": {"attrs": ["voltage_kv"]}
            },
            "edge_types": {
                "CONNECTS_TO": {"attrs": ["via"]}
            }
        },
        "nodes": [
            {"id": "GS_A", "type": "GridSource", "name": "Grid A", "voltage_kv": 115},
            {"id": "TX1", "type": "Transformer", "name": "Main TX"},
            {"id": "BUS1", "type": "Busbar", "name": "Main Bus", "voltage_kv": 13.8}
        ],
        "edges": [
            {"from": "GS_A", "type": "CONNECTS_TO", "to": "TX1"},
            {"from": "TX1", "type": "CONNECTS_TO", "to": "BUS1", "via": "cable"}
        ]
    }))
    .unwrap()
}

/// A second diagram reusing the node ids of the first.
fn substation_b() -> Diagram {
    model::parse_value(json!({
        "metadata": {
            "title": "Substation B",
            "extracted_at": "2024-02-01T12:00:00"
        },
        "ontology": {"node_types": {}, "edge_types": {}},
        "nodes": [
            {"id": "BUS1", "type": "Busbar", "name": "B Bus"},
            {"id": "TX1", "type": "Transformer"},
            {"id": "R51", "type": "RelayFunction", "device_code": "51",
             "description": "overcurrent"}
        ],
        "edges": [
            {"from": "TX1", "type": "CONNECTS_TO", "to": "BUS1"},
            {"from": "R51", "type": "PROTECTS", "to": "TX1", "notes": "primary"}
        ]
    }))
    .unwrap()
}

#[test]
fn example_scenario() {
    init_tracing();
    let store = DiagramStore::with_clock(MemoryGraph::new(), fixed_clock(0));

    let report = store.ingest(&substation_a(), None).unwrap();
    assert_eq!(report.partition_key, "substation_a_20240115_093000");
    assert_eq!(report.nodes_created, 3);
    assert_eq!(report.relationships_created, 2);

    let summary = store.summary(Some(report.partition_key.as_str())).unwrap();
    assert_eq!(summary.node_counts.get("GridSource"), Some(&1));
    assert_eq!(summary.node_counts.get("Transformer"), Some(&1));
    assert_eq!(summary.node_counts.get("Busbar"), Some(&1));

    let paths = store
        .electrical_paths("GS_A", "BUS1", Some(report.partition_key.as_str()))
        .unwrap();
    assert_eq!(
        paths,
        vec![vec![
            "GS_A".to_string(),
            "TX1".to_string(),
            "BUS1".to_string()
        ]]
    );
}

#[test]
fn round_trip_totals_match_the_diagram() {
    let store = DiagramStore::new(MemoryGraph::new());
    let diagram = substation_a();
    let report = store.ingest(&diagram, Some("sub_a")).unwrap();

    let summary = store.summary(Some(report.partition_key.as_str())).unwrap();
    assert_eq!(summary.total_nodes, diagram.nodes.len());
    assert_eq!(summary.total_relationships, diagram.edges.len());
    assert_eq!(
        summary.metadata.get("title").and_then(|v| v.as_string()),
        Some("Substation A")
    );
}

#[test]
fn partition_isolation_with_shared_node_ids() {
    let store = DiagramStore::new(MemoryGraph::new());
    store.ingest(&substation_a(), Some("sub_a")).unwrap();
    store.ingest(&substation_b(), Some("sub_b")).unwrap();

    // Both diagrams contain BUS1 and TX1; scoped queries never mix them.
    let a = store.summary(Some("sub_a")).unwrap();
    assert_eq!(a.total_nodes, 3);
    assert_eq!(a.total_relationships, 2);
    assert!(a.node_counts.get("RelayFunction").is_none());

    let b = store.summary(Some("sub_b")).unwrap();
    assert_eq!(b.total_nodes, 3);
    assert_eq!(b.node_counts.get("GridSource"), None);

    let a_nodes = store
        .list_nodes(&NodeFilter {
            partition_key: Some("sub_a".to_string()),
            node_type: Some("Busbar".to_string()),
        })
        .unwrap();
    assert_eq!(a_nodes.len(), 1);
    assert_eq!(a_nodes[0].name.as_deref(), Some("Main Bus"));

    // Paths in one partition never borrow the other's connections.
    let paths = store.electrical_paths("GS_A", "BUS1", Some("sub_b")).unwrap();
    assert!(paths.is_empty());
}

#[test]
fn listing_index_is_ephemeral() {
    let store = DiagramStore::new(MemoryGraph::new());
    // extracted_at drives the ordering: c is newest, then b, then a.
    let mut a = substation_a();
    a.metadata["extracted_at"] = json!("2024-01-01T00:00:00");
    let mut b = substation_a();
    b.metadata["extracted_at"] = json!("2024-01-02T00:00:00");
    let mut c = substation_a();
    c.metadata["extracted_at"] = json!("2024-01-03T00:00:00");
    store.ingest(&a, Some("part_a")).unwrap();
    store.ingest(&b, Some("part_b")).unwrap();
    store.ingest(&c, Some("part_c")).unwrap();

    let listing = store.list_partitions().unwrap();
    assert_eq!(
        listing.iter().map(|p| p.partition_key.as_str()).collect::<Vec<_>>(),
        vec!["part_c", "part_b", "part_a"]
    );

    // Two calls with no intervening writes agree.
    assert_eq!(store.list_partitions().unwrap(), listing);

    // Deleting #2 re-ranks the rest without changing which key is which.
    store.delete("part_b").unwrap();
    let listing = store.list_partitions().unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].index, 1);
    assert_eq!(listing[0].partition_key, "part_c");
    assert_eq!(listing[1].index, 2);
    assert_eq!(listing[1].partition_key, "part_a");

    assert_eq!(store.resolve("2").unwrap(), "part_a");
    assert_eq!(store.resolve("part_c").unwrap(), "part_c");
}

#[test]
fn dangling_edge_never_reaches_the_store() {
    let store = DiagramStore::new(MemoryGraph::new());
    let mut diagram = substation_a();
    diagram.edges.push(
        serde_json::from_value(json!({
            "from": "BUS1", "type": "CONNECTS_TO", "to": "FEEDER9"
        }))
        .unwrap(),
    );

    let err = store.ingest(&diagram, Some("sub_a")).unwrap_err();
    assert!(matches!(err, IngestError::Validation(_)));
    assert_eq!(store.summary(None).unwrap().total_nodes, 0);
    assert!(store.list_partitions().unwrap().is_empty());
}

#[test]
fn paths_never_use_non_connects_relationships() {
    let store = DiagramStore::new(MemoryGraph::new());
    store.ingest(&substation_b(), Some("sub_b")).unwrap();

    // R51 -PROTECTS-> TX1 -CONNECTS_TO-> BUS1: no CONNECTS_TO-only route
    // from R51 to BUS1 exists even though a mixed-type one does.
    let paths = store.electrical_paths("R51", "BUS1", Some("sub_b")).unwrap();
    assert!(paths.is_empty());

    let paths = store.electrical_paths("TX1", "BUS1", Some("sub_b")).unwrap();
    assert_eq!(paths, vec![vec!["TX1".to_string(), "BUS1".to_string()]]);
}

#[test]
fn deletion_completeness() {
    let store = DiagramStore::new(MemoryGraph::new());
    store.ingest(&substation_a(), Some("sub_a")).unwrap();
    store.ingest(&substation_b(), Some("sub_b")).unwrap();

    let report = store.delete("sub_a").unwrap();
    // 3 domain nodes + metadata + ontology.
    assert_eq!(report.nodes_deleted, 5);
    assert_eq!(report.relationships_deleted, 2);

    let summary = store.summary(Some("sub_a")).unwrap();
    assert_eq!(summary.total_nodes, 0);
    assert_eq!(summary.total_relationships, 0);
    assert!(summary.metadata.is_empty());
    assert!(store
        .electrical_paths("GS_A", "BUS1", Some("sub_a"))
        .unwrap()
        .is_empty());
    assert!(matches!(
        store.resolve("sub_a").unwrap_err(),
        PartitionError::NotFound(_)
    ));

    // The survivor is untouched.
    assert_eq!(store.summary(Some("sub_b")).unwrap().total_nodes, 3);
}

#[test]
fn protection_schemes_cross_partitions_until_scoped() {
    let store = DiagramStore::new(MemoryGraph::new());
    store.ingest(&substation_a(), Some("sub_a")).unwrap();
    store.ingest(&substation_b(), Some("sub_b")).unwrap();

    let global = store.protection_schemes().unwrap();
    assert_eq!(global.len(), 1);
    assert_eq!(global[0].relay_id, "R51");
    assert_eq!(global[0].device_code.as_deref(), Some("51"));
    assert_eq!(global[0].protected_id, "TX1");
    assert_eq!(global[0].protected_type, "Transformer");
    assert_eq!(global[0].notes.as_deref(), Some("primary"));

    assert!(store.protection_schemes_in("sub_a").unwrap().is_empty());
    assert_eq!(store.protection_schemes_in("sub_b").unwrap().len(), 1);
}

#[test]
fn reingest_after_delete_replaces_a_diagram() {
    let store = DiagramStore::new(MemoryGraph::new());
    store.ingest(&substation_a(), Some("sub_a")).unwrap();

    // Whole-diagram update: delete, then ingest the revised extraction
    // under the same key.
    store.delete("sub_a").unwrap();
    let mut revised = substation_a();
    revised.nodes.push(
        serde_json::from_value(json!({"id": "BUS2", "type": "Busbar"})).unwrap(),
    );
    let report = store.ingest(&revised, Some("sub_a")).unwrap();
    assert_eq!(report.nodes_created, 4);

    let summary = store.summary(Some("sub_a")).unwrap();
    assert_eq!(summary.total_nodes, 4);
    assert_eq!(summary.node_counts.get("Busbar"), Some(&2));
    assert_eq!(store.list_partitions().unwrap().len(), 1);
}

#[test]
fn edge_listing_and_single_node_lookup() {
    let store = DiagramStore::new(MemoryGraph::new());
    store.ingest(&substation_a(), Some("sub_a")).unwrap();
    store.ingest(&substation_b(), Some("sub_b")).unwrap();

    let edges = store
        .list_edges(&EdgeFilter {
            partition_key: Some("sub_a".to_string()),
            edge_type: None,
        })
        .unwrap();
    assert_eq!(edges.len(), 2);
    assert!(edges.iter().all(|e| e.edge_type == "CONNECTS_TO"));
    assert_eq!(edges[0].from, "GS_A");
    assert_eq!(edges[0].to, "TX1");

    let protects = store
        .list_edges(&EdgeFilter {
            partition_key: None,
            edge_type: Some("PROTECTS".to_string()),
        })
        .unwrap();
    assert_eq!(protects.len(), 1);
    assert_eq!(protects[0].from, "R51");

    let node = store.get_node("R51").unwrap();
    assert_eq!(node.node_type, "RelayFunction");
    assert_eq!(
        node.properties.get("device_code").and_then(|v| v.as_string()),
        Some("51")
    );
}

#[test]
fn node_connections_report_direction() {
    let store = DiagramStore::new(MemoryGraph::new());
    store.ingest(&substation_b(), Some("sub_b")).unwrap();

    let connections = store.node_connections("TX1").unwrap();
    assert_eq!(connections.len(), 2);
    assert!(connections.iter().any(|c| {
        c.node_id == "BUS1" && c.relationship_type == "CONNECTS_TO" && c.direction.to_string() == "outgoing"
    }));
    assert!(connections.iter().any(|c| {
        c.node_id == "R51" && c.relationship_type == "PROTECTS" && c.direction.to_string() == "incoming"
    }));
}

#[test]
fn minted_keys_follow_title_and_clock() {
    let store = DiagramStore::with_clock(MemoryGraph::new(), fixed_clock(5));
    let report = store.ingest(&substation_b(), None).unwrap();
    assert_eq!(report.partition_key, "substation_b_20240115_093005");
    assert_eq!(store.resolve("1").unwrap(), report.partition_key);
}
