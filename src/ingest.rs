//! Ingestion writer: persists one diagram as a sequence of partitioned
//! graph writes.
//!
//! Write order is metadata, ontology, nodes, relationships, calculations,
//! every element tagged with the partition key. The store is not assumed to
//! offer multi-statement transactions, so there is no rollback: a failure
//! partway through surfaces as [`IngestError::PartialWrite`] carrying the
//! counts already committed, and the caller decides whether to
//! delete-and-retry.

use crate::graph::{
    Label, PropertyMap, PropertyValue, RelationshipType, TypeNameError, LABEL_CALCULATIONS,
    LABEL_METADATA, LABEL_ONTOLOGY, PARTITION_KEY,
};
use crate::model::{Diagram, ValidationError};
use crate::partition::{partition_key_for, Clock, SystemClock};
use crate::port::{NodeSelector, PortError, PropertyGraphPort};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Title used for key derivation when metadata carries no usable title.
const FALLBACK_TITLE: &str = "unknown_diagram";

static SYSTEM_CLOCK: SystemClock = SystemClock;

/// Which of the five ordered writes failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    Metadata,
    Ontology,
    Nodes,
    Relationships,
    Calculations,
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteStep::Metadata => "metadata",
            WriteStep::Ontology => "ontology",
            WriteStep::Nodes => "nodes",
            WriteStep::Relationships => "relationships",
            WriteStep::Calculations => "calculations",
        };
        write!(f, "{}", name)
    }
}

/// Root cause of a failed write step.
#[derive(Error, Debug)]
pub enum IngestFailure {
    /// A relationship endpoint was absent under the partition key;
    /// typically the caller ingested the endpoints under a different key.
    #[error("relationship endpoint missing: {from} -> {to}")]
    DanglingReference { from: String, to: String },

    #[error(transparent)]
    InvalidTypeName(#[from] TypeNameError),

    #[error("could not serialize {field}: {source}")]
    Serialize {
        field: &'static str,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Port(#[from] PortError),
}

#[derive(Error, Debug)]
pub enum IngestError {
    /// The diagram failed its invariants; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A write step failed after earlier steps had committed.
    #[error(
        "ingest into partition {partition_key} failed at the {step} step \
         ({nodes_created} nodes, {relationships_created} relationships already committed): {source}"
    )]
    PartialWrite {
        partition_key: String,
        step: WriteStep,
        nodes_created: usize,
        relationships_created: usize,
        #[source]
        source: IngestFailure,
    },
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Outcome of a completed ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub partition_key: String,
    pub nodes_created: usize,
    pub relationships_created: usize,
    pub metadata_stored: bool,
    pub ontology_stored: bool,
    pub calculations_stored: bool,
}

/// Writes diagrams through a property-graph port.
pub struct IngestionWriter<'a, P: PropertyGraphPort> {
    port: &'a P,
    clock: &'a dyn Clock,
}

impl<'a, P: PropertyGraphPort> IngestionWriter<'a, P> {
    pub fn new(port: &'a P) -> Self {
        Self {
            port,
            clock: &SYSTEM_CLOCK,
        }
    }

    /// Use an explicit time source for partition-key minting.
    pub fn with_clock(port: &'a P, clock: &'a dyn Clock) -> Self {
        Self { port, clock }
    }

    /// Persist a diagram, minting a partition key from the metadata title
    /// when the caller does not supply one.
    pub fn ingest(
        &self,
        diagram: &Diagram,
        partition_key: Option<&str>,
    ) -> IngestResult<IngestReport> {
        diagram.validate()?;

        let partition_key = match partition_key {
            Some(key) => key.to_string(),
            None => partition_key_for(diagram.title().unwrap_or(FALLBACK_TITLE), self.clock),
        };

        let mut nodes_created = 0usize;
        let mut relationships_created = 0usize;
        let fail = |step, nodes_created, relationships_created, source: IngestFailure| {
            IngestError::PartialWrite {
                partition_key: partition_key.clone(),
                step,
                nodes_created,
                relationships_created,
                source,
            }
        };

        // 1. Metadata node.
        let mut metadata_props: PropertyMap = diagram
            .metadata
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), PropertyValue::from_json(value)))
            .collect();
        metadata_props.insert(PARTITION_KEY.to_string(), partition_key.as_str().into());
        self.port
            .create_typed_node(&Label::new(LABEL_METADATA), metadata_props)
            .map_err(|e| fail(WriteStep::Metadata, 0, 0, e.into()))?;
        debug!(partition_key = %partition_key, "stored metadata");

        // 2. Ontology node; type maps are stored as JSON strings.
        let node_types = serde_json::to_string(&diagram.ontology.node_types).map_err(|e| {
            fail(
                WriteStep::Ontology,
                0,
                0,
                IngestFailure::Serialize {
                    field: "node_types",
                    source: e,
                },
            )
        })?;
        let edge_types = serde_json::to_string(&diagram.ontology.edge_types).map_err(|e| {
            fail(
                WriteStep::Ontology,
                0,
                0,
                IngestFailure::Serialize {
                    field: "edge_types",
                    source: e,
                },
            )
        })?;
        let mut ontology_props = PropertyMap::new();
        ontology_props.insert(PARTITION_KEY.to_string(), partition_key.as_str().into());
        ontology_props.insert("node_types".to_string(), node_types.into());
        ontology_props.insert("edge_types".to_string(), edge_types.into());
        self.port
            .create_typed_node(&Label::new(LABEL_ONTOLOGY), ontology_props)
            .map_err(|e| fail(WriteStep::Ontology, 0, 0, e.into()))?;
        debug!(partition_key = %partition_key, "stored ontology");

        // 3. Domain nodes, labelled by their sanitized type.
        for node in &diagram.nodes {
            let label = Label::sanitize(&node.node_type).map_err(|e| {
                fail(WriteStep::Nodes, nodes_created, 0, e.into())
            })?;
            let mut props = PropertyMap::new();
            props.insert("id".to_string(), node.id.as_str().into());
            if let Some(name) = &node.name {
                props.insert("name".to_string(), name.as_str().into());
            }
            props.insert(PARTITION_KEY.to_string(), partition_key.as_str().into());
            for (key, value) in &node.extra_attrs {
                if !value.is_null() {
                    props.insert(key.clone(), PropertyValue::from_json(value));
                }
            }
            self.port
                .create_typed_node(&label, props)
                .map_err(|e| fail(WriteStep::Nodes, nodes_created, 0, e.into()))?;
            nodes_created += 1;
        }
        debug!(partition_key = %partition_key, nodes_created, "stored nodes");

        // 4. Relationships; endpoints matched within the same partition.
        for edge in &diagram.edges {
            let rel_type = RelationshipType::sanitize(&edge.edge_type).map_err(|e| {
                fail(
                    WriteStep::Relationships,
                    nodes_created,
                    relationships_created,
                    e.into(),
                )
            })?;
            let from = NodeSelector::new()
                .with_property("id", edge.from.as_str())
                .with_property(PARTITION_KEY, partition_key.as_str());
            let to = NodeSelector::new()
                .with_property("id", edge.to.as_str())
                .with_property(PARTITION_KEY, partition_key.as_str());

            let mut props = PropertyMap::new();
            if let Some(via) = &edge.via {
                props.insert("via".to_string(), via.as_str().into());
            }
            if let Some(notes) = &edge.notes {
                props.insert("notes".to_string(), notes.as_str().into());
            }
            props.insert(PARTITION_KEY.to_string(), partition_key.as_str().into());
            for (key, value) in &edge.extra_attrs {
                if !value.is_null() {
                    props.insert(key.clone(), PropertyValue::from_json(value));
                }
            }

            self.port
                .create_typed_relationship(&from, &to, &rel_type, props)
                .map_err(|e| {
                    let source = match e {
                        PortError::EndpointNotFound(_) => IngestFailure::DanglingReference {
                            from: edge.from.clone(),
                            to: edge.to.clone(),
                        },
                        other => other.into(),
                    };
                    fail(
                        WriteStep::Relationships,
                        nodes_created,
                        relationships_created,
                        source,
                    )
                })?;
            relationships_created += 1;
        }
        debug!(partition_key = %partition_key, relationships_created, "stored relationships");

        // 5. Calculations node, when present.
        let calculations_stored = match &diagram.calculations {
            Some(calculations) => {
                let short_circuit =
                    serde_json::to_string(&calculations.short_circuit).map_err(|e| {
                        fail(
                            WriteStep::Calculations,
                            nodes_created,
                            relationships_created,
                            IngestFailure::Serialize {
                                field: "short_circuit",
                                source: e,
                            },
                        )
                    })?;
                let breaker_spec =
                    serde_json::to_string(&calculations.breaker_spec).map_err(|e| {
                        fail(
                            WriteStep::Calculations,
                            nodes_created,
                            relationships_created,
                            IngestFailure::Serialize {
                                field: "breaker_spec",
                                source: e,
                            },
                        )
                    })?;
                let mut props = PropertyMap::new();
                props.insert(PARTITION_KEY.to_string(), partition_key.as_str().into());
                props.insert("short_circuit".to_string(), short_circuit.into());
                props.insert("breaker_spec".to_string(), breaker_spec.into());
                self.port
                    .create_typed_node(&Label::new(LABEL_CALCULATIONS), props)
                    .map_err(|e| {
                        fail(
                            WriteStep::Calculations,
                            nodes_created,
                            relationships_created,
                            e.into(),
                        )
                    })?;
                true
            }
            None => false,
        };

        info!(
            partition_key = %partition_key,
            nodes_created,
            relationships_created,
            "ingested diagram"
        );
        Ok(IngestReport {
            partition_key,
            nodes_created,
            relationships_created,
            metadata_stored: true,
            ontology_stored: true,
            calculations_stored,
        })
    }
}
