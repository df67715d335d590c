//! Property-graph primitives shared by the port, the ingestion writer and
//! the query engine: property values, labels and relationship types.

pub mod property;
pub mod types;

pub use property::{PropertyMap, PropertyValue};
pub use types::{
    Label, RelationshipType, TypeNameError, CONNECTS_TO, LABEL_CALCULATIONS, LABEL_METADATA,
    LABEL_ONTOLOGY, PARTITION_KEY, PROTECTS, RELAY_FUNCTION,
};
