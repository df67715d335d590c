//! Label and relationship-type newtypes.
//!
//! Labels and relationship types are used structurally by graph backends
//! (they name the element kind, they are not ordinary parameters), so raw
//! extraction-supplied names are sanitized and then validated against an
//! allow-list before they may become a `Label` or `RelationshipType`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Property key carried by every graph element belonging to one diagram.
/// The sole grouping/isolation mechanism across diagrams sharing a store.
pub const PARTITION_KEY: &str = "diagram_id";

/// Structural label for the per-diagram metadata node.
pub const LABEL_METADATA: &str = "Metadata";

/// Structural label for the per-diagram ontology node.
pub const LABEL_ONTOLOGY: &str = "Ontology";

/// Structural label for the optional per-diagram calculations node.
pub const LABEL_CALCULATIONS: &str = "Calculations";

/// Relationship type of a direct electrical connection.
pub const CONNECTS_TO: &str = "CONNECTS_TO";

/// Relationship type linking a relay function to the equipment it protects.
pub const PROTECTS: &str = "PROTECTS";

/// Node label of a relay function in a protection scheme.
pub const RELAY_FUNCTION: &str = "RelayFunction";

/// Error raised when a type name cannot be used as a label or
/// relationship type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid type name {raw:?}: must be alphanumeric/underscore and not start with a digit")]
pub struct TypeNameError {
    pub raw: String,
}

/// Normalize a raw extraction type name: spaces and hyphens become
/// underscores, parentheses are dropped.
fn normalize(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('_'),
            '(' | ')' => None,
            other => Some(other),
        })
        .collect()
}

fn validate(name: &str, raw: &str) -> Result<(), TypeNameError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(TypeNameError {
            raw: raw.to_string(),
        })
    }
}

/// Node label (e.g., "Transformer", "Busbar")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
    /// Build a label from a name already known to be well-formed
    /// (compile-time constants, backend-reported labels).
    pub fn new(label: impl Into<String>) -> Self {
        Label(label.into())
    }

    /// Sanitize a raw extraction type name and validate the result.
    pub fn sanitize(raw: &str) -> Result<Self, TypeNameError> {
        let name = normalize(raw);
        validate(&name, raw)?;
        Ok(Label(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the three structural element kinds that never count as
    /// diagram content.
    pub fn is_structural(&self) -> bool {
        matches!(
            self.0.as_str(),
            LABEL_METADATA | LABEL_ONTOLOGY | LABEL_CALCULATIONS
        )
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label(s.to_string())
    }
}

/// Relationship type (e.g., "CONNECTS_TO", "PROTECTS")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct RelationshipType(String);

impl RelationshipType {
    /// Build a relationship type from a name already known to be
    /// well-formed.
    pub fn new(rel_type: impl Into<String>) -> Self {
        RelationshipType(rel_type.into())
    }

    /// Sanitize a raw extraction edge type and validate the result.
    pub fn sanitize(raw: &str) -> Result<Self, TypeNameError> {
        let name = normalize(raw);
        validate(&name, raw)?;
        Ok(RelationshipType(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RelationshipType {
    fn from(s: &str) -> Self {
        RelationshipType(s.to_string())
    }
}
