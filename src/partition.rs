//! Diagram partitioning: key generation, listing and identifier resolution.
//!
//! Every graph element belonging to one ingested diagram carries the same
//! `diagram_id` property; that string is the only grouping mechanism in the
//! shared store. Keys are derived from the diagram title plus a
//! second-resolution timestamp, which is practically unique for a single
//! writer but NOT collision-free when concurrent writers ingest the same
//! title within the same second, an accepted weakness of the scheme.

use crate::graph::{Label, PropertyMap, LABEL_METADATA, PARTITION_KEY};
use crate::port::{PortError, PropertyGraphPort};
use chrono::NaiveDateTime;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PartitionError {
    /// The identifier matched neither an index nor a stored partition key.
    #[error("no diagram matches identifier {0:?}")]
    NotFound(String),

    #[error(transparent)]
    Port(#[from] PortError),
}

pub type PartitionResult<T> = Result<T, PartitionError>;

/// Time source for partition-key timestamps; injected so tests control it.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock time, local timezone (what the extraction pipeline stamps).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Fixed time source for deterministic keys in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Derive a fresh partition key from a diagram title.
///
/// The title is lower-cased; spaces, hyphens and slashes become
/// underscores, parentheses are dropped; a `%Y%m%d_%H%M%S` timestamp is
/// appended, e.g. `substation_a_20240115_093000`.
pub fn partition_key_for(title: &str, clock: &dyn Clock) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' | '/' | '\\' => Some('_'),
            '(' | ')' => None,
            other => Some(other),
        })
        .collect();
    format!("{}_{}", slug, clock.now().format("%Y%m%d_%H%M%S"))
}

/// One entry of the partition listing.
///
/// `index` is a dense 1-based rank over the current listing, re-derived on
/// every call. It is NOT stable across inserts or deletes and must never be
/// persisted as an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSummary {
    pub index: usize,
    pub partition_key: String,
    pub title: Option<String>,
    pub extracted_at: Option<String>,
}

/// List all partitions known to the store.
///
/// Reads every metadata node, orders by extraction time descending,
/// deduplicates by partition key keeping the first occurrence, and assigns
/// dense 1-based indices in that order.
pub fn list_partitions<P: PropertyGraphPort>(port: &P) -> PartitionResult<Vec<PartitionSummary>> {
    let records = port.match_nodes(Some(&Label::new(LABEL_METADATA)), &PropertyMap::new())?;

    let mut entries: Vec<(String, Option<String>, Option<String>)> = records
        .iter()
        .filter_map(|record| {
            let key = record
                .properties
                .get(PARTITION_KEY)
                .and_then(|v| v.as_string())?
                .to_string();
            let title = record
                .properties
                .get("title")
                .and_then(|v| v.as_string())
                .map(str::to_string);
            let extracted_at = record
                .properties
                .get("extracted_at")
                .and_then(|v| v.as_string())
                .map(str::to_string);
            Some((key, title, extracted_at))
        })
        .collect();

    // Most recent first; ISO-8601 strings sort chronologically.
    entries.sort_by(|a, b| b.2.cmp(&a.2));

    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut summaries = Vec::new();
    for (key, title, extracted_at) in entries {
        if !seen.insert(key.clone()) {
            continue;
        }
        summaries.push(PartitionSummary {
            index: summaries.len() + 1,
            partition_key: key,
            title,
            extracted_at,
        });
    }
    debug!(partitions = summaries.len(), "listed partitions");
    Ok(summaries)
}

/// Resolve a user-supplied identifier to a partition key.
///
/// A purely numeric identifier is always treated as a 1-based index into
/// the current listing; anything else is matched literally against stored
/// partition keys. Consequence: a partition key that is itself all digits
/// is unreachable through this function. That ambiguity is inherited,
/// documented behavior; do not "fix" it here.
pub fn resolve<P: PropertyGraphPort>(port: &P, identifier: &str) -> PartitionResult<String> {
    let listing = list_partitions(port)?;
    if let Ok(index) = identifier.parse::<usize>() {
        return listing
            .into_iter()
            .find(|summary| summary.index == index)
            .map(|summary| summary.partition_key)
            .ok_or_else(|| PartitionError::NotFound(identifier.to_string()));
    }
    listing
        .into_iter()
        .find(|summary| summary.partition_key == identifier)
        .map(|summary| summary.partition_key)
        .ok_or_else(|| PartitionError::NotFound(identifier.to_string()))
}
