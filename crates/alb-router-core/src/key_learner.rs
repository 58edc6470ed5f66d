//! Partition key learner
//!
//! Tracks which attributes form each table's partition key, so that writes
//! can be routed by key.
//!
//! Sources, by precedence:
//! - table creation metadata and preconfigured entries (authoritative,
//!   always overwrite)
//! - key arguments of get/update/delete calls (inferred, only stored when
//!   nothing is known yet)
//!
//! Inferred names are sorted before storage: key order in a request is not
//! meaningful, so `[b, a]` and `[a, b]` learn the same schema.

use alb_types::{project, KeySchemaElement, KeyType, KeyValues};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::RouterError;

/// Where a schema entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSource {
    /// Key schema seen in a create-table call
    TableSchema,
    /// Supplied by configuration before traffic
    Preconfigured,
    /// Guessed from a key argument
    Inferred,
}

impl SchemaSource {
    pub fn is_authoritative(&self) -> bool {
        !matches!(self, SchemaSource::Inferred)
    }
}

/// A learned partition key schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub attributes: Arc<[String]>,
    pub source: SchemaSource,
}

/// Concurrent table → partition key map
#[derive(Debug, Default)]
pub struct PartitionKeyLearner {
    schemas: DashMap<String, SchemaEntry>,
}

impl PartitionKeyLearner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a learner with preconfigured entries
    pub fn with_preconfigured(partition_keys: &HashMap<String, Vec<String>>) -> Self {
        let learner = Self::new();
        for (table, attributes) in partition_keys {
            learner.preconfigure(table, attributes.clone());
        }
        learner
    }

    fn store_authoritative(&self, table: &str, attributes: Vec<String>, source: SchemaSource) {
        if attributes.is_empty() {
            debug!(table = %table, "Ignoring empty partition key schema");
            return;
        }
        debug!(table = %table, attributes = ?attributes, source = ?source, "Learned partition key");
        self.schemas.insert(
            table.to_string(),
            SchemaEntry {
                attributes: attributes.into(),
                source,
            },
        );
    }

    /// Learn from table creation metadata; overwrites any previous entry
    pub fn learn_from_table_schema(&self, table: &str, ordered_attributes: Vec<String>) {
        self.store_authoritative(table, ordered_attributes, SchemaSource::TableSchema);
    }

    /// Learn the partition key (HASH elements) of a create-table key schema
    pub fn learn_from_key_schema(&self, table: &str, key_schema: &[KeySchemaElement]) {
        let hash_keys = key_schema
            .iter()
            .filter(|e| e.key_type == KeyType::Hash)
            .map(|e| e.attribute_name.clone())
            .collect();
        self.learn_from_table_schema(table, hash_keys);
    }

    /// Supply a schema out of band, for tables only written by unconditional puts
    pub fn preconfigure(&self, table: &str, ordered_attributes: Vec<String>) {
        self.store_authoritative(table, ordered_attributes, SchemaSource::Preconfigured);
    }

    /// Learn from a key argument. Only stores when the table is unknown;
    /// returns whether this call stored the entry.
    pub fn learn_from_key_argument<I, S>(&self, table: &str, attribute_names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = attribute_names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return false;
        }
        names.sort();
        names.dedup();

        // Entry holds the shard lock: concurrent first learners serialize
        // here and later ones see an occupied slot.
        match self.schemas.entry(table.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                debug!(table = %table, attributes = ?names, "Inferred partition key");
                slot.insert(SchemaEntry {
                    attributes: names.into(),
                    source: SchemaSource::Inferred,
                });
                true
            }
        }
    }

    /// Partition key attributes of `table`
    pub fn lookup(&self, table: &str) -> Option<Arc<[String]>> {
        self.schemas.get(table).map(|e| e.attributes.clone())
    }

    /// Full entry, including its source
    pub fn entry(&self, table: &str) -> Option<SchemaEntry> {
        self.schemas.get(table).map(|e| e.value().clone())
    }

    /// Narrow a key argument to the known partition key.
    ///
    /// Falls back to the whole argument when the schema is unknown or does
    /// not fit; the result is still stable for that key.
    pub fn partition_key_of(&self, table: &str, key: &KeyValues) -> KeyValues {
        self.lookup(table)
            .and_then(|attrs| project(key, &attrs))
            .unwrap_or_else(|| key.clone())
    }

    /// Extract the partition key from a full item payload
    pub fn partition_key_of_item(&self, table: &str, item: &KeyValues) -> Result<KeyValues, RouterError> {
        self.lookup(table)
            .and_then(|attrs| project(item, &attrs))
            .ok_or_else(|| RouterError::SchemaUnknown(table.to_string()))
    }

    /// Number of known tables
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
