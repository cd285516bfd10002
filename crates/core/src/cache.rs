//! Persistent reference cache for WordPress entities
//!
//! The cache is one JSON document with a top-level key per entity-type
//! partition (`categories`, `tags`, `lsvr_event_cat`, ...), each mapping
//! stringified numeric IDs to the raw entity record as last fetched. A
//! missing file is an empty cache; a file that exists but does not parse is
//! an error that propagates. Partitions replaced during a run are tracked
//! so `persist` only rewrites the document when something changed and so a
//! partition is refreshed from the network at most once per run.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::EntityType;

/// One entity-type partition: stringified ID to raw record.
pub type Partition = BTreeMap<String, Value>;

/// Errors from loading or persisting the cache document.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("failed to access cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize cache document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Type-partitioned lookup cache, persisted as a single JSON document.
#[derive(Debug)]
pub struct ReferenceCache {
    path: PathBuf,
    enabled: bool,
    partitions: BTreeMap<String, Partition>,
    updated: BTreeSet<&'static str>,
}

impl ReferenceCache {
    /// Load the cache document from `path`.
    ///
    /// When disabled, the file is neither read nor (later) written and every
    /// lookup starts from an empty partition.
    pub fn load(path: impl AsRef<Path>, enabled: bool) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let mut cache = Self {
            path,
            enabled,
            partitions: BTreeMap::new(),
            updated: BTreeSet::new(),
        };
        if !cache.enabled || !cache.path.exists() {
            return Ok(cache);
        }
        let text = fs::read_to_string(&cache.path).map_err(|source| CacheError::Io {
            path: cache.path.clone(),
            source,
        })?;
        cache.partitions = serde_json::from_str(&text).map_err(|source| CacheError::Parse {
            path: cache.path.clone(),
            source,
        })?;
        Ok(cache)
    }

    /// Write the document back to disk.
    ///
    /// A no-op unless the cache is enabled and at least one partition was
    /// replaced during this run.
    pub fn persist(&self) -> Result<(), CacheError> {
        if !self.enabled || self.updated.is_empty() {
            return Ok(());
        }
        let text =
            serde_json::to_string_pretty(&self.partitions).map_err(CacheError::Serialize)?;
        fs::write(&self.path, text).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Look up an entity by numeric ID (compared as its canonical string).
    pub fn lookup(&self, ty: EntityType, id: u64) -> Option<&Value> {
        self.partitions.get(ty.partition())?.get(&id.to_string())
    }

    /// Borrow a whole partition, e.g. for taxonomy walks.
    pub fn partition(&self, ty: EntityType) -> Option<&Partition> {
        self.partitions.get(ty.partition())
    }

    /// Swap a partition wholesale and mark it refreshed for this run.
    pub fn replace_partition(&mut self, ty: EntityType, entries: Partition) {
        self.partitions.insert(ty.partition().to_string(), entries);
        self.updated.insert(ty.partition());
    }

    /// Whether the partition was already refreshed from the network this
    /// run. A refreshed partition is never refreshed again; a miss against
    /// it is a definitive not-found.
    pub fn is_updated(&self, ty: EntityType) -> bool {
        self.updated.contains(ty.partition())
    }
}
