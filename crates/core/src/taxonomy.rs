//! Classification of hierarchical event categories
//!
//! Event categories form a tree via their `parent` ID (0 or absent marks a
//! root). A category whose ancestor chain reaches a configured organizer
//! root is an *organizer*; the name appended to the output is that of the
//! nearest ancestor below the root, which is the category itself in the
//! direct-child case. Everything else is a plain category listed under its
//! own name.

use std::collections::HashSet;

use serde_json::Value;

use crate::cache::Partition;

/// Upper bound on parent-chain walks. A chain longer than this is treated
/// as a malformed taxonomy.
pub const MAX_PARENT_DEPTH: usize = 32;

/// Outcome of classifying one category against its partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The ancestor chain reaches the organizer root; carries the name of
    /// the nearest ancestor below the root.
    Organizer(String),
    /// Ordinary category; carries the category's own name.
    Plain(String),
    /// A parent ID partway up the chain is absent from the partition.
    /// `name` is the category's own name so the caller can still fall back
    /// to treating it as plain.
    UnresolvedParent { parent: u64, name: String },
    /// The parent chain loops or exceeds the depth bound.
    Cycle,
}

fn name_of(record: &Value) -> String {
    record
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn parent_of(record: &Value) -> u64 {
    record.get("parent").and_then(Value::as_u64).unwrap_or(0)
}

/// Classify one category by walking its parent chain upward.
///
/// Returns `None` when `id` itself is absent from the partition. The walk
/// is guarded by a visited set and `max_depth`; a malformed taxonomy with a
/// parent cycle yields [`Classification::Cycle`] instead of looping.
pub fn classify_category(
    partition: &Partition,
    id: u64,
    organizer_root: u64,
    max_depth: usize,
) -> Option<Classification> {
    let record = partition.get(&id.to_string())?;
    let own_name = name_of(record);

    let mut node = record;
    let mut visited = HashSet::from([id]);
    for _ in 0..max_depth {
        let parent = parent_of(node);
        if parent == organizer_root {
            return Some(Classification::Organizer(name_of(node)));
        }
        if parent == 0 {
            return Some(Classification::Plain(own_name));
        }
        if !visited.insert(parent) {
            return Some(Classification::Cycle);
        }
        match partition.get(&parent.to_string()) {
            Some(next) => node = next,
            None => {
                return Some(Classification::UnresolvedParent {
                    parent,
                    name: own_name,
                })
            }
        }
    }
    Some(Classification::Cycle)
}
