//! Core library for wpexport
//!
//! This crate implements the **Functional Core** of the wpexport application:
//! pure transformation and classification logic with zero I/O, while the
//! `wpexport` binary crate owns HTTP, process configuration, and
//! orchestration.
//!
//! # Module Organization
//!
//! - [`fieldmap`]: Declarative per-content-type field specifications and the
//!   pure parts of applying them (path walking, renaming, HTML unescaping)
//! - [`taxonomy`]: Classification of hierarchical event categories into
//!   plain categories and organizers
//! - [`cache`]: The type-partitioned reference cache document and its disk
//!   representation
//! - [`text`]: Small text helpers shared by the CLI output formatters
//!
//! Everything that touches the network (reference resolution, media and
//! attachment fetching) lives in the binary crate and calls back into the
//! functions defined here with plain `serde_json::Value` data, so the whole
//! mapping engine is testable from fixtures without mocking.

use std::fmt;

pub mod cache;
pub mod fieldmap;
pub mod taxonomy;
pub mod text;

/// Content types known to the WordPress integration.
///
/// The endpoint path below the API root doubles as the name of the entity's
/// cache partition, matching the layout of the persisted cache document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Post,
    Event,
    Media,
    Category,
    Tag,
    EventCategory,
    EventTag,
    User,
}

impl EntityType {
    /// REST endpoint path relative to the API root.
    pub fn endpoint(&self) -> &'static str {
        match self {
            EntityType::Post => "posts",
            EntityType::Event => "lsvr_event",
            EntityType::Media => "media",
            EntityType::Category => "categories",
            EntityType::Tag => "tags",
            EntityType::EventCategory => "lsvr_event_cat",
            EntityType::EventTag => "lsvr_event_tag",
            EntityType::User => "users",
        }
    }

    /// Name of this type's partition in the reference cache.
    pub fn partition(&self) -> &'static str {
        self.endpoint()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}
