use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use wpexport_core::cache::{Partition, ReferenceCache};
use wpexport_core::fieldmap::{self, Conversion};
use wpexport_core::taxonomy::{classify_category, Classification, MAX_PARENT_DEPTH};
use wpexport_core::EntityType;

use crate::config::WpConfig;
use crate::prelude::*;
use crate::transport::{PageQuery, Transport};

/// Where the reference cache lives, relative to the working directory.
const CACHE_FILE: &str = "cache.json";

/// Depth at which fetching conversions stop resolving.
///
/// Media records map without further fetches, so depth 1 is the deepest
/// level that actually resolves anything; the bound keeps the recursion
/// finite even if a future specification were to reference itself.
const MAX_RESOLVE_DEPTH: usize = 2;

/// WordPress client: transport plus the per-run reference cache.
///
/// One instance is constructed per run and owns all mutable state; there
/// are no process-wide singletons. The cache document is loaded on
/// construction and flushed through [`WpClient::persist_cache`] once the
/// run succeeded.
pub struct WpClient {
    transport: Transport,
    cache: ReferenceCache,
}

impl WpClient {
    pub fn new(config: &WpConfig, use_cache: bool) -> Result<Self> {
        let transport = Transport::new(config)?;
        let cache = ReferenceCache::load(CACHE_FILE, use_cache)?;
        Ok(Self { transport, cache })
    }

    /// Flush the reference cache if any partition changed this run.
    pub fn persist_cache(&self) -> Result<()> {
        self.cache.persist()?;
        Ok(())
    }

    /// Fetch one page of posts and normalize each record: category and tag
    /// names, author name, then the post field specification.
    pub async fn get_posts(&mut self, query: PageQuery) -> Result<Vec<Value>> {
        let posts = self.fetch_page(EntityType::Post, query).await?;
        let mut normalized = Vec::with_capacity(posts.len());
        for post in &posts {
            let mut record = Map::new();
            record.insert("categories".to_string(), json!([]));
            record.insert("tags".to_string(), json!([]));

            for cat_id in id_list(post, "categories") {
                match self.reference(EntityType::Category, cat_id).await? {
                    Some(cat) => push_name(&mut record, "categories", term_name(&cat)),
                    None => log::warn!("post category {cat_id} unknown"),
                }
            }
            for tag_id in id_list(post, "tags") {
                match self.reference(EntityType::Tag, tag_id).await? {
                    Some(tag) => push_name(&mut record, "tags", term_name(&tag)),
                    None => log::warn!("post tag {tag_id} unknown"),
                }
            }

            self.apply_spec(EntityType::Post, post, &mut record, 0).await?;
            self.fill_author(post, &mut record).await?;
            normalized.push(Value::Object(record));
        }
        Ok(normalized)
    }

    /// Fetch one page of events and normalize each record: classified
    /// categories and organizers, tag names, the event field specification,
    /// and an author-name fallback via the user cache.
    pub async fn get_events(&mut self, query: PageQuery, organizer_root: u64) -> Result<Vec<Value>> {
        let events = self.fetch_page(EntityType::Event, query).await?;
        let mut normalized = Vec::with_capacity(events.len());
        for event in &events {
            normalized.push(Value::Object(self.normalize_event(event, organizer_root).await?));
        }
        Ok(normalized)
    }

    async fn normalize_event(
        &mut self,
        event: &Value,
        organizer_root: u64,
    ) -> Result<Map<String, Value>> {
        let mut record = Map::new();
        record.insert("categories".to_string(), json!([]));
        record.insert("tags".to_string(), json!([]));
        record.insert("organizer".to_string(), json!([]));

        for cat_id in id_list(event, "lsvr_event_cat") {
            match self.classify_event_category(cat_id, organizer_root).await? {
                Some(Classification::Organizer(name)) => {
                    push_name(&mut record, "organizer", name)
                }
                Some(Classification::Plain(name)) => push_name(&mut record, "categories", name),
                Some(Classification::UnresolvedParent { parent, name }) => {
                    // A dead-end chain still counts as a plain category.
                    log::debug!("event category {cat_id}: parent {parent} unknown");
                    push_name(&mut record, "categories", name);
                }
                Some(Classification::Cycle) => {
                    log::warn!("event category {cat_id} has a cyclic parent chain, skipping")
                }
                None => log::warn!("event category {cat_id} unknown"),
            }
        }
        for tag_id in id_list(event, "lsvr_event_tag") {
            match self.reference(EntityType::EventTag, tag_id).await? {
                Some(tag) => push_name(&mut record, "tags", term_name(&tag)),
                None => log::warn!("event tag {tag_id} unknown"),
            }
        }

        self.apply_spec(EntityType::Event, event, &mut record, 0).await?;
        self.fill_author(event, &mut record).await?;
        Ok(record)
    }

    /// Classify a category, retrying once after a partition refresh when
    /// the parent chain dead-ends on records only known from a stale disk
    /// cache.
    async fn classify_event_category(
        &mut self,
        id: u64,
        organizer_root: u64,
    ) -> Result<Option<Classification>> {
        let ty = EntityType::EventCategory;
        if self.reference(ty, id).await?.is_none() {
            return Ok(None);
        }
        let mut outcome = self.classify_local(id, organizer_root);
        if matches!(outcome, Some(Classification::UnresolvedParent { .. }))
            && !self.cache.is_updated(ty)
        {
            self.refresh_partition(ty).await?;
            outcome = self.classify_local(id, organizer_root);
        }
        Ok(outcome)
    }

    fn classify_local(&self, id: u64, organizer_root: u64) -> Option<Classification> {
        let partition = self.cache.partition(EntityType::EventCategory)?;
        classify_category(partition, id, organizer_root, MAX_PARENT_DEPTH)
    }

    /// Fall back to the author's user record when the mapping produced no
    /// author name of its own.
    async fn fill_author(&mut self, source: &Value, record: &mut Map<String, Value>) -> Result<()> {
        let has_name = record
            .get("authorName")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.is_empty());
        if has_name {
            return Ok(());
        }
        let Some(author_id) = source.get("author").and_then(Value::as_u64).filter(|id| *id > 0)
        else {
            return Ok(());
        };
        match self.reference(EntityType::User, author_id).await? {
            Some(user) => {
                if let Some(name) = user.get("name").and_then(Value::as_str) {
                    record.insert("authorName".to_string(), Value::String(name.to_string()));
                }
            }
            None => log::warn!("author {author_id} unknown"),
        }
        Ok(())
    }

    /// Apply the field specification for `ty` from `source` into `target`,
    /// in specification order. A nested path that misses partway skips the
    /// field; fetching conversions recurse with an explicit `depth` and are
    /// skipped once [`MAX_RESOLVE_DEPTH`] is reached.
    fn apply_spec<'a>(
        &'a mut self,
        ty: EntityType,
        source: &'a Value,
        target: &'a mut Map<String, Value>,
        depth: usize,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            for (path, rule) in fieldmap::field_spec(ty) {
                let Some(value) = fieldmap::resolve_path(source, path) else {
                    continue;
                };
                let key = fieldmap::output_key(path, rule);
                match rule.conversion {
                    Conversion::Copy | Conversion::Unescape => {
                        target.insert(
                            key.to_string(),
                            fieldmap::convert_scalar(rule.conversion, value),
                        );
                    }
                    Conversion::ResolveMedia if depth < MAX_RESOLVE_DEPTH => {
                        self.resolve_media(value, key, target, depth).await?;
                    }
                    Conversion::ResolveAttachments if depth < MAX_RESOLVE_DEPTH => {
                        self.resolve_attachments(value, key, target, depth).await?;
                    }
                    _ => log::debug!("skipping {path}: resolve depth exhausted"),
                }
            }
            Ok(())
        })
    }

    /// Resolve a featured-media ID into a mapped media record.
    ///
    /// ID 0 means "no featured media" and is skipped. An entry already
    /// resolved into the target's attachments is reused instead of fetched
    /// again; an ID that cannot be fetched is a warning, not an error.
    async fn resolve_media(
        &mut self,
        value: &Value,
        key: &str,
        target: &mut Map<String, Value>,
        depth: usize,
    ) -> Result<()> {
        let Some(media_id) = value.as_u64().filter(|id| *id > 0) else {
            return Ok(());
        };
        if let Some(existing) = find_attachment(target, media_id) {
            log::debug!("using attachment {media_id} for {key}");
            target.insert(key.to_string(), existing);
            return Ok(());
        }
        let media = match self
            .transport
            .get(&format!("media/{media_id}"), PageQuery::default())
            .await
        {
            Ok(entity) if entity.get("id").is_some() => entity,
            Ok(_) => {
                log::warn!("media {media_id} not found");
                return Ok(());
            }
            Err(err) => {
                log::warn!("media {media_id} could not be fetched: {err}");
                return Ok(());
            }
        };
        let mut mapped = Map::new();
        self.apply_spec(EntityType::Media, &media, &mut mapped, depth + 1).await?;
        target.insert(key.to_string(), Value::Object(mapped));
        Ok(())
    }

    /// Resolve the attachment-collection link of an entity into a list of
    /// mapped media records. The API exposes a single collection link per
    /// entity, so only the first descriptor is used.
    async fn resolve_attachments(
        &mut self,
        value: &Value,
        key: &str,
        target: &mut Map<String, Value>,
        depth: usize,
    ) -> Result<()> {
        let Some(href) = value
            .as_array()
            .and_then(|links| links.first())
            .and_then(|link| link.get("href"))
            .and_then(Value::as_str)
        else {
            return Ok(());
        };
        let endpoint = endpoint_from_href(self.transport.api_url(), href);
        let listing = self.transport.get(&endpoint, PageQuery::default()).await?;
        let Some(entries) = listing.as_array() else {
            return Ok(());
        };
        let mut mapped_entries = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut mapped = Map::new();
            self.apply_spec(EntityType::Media, entry, &mut mapped, depth + 1).await?;
            mapped_entries.push(Value::Object(mapped));
        }
        target.insert(key.to_string(), Value::Array(mapped_entries));
        Ok(())
    }

    /// Look up an entity by ID, refreshing the type's partition from the
    /// network at most once per run. A miss after the refresh is a
    /// definitive not-found.
    async fn reference(&mut self, ty: EntityType, id: u64) -> Result<Option<Value>> {
        if self.cache.lookup(ty, id).is_none() {
            self.refresh_partition(ty).await?;
        }
        Ok(self.cache.lookup(ty, id).cloned())
    }

    /// Re-fetch a whole partition unless it was already refreshed this run.
    async fn refresh_partition(&mut self, ty: EntityType) -> Result<()> {
        if self.cache.is_updated(ty) {
            return Ok(());
        }
        log::debug!("updating {ty} cache");
        let mut entries = Partition::new();
        for entry in self.transport.fetch_all(ty.endpoint()).await? {
            if let Some(id) = entry.get("id").and_then(Value::as_u64) {
                entries.insert(id.to_string(), entry);
            }
        }
        self.cache.replace_partition(ty, entries);
        Ok(())
    }

    async fn fetch_page(&mut self, ty: EntityType, query: PageQuery) -> Result<Vec<Value>> {
        let raw = self.transport.get(ty.endpoint(), query).await?;
        raw.as_array()
            .cloned()
            .ok_or_else(|| eyre!("expected an array from the {} endpoint", ty.endpoint()))
    }
}

/// Turn an absolute `_links` href into an endpoint path below the API root.
fn endpoint_from_href(api_url: &str, href: &str) -> String {
    href.strip_prefix(api_url).unwrap_or(href).to_string()
}

/// Numeric ID list field of a raw record, e.g. `categories` or
/// `lsvr_event_cat`. Missing or non-array fields yield an empty list.
fn id_list(source: &Value, field: &str) -> Vec<u64> {
    source
        .get(field)
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default()
}

fn push_name(record: &mut Map<String, Value>, field: &str, name: String) {
    if let Some(list) = record.get_mut(field).and_then(Value::as_array_mut) {
        list.push(Value::String(name));
    }
}

fn term_name(record: &Value) -> String {
    record
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Find an already resolved attachment with a matching ID.
fn find_attachment(target: &Map<String, Value>, media_id: u64) -> Option<Value> {
    target
        .get("attachments")?
        .as_array()?
        .iter()
        .find(|entry| entry.get("id").and_then(Value::as_u64) == Some(media_id))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Client against an unreachable host with caching disabled. Tests
    /// using it only exercise paths that never hit the network.
    fn offline_client() -> WpClient {
        let config = WpConfig {
            api_url: "https://example.invalid/wp-json/wp/v2/".to_string(),
            user: None,
            password: None,
        };
        WpClient::new(&config, false).unwrap()
    }

    #[tokio::test]
    async fn test_apply_spec_maps_media_fields() {
        let mut client = offline_client();
        let source = json!({
            "id": 11,
            "media_type": "image",
            "source_url": "https://example.org/a.jpg",
            "title": {"rendered": "A &amp; B"},
            "caption": {"rendered": "Caf&eacute;"}
        });
        let mut target = Map::new();
        client
            .apply_spec(EntityType::Media, &source, &mut target, 1)
            .await
            .unwrap();

        assert_eq!(target["id"], json!(11));
        assert_eq!(target["title"], json!("A & B"));
        assert_eq!(target["caption"], json!("Café"));
        // No placeholder for fields the source does not carry.
        assert!(!target.contains_key("description"));
        assert!(!target.contains_key("alt_text"));
    }

    #[tokio::test]
    async fn test_apply_spec_depth_bound_skips_fetching_rules() {
        let mut client = offline_client();
        let source = json!({
            "id": 1,
            "featured_media": 9,
            "title": {"rendered": "T"}
        });
        let mut target = Map::new();
        client
            .apply_spec(EntityType::Event, &source, &mut target, MAX_RESOLVE_DEPTH)
            .await
            .unwrap();

        assert_eq!(target["title"], json!("T"));
        assert!(!target.contains_key("featured_media"));
    }

    #[tokio::test]
    async fn test_resolve_media_zero_means_no_featured_media() {
        let mut client = offline_client();
        let mut target = Map::new();
        client
            .resolve_media(&json!(0), "featured_media", &mut target, 0)
            .await
            .unwrap();
        assert!(!target.contains_key("featured_media"));
    }

    #[tokio::test]
    async fn test_resolve_media_reuses_resolved_attachment() {
        let mut client = offline_client();
        let mut target = Map::new();
        target.insert(
            "attachments".to_string(),
            json!([{"id": 9, "title": "poster"}]),
        );
        client
            .resolve_media(&json!(9), "featured_media", &mut target, 0)
            .await
            .unwrap();
        assert_eq!(target["featured_media"], json!({"id": 9, "title": "poster"}));
    }

    #[tokio::test]
    async fn test_reference_miss_after_refresh_is_definitive() {
        let mut client = offline_client();
        let mut entries = Partition::new();
        entries.insert("5".to_string(), json!({"id": 5, "name": "summer"}));
        // A partition already refreshed this run is never refreshed again;
        // against the unreachable host a second refresh would error out.
        client.cache.replace_partition(EntityType::EventTag, entries);

        assert_eq!(
            client.reference(EntityType::EventTag, 5).await.unwrap(),
            Some(json!({"id": 5, "name": "summer"}))
        );
        assert_eq!(client.reference(EntityType::EventTag, 99).await.unwrap(), None);
        // Still marked refreshed afterwards.
        assert!(client.cache.is_updated(EntityType::EventTag));
    }

    #[tokio::test]
    async fn test_fill_author_resolves_user_name() {
        let mut client = offline_client();
        let mut users = Partition::new();
        users.insert("12".to_string(), json!({"id": 12, "name": "Alex"}));
        client.cache.replace_partition(EntityType::User, users);

        let mut record = Map::new();
        client
            .fill_author(&json!({"author": 12}), &mut record)
            .await
            .unwrap();
        assert_eq!(record["authorName"], json!("Alex"));
    }

    #[tokio::test]
    async fn test_fill_author_keeps_existing_name() {
        let mut client = offline_client();
        let mut record = Map::new();
        record.insert("authorName".to_string(), json!("Alex"));
        client
            .fill_author(&json!({"author": 12}), &mut record)
            .await
            .unwrap();
        assert_eq!(record["authorName"], json!("Alex"));
    }

    #[tokio::test]
    async fn test_fill_author_ignores_zero_author_id() {
        let mut client = offline_client();
        let mut record = Map::new();
        client
            .fill_author(&json!({"author": 0}), &mut record)
            .await
            .unwrap();
        assert!(!record.contains_key("authorName"));
    }

    #[test]
    fn test_endpoint_from_href_strips_api_root() {
        let api_url = "https://example.org/wp-json/wp/v2/";
        assert_eq!(
            endpoint_from_href(api_url, "https://example.org/wp-json/wp/v2/media?parent=42"),
            "media?parent=42"
        );
    }

    #[test]
    fn test_endpoint_from_href_leaves_foreign_urls() {
        let api_url = "https://example.org/wp-json/wp/v2/";
        assert_eq!(
            endpoint_from_href(api_url, "https://other.site/media?parent=42"),
            "https://other.site/media?parent=42"
        );
    }

    #[test]
    fn test_id_list() {
        let source = json!({"categories": [5, 6, "x", 7], "tags": []});
        assert_eq!(id_list(&source, "categories"), vec![5, 6, 7]);
        assert!(id_list(&source, "tags").is_empty());
        assert!(id_list(&source, "missing").is_empty());
    }

    #[test]
    fn test_push_name_preserves_order() {
        let mut record = Map::new();
        record.insert("categories".to_string(), json!([]));
        push_name(&mut record, "categories", "Jazz".to_string());
        push_name(&mut record, "categories", "Rock".to_string());
        assert_eq!(record["categories"], json!(["Jazz", "Rock"]));
    }

    #[test]
    fn test_find_attachment_matches_by_id() {
        let mut target = Map::new();
        target.insert(
            "attachments".to_string(),
            json!([{"id": 11, "title": "a"}, {"id": 12, "title": "b"}]),
        );
        assert_eq!(
            find_attachment(&target, 12),
            Some(json!({"id": 12, "title": "b"}))
        );
        assert_eq!(find_attachment(&target, 13), None);
    }

    #[test]
    fn test_find_attachment_without_attachments() {
        assert_eq!(find_attachment(&Map::new(), 1), None);
    }

    #[test]
    fn test_term_name_missing_is_empty() {
        assert_eq!(term_name(&json!({"id": 1})), "");
        assert_eq!(term_name(&json!({"name": "Jazz"})), "Jazz");
    }
}
