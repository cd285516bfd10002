//! Declarative field specifications for WordPress content types
//!
//! Each mapped content type carries an ordered table of (source path, rule)
//! entries. A rule names a conversion and an optional output rename. The
//! table is plain data: the functions below implement the pure parts of
//! applying it (nested path lookup, renaming, copying, HTML unescaping),
//! while the fetching conversions are carried out by the client crate.

use serde_json::Value;

use crate::EntityType;

/// How a source field is turned into an output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Copy the value unchanged.
    Copy,
    /// Decode HTML character references in a string value.
    Unescape,
    /// The value is a media ID; resolve it to a mapped media record.
    ResolveMedia,
    /// The value is a list of link descriptors; resolve the first linked
    /// collection to a list of mapped media records.
    ResolveAttachments,
}

impl Conversion {
    /// Whether applying this conversion requires fetching another entity.
    pub fn needs_fetch(&self) -> bool {
        matches!(self, Conversion::ResolveMedia | Conversion::ResolveAttachments)
    }
}

/// One entry of a field specification.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub conversion: Conversion,
    /// Output key; the source path is used when absent.
    pub rename: Option<&'static str>,
}

pub type FieldEntry = (&'static str, FieldRule);

const fn copy() -> FieldRule {
    FieldRule {
        conversion: Conversion::Copy,
        rename: None,
    }
}

const fn unescape_as(name: &'static str) -> FieldRule {
    FieldRule {
        conversion: Conversion::Unescape,
        rename: Some(name),
    }
}

// Attachments come before featured_media so the featured-media rule can
// reuse an already resolved attachment instead of fetching it again.
const EVENT_FIELDS: &[FieldEntry] = &[
    ("id", copy()),
    ("date_gmt", copy()),
    ("modified_gmt", copy()),
    ("slug", copy()),
    ("type", copy()),
    ("link", copy()),
    ("title.rendered", unescape_as("title")),
    ("content.rendered", unescape_as("content")),
    ("excerpt.rendered", unescape_as("excerpt")),
    ("dd_to_publish_as_showcase", copy()),
    ("authorName", copy()),
    ("status", copy()),
    ("allDayEvent", copy()),
    ("startTimeLong", copy()),
    ("endTimeLong", copy()),
    ("locationName", copy()),
    (
        "_links.wp:attachment",
        FieldRule {
            conversion: Conversion::ResolveAttachments,
            rename: Some("attachments"),
        },
    ),
    (
        "featured_media",
        FieldRule {
            conversion: Conversion::ResolveMedia,
            rename: None,
        },
    ),
];

const MEDIA_FIELDS: &[FieldEntry] = &[
    ("id", copy()),
    ("date_gmt", copy()),
    ("modified_gmt", copy()),
    ("alt_text", copy()),
    ("media_type", copy()),
    ("mime_type", copy()),
    ("source_url", copy()),
    ("title.rendered", unescape_as("title")),
    ("caption.rendered", unescape_as("caption")),
    ("description.rendered", unescape_as("description")),
];

const POST_FIELDS: &[FieldEntry] = &[
    ("id", copy()),
    ("date_gmt", copy()),
    ("modified_gmt", copy()),
    ("slug", copy()),
    ("type", copy()),
    ("link", copy()),
    ("status", copy()),
    ("title.rendered", unescape_as("title")),
    ("content.rendered", unescape_as("content")),
    ("excerpt.rendered", unescape_as("excerpt")),
    (
        "_links.wp:attachment",
        FieldRule {
            conversion: Conversion::ResolveAttachments,
            rename: Some("attachments"),
        },
    ),
    (
        "featured_media",
        FieldRule {
            conversion: Conversion::ResolveMedia,
            rename: None,
        },
    ),
];

/// Field specification for a content type. Types that are stored raw in the
/// cache (terms, users) have no specification and return an empty table.
pub fn field_spec(ty: EntityType) -> &'static [FieldEntry] {
    match ty {
        EntityType::Event => EVENT_FIELDS,
        EntityType::Media => MEDIA_FIELDS,
        EntityType::Post => POST_FIELDS,
        _ => &[],
    }
}

/// Walk a dot-separated path through nested objects.
///
/// Returns `None` as soon as any segment is absent; the corresponding
/// output field is then omitted entirely.
pub fn resolve_path<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = source;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Output key for a field: the rule's rename when present, else the full
/// source path.
pub fn output_key<'a>(path: &'a str, rule: &FieldRule) -> &'a str {
    rule.rename.unwrap_or(path)
}

/// Apply a non-fetching conversion to a raw value.
///
/// `Unescape` decodes HTML character references in string values and leaves
/// other value kinds untouched; every other conversion copies.
pub fn convert_scalar(conversion: Conversion, value: &Value) -> Value {
    match (conversion, value) {
        (Conversion::Unescape, Value::String(s)) => {
            Value::String(html_escape::decode_html_entities(s).into_owned())
        }
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_path_flat() {
        let source = json!({"id": 7});
        assert_eq!(resolve_path(&source, "id"), Some(&json!(7)));
    }

    #[test]
    fn test_resolve_path_nested() {
        let source = json!({"title": {"rendered": "Sommerfest &amp; Party"}});
        assert_eq!(
            resolve_path(&source, "title.rendered"),
            Some(&json!("Sommerfest &amp; Party"))
        );
    }

    #[test]
    fn test_resolve_path_three_levels() {
        let source = json!({"a": {"b": {"c": true}}});
        assert_eq!(resolve_path(&source, "a.b.c"), Some(&json!(true)));
    }

    #[test]
    fn test_resolve_path_missing_intermediate_segment() {
        let source = json!({"title": "plain string"});
        assert_eq!(resolve_path(&source, "title.rendered"), None);
        assert_eq!(resolve_path(&source, "content.rendered"), None);
    }

    #[test]
    fn test_resolve_path_key_with_colon() {
        let source = json!({"_links": {"wp:attachment": [{"href": "x"}]}});
        assert!(resolve_path(&source, "_links.wp:attachment").is_some());
    }

    #[test]
    fn test_output_key_rename() {
        let rule = unescape_as("title");
        assert_eq!(output_key("title.rendered", &rule), "title");
    }

    #[test]
    fn test_output_key_default_is_full_path() {
        let rule = copy();
        assert_eq!(output_key("featured_media", &rule), "featured_media");
        assert_eq!(output_key("a.b.c", &rule), "a.b.c");
    }

    #[test]
    fn test_convert_scalar_copy() {
        let value = json!({"nested": [1, 2]});
        assert_eq!(convert_scalar(Conversion::Copy, &value), value);
    }

    #[test]
    fn test_convert_scalar_unescape_entities() {
        let value = json!("Caf&eacute; &amp; Bar &#8211; open");
        assert_eq!(
            convert_scalar(Conversion::Unescape, &value),
            json!("Café & Bar \u{2013} open")
        );
    }

    #[test]
    fn test_convert_scalar_unescape_non_string() {
        let value = json!(42);
        assert_eq!(convert_scalar(Conversion::Unescape, &value), json!(42));
    }

    #[test]
    fn test_event_spec_attachments_precede_featured_media() {
        let spec = field_spec(EntityType::Event);
        let attachments = spec
            .iter()
            .position(|(path, _)| *path == "_links.wp:attachment")
            .unwrap();
        let featured = spec
            .iter()
            .position(|(path, _)| *path == "featured_media")
            .unwrap();
        assert!(attachments < featured);
    }

    #[test]
    fn test_media_spec_has_no_fetching_rules() {
        assert!(field_spec(EntityType::Media)
            .iter()
            .all(|(_, rule)| !rule.conversion.needs_fetch()));
    }

    #[test]
    fn test_unmapped_types_have_empty_spec() {
        assert!(field_spec(EntityType::Tag).is_empty());
        assert!(field_spec(EntityType::User).is_empty());
        assert!(field_spec(EntityType::EventCategory).is_empty());
    }
}
