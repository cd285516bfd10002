//! Text helpers shared by the CLI output formatters

use chrono::NaiveDateTime;
use regex::Regex;

/// Strip HTML tags from rendered content.
///
/// Entities are already decoded by the property mapper, so this only drops
/// markup and trims the result.
pub fn strip_html(text: &str) -> String {
    let re = Regex::new(r"<[^>]*>").unwrap();
    re.replace_all(text, "").trim().to_string()
}

/// Truncate text to at most `max_len` characters, appending an ellipsis.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len).collect();
        format!("{truncated}...")
    }
}

/// Format a WordPress `date_gmt` stamp (`2024-05-01T18:30:00`) for display.
pub fn format_wp_date(raw: &str) -> Option<String> {
    let dt = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok()?;
    Some(dt.format("%Y-%m-%d %H:%M UTC").to_string())
}
