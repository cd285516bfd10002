use colored::Colorize;
use serde_json::Value;

use wpexport_core::text::{format_wp_date, strip_html, truncate_text};

use crate::client::WpClient;
use crate::config::{require_api_url, WpConfig};
use crate::prelude::{println, *};
use crate::transport::PageQuery;

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct PostsOptions {
    /// Number of posts per page
    #[arg(short, long, default_value = "10")]
    pub limit: u32,

    /// Page number (1-indexed)
    #[arg(short, long, default_value = "1")]
    pub page: u32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: PostsOptions, global: crate::Global) -> Result<()> {
    let config = WpConfig::from_env(require_api_url(&global)?);
    if global.verbose {
        println!("Fetching posts from {}...", config.api_url);
    }

    let mut client = WpClient::new(&config, !global.no_cache)?;
    let posts = client
        .get_posts(PageQuery {
            per_page: options.limit,
            page: options.page,
            offset: 0,
        })
        .await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
    } else {
        print!("{}", format_posts_text(&posts));
    }

    client.persist_cache().wrap_err("failed to persist the reference cache")?;
    Ok(())
}

/// Render normalized posts as colored text with a metadata table per post.
fn format_posts_text(posts: &[Value]) -> String {
    let mut result = String::new();

    if posts.is_empty() {
        result.push_str(&format!("{}\n", "No posts found.".yellow()));
        return result;
    }

    for post in posts {
        let title = str_field(post, "title").unwrap_or("(No title)");
        result.push_str(&format!("\n{}\n", title.bright_white().bold()));

        let mut table = new_table();
        if let Some(date) = str_field(post, "date_gmt") {
            let display = format_wp_date(date).unwrap_or_else(|| date.to_string());
            table.add_row(prettytable::row![
                "Date".bold().cyan(),
                display.bright_black().to_string()
            ]);
        }
        if let Some(author) = str_field(post, "authorName") {
            table.add_row(prettytable::row![
                "Author".bold().cyan(),
                author.bright_magenta().to_string()
            ]);
        }
        if let Some(status) = str_field(post, "status") {
            table.add_row(prettytable::row![
                "Status".bold().cyan(),
                status.green().to_string()
            ]);
        }
        for (label, field) in [("Categories", "categories"), ("Tags", "tags")] {
            let names = name_list(post, field);
            if !names.is_empty() {
                table.add_row(prettytable::row![
                    label.bold().cyan(),
                    names.join(", ").bright_blue().to_string()
                ]);
            }
        }
        if let Some(link) = str_field(post, "link") {
            table.add_row(prettytable::row![
                "Link".bold().cyan(),
                link.cyan().underline().to_string()
            ]);
        }
        result.push_str(&table.to_string());

        if let Some(excerpt) = str_field(post, "excerpt") {
            let cleaned = strip_html(excerpt);
            if !cleaned.is_empty() {
                result.push_str(&format!("{}\n", truncate_text(&cleaned, 160).bright_black()));
            }
        }
    }

    result.push('\n');
    result
}

pub(crate) fn str_field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

pub(crate) fn name_list(record: &Value, key: &str) -> Vec<String> {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_post() -> Value {
        json!({
            "id": 42,
            "title": "Season Opening",
            "date_gmt": "2024-05-01T18:30:00",
            "status": "publish",
            "authorName": "Alex",
            "link": "https://example.org/season-opening",
            "categories": ["News", "Music"],
            "tags": ["jazz"],
            "excerpt": "<p>The new season starts &amp; everyone is invited.</p>"
        })
    }

    #[test]
    fn test_format_posts_text_basic() {
        let formatted = format_posts_text(&[sample_post()]);

        assert!(formatted.contains("Season Opening"));
        assert!(formatted.contains("2024-05-01 18:30 UTC"));
        assert!(formatted.contains("Alex"));
        assert!(formatted.contains("News, Music"));
        assert!(formatted.contains("jazz"));
        // The excerpt is rendered without markup.
        assert!(formatted.contains("The new season starts"));
        assert!(!formatted.contains("<p>"));
    }

    #[test]
    fn test_format_posts_text_empty() {
        let formatted = format_posts_text(&[]);
        assert!(formatted.contains("No posts found."));
    }

    #[test]
    fn test_format_posts_text_missing_fields() {
        let formatted = format_posts_text(&[json!({"id": 1, "categories": [], "tags": []})]);
        assert!(formatted.contains("(No title)"));
        assert!(!formatted.contains("Categories"));
        assert!(!formatted.contains("Author"));
    }

    #[test]
    fn test_name_list() {
        let post = sample_post();
        assert_eq!(name_list(&post, "categories"), vec!["News", "Music"]);
        assert!(name_list(&post, "organizer").is_empty());
    }
}
