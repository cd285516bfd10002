use colored::Colorize;
use serde_json::Value;

use wpexport_core::text::format_wp_date;

use crate::client::WpClient;
use crate::config::{require_api_url, WpConfig};
use crate::posts::{name_list, str_field};
use crate::prelude::{println, *};
use crate::transport::PageQuery;

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct EventsOptions {
    /// Number of events per page
    #[arg(short, long, default_value = "10")]
    pub limit: u32,

    /// Page number (1-indexed)
    #[arg(short, long, default_value = "1")]
    pub page: u32,

    /// Category ID whose descendants classify as organizers
    #[arg(long, env = "ORGANIZER_PARENT_ID", default_value = "605")]
    pub organizer_root: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: EventsOptions, global: crate::Global) -> Result<()> {
    let config = WpConfig::from_env(require_api_url(&global)?);
    if global.verbose {
        println!("Fetching events from {}...", config.api_url);
    }

    let mut client = WpClient::new(&config, !global.no_cache)?;
    let events = client
        .get_events(
            PageQuery {
                per_page: options.limit,
                page: options.page,
                offset: 0,
            },
            options.organizer_root,
        )
        .await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        print!("{}", format_events_text(&events));
    }

    client.persist_cache().wrap_err("failed to persist the reference cache")?;
    Ok(())
}

/// Render normalized events as colored text with a metadata table per
/// event.
fn format_events_text(events: &[Value]) -> String {
    let mut result = String::new();

    if events.is_empty() {
        result.push_str(&format!("{}\n", "No events found.".yellow()));
        return result;
    }

    for event in events {
        let title = str_field(event, "title").unwrap_or("(No title)");
        result.push_str(&format!("\n{}\n", title.bright_white().bold()));

        let mut table = new_table();
        if let Some(date) = str_field(event, "date_gmt") {
            let display = format_wp_date(date).unwrap_or_else(|| date.to_string());
            table.add_row(prettytable::row![
                "Date".bold().cyan(),
                display.bright_black().to_string()
            ]);
        }
        if let Some(location) = str_field(event, "locationName") {
            table.add_row(prettytable::row![
                "Location".bold().cyan(),
                location.bright_yellow().to_string()
            ]);
        }
        if let Some(author) = str_field(event, "authorName") {
            table.add_row(prettytable::row![
                "Author".bold().cyan(),
                author.bright_magenta().to_string()
            ]);
        }
        for (label, field) in [
            ("Organizer", "organizer"),
            ("Categories", "categories"),
            ("Tags", "tags"),
        ] {
            let names = name_list(event, field);
            if !names.is_empty() {
                table.add_row(prettytable::row![
                    label.bold().cyan(),
                    names.join(", ").bright_blue().to_string()
                ]);
            }
        }
        let attachments = event
            .get("attachments")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        if attachments > 0 {
            table.add_row(prettytable::row![
                "Attachments".bold().cyan(),
                attachments.to_string().bright_white().to_string()
            ]);
        }
        if let Some(link) = str_field(event, "link") {
            table.add_row(prettytable::row![
                "Link".bold().cyan(),
                link.cyan().underline().to_string()
            ]);
        }
        result.push_str(&table.to_string());
    }

    result.push('\n');
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event() -> Value {
        json!({
            "id": 7,
            "title": "Open Air Night",
            "date_gmt": "2024-07-12T20:00:00",
            "locationName": "Main Square",
            "authorName": "Alex",
            "link": "https://example.org/events/open-air-night",
            "organizer": ["City Hall"],
            "categories": ["Jazz"],
            "tags": ["summer"],
            "attachments": [{"id": 11}, {"id": 12}]
        })
    }

    #[test]
    fn test_format_events_text_basic() {
        let formatted = format_events_text(&[sample_event()]);

        assert!(formatted.contains("Open Air Night"));
        assert!(formatted.contains("2024-07-12 20:00 UTC"));
        assert!(formatted.contains("Main Square"));
        assert!(formatted.contains("City Hall"));
        assert!(formatted.contains("Jazz"));
        assert!(formatted.contains("summer"));
        assert!(formatted.contains("Attachments"));
    }

    #[test]
    fn test_format_events_text_empty() {
        let formatted = format_events_text(&[]);
        assert!(formatted.contains("No events found."));
    }

    #[test]
    fn test_format_events_text_omits_empty_lists() {
        let event = json!({
            "id": 8,
            "title": "Quiet Evening",
            "organizer": [],
            "categories": [],
            "tags": []
        });
        let formatted = format_events_text(&[event]);
        assert!(formatted.contains("Quiet Evening"));
        assert!(!formatted.contains("Organizer"));
        assert!(!formatted.contains("Attachments"));
    }
}
