#![allow(unused)]

use crate::prelude::*;
use clap::Parser;

mod client;
mod config;
mod events;
mod posts;
mod prelude;
mod transport;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Export normalized posts and events from a WordPress site"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// WordPress REST API root, e.g. https://example.org/wp-json/wp/v2/
    #[clap(long, env = "API_URL", global = true)]
    api_url: Option<String>,

    /// Skip loading and persisting the local reference cache.
    #[clap(long, env = "WPEXPORT_NO_CACHE", global = true, default_value = "false")]
    no_cache: bool,

    /// Whether to display additional information.
    #[clap(long, env = "WPEXPORT_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// List normalized posts with resolved categories, tags and author
    Posts(posts::PostsOptions),

    /// List normalized events with resolved categories, tags and organizers
    Events(events::EventsOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Posts(options) => posts::run(options, app.global).await,
        SubCommands::Events(options) => events::run(options, app.global).await,
    }
}
