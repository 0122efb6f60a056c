//! storyfeed - command-line client for the photo story service.
//!
//! ```text
//! main() -> Cli::parse() -> load config -> Settings::resolve() -> commands::run()
//!                                                                   |
//!                                                                   v
//!                                    StoryService<HttpStoryApi, FileSessionStore>
//! ```
//!
//! Command output goes to stdout; logs go to `~/.storyfeed/logs/storyfeed.log`.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;

use args::Cli;
use commands::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = storyfeed_config::data_dir();
    logging::init_tracing(&data_dir);

    let config = commands::load_config(cli.config.as_deref())?;
    let settings = Settings::resolve(cli.api_url.as_deref(), &config, data_dir);
    tracing::debug!(?settings, "Resolved settings");

    commands::run(cli.command, &settings).await
}
