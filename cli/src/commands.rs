use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use storyfeed_api::{ApiConfig, DEFAULT_BASE_URL, HttpStoryApi};
use storyfeed_config::StoryfeedConfig;
use storyfeed_core::{DEFAULT_MAX_PAGES, FeedOptions, StoryService};
use storyfeed_media::{MediaCompressor, MediaOptions, stage_for_upload};
use storyfeed_session::FileSessionStore;
use storyfeed_types::{LocationFilter, PendingUpload, StoryItem};

use crate::args::{Commands, FeedArgs};

/// Effective settings: flags, then config file, then built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub feed: FeedOptions,
    pub media: MediaOptions,
    pub data_dir: PathBuf,
    pub pictures_dir: PathBuf,
}

impl Settings {
    pub fn resolve(api_url: Option<&str>, config: &StoryfeedConfig, data_dir: PathBuf) -> Self {
        let base_url = api_url
            .or_else(|| config.base_url())
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string();

        let feed = FeedOptions {
            page_size: config.page_size(),
            max_pages: config.max_pages().unwrap_or(DEFAULT_MAX_PAGES),
            location: if config.with_location() {
                LocationFilter::WithLocation
            } else {
                LocationFilter::Any
            },
        };

        let mut media = MediaOptions::default();
        if let Some(max_bytes) = config.max_upload_bytes() {
            media.max_bytes = max_bytes;
        }

        Self {
            base_url,
            timeout: config.timeout_secs().map(Duration::from_secs),
            feed,
            media,
            pictures_dir: data_dir.join("pictures"),
            data_dir,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        let mut config = ApiConfig::new(&self.base_url);
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if self.base_url.starts_with("http://") {
            tracing::warn!(base_url = %self.base_url, "Using plain HTTP for the story service");
            config = config.allow_insecure();
        }
        config
    }

    /// Per-invocation `feed` flags layered over the configured options.
    pub fn feed_options(&self, args: &FeedArgs) -> FeedOptions {
        FeedOptions {
            page_size: args.page_size.or(self.feed.page_size),
            location: if args.with_location {
                LocationFilter::WithLocation
            } else {
                self.feed.location
            },
            ..self.feed
        }
    }
}

pub async fn run(command: Commands, settings: &Settings) -> Result<()> {
    let api = HttpStoryApi::new(&settings.api_config()).context("failed to set up HTTP client")?;
    let store = FileSessionStore::in_dir(&settings.data_dir);
    let service = StoryService::new(api, store)
        .with_compressor(MediaCompressor::new(settings.media))
        .with_feed_options(settings.feed);

    match command {
        Commands::Register(args) => {
            service
                .register(&args.name, &args.email, &args.password)
                .await
                .context("registration failed")?;
            println!("Registered {}. Log in with `storyfeed login`.", args.email.trim());
        }
        Commands::Login(args) => {
            let session = service
                .login(&args.email, &args.password)
                .await
                .context("login failed")?;
            println!("Logged in as {} <{}>", session.name, session.email);
        }
        Commands::Logout => {
            service.logout()?;
            println!("Logged out");
        }
        Commands::Whoami => match service.whoami()? {
            Some(session) => println!("{} <{}>", session.name, session.email),
            None => println!("Not logged in"),
        },
        Commands::Feed(args) => {
            let service = service.with_feed_options(settings.feed_options(&args));
            let cancel = CancellationToken::new();
            let ctrl_c = tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancel.cancel();
                    }
                }
            });

            let result = service.feed(&cancel).await;
            ctrl_c.abort();

            let stories = result.context("failed to fetch feed")?;
            for story in &stories {
                println!("{}", format_story(story));
            }
            eprintln!("{} stories", stories.len());
        }
        Commands::Post(args) => {
            let (source, description) = PendingUpload::new(args.photo, args.description)?.into_parts();
            let staged = stage_for_upload(&source, &settings.pictures_dir)
                .with_context(|| format!("failed to read {}", source.display()))?;

            let result = service.submit(PendingUpload::new(&staged, description)?).await;
            remove_staged(&staged);

            let sent = result.context("failed to post story")?;
            match sent.quality {
                Some(quality) => println!("Posted {} ({} bytes, quality {quality})", sent.file_name, sent.bytes_sent),
                None => println!("Posted {} ({} bytes)", sent.file_name, sent.bytes_sent),
            }
        }
    }

    Ok(())
}

pub fn load_config(path: Option<&Path>) -> Result<StoryfeedConfig> {
    let loaded = match path {
        Some(path) => StoryfeedConfig::load_from(path)?,
        None => StoryfeedConfig::load()?,
    };
    Ok(loaded.unwrap_or_default().with_env_overrides())
}

fn format_story(story: &StoryItem) -> String {
    let mut line = format!(
        "{}  {}: {}",
        story.created_at.format("%Y-%m-%d %H:%M"),
        story.name,
        story.description.replace('\n', " ")
    );
    if let (Some(lat), Some(lon)) = (story.lat, story.lon) {
        line.push_str(&format!("  @ {lat:.4},{lon:.4}"));
    }
    line
}

fn remove_staged(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), "Failed to remove staged photo: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(lat: Option<f64>, lon: Option<f64>) -> StoryItem {
        StoryItem {
            id: "story-1".to_string(),
            name: "Ann".to_string(),
            description: "line one\nline two".to_string(),
            photo_url: "https://cdn.example.com/1.jpg".to_string(),
            created_at: "2024-03-01T10:05:00Z".parse().unwrap(),
            lat,
            lon,
        }
    }

    fn config(toml_src: &str) -> StoryfeedConfig {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, toml_src).unwrap();
        StoryfeedConfig::load_from(&path).unwrap().unwrap()
    }

    #[test]
    fn defaults_without_config() {
        let settings = Settings::resolve(None, &StoryfeedConfig::default(), PathBuf::from("/d"));
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.timeout, None);
        assert_eq!(settings.feed, FeedOptions::default());
        assert_eq!(settings.media, MediaOptions::default());
        assert_eq!(settings.pictures_dir, PathBuf::from("/d/pictures"));
        assert!(settings.api_config().https_only());
    }

    #[test]
    fn flag_beats_config_file() {
        let config = config(
            "[api]\nbase_url = \"https://file.example.com\"\ntimeout_secs = 5\n\
             [feed]\npage_size = 30\nmax_pages = 12\nwith_location = true\n\
             [media]\nmax_upload_bytes = 2048\n",
        );

        let settings = Settings::resolve(Some("http://localhost:1234"), &config, PathBuf::from("/d"));
        assert_eq!(settings.base_url, "http://localhost:1234");
        assert_eq!(settings.timeout, Some(Duration::from_secs(5)));
        assert_eq!(settings.feed.page_size, Some(30));
        assert_eq!(settings.feed.max_pages, 12);
        assert_eq!(settings.feed.location, LocationFilter::WithLocation);
        assert_eq!(settings.media.max_bytes, 2048);
        assert!(!settings.api_config().https_only());
    }

    #[test]
    fn feed_flags_layer_over_config() {
        let config = config("[feed]\npage_size = 30\nmax_pages = 12\n");
        let settings = Settings::resolve(None, &config, PathBuf::from("/d"));

        let options = settings.feed_options(&FeedArgs {
            page_size: Some(3),
            with_location: true,
        });
        assert_eq!(options.page_size, Some(3));
        assert_eq!(options.max_pages, 12);
        assert_eq!(options.location, LocationFilter::WithLocation);

        let options = settings.feed_options(&FeedArgs {
            page_size: None,
            with_location: false,
        });
        assert_eq!(options.page_size, Some(30));
        assert_eq!(options.location, LocationFilter::Any);
    }

    #[test]
    fn story_line_flattens_description() {
        assert_eq!(
            format_story(&story(None, None)),
            "2024-03-01 10:05  Ann: line one line two"
        );
    }

    #[test]
    fn story_line_includes_location() {
        assert_eq!(
            format_story(&story(Some(-6.2), Some(106.816_666))),
            "2024-03-01 10:05  Ann: line one line two  @ -6.2000,106.8167"
        );
    }
}
