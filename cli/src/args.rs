use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "storyfeed")]
#[command(version, about = "Browse and post photo stories")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.storyfeed/config.toml)
    #[arg(long, global = true, env = "STORYFEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Story service base URL
    #[arg(long, global = true, env = "STORYFEED_API_URL")]
    pub api_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create an account
    Register(RegisterArgs),

    /// Log in and remember the session
    Login(LoginArgs),

    /// Forget the stored session
    Logout,

    /// Show the logged-in account
    Whoami,

    /// Print every story in the feed
    Feed(FeedArgs),

    /// Compress a photo and post it as a story
    Post(PostArgs),
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "STORYFEED_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "STORYFEED_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct FeedArgs {
    /// Stories per page (server default when unset)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Only stories that carry a location
    #[arg(long)]
    pub with_location: bool,
}

#[derive(Debug, Args)]
pub struct PostArgs {
    /// Image file to upload
    #[arg(long)]
    pub photo: PathBuf,

    #[arg(long)]
    pub description: String,
}
