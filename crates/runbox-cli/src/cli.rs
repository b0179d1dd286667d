use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8787";

#[derive(Parser)]
#[command(
    name = "runbox",
    about = "runbox: shareable code sandboxes with capability-keyed storage",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the storage gateway
    Serve(ServeArgs),
    /// Print the files of a stored sandbox
    Fetch(FetchArgs),
    /// Create or update a sandbox from local files
    Save(SaveArgs),
    /// Print a deterministic import link for local files
    Link(LinkArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Blob store directory; omit for an in-memory store
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct FetchArgs {
    pub read_key: String,
    #[arg(long, default_value = DEFAULT_SERVER)]
    pub server: String,
}

#[derive(Args)]
pub struct SaveArgs {
    /// Files to upload; the first one is the active file
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Sandbox to update; without a cached write key a new one is created
    #[arg(long)]
    pub read_key: Option<String>,
    /// Always create a new sandbox
    #[arg(long)]
    pub fork: bool,
    /// Key cache file
    #[arg(long, default_value = ".runbox-keys.json")]
    pub cache: PathBuf,
    #[arg(long, default_value = DEFAULT_SERVER)]
    pub server: String,
}

#[derive(Args)]
pub struct LinkArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    #[arg(long, default_value = DEFAULT_SERVER)]
    pub server: String,
}
