use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hostbridge")]
#[command(version)]
#[command(about = "Inspect and exercise client/host bridge payloads")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a payload file and print it as JSON
    Inspect(InspectArgs),

    /// List persisted pending exchanges
    Pending(StoreArgs),

    /// Abandon pending exchanges past the grace window and list them
    Recover(StoreArgs),

    /// Run an auth exchange against an in-process simulated host
    Loopback(LoopbackArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    /// Payload file, as handed to or received from the host
    pub file: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct StoreArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct LoopbackArgs {
    /// Scope to request
    #[arg(long, default_value = "snsapi_userinfo")]
    pub scope: String,

    /// Authorization code the simulated host hands back
    #[arg(long, default_value = "abc")]
    pub code: String,

    /// Make the simulated host deny the request
    #[arg(long)]
    pub deny: bool,

    /// Make the simulated host never answer
    #[arg(long)]
    pub no_reply: bool,

    /// Delay before the simulated host answers, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub host_delay_ms: u64,

    /// Cancel the exchange if no response arrives within this many milliseconds
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Common arguments shared across subcommands
#[derive(Args)]
pub struct CommonArgs {
    /// Application id registered with the host
    #[arg(long, env = "HOSTBRIDGE_APP_ID")]
    pub app_id: Option<String>,

    /// Pending exchange store (JSON file)
    #[arg(long, env = "HOSTBRIDGE_STORE")]
    pub store: Option<PathBuf>,

    /// Maximum payload size in bytes
    #[arg(long)]
    pub max_payload_bytes: Option<usize>,

    /// Grace window for persisted exchanges, in seconds
    #[arg(long)]
    pub grace_window_secs: Option<u64>,
}
