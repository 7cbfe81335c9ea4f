//! CLI entry point for the ClaimWise client.

pub mod commands;

use clap::{Parser, Subcommand};

/// ClaimWise API diagnostics
#[derive(Parser, Debug)]
#[command(name = "claimwise", version, about = "ClaimWise API client diagnostics")]
pub struct Cli {
    /// Backend base URL (overrides CLAIMWISE_API_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Bearer token sent as Authorization
    #[arg(long, global = true, env = "CLAIMWISE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe the backend's /healthz endpoint
    Health,
    /// GET a path and print the response body
    Get(GetArgs),
}

/// Arguments for the `get` subcommand.
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Path relative to the base URL, or an absolute URL
    pub path: String,

    /// Attempts before giving up
    #[arg(long, default_value_t = crate::types::DEFAULT_RETRIES)]
    pub retries: u32,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Print response metadata (status, timing, trace id) to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
