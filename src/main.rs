//! ClaimWise CLI binary entry point.

use clap::Parser;
use claimwise::cli::{commands, Cli, Commands};
use claimwise::client::ApiClient;
use claimwise::config::ClientConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    let client = ApiClient::with_default_logger(config);
    if let Some(token) = cli.token.as_deref() {
        client.set_auth_token(token);
    }

    let ok = match cli.command {
        Commands::Health => commands::handle_health(&client).await,
        Commands::Get(args) => match commands::handle_get(&client, &args).await {
            Ok(()) => true,
            Err(e) => {
                eprintln!("Error: {}", commands::format_error_help(&e));
                false
            }
        },
    };

    // Give queued error reports one chance to reach the backend.
    let _ = client.logger().flush().await;

    if !ok {
        std::process::exit(1);
    }
}
