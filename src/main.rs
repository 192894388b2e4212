//! DB Bridge MCP - Main entry point.
//!
//! Serves the `list_tables` and `execute_query` tools over stdio for a
//! single SQL database (SQLite, PostgreSQL, MySQL).

use clap::Parser;
use db_bridge_mcp::config::Config;
use db_bridge_mcp::db::Connector;
use db_bridge_mcp::mcp::BridgeService;
use db_bridge_mcp::transport::StdioTransport;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout belongs to the protocol.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; explicit env vars and flags still apply
    let dotenv = dotenvy::dotenv();

    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    if let Ok(path) = &dotenv {
        debug!(path = %path.display(), "Loaded environment from .env file");
    }

    let settings = match config.connection_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("Usage: db-bridge-mcp --connection-string <URL> [--user <USER>] [--password <PASSWORD>]");
            eprintln!();
            eprintln!("Examples:");
            eprintln!("  db-bridge-mcp --connection-string sqlite:data.db");
            eprintln!("  db-bridge-mcp --connection-string postgres://localhost:5432/app --user app --password secret");
            eprintln!("  DB_CONNECTION_STRING=mysql://localhost:3306/sales DB_SELF_HEALING=true db-bridge-mcp");
            std::process::exit(1);
        }
    };

    let policy = config.retry_policy();
    info!(
        database = %settings.masked_url(),
        db_type = %settings.db_type(),
        self_healing = policy.self_healing,
        max_attempts = policy.attempts(),
        "Starting DB Bridge MCP v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Connections are opened per tool call, never at startup
    let connector = Arc::new(Connector::new(settings, policy));
    let service = BridgeService::new(connector, config.query_timeout_duration());

    let transport = StdioTransport::new(service);

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
