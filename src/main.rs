/// Main entry point for the Insight Engine MCP server
///
/// This file loads configuration, sets up logging, parses command line arguments and
/// starts the MCP server. The server listens for JSON-RPC requests over stdin/stdout.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use insight_engine_mcp::{EngineConfig, InsightServer};

/// Get the default database path with robust fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::data_dir().map(|mut p| {
            p.push("insight_engine");
            p
        }),
        dirs::home_dir().map(|mut p| {
            p.push(".insight_engine");
            p
        }),
        std::env::current_dir().ok().map(|mut p| {
            p.push(".insight_engine");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if let Ok(()) = std::fs::create_dir_all(potential_path) {
            // Test if we can write to this directory
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(potential_path.join("snapshots.db"));
            }
        }
    }

    // Ultimate fallback: use a temporary directory
    let mut temp_path = std::env::temp_dir();
    temp_path.push("insight_engine");
    std::fs::create_dir_all(&temp_path)?;
    temp_path.push("snapshots.db");

    tracing::warn!("Using temporary directory for database: {}", temp_path.display());
    Ok(temp_path)
}

/// Command line arguments for the Insight Engine MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite snapshot database
    /// If not provided, uses a default location in the user's data directory
    #[arg(long)]
    database: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,

    /// Surface delivery failures instead of answering with built-in fallbacks
    #[arg(long)]
    no_fallback: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = EngineConfig::load(args.config.as_deref())?;
    if args.no_fallback {
        config.dispatch.fallback_enabled = false;
    }

    // Flags win over the config file; RUST_LOG wins over both
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("insight_engine_mcp={}", log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // Send logs to stderr, not stdout
        .init();

    info!("Starting Insight Engine MCP server");

    // config was loaded before the subscriber existed
    let config_path = args
        .config
        .clone()
        .or_else(|| EngineConfig::default_path().filter(|path| path.exists()));
    match config_path {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => get_default_database_path()?,
    };

    info!("Using database at: {}", db_path.display());

    let server = InsightServer::new(db_path, config).await?;

    // Run the MCP server - this will handle JSON-RPC communication over stdin/stdout
    server.run().await?;

    info!("Insight Engine MCP server shutdown complete");
    Ok(())
}
