//! Covenant Server CLI
//!
//! Starts the HTTP server for obligation extraction and issue filing.

use covenant_server::{config::ServerConfig, run, ServerError};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Log to stderr; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = start().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn start() -> Result<(), ServerError> {
    let args: Vec<String> = env::args().collect();

    let mut config = if args.len() > 2 && args[1] == "--config" {
        ServerConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using defaults");
        eprintln!("Usage: covenant-server --config <path-to-config.toml>");
        eprintln!();
        ServerConfig::default()
    };
    config.apply_env();

    run(config).await
}

fn print_help() {
    println!("Covenant Server - Legal obligation extraction");
    println!();
    println!("USAGE:");
    println!("    covenant-server --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    OPENAI_API_KEY     API key for the OpenAI provider");
    println!("    JIRA_SERVER_URL    Jira site URL");
    println!("    JIRA_EMAIL         Jira account email");
    println!("    JIRA_API_TOKEN     Jira API token");
    println!("    JIRA_PROJECT_KEY   Jira project issues are filed in");
    println!("    RUST_LOG           Log filter (default: info)");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file may contain:");
    println!("    - bind_address, bind_port: where to listen (default 127.0.0.1:8000)");
    println!("    - database_path: SQLite file (default obligations.db)");
    println!("    - [llm]: provider ('openai' or 'mock'), model, endpoint, timeout_secs");
    println!("    - [extractor]: max_tokens, batch_size, max_attempts, retry_backoff_ms,");
    println!("      inter_batch_delay_ms, temperature");
    println!("    - [tracker]: default_tool and [tracker.jira] connection settings");
    println!();
}
