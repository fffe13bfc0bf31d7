// src/main.rs
// mcp-devtools - MCP developer-tools server

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from ~/.mcp-devtools/.env only (never from CWD - a malicious
    // repo could override tokens)
    if let Some(home) = dirs::home_dir()
        && let Err(e) = dotenvy::from_path(home.join(".mcp-devtools/.env"))
    {
        tracing::debug!("Failed to load global .env file: {}", e);
    }

    let cli = Cli::parse();

    // Quiet on stdio so stdout stays clean for the protocol; informative
    // everywhere else.
    let log_level = match &cli.command {
        None | Some(Commands::Serve { http: None }) => Level::WARN,
        Some(Commands::Serve { http: Some(_) }) => Level::INFO,
        Some(Commands::Tool { .. }) | Some(Commands::ListTools) => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match cli.command {
        None | Some(Commands::Serve { http: None }) => cli::run_stdio().await?,
        Some(Commands::Serve { http: Some(addr) }) => cli::run_http(addr).await?,
        Some(Commands::Tool { name, args }) => cli::run_tool(name, args).await?,
        Some(Commands::ListTools) => cli::run_list_tools()?,
    }

    Ok(())
}
