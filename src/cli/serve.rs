// src/cli/serve.rs
// MCP server initialization and transports

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use devtools::config::EnvConfig;
use devtools::mcp::DevToolsServer;
use devtools::registry::Registry;
use devtools::tools;

/// Load configuration, initialise the registry, and register the catalogue.
pub fn build_server() -> Result<DevToolsServer> {
    let config = Arc::new(EnvConfig::load());
    let mut registry = Registry::init();
    tools::register_all(&mut registry, &config);
    Ok(DevToolsServer::new(Arc::new(registry), config))
}

/// Run the MCP server over stdio.
pub async fn run_stdio() -> Result<()> {
    let server = build_server()?;
    info!(
        tools = server.registry.get_enabled_tool_names().len(),
        "serving MCP over stdio"
    );
    let transport = rmcp::transport::io::stdio();
    let service = rmcp::serve_server(server, transport).await?;
    service.waiting().await?;
    Ok(())
}

/// Run the MCP server over streamable HTTP, mounted at `/mcp`.
pub async fn run_http(addr: SocketAddr) -> Result<()> {
    let server = build_server()?;
    info!(
        %addr,
        tools = server.registry.get_enabled_tool_names().len(),
        "serving MCP over streamable HTTP"
    );

    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
            stateful_mode: true,
            cancellation_token: CancellationToken::new(),
        },
    );

    let router = axum::Router::new()
        .nest_service("/mcp", service)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
