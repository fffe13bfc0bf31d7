// src/cli/tool.rs
// One-shot tool invocation and catalogue listing for debugging

use anyhow::{Result, anyhow, bail};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use devtools::registry::ToolInvocation;

use super::serve::build_server;

/// Run a single tool with JSON arguments and print the result.
pub async fn run_tool(name: String, args: Option<String>) -> Result<()> {
    let server = build_server()?;
    let Some(tool) = server.registry.get_tool(&name) else {
        bail!(
            "unknown or disabled tool: {name} (enabled: {})",
            server.registry.get_enabled_tool_names().join(", ")
        );
    };

    let args: Map<String, Value> = match args {
        Some(raw) => match serde_json::from_str(&raw)? {
            Value::Object(map) => map,
            _ => bail!("arguments must be a JSON object"),
        },
        None => Map::new(),
    };

    let inv = ToolInvocation {
        cache: server.registry.cache(),
        config: server.config.clone(),
        policy: server.policy.clone(),
        ct: CancellationToken::new(),
        workspace_root: server.workspace_root.clone(),
    };

    match tool.execute(&inv, args).await {
        Ok(result) => {
            println!("{result}");
            Ok(())
        }
        Err(message) => Err(anyhow!("{message}")),
    }
}

/// Print enabled tool names; `*` marks tools with extended help.
pub fn run_list_tools() -> Result<()> {
    let server = build_server()?;
    let with_help = server.registry.get_tool_names_with_extended_help();
    for name in server.registry.get_enabled_tool_names() {
        if with_help.contains(&name) {
            println!("{name} *");
        } else {
            println!("{name}");
        }
    }
    Ok(())
}
