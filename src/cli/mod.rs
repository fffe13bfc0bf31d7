// src/cli/mod.rs
// Command-line interface

mod serve;
mod tool;

pub use serve::{build_server, run_http, run_stdio};
pub use tool::{run_list_tools, run_tool};

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mcp-devtools",
    version,
    about = "MCP developer-tools server: code skimming, agent collaboration, GitHub access"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP server (stdio transport by default)
    Serve {
        /// Serve over streamable HTTP on this address instead of stdio
        #[arg(long)]
        http: Option<SocketAddr>,
    },
    /// Invoke a single tool and print its result
    Tool {
        /// Tool name, e.g. code_skim
        name: String,
        /// Arguments as a JSON object
        args: Option<String>,
    },
    /// List enabled tools (* marks extended help)
    ListTools,
}
