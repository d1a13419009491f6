//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - serve: run one MCP transport binding
//! - tools: print the tool catalog
//! - call: invoke one tool and print its output

use bangumi_mcp::mcp::ServeMode;
use bangumi_mcp::render::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bangumi-MCP - Bangumi API tools over the Model Context Protocol
#[derive(Parser, Debug)]
#[command(name = "bangumi-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the tools over MCP (the default)
    Serve(ServeArgs),

    /// List the available tools
    Tools {
        /// Print the exact tools/list payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Call one tool and print its output
    Call {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,

        /// Output format (structured, text)
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },
}

/// Overrides for the `server` and `output` config sections
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Transport (stdio, sse, streamable-http)
    #[arg(short, long)]
    pub mode: Option<ServeMode>,

    /// Bind host for the HTTP transports
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port for the HTTP transports
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Output format for tool results (structured, text)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,
}
