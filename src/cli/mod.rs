//! CLI module for bangumi-mcp - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for serving the tools,
//! listing the catalog and calling a single tool.

pub mod commands;

pub use commands::Cli;
