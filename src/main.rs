use bangumi_mcp::api::BangumiClient;
use bangumi_mcp::mcp::{self, McpServer, ServeMode};
use bangumi_mcp::mcp::messages::ListToolsResult;
use bangumi_mcp::render::{self, OutputFormat};
use bangumi_mcp::tools::{Dispatcher, ToolRouter};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, ServeArgs};
use config::Config;

fn setup_logging(config: &Config) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bangumi-mcp")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("bangumi-mcp.log");

    // stdout belongs to the stdio transport, so logs go to a file
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let client = BangumiClient::connect(
        &config.api.base_url,
        config.api.token.as_deref(),
        &config.api.user_agent,
    )
    .context("Failed to create Bangumi API client")?;

    if config.api.token.is_none() {
        info!("No API token configured, authenticated tools will answer 401");
    }

    Dispatcher::new(client).context("Failed to build tool dispatcher")
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        eprintln!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_serve_command(&ServeArgs::default(), cli, config).await,
        Some(Commands::Serve(args)) => handle_serve_command(args, cli, config).await,
        Some(Commands::Tools { json }) => handle_tools_command(*json, config),
        Some(Commands::Call { name, args, format }) => {
            let format = format.unwrap_or(config.output.format);
            handle_call_command(name, args.as_deref(), format, config).await
        }
    }
}

async fn handle_serve_command(args: &ServeArgs, cli: &Cli, config: &Config) -> Result<()> {
    let mode = args.mode.unwrap_or(config.server.mode);
    let host = args.host.clone().unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let format = args.format.unwrap_or(config.output.format);

    info!("Serving in {} mode (format {})", mode, format);
    if cli.is_verbose() && mode != ServeMode::Stdio {
        eprintln!("{} http://{}:{}", "Listening on".green(), host, port);
    }

    let dispatcher = build_dispatcher(config)?;
    let server = McpServer::new(Arc::new(dispatcher)).with_format(format);
    mcp::serve(server, mode, &host, port)
        .await
        .context(format!("{} transport failed", mode))
}

fn handle_tools_command(json: bool, config: &Config) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let tools = dispatcher.list_tools();
    info!("Listing {} tools", tools.len());

    if json {
        let payload = serde_json::to_string_pretty(&ListToolsResult { tools })?;
        println!("{}", payload);
        return Ok(());
    }

    for tool in &tools {
        println!("{}", tool.name.green().bold());
        println!("    {}", tool.description.dimmed());
        let required = tool.required();
        if !required.is_empty() {
            println!("    {} {}", "required:".yellow(), required.join(", "));
        }
    }
    println!();
    println!("{} tools", tools.len().to_string().cyan());
    Ok(())
}

async fn handle_call_command(name: &str, args: Option<&str>, format: OutputFormat, config: &Config) -> Result<()> {
    let arguments = match args {
        Some(raw) => Some(serde_json::from_str(raw).context("--args must be valid JSON")?),
        None => None,
    };

    let dispatcher = build_dispatcher(config)?;
    let output = dispatcher.call_tool(name, arguments).await;
    info!("Called {} (error: {})", name, output.is_error());

    match format {
        OutputFormat::Structured => println!("{}", serde_json::to_string_pretty(output.payload())?),
        OutputFormat::Text => print!("{}", render::render(name, &output)),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the level is known
    setup_logging(&config).context("Failed to setup logging")?;

    // Discovery ran before the logger existed
    for warning in &config.warnings {
        warn!("{}", warning);
        eprintln!("{} {}", "warning:".yellow(), warning);
    }
    match &config.source {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
