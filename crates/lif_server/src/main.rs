//! LIF Server
//!
//! HTTP API server for compiling and deploying declarations.

#![warn(missing_docs)]
#![warn(clippy::all)]

use anyhow::{Context, Result};
use clap::Parser;
use lif_plan::CompileConfig;
use lif_server::{ApiServer, ServerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lif-server")]
#[command(about = "LIF compile and deploy server", long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1:8085")]
    bind: String,

    /// Compile configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep deploys attached to the orchestrator output
    #[arg(long)]
    attach: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lif=info,tower_http=debug")),
        )
        .init();

    let compile = match &args.config {
        Some(path) => CompileConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CompileConfig::default(),
    };

    let server = ApiServer::new(ServerConfig {
        bind: args.bind,
        compile,
        detach: !args.attach,
    });
    server.serve().await?;

    Ok(())
}
