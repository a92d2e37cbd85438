//! LIF CLI
//!
//! Compile declaration documents to compose manifests and deploy them.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use console::style;
use indicatif::ProgressBar;
use lif_plan::{CompileConfig, Compiler};
use lif_runtime::{Deployer, DockerCompose};
use lif_server::{ApiServer, ErrorBody, ServerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lif")]
#[command(about = "LIF - compile resource declarations to compose manifests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a declaration to a compose manifest
    Compile {
        /// Path to the JSON declaration
        file: PathBuf,
        /// Write the manifest here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Compile configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Compile and deploy a declaration
    Deploy {
        /// Path to the JSON declaration
        file: PathBuf,
        /// Return once services are running
        #[arg(short, long)]
        detach: bool,
        /// Deploy through a running server instead of locally
        #[arg(short, long)]
        server: Option<String>,
        /// Compile configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run the HTTP server
    Serve {
        /// Bind address
        #[arg(short, long, default_value = "127.0.0.1:8085")]
        bind: String,
        /// Compile configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lif=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            file,
            output,
            config,
        } => {
            let yaml = compile_file(&file, config.as_deref())?;
            match output {
                Some(path) => {
                    std::fs::write(&path, yaml)
                        .wrap_err_with(|| format!("writing {}", path.display()))?;
                    eprintln!("{} wrote {}", style("ok").green(), path.display());
                }
                None => print!("{yaml}"),
            }
            Ok(())
        }
        Commands::Deploy {
            file,
            detach,
            server,
            config,
        } => {
            let text = match server {
                Some(url) => deploy_remote(&url, &file).await?,
                None => deploy_local(&file, config.as_deref(), detach).await?,
            };
            println!("{text}");
            Ok(())
        }
        Commands::Serve { bind, config } => {
            let server = ApiServer::new(ServerConfig {
                bind,
                compile: load_config(config.as_deref())?,
                detach: true,
            });
            server.serve().await?;
            Ok(())
        }
        Commands::Version => {
            println!("lif {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CompileConfig> {
    match path {
        Some(path) => CompileConfig::load(path)
            .wrap_err_with(|| format!("loading config {}", path.display())),
        None => Ok(CompileConfig::default()),
    }
}

fn read_input(file: &Path) -> Result<Vec<u8>> {
    std::fs::read(file).wrap_err_with(|| format!("reading {}", file.display()))
}

fn compile_file(file: &Path, config: Option<&Path>) -> Result<String> {
    let compiler = Compiler::new(load_config(config)?);
    let manifest = compiler
        .compile(&read_input(file)?)
        .wrap_err_with(|| format!("compiling {}", file.display()))?
        .manifest;
    Ok(manifest.to_yaml()?)
}

async fn deploy_local(file: &Path, config: Option<&Path>, detach: bool) -> Result<String> {
    let compiler = Compiler::new(load_config(config)?);
    let manifest = compiler
        .compile(&read_input(file)?)
        .wrap_err_with(|| format!("compiling {}", file.display()))?
        .manifest;
    let report = Deployer::new(Arc::new(DockerCompose::new()))
        .with_detach(detach)
        .deploy(&manifest)
        .await?;
    if let Some(warning) = &report.teardown_warning {
        eprintln!("{} teardown: {warning}", style("warning").yellow());
    }
    Ok(format!(
        "Successfully deployed infrastructure:\n\n{}",
        report.manifest_yaml
    ))
}

async fn deploy_remote(server: &str, file: &Path) -> Result<String> {
    let url = format!("{}/deploy", server.trim_end_matches('/'));
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("deploying via {url}"));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let response = reqwest::Client::new()
        .post(&url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(read_input(file)?)
        .send()
        .await
        .wrap_err_with(|| format!("sending to {url}"));
    spinner.finish_and_clear();

    let response = response?;
    let status = response.status();
    let text = response.text().await?;
    if status.is_success() {
        return Ok(text);
    }
    Err(remote_error(status.as_u16(), &text))
}

fn remote_error(status: u16, body: &str) -> color_eyre::Report {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => eyre!("server rejected deploy ({status} {}): {}", err.error, err.message),
        Err(_) => eyre!("server rejected deploy ({status}): {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const EXAMPLE: &str = r#"{"resources":{"mydb":{"type":"postgres"},"backend":{"type":"ec2","ports":["8080"],"env_vars":{"DB_URL":"ref:mydb:url"},"dockerfile":"/a/Dockerfile"}}}"#;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deploy() {
        let cli = Cli::try_parse_from([
            "lif",
            "deploy",
            "infra.json",
            "--detach",
            "--server",
            "http://127.0.0.1:8085",
        ])
        .unwrap();
        match cli.command {
            Commands::Deploy {
                file,
                detach,
                server,
                config,
            } => {
                assert_eq!(file, PathBuf::from("infra.json"));
                assert!(detach);
                assert_eq!(server.as_deref(), Some("http://127.0.0.1:8085"));
                assert!(config.is_none());
            }
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn test_compile_file_with_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("infra.json");
        std::fs::write(&input, EXAMPLE).unwrap();
        let config = dir.path().join("lif.toml");
        std::fs::write(&config, "[data_store]\nimage = \"postgres:16\"\n").unwrap();

        let yaml = compile_file(&input, Some(&config)).unwrap();
        assert!(yaml.contains("postgres:16"));
        assert!(yaml.contains("DB_URL"));
    }

    #[test]
    fn test_compile_file_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("infra.json");
        std::fs::write(&input, r#"{"resources":{"x":{"type":"lambda"}}}"#).unwrap();
        assert!(compile_file(&input, None).is_err());
        assert!(compile_file(&dir.path().join("missing.json"), None).is_err());
    }

    #[test]
    fn test_remote_error_message() {
        let body = r#"{"error":"resource_not_found","message":"Resource not found: ghost"}"#;
        let message = remote_error(400, body).to_string();
        assert!(message.contains("resource_not_found"));
        assert!(message.contains("ghost"));
        assert!(remote_error(502, "bad gateway").to_string().contains("bad gateway"));
    }
}
