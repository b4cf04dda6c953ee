//! # rkv-cli
//!
//! Send one command, or pipeline a file of commands, to a RESP3 server and
//! print the replies.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};

use rkv_client::{ClientConfig, ClientError, KVClient, Value};

#[derive(Debug, Parser)]
#[command(name = "rkv-cli", version, about = "RESP3 command-line client")]
struct Args {
    /// JSON client configuration; flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long)]
    pool_size: Option<usize>,

    /// Connect timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// File with one command per line, sent as a single pipeline.
    #[arg(long, conflicts_with = "command")]
    pipeline: Option<PathBuf>,

    /// Command name and arguments, e.g. `SET key value`.
    command: Vec<String>,
}

impl Args {
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.connection_timeout_ms = Some(timeout_ms);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Parses a pipeline file: whitespace-separated words per line, blank lines
/// and `#` comments skipped.
fn parse_commands(text: &str) -> Vec<Value> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| Value::command(line.split_whitespace()))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.client_config()?;
    info!("connecting to {}", config.addr());
    let client = KVClient::connect(config).await.context("failed to connect")?;

    let result = run(&client, &args).await;
    client.close().await;
    result
}

async fn run(client: &KVClient, args: &Args) -> Result<()> {
    if let Some(path) = &args.pipeline {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline file '{}'", path.display()))?;
        let commands = parse_commands(&text);
        debug!("pipelining {} commands", commands.len());
        for reply in client.pipeline(&commands).await? {
            println!("{}", reply);
        }
        return Ok(());
    }

    if args.command.is_empty() {
        bail!("no command given; pass a command or --pipeline <file>");
    }
    match client.execute(&Value::command(&args.command)).await {
        Ok(reply) => println!("{}", reply),
        // Error replies are output, not failures of the tool.
        Err(ClientError::Server { message }) => println!("(error) {}", message),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
