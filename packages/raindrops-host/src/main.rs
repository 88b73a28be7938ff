use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use raindrops_host::{HostConfig, RaindropsHost, Runner};

/// Run a raindrops module and print one JSON record per number.
#[derive(Debug, Parser)]
#[command(name = "raindrops-host", version, about)]
struct Cli {
    /// Module to run (.wasm or .wat). Defaults to the built-in reference module.
    #[arg(long, env = "RAINDROPS_MODULE")]
    module: Option<PathBuf>,

    /// JSON host configuration file.
    #[arg(long, env = "RAINDROPS_CONFIG")]
    config: Option<PathBuf>,

    /// Instantiate a fresh memory for every number.
    #[arg(long)]
    fresh: bool,

    /// Numbers to convert. Read one per line from stdin when omitted.
    #[arg(allow_hyphen_values = true)]
    numbers: Vec<String>,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HostConfig> {
    let config = match path {
        Some(path) => HostConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => HostConfig::default(),
    };
    config
        .with_env()
        .context("invalid RAINDROPS_* environment override")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the records.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RAINDROPS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let host = RaindropsHost::new(config).context("failed to start host")?;

    let module = match &cli.module {
        Some(path) => host
            .load_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => host.load_reference()?,
    };
    let mut runner = Runner::new(module, cli.fresh).await?;

    let mut failed = 0usize;
    if cli.numbers.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            let record = runner.run(&line).await;
            failed += usize::from(record.is_error());
            println!("{}", serde_json::to_string(&record)?);
        }
    } else {
        for raw in &cli.numbers {
            let record = runner.run(raw).await;
            failed += usize::from(record.is_error());
            println!("{}", serde_json::to_string(&record)?);
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} input(s) failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.json");
        let err = load_config(Some(&path)).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("failed to load config"), "{message}");
        assert!(message.contains("host.json"), "{message}");
    }
}
