use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

mod config;
mod monitoring;
mod notify;
mod shutdown;
mod store;
#[cfg(test)]
mod testing;

use config::Config;
use monitoring::{CheckExecutor, CheckScheduler, HttpProber};
use store::{CheckStore, FileCheckStore};

/// Probe registered HTTP checks and alert their owners when a check goes up or down
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file, defaults to $XDG_CONFIG_HOME/upwatch/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_deref())?;

    if cli.print_config {
        print!("{config}");
        return Ok(());
    }

    logger::init(config.logging.format);

    let file_store = FileCheckStore::new(&config.store.data_dir);
    info!(
        "Reading checks from {}, alerting via {}",
        file_store.dir().display(),
        config.notifier.kind
    );

    let store: Arc<dyn CheckStore> = Arc::new(file_store);
    let notifier = notify::from_config(&config.notifier).context("failed to build notifier")?;
    let prober = Arc::new(HttpProber::new().context("failed to build HTTP client")?);
    let executor = Arc::new(CheckExecutor::new(store.clone(), prober, notifier));
    let scheduler = CheckScheduler::new(store, executor, &config.worker);

    let (trigger, shutdown) = shutdown::channel();
    let worker = tokio::spawn(scheduler.run(shutdown));

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl+C")?;
    info!("Ctrl+C received, stopping check worker");
    trigger.trigger();
    worker.await?;

    Ok(())
}
