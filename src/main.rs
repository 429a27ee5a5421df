//! Removes PCR duplicates from a position sorted SAM file using the UMI in the read name.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
pub mod cigar;
pub mod io;
pub mod markdups;
pub mod metrics;
pub mod record;

use app::{App, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(config.verbose);

    let mut app = App::new(&config).await?;
    let metrics = app.run().await?;
    app::report(metrics, config.metrics.as_deref())?;

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("umidedup={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
