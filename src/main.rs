//! Scrape a fleet of machines, relabel their metrics and push them to a gateway.

use clap::Parser;
use tracing::{
    error,
    info,
};
use tracing_subscriber::EnvFilter;

use prom_relabel::{
    cli::{
        Args,
        LogFormat,
    },
    collector::Collector,
    config::CollectorConfig,
};

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let log_level = args.log_level.as_str().to_lowercase();
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("prom_relabel={log_level}").parse()?)
        .add_directive(format!("metrics_collector={log_level}").parse()?);

    match args.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = CollectorConfig::try_from(args)?;
    let interval = config.interval;
    let collector = Collector::new(config)?;

    let Some(interval) = interval else {
        collector.run_cycle().await?;
        return Ok(());
    };

    info!(interval_secs = interval.as_secs(), "Starting periodic collection");
    let mut ticker = tokio::time::interval(interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = collector.run_cycle().await {
                    error!(error = %e, "Cycle failed");
                }
            }
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }
    Ok(())
}
