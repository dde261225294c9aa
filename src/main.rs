use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod input;
mod panel;
mod quotes;
mod refresh;
mod render;
mod settings;
mod ticker;
use settings::Settings;
use tracing::subscriber::set_global_default;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use ticker::run;

#[derive(Debug, Parser)]
#[command(name = "price-ticker", about = "Crypto and stock prices on an e-paper display")]
struct Args {
    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log: String,
    /// Settings file, rewritten whenever a key changes it
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&args.log))?;
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    set_global_default(subscriber)?;
    LogTracer::init()?;
    let settings = Settings::new(&args.config)?;
    run(settings, args.config).await
}
