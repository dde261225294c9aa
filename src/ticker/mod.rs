use crate::input::{listen_stdin, RefreshGuard};
use crate::panel::PgmPanel;
use crate::quotes::{http_client, CoinGecko, Stooq};
use crate::refresh::{RetryPolicy, Sources};
use crate::settings::Settings;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc::channel;
use tokio::time::{sleep, timeout};
use tracing::info;

mod controller;
use controller::Controller;

const NETWORK_PROBE: &str = "api.coingecko.com:443";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn run(settings: Settings, settings_path: PathBuf) -> Result<()> {
    info!("Starting price-ticker");
    let client = http_client()?;
    let sources = Sources {
        market_data: CoinGecko::new(client.clone()),
        quotes: Stooq::new(client),
    };
    let panel = PgmPanel::new(settings.display.output.clone());
    let guard = RefreshGuard::default();
    let (tx, rx) = channel(1);
    tokio::spawn(listen_stdin(tx, guard.clone()));

    wait_for_network(NETWORK_PROBE).await;
    let mut controller = Controller::new(
        settings,
        settings_path,
        sources,
        panel,
        RetryPolicy::default(),
        guard,
        rx,
    );
    controller.run().await;
    Ok(())
}

pub async fn wait_for_network(addr: &str) {
    loop {
        match timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => {
                info!("Network is up");
                return;
            }
            Ok(Err(e)) => info!("Waiting for network: {}", e),
            Err(_) => info!("Waiting for network: connection timed out"),
        }
        sleep(Duration::from_secs(1)).await;
    }
}
