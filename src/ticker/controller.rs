use crate::input::{Button, RefreshGuard};
use crate::panel::Panel;
use crate::quotes::{Asset, MarketData, QuoteService};
use crate::refresh::{Refresh, RetryPolicy, Sources};
use crate::render::{render_problem, render_quote, timestamp, Icon, QuoteView};
use crate::settings::Settings;
use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use tokio::sync::mpsc::Receiver;
use tokio::time::{sleep, sleep_until, Duration, Instant};
use tracing::{debug, error, info, warn};

const UNAVAILABLE_PAUSE: Duration = Duration::from_secs(10);
const FAILURE_PAUSE: Duration = Duration::from_secs(20);

#[derive(Debug, PartialEq)]
enum Update {
    Shown,
    Unavailable(String),
}

pub(super) struct Controller<M, Q, P> {
    settings: Settings,
    settings_path: PathBuf,
    sources: Sources<M, Q>,
    panel: P,
    policy: RetryPolicy,
    guard: RefreshGuard,
    presses: Receiver<Button>,
}

impl<M: MarketData, Q: QuoteService, P: Panel> Controller<M, Q, P> {
    pub fn new(
        settings: Settings,
        settings_path: PathBuf,
        sources: Sources<M, Q>,
        panel: P,
        policy: RetryPolicy,
        guard: RefreshGuard,
        presses: Receiver<Button>,
    ) -> Self {
        Self {
            settings,
            settings_path,
            sources,
            panel,
            policy,
            guard,
            presses,
        }
    }

    /// Advances to the next asset (and fiat) between periodic refreshes.
    fn cycle(&mut self) {
        if !self.settings.display.cycle {
            return;
        }
        if self.settings.ticker.assets.len() > 1 {
            self.settings.rotate_assets();
        }
        if self.settings.display.cyclefiat && self.settings.ticker.fiats.len() > 1 {
            self.settings.rotate_fiats();
        }
    }

    async fn update(&mut self) -> Result<Update> {
        let asset = Asset::parse(self.settings.asset());
        let fiat = self.settings.fiat().to_string();
        debug!(%asset, %fiat, "Refreshing");
        let refresh = self
            .sources
            .refresh(&self.policy, &asset, &fiat, self.settings.ticker.lookback_days)
            .await;
        let (series, meta) = match refresh {
            Refresh::Ready { series, meta } => (series, meta),
            Refresh::Unavailable { reason } => return Ok(Update::Unavailable(reason)),
        };
        let icon = Icon::load(&self.settings.display.icons, &asset);
        let view = QuoteView {
            asset: &asset,
            fiat: &fiat,
            series: &series,
            meta: &meta,
            lookback_days: self.settings.ticker.lookback_days,
            icon: &icon,
        };
        let frame = render_quote(&view, &self.settings.display, &timestamp(&Local::now()));
        self.panel.display(&frame)?;
        self.panel.sleep()?;
        info!(%asset, price = series.latest(), "Display updated");
        Ok(Update::Shown)
    }

    fn show_problem(&mut self, message: &str) {
        let frame = render_problem(message, &self.settings.display, &timestamp(&Local::now()));
        if let Err(e) = self.panel.display(&frame).and_then(|_| self.panel.sleep()) {
            error!("Failed to show problem on panel: {:#}", e);
        }
    }

    /// Runs one refresh cycle. Returns the time of this fetch, or `last_fetch`
    /// if nothing new could be shown.
    pub async fn full_update(&mut self, last_fetch: Instant) -> Instant {
        let _refreshing = match self.guard.try_acquire() {
            Some(token) => token,
            None => {
                warn!("Refresh already in progress");
                return last_fetch;
            }
        };
        match self.update().await {
            Ok(Update::Shown) => Instant::now(),
            Ok(Update::Unavailable(reason)) => {
                warn!("{}", reason);
                self.show_problem(&reason);
                sleep(UNAVAILABLE_PAUSE).await;
                last_fetch
            }
            Err(e) => {
                error!("Update error: {:#}", e);
                self.show_problem(&format!("{:#}", e));
                sleep(FAILURE_PAUSE).await;
                last_fetch
            }
        }
    }

    pub async fn handle_press(&mut self, button: Button) {
        info!(?button, "Key pressed");
        button.apply(&mut self.settings);
        self.full_update(Instant::now()).await;
        if let Err(e) = self.settings.save(&self.settings_path) {
            error!("Failed to save settings: {:#}", e);
        }
    }

    pub async fn run(&mut self) {
        info!("Starting controller");
        let mut last_fetch = Instant::now();
        let mut pulled = false;
        loop {
            let due = if pulled {
                last_fetch + self.settings.update_frequency()
            } else {
                Instant::now()
            };
            tokio::select! {
                _ = sleep_until(due) => {
                    if pulled {
                        self.cycle();
                    }
                    last_fetch = self.full_update(last_fetch).await;
                    pulled = true;
                },
                Some(button) = self.presses.recv() => {
                    self.handle_press(button).await
                }
            }
        }
    }
}
