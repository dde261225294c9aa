use anyhow::{ensure, Context, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MIN_UPDATE_FREQUENCY: f64 = 60.0;
const MAX_LOOKBACK_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TickerSettings {
    #[serde(
        rename = "currency",
        deserialize_with = "vec_from_str",
        serialize_with = "vec_to_str"
    )]
    pub assets: Vec<String>,
    #[serde(
        rename = "fiatcurrency",
        deserialize_with = "vec_from_str",
        serialize_with = "vec_to_str"
    )]
    pub fiats: Vec<String>,
    #[serde(rename = "sparklinedays")]
    pub lookback_days: u32,
    #[serde(rename = "updatefrequency", default = "default_update_frequency")]
    pub update_frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisplaySettings {
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub orientation: u16,
    #[serde(default)]
    pub cycle: bool,
    #[serde(default)]
    pub cyclefiat: bool,
    #[serde(default = "default_icons")]
    pub icons: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            inverted: false,
            orientation: 0,
            cycle: false,
            cyclefiat: false,
            icons: default_icons(),
            output: default_output(),
        }
    }
}

fn default_update_frequency() -> f64 {
    MIN_UPDATE_FREQUENCY
}

fn default_locale() -> String {
    "en_US".into()
}

fn default_icons() -> PathBuf {
    PathBuf::from("images/currency")
}

fn default_output() -> PathBuf {
    PathBuf::from("ticker.pgm")
}

pub fn vec_from_str<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(From::from)
        .collect())
}

pub fn vec_to_str<S>(v: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&v.join(","))
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    pub ticker: TickerSettings,
    #[serde(default)]
    pub display: DisplaySettings,
}

impl Settings {
    /// Reads the settings file, then applies `TICKER__<GROUP>__<KEY>` overrides.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let settings: Settings = Self::load(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut s = Config::new();
        s.merge(File::from(path))?;
        s.merge(Environment::with_prefix("TICKER").separator("__"))?;
        s.try_into()
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.ticker.assets.is_empty(), "ticker.currency is empty");
        ensure!(!self.ticker.fiats.is_empty(), "ticker.fiatcurrency is empty");
        ensure!(
            (1..=MAX_LOOKBACK_DAYS).contains(&self.ticker.lookback_days),
            "ticker.sparklinedays must be between 1 and {}, got {}",
            MAX_LOOKBACK_DAYS,
            self.ticker.lookback_days
        );
        ensure!(
            self.display.orientation % 90 == 0,
            "display.orientation must be a multiple of 90, got {}",
            self.display.orientation
        );
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn asset(&self) -> &str {
        &self.ticker.assets[0]
    }

    pub fn fiat(&self) -> &str {
        &self.ticker.fiats[0]
    }

    pub fn rotate_assets(&mut self) {
        self.ticker.assets.rotate_left(1)
    }

    pub fn rotate_fiats(&mut self) {
        self.ticker.fiats.rotate_left(1)
    }

    pub fn update_frequency(&self) -> Duration {
        Duration::from_secs_f64(self.ticker.update_frequency.max(MIN_UPDATE_FREQUENCY))
    }
}
