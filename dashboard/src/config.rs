use serde::Deserialize;
use std::{env, fs, time::Duration};

const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:3030";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Above-ground gold stock estimate, troy ounces.
const DEFAULT_GOLD_SUPPLY_OZ: f64 = 6_850_000_000.0;

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_address: String,
    pub mempool_base_url: String,
    pub gold_price_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub gold_supply_oz: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    server: ServerSection,
    feeds: FeedsSection,
    derived: DerivedSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ServerSection {
    listen_address: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FeedsSection {
    mempool_base_url: Option<String>,
    gold_price_url: Option<String>,
    poll_interval_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DerivedSection {
    gold_supply_oz: Option<f64>,
}

impl Config {
    /// Load configuration: optional `--config <toml>` file, individual
    /// flag overrides, defaults for everything else.
    pub fn from_args() -> Result<Self, Box<dyn std::error::Error>> {
        let args: Vec<String> = env::args().collect();
        Self::from_arg_list(&args)
    }

    fn from_arg_list(args: &[String]) -> Result<Self, Box<dyn std::error::Error>> {
        let file_config = match flag_value(args, "--config", "-c") {
            Some(path) => {
                let config_str = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file {path}: {e}"))?;
                toml::from_str::<FileConfig>(&config_str)?
            }
            None => FileConfig::default(),
        };

        let listen_address = flag_value(args, "--listen-address", "-l")
            .cloned()
            .or(file_config.server.listen_address)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string());

        let poll_interval_secs = match flag_value(args, "--poll-interval-secs", "-i") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                format!("Invalid --poll-interval-secs value: {raw}")
            })?,
            None => file_config
                .feeds
                .poll_interval_secs
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        };
        if poll_interval_secs == 0 {
            return Err("poll interval must be at least 1 second".into());
        }

        let defaults = feeds::FeedEndpoints::default();
        Ok(Config {
            listen_address,
            mempool_base_url: file_config
                .feeds
                .mempool_base_url
                .unwrap_or(defaults.mempool_base_url),
            gold_price_url: file_config
                .feeds
                .gold_price_url
                .unwrap_or(defaults.gold_price_url),
            poll_interval: Duration::from_secs(poll_interval_secs),
            request_timeout: Duration::from_secs(
                file_config
                    .feeds
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            gold_supply_oz: file_config
                .derived
                .gold_supply_oz
                .unwrap_or(DEFAULT_GOLD_SUPPLY_OZ),
        })
    }

    pub fn endpoints(&self) -> feeds::FeedEndpoints {
        feeds::FeedEndpoints {
            mempool_base_url: self.mempool_base_url.clone(),
            gold_price_url: self.gold_price_url.clone(),
        }
    }
}

fn flag_value<'a>(args: &'a [String], long: &str, short: &str) -> Option<&'a String> {
    args.iter()
        .position(|arg| arg == long || arg == short)
        .and_then(|i| args.get(i + 1))
}
