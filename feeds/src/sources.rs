//! The six upstream feeds: endpoint URLs and typed response decoding.
//!
//! Each decoder checks exactly what the derived-metrics layer needs: the
//! required fields must be present and sign-sane. Anything else in the
//! response body is ignored.

use serde::Deserialize;
use serde_json::Value;

use chainstats::snapshot::{FiatPrices, LightningStats, MempoolSummary};

use crate::transport::FeedError;

/// Upstream endpoint set, defaulting to the public mempool.space API and
/// gold-api.com spot feed.
#[derive(Debug, Clone)]
pub struct FeedEndpoints {
    pub mempool_base_url: String,
    pub gold_price_url: String,
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self {
            mempool_base_url: "https://mempool.space".to_string(),
            gold_price_url: "https://api.gold-api.com/price/XAU".to_string(),
        }
    }
}

impl FeedEndpoints {
    pub fn mempool_summary(&self) -> String {
        format!("{}/api/mempool", self.mempool_base_url)
    }

    pub fn price_table(&self) -> String {
        format!("{}/api/v1/prices", self.mempool_base_url)
    }

    pub fn lightning_latest(&self) -> String {
        format!("{}/api/v1/lightning/statistics/latest", self.mempool_base_url)
    }

    pub fn tip_height(&self) -> String {
        format!("{}/api/blocks/tip/height", self.mempool_base_url)
    }

    pub fn hashrate_3d(&self) -> String {
        format!("{}/api/v1/mining/hashrate/3d", self.mempool_base_url)
    }

    pub fn gold_spot(&self) -> String {
        self.gold_price_url.clone()
    }
}

/// Hashrate and difficulty arrive from the same feed.
#[derive(Debug, Clone, Copy)]
pub struct MiningStats {
    pub hashrate_hs: f64,
    pub difficulty: f64,
}

fn schema(e: serde_json::Error) -> FeedError {
    FeedError::Schema(e.to_string())
}

#[derive(Deserialize)]
struct RawMempool {
    vsize: u64,
    total_fee: u64,
    count: u64,
}

pub fn decode_mempool(body: Value) -> Result<MempoolSummary, FeedError> {
    let raw: RawMempool = serde_json::from_value(body).map_err(schema)?;
    Ok(MempoolSummary {
        vsize_vb: raw.vsize,
        total_fee_sat: raw.total_fee,
        tx_count: raw.count,
    })
}

#[derive(Deserialize)]
struct RawPrices {
    #[serde(rename = "USD")]
    usd: f64,
    #[serde(rename = "EUR")]
    eur: f64,
    #[serde(rename = "GBP")]
    gbp: f64,
    #[serde(rename = "CAD")]
    cad: f64,
    #[serde(rename = "CHF")]
    chf: f64,
    #[serde(rename = "AUD")]
    aud: f64,
    #[serde(rename = "JPY")]
    jpy: f64,
}

pub fn decode_prices(body: Value) -> Result<FiatPrices, FeedError> {
    let raw: RawPrices = serde_json::from_value(body).map_err(schema)?;
    Ok(FiatPrices {
        usd: raw.usd,
        eur: raw.eur,
        gbp: raw.gbp,
        cad: raw.cad,
        chf: raw.chf,
        aud: raw.aud,
        jpy: raw.jpy,
    })
}

#[derive(Deserialize)]
struct RawLightning {
    latest: RawLightningLatest,
}

#[derive(Deserialize)]
struct RawLightningLatest {
    channel_count: u64,
    node_count: u64,
    total_capacity: u64,
    tor_nodes: u64,
    clearnet_nodes: u64,
    unannounced_nodes: u64,
}

pub fn decode_lightning(body: Value) -> Result<LightningStats, FeedError> {
    let raw: RawLightning = serde_json::from_value(body).map_err(schema)?;
    Ok(LightningStats {
        channel_count: raw.latest.channel_count,
        node_count: raw.latest.node_count,
        total_capacity_sat: raw.latest.total_capacity,
        tor_nodes: raw.latest.tor_nodes,
        clearnet_nodes: raw.latest.clearnet_nodes,
        unannounced_nodes: raw.latest.unannounced_nodes,
    })
}

/// The tip-height feed returns a bare JSON integer.
pub fn decode_tip_height(body: Value) -> Result<u64, FeedError> {
    body.as_u64()
        .ok_or_else(|| FeedError::Schema("block height is not a non-negative integer".to_string()))
}

#[derive(Deserialize)]
struct RawHashrate {
    #[serde(rename = "currentHashrate")]
    current_hashrate: f64,
    #[serde(rename = "currentDifficulty")]
    current_difficulty: f64,
}

pub fn decode_hashrate(body: Value) -> Result<MiningStats, FeedError> {
    let raw: RawHashrate = serde_json::from_value(body).map_err(schema)?;
    if !(raw.current_difficulty > 0.0) {
        return Err(FeedError::Schema("difficulty must be positive".to_string()));
    }
    if !(raw.current_hashrate >= 0.0) {
        return Err(FeedError::Schema("hashrate must be non-negative".to_string()));
    }
    Ok(MiningStats {
        hashrate_hs: raw.current_hashrate,
        difficulty: raw.current_difficulty,
    })
}

#[derive(Deserialize)]
struct RawGold {
    price: f64,
}

pub fn decode_gold(body: Value) -> Result<f64, FeedError> {
    let raw: RawGold = serde_json::from_value(body).map_err(schema)?;
    if !(raw.price > 0.0) {
        return Err(FeedError::Schema("gold price must be positive".to_string()));
    }
    Ok(raw.price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_mempool() {
        let body = json!({"count": 4364, "vsize": 58179268, "total_fee": 329672});
        let summary = decode_mempool(body).unwrap();
        assert_eq!(summary.vsize_vb, 58_179_268);
        assert_eq!(summary.total_fee_sat, 329_672);
        assert_eq!(summary.tx_count, 4_364);
    }

    #[test]
    fn test_decode_mempool_missing_field() {
        let body = json!({"count": 4364, "vsize": 58179268});
        assert!(matches!(decode_mempool(body), Err(FeedError::Schema(_))));
    }

    #[test]
    fn test_decode_prices_requires_all_seven_currencies() {
        let body = json!({
            "time": 1700000000,
            "USD": 50000.0, "EUR": 46000.0, "GBP": 39000.0,
            "CAD": 68000.0, "CHF": 44000.0, "AUD": 76000.0, "JPY": 7500000.0
        });
        let prices = decode_prices(body).unwrap();
        assert_eq!(prices.usd, 50_000.0);
        assert_eq!(prices.jpy, 7_500_000.0);

        let body = json!({"USD": 50000.0});
        assert!(matches!(decode_prices(body), Err(FeedError::Schema(_))));
    }

    #[test]
    fn test_decode_lightning_nested_latest() {
        let body = json!({
            "latest": {
                "channel_count": 48000, "node_count": 12000,
                "total_capacity": 500000000000u64,
                "tor_nodes": 8000, "clearnet_nodes": 3000, "unannounced_nodes": 1000
            }
        });
        let stats = decode_lightning(body).unwrap();
        assert_eq!(stats.total_capacity_sat, 500_000_000_000);
        assert_eq!(stats.tor_nodes, 8_000);
    }

    #[test]
    fn test_decode_tip_height_bare_integer() {
        assert_eq!(decode_tip_height(json!(650000)).unwrap(), 650_000);
        assert!(matches!(
            decode_tip_height(json!("650000")),
            Err(FeedError::Schema(_))
        ));
        assert!(matches!(
            decode_tip_height(json!(-5)),
            Err(FeedError::Schema(_))
        ));
    }

    #[test]
    fn test_decode_hashrate_sign_checks() {
        let body = json!({"currentHashrate": 6.5e20, "currentDifficulty": 9.0e13});
        let mining = decode_hashrate(body).unwrap();
        assert_eq!(mining.hashrate_hs, 6.5e20);

        let body = json!({"currentHashrate": 6.5e20, "currentDifficulty": 0.0});
        assert!(matches!(decode_hashrate(body), Err(FeedError::Schema(_))));
    }

    #[test]
    fn test_decode_gold() {
        let body = json!({"name": "Gold", "symbol": "XAU", "price": 1800.0});
        assert_eq!(decode_gold(body).unwrap(), 1_800.0);

        let body = json!({"name": "Gold", "symbol": "XAU"});
        assert!(matches!(decode_gold(body), Err(FeedError::Schema(_))));
    }
}
