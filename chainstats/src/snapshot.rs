use serde::{Deserialize, Serialize};

/// One fully populated set of network metrics from a single poll cycle.
///
/// A snapshot is constructed fresh on every successful cycle and never
/// mutated afterwards; consumers only ever see it whole. A failed cycle
/// produces no snapshot at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub mempool: MempoolSummary,
    pub fiat: FiatPrices,
    pub lightning: LightningStats,
    pub chain: ChainStats,
    /// Gold spot price, USD per troy ounce.
    pub gold_usd_per_oz: f64,
    /// Total satoshis issued through `chain.height`, inclusive.
    pub issued_supply_sat: u64,
    /// Unix seconds at snapshot construction.
    pub timestamp: u64,
}

/// Pending-transaction backlog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolSummary {
    /// Virtual size of the pending set, vbytes.
    pub vsize_vb: u64,
    /// Total pending fees, satoshis.
    pub total_fee_sat: u64,
    pub tx_count: u64,
}

/// Price per bitcoin in each quoted currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiatPrices {
    pub usd: f64,
    pub eur: f64,
    pub gbp: f64,
    pub cad: f64,
    pub chf: f64,
    pub aud: f64,
    pub jpy: f64,
}

/// Lightning Network topology counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightningStats {
    pub channel_count: u64,
    pub node_count: u64,
    pub total_capacity_sat: u64,
    pub tor_nodes: u64,
    pub clearnet_nodes: u64,
    pub unannounced_nodes: u64,
}

/// Chain tip and mining state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStats {
    pub height: u64,
    /// Hashes per second, 3-day average basis.
    pub hashrate_hs: f64,
    pub difficulty: f64,
}
