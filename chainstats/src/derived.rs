//! Derived metrics: pure arithmetic over a complete snapshot.

use serde::{Serialize, Serializer};

use crate::issuance::{HALVING_INTERVAL, SAT_PER_BTC, SUPPLY_CAP_SAT};
use crate::snapshot::MetricsSnapshot;

/// Blocks per difficulty retarget period.
pub const DIFFICULTY_INTERVAL: u64 = 2_016;

/// Result of a derivation whose denominator comes from a feed and may
/// legitimately be zero. Serialized as the number itself, or `null` when
/// undefined, so one missing ratio never poisons the rest of the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Defined(f64),
    Undefined,
}

impl Ratio {
    /// Divide, mapping a zero denominator to `Undefined` rather than
    /// letting a NaN or infinity reach published values.
    pub fn of(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Ratio::Undefined
        } else {
            Ratio::Defined(numerator / denominator)
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Ratio::Defined(v) => Some(v),
            Ratio::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Ratio::Defined(_))
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Ratio::Defined(v) => serializer.serialize_f64(*v),
            Ratio::Undefined => serializer.serialize_none(),
        }
    }
}

/// Everything the view layer derives from one snapshot. Computed in one
/// pass; every field is independent of the others.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedMetrics {
    /// Tor-only nodes as a percentage of all Lightning nodes.
    pub tor_node_share_pct: Ratio,
    pub avg_capacity_per_channel_sat: Ratio,
    pub avg_capacity_per_node_sat: Ratio,
    /// Issued supply as a percentage of the 21M cap.
    pub issued_pct_of_cap: f64,
    /// 1-based era index: `floor(height / 210_000) + 1`.
    pub subsidy_epoch: u64,
    /// 1-based retarget index: `floor(height / 2_016) + 1`.
    pub difficulty_epoch: u64,
    /// Share of the current subsidy era already mined; 100% at the last
    /// block before a halving.
    pub halving_progress_pct: f64,
    /// Troy ounces of gold one bitcoin buys.
    pub gold_oz_per_btc: Ratio,
    /// Satoshis one troy ounce of gold buys.
    pub sat_per_oz_gold: Ratio,
    /// Bitcoin market cap as a percentage of gold's.
    pub btc_vs_gold_market_cap_pct: Ratio,
    /// USD per bitcoin if bitcoin matched gold's market cap at the 21M cap.
    pub usd_per_btc_at_gold_parity: f64,
}

/// Compute the full derived map. `gold_supply_oz` is the above-ground gold
/// stock in troy ounces; gold's market cap is that times the fetched spot.
pub fn derive(snapshot: &MetricsSnapshot, gold_supply_oz: f64) -> DerivedMetrics {
    let ln = &snapshot.lightning;
    let node_count = ln.node_count as f64;
    let issued_btc = snapshot.issued_supply_sat as f64 / SAT_PER_BTC as f64;
    let height = snapshot.chain.height;

    DerivedMetrics {
        tor_node_share_pct: Ratio::of(ln.tor_nodes as f64 * 100.0, node_count),
        avg_capacity_per_channel_sat: Ratio::of(
            ln.total_capacity_sat as f64,
            ln.channel_count as f64,
        ),
        avg_capacity_per_node_sat: Ratio::of(ln.total_capacity_sat as f64, node_count),
        issued_pct_of_cap: snapshot.issued_supply_sat as f64 / SUPPLY_CAP_SAT as f64 * 100.0,
        subsidy_epoch: height / HALVING_INTERVAL + 1,
        difficulty_epoch: height / DIFFICULTY_INTERVAL + 1,
        halving_progress_pct: (height % HALVING_INTERVAL + 1) as f64 / HALVING_INTERVAL as f64
            * 100.0,
        gold_oz_per_btc: Ratio::of(snapshot.fiat.usd, snapshot.gold_usd_per_oz),
        sat_per_oz_gold: Ratio::of(
            snapshot.gold_usd_per_oz * SAT_PER_BTC as f64,
            snapshot.fiat.usd,
        ),
        btc_vs_gold_market_cap_pct: Ratio::of(
            issued_btc * snapshot.fiat.usd * 100.0,
            gold_supply_oz * snapshot.gold_usd_per_oz,
        ),
        usd_per_btc_at_gold_parity: gold_supply_oz * snapshot.gold_usd_per_oz / 21_000_000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{ChainStats, FiatPrices, LightningStats, MempoolSummary};

    const GOLD_SUPPLY_OZ: f64 = 6_850_000_000.0;

    fn snapshot_at(height: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            mempool: MempoolSummary {
                vsize_vb: 1_000_000,
                total_fee_sat: 25_000_000,
                tx_count: 3_000,
            },
            fiat: FiatPrices {
                usd: 50_000.0,
                eur: 46_000.0,
                gbp: 39_000.0,
                cad: 68_000.0,
                chf: 44_000.0,
                aud: 76_000.0,
                jpy: 7_500_000.0,
            },
            lightning: LightningStats {
                channel_count: 50_000,
                node_count: 10_000,
                tor_nodes: 6_000,
                clearnet_nodes: 3_000,
                unannounced_nodes: 1_000,
                total_capacity_sat: 500_000_000_000,
            },
            chain: ChainStats {
                height,
                hashrate_hs: 6.5e20,
                difficulty: 9.0e13,
            },
            gold_usd_per_oz: 1_800.0,
            issued_supply_sat: crate::issuance::total_issued(height as i64).unwrap(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_lightning_ratios() {
        let derived = derive(&snapshot_at(650_000), GOLD_SUPPLY_OZ);
        assert_eq!(derived.tor_node_share_pct, Ratio::Defined(60.0));
        assert_eq!(
            derived.avg_capacity_per_channel_sat,
            Ratio::Defined(10_000_000.0)
        );
        assert_eq!(
            derived.avg_capacity_per_node_sat,
            Ratio::Defined(50_000_000.0)
        );
    }

    #[test]
    fn test_zero_node_count_is_undefined_not_a_panic() {
        let mut snapshot = snapshot_at(650_000);
        snapshot.lightning.node_count = 0;
        snapshot.lightning.channel_count = 0;
        let derived = derive(&snapshot, GOLD_SUPPLY_OZ);

        assert_eq!(derived.tor_node_share_pct, Ratio::Undefined);
        assert_eq!(derived.avg_capacity_per_channel_sat, Ratio::Undefined);
        assert_eq!(derived.avg_capacity_per_node_sat, Ratio::Undefined);
        // Siblings are untouched by the undefined ratios.
        assert_eq!(derived.subsidy_epoch, 4);
        assert!(derived.gold_oz_per_btc.is_defined());
    }

    #[test]
    fn test_epochs_are_increasing_step_functions() {
        let d0 = derive(&snapshot_at(0), GOLD_SUPPLY_OZ);
        assert_eq!(d0.subsidy_epoch, 1);
        assert_eq!(d0.difficulty_epoch, 1);

        let mut last_subsidy = 0;
        let mut last_difficulty = 0;
        for height in [0, 2_015, 2_016, 209_999, 210_000, 650_000, 840_000] {
            let derived = derive(&snapshot_at(height), GOLD_SUPPLY_OZ);
            assert!(derived.subsidy_epoch >= last_subsidy);
            assert!(derived.difficulty_epoch >= last_difficulty);
            last_subsidy = derived.subsidy_epoch;
            last_difficulty = derived.difficulty_epoch;
        }

        assert_eq!(derive(&snapshot_at(2_015), GOLD_SUPPLY_OZ).difficulty_epoch, 1);
        assert_eq!(derive(&snapshot_at(2_016), GOLD_SUPPLY_OZ).difficulty_epoch, 2);
        assert_eq!(derive(&snapshot_at(209_999), GOLD_SUPPLY_OZ).subsidy_epoch, 1);
        assert_eq!(derive(&snapshot_at(210_000), GOLD_SUPPLY_OZ).subsidy_epoch, 2);
    }

    #[test]
    fn test_halving_progress_hits_100_at_era_end() {
        let derived = derive(&snapshot_at(209_999), GOLD_SUPPLY_OZ);
        assert!((derived.halving_progress_pct - 100.0).abs() < 1e-9);

        let derived = derive(&snapshot_at(210_000), GOLD_SUPPLY_OZ);
        assert!(derived.halving_progress_pct < 0.001);
    }

    #[test]
    fn test_gold_cross_rates() {
        let derived = derive(&snapshot_at(650_000), GOLD_SUPPLY_OZ);
        // 50_000 / 1_800 = 27.78 oz per coin, to two decimals.
        let oz = derived.gold_oz_per_btc.value().unwrap();
        assert!((oz - 27.7778).abs() < 0.001);
        // Inverse leg: 1_800 / 50_000 coins, in satoshis.
        let sats = derived.sat_per_oz_gold.value().unwrap();
        assert!((sats - 3_600_000.0).abs() < 1.0);
    }

    #[test]
    fn test_gold_market_cap_comparison() {
        let derived = derive(&snapshot_at(650_000), GOLD_SUPPLY_OZ);
        // (18_500_006.25 * 50_000) / (6.85e9 * 1_800) * 100
        let expected = 18_500_006.25 * 50_000.0 / (GOLD_SUPPLY_OZ * 1_800.0) * 100.0;
        let got = derived.btc_vs_gold_market_cap_pct.value().unwrap();
        assert!((got - expected).abs() < 1e-9);

        let parity = derived.usd_per_btc_at_gold_parity;
        assert!((parity - GOLD_SUPPLY_OZ * 1_800.0 / 21_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_undefined_ratio_serializes_as_null() {
        let json = serde_json::to_string(&Ratio::Undefined).unwrap();
        assert_eq!(json, "null");
        let json = serde_json::to_string(&Ratio::Defined(27.5)).unwrap();
        assert_eq!(json, "27.5");
    }
}
