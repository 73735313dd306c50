//! The fetch orchestrator: six concurrent requests, one atomic result.

use thiserror::Error;
use tracing::debug;

use chainstats::snapshot::{ChainStats, FiatPrices, LightningStats, MempoolSummary};

use crate::sources::{self, FeedEndpoints};
use crate::transport::{FeedError, FeedTransport};

/// The six merged responses of one poll cycle. Only ever observable as a
/// whole; a consumer holding one may assume every field came from the same
/// cycle.
#[derive(Debug, Clone)]
pub struct RawSourceBundle {
    pub mempool: MempoolSummary,
    pub fiat: FiatPrices,
    pub lightning: LightningStats,
    pub chain: ChainStats,
    pub gold_usd_per_oz: f64,
}

/// A failed poll cycle: which feed failed first, and why.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{feed} feed failed: {cause}")]
pub struct FetchError {
    pub feed: &'static str,
    pub cause: FeedError,
}

fn tag(feed: &'static str) -> impl FnOnce(FeedError) -> FetchError {
    move |cause| FetchError { feed, cause }
}

/// Fetch all six feeds concurrently and merge, or fail the whole cycle.
///
/// All-or-nothing: the first failure (transport, status, or schema) aborts
/// the cycle and no partial bundle escapes. A briefly-down feed therefore
/// discards the other five responses for that cycle; the next tick retries
/// everything.
pub async fn fetch_all(
    transport: &dyn FeedTransport,
    endpoints: &FeedEndpoints,
) -> Result<RawSourceBundle, FetchError> {
    let (mempool, fiat, lightning, height, mining, gold) = tokio::try_join!(
        async {
            transport
                .get_json(&endpoints.mempool_summary())
                .await
                .and_then(sources::decode_mempool)
                .map_err(tag("mempool"))
        },
        async {
            transport
                .get_json(&endpoints.price_table())
                .await
                .and_then(sources::decode_prices)
                .map_err(tag("price"))
        },
        async {
            transport
                .get_json(&endpoints.lightning_latest())
                .await
                .and_then(sources::decode_lightning)
                .map_err(tag("lightning"))
        },
        async {
            transport
                .get_json(&endpoints.tip_height())
                .await
                .and_then(sources::decode_tip_height)
                .map_err(tag("block height"))
        },
        async {
            transport
                .get_json(&endpoints.hashrate_3d())
                .await
                .and_then(sources::decode_hashrate)
                .map_err(tag("hashrate"))
        },
        async {
            transport
                .get_json(&endpoints.gold_spot())
                .await
                .and_then(sources::decode_gold)
                .map_err(tag("gold price"))
        },
    )?;

    debug!(height, "merged all six feeds");

    Ok(RawSourceBundle {
        mempool,
        fiat,
        lightning,
        chain: ChainStats {
            height,
            hashrate_hs: mining.hashrate_hs,
            difficulty: mining.difficulty,
        },
        gold_usd_per_oz: gold,
    })
}
