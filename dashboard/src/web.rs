//! HTTP API publishing controller state to the view layer.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use chainstats::derived::DerivedMetrics;
use chainstats::format;
use chainstats::snapshot::MetricsSnapshot;

use crate::controller::{Phase, SnapshotController};

pub async fn run_http_server(
    address: String,
    controller: Arc<SnapshotController>,
    stale_after_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(&address).await?;
    info!("🌐 Metrics API listening on http://{}", address);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let controller = controller.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let controller = controller.clone();
                async move { handle_request(req, controller, stale_after_secs).await }
            });

            if let Err(err) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(io, service)
                .await
            {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    controller: Arc<SnapshotController>,
    stale_after_secs: u64,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/api/metrics") => {
            let payload = metrics_payload(&controller);
            Response::builder()
                .header("content-type", "application/json")
                .body(Full::new(Bytes::from(payload.to_string())))
        }
        (&Method::POST, "/api/display/toggle") => {
            let millions = controller.toggle_display_preference();
            let payload = json!({ "display_millions": millions });
            Response::builder()
                .header("content-type", "application/json")
                .body(Full::new(Bytes::from(payload.to_string())))
        }
        (&Method::GET, "/health") => {
            let stale = controller.is_stale(stale_after_secs);
            let status_code = if stale {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::OK
            };
            let payload = json!({
                "healthy": !stale,
                "stale": stale
            });
            Response::builder()
                .status(status_code)
                .header("content-type", "application/json")
                .body(Full::new(Bytes::from(payload.to_string())))
        }
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found"))),
    };

    Ok(response.unwrap_or_else(|e| {
        error!("Error building response: {:?}", e);
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::new(Bytes::from("Internal Server Error")))
            .unwrap()
    }))
}

/// The full published state: phase, preference, snapshot, derived map,
/// formatted display strings, and error cause when failed.
fn metrics_payload(controller: &SnapshotController) -> serde_json::Value {
    let state = controller.state();

    let display = match (state.snapshot.as_deref(), state.derived.as_ref()) {
        (Some(snapshot), Some(derived)) => {
            display_map(snapshot, derived, state.display_millions)
        }
        _ => serde_json::Value::Null,
    };

    // The last good snapshot is only surfaced while failed, for display
    // continuity at the consumer's discretion.
    let last_good = match state.phase {
        Phase::Failed => serde_json::to_value(state.last_good.as_deref())
            .unwrap_or(serde_json::Value::Null),
        _ => serde_json::Value::Null,
    };

    json!({
        "phase": state.phase.as_str(),
        "display_millions": state.display_millions,
        "snapshot": state.snapshot.as_deref(),
        "derived": state.derived,
        "display": display,
        "error": state.error,
        "last_good": last_good,
    })
}

/// Formatted strings for every card the dashboard front end shows,
/// recomputed on demand from the snapshot and the current preference.
fn display_map(
    snapshot: &MetricsSnapshot,
    derived: &DerivedMetrics,
    millions: bool,
) -> serde_json::Value {
    json!({
        "usd_per_btc": format::format_fiat(snapshot.fiat.usd, millions),
        "eur_per_btc": format::format_fiat(snapshot.fiat.eur, millions),
        "gbp_per_btc": format::format_fiat(snapshot.fiat.gbp, millions),
        "cad_per_btc": format::format_fiat(snapshot.fiat.cad, millions),
        "chf_per_btc": format::format_fiat(snapshot.fiat.chf, millions),
        "aud_per_btc": format::format_fiat(snapshot.fiat.aud, millions),
        "jpy_per_btc": format::format_fiat(snapshot.fiat.jpy, millions),
        "block_height": format::group_thousands(snapshot.chain.height),
        "hashrate": format::format_hashrate(snapshot.chain.hashrate_hs),
        "difficulty": format::format_difficulty(snapshot.chain.difficulty),
        "issued_supply_btc": format::sat_to_btc_display(snapshot.issued_supply_sat),
        "issued_pct_of_cap": format!("{:.1}%", derived.issued_pct_of_cap),
        "subsidy_epoch": derived.subsidy_epoch.to_string(),
        "difficulty_epoch": derived.difficulty_epoch.to_string(),
        "halving_progress": format!("{:.1}%", derived.halving_progress_pct),
        "mempool_vsize": format::format_vsize(snapshot.mempool.vsize_vb),
        "mempool_pending_fees_sat": format::group_thousands(snapshot.mempool.total_fee_sat),
        "mempool_pending_txs": format::group_thousands(snapshot.mempool.tx_count),
        "ln_channel_count": format::group_thousands(snapshot.lightning.channel_count),
        "ln_node_count": format::group_thousands(snapshot.lightning.node_count),
        "ln_capacity_btc": format::sat_to_btc_display(snapshot.lightning.total_capacity_sat),
        "ln_tor_nodes": format::group_thousands(snapshot.lightning.tor_nodes),
        "ln_clearnet_nodes": format::group_thousands(snapshot.lightning.clearnet_nodes),
        "ln_unannounced_nodes": format::group_thousands(snapshot.lightning.unannounced_nodes),
        "ln_tor_node_share": format::format_ratio_pct(derived.tor_node_share_pct, 1),
        "usd_per_gold_oz": format::group_thousands(snapshot.gold_usd_per_oz.round() as u64),
        "gold_oz_per_btc": format::format_ratio(derived.gold_oz_per_btc, 2),
        "sat_per_oz_gold": format::format_ratio_grouped(derived.sat_per_oz_gold),
        "btc_vs_gold_market_cap": format::format_ratio_pct(derived.btc_vs_gold_market_cap_pct, 2),
        "usd_per_btc_at_gold_parity": format::group_thousands(derived.usd_per_btc_at_gold_parity.round() as u64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{controller_with, healthy_transport};
    use feeds::FeedEndpoints;

    #[tokio::test]
    async fn test_metrics_payload_when_ready() {
        let endpoints = FeedEndpoints::default();
        let controller = controller_with(healthy_transport(&endpoints));
        controller.run_cycle().await;

        let payload = metrics_payload(&controller);
        assert_eq!(payload["phase"], "ready");
        assert_eq!(payload["error"], serde_json::Value::Null);
        assert_eq!(payload["snapshot"]["chain"]["height"], 650_000);
        assert_eq!(payload["display"]["usd_per_btc"], "50,000");
        assert_eq!(payload["display"]["gold_oz_per_btc"], "27.78");
        assert_eq!(payload["display"]["issued_supply_btc"], "18,500,006");
        assert_eq!(payload["derived"]["subsidy_epoch"], 4);
    }

    #[tokio::test]
    async fn test_metrics_payload_respects_preference() {
        let endpoints = FeedEndpoints::default();
        let controller = controller_with(healthy_transport(&endpoints));
        controller.run_cycle().await;

        controller.set_display_preference(true);
        let payload = metrics_payload(&controller);
        assert_eq!(payload["display_millions"], true);
        assert_eq!(payload["display"]["usd_per_btc"], "0.05M");
        // Underlying numerics are untouched by the preference.
        assert_eq!(payload["snapshot"]["fiat"]["usd"], 50_000.0);
    }

    #[tokio::test]
    async fn test_metrics_payload_when_failed() {
        let endpoints = FeedEndpoints::default();
        let controller = controller_with(healthy_transport(&endpoints));
        controller.run_cycle().await;

        controller.begin_cycle();
        controller.publish(crate::controller::CycleOutcome::Failure {
            cause: "mempool feed failed: upstream returned status 502".to_string(),
        });

        let payload = metrics_payload(&controller);
        assert_eq!(payload["phase"], "failed");
        assert_eq!(payload["snapshot"], serde_json::Value::Null);
        assert_eq!(payload["display"], serde_json::Value::Null);
        assert!(payload["error"].as_str().unwrap().contains("502"));
        // Continuity snapshot rides along while failed.
        assert_eq!(payload["last_good"]["chain"]["height"], 650_000);
    }
}
