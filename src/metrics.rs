use std::net::SocketAddr;
use tracing::{info, warn};

/// Installs the Prometheus exporter on its own listener port.
pub fn init_metrics(port: u16) {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            info!("Prometheus exporter listening on http://{}/metrics", addr);
        }
        Err(e) => {
            warn!("Prometheus exporter install failed (possibly already installed): {}", e);
        }
    }
}

/// Counters for ingestion cycles.
pub struct IngestMetrics;

impl IngestMetrics {
    pub fn record_cycle(updated: usize, stale: usize, failed: usize, skipped: usize) {
        ::metrics::counter!("tracker_ingest_cycles").increment(1);
        ::metrics::counter!("tracker_ingest_regions_updated").increment(updated as u64);
        ::metrics::counter!("tracker_ingest_regions_stale").increment(stale as u64);
        ::metrics::counter!("tracker_ingest_upserts_failed").increment(failed as u64);
        ::metrics::counter!("tracker_ingest_entries_skipped").increment(skipped as u64);
    }

    pub fn record_cycle_error() {
        ::metrics::counter!("tracker_ingest_cycle_errors").increment(1);
    }
}

/// Counters for the read path.
pub struct QueryMetrics;

impl QueryMetrics {
    pub fn record_lookup(kind: &'static str) {
        ::metrics::counter!("tracker_query_lookups", "kind" => kind).increment(1);
    }
}
