use clap::{Parser, Subcommand};
use covid_tracker::config::Config;
use covid_tracker::geocode::LocationIqGeocoder;
use covid_tracker::ingest::IngestCycle;
use covid_tracker::query::QueryService;
use covid_tracker::registry;
use covid_tracker::server::{self, AppState};
use covid_tracker::store::{MemoryRegionStore, RegionStore};
use covid_tracker::upstream::Covid19IndiaFeed;
use covid_tracker::{logging, metrics};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "covid_tracker")]
#[command(about = "Regional COVID-19 case count aggregator for India")]
#[command(version = "0.1.0")]
struct Cli {
    /// Use the Turso-backed durable store (requires the `db` build feature)
    #[arg(long)]
    turso: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve,
    /// Run one fetch-normalize-reconcile ingestion cycle and exit
    Ingest,
    /// Load the region reference data and sync canonical names into the store
    SyncRegistry,
}

async fn build_store(use_turso: bool) -> anyhow::Result<Arc<dyn RegionStore>> {
    if use_turso {
        #[cfg(feature = "db")]
        {
            let store = covid_tracker::store::TursoRegionStore::connect().await?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "db"))]
        anyhow::bail!("this binary was built without the `db` feature; rebuild with --features db");
    }
    Ok(Arc::new(MemoryRegionStore::new()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;
    metrics::init_metrics(config.server.metrics_port);

    let store = build_store(cli.turso).await?;

    match cli.command {
        Commands::Serve => {
            let feed = Arc::new(Covid19IndiaFeed::new(&config.upstream)?);
            let geocoder = Arc::new(LocationIqGeocoder::from_env(&config.geocoder)?);
            let ingest = IngestCycle::new(feed, store.clone(), config.registry.path.clone());
            let state = Arc::new(AppState {
                query: QueryService::new(store),
                ingest,
                geocoder,
            });

            let addr: SocketAddr = config.server.bind.parse()?;
            server::serve(state, addr).await?;
        }
        Commands::Ingest => {
            let feed = Arc::new(Covid19IndiaFeed::new(&config.upstream)?);
            let ingest = IngestCycle::new(feed, store, config.registry.path.clone());
            let report = ingest.run().await?;

            println!("Ingest cycle finished:");
            println!("   regions updated: {}", report.regions_updated);
            println!("   stale observations: {}", report.regions_stale);
            println!("   failed upserts: {}", report.failed.len());
            println!("   skipped entries: {}", report.skipped_entries.len());
            for failure in &report.failed {
                println!("   - {}: {}", failure.code, failure.reason);
            }
        }
        Commands::SyncRegistry => {
            let entries = registry::load_regions(&config.registry.path)?;
            let report = registry::sync_registry(store.as_ref(), &entries).await?;
            println!(
                "Registry sync finished: {} regions, {} failures",
                report.updated,
                report.failed.len()
            );
            for (code, reason) in &report.failed {
                println!("   - {code}: {reason}");
            }
        }
    }

    Ok(())
}
