use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use coffer::api::auth::JwtAuth;
use coffer::api::rest::{AppState, create_router};
use coffer::config::loader::AppConfig;
use coffer::observability::metrics::register_metrics;
use coffer::observability::tracing::init_tracing;
use coffer::persistence::SnapshotStore;
use coffer::persistence::sqlite::SqliteStore;
use coffer::prices::aggregator::PriceAggregator;
use coffer::prices::cache::PriceCache;
use coffer::prices::chain::{FxChain, SpotChain};
use coffer::prices::scheduler::PriceScheduler;
use coffer::prices::sources::{build_fx_sources, build_spot_sources, http_client};
use coffer::utils::task_supervisor::TaskSupervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    register_metrics();

    let env = std::env::var("COFFER_ENV").unwrap_or_else(|_| "default".to_string());
    let cfg = AppConfig::load(&env).context("loading configuration")?;

    let store = SqliteStore::open(&cfg.database.path)
        .await
        .context("opening database")?;

    // Start from the persisted snapshot when there is one; a cold start runs
    // on the hardcoded defaults until the first refresh cycle lands.
    let initial = store
        .load_snapshot()
        .await
        .context("loading price snapshot")?
        .unwrap_or_default();
    let cache = Arc::new(PriceCache::new(initial));

    let aggregator = Arc::new(PriceAggregator::new(
        SpotChain::new(build_spot_sources(&cfg.prices.spot_sources)),
        FxChain::new(build_fx_sources(&cfg.prices.fx_sources)),
        cache.clone(),
        Arc::new(store.clone()),
        http_client()?,
    ));

    let mut supervisor = TaskSupervisor::new();
    supervisor.spawn(
        "price_refresh",
        PriceScheduler::new(
            aggregator,
            Duration::from_secs(cfg.prices.refresh_interval_secs),
        )
        .run(),
    );

    let state = Arc::new(AppState {
        cache,
        store,
        auth: JwtAuth::new(&cfg.auth.jwt_secret, cfg.auth.token_ttl_secs),
        started_at: std::time::Instant::now(),
    });
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, db = %cfg.database.path, "coffer backend listening");

    let server = axum::serve(listener, app).into_future();
    tokio::pin!(server);
    let mut health_ticker = tokio::time::interval(Duration::from_secs(60));

    let outcome = loop {
        tokio::select! {
            res = &mut server => break res.context("serving"),
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break Ok(());
            }
            _ = health_ticker.tick() => {
                // The refresh loop is supposed to run forever; if it is
                // gone, restarting the process beats serving stale prices.
                if let Err(e) = supervisor.check_health() {
                    break Err(e).context("supervised task failure");
                }
            }
        }
    };

    supervisor.shutdown_all();
    outcome
}
