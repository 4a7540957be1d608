use mimalloc::MiMalloc;
use orbitcache::config::CONFIG;
use orbitcache::migration::{JsonLegacyStore, MigrationNotice, MigrationRunner};
use orbitcache::server::router::{OrbitState, orbit_router};
use orbitcache::upstream::HttpTelemetrySource;
use orbitcache::{Clock, RecordStore, RetentionManager, SyncContext, SyncManager, SystemClock};
use orbitcache_gaps::{GapAnalyzer, KeplerPropagator};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        proxy = %cfg.upstream.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.basic.loglevel,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        legacy_snapshot = %cfg.basic.legacy_snapshot_path.display()
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = RecordStore::create(&cfg.basic.database_url)?.open().await?;

    // A failed migration never blocks startup; the notice stays up until dismissed.
    let migration_notice = MigrationNotice::default();
    let runner = MigrationRunner::new(
        store.clone(),
        Arc::new(JsonLegacyStore::new(cfg.basic.legacy_snapshot_path.clone())),
        clock.clone(),
    );
    let outcome = runner.run_migration().await;
    if !outcome.success {
        warn!(error = ?outcome.error, "continuing without legacy data");
    }
    migration_notice.publish(&outcome).await;

    let retention = RetentionManager::new(store.clone(), cfg.retention.clone(), clock.clone());
    let sync = SyncManager::spawn(SyncContext {
        store: store.clone(),
        source: Arc::new(HttpTelemetrySource::new(&cfg.upstream)?),
        analyzer: GapAnalyzer::new(cfg.gap_filling.clone(), Arc::new(KeplerPropagator)),
        retention: retention.clone(),
        clock,
        config: cfg.sync.clone(),
    })
    .await?;
    sync.start().await?;

    let state = OrbitState::new(store.clone(), sync.clone(), retention, migration_notice);
    let app = orbit_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sync.shutdown().await;
    store.close().await;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
