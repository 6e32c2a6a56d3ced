use crate::cli::ServeArgs;
use crate::routes::{operational_router, AppState};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use propsync::config::AppConfig;
use propsync::error::AppError;
use propsync::messaging::{BrokerGateway, InMemoryBroker, InboundDispatcher};
use propsync::store::InMemoryPropertyStore;
use propsync::sync::{
    scheduler, AnalyticsSnapshotPublisher, PriceOrchestrator, ReconciliationEngine,
    UpdateBroadcastPublisher,
};
use propsync::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    // No external broker adapter is wired here; single-process deployments
    // run on the in-memory transport. An AMQP adapter would be constructed
    // from config.broker.url instead.
    warn!(url = %config.broker.url, "using the in-process broker transport");
    let transport = Arc::new(InMemoryBroker::default());
    let gateway = Arc::new(BrokerGateway::connect(transport, config.broker.exchange.clone()).await?);

    let store = Arc::new(InMemoryPropertyStore::default());
    let reconciliation = Arc::new(ReconciliationEngine::new(store.clone(), gateway.clone()));
    let broadcast = Arc::new(UpdateBroadcastPublisher::new(gateway.clone()));
    let pricing = Arc::new(PriceOrchestrator::new(
        store.clone(),
        gateway.clone(),
        broadcast,
    ));
    let analytics = Arc::new(AnalyticsSnapshotPublisher::new(store.clone(), gateway.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = Arc::new(InboundDispatcher::new(
        reconciliation,
        pricing.clone(),
        gateway.clone(),
    ));
    dispatcher.start(shutdown_rx.clone()).await?;

    // One request cycle fires at startup; the daily job takes over after.
    if let Err(err) = pricing.request_recommendations().await {
        error!(error = %err, "startup price recommendation request failed");
    }

    let pricing_job = pricing.clone();
    scheduler::spawn_daily(
        "pricing_request",
        config.schedule.pricing_hour,
        shutdown_rx.clone(),
        move || {
            let pricing = pricing_job.clone();
            async move {
                if let Err(err) = pricing.request_recommendations().await {
                    error!(error = %err, "scheduled price recommendation request failed");
                }
            }
        },
    );

    let analytics_job = analytics.clone();
    scheduler::spawn_interval(
        "analytics_snapshot",
        config.schedule.analytics_interval,
        shutdown_rx,
        move || {
            let analytics = analytics_job.clone();
            async move {
                if let Err(err) = analytics.publish_snapshot().await {
                    error!(error = %err, "analytics snapshot export failed");
                }
            }
        },
    );

    let app = operational_router()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "property synchronization engine ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for the shutdown signal");
    }
}
