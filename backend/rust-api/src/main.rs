use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use campus_connect_api::background::scheduler::BackgroundScheduler;
use campus_connect_api::config::StoreBackend;
use campus_connect_api::services::{
    EventStore, MemoryEventStore, Notifier, PgEventStore, WebhookNotifier,
};
use campus_connect_api::{build_router, database, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_connect_api=debug,tower_http=debug".into())
        )
        .init();

    info!("Starting CampusConnect event API...");

    let config = Arc::new(Config::from_env()?);
    info!("Configuration loaded");

    let store: Arc<dyn EventStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let db_pool = database::new_pool(&config.database_url).await?;
            info!("Database connection pool created");
            database::run_migrations(&db_pool).await?;
            Arc::new(PgEventStore::new(db_pool)) as Arc<dyn EventStore>
        }
        StoreBackend::Memory => {
            warn!("Using in-memory event store; events are lost on restart");
            Arc::new(MemoryEventStore::new()) as Arc<dyn EventStore>
        }
    };

    let notifier: Option<Arc<dyn Notifier>> = match &config.notification_webhook_url {
        Some(url) => {
            let notifier = WebhookNotifier::new(url.clone())?;
            info!("Event notifications go to {}", notifier.url());
            Some(Arc::new(notifier) as Arc<dyn Notifier>)
        }
        None => None,
    };

    let scheduler = BackgroundScheduler::new(store.clone(), notifier, config.clone()).await?;

    let app = build_router(AppState {
        store,
        config: config.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    // Graceful shutdown
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutting down gracefully...");
            if let Err(e) = scheduler.shutdown().await {
                error!("Failed to stop background scheduler: {:?}", e);
            }
        }
    }

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

    tracing::info!("Shutdown signal received");
}
