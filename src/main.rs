// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use axum::{
    Router,
    routing::{get, patch, post, put},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::widget_feed_service::WidgetFeedService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::file_repository::FileStateRepository;
use crate::infrastructure::providers::MarketProviders;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    add_widget, apply_layout, export_dashboard, get_dashboard, get_settings, health_check,
    import_dashboard, list_widgets, patch_settings, preview_import, remove_widget,
    reorder_widgets, reset_dashboard, stream_widget, update_widget, widget_data,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Persistence and providers (infrastructure layer)
    let repository = Arc::new(FileStateRepository::new(&config.storage.dir).await?);
    tracing::info!("Persisting dashboard under {}", repository.base_path().display());
    let providers = Arc::new(MarketProviders::new(config.providers.clone())?);

    // Services (application layer)
    let feeds = Arc::new(WidgetFeedService::new(providers));
    let dashboard = Arc::new(
        DashboardService::hydrate(repository, feeds.clone(), config.storage.key.clone()).await,
    );
    tracing::info!("{} widget feeds running", feeds.active_feeds());

    let state = Arc::new(AppState { dashboard });
    let router = build_router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting finboard service on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    feeds.shutdown();
    tracing::info!("Stopped");
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/export", get(export_dashboard))
        .route("/dashboard/import", post(import_dashboard))
        .route("/dashboard/import/preview", post(preview_import))
        .route("/dashboard/reset", post(reset_dashboard))
        .route("/dashboard/layout", put(apply_layout))
        .route("/widgets", get(list_widgets).post(add_widget).put(reorder_widgets))
        .route("/widgets/:id", patch(update_widget).delete(remove_widget))
        .route("/widgets/:id/data", get(widget_data))
        .route("/widgets/:id/stream", get(stream_widget))
        .route("/settings", get(get_settings).patch(patch_settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
