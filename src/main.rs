// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc, time::Duration};

use crate::application::dashboard_repository::DashboardRepository;
use crate::application::dashboard_service::DashboardService;
use crate::application::widget_manager::{InstanceIdGenerator, WidgetInstanceManager};
use crate::application::widget_registry::WidgetRegistry;
use crate::infrastructure::config::{
    AppConfig, PersistenceBackend, load_app_config, load_widgets_config,
};
use crate::infrastructure::memory_repository::MemoryDashboardRepository;
use crate::infrastructure::remote_repository::RemoteDashboardRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

fn build_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn DashboardRepository>> {
    let persistence = &config.persistence;
    match persistence.backend {
        PersistenceBackend::Memory => {
            tracing::warn!("Using in-memory persistence, layouts are lost on restart");
            Ok(Arc::new(MemoryDashboardRepository::new()))
        }
        PersistenceBackend::Remote => {
            let base_url = persistence
                .base_url
                .clone()
                .context("persistence.base_url is required for the remote backend")?;
            tracing::info!("Using preferences service at {}", base_url);
            Ok(Arc::new(RemoteDashboardRepository::new(
                base_url,
                persistence.token.clone(),
                Duration::from_secs(persistence.timeout_secs),
            )?))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_app_config().context("Failed to load configuration")?;

    // Initialize tracing
    infrastructure::logging::init(&config.logging.level)?;

    // Widget catalog
    let widgets_config = load_widgets_config().context("Failed to load widget catalog")?;
    let registry = Arc::new(WidgetRegistry::from_config(widgets_config, config.grid.columns)?);
    if registry.is_empty() {
        anyhow::bail!("Widget catalog has no templates");
    }
    tracing::info!("Loaded {} widget templates", registry.len());

    // Create repository (infrastructure layer)
    let repository = build_repository(&config)?;

    // Create services (application layer)
    let widgets = Arc::new(WidgetInstanceManager::new(
        registry,
        InstanceIdGenerator::seeded_from_clock(),
        config.grid.columns,
    ));
    let dashboard_service = DashboardService::new(repository, widgets);

    // Build router (presentation layer)
    let router = build_router(Arc::new(AppState::new(dashboard_service)));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Starting energy-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
