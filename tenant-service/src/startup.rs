//! Application startup and lifecycle management.

use crate::config::TenantServiceConfig;
use crate::handlers;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tenancy_core::error::AppError;
use tenancy_core::middleware::{
    request_id_middleware, tenant_resolution_middleware, TenantResolutionMiddleware,
};
use tenancy_core::{InMemoryTenantLookup, TenantLookup};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: TenantServiceConfig,
}

/// Build the HTTP router with the tenant resolution stack applied.
///
/// Layers run outermost first: HTTP tracing, request id, panic capture, then
/// tenant resolution. The request id span is the current span when the tenant
/// is resolved, so its `tenant_id` field gets filled in. A panicking handler
/// still has its tenant binding cleared before the 500 is written.
pub fn router(state: AppState, resolver: TenantResolutionMiddleware) -> Router {
    Router::new()
        .route("/actuator/health", get(handlers::health_check))
        .route("/actuator/info", get(handlers::info))
        .route("/tenants/current", get(handlers::current_tenant))
        .route("/tenants/current/id", get(handlers::current_tenant_id))
        .route(
            "/tenants/current/background",
            get(handlers::current_tenant_from_task),
        )
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            resolver,
            tenant_resolution_middleware,
        ))
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application backed by the bootstrap tenants in `config`.
    pub async fn build(config: TenantServiceConfig) -> Result<Self, AppError> {
        let lookup = Arc::new(InMemoryTenantLookup::from_seeds(
            &config.common.tenancy.bootstrap_tenants,
        ));
        Self::build_with_lookup(config, lookup).await
    }

    /// Build the application with an externally supplied tenant lookup.
    pub async fn build_with_lookup(
        config: TenantServiceConfig,
        lookup: Arc<dyn TenantLookup>,
    ) -> Result<Self, AppError> {
        let resolver = TenantResolutionMiddleware::from_config(lookup, &config.common.tenancy)?;
        tracing::info!(
            header = %resolver.header_name(),
            ignored_paths = ?config.common.tenancy.ignored_paths,
            "Tenant resolution configured"
        );

        // Bind HTTP listener (port 0 = random port for testing)
        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", http_addr, e);
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!("Tenant service: HTTP on port {}", http_port);

        let router = router(AppState { config }, resolver);

        Ok(Self {
            http_port,
            http_listener,
            router,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.http_listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
