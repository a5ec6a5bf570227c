//! HTTP host for the Foodgram server: mounts module routers next to the host
//! endpoints (health, OpenAPI document, docs UI), applies the shared
//! middleware stack and runs the listener until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::{middleware::from_fn, routing::get, Extension, Router};
use tower::Layer;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use utoipa::openapi::OpenApi;

mod config;
pub mod problem;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

/// Owns the HTTP server and the middleware configuration.
#[derive(Debug, Clone, Default)]
pub struct ApiIngress {
    config: ApiIngressConfig,
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    /// Build the HTTP router from the module routes and their OpenAPI document.
    pub fn build_router(&self, api: Router, openapi: OpenApi) -> Router {
        tracing::debug!("Building router");
        let mut router = Router::new()
            .route("/health", get(web::health_check))
            .merge(api)
            .fallback(web::fallback);

        if self.config.enable_docs {
            router = router
                .route("/openapi.json", get(web::openapi_json))
                .route("/docs", get(web::serve_docs))
                .layer(Extension(Arc::new(openapi)));
        }

        // Layers added later wrap the ones added earlier. Effective order,
        // outermost first: SetRequestId -> PropagateRequestId -> Trace ->
        // push_req_id_to_extensions -> Timeout -> CORS -> BodyLimit
        router = router.layer(RequestBodyLimitLayer::new(self.config.body_limit_bytes));

        if self.config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        router = router.layer(TimeoutLayer::new(Duration::from_secs(
            self.config.request_timeout_secs,
        )));

        let x_request_id = request_id::header();
        router
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    /// Bind `addr` and serve `router` until `shutdown` resolves.
    pub async fn serve<F>(&self, router: Router, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        tracing::info!("HTTP server bound on {}", addr);

        let app = normalize_path(router);
        axum::serve(
            listener,
            axum::ServiceExt::<Request>::into_make_service(app),
        )
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Trailing slashes are stripped before routing, so `/api/tags/` and
/// `/api/tags` reach the same handler.
pub fn normalize_path(router: Router) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
